//! Fetch trait definitions
//!
//! The resolution engine never opens sockets itself. Everything goes through
//! the [`Fetcher`] trait, which lets tests substitute canned responses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("Failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// A single outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,

    /// Extra headers, sent in order
    pub headers: Vec<(String, String)>,

    pub referer: Option<String>,

    /// When false, 3xx responses are returned as-is
    pub follow_redirects: bool,

    /// When false, only status and headers are read and `body` stays empty
    pub read_body: bool,

    pub timeout: Duration,
}

impl FetchRequest {
    /// Creates a GET-style request that follows redirects
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            referer: None,
            follow_redirects: true,
            read_body: true,
            timeout,
        }
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Disables redirect following, used by the redirect walker
    pub fn no_redirects(mut self) -> Self {
        self.follow_redirects = false;
        self
    }

    /// Skips the body, so a hop that turns out to be the file itself is not
    /// downloaded
    pub fn headers_only(mut self) -> Self {
        self.read_body = false;
        self
    }
}

/// A fetched response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,

    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,

    pub body: String,

    /// URL after any followed redirects
    pub final_url: String,
}

impl FetchResponse {
    /// Looks up a header case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns the `Location` header of a redirect response
    pub fn location(&self) -> Option<&str> {
        self.header("location").filter(|value| !value.trim().is_empty())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator the engine consumes
///
/// Implementations must be shareable across concurrent branches.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET request
    async fn get(&self, request: &FetchRequest) -> FetchResult<FetchResponse>;

    /// Issues a POST request with a form body
    async fn post(
        &self,
        request: &FetchRequest,
        form: &[(String, String)],
    ) -> FetchResult<FetchResponse>;
}
