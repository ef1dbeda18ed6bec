//! Link-Resolver: ranked media links from file-hosting pages
//!
//! This crate turns a reference to a third-party hosting page into concrete,
//! ready-to-fetch media URLs. Each reference is dispatched to a configured
//! host strategy, which may walk redirect chains, decode obfuscated payloads or
//! delegate to other hosts. Every resolved candidate is scored so callers can
//! rank them.

pub mod alias;
pub mod config;
pub mod decode;
pub mod fetch;
pub mod model;
pub mod resolver;
pub mod score;
pub mod url;

use thiserror::Error;

/// Main error type for resolution operations
///
/// None of these are fatal to a whole resolution call. They are raised inside a
/// single branch and the aggregator drops that branch.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Network error: {0}")]
    Network(#[from] fetch::FetchError),

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] decode::DecodeError),

    #[error("Redirect budget of {hops} hops exhausted from {url}")]
    ExhaustedRedirects { url: String, hops: u32 },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Delegation depth {depth} exceeded at {url}")]
    DelegationDepth { url: String, depth: u32 },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ResolveError {
    /// Builds a parse error for a page that lacked an expected marker
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true for timeouts and connection failures
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Returns true when a branch ended without a terminal URL
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            Self::ExhaustedRedirects { .. } | Self::RedirectLoop { .. } | Self::DelegationDepth { .. }
        )
    }

    /// Short category name used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Parse { .. } => "parse",
            Self::Decode(_) => "decode",
            Self::ExhaustedRedirects { .. } | Self::RedirectLoop { .. } => "unresolved",
            Self::DelegationDepth { .. } => "delegation",
            Self::Url(_) | Self::UrlParse(_) => "url",
            Self::Config(_) => "config",
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, ResolveError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use alias::DomainAliasTable;
pub use config::ResolverConfig;
pub use model::{CandidateLink, MediaType, ScoredLink, SourceReference, SubtitleTrack};
pub use resolver::{LinkMode, RankedLinks, Resolved, Resolver};
pub use score::{rank, score};
