//! HTTP fetch collaborator
//!
//! This module provides:
//! - The `Fetcher` trait consumed by the resolution engine
//! - Request/response value types
//! - A reqwest-backed implementation

mod http;
mod traits;

pub use http::{build_http_client, HttpFetcher};
pub use traits::{FetchError, FetchRequest, FetchResponse, FetchResult, Fetcher};

#[cfg(test)]
pub(crate) mod testing;
