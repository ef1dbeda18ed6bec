//! URL handling module for Link-Resolver
//!
//! This module provides host matching, base-URL derivation and the helpers the
//! redirect walker needs to interpret `Location` headers.

mod domain;
mod location;
mod matcher;

pub use domain::{base_url, rebase};
pub use location::{embedded_target, has_media_extension, is_http_url, resolve_location};
pub use matcher::{host_contains_any, matches_wildcard};
