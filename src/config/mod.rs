//! Configuration module for Link-Resolver
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Host profiles are data: adding a host means adding a `[[host]]` table, not a
//! new type.
//!
//! # Example
//!
//! ```no_run
//! use link_resolver::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("resolver.toml")).unwrap();
//! println!("Redirect budget: {}", config.resolver.max_hops);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    AggregatorSpec, AliasConfig, CipherSpec, DelegateSpec, EngineConfig, HostProfile,
    HttpConfig, HttpMethod, JsonApiSpec, RedirectSpec, ResolverConfig, ScrapeSpec, StrategyKind,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
