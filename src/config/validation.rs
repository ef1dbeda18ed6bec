use crate::config::types::{
    AliasConfig, EngineConfig, HostProfile, HttpConfig, ResolverConfig, StrategyKind,
};
use crate::decode::DecodeOp;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &ResolverConfig) -> Result<(), ConfigError> {
    validate_engine_config(&config.resolver)?;
    validate_http_config(&config.http)?;
    validate_alias_config(&config.aliases)?;
    validate_hosts(&config.hosts)?;
    Ok(())
}

/// Validates resolution engine bounds
fn validate_engine_config(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.max_hops < 1 || config.max_hops > 50 {
        return Err(ConfigError::Validation(format!(
            "max-hops must be between 1 and 50, got {}",
            config.max_hops
        )));
    }

    if config.max_concurrent_branches < 1 || config.max_concurrent_branches > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-branches must be between 1 and 64, got {}",
            config.max_concurrent_branches
        )));
    }

    if config.per_hop_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "per-hop-timeout-ms must be >= 1".to_string(),
        ));
    }

    if config.overall_timeout_ms < config.per_hop_timeout_ms {
        return Err(ConfigError::Validation(format!(
            "overall-timeout-ms ({}) must be >= per-hop-timeout-ms ({})",
            config.overall_timeout_ms, config.per_hop_timeout_ms
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.connect_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-ms must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates alias table configuration
fn validate_alias_config(config: &AliasConfig) -> Result<(), ConfigError> {
    if let Some(remote) = &config.remote_url {
        validate_http_url(remote, "aliases.remote-url")?;
    }

    if config.timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "aliases.timeout-ms must be >= 1".to_string(),
        ));
    }

    for (key, base) in &config.static_entries {
        validate_http_url(base, &format!("aliases.static.{}", key))?;
    }

    Ok(())
}

/// Validates host profiles
fn validate_hosts(hosts: &[HostProfile]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for host in hosts {
        if host.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "host name cannot be empty".to_string(),
            ));
        }

        if !names.insert(host.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate host name '{}'",
                host.name
            )));
        }

        if !host.has_matchers() {
            return Err(ConfigError::Validation(format!(
                "host '{}' needs at least one of domains, fragments, path-markers or pattern",
                host.name
            )));
        }

        for domain in &host.domains {
            validate_domain_pattern(domain)?;
        }

        if let Some(pattern) = &host.pattern {
            compile(pattern, &host.name)?;
        }

        if host.max_hops == Some(0) {
            return Err(ConfigError::Validation(format!(
                "host '{}' max-hops must be >= 1",
                host.name
            )));
        }

        validate_strategy(host)?;
    }

    Ok(())
}

/// Validates the strategy-specific settings of a host
fn validate_strategy(host: &HostProfile) -> Result<(), ConfigError> {
    match &host.strategy {
        StrategyKind::Cipher(spec) => {
            let regex = compile(&spec.payload_pattern, &host.name)?;
            if regex.captures_len() < 2 {
                return Err(ConfigError::InvalidPattern(format!(
                    "host '{}' payload-pattern needs a capture group",
                    host.name
                )));
            }
            validate_decode_ops(&spec.decode, &host.name)?;
            validate_decode_ops(&spec.url_decode, &host.name)?;
            validate_pointer(&spec.url_pointer, &host.name)?;
        }
        StrategyKind::JsonApi(spec) => {
            let regex = compile(&spec.id_pattern, &host.name)?;
            if regex.captures_len() < 2 {
                return Err(ConfigError::InvalidPattern(format!(
                    "host '{}' id-pattern needs a capture group",
                    host.name
                )));
            }
            if !spec.endpoint.contains("{id}") && !spec.form.values().any(|v| v.contains("{id}"))
            {
                return Err(ConfigError::Validation(format!(
                    "host '{}' must use {{id}} in its endpoint or form",
                    host.name
                )));
            }
            validate_pointer(&spec.url_pointer, &host.name)?;
        }
        StrategyKind::Scrape(spec) => {
            validate_selectors(&spec.selectors, &host.name)?;
            if let Some(selector) = &spec.quality_selector {
                validate_selectors(std::slice::from_ref(selector), &host.name)?;
            }
        }
        StrategyKind::Delegate(spec) => validate_selectors(&spec.selectors, &host.name)?,
        StrategyKind::Aggregator(spec) => validate_selectors(&spec.selectors, &host.name)?,
        StrategyKind::Redirect(_) | StrategyKind::BestEffort => {}
    }

    Ok(())
}

fn validate_decode_ops(ops: &[DecodeOp], host: &str) -> Result<(), ConfigError> {
    for op in ops {
        if let DecodeOp::AesCbc(params) = op {
            params.validate().map_err(|e| {
                ConfigError::Validation(format!("host '{}' aes-cbc step: {}", host, e))
            })?;
        }
    }
    Ok(())
}

fn validate_pointer(pointer: &str, host: &str) -> Result<(), ConfigError> {
    if !pointer.is_empty() && !pointer.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "host '{}' JSON pointer '{}' must start with '/'",
            host, pointer
        )));
    }
    Ok(())
}

fn validate_selectors(selectors: &[String], host: &str) -> Result<(), ConfigError> {
    for selector in selectors {
        scraper::Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "host '{}' selector '{}': {:?}",
                host, selector, e
            ))
        })?;
    }
    Ok(())
}

fn compile(pattern: &str, host: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern)
        .map_err(|e| ConfigError::InvalidPattern(format!("host '{}': {}", host, e)))
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("{} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Invalid domain pattern '{}'",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' contains invalid characters",
            pattern
        )));
    }

    Ok(())
}
