/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "files.example.com" (single subdomain)
///    - "cdn.eu.example.com" (nested subdomains)
///
/// # Examples
///
/// ```
/// use link_resolver::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "files.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// Checks if a host contains any of the given fragments
///
/// Hosting sites rotate their TLDs and subdomains, so most host profiles
/// match on a stable fragment of the name ("gdlink") rather than a full domain.
/// Comparison is case-insensitive.
pub fn host_contains_any(host: &str, fragments: &[String]) -> bool {
    let host = host.to_lowercase();
    fragments
        .iter()
        .any(|fragment| !fragment.is_empty() && host.contains(&fragment.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches_wildcard("example.com", "example.com"));
        assert!(!matches_wildcard("example.com", "files.example.com"));
    }

    #[test]
    fn test_wildcard_matches_bare_and_nested() {
        assert!(matches_wildcard("*.example.com", "example.com"));
        assert!(matches_wildcard("*.example.com", "cdn.eu.example.com"));
    }

    #[test]
    fn test_wildcard_no_match_partial() {
        assert!(!matches_wildcard("*.example.com", "myexample.com"));
        assert!(!matches_wildcard("*.example.com", "example.com.org"));
    }

    #[test]
    fn test_empty_strings() {
        assert!(!matches_wildcard("*.example.com", ""));
        assert!(!matches_wildcard("", "example.com"));
    }

    #[test]
    fn test_host_contains_any() {
        let fragments = vec!["gdlink".to_string(), "hubcdn".to_string()];
        assert!(host_contains_any("new.gdlink.dad", &fragments));
        assert!(host_contains_any("HUBCDN.fans", &fragments));
        assert!(!host_contains_any("example.com", &fragments));
    }

    #[test]
    fn test_host_contains_ignores_empty_fragments() {
        assert!(!host_contains_any("example.com", &[String::new()]));
    }
}
