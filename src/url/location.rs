use crate::decode::decode_base64_text;
use crate::{UrlError, UrlResult};
use url::Url;

/// File extensions that mark a URL as a media file
const MEDIA_EXTENSIONS: &[&str] = &[
    ".mp4", ".mkv", ".avi", ".webm", ".mov", ".m4v", ".m3u8", ".mpd", ".zip",
];

/// Resolves a `Location` header value against the URL that produced it
///
/// Handles absolute, protocol-relative (`//host/x`) and relative values.
///
/// # Examples
///
/// ```
/// use link_resolver::url::resolve_location;
///
/// let next = resolve_location("https://a.example/x/y", "/z").unwrap();
/// assert_eq!(next, "https://a.example/z");
///
/// let next = resolve_location("https://a.example/x", "//b.example/f").unwrap();
/// assert_eq!(next, "https://b.example/f");
/// ```
pub fn resolve_location(current: &str, location: &str) -> UrlResult<String> {
    let current = Url::parse(current).map_err(|e| UrlError::Parse(e.to_string()))?;
    let next = current
        .join(location.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    if next.scheme() != "http" && next.scheme() != "https" {
        return Err(UrlError::InvalidScheme(next.scheme().to_string()));
    }

    Ok(next.to_string())
}

/// Returns true if the string parses as an absolute http(s) URL with a host
pub fn is_http_url(candidate: &str) -> bool {
    match Url::parse(candidate.trim()) {
        Ok(url) => (url.scheme() == "http" || url.scheme() == "https") && url.host().is_some(),
        Err(_) => false,
    }
}

/// Finds a target URL smuggled inside one of the named query parameters
///
/// Gateways often redirect to `.../go?link=<real url>` instead of the file
/// itself. The parameter value is accepted when it is a URL after
/// percent-decoding, or after an additional base64 decode.
///
/// # Examples
///
/// ```
/// use link_resolver::url::embedded_target;
///
/// let params = vec!["link".to_string(), "url".to_string()];
/// let found = embedded_target(
///     "https://gw.example/go?link=https%3A%2F%2Fhost%2Ffile.mkv",
///     &params,
/// );
/// assert_eq!(found.as_deref(), Some("https://host/file.mkv"));
/// ```
pub fn embedded_target(url_str: &str, params: &[String]) -> Option<String> {
    let url = Url::parse(url_str).ok()?;

    for (key, value) in url.query_pairs() {
        if !params.iter().any(|p| p.eq_ignore_ascii_case(&key)) {
            continue;
        }

        let value = value.trim();
        if is_http_url(value) {
            return Some(value.to_string());
        }

        if let Ok(decoded) = decode_base64_text(value) {
            let decoded = decoded.trim();
            if is_http_url(decoded) {
                return Some(decoded.to_string());
            }
        }
    }

    None
}

/// Returns true if the URL path ends in a known media file extension
pub fn has_media_extension(url_str: &str) -> bool {
    let path = match Url::parse(url_str) {
        Ok(url) => url.path().to_lowercase(),
        Err(_) => return false,
    };
    MEDIA_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<String> {
        vec!["link".to_string(), "url".to_string()]
    }

    #[test]
    fn test_resolve_relative_location() {
        assert_eq!(
            resolve_location("https://a.example/dir/page", "next").unwrap(),
            "https://a.example/dir/next"
        );
    }

    #[test]
    fn test_resolve_absolute_location() {
        assert_eq!(
            resolve_location("https://a.example/page", "https://b.example/f.mkv").unwrap(),
            "https://b.example/f.mkv"
        );
    }

    #[test]
    fn test_resolve_rejects_javascript() {
        assert!(resolve_location("https://a.example/", "javascript:void(0)").is_err());
    }

    #[test]
    fn test_embedded_plain_param() {
        let found = embedded_target("https://gw.example/r?url=https://host/file.mkv", &params());
        assert_eq!(found.as_deref(), Some("https://host/file.mkv"));
    }

    #[test]
    fn test_embedded_param_case_insensitive() {
        let found = embedded_target("https://gw.example/r?LINK=https://host/f.mp4", &params());
        assert_eq!(found.as_deref(), Some("https://host/f.mp4"));
    }

    #[test]
    fn test_embedded_base64_param() {
        // "https://host/file.mkv"
        let found = embedded_target(
            "https://gw.example/r?link=aHR0cHM6Ly9ob3N0L2ZpbGUubWt2",
            &params(),
        );
        assert_eq!(found.as_deref(), Some("https://host/file.mkv"));
    }

    #[test]
    fn test_embedded_ignores_other_params() {
        assert_eq!(
            embedded_target("https://gw.example/r?next=https://host/f.mkv", &params()),
            None
        );
    }

    #[test]
    fn test_embedded_ignores_non_url_values() {
        assert_eq!(
            embedded_target("https://gw.example/r?link=abc", &params()),
            None
        );
    }

    #[test]
    fn test_media_extension() {
        assert!(has_media_extension("https://cdn.example/a/Movie.MKV"));
        assert!(has_media_extension("https://cdn.example/a/movie.mp4?token=1"));
        assert!(!has_media_extension("https://cdn.example/a/file.php"));
        assert!(!has_media_extension("not a url"));
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://host/x"));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url("mailto:a@b.c"));
    }
}
