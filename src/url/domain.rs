use crate::{UrlError, UrlResult};
use url::Url;

/// Derives `scheme://host[:port]` from a URL string
///
/// Only http and https URLs are accepted. The host keeps the spelling it has
/// in `url_str`; `Url::parse` would lowercase it.
///
/// # Examples
///
/// ```
/// use link_resolver::url::base_url;
///
/// assert_eq!(base_url("https://hostA.example/x/y?z=1").unwrap(), "https://hostA.example");
/// assert_eq!(base_url("http://127.0.0.1:8080/a").unwrap(), "http://127.0.0.1:8080");
/// ```
pub fn base_url(url_str: &str) -> UrlResult<String> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let parsed_host = url.host_str().ok_or(UrlError::MissingHost)?;
    let host = host_as_written(url_str, parsed_host).unwrap_or(parsed_host);
    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Finds `host` in the authority of `url_str` with its original casing
///
/// Returns `None` when the written form differs by more than ASCII case,
/// e.g. for IDNA hosts.
fn host_as_written<'a>(url_str: &'a str, host: &str) -> Option<&'a str> {
    let (_, rest) = url_str.trim().split_once("://")?;
    let authority = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next()?;
    let authority = authority.rsplit('@').next()?;
    let written = authority.get(..host.len())?;
    written.eq_ignore_ascii_case(host).then_some(written)
}

/// Replaces the scheme, host and port of `url_str` with those of `base`
///
/// Path, query and fragment are kept. Used to point a reference at the live
/// domain of a host that has rotated away from the one in the reference.
pub fn rebase(url_str: &str, base: &str) -> UrlResult<String> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    let base = Url::parse(base).map_err(|e| UrlError::Parse(e.to_string()))?;

    let mut rebased = base.clone();
    rebased.set_path(url.path());
    rebased.set_query(url.query());
    rebased.set_fragment(url.fragment());
    Ok(rebased.to_string())
}
