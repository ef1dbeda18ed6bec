//! HTML helpers for host pages
//!
//! These extract:
//! - Download buttons (CSS selectors and anchor texts)
//! - The page title and quality text
//! - Embedded targets (iframes, meta refresh, script redirects)
//! - Raw media URLs anywhere in the body
//!
//! Everything here is synchronous and returns owned data, so no parsed
//! document is ever held across an await point.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A link found on a page, with the text it was shown under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub url: String,
    pub text: String,
}

/// Attributes that may carry a button's target, in order of preference
const LINK_ATTRIBUTES: &[&str] = &["href", "src", "data-href", "data-src", "data-url"];

static SCRIPT_REDIRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:window\.|document\.|top\.)?location(?:\.href)?\s*(?:=\s*|\.replace\(\s*|\.assign\(\s*)["']([^"']+)["']"#,
    )
    .expect("static regex")
});

static REFRESH_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)url\s*=\s*(.+)").expect("static regex"));

static MEDIA_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'<>\\]+\.(?:mp4|mkv|m3u8)(?:\?[^\s"'<>\\]*)?"#)
        .expect("static regex")
});

/// Returns the page title, trimmed
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Returns the text of the first element matching `selector`
pub fn select_text(html: &str, selector: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .find(|s| !s.is_empty())
}

/// Collects download buttons
///
/// Elements matched by `selectors` come first, then anchors whose text
/// contains one of `button_texts` (case-insensitive). Each URL is returned once,
/// at its first position.
pub fn extract_buttons(
    html: &str,
    base_url: &Url,
    selectors: &[String],
    button_texts: &[String],
) -> Vec<Button> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut buttons = Vec::new();

    let mut push = |element: ElementRef<'_>| {
        let Some(url) = LINK_ATTRIBUTES
            .iter()
            .filter_map(|attr| element.value().attr(attr))
            .find_map(|href| resolve_link(href, base_url))
        else {
            return;
        };

        if seen.insert(url.clone()) {
            let mut text = collapse_whitespace(&element.text().collect::<String>());
            if text.is_empty() {
                text = element.value().attr("title").unwrap_or_default().trim().to_string();
            }
            buttons.push(Button { url, text });
        }
    };

    for selector in selectors {
        match Selector::parse(selector) {
            Ok(selector) => document.select(&selector).for_each(&mut push),
            Err(e) => tracing::debug!(selector = %selector, error = ?e, "skipping bad selector"),
        }
    }

    let phrases: Vec<String> = button_texts
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.to_lowercase())
        .collect();

    if !phrases.is_empty() {
        if let Ok(anchors) = Selector::parse("a[href]") {
            for element in document.select(&anchors) {
                let text = element.text().collect::<String>().to_lowercase();
                if phrases.iter().any(|phrase| text.contains(phrase.as_str())) {
                    push(element);
                }
            }
        }
    }

    buttons
}

/// Finds the page's embedded target
///
/// Configured selectors are tried first, then `iframe[src]`, a meta refresh,
/// and finally a `location` assignment in inline script.
pub fn find_embed(html: &str, base_url: &Url, selectors: &[String]) -> Option<String> {
    let document = Html::parse_document(html);

    let mut candidates: Vec<&str> = selectors.iter().map(String::as_str).collect();
    candidates.push("iframe[src]");

    for selector in candidates {
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        let found = document.select(&selector).find_map(|element| {
            LINK_ATTRIBUTES
                .iter()
                .filter_map(|attr| element.value().attr(attr))
                .find_map(|href| resolve_link(href, base_url))
        });
        if found.is_some() {
            return found;
        }
    }

    if let Some(target) = meta_refresh(&document, base_url) {
        return Some(target);
    }

    SCRIPT_REDIRECT_RE
        .captures_iter(html)
        .find_map(|caps| resolve_link(&caps[1], base_url))
}

/// Scans raw text for absolute media URLs
///
/// JSON-escaped slashes are unescaped first. Results keep first-seen order.
pub fn scan_media_urls(body: &str) -> Vec<String> {
    let body = body.replace("\\/", "/");
    let mut seen = HashSet::new();

    MEDIA_URL_RE
        .find_iter(&body)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

fn meta_refresh(document: &Html, base_url: &Url) -> Option<String> {
    let selector = Selector::parse("meta[http-equiv][content]").ok()?;

    document
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr("http-equiv")
                .map(|v| v.eq_ignore_ascii_case("refresh"))
                .unwrap_or(false)
        })
        .find_map(|element| {
            let content = element.value().attr("content")?;
            let caps = REFRESH_URL_RE.captures(content)?;
            let target = caps[1].trim().trim_matches(|c| c == '\'' || c == '"');
            resolve_link(target, base_url)
        })
}

/// Resolves a link href to an absolute http(s) URL
///
/// Returns None for empty, fragment-only, `javascript:`, `mailto:`, `tel:`
/// and `data:` links.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute.to_string())
        }
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
