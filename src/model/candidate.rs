use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest extensions, matched anywhere in the URL (proxies pass them in the query)
const MANIFEST_EXTENSIONS: &[&str] = &[".m3u8", ".mpd"];

/// Path segments used by HLS and DASH packagers
const STREAMING_SEGMENTS: &[&str] = &["/hls/", "/dash/"];

/// How a candidate is meant to be consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// A plain file download
    Direct,
    /// A streaming manifest
    Hls,
}

impl MediaType {
    /// Infers the media type from the URL's markers
    pub fn from_url(url: &str) -> Self {
        if is_streaming_url(url) {
            Self::Hls
        } else {
            Self::Direct
        }
    }
}

/// Returns true if the URL points at an HLS or DASH manifest
///
/// Manifest extensions count wherever they appear, including the query of a
/// proxied player URL. Packager directories only count as path segments.
///
/// # Examples
///
/// ```
/// use link_resolver::model::is_streaming_url;
///
/// assert!(is_streaming_url("https://cdn.example/v/master.m3u8"));
/// assert!(is_streaming_url("https://cdn.example/hls/720/index"));
/// assert!(is_streaming_url("https://cdn.example/play?file=master.m3u8"));
/// assert!(!is_streaming_url("https://cdn.example/movie.mkv"));
/// ```
pub fn is_streaming_url(url: &str) -> bool {
    let lowered = url.to_lowercase();
    if MANIFEST_EXTENSIONS.iter().any(|ext| lowered.contains(ext)) {
        return true;
    }

    let path = match ::url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => lowered,
    };
    STREAMING_SEGMENTS.iter().any(|segment| path.contains(segment))
}

/// A resolved URL plus what the strategy learned about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    /// Ready-to-fetch media URL
    pub url: String,

    /// Human-readable label (button text, server name)
    pub label: String,

    /// Name of the host profile that produced this candidate
    pub source_tag: String,

    /// Direct download or streaming manifest
    pub media_type: MediaType,

    /// Headers the caller must send when fetching the URL
    pub headers: BTreeMap<String, String>,

    /// File size in bytes, when the host announced it
    pub size_bytes: Option<u64>,

    /// Free text carrying resolution, codec and size hints
    pub raw_quality_text: String,
}

impl CandidateLink {
    /// Creates a candidate with the media type inferred from the URL
    pub fn new(url: impl Into<String>, source_tag: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            media_type: MediaType::from_url(&url),
            url,
            label: String::new(),
            source_tag: source_tag.into(),
            headers: BTreeMap::new(),
            size_bytes: None,
            raw_quality_text: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_quality_text(mut self, text: impl Into<String>) -> Self {
        self.raw_quality_text = text.into();
        self
    }

    pub fn with_size(mut self, size_bytes: Option<u64>) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Returns true if this candidate is a streaming manifest
    pub fn is_streaming(&self) -> bool {
        self.media_type == MediaType::Hls || is_streaming_url(&self.url)
    }
}

/// A candidate with its ranking score attached
///
/// Ordering is by `score` descending, ties broken by `discovery_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredLink {
    #[serde(flatten)]
    pub link: CandidateLink,

    pub score: i64,

    /// Position at which the aggregator first received this candidate
    pub discovery_index: usize,
}

/// A subtitle track found alongside a manifest
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub language: String,
    pub url: String,
}
