//! Feature extraction from free-form quality text

use once_cell::sync::Lazy;
use regex::Regex;

/// Vertical resolution class, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    Unknown,
    P360,
    P480,
    P720,
    P1080,
    P2160,
}

impl Resolution {
    pub fn rank(self) -> i64 {
        self as i64
    }
}

/// Video codec family, least preferred first
///
/// Widely compatible codecs rank above more compressed ones: a download that
/// plays everywhere beats a smaller one that may not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Codec {
    Unknown,
    Compressed,
    Compatible,
}

impl Codec {
    pub fn rank(self) -> i64 {
        self as i64
    }
}

static RESOLUTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(2160p|4k|uhd|1080p|fhd|720p|480p|360p)\b").expect("static regex")
});

static COMPRESSED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(x265|h\.?265|hevc|av1|vp9)\b").expect("static regex"));

static COMPATIBLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(x264|h\.?264|avc)\b").expect("static regex"));

static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:(?P<grouped>\d{1,3}(?:,\d{3})+(?:\.\d+)?)|(?P<plain>\d+(?:[.,]\d+)?))\s*(?P<unit>tib|tb|gib|gb|mib|mb|kib|kb)\b",
    )
    .expect("static regex")
});

/// Release names separate tokens with `_`, which `\b` treats as part of a word
fn tokenized(text: &str) -> String {
    text.replace('_', " ")
}

/// Finds the highest resolution mentioned in the text
pub fn detect_resolution(text: &str) -> Resolution {
    RESOLUTION_RE
        .find_iter(&tokenized(text))
        .map(|m| match m.as_str().to_lowercase().as_str() {
            "2160p" | "4k" | "uhd" => Resolution::P2160,
            "1080p" | "fhd" => Resolution::P1080,
            "720p" => Resolution::P720,
            "480p" => Resolution::P480,
            _ => Resolution::P360,
        })
        .max()
        .unwrap_or(Resolution::Unknown)
}

/// Detects the codec family; compatible wins when both are mentioned
pub fn detect_codec(text: &str) -> Codec {
    let text = tokenized(text);
    if COMPATIBLE_RE.is_match(&text) {
        Codec::Compatible
    } else if COMPRESSED_RE.is_match(&text) {
        Codec::Compressed
    } else {
        Codec::Unknown
    }
}

/// Parses the first size expression ("1.4 GB", "700MB", "850 MiB") into bytes
///
/// Decimal and binary suffixes are both treated as powers of 1024, which is
/// how hosting sites label sizes in practice. A comma followed by groups of
/// three digits separates thousands ("1,400 MB"); otherwise it is a decimal
/// comma ("2,5 GB").
pub fn parse_size(text: &str) -> Option<u64> {
    let tokens = tokenized(text);
    let caps = SIZE_RE.captures(&tokens)?;
    let number: f64 = match (caps.name("grouped"), caps.name("plain")) {
        (Some(grouped), _) => grouped.as_str().replace(',', "").parse().ok()?,
        (None, Some(plain)) => plain.as_str().replace(',', ".").parse().ok()?,
        (None, None) => return None,
    };
    let multiplier: f64 = match caps["unit"].to_lowercase().as_str() {
        "tb" | "tib" => 1024f64.powi(4),
        "gb" | "gib" => 1024f64.powi(3),
        "mb" | "mib" => 1024f64.powi(2),
        _ => 1024.0,
    };
    Some((number * multiplier) as u64)
}
