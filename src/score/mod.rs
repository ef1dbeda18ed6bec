//! Quality scoring and ranking
//!
//! A score is built additively from independent tiers. The codec and
//! resolution tier moves in steps of [`TIER_STEP`]; the file-size and server
//! bonuses together stay below one step, so they only ever reorder candidates
//! inside the same tier.
//!
//! Scoring is a pure function of the candidate's fields.

mod tiers;

pub use tiers::{detect_codec, detect_resolution, parse_size, Codec, Resolution};

use crate::model::{CandidateLink, ScoredLink};
use std::collections::HashMap;

/// Score distance between adjacent codec/resolution tiers
pub const TIER_STEP: i64 = 10_000;

const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * MIB;

/// Upper size bounds (inclusive) and their bonus. Anything under 20 MiB is
/// treated as a sample or a broken file and gets the smallest bonus.
const SIZE_BUCKETS: &[(u64, i64)] = &[
    (20 * MIB, 50),
    (700 * MIB, 500),
    (3 * GIB / 2, 400),
    (3 * GIB, 300),
    (6 * GIB, 200),
    (12 * GIB, 100),
];

/// Bonus for sizes above the last bucket
const HUGE_FILE_BONUS: i64 = 50;

/// Server label fragments and their bonus, checked in order
const SERVER_TIERS: &[(&str, i64)] = &[
    ("instant", 90),
    ("direct", 80),
    ("10gbps", 60),
    ("fast", 60),
    ("cloud", 60),
    ("download", 20),
];

/// Computes the ranking score of a candidate
///
/// # Examples
///
/// ```
/// use link_resolver::model::CandidateLink;
/// use link_resolver::score::score;
///
/// let h264 = CandidateLink::new("https://cdn.example/a.mkv", "host").with_quality_text("1080p x264");
/// let hevc = CandidateLink::new("https://cdn.example/b.mkv", "host").with_quality_text("1080p x265");
/// assert!(score(&h264) > score(&hevc));
/// ```
pub fn score(candidate: &CandidateLink) -> i64 {
    let text = quality_text(candidate);
    tier(&text) * TIER_STEP + size_bonus(candidate, &text) + server_bonus(candidate)
}

/// Attaches a score to a candidate
pub fn score_link(candidate: CandidateLink, discovery_index: usize) -> ScoredLink {
    ScoredLink {
        score: score(&candidate),
        link: candidate,
        discovery_index,
    }
}

/// Collapses duplicate URLs and sorts by score, best first
///
/// Of several links with the same URL, the highest score survives, and the
/// earliest discovered among equals. Ties between different URLs keep
/// discovery order.
pub fn rank(links: Vec<ScoredLink>) -> Vec<ScoredLink> {
    let mut best: HashMap<String, ScoredLink> = HashMap::new();

    for link in links {
        match best.get(&link.link.url) {
            Some(existing)
                if existing.score > link.score
                    || (existing.score == link.score
                        && existing.discovery_index <= link.discovery_index) => {}
            _ => {
                best.insert(link.link.url.clone(), link);
            }
        }
    }

    let mut ranked: Vec<ScoredLink> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.discovery_index.cmp(&b.discovery_index))
    });
    ranked
}

/// Codec and resolution tier; higher is better
pub fn tier(text: &str) -> i64 {
    let codecs = 3;
    detect_resolution(text).rank() * codecs + detect_codec(text).rank()
}

fn quality_text(candidate: &CandidateLink) -> String {
    let file_name = candidate
        .url
        .split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .unwrap_or_default();

    format!(
        "{} {} {}",
        candidate.raw_quality_text, candidate.label, file_name
    )
}

fn size_bonus(candidate: &CandidateLink, text: &str) -> i64 {
    let Some(size) = candidate.size_bytes.or_else(|| parse_size(text)) else {
        return 0;
    };

    SIZE_BUCKETS
        .iter()
        .find(|(limit, _)| size <= *limit)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(HUGE_FILE_BONUS)
}

fn server_bonus(candidate: &CandidateLink) -> i64 {
    let label = format!("{} {}", candidate.label, candidate.source_tag).to_lowercase();

    SERVER_TIERS
        .iter()
        .find(|(fragment, _)| label.contains(fragment))
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0)
}
