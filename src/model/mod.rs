//! Values flowing through a resolution call
//!
//! References come in from the caller, candidates are produced by host
//! strategies, and scored links go back out.

mod candidate;
mod reference;

pub use candidate::{is_streaming_url, CandidateLink, MediaType, ScoredLink, SubtitleTrack};
pub use reference::SourceReference;
