pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod primary;
pub mod scraper;
pub mod server;
pub mod service;
pub mod video_id;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};

pub use error::ErrorKind;
pub use video_id::{VideoId, resolve};

/// A single timed unit of transcript text. Timing is always milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    pub start: u64,
    pub duration: u64,
}

/// Outcome of one transcript request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptResult {
    pub success: bool,
    pub segments: Option<Vec<Segment>>,
    pub error_kind: Option<ErrorKind>,
    pub message: String,
}

impl TranscriptResult {
    pub fn ok(segments: Vec<Segment>) -> Self {
        Self {
            success: true,
            message: format!("Retrieved {} transcript segments", segments.len()),
            segments: Some(segments),
            error_kind: None,
        }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            success: false,
            segments: None,
            error_kind: Some(kind),
            message: kind.message().to_string(),
        }
    }

    /// HTTP status this result is served with
    pub fn status(&self) -> u16 {
        match self.error_kind {
            None => 200,
            Some(kind) => kind.status(),
        }
    }
}

/// Sort segments by start (stable) and drop those whose text is blank.
///
/// Timing is left untouched, so applying this twice is the same as applying it once.
pub fn normalize(mut segments: Vec<Segment>) -> Vec<Segment> {
    segments.retain(|s| !s.text.trim().is_empty());
    for segment in &mut segments {
        let trimmed = segment.text.trim();
        if trimmed.len() != segment.text.len() {
            segment.text = trimmed.to_string();
        }
    }
    segments.sort_by_key(|s| s.start);
    segments
}

/// Convert fractional seconds to whole milliseconds. Negative and non-finite values clamp to 0.
pub fn seconds_to_ms(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * 1000.0).round() as u64
}
