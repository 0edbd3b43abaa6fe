use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::error::{ErrorKind, ScrapeError};
use crate::primary::{PrimaryEntry, PrimaryError, PrimaryFailure, PrimaryMethod};
use crate::scraper::CaptionScraper;
use crate::{Segment, TranscriptResult, VideoId, normalize, seconds_to_ms};

pub const MIN_DEADLINE: Duration = Duration::from_secs(8);
pub const MAX_DEADLINE: Duration = Duration::from_secs(15);
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

/// Convert primary-method entries (fractional seconds) to millisecond segments.
pub fn normalize_primary(entries: Vec<PrimaryEntry>) -> Vec<Segment> {
    let segments = entries
        .into_iter()
        .map(|e| Segment {
            text: e.text,
            start: seconds_to_ms(e.offset),
            duration: seconds_to_ms(e.duration),
        })
        .collect();
    normalize(segments)
}

/// Reduce the two tier failures to one taxonomy entry.
///
/// The primary error wins when it says something specific; the scraper can only
/// add the explicit empty-track marker or an upstream 429.
pub fn classify(primary: Option<&PrimaryError>, scrape: &ScrapeError) -> ErrorKind {
    match primary.map(PrimaryError::classify) {
        Some(PrimaryFailure::CaptionsDisabled) => return ErrorKind::CaptionsDisabled,
        Some(PrimaryFailure::NoTranscript) => return ErrorKind::NoTranscriptFound,
        _ => {}
    }

    match scrape {
        ScrapeError::CaptionsDisabled => ErrorKind::CaptionsDisabled,
        ScrapeError::UpstreamFetchFailed { status: 429 } => ErrorKind::RateLimited,
        _ if primary.map(PrimaryError::classify) == Some(PrimaryFailure::TooManyRequests) => ErrorKind::RateLimited,
        _ => ErrorKind::ServiceUnavailable,
    }
}

/// Two-tier transcript retrieval: primary method, then the caption scraper
pub struct TranscriptService {
    primary: Arc<dyn PrimaryMethod>,
    scraper: CaptionScraper,
    deadline: Duration,
}

impl TranscriptService {
    pub fn new(primary: Arc<dyn PrimaryMethod>, scraper: CaptionScraper) -> Self {
        Self {
            primary,
            scraper,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Overall deadline for both tiers, clamped to 8..=15 seconds
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline.clamp(MIN_DEADLINE, MAX_DEADLINE);
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub async fn get_transcript(&self, video_id: &VideoId) -> TranscriptResult {
        info!("Transcript requested for {video_id}");
        // Dropping the future on expiry cancels whichever fetch is in flight.
        match tokio::time::timeout(self.deadline, self.two_tier(video_id)).await {
            Ok(Ok(segments)) => {
                info!("Transcript for {video_id}: {} segments", segments.len());
                TranscriptResult::ok(segments)
            }
            Ok(Err(kind)) => {
                info!("Transcript for {video_id} failed: {kind}");
                TranscriptResult::failed(kind)
            }
            Err(_) => {
                warn!("Transcript for {video_id} exceeded {:?} deadline", self.deadline);
                TranscriptResult::failed(ErrorKind::RequestTimeout)
            }
        }
    }

    async fn two_tier(&self, video_id: &VideoId) -> Result<Vec<Segment>, ErrorKind> {
        let primary_err = match self.primary.fetch_transcript(video_id).await {
            Ok(entries) => {
                let segments = normalize_primary(entries);
                if !segments.is_empty() {
                    return Ok(segments);
                }
                warn!("Primary method returned no transcript for {video_id}");
                PrimaryError::new("No transcript found for this video")
            }
            Err(e) => {
                warn!("Primary method failed for {video_id}: {e}");
                e
            }
        };

        match self.scraper.scrape(video_id).await {
            Ok(segments) => {
                info!("Fallback scraper succeeded for {video_id}");
                Ok(segments)
            }
            Err(e) => {
                match e {
                    ScrapeError::MalformedManifest => warn!("Fallback for {video_id}: MalformedManifest ({e})"),
                    ScrapeError::EmptyPayload => warn!("Fallback for {video_id}: EmptyPayload ({e})"),
                    _ => warn!("Fallback for {video_id} failed: {e}"),
                }
                Err(classify(Some(&primary_err), &e))
            }
        }
    }
}
