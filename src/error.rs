use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-actionable failure categories. Every message a caller sees comes from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    CaptionsDisabled,
    NoTranscriptFound,
    ServiceUnavailable,
    RateLimited,
    RequestTimeout,
    NetworkError,
    Internal,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid or missing YouTube video ID.",
            ErrorKind::CaptionsDisabled => "Captions are disabled for this video.",
            ErrorKind::NoTranscriptFound => {
                "No transcript found for this video. The video may not have captions available."
            }
            ErrorKind::ServiceUnavailable => {
                "Unable to access video transcripts. This may be a temporary issue with our service."
            }
            ErrorKind::RateLimited => "Too many requests. Please try again later.",
            ErrorKind::RequestTimeout => {
                "Request timed out. The server might be experiencing high load or connectivity issues."
            }
            ErrorKind::NetworkError => "Network error. Please check your internet connection and try again.",
            ErrorKind::Internal => "Failed to fetch transcript. Please try again later.",
        }
    }

    pub fn status(self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NoTranscriptFound => 404,
            ErrorKind::RateLimited => 429,
            ErrorKind::CaptionsDisabled | ErrorKind::ServiceUnavailable => 503,
            ErrorKind::RequestTimeout => 504,
            ErrorKind::NetworkError => 502,
            ErrorKind::Internal => 500,
        }
    }

    /// Whether offering the user a retry action makes sense
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::InvalidInput | ErrorKind::CaptionsDisabled)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Failures raised by the caption scraper
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("no caption data found in watch page")]
    NoCaptionData,

    #[error("captions are disabled for this video")]
    CaptionsDisabled,

    #[error("caption manifest has no usable track URL")]
    MalformedManifest,

    #[error("upstream fetch failed with status {status}")]
    UpstreamFetchFailed { status: u16 },

    #[error("caption payload contained no events")]
    EmptyPayload,
}
