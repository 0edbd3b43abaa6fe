use std::time::Duration;

use log::{debug, warn};
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::server::TranscriptBody;
use crate::{ErrorKind, TranscriptResult, VideoId};

pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_secs(15);

/// Caller side of `GET /transcript`, with its own timeout
#[derive(Debug, Clone)]
pub struct TranscriptClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl TranscriptClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_CLIENT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Aborts after the client timeout. The server's own upstream work is not cancelled.
    pub async fn fetch_transcript(&self, video_id: &VideoId) -> TranscriptResult {
        let url = format!("{}/transcript", self.base_url);
        debug!("Fetching transcript from: {url}?videoId={video_id}");

        let request = async {
            let resp = self
                .client
                .get(&url)
                .query(&[("videoId", video_id.as_str())])
                .header(ACCEPT, "application/json")
                .header(CACHE_CONTROL, "no-cache")
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok((status, body))) => interpret(status, &body),
            Ok(Err(e)) if e.is_timeout() => {
                warn!("Request timed out: {e}");
                TranscriptResult::failed(ErrorKind::RequestTimeout)
            }
            Ok(Err(e)) => {
                warn!("Network error: {e}");
                TranscriptResult::failed(ErrorKind::NetworkError)
            }
            Err(_) => {
                warn!("Request timed out after {:?}", self.timeout);
                TranscriptResult::failed(ErrorKind::RequestTimeout)
            }
        }
    }
}

/// Re-derive the taxonomy from HTTP status and body
pub fn interpret(status: u16, body: &str) -> TranscriptResult {
    let parsed: Option<TranscriptBody> = serde_json::from_str(body).ok();
    let reported = parsed.as_ref().and_then(|b| b.error_kind);

    if (200..300).contains(&status) {
        return match parsed {
            Some(TranscriptBody {
                success: true,
                transcript: Some(segments),
                ..
            }) if !segments.is_empty() => TranscriptResult::ok(segments),
            Some(TranscriptBody { success: true, .. }) => TranscriptResult::failed(ErrorKind::NoTranscriptFound),
            _ => {
                warn!("API returned status {status} without a usable transcript");
                TranscriptResult::failed(reported.unwrap_or(ErrorKind::Internal))
            }
        };
    }

    warn!("API error: {status}");
    let kind = match status {
        400 => ErrorKind::InvalidInput,
        404 => ErrorKind::NoTranscriptFound,
        429 => ErrorKind::RateLimited,
        503 if reported == Some(ErrorKind::CaptionsDisabled) => ErrorKind::CaptionsDisabled,
        504 => ErrorKind::RequestTimeout,
        s if s >= 500 => ErrorKind::ServiceUnavailable,
        _ => reported.unwrap_or(ErrorKind::Internal),
    };
    TranscriptResult::failed(kind)
}
