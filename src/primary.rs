use std::sync::LazyLock;

use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::VideoId;
use crate::fetch::BROWSER_USER_AGENT;

/// One caption entry as the primary method reports it. Timing is fractional seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryEntry {
    pub text: String,
    pub offset: f64,
    pub duration: f64,
}

/// What a primary-method failure means for the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryFailure {
    CaptionsDisabled,
    NoTranscript,
    TooManyRequests,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PrimaryError {
    pub message: String,
}

impl PrimaryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Classify by message text. Keep every phrase match here so a change in the
    /// upstream wording only touches this function.
    pub fn classify(&self) -> PrimaryFailure {
        let msg = self.message.to_lowercase();
        if msg.contains("disabled on this video") || msg.contains("transcripts are disabled") {
            PrimaryFailure::CaptionsDisabled
        } else if msg.contains("could not find any transcript")
            || msg.contains("no transcripts are available")
            || msg.contains("no transcript found")
        {
            PrimaryFailure::NoTranscript
        } else if msg.contains("too many requests") {
            PrimaryFailure::TooManyRequests
        } else {
            PrimaryFailure::Other
        }
    }
}

/// The first retrieval tier. Implementations may do their own network access.
#[async_trait]
pub trait PrimaryMethod: Send + Sync {
    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Vec<PrimaryEntry>, PrimaryError>;
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Primary method backed by YouTube's InnerTube player API and the XML timed-text track
pub struct InnerTubePrimary {
    client: reqwest::Client,
    lang: String,
}

impl InnerTubePrimary {
    pub fn new(client: reqwest::Client, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
        }
    }

    async fn get_text(&self, url: &str, what: &str) -> Result<String, PrimaryError> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| PrimaryError::new(format!("failed to fetch {what}: {e}")))?;
        if resp.status().as_u16() == 429 {
            return Err(PrimaryError::new("YouTube is receiving too many requests from this IP"));
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| PrimaryError::new(format!("failed to fetch {what}: {e}")))?;
        resp.text()
            .await
            .map_err(|e| PrimaryError::new(format!("failed to read {what}: {e}")))
    }
}

#[async_trait]
impl PrimaryMethod for InnerTubePrimary {
    async fn fetch_transcript(&self, video_id: &VideoId) -> Result<Vec<PrimaryEntry>, PrimaryError> {
        let watch_url = video_id.watch_url();
        debug!("Fetching watch page: {watch_url}");
        let page_html = self.get_text(&watch_url, "watch page").await?;

        if page_html.contains("class=\"g-recaptcha\"") {
            return Err(PrimaryError::new("YouTube is receiving too many requests from this IP"));
        }

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id.as_str()
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", BROWSER_USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| PrimaryError::new(format!("player request failed: {e}")))?
            .json()
            .await
            .map_err(|e| PrimaryError::new(format!("player response unreadable: {e}")))?;

        let track = select_track(resp, &self.lang, video_id)?;
        debug!("Using caption track: lang={}", track.language_code);

        let caption_xml = self.get_text(&track.base_url, "caption track").await?;
        parse_caption_xml(&caption_xml)
    }
}

fn select_track(
    resp: InnerTubePlayerResponse,
    lang: &str,
    video_id: &VideoId,
) -> Result<CaptionTrack, PrimaryError> {
    let unplayable = resp
        .playability_status
        .as_ref()
        .filter(|p| p.status.as_deref().is_some_and(|s| s != "OK"));
    if let (Some(status), None) = (unplayable, &resp.captions) {
        let reason = status.reason.as_deref().unwrap_or("unplayable");
        return Err(PrimaryError::new(format!(
            "The video is no longer available ({video_id}): {reason}"
        )));
    }

    let renderer = resp
        .captions
        .and_then(|c| c.player_captions_tracklist_renderer)
        .ok_or_else(|| PrimaryError::new(format!("Transcript is disabled on this video ({video_id})")))?;

    let mut tracks = renderer.caption_tracks.unwrap_or_default();
    if tracks.is_empty() {
        return Err(PrimaryError::new(format!(
            "Could not find any transcript for this video ({video_id})"
        )));
    }

    // Requested language if present, otherwise the first track
    let index = tracks.iter().position(|t| t.language_code == lang).unwrap_or(0);
    Ok(tracks.swap_remove(index))
}

static API_KEY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#,
        r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static API key pattern"))
    .collect()
});

fn extract_api_key(html: &str) -> Result<String, PrimaryError> {
    API_KEY_PATTERNS
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| PrimaryError::new("could not extract InnerTube API key from watch page"))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<PrimaryEntry>, PrimaryError> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut current: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = 0.0;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"start" => start = value.parse::<f64>().ok(),
                        b"dur" => dur = value.parse::<f64>().unwrap_or(0.0),
                        _ => {}
                    }
                }
                current = start.map(|s| (s, dur));
            }
            Ok(Event::Text(ref e)) => {
                if let Some((offset, duration)) = current.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                    if !text.is_empty() {
                        entries.push(PrimaryEntry {
                            text,
                            offset,
                            duration,
                        });
                    }
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(PrimaryError::new(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(entries)
}
