use std::sync::{Arc, LazyLock};

use log::{debug, warn};
use regex::Regex;
use serde::Deserialize;

use crate::cache::ResponseCache;
use crate::error::ScrapeError;
use crate::fetch::{Fetch, FetchOptions};
use crate::{Segment, VideoId};

static TRACKLIST_MARKER: &str = "\"playerCaptionsTracklistRenderer\"";

static CAPTION_TRACKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*\["#).expect("static caption tracks pattern"));

static EMPTY_TRACKS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""captionTracks"\s*:\s*\[\s*\]"#).expect("static empty tracks pattern"));

static FIRST_TRACKS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"captionTracks"\s*:\s*\[\s*\{(.*?)\}\s*\]"#).expect("static track list pattern")
});

static BASE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""baseUrl"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("static base URL pattern"));

/// Locate the caption track list embedded in a watch page.
///
/// This is the only code that depends on YouTube's page markup. It returns the
/// text of the track list (without the surrounding brackets) or the reason the
/// page has no usable list.
pub fn extract_manifest(page: &str) -> Result<&str, ScrapeError> {
    let has_renderer = page.contains(TRACKLIST_MARKER);
    let has_tracks = CAPTION_TRACKS_RE.is_match(page);

    if !has_renderer && !has_tracks {
        return Err(ScrapeError::NoCaptionData);
    }
    if EMPTY_TRACKS_RE.is_match(page) || !has_tracks {
        return Err(ScrapeError::CaptionsDisabled);
    }

    FIRST_TRACKS_RE
        .captures(page)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ScrapeError::MalformedManifest)
}

/// The first track's `baseUrl`, with JSON and HTML escapes undone
pub fn extract_base_url(manifest: &str) -> Result<String, ScrapeError> {
    let raw = BASE_URL_RE
        .captures(manifest)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(ScrapeError::MalformedManifest)?;

    let unescaped = raw.replace("\\u0026", "&").replace("\\/", "/");
    let url = html_escape::decode_html_entities(&unescaped).trim().to_string();
    if url.is_empty() {
        return Err(ScrapeError::MalformedManifest);
    }
    Ok(url)
}

/// Ask for the json3 payload. A `fmt`/`format` parameter naming a JSON format is
/// kept; any other format value (srv3, vtt, ...) is replaced with `fmt=json3`.
pub fn ensure_json_format(url: &str) -> String {
    let (base, query) = url.split_once('?').unwrap_or((url, ""));
    let is_format = |pair: &str| matches!(pair.split('=').next(), Some("fmt" | "format"));

    let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    let json_requested = params
        .iter()
        .filter(|p| is_format(p))
        .any(|p| p.split_once('=').is_some_and(|(_, v)| v.contains("json")));
    if json_requested {
        return url.to_string();
    }

    params.retain(|p| !is_format(p));
    params.push("fmt=json3");
    format!("{base}?{}", params.join("&"))
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: f64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: f64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

fn whole_ms(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Turn a json3 timed-text payload into segments. Timing is already milliseconds.
pub fn parse_timed_text(body: &str) -> Result<Vec<Segment>, ScrapeError> {
    if body.trim().is_empty() {
        return Err(ScrapeError::EmptyPayload);
    }

    let payload: TimedText = serde_json::from_str(body).map_err(|e| {
        warn!("Caption payload is not valid json3: {e}");
        ScrapeError::EmptyPayload
    })?;

    if payload.events.is_empty() {
        return Err(ScrapeError::EmptyPayload);
    }

    let segments: Vec<Segment> = payload
        .events
        .into_iter()
        .filter(|event| !event.segs.is_empty())
        .filter_map(|event| {
            let text = event
                .segs
                .iter()
                .map(|s| s.utf8.as_str())
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            (!text.is_empty()).then(|| Segment {
                text,
                start: whole_ms(event.start_ms),
                duration: whole_ms(event.duration_ms),
            })
        })
        .collect();

    let segments = crate::normalize(segments);
    if segments.is_empty() {
        return Err(ScrapeError::EmptyPayload);
    }
    Ok(segments)
}

/// Fallback tier: scrape the caption track straight out of the watch page
pub struct CaptionScraper {
    fetcher: Arc<dyn Fetch>,
    cache: Arc<ResponseCache>,
    opts: FetchOptions,
}

impl CaptionScraper {
    pub fn new(fetcher: Arc<dyn Fetch>, cache: Arc<ResponseCache>) -> Self {
        Self {
            fetcher,
            cache,
            opts: FetchOptions::proxied(),
        }
    }

    pub async fn scrape(&self, video_id: &VideoId) -> Result<Vec<Segment>, ScrapeError> {
        let watch_url = video_id.watch_url();
        debug!("Scraping watch page: {watch_url}");

        let page = self
            .fetcher
            .fetch(&watch_url, self.opts)
            .await
            .map_err(|e| {
                warn!("Watch page fetch failed: {e}");
                ScrapeError::UpstreamFetchFailed { status: e.status() }
            })?;

        let manifest = extract_manifest(&page.body)?;
        let caption_url = ensure_json_format(&extract_base_url(manifest)?);
        debug!("Caption payload URL: {caption_url}");

        let payload = self.fetch_cached(&caption_url).await?;
        parse_timed_text(&payload)
    }

    async fn fetch_cached(&self, url: &str) -> Result<String, ScrapeError> {
        if let Some(entry) = self.cache.get(url) {
            return Ok(entry.body);
        }

        let resp = self.fetcher.fetch(url, self.opts).await.map_err(|e| {
            warn!("Caption payload fetch failed: {e}");
            ScrapeError::UpstreamFetchFailed { status: e.status() }
        })?;

        self.cache
            .insert(url, resp.body.clone(), resp.content_type.unwrap_or_default());
        Ok(resp.body)
    }
}
