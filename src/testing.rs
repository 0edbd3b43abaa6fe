//! Test doubles for the network-facing traits, plus captured fixtures.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::VideoId;
use crate::fetch::{Fetch, FetchError, FetchOptions, FetchedResponse};
use crate::primary::{PrimaryEntry, PrimaryError, PrimaryMethod};

pub const WATCH_PAGE: &str = include_str!("../tests/fixtures/watch_page.html");
pub const WATCH_PAGE_CAPTIONS_DISABLED: &str = include_str!("../tests/fixtures/watch_page_captions_disabled.html");
pub const WATCH_PAGE_NO_CAPTIONS: &str = include_str!("../tests/fixtures/watch_page_no_captions.html");
pub const TIMED_TEXT: &str = include_str!("../tests/fixtures/timedtext.json3");

/// Build a json3 payload from `(tStartMs, dDurationMs, segs)` triples
pub fn json3(events: &[(u64, Option<u64>, Vec<&str>)]) -> String {
    let events: Vec<serde_json::Value> = events
        .iter()
        .map(|(start, duration, segs)| {
            let mut event = serde_json::json!({
                "tStartMs": start,
                "segs": segs.iter().map(|s| serde_json::json!({ "utf8": s })).collect::<Vec<_>>(),
            });
            if let Some(d) = duration {
                event["dDurationMs"] = serde_json::json!(d);
            }
            event
        })
        .collect();
    serde_json::json!({ "wireMagic": "pb3", "events": events }).to_string()
}

/// Scripted [`Fetch`] that answers by URL prefix and records every call
#[derive(Default)]
pub struct FakeFetcher {
    routes: Vec<(String, Result<FetchedResponse, FetchError>)>,
    calls: Mutex<Vec<(String, FetchOptions)>>,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, prefix: &str, response: Result<FetchedResponse, FetchError>) -> Self {
        self.routes.push((prefix.to_string(), response));
        self
    }

    pub fn page(self, prefix: &str, body: &str) -> Self {
        self.body(prefix, body, "text/html; charset=utf-8")
    }

    pub fn json(self, prefix: &str, body: &str) -> Self {
        self.body(prefix, body, "application/json; charset=UTF-8")
    }

    pub fn body(self, prefix: &str, body: &str, content_type: &str) -> Self {
        self.respond(
            prefix,
            Ok(FetchedResponse {
                status: 200,
                content_type: Some(content_type.to_string()),
                body: body.to_string(),
            }),
        )
    }

    pub fn fail(self, prefix: &str, status: u16) -> Self {
        self.respond(
            prefix,
            Err(FetchError::Status {
                url: prefix.to_string(),
                status,
            }),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|u| u.starts_with(prefix)).count()
    }

    pub fn options(&self) -> Vec<FetchOptions> {
        self.calls.lock().unwrap().iter().map(|(_, o)| *o).collect()
    }
}

#[async_trait]
impl Fetch for FakeFetcher {
    async fn fetch(&self, url: &str, opts: FetchOptions) -> Result<FetchedResponse, FetchError> {
        self.calls.lock().unwrap().push((url.to_string(), opts));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.routes
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            })
    }
}

/// Scripted [`PrimaryMethod`]
pub struct FakePrimary {
    result: Result<Vec<PrimaryEntry>, PrimaryError>,
    delay: Option<Duration>,
    calls: Mutex<usize>,
}

impl FakePrimary {
    pub fn ok(entries: Vec<PrimaryEntry>) -> Self {
        Self {
            result: Ok(entries),
            delay: None,
            calls: Mutex::new(0),
        }
    }

    pub fn err(message: &str) -> Self {
        Self {
            result: Err(PrimaryError::new(message)),
            delay: None,
            calls: Mutex::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub fn entry(text: &str, offset: f64, duration: f64) -> PrimaryEntry {
    PrimaryEntry {
        text: text.to_string(),
        offset,
        duration,
    }
}

#[async_trait]
impl PrimaryMethod for FakePrimary {
    async fn fetch_transcript(&self, _video_id: &VideoId) -> Result<Vec<PrimaryEntry>, PrimaryError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.result.clone()
    }
}

/// Serve `app` on an ephemeral loopback port and return its base URL
pub async fn spawn(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}
