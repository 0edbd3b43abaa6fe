use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use thiserror::Error;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Route through the same-origin relay when one is configured
    pub via_proxy: bool,
}

impl FetchOptions {
    pub fn direct() -> Self {
        Self { via_proxy: false }
    }

    pub fn proxied() -> Self {
        Self { via_proxy: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
}

impl FetchError {
    /// HTTP status of the failure, 0 when the request never got a response
    pub fn status(&self) -> u16 {
        match self {
            FetchError::Status { status, .. } => *status,
            FetchError::Transport { .. } => 0,
        }
    }
}

/// Outbound GET with a browser-like request signature
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str, opts: FetchOptions) -> Result<FetchedResponse, FetchError>;
}

/// reqwest-backed fetcher, optionally relaying through `{relay}/proxy?url=...`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    relay: Option<String>,
}

impl HttpFetcher {
    pub fn new(client: reqwest::Client, relay: Option<String>) -> Self {
        let relay = relay.map(|r| r.trim_end_matches('/').to_string());
        Self { client, relay }
    }

    /// The URL actually requested for `url` under `opts`
    pub fn effective_url(&self, url: &str, opts: FetchOptions) -> Result<String, FetchError> {
        match (&self.relay, opts.via_proxy) {
            (Some(relay), true) => Url::parse_with_params(&format!("{relay}/proxy"), &[("url", url)])
                .map(String::from)
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    reason: format!("invalid relay URL: {e}"),
                }),
            _ => Ok(url.to_string()),
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str, opts: FetchOptions) -> Result<FetchedResponse, FetchError> {
        let target = self.effective_url(url, opts)?;
        debug!("GET {target}");

        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let resp = self
            .client
            .get(&target)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, BROWSER_ACCEPT)
            .header(ACCEPT_LANGUAGE, BROWSER_ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            debug!("GET {target} -> {status}");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await.map_err(transport)?;

        Ok(FetchedResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderMap, StatusCode};
    use axum::{Json, Router, routing::get};

    use super::*;
    use crate::cache::ResponseCache;
    use crate::scraper::CaptionScraper;
    use crate::server::{AppState, router};
    use crate::service::TranscriptService;
    use crate::testing::{FakeFetcher, FakePrimary, spawn};

    fn upstream() -> Router {
        Router::new()
            .route(
                "/echo",
                get(|headers: HeaderMap| async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    };
                    Json(serde_json::json!({
                        "userAgent": header("user-agent"),
                        "accept": header("accept"),
                        "acceptLanguage": header("accept-language"),
                    }))
                }),
            )
            .route("/limited", get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }))
            .route(
                "/page",
                get(|| async { ([("content-type", "text/html; charset=utf-8")], "<html>ok</html>") }),
            )
    }

    #[tokio::test]
    async fn test_fetch_sends_browser_headers() {
        let base = spawn(upstream()).await;
        let f = HttpFetcher::new(reqwest::Client::new(), None);
        let resp = f.fetch(&format!("{base}/echo"), FetchOptions::direct()).await.unwrap();
        assert_eq!(resp.status, 200);

        let seen: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(seen["userAgent"], BROWSER_USER_AGENT);
        assert_eq!(seen["accept"], BROWSER_ACCEPT);
        assert_eq!(seen["acceptLanguage"], BROWSER_ACCEPT_LANGUAGE);
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_status_error() {
        let base = spawn(upstream()).await;
        let f = HttpFetcher::new(reqwest::Client::new(), None);
        let url = format!("{base}/limited");
        let err = f.fetch(&url, FetchOptions::direct()).await.unwrap_err();
        assert_eq!(err, FetchError::Status { url, status: 429 });
    }

    #[tokio::test]
    async fn test_fetch_keeps_content_type() {
        let base = spawn(upstream()).await;
        let f = HttpFetcher::new(reqwest::Client::new(), None);
        let resp = f.fetch(&format!("{base}/page"), FetchOptions::direct()).await.unwrap();
        assert_eq!(resp.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(resp.body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_transport() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let f = HttpFetcher::new(reqwest::Client::new(), None);
        let err = f.fetch(&format!("http://{addr}/"), FetchOptions::direct()).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
        assert_eq!(err.status(), 0);
    }

    fn relay(upstream: Arc<FakeFetcher>) -> Router {
        let scraper = CaptionScraper::new(upstream.clone(), Arc::new(ResponseCache::default()));
        router(AppState {
            service: Arc::new(TranscriptService::new(Arc::new(FakePrimary::ok(vec![])), scraper)),
            fetcher: upstream,
        })
    }

    #[tokio::test]
    async fn test_fetch_through_relay() {
        let watch = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        let upstream = Arc::new(FakeFetcher::new().page("https://www.youtube.com/watch", "<html>relayed</html>"));
        let base = spawn(relay(upstream.clone())).await;

        let f = HttpFetcher::new(reqwest::Client::new(), Some(base));
        let resp = f.fetch(watch, FetchOptions::proxied()).await.unwrap();
        assert_eq!(resp.body, "<html>relayed</html>");
        assert_eq!(resp.content_type.as_deref(), Some("text/html; charset=utf-8"));
        assert_eq!(upstream.calls(), vec![watch.to_string()]);
        assert_eq!(upstream.options(), vec![FetchOptions::direct()]);
    }

    #[tokio::test]
    async fn test_relay_upstream_status_reaches_caller() {
        let upstream = Arc::new(FakeFetcher::new().fail("https://www.youtube.com/watch", 429));
        let base = spawn(relay(upstream)).await;

        let f = HttpFetcher::new(reqwest::Client::new(), Some(base));
        let err = f
            .fetch("https://www.youtube.com/watch?v=dQw4w9WgXcQ", FetchOptions::proxied())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 429);
    }

    #[test]
    fn test_direct_when_no_relay() {
        let f = HttpFetcher::new(reqwest::Client::new(), None);
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(f.effective_url(url, FetchOptions::proxied()).unwrap(), url);
    }

    #[test]
    fn test_direct_when_proxy_not_requested() {
        let f = HttpFetcher::new(reqwest::Client::new(), Some("http://localhost:3000".into()));
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(f.effective_url(url, FetchOptions::direct()).unwrap(), url);
    }

    #[test]
    fn test_relay_url_encodes_target() {
        let f = HttpFetcher::new(reqwest::Client::new(), Some("http://localhost:3000/".into()));
        let url = "https://www.youtube.com/api/timedtext?v=abc&lang=en";
        let effective = f.effective_url(url, FetchOptions::proxied()).unwrap();
        assert!(effective.starts_with("http://localhost:3000/proxy?url="));
        assert!(effective.contains("https%3A%2F%2Fwww.youtube.com%2Fapi%2Ftimedtext%3Fv%3Dabc%26lang%3Den"));
    }

    #[test]
    fn test_invalid_relay_is_transport_error() {
        let f = HttpFetcher::new(reqwest::Client::new(), Some("not a url".into()));
        let err = f.effective_url("https://youtu.be/x", FetchOptions::proxied()).unwrap_err();
        assert_eq!(err.status(), 0);
    }

    #[test]
    fn test_error_status() {
        let e = FetchError::Status {
            url: "u".into(),
            status: 429,
        };
        assert_eq!(e.status(), 429);
    }
}
