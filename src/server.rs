use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use eyre::{Result, WrapErr};
use log::{info, warn};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::fetch::{Fetch, FetchError, FetchOptions, HttpFetcher};
use crate::primary::InnerTubePrimary;
use crate::scraper::CaptionScraper;
use crate::service::TranscriptService;
use crate::{ErrorKind, Segment, TranscriptResult, resolve};

/// JSON body of `/transcript` responses, shared with the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBody {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Vec<Segment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl From<TranscriptResult> for TranscriptBody {
    fn from(result: TranscriptResult) -> Self {
        if result.success {
            TranscriptBody {
                success: true,
                transcript: result.segments,
                message: None,
                error_kind: None,
            }
        } else {
            TranscriptBody {
                success: false,
                transcript: None,
                message: Some(result.message),
                error_kind: result.error_kind,
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TranscriptService>,
    pub fetcher: Arc<dyn Fetch>,
}

#[derive(Debug, Deserialize)]
struct TranscriptQuery {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

fn failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "success": false, "message": message })),
    )
        .into_response()
}

fn result_response(result: TranscriptResult) -> Response {
    let status = StatusCode::from_u16(result.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(TranscriptBody::from(result))).into_response()
}

async fn transcript(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TranscriptQuery>, QueryRejection>,
) -> Response {
    let raw = match query {
        Ok(Query(query)) => query.video_id.unwrap_or_default(),
        Err(e) => {
            info!("Rejected transcript request: {e}");
            return result_response(TranscriptResult::failed(ErrorKind::InvalidInput));
        }
    };
    let Some(video_id) = resolve(&raw) else {
        info!("Rejected transcript request, videoId={raw:?}");
        return result_response(TranscriptResult::failed(ErrorKind::InvalidInput));
    };

    result_response(state.service.get_transcript(&video_id).await)
}

/// True when `url` is an http(s) URL whose host is youtube.com, youtu.be or a subdomain
fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    ["youtube.com", "youtu.be"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

async fn proxy(State(state): State<Arc<AppState>>, query: Result<Query<ProxyQuery>, QueryRejection>) -> Response {
    let url = query.ok().and_then(|Query(q)| q.url);
    let Some(url) = url.filter(|u| !u.trim().is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "URL parameter is required");
    };
    if !is_youtube_url(&url) {
        warn!("[proxy] Refused non-YouTube URL: {url}");
        return failure(StatusCode::BAD_REQUEST, "Only YouTube URLs are supported");
    }

    info!("[proxy] Fetching: {url}");
    // The relay always goes direct, never back through itself.
    match state.fetcher.fetch(&url, FetchOptions::direct()).await {
        Ok(resp) => {
            let content_type = resp
                .content_type
                .unwrap_or_else(|| "text/plain; charset=utf-8".to_string());
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], resp.body).into_response()
        }
        Err(FetchError::Status { status, .. }) => {
            warn!("[proxy] {url} returned {status}");
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            failure(code, &format!("Failed to fetch from YouTube: {code}"))
        }
        Err(e) => {
            warn!("[proxy] {e}");
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to proxy request to YouTube")
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "message": "YouTube transcript service is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    failure(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    warn!("Handler panicked");
    result_response(TranscriptResult::failed(ErrorKind::Internal))
}

/// Build the HTTP router over an assembled state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/transcript",
            get(transcript).options(preflight).fallback(method_not_allowed),
        )
        .route("/proxy", get(proxy).options(preflight).fallback(method_not_allowed))
        .route("/health", get(health).options(preflight).fallback(method_not_allowed))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Wire the real fetcher, cache, primary method and scraper from config
pub fn build_state(config: &Config) -> Result<AppState> {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .wrap_err("failed to build HTTP client")?;

    let fetcher: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(client.clone(), config.relay_url.clone()));
    let cache = Arc::new(ResponseCache::new(config.cache_ttl(), config.cache_capacity()));
    let primary = Arc::new(InnerTubePrimary::new(client, config.lang()));
    let scraper = CaptionScraper::new(fetcher.clone(), cache);
    let service = TranscriptService::new(primary, scraper).with_deadline(config.deadline());

    Ok(AppState {
        service: Arc::new(service),
        fetcher,
    })
}

/// Bind and run the service until the process is stopped
pub async fn serve(config: &Config) -> Result<()> {
    let state = build_state(config)?;
    let bind = config.bind();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .wrap_err_with(|| format!("failed to bind {bind}"))?;
    info!("Listening on {bind} (deadline {:?})", state.service.deadline());
    axum::serve(listener, router(state)).await.wrap_err("server error")?;
    Ok(())
}
