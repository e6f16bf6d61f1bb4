//! Local HTTP API consumed by the browser extension.
//!
//! Routes:
//! - `POST /api/download` runs one extraction
//! - `GET /api/proxy?url=` streams CDN media with Instagram headers
//! - `GET /api/health` liveness check
//! - `GET|DELETE /api/state` current download state

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use igcore::config;
use igcore::driver::SessionCookie;
use igcore::{AppResult, ErrorCode, ExtractionResult, Extractor};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use url::Url;

use crate::state::StateStore;

/// Registrable domains of the Instagram CDN; the proxy fetches only from
/// these or their subdomains.
const PROXY_DOMAINS: &[&str] = &["cdninstagram.com", "fbcdn.net"];

const MAX_PROXY_REDIRECTS: usize = 5;

const INSTAGRAM_REFERER: &str = "https://www.instagram.com/";

/// Shared state for the API server.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<Extractor>,
    pub downloads: StateStore,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(extractor: Arc<Extractor>, downloads: StateStore) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config::browser::USER_AGENT)
            .connect_timeout(config::operation_timeout())
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                if follow_redirect(attempt.url(), attempt.previous().len()) {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()?;
        Ok(Self {
            extractor,
            downloads,
            http,
        })
    }
}

/// Body of `POST /api/download`
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub cookies: Option<Vec<SessionCookie>>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/download", post(download_handler))
        .route("/api/proxy", get(proxy_handler))
        .route("/api/health", get(health_handler))
        .route("/api/state", get(state_handler).delete(clear_state_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server on localhost.
pub async fn start_server(port: u16, state: AppState) -> AppResult<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let app = build_router(state);

    log::info!("Starting API server on http://{}", addr);
    log::info!("  POST   /api/download  - Extract media from a post, reel or story URL");
    log::info!("  GET    /api/proxy     - Stream CDN media");
    log::info!("  GET    /api/health    - Health check");
    log::info!("  GET    /api/state     - Current download state");
    log::info!("  DELETE /api/state     - Clear download state");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// HTTP status for an extraction outcome
pub fn status_for(result: &ExtractionResult) -> StatusCode {
    match result.code {
        None if result.success => StatusCode::OK,
        Some(ErrorCode::Error) | None => StatusCode::INTERNAL_SERVER_ERROR,
        Some(_) => StatusCode::BAD_REQUEST,
    }
}

async fn download_handler(State(state): State<AppState>, Json(request): Json<DownloadRequest>) -> Response {
    let url = request.url.trim().to_string();
    log::info!("Download requested: {}", url);

    state.downloads.begin(&url).await;
    let result = state.extractor.extract(&url, request.cookies.as_deref()).await;
    state.downloads.finish(&url, &result).await;

    (status_for(&result), Json(result)).into_response()
}

async fn proxy_handler(State(state): State<AppState>, Query(params): Query<ProxyParams>) -> Response {
    let Some(raw) = params.url.filter(|u| !u.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "URL required");
    };
    let target = match proxy_target(&raw) {
        Some(url) => url,
        None => {
            log::warn!("Refusing to proxy {}", raw);
            return error_response(StatusCode::FORBIDDEN, "Only Instagram CDN URLs can be proxied");
        }
    };

    let upstream = state
        .http
        .get(target)
        .header(reqwest::header::REFERER, INSTAGRAM_REFERER)
        .header(reqwest::header::ACCEPT, "*/*")
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) => {
            log::warn!("Proxy fetch failed: {}", e);
            return error_response(StatusCode::BAD_GATEWAY, &format!("Proxy fetch failed: {}", e));
        }
    };
    if !upstream.status().is_success() {
        log::warn!("Proxy upstream returned {}", upstream.status());
        return upstream_error(upstream.status());
    }

    let content_type = upstream.headers().get(reqwest::header::CONTENT_TYPE).cloned();
    media_response(content_type, Body::from_stream(upstream.bytes_stream()))
}

/// Upstream failures keep the upstream status; a redirect the proxy refused
/// to follow is reported as a bad gateway.
fn upstream_error(status: StatusCode) -> Response {
    let status = if status.is_redirection() {
        StatusCode::BAD_GATEWAY
    } else {
        status
    };
    error_response(status, "Failed to fetch media")
}

/// Streamed media, offered to the browser as a download.
fn media_response(content_type: Option<header::HeaderValue>, body: Body) -> Response {
    let content_type =
        content_type.unwrap_or_else(|| header::HeaderValue::from_static("application/octet-stream"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, header::HeaderValue::from_static("attachment")),
        ],
        body,
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloads.snapshot().await)
}

async fn clear_state_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.downloads.clear().await)
}

/// Parse `raw` and accept it only if it points at an Instagram CDN host.
pub fn proxy_target(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    is_cdn_url(&url).then_some(url)
}

fn is_cdn_url(url: &Url) -> bool {
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(url::Host::Domain(host)) = url.host() else {
        return false;
    };
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    PROXY_DOMAINS.iter().any(|domain| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Redirects are followed only to CDN hosts, and only a few times.
fn follow_redirect(next: &Url, hops: usize) -> bool {
    hops < MAX_PROXY_REDIRECTS && is_cdn_url(next)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
