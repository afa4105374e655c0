//! HTTP endpoints.
//!
//! Every failure maps onto a bare status code. A missing or malformed
//! `X-Specht-Id` is answered exactly like an unknown route so that scanners
//! cannot tell the endpoints apart from a plain 404.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;

use crate::crypto::{CryptoSession, PublicKey};
use crate::identity::ClientId;
use crate::protocol::{
    cookie_value, strip_cookie, Channel, LogEntry, ProbeConfig, ProbeResult, CONFIG_PATH,
    DATA_PATH, ID_HEADER, KEX_PATH, LOG_PATH, PROBE_HEADER,
};
use crate::server::{PeerRegistry, ReportSink, ServerMetrics};

const BANNER: &str = r#"
  |  .--.  |
  | (o  >  |   Mauerspecht
  |  ) /|  |   which of your bytes make it through the wall?
  | /_/ |  |
"#;

/// Largest request body accepted on `/v1/data` and `/v1/log`.
///
/// A report grows by roughly 24 log lines per canary, so this sits far above
/// axum's 2 MiB default.
pub const MAX_BODY_SIZE: usize = 32 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    crypto: Arc<CryptoSession>,
    config: Arc<ProbeConfig>,
    registry: Arc<PeerRegistry>,
    sink: Arc<dyn ReportSink>,
    metrics: Arc<ServerMetrics>,
}

impl AppState {
    /// Bundle the server's shared components.
    pub fn new(
        crypto: Arc<CryptoSession>,
        config: Arc<ProbeConfig>,
        registry: Arc<PeerRegistry>,
        sink: Arc<dyn ReportSink>,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            crypto,
            config,
            registry,
            sink,
            metrics,
        }
    }

    fn peer_key(&self, id: &ClientId) -> Result<PublicKey, Rejection> {
        self.registry.lookup(id).ok_or_else(|| {
            tracing::debug!("request from unregistered client {}", id);
            self.metrics.increment_bad_requests();
            Rejection::BadRequest
        })
    }

    fn seal_json<T: Serialize>(&self, peer: &PublicKey, value: &T) -> Result<Response, Rejection> {
        let json = serde_json::to_vec(value).map_err(|e| {
            tracing::warn!("failed to encode response: {}", e);
            Rejection::Internal
        })?;
        let sealed = self.crypto.encrypt(peer, &json).map_err(|e| {
            tracing::warn!("failed to seal response: {}", e);
            Rejection::Internal
        })?;
        Ok(octet_stream(sealed))
    }
}

/// Build the router serving every endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner).fallback(not_found))
        .route(KEX_PATH, post(kex).fallback(not_found))
        .route(CONFIG_PATH, get(config).fallback(not_found))
        .route(
            DATA_PATH,
            get(download)
                .post(upload)
                .fallback(not_found)
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .route(
            LOG_PATH,
            post(report)
                .fallback(not_found)
                .layer(DefaultBodyLimit::max(MAX_BODY_SIZE)),
        )
        .fallback(not_found)
        .with_state(state)
}

/// Request failure, rendered as a status line and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Unknown route, wrong method, or no usable identity
    NotFound,
    /// Identity unregistered or payload unusable
    BadRequest,
    /// Server-side encoding or sealing failed
    Internal,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = match self {
            Rejection::NotFound => StatusCode::NOT_FOUND,
            Rejection::BadRequest => StatusCode::BAD_REQUEST,
            Rejection::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}

/// Client identity taken from the `X-Specht-Id` header.
pub struct SpechtId(pub ClientId);

#[async_trait]
impl FromRequestParts<AppState> for SpechtId {
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Rejection> {
        parts
            .headers
            .get(ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| ClientId::parse(s).ok())
            .map(SpechtId)
            .ok_or_else(|| {
                state.metrics.increment_unidentified();
                Rejection::NotFound
            })
    }
}

fn octet_stream(bytes: Vec<u8>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    )
        .into_response()
}

/// Unwrap a buffered body. Oversized or broken bodies are a bare 400.
fn read_body(state: &AppState, body: Result<Bytes, BytesRejection>) -> Result<Bytes, Rejection> {
    body.map_err(|e| {
        tracing::debug!("unreadable request body: {}", e);
        state.metrics.increment_bad_requests();
        Rejection::BadRequest
    })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn not_found() -> Rejection {
    Rejection::NotFound
}

async fn banner() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], BANNER)
}

async fn kex(
    State(state): State<AppState>,
    SpechtId(id): SpechtId,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, Rejection> {
    let body = read_body(&state, body)?;
    let key = PublicKey::from_slice(&body).map_err(|_| {
        state.metrics.increment_bad_requests();
        Rejection::BadRequest
    })?;
    if !state.crypto.accepts_peer(&key) {
        tracing::debug!("client {} offered a low-order key", id);
        state.metrics.increment_bad_requests();
        return Err(Rejection::BadRequest);
    }

    if state.registry.register(id, key).is_some() {
        tracing::debug!("client {} replaced its key", id);
    }
    state.metrics.increment_key_exchanges();
    tracing::info!("key exchange with client {}", id);

    Ok(octet_stream(state.crypto.public_key().to_bytes().to_vec()))
}

async fn config(
    State(state): State<AppState>,
    SpechtId(id): SpechtId,
) -> Result<Response, Rejection> {
    let peer = state.peer_key(&id)?;
    let response = state.seal_json(&peer, state.config.as_ref())?;
    state.metrics.increment_configs_served();
    tracing::debug!("served config to client {}", id);
    Ok(response)
}

async fn download(
    State(state): State<AppState>,
    SpechtId(_): SpechtId,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, Rejection> {
    let canary = params
        .get("id")
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| state.config.canary(i))
        .ok_or_else(|| {
            tracing::debug!("download with invalid canary id {:?}", params.get("id"));
            state.metrics.increment_bad_requests();
            Rejection::BadRequest
        })?;
    let requested = |channel: Channel| params.get(channel.name()).map(String::as_str) == Some("1");

    let mut headers = HeaderMap::new();
    if requested(Channel::Header) {
        let value = HeaderValue::from_str(canary).map_err(|_| Rejection::Internal)?;
        headers.insert(PROBE_HEADER, value);
    }
    if requested(Channel::Cookie) {
        let value = HeaderValue::from_str(&cookie_value(canary)).map_err(|_| Rejection::Internal)?;
        headers.insert(header::SET_COOKIE, value);
    }
    let body = if requested(Channel::Body) {
        canary.to_string()
    } else {
        String::new()
    };

    state.metrics.increment_downloads();
    Ok((headers, body).into_response())
}

/// Match each of the three upload channels against the canary list.
fn observe(config: &ProbeConfig, headers: &HeaderMap, body: &[u8]) -> ProbeResult {
    ProbeResult {
        header: header_str(headers, PROBE_HEADER).and_then(|v| config.find_canary(v)),
        cookie: header_str(headers, "cookie")
            .and_then(strip_cookie)
            .and_then(|v| config.find_canary(v)),
        body: std::str::from_utf8(body)
            .ok()
            .and_then(|v| config.find_canary(v)),
    }
}

async fn upload(
    State(state): State<AppState>,
    SpechtId(id): SpechtId,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, Rejection> {
    let peer = state.peer_key(&id)?;
    let body = read_body(&state, body)?;
    let result = observe(&state.config, &headers, &body);
    tracing::debug!("upload from client {}: {:?}", id, result);

    let response = state.seal_json(&peer, &result)?;
    state.metrics.increment_uploads();
    Ok(response)
}

async fn report(
    State(state): State<AppState>,
    SpechtId(id): SpechtId,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, Rejection> {
    let peer = state.peer_key(&id)?;
    let body = read_body(&state, body)?;
    let entries: Vec<LogEntry> = state
        .crypto
        .decrypt(&peer, &body)
        .ok()
        .and_then(|plain| serde_json::from_slice(&plain).ok())
        .ok_or_else(|| {
            tracing::debug!("unreadable report from client {}", id);
            state.metrics.increment_bad_requests();
            Rejection::BadRequest
        })?;

    for entry in &entries {
        state.sink.record(&id, entry);
    }
    state.metrics.add_report_entries(entries.len() as u64);
    tracing::info!("recorded {} report entries from client {}", entries.len(), id);
    Ok(StatusCode::OK)
}
