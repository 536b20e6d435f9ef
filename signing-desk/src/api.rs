//! HTTP API for the signing desk.
//!
//! This module provides:
//! - Health monitoring
//! - The WebSocket session endpoint
//! - Uploaded originals for the renderer
//! - A proxy for signed document downloads

use axum::{
    Json, Router,
    extract::{Path, State, WebSocketUpgrade},
    http::header,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::backend::SigningBackendClient;
use crate::config::DeskConfig;
use crate::documents::DocumentStore;
use crate::error::{DeskError, DeskResult};
use crate::i18n::I18n;
use crate::websocket::handle_ws_connection;

/// Headroom on top of the base64-encoded upload for the JSON envelope
const WS_MESSAGE_OVERHEAD: usize = 64 * 1024;

/// Application state
pub struct AppState {
    pub config: DeskConfig,
    pub client: SigningBackendClient,
    pub documents: Arc<DocumentStore>,
    pub i18n: Arc<I18n>,
    pub start_time: Instant,
    pub active_sessions: AtomicUsize,
}

impl AppState {
    pub fn new(config: DeskConfig, client: SigningBackendClient) -> Self {
        Self {
            config,
            client,
            documents: Arc::new(DocumentStore::new()),
            i18n: Arc::new(I18n::new()),
            start_time: Instant::now(),
            active_sessions: AtomicUsize::new(0),
        }
    }

    /// Largest WebSocket message the desk accepts: one base64 upload
    fn max_message_size(&self) -> usize {
        let max_upload = usize::try_from(self.config.limits.max_upload_bytes).unwrap_or(usize::MAX);
        max_upload
            .saturating_add(2)
            .saturating_div(3)
            .saturating_mul(4)
            .saturating_add(WS_MESSAGE_OVERHEAD)
    }
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .route("/documents/{blob_id}", get(document_handler))
        .route("/signed/{pdf_id}", get(signed_document_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let locale = &state.config.workspace.locale;

    Json(HealthResponse {
        status: state.i18n.get(locale, "health-status-healthy", None),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        backend_url: state.client.base_url().to_string(),
        active_sessions: state.active_sessions.load(Ordering::Relaxed),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    backend_url: String,
    active_sessions: usize,
}

// === WebSocket ===

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    info!("WebSocket upgrade request received");
    let max_size = state.max_message_size();
    ws.max_message_size(max_size)
        .max_frame_size(max_size)
        .on_upgrade(move |socket| handle_ws_connection(socket, state))
}

// === Documents ===

async fn document_handler(
    State(state): State<Arc<AppState>>,
    Path(blob_id): Path<String>,
) -> DeskResult<impl IntoResponse> {
    let document = state.documents.get(&blob_id).ok_or_else(|| DeskError::NotFound {
        what: format!("document {}", blob_id),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}\"", sanitize_filename(&document.filename)),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        document.bytes,
    ))
}

async fn signed_document_handler(
    State(state): State<Arc<AppState>>,
    Path(pdf_id): Path<String>,
) -> DeskResult<impl IntoResponse> {
    let bytes = state.client.download(&pdf_id).await.map_err(|e| {
        warn!(pdf_id = %pdf_id, error = %e, "Signed document download failed");
        DeskError::Download(e)
    })?;
    info!(pdf_id = %pdf_id, size = bytes.len(), "Proxied signed document");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"signed_{}.pdf\"", sanitize_filename(&pdf_id)),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        bytes,
    ))
}

/// Keep header values to a conservative character set
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
