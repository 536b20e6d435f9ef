//! In-process stand-in for the signing backend, used by tests.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const SIGNED_PDF: &[u8] = b"%PDF-1.7\n% signed\n%%EOF";

#[derive(Default)]
struct StubState {
    uploads: Mutex<Vec<Value>>,
    signs: Mutex<Vec<Value>>,
    fail_uploads: AtomicBool,
    omit_pdf_id: AtomicBool,
    reject_signing: AtomicBool,
    fail_signing: AtomicBool,
}

/// A running stub backend bound to an ephemeral loopback port
pub struct StubBackend {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/api/pdf/upload", post(upload))
            .route("/api/pdf/sign", post(sign))
            .route("/api/pdf/download/{pdf_id}", get(download))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn uploads(&self) -> Vec<Value> {
        self.state.uploads.lock().unwrap().clone()
    }

    pub fn signs(&self) -> Vec<Value> {
        self.state.signs.lock().unwrap().clone()
    }

    pub fn fail_uploads(&self) {
        self.state.fail_uploads.store(true, Ordering::SeqCst);
    }

    pub fn omit_pdf_id(&self) {
        self.state.omit_pdf_id.store(true, Ordering::SeqCst);
    }

    pub fn reject_signing(&self) {
        self.state.reject_signing.store(true, Ordering::SeqCst);
    }

    pub fn fail_signing(&self) {
        self.state.fail_signing.store(true, Ordering::SeqCst);
    }
}

async fn upload(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.uploads.lock().unwrap().push(body);

    if state.fail_uploads.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "disk full"})));
    }
    if state.omit_pdf_id.load(Ordering::SeqCst) {
        return (StatusCode::OK, Json(json!({"pageCount": 3})));
    }
    let id = format!("pdf-{}", state.uploads.lock().unwrap().len());
    (StatusCode::OK, Json(json!({"pdfId": id, "pageCount": 3})))
}

async fn sign(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.signs.lock().unwrap().push(body);

    if state.fail_signing.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, Json(json!({"error": "upstream"})));
    }
    if state.reject_signing.load(Ordering::SeqCst) {
        return (
            StatusCode::OK,
            Json(json!({"success": false, "message": "page out of range"})),
        );
    }
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn download(Path(pdf_id): Path<String>) -> impl IntoResponse {
    if pdf_id == "missing" {
        return (StatusCode::NOT_FOUND, b"no such document".to_vec());
    }
    (StatusCode::OK, SIGNED_PDF.to_vec())
}
