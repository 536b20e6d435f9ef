//! WebSocket session driving one signing desk per browser tab.
//!
//! Messages are handled one at a time, in arrival order. Backend requests run
//! alongside the message loop so the browser keeps getting views (and `busy`
//! errors for duplicate requests) while an upload or sign is in flight.

use axum::extract::ws::{Message, WebSocket};
use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::api::AppState;
use crate::desk::{Completion, PendingRequest, SigningDesk};
use crate::error::{DeskError, DeskResult};
use crate::geometry::ClientPoint;
use crate::i18n::I18n;
use crate::view::ViewState;
use crate::workspace::Placement;

pub mod messages;

pub use messages::{ClientMessage, ServerMessage};

/// State for a single WebSocket connection
struct Connection {
    session_id: String,
    desk: SigningDesk,
    tx: mpsc::UnboundedSender<ServerMessage>,
    i18n: Arc<I18n>,
    locale: String,
}

impl Connection {
    fn send(&self, msg: ServerMessage) {
        if self.tx.send(msg).is_err() {
            warn!(session_id = %self.session_id, "Failed to send message to connection");
        }
    }

    fn send_view(&self) {
        let state = ViewState::build(&self.desk, &self.i18n, &self.locale);
        self.send(ServerMessage::View {
            state: Box::new(state),
        });
    }

    fn send_error(&self, err: &DeskError) {
        self.send(ServerMessage::Error {
            code: err.error_code().to_string(),
            message: err.user_message(&self.i18n, &self.locale),
            recoverable: err.is_recoverable(),
        });
    }

    /// Handle one text frame; returns a backend request to start, if any
    fn handle_text(&mut self, text: &str) -> Option<PendingRequest> {
        let msg: ClientMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to parse client message"
                );
                self.send(ServerMessage::Error {
                    code: "parse_error".to_string(),
                    message: format!("Failed to parse message: {}", e),
                    recoverable: true,
                });
                return None;
            }
        };

        if let ClientMessage::Ping = msg {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0);
            self.send(ServerMessage::Pong { timestamp });
            return None;
        }

        let pending = match self.dispatch(msg) {
            Ok(Some(pending)) => {
                self.send(ServerMessage::Busy {
                    action: pending.kind(),
                });
                Some(pending)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(session_id = %self.session_id, error = %e, "Action refused");
                self.send_error(&e);
                None
            }
        };
        self.send_view();
        pending
    }

    fn dispatch(&mut self, msg: ClientMessage) -> DeskResult<Option<PendingRequest>> {
        let desk = &mut self.desk;
        match msg {
            ClientMessage::Upload { filename, data } => {
                info!(session_id = %self.session_id, filename = %filename, "Upload requested");
                return desk.start_upload(&filename, &data).map(Some);
            }
            ClientMessage::DocumentLoaded { num_pages } => desk.document_loaded(num_pages)?,
            ClientMessage::NextPage => desk.next_page()?,
            ClientMessage::PreviousPage => desk.previous_page()?,
            ClientMessage::CanvasClick {
                client_x,
                client_y,
                canvas,
            } => {
                let point = ClientPoint {
                    x: client_x,
                    y: client_y,
                };
                if let Placement::Placed(field) = desk.click(point, canvas.as_ref())? {
                    debug!(
                        session_id = %self.session_id,
                        page = field.page,
                        x = field.rect.x,
                        y = field.rect.y,
                        "Signature field placed"
                    );
                }
            }
            ClientMessage::SetApplyToAll { enabled } => desk.set_apply_to_all(enabled)?,
            ClientMessage::OpenSignaturePad => desk.open_signature_pad()?,
            ClientMessage::CloseSignaturePad => desk.close_signature_pad(),
            ClientMessage::BeginStroke { x, y } => desk.begin_stroke(x, y)?,
            ClientMessage::ExtendStroke { x, y } => desk.extend_stroke(x, y)?,
            ClientMessage::ClearSignature => desk.clear_signature()?,
            ClientMessage::SubmitSignature { canvas } => {
                return desk.start_signing(canvas.as_ref()).map(Some);
            }
            ClientMessage::Download => {
                let url = desk.download()?;
                self.send(ServerMessage::OpenUrl { url });
            }
            ClientMessage::Reset => desk.reset()?,
            ClientMessage::Ping => {}
        }
        Ok(None)
    }

    fn finish(&mut self, completion: Completion) {
        if let Err(e) = self.desk.complete(completion) {
            self.send_error(&e);
        }
        self.send_view();
    }
}

/// Handle a WebSocket connection
///
/// Owns the connection's desk for its whole lifetime; the desk (and any
/// originals it holds) is dropped when the socket closes.
pub async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "New WebSocket connection");
    state.active_sessions.fetch_add(1, Ordering::Relaxed);

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Forward messages from channel to WebSocket
    let session_id_clone = session_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, "Failed to serialize WebSocket message");
                }
            }
        }
        debug!(session_id = %session_id_clone, "WebSocket send task ended");
    });

    let client = state.client.clone();
    let mut conn = Connection {
        session_id: session_id.clone(),
        desk: SigningDesk::new(client.clone(), state.documents.clone(), &state.config),
        tx: msg_tx,
        i18n: state.i18n.clone(),
        locale: state.config.workspace.locale.clone(),
    };
    conn.send_view();

    let mut in_flight: Option<BoxFuture<'static, Completion>> = None;

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let Some(result) = incoming else { break };
                let text = match result {
                    Ok(Message::Text(text)) => text.as_str().to_owned(),
                    Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => text,
                        Err(_) => continue,
                    },
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                    Ok(Message::Close(_)) => {
                        info!(session_id = %session_id, "WebSocket connection closed by client");
                        break;
                    }
                    Err(e) => {
                        error!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                };
                if let Some(pending) = conn.handle_text(&text) {
                    in_flight = Some(pending.run(client.clone()));
                }
            }
            completion = async {
                match in_flight.as_mut() {
                    Some(request) => request.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;
                conn.finish(completion);
            }
        }
    }

    drop(conn);
    send_task.abort();
    state.active_sessions.fetch_sub(1, Ordering::Relaxed);
    info!(session_id = %session_id, "WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SigningBackendClient;
    use crate::config::DeskConfig;
    use crate::documents::DocumentStore;
    use crate::test_support::StubBackend;
    use base64::Engine;
    use serde_json::{Value, json};
    use tokio_test::{assert_err, assert_ok};

    struct Harness {
        conn: Connection,
        rx: mpsc::UnboundedReceiver<ServerMessage>,
        client: SigningBackendClient,
        documents: Arc<DocumentStore>,
    }

    impl Harness {
        fn new(stub: &StubBackend) -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            let client = SigningBackendClient::new(&stub.base_url, 5).unwrap();
            let documents = Arc::new(DocumentStore::new());
            let conn = Connection {
                session_id: "test".to_string(),
                desk: SigningDesk::new(client.clone(), documents.clone(), &DeskConfig::default()),
                tx,
                i18n: Arc::new(I18n::new()),
                locale: "en".to_string(),
            };
            Self {
                conn,
                rx,
                client,
                documents,
            }
        }

        /// Send a message, running any backend request to completion
        async fn send(&mut self, msg: Value) -> Vec<Value> {
            if let Some(pending) = self.conn.handle_text(&msg.to_string()) {
                let completion = pending.run(self.client.clone()).await;
                self.conn.finish(completion);
            }
            self.drain()
        }

        fn drain(&mut self) -> Vec<Value> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(serde_json::to_value(msg).unwrap());
            }
            out
        }
    }

    fn canvas() -> Value {
        json!({"left": 0, "top": 0, "width": 800, "height": 600})
    }

    fn pdf() -> String {
        base64::engine::general_purpose::STANDARD.encode(b"%PDF-1.4\n%%EOF")
    }

    fn last_view(messages: &[Value]) -> &Value {
        let view = messages.iter().rev().find(|m| m["type"] == "view");
        &view.expect("expected a view message")["state"]
    }

    #[tokio::test]
    async fn test_full_session() {
        let stub = StubBackend::start().await;
        let mut h = Harness::new(&stub);

        let out = h
            .send(json!({"type": "upload", "filename": "doc.pdf", "data": pdf()}))
            .await;
        assert_eq!(out[0], json!({"type": "busy", "action": "upload"}));
        assert_eq!(last_view(&out)["phase"], "loaded");

        let out = h.send(json!({"type": "document_loaded", "num_pages": 3})).await;
        assert_eq!(last_view(&out)["navigation"]["label"], "Page \u{2068}1\u{2069} of \u{2068}3\u{2069}");

        let out = h
            .send(json!({"type": "canvas_click", "client_x": 100, "client_y": 50, "canvas": canvas()}))
            .await;
        assert_eq!(last_view(&out)["field_overlay"]["rect"]["x"], 100.0);

        h.send(json!({"type": "open_signature_pad"})).await;
        h.send(json!({"type": "begin_stroke", "x": 10, "y": 20})).await;
        h.send(json!({"type": "extend_stroke", "x": 90, "y": 40})).await;

        let out = h
            .send(json!({"type": "submit_signature", "canvas": canvas()}))
            .await;
        assert_eq!(out[0], json!({"type": "busy", "action": "sign"}));
        let view = last_view(&out);
        assert_eq!(view["phase"], "signed");
        assert_eq!(view["loading"], false);

        let out = h.send(json!({"type": "download"})).await;
        assert_eq!(out[0]["type"], "open_url");
        assert!(
            out[0]["url"]
                .as_str()
                .unwrap()
                .contains("/api/pdf/download/pdf-1?t=")
        );

        let out = h.send(json!({"type": "reset"})).await;
        assert_eq!(last_view(&out)["phase"], "empty");
        assert_eq!(h.documents.len(), 0);
    }

    #[tokio::test]
    async fn test_validation_errors_are_reported() {
        let stub = StubBackend::start().await;
        let mut h = Harness::new(&stub);
        h.send(json!({"type": "upload", "filename": "doc.pdf", "data": pdf()}))
            .await;
        h.send(json!({"type": "document_loaded", "num_pages": 1})).await;

        // Nothing drawn and no field: the drawing is checked first
        let out = h
            .send(json!({"type": "submit_signature", "canvas": canvas()}))
            .await;
        assert_eq!(out[0]["type"], "error");
        assert_eq!(out[0]["code"], "empty_signature");
        assert_eq!(out[0]["message"], "Please draw your signature first");
        assert_eq!(out[0]["recoverable"], true);
        // The view still follows so the browser can re-render
        assert_eq!(last_view(&out)["phase"], "loaded");

        let out = h.send(json!({"type": "open_signature_pad"})).await;
        assert_eq!(out[0]["code"], "no_field_placed");
        assert_eq!(out[0]["message"], "Please click on the PDF to place your signature");
        assert!(last_view(&out).get("signature_pad").is_none());

        h.send(json!({"type": "canvas_click", "client_x": 10, "client_y": 10, "canvas": canvas()}))
            .await;
        h.send(json!({"type": "open_signature_pad"})).await;
        let out = h
            .send(json!({"type": "submit_signature", "canvas": canvas()}))
            .await;
        assert_eq!(out[0]["code"], "empty_signature");

        h.send(json!({"type": "begin_stroke", "x": 10, "y": 20})).await;
        let out = h.send(json!({"type": "submit_signature"})).await;
        assert_eq!(out[0]["code"], "canvas_missing");
        assert!(stub.signs().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_request_is_busy() {
        let stub = StubBackend::start().await;
        let mut h = Harness::new(&stub);

        let upload = json!({"type": "upload", "filename": "doc.pdf", "data": pdf()}).to_string();
        let pending = h.conn.handle_text(&upload);
        assert!(pending.is_some());
        assert!(h.conn.handle_text(&upload).is_none());

        let out = h.drain();
        let errors: Vec<_> = out.iter().filter(|m| m["type"] == "error").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["code"], "busy");
        assert_eq!(last_view(&out)["loading"], true);

        // The connection keeps answering while the upload runs
        h.conn.handle_text(r#"{"type":"ping"}"#);
        assert_eq!(h.drain()[0]["type"], "pong");

        let completion = pending.unwrap().run(h.client.clone()).await;
        h.conn.finish(completion);
        let out = h.drain();
        assert_eq!(last_view(&out)["loading"], false);
        assert_eq!(stub.uploads().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let stub = StubBackend::start().await;
        stub.fail_uploads();
        let mut h = Harness::new(&stub);

        let out = h
            .send(json!({"type": "upload", "filename": "doc.pdf", "data": pdf()}))
            .await;
        let error = out.iter().find(|m| m["type"] == "error").unwrap();
        assert_eq!(error["code"], "upload_failed");
        assert_eq!(error["message"], "Failed to upload PDF. Please try again.");
        assert_eq!(last_view(&out)["phase"], "empty");
    }

    #[tokio::test]
    async fn test_ping_and_parse_errors() {
        let stub = StubBackend::start().await;
        let mut h = Harness::new(&stub);

        let out = h.send(json!({"type": "ping"})).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["type"], "pong");

        assert!(h.conn.handle_text("{not json").is_none());
        let out = h.drain();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["code"], "parse_error");
    }

    #[tokio::test]
    async fn test_desk_actions_in_wrong_state() {
        let stub = StubBackend::start().await;
        let mut h = Harness::new(&stub);

        assert_err!(h.conn.dispatch(ClientMessage::NextPage));
        assert_err!(h.conn.dispatch(ClientMessage::Download));
        assert_ok!(h.conn.dispatch(ClientMessage::Reset));
        assert_ok!(h.conn.dispatch(ClientMessage::CloseSignaturePad));
    }
}
