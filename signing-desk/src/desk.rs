//! The signing desk: one user's signing workflow.
//!
//! A desk owns a [`Workspace`] and drives it in response to user actions.
//! Upload and sign are the only operations that talk to the backend. Each is
//! split into `start_*` (validate, mark loading, describe the request),
//! [`PendingRequest::run`] (the network call), and [`SigningDesk::complete`]
//! (apply the result). The caller can keep feeding other actions to the
//! desk while a request runs; a second request is refused until the first
//! completes.

use base64::Engine;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::backend::{
    BackendError, SignRequest, SignResponse, SigningBackendClient, UploadedDocument,
};
use crate::config::{DeskConfig, WorkspaceConfig};
use crate::documents::DocumentStore;
use crate::error::{DeskError, DeskResult};
use crate::geometry::{CanvasRect, ClientPoint};
use crate::signature::SignaturePad;
use crate::workspace::{DocumentSession, FieldSize, Placement, Workspace};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Which backend request is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Upload,
    Sign,
}

/// A validated backend request, ready to run
#[derive(Debug)]
pub enum PendingRequest {
    Upload {
        filename: String,
        pdf_data: String,
        blob_id: String,
    },
    Sign {
        request: SignRequest,
    },
}

/// Result of a finished backend request
#[derive(Debug)]
pub enum Completion {
    Uploaded {
        filename: String,
        blob_id: String,
        result: Result<UploadedDocument, BackendError>,
    },
    Signed {
        pdf_id: String,
        result: Result<SignResponse, BackendError>,
    },
}

impl PendingRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            PendingRequest::Upload { .. } => RequestKind::Upload,
            PendingRequest::Sign { .. } => RequestKind::Sign,
        }
    }

    /// Perform the network call
    pub fn run(self, client: SigningBackendClient) -> BoxFuture<'static, Completion> {
        Box::pin(async move {
            match self {
                PendingRequest::Upload {
                    filename,
                    pdf_data,
                    blob_id,
                } => {
                    let result = client.upload(&filename, &pdf_data).await;
                    Completion::Uploaded {
                        filename,
                        blob_id,
                        result,
                    }
                }
                PendingRequest::Sign { request } => {
                    let result = client.sign(&request).await;
                    Completion::Signed {
                        pdf_id: request.pdf_id,
                        result,
                    }
                }
            }
        })
    }
}

pub struct SigningDesk {
    workspace: Workspace,
    in_flight: Option<RequestKind>,
    /// Original stored for an upload that has not completed yet
    pending_blob: Option<String>,
    client: SigningBackendClient,
    documents: Arc<DocumentStore>,
    settings: WorkspaceConfig,
    max_upload_bytes: u64,
}

impl SigningDesk {
    pub fn new(
        client: SigningBackendClient,
        documents: Arc<DocumentStore>,
        config: &DeskConfig,
    ) -> Self {
        Self {
            workspace: Workspace::Empty,
            in_flight: None,
            pending_blob: None,
            client,
            documents,
            settings: config.workspace.clone(),
            max_upload_bytes: config.limits.max_upload_bytes,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn client(&self) -> &SigningBackendClient {
        &self.client
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<RequestKind> {
        self.in_flight
    }

    fn ensure_idle(&self) -> DeskResult<()> {
        match self.in_flight {
            Some(_) => Err(DeskError::Busy),
            None => Ok(()),
        }
    }

    // ==================== Upload ====================

    /// Validate a picked file and stage it for upload.
    ///
    /// `data` is the file as base64, optionally with a `data:...;base64,` prefix.
    pub fn start_upload(&mut self, filename: &str, data: &str) -> DeskResult<PendingRequest> {
        self.ensure_idle()?;
        self.workspace.ensure_empty("upload a document")?;

        let pdf_data = match data.split_once(',') {
            Some((prefix, payload)) if prefix.starts_with("data:") => payload,
            _ => data,
        }
        .trim();

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(pdf_data)
            .map_err(|e| DeskError::FileRead {
                message: format!("invalid base64: {}", e),
            })?;
        if bytes.is_empty() {
            return Err(DeskError::FileRead {
                message: "file is empty".to_string(),
            });
        }
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(DeskError::FileRead {
                message: format!(
                    "file too large: {} bytes (max {} bytes)",
                    bytes.len(),
                    self.max_upload_bytes
                ),
            });
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(DeskError::FileRead {
                message: "not a PDF file".to_string(),
            });
        }

        let blob_id = self.documents.insert(filename, Bytes::from(bytes));
        self.pending_blob = Some(blob_id.clone());
        self.in_flight = Some(RequestKind::Upload);

        Ok(PendingRequest::Upload {
            filename: filename.to_string(),
            pdf_data: pdf_data.to_string(),
            blob_id,
        })
    }

    pub async fn upload(&mut self, filename: &str, data: &str) -> DeskResult<()> {
        let pending = self.start_upload(filename, data)?;
        let completion = pending.run(self.client.clone()).await;
        self.complete(completion)
    }

    // ==================== Viewer ====================

    /// The renderer finished loading the displayed document
    pub fn document_loaded(&mut self, page_count: u32) -> DeskResult<()> {
        self.workspace.navigator_mut()?.set_page_count(page_count)
    }

    pub fn next_page(&mut self) -> DeskResult<()> {
        self.workspace.navigator_mut()?.next();
        Ok(())
    }

    pub fn previous_page(&mut self) -> DeskResult<()> {
        self.workspace.navigator_mut()?.previous();
        Ok(())
    }

    // ==================== Field placement ====================

    pub fn click(&mut self, click: ClientPoint, canvas: Option<&CanvasRect>) -> DeskResult<Placement> {
        let size = FieldSize {
            width: self.settings.field_width,
            height: self.settings.field_height,
        };
        self.workspace.place_field(click, canvas, size)
    }

    pub fn set_apply_to_all(&mut self, enabled: bool) -> DeskResult<()> {
        self.workspace.loaded_mut("change signing options")?.apply_to_all = enabled;
        Ok(())
    }

    // ==================== Signature capture ====================

    /// Show the capture dialog; requires a placed field
    pub fn open_signature_pad(&mut self) -> DeskResult<()> {
        let settings = &self.settings;
        let doc = self.workspace.loaded_mut("open the signature pad")?;
        if doc.field.is_none() {
            return Err(DeskError::NoFieldPlaced);
        }
        if doc.pad.is_none() {
            doc.pad = Some(SignaturePad::new(
                settings.pad_width,
                settings.pad_height,
                settings.pen_width,
            ));
        }
        Ok(())
    }

    /// Hide the capture dialog, discarding the drawing
    pub fn close_signature_pad(&mut self) {
        if let Workspace::Loaded(doc) = &mut self.workspace {
            doc.pad = None;
        }
    }

    fn pad_mut(&mut self) -> DeskResult<&mut SignaturePad> {
        self.workspace
            .loaded_mut("draw a signature")?
            .pad
            .as_mut()
            .ok_or(DeskError::InvalidState {
                action: "draw a signature",
                state: "the signature pad is closed",
            })
    }

    pub fn begin_stroke(&mut self, x: f32, y: f32) -> DeskResult<()> {
        self.pad_mut()?.begin_stroke(x, y);
        Ok(())
    }

    pub fn extend_stroke(&mut self, x: f32, y: f32) -> DeskResult<()> {
        self.pad_mut()?.extend_stroke(x, y);
        Ok(())
    }

    pub fn clear_signature(&mut self) -> DeskResult<()> {
        self.pad_mut()?.clear();
        Ok(())
    }

    // ==================== Submission ====================

    /// Validate the drawing and field and stage the sign request.
    ///
    /// `canvas` is the rendered page's bounding box as measured right now.
    pub fn start_signing(&mut self, canvas: Option<&CanvasRect>) -> DeskResult<PendingRequest> {
        self.ensure_idle()?;
        let request = self
            .workspace
            .loaded_mut("sign")?
            .prepare_signing(canvas)?;

        self.in_flight = Some(RequestKind::Sign);
        Ok(PendingRequest::Sign { request })
    }

    pub async fn submit_signature(&mut self, canvas: Option<&CanvasRect>) -> DeskResult<()> {
        let pending = self.start_signing(canvas)?;
        let completion = pending.run(self.client.clone()).await;
        self.complete(completion)
    }

    /// Apply the result of a finished request. Clears the loading state on every path.
    pub fn complete(&mut self, completion: Completion) -> DeskResult<()> {
        self.in_flight = None;

        match completion {
            Completion::Uploaded {
                filename,
                blob_id,
                result,
            } => {
                self.pending_blob = None;
                let uploaded = match result {
                    Ok(uploaded) => uploaded,
                    Err(e) => {
                        warn!(filename = %filename, error = %e, "Upload failed");
                        self.documents.revoke(&blob_id);
                        return Err(DeskError::Upload(e));
                    }
                };

                let session = DocumentSession {
                    pdf_id: uploaded.pdf_id,
                    filename,
                    blob_id,
                    metadata: uploaded.metadata,
                };
                let (pdf_id, blob_id) = (session.pdf_id.clone(), session.blob_id.clone());
                if let Err(e) = self.workspace.load(session) {
                    self.documents.revoke(&blob_id);
                    return Err(e);
                }
                info!(pdf_id = %pdf_id, "Document uploaded");
                Ok(())
            }
            Completion::Signed { pdf_id, result } => {
                let response = result.map_err(|e| {
                    warn!(pdf_id = %pdf_id, error = %e, "Signing request failed");
                    DeskError::Sign(e)
                })?;
                if !response.success {
                    let message = response
                        .message
                        .unwrap_or_else(|| "backend reported failure".to_string());
                    warn!(pdf_id = %pdf_id, message = %message, "Signing rejected");
                    return Err(DeskError::SignRejected { message });
                }

                let signed_url = self
                    .client
                    .download_url(&pdf_id, chrono::Utc::now().timestamp_millis());
                self.workspace.mark_signed(signed_url)?;
                info!(pdf_id = %pdf_id, "Document signed");
                Ok(())
            }
        }
    }

    // ==================== Review & reset ====================

    /// URL of the signed document, for opening in a new browsing context
    pub fn download(&self) -> DeskResult<String> {
        match &self.workspace {
            Workspace::Signed(doc) => Ok(doc.signed_url.clone()),
            _ => Err(DeskError::InvalidState {
                action: "download",
                state: "the document is not signed yet",
            }),
        }
    }

    /// Discard the whole session and return to the upload prompt
    pub fn reset(&mut self) -> DeskResult<()> {
        self.ensure_idle()?;
        if let Some(session) = self.workspace.reset() {
            self.documents.revoke(&session.blob_id);
            info!(pdf_id = %session.pdf_id, "Workspace reset");
        }
        Ok(())
    }
}

impl Drop for SigningDesk {
    fn drop(&mut self) {
        if let Some(session) = self.workspace.session() {
            self.documents.revoke(&session.blob_id);
        }
        if let Some(blob_id) = self.pending_blob.take() {
            self.documents.revoke(&blob_id);
        }
    }
}
