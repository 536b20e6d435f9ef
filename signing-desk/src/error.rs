use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::backend::BackendError;
use crate::i18n::I18n;

/// Main desk error type
///
/// Every failure of the signing workflow ends up here. Validation failures are
/// raised before any network call is made.
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Failed to read PDF file: {message}")]
    FileRead { message: String },

    #[error("Upload failed")]
    Upload(#[source] BackendError),

    #[error("PDF canvas not found")]
    CanvasMissing,

    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },

    #[error("Signature pad is empty")]
    EmptySignature,

    #[error("No signature field placed")]
    NoFieldPlaced,

    #[error("Page count not known yet")]
    PageCountUnknown,

    #[error("Renderer reported an invalid page count: {page_count}")]
    InvalidPageCount { page_count: u32 },

    #[error("Signing request failed")]
    Sign(#[source] BackendError),

    #[error("Signing rejected by backend: {message}")]
    SignRejected { message: String },

    #[error("Download failed")]
    Download(#[source] BackendError),

    #[error("Signature rendering failed: {message}")]
    Signature { message: String },

    #[error("Another request is still in progress")]
    Busy,

    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    #[error("Not found: {what}")]
    NotFound { what: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// API error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl DeskError {
    fn status_code(&self) -> StatusCode {
        match self {
            DeskError::NotFound { .. } => StatusCode::NOT_FOUND,
            DeskError::Busy | DeskError::InvalidState { .. } => StatusCode::CONFLICT,
            DeskError::Upload(_) | DeskError::Sign(_) | DeskError::Download(_) => {
                StatusCode::BAD_GATEWAY
            }
            DeskError::Config { .. } | DeskError::Signature { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable reason code reported to the browser
    pub fn error_code(&self) -> &'static str {
        match self {
            DeskError::FileRead { .. } => "file_read",
            DeskError::Upload(_) => "upload_failed",
            DeskError::CanvasMissing => "canvas_missing",
            DeskError::InvalidCanvas { .. } => "invalid_canvas",
            DeskError::EmptySignature => "empty_signature",
            DeskError::NoFieldPlaced => "no_field_placed",
            DeskError::PageCountUnknown => "page_count_unknown",
            DeskError::InvalidPageCount { .. } => "invalid_page_count",
            DeskError::Sign(_) => "sign_failed",
            DeskError::SignRejected { .. } => "sign_rejected",
            DeskError::Download(_) => "download_failed",
            DeskError::Signature { .. } => "signature_render",
            DeskError::Busy => "busy",
            DeskError::InvalidState { .. } => "invalid_state",
            DeskError::NotFound { .. } => "not_found",
            DeskError::Config { .. } => "config_error",
        }
    }

    /// Whether the user can carry on with the same workspace after this error
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DeskError::Config { .. })
    }

    /// Get a user-friendly translated message
    pub fn user_message(&self, i18n: &I18n, locale: &str) -> String {
        match self {
            DeskError::FileRead { .. } => i18n.get(locale, "error-file-read", None),
            DeskError::Upload(_) => i18n.get(locale, "error-upload", None),
            DeskError::CanvasMissing | DeskError::InvalidCanvas { .. } => {
                i18n.get(locale, "error-canvas-missing", None)
            }
            DeskError::EmptySignature => i18n.get(locale, "error-empty-signature", None),
            DeskError::NoFieldPlaced => i18n.get(locale, "error-no-field", None),
            DeskError::PageCountUnknown => i18n.get(locale, "error-page-count-unknown", None),
            DeskError::InvalidPageCount { .. } => {
                i18n.get(locale, "error-invalid-page-count", None)
            }
            DeskError::Sign(_) | DeskError::SignRejected { .. } => {
                i18n.get(locale, "error-sign", None)
            }
            DeskError::Download(_) => i18n.get(locale, "error-download", None),
            DeskError::Busy => i18n.get(locale, "error-busy", None),
            // For other errors, fall back to the technical message
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: self.to_string(),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for desk operations
pub type DeskResult<T> = Result<T, DeskError>;
