//! WebSocket message types.
//!
//! Defines the browser-to-desk and desk-to-browser message formats.

use serde::{Deserialize, Serialize};

use crate::desk::RequestKind;
use crate::geometry::CanvasRect;
use crate::view::ViewState;

/// Messages sent from the browser to the desk
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// A file the user picked, as base64 (a `data:` URL prefix is accepted)
    Upload { filename: String, data: String },
    /// The renderer finished loading the displayed document
    DocumentLoaded { num_pages: u32 },
    NextPage,
    PreviousPage,
    /// Click on the rendered page; `canvas` is absent if nothing is rendered
    CanvasClick {
        client_x: f64,
        client_y: f64,
        canvas: Option<CanvasRect>,
    },
    SetApplyToAll { enabled: bool },
    OpenSignaturePad,
    CloseSignaturePad,
    /// Pointer down on the signature pad, in pad pixels
    BeginStroke { x: f32, y: f32 },
    /// Pointer moved while down
    ExtendStroke { x: f32, y: f32 },
    ClearSignature,
    /// Apply the drawn signature; `canvas` is the page canvas measured now
    SubmitSignature { canvas: Option<CanvasRect> },
    Download,
    Reset,
    /// Keepalive ping
    Ping,
}

/// Messages sent from the desk to the browser
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Everything the browser should currently display
    View { state: Box<ViewState> },
    /// A backend request started; a `view` follows when it completes
    Busy { action: RequestKind },
    /// Open a URL in a new browsing context
    OpenUrl { url: String },
    /// Error message
    Error {
        code: String,
        message: String,
        recoverable: bool,
    },
    /// Keepalive pong response
    Pong { timestamp: u64 },
}
