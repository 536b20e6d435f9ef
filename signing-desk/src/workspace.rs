//! Signing workflow state.
//!
//! The workspace is always exactly one of: no document, a document awaiting
//! a signature, or a signed document under review. Data that only makes sense
//! in one of those states lives only in that variant, so a field can't exist
//! while reviewing and a signed URL can't exist before signing.

use tracing::debug;

use crate::backend::SignRequest;
use crate::error::{DeskError, DeskResult};
use crate::geometry::{CanvasRect, ClientPoint, PixelRect};
use crate::signature::SignaturePad;

/// Backend identity and local handle of an uploaded PDF
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub pdf_id: String,
    pub filename: String,
    /// Key of the original bytes in the document store
    pub blob_id: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Current page of the displayed document, 1-based
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNavigator {
    current: u32,
    page_count: Option<u32>,
}

impl Default for PageNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl PageNavigator {
    pub fn new() -> Self {
        Self {
            current: 1,
            page_count: None,
        }
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    /// None until the renderer has reported the document's page count
    pub fn page_count(&self) -> Option<u32> {
        self.page_count
    }

    /// Record the page count reported by the renderer's load callback
    pub fn set_page_count(&mut self, page_count: u32) -> DeskResult<()> {
        if page_count == 0 {
            return Err(DeskError::InvalidPageCount { page_count });
        }
        self.page_count = Some(page_count);
        self.current = self.current.clamp(1, page_count);
        Ok(())
    }

    pub fn can_go_previous(&self) -> bool {
        self.current > 1
    }

    pub fn can_go_next(&self) -> bool {
        self.page_count.is_some_and(|count| self.current < count)
    }

    pub fn next(&mut self) {
        if let Some(count) = self.page_count {
            self.current = (self.current + 1).min(count);
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1).max(1);
    }
}

/// The user-placed signature rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureField {
    pub rect: PixelRect,
    pub page: u32,
}

/// Size of newly placed fields, in rendered pixels
#[derive(Debug, Clone, Copy)]
pub struct FieldSize {
    pub width: f64,
    pub height: f64,
}

/// Outcome of a canvas click
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Placed(SignatureField),
    /// Clicks do nothing without a document or once it is signed
    Ignored,
}

/// A document awaiting a signature
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub session: DocumentSession,
    pub navigator: PageNavigator,
    pub field: Option<SignatureField>,
    pub apply_to_all: bool,
    /// Open while the capture dialog is shown
    pub pad: Option<SignaturePad>,
}

impl LoadedDocument {
    pub fn new(session: DocumentSession) -> Self {
        Self {
            session,
            navigator: PageNavigator::new(),
            field: None,
            apply_to_all: false,
            pad: None,
        }
    }

    /// Place (or move) the signature field at a click on the displayed page
    pub fn place_field(
        &mut self,
        click: ClientPoint,
        canvas: Option<&CanvasRect>,
        size: FieldSize,
    ) -> DeskResult<SignatureField> {
        let canvas = canvas.ok_or(DeskError::CanvasMissing)?;
        let (x, y) = canvas.to_local(click);

        let field = SignatureField {
            rect: PixelRect::anchored_at(x, y, size.width, size.height),
            page: self.navigator.current(),
        };
        self.field = Some(field);
        Ok(field)
    }

    /// Pages the signature goes on, ascending
    pub fn target_pages(&self, field: &SignatureField, page_count: u32) -> Vec<u32> {
        if self.apply_to_all {
            (1..=page_count).collect()
        } else {
            vec![field.page]
        }
    }

    /// Validate everything and build the sign request, without touching the network.
    ///
    /// `canvas` is the rendered page's bounding box as measured at submit time.
    pub fn prepare_signing(&self, canvas: Option<&CanvasRect>) -> DeskResult<SignRequest> {
        let pad = self
            .pad
            .as_ref()
            .filter(|pad| !pad.is_empty())
            .ok_or(DeskError::EmptySignature)?;
        let field = self.field.as_ref().ok_or(DeskError::NoFieldPlaced)?;
        let canvas = canvas.ok_or(DeskError::CanvasMissing)?;
        if !canvas.is_valid() {
            return Err(DeskError::InvalidCanvas {
                width: canvas.width,
                height: canvas.height,
            });
        }
        let page_count = self
            .navigator
            .page_count()
            .ok_or(DeskError::PageCountUnknown)?;

        let pages = self.target_pages(field, page_count);
        let coordinates = field.rect.normalize(canvas);
        let signature_image = pad.to_data_url()?;

        debug!(
            pdf_id = %self.session.pdf_id,
            pages = ?pages,
            x = coordinates.x,
            y = coordinates.y,
            "Prepared signing request"
        );

        Ok(SignRequest {
            pdf_id: self.session.pdf_id.clone(),
            signature_image,
            coordinates,
            pages,
        })
    }
}

/// A signed document under review
#[derive(Debug, Clone)]
pub struct SignedDocument {
    pub session: DocumentSession,
    /// Cache-busted download URL of the signed PDF
    pub signed_url: String,
    pub navigator: PageNavigator,
}

/// The whole signing workspace
#[derive(Debug, Clone, Default)]
pub enum Workspace {
    #[default]
    Empty,
    Loaded(LoadedDocument),
    Signed(SignedDocument),
}

impl Workspace {
    pub fn state_name(&self) -> &'static str {
        match self {
            Workspace::Empty => "empty",
            Workspace::Loaded(_) => "loaded",
            Workspace::Signed(_) => "signed",
        }
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        match self {
            Workspace::Empty => None,
            Workspace::Loaded(doc) => Some(&doc.session),
            Workspace::Signed(doc) => Some(&doc.session),
        }
    }

    /// Navigator of whichever document is displayed
    pub fn navigator(&self) -> Option<&PageNavigator> {
        match self {
            Workspace::Empty => None,
            Workspace::Loaded(doc) => Some(&doc.navigator),
            Workspace::Signed(doc) => Some(&doc.navigator),
        }
    }

    pub fn navigator_mut(&mut self) -> DeskResult<&mut PageNavigator> {
        let state = self.state_description();
        match self {
            Workspace::Empty => Err(DeskError::InvalidState {
                action: "navigate pages",
                state,
            }),
            Workspace::Loaded(doc) => Ok(&mut doc.navigator),
            Workspace::Signed(doc) => Ok(&mut doc.navigator),
        }
    }

    pub fn loaded_mut(&mut self, action: &'static str) -> DeskResult<&mut LoadedDocument> {
        let state = self.state_description();
        match self {
            Workspace::Loaded(doc) => Ok(doc),
            _ => Err(DeskError::InvalidState { action, state }),
        }
    }

    /// Fails unless no document is loaded
    pub fn ensure_empty(&self, action: &'static str) -> DeskResult<()> {
        match self {
            Workspace::Empty => Ok(()),
            _ => Err(self.invalid(action)),
        }
    }

    /// Enter the loaded state with a freshly uploaded document
    pub fn load(&mut self, session: DocumentSession) -> DeskResult<()> {
        self.ensure_empty("upload a document")?;
        *self = Workspace::Loaded(LoadedDocument::new(session));
        Ok(())
    }

    /// Handle a click on the rendered page
    pub fn place_field(
        &mut self,
        click: ClientPoint,
        canvas: Option<&CanvasRect>,
        size: FieldSize,
    ) -> DeskResult<Placement> {
        match self {
            Workspace::Loaded(doc) => doc.place_field(click, canvas, size).map(Placement::Placed),
            Workspace::Empty | Workspace::Signed(_) => Ok(Placement::Ignored),
        }
    }

    /// Switch to review mode. The field, flag and pad are dropped with the loaded state.
    pub fn mark_signed(&mut self, signed_url: String) -> DeskResult<()> {
        match std::mem::take(self) {
            Workspace::Loaded(doc) => {
                *self = Workspace::Signed(SignedDocument {
                    session: doc.session,
                    signed_url,
                    navigator: PageNavigator::new(),
                });
                Ok(())
            }
            other => {
                *self = other;
                Err(self.invalid("finish signing"))
            }
        }
    }

    /// Drop everything, returning the session that was discarded
    pub fn reset(&mut self) -> Option<DocumentSession> {
        match std::mem::take(self) {
            Workspace::Empty => None,
            Workspace::Loaded(doc) => Some(doc.session),
            Workspace::Signed(doc) => Some(doc.session),
        }
    }

    fn state_description(&self) -> &'static str {
        match self {
            Workspace::Empty => "no document is loaded",
            Workspace::Loaded(_) => "a document is awaiting signature",
            Workspace::Signed(_) => "reviewing a signed document",
        }
    }

    fn invalid(&self, action: &'static str) -> DeskError {
        DeskError::InvalidState {
            action,
            state: self.state_description(),
        }
    }
}
