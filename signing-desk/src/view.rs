//! What the browser should display, derived from the desk state.
//!
//! The browser shell renders this snapshot as-is: which document to load,
//! which controls are enabled, where the field overlay goes, and every label.

use serde::Serialize;

use crate::desk::SigningDesk;
use crate::documents::DocumentStore;
use crate::geometry::PixelRect;
use crate::i18n::I18n;
use crate::workspace::{PageNavigator, Workspace};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    /// `empty`, `loaded` or `signed`
    pub phase: &'static str,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_overlay: Option<FieldOverlay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controls: Option<ControlsView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_pad: Option<PadView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<ReviewView>,
}

/// The document the renderer should show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentView {
    pub filename: String,
    /// Original (desk-served) while placing, signed (backend) URL while reviewing
    pub source_url: String,
    pub current_page: u32,
}

/// Page controls, present once the page count is known
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationView {
    pub current: u32,
    pub total: u32,
    pub label: String,
    pub can_go_previous: bool,
    pub can_go_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOverlay {
    pub rect: PixelRect,
    pub label: String,
}

/// Side panel while placing a signature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsView {
    pub hint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_info: Option<String>,
    pub apply_to_all: bool,
    pub apply_to_all_label: String,
    pub sign_enabled: bool,
    pub sign_label: String,
}

/// Capture dialog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PadView {
    pub title: String,
    pub hint: String,
    pub is_empty: bool,
    pub stroke_count: usize,
    pub apply_enabled: bool,
    pub apply_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub title: String,
    pub body: String,
    pub download_url: String,
}

impl ViewState {
    pub fn build(desk: &SigningDesk, i18n: &I18n, locale: &str) -> Self {
        let loading = desk.is_loading();
        let workspace = desk.workspace();

        let mut view = ViewState {
            phase: workspace.state_name(),
            loading,
            upload_prompt: None,
            document: None,
            navigation: workspace
                .navigator()
                .and_then(|nav| navigation_view(nav, i18n, locale)),
            field_overlay: None,
            controls: None,
            signature_pad: None,
            review: None,
        };

        match workspace {
            Workspace::Empty => {
                view.upload_prompt = Some(i18n.get(locale, "upload-prompt", None));
            }
            Workspace::Loaded(doc) => {
                let current = doc.navigator.current();
                view.document = Some(DocumentView {
                    filename: doc.session.filename.clone(),
                    source_url: DocumentStore::url_for(&doc.session.blob_id),
                    current_page: current,
                });

                let overlay_key = if doc.apply_to_all {
                    "field-all-pages"
                } else {
                    "field-sign-here"
                };
                view.field_overlay = doc
                    .field
                    .filter(|field| field.page == current)
                    .map(|field| FieldOverlay {
                        rect: field.rect,
                        label: i18n.get(locale, overlay_key, None),
                    });

                let page_known = doc.navigator.page_count().is_some();
                view.controls = Some(ControlsView {
                    hint: i18n.get(locale, "place-hint", None),
                    field_info: doc.field.map(|field| {
                        i18n.format(locale, "field-placed", &[("page", &field.page.to_string())])
                    }),
                    apply_to_all: doc.apply_to_all,
                    apply_to_all_label: i18n.get(locale, "apply-to-all", None),
                    sign_enabled: doc.field.is_some() && page_known && !loading,
                    sign_label: if loading {
                        i18n.get(locale, "sign-button-busy", None)
                    } else {
                        i18n.get(locale, "sign-button", None)
                    },
                });

                view.signature_pad = doc.pad.as_ref().map(|pad| PadView {
                    title: i18n.get(locale, "modal-title", None),
                    hint: i18n.get(locale, "modal-hint", None),
                    is_empty: pad.is_empty(),
                    stroke_count: pad.stroke_count(),
                    apply_enabled: !loading,
                    apply_label: if loading {
                        i18n.get(locale, "apply-button-busy", None)
                    } else {
                        i18n.get(locale, "apply-button", None)
                    },
                });
            }
            Workspace::Signed(doc) => {
                view.document = Some(DocumentView {
                    filename: doc.session.filename.clone(),
                    source_url: doc.signed_url.clone(),
                    current_page: doc.navigator.current(),
                });
                view.review = Some(ReviewView {
                    title: i18n.get(locale, "review-title", None),
                    body: i18n.get(locale, "review-body", None),
                    download_url: doc.signed_url.clone(),
                });
            }
        }

        view
    }
}

fn navigation_view(nav: &PageNavigator, i18n: &I18n, locale: &str) -> Option<NavigationView> {
    let total = nav.page_count()?;
    let current = nav.current();
    Some(NavigationView {
        current,
        total,
        label: i18n.format(
            locale,
            "page-info",
            &[("current", &current.to_string()), ("total", &total.to_string())],
        ),
        can_go_previous: nav.can_go_previous(),
        can_go_next: nav.can_go_next(),
    })
}
