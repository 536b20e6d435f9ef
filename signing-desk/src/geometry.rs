//! Rendered-pixel and normalized page coordinates.
//!
//! The renderer reports where its page canvas sits on screen as a
//! [`CanvasRect`]. Pointer positions arrive in client coordinates and become
//! canvas-relative pixel positions. Fields are sent to the backend as
//! fractions of the canvas size, so the result is independent of the
//! display resolution the user happened to sign at.

use serde::{Deserialize, Serialize};

/// A point in client (viewport) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClientPoint {
    pub x: f64,
    pub y: f64,
}

/// Bounding box of the rendered page canvas, in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasRect {
    /// Whether the canvas has a usable, finite, non-empty size
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Translate a client point into canvas-relative pixels
    pub fn to_local(&self, point: ClientPoint) -> (f64, f64) {
        (point.x - self.left, point.y - self.top)
    }
}

/// A rectangle in rendered-pixel space, relative to the canvas origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    /// Fixed-size rectangle anchored (top-left) at a canvas-relative position
    pub fn anchored_at(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Express this rectangle as fractions of the canvas size.
    ///
    /// Each component is `value / canvas dimension`, clamped into `[0, 1]`.
    /// A field hanging over the right or bottom edge keeps its full size.
    /// Callers must check [`CanvasRect::is_valid`] first.
    pub fn normalize(&self, canvas: &CanvasRect) -> NormalizedRect {
        let x = clamp_unit(self.x / canvas.width);
        let y = clamp_unit(self.y / canvas.height);
        let width = clamp_unit(self.width / canvas.width);
        let height = clamp_unit(self.height / canvas.height);

        NormalizedRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// Field rectangle as fractions of the rendered page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn is_within_unit(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
