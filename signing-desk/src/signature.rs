//! Freehand signature capture.

use base64::Engine;
use image::{ImageEncoder, Rgba, RgbaImage, codecs::png::PngEncoder};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::{debug, warn};

use crate::error::{DeskError, DeskResult};

/// Upper bound on recorded points per pad
const MAX_POINTS: usize = 20_000;

const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A drawing surface that records pen strokes and renders them to a PNG
#[derive(Debug, Clone)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    pen_width: f32,
    strokes: Vec<Vec<(f32, f32)>>,
    point_count: usize,
}

impl SignaturePad {
    pub fn new(width: u32, height: u32, pen_width: f32) -> Self {
        Self {
            width,
            height,
            pen_width,
            strokes: Vec::new(),
            point_count: 0,
        }
    }

    /// True until anything has been drawn
    pub fn is_empty(&self) -> bool {
        self.point_count == 0
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }

    /// Start a new stroke at a pad-relative position
    pub fn begin_stroke(&mut self, x: f32, y: f32) {
        if !self.accept_point() {
            return;
        }
        let point = self.clamp_to_pad(x, y);
        self.strokes.push(vec![point]);
    }

    /// Continue the current stroke; starts one if the pen was not down
    pub fn extend_stroke(&mut self, x: f32, y: f32) {
        if !self.accept_point() {
            return;
        }
        let (x, y) = self.clamp_to_pad(x, y);
        match self.strokes.last_mut() {
            Some(stroke) => stroke.push((x, y)),
            None => self.strokes.push(vec![(x, y)]),
        }
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.point_count = 0;
    }

    /// Pointer positions outside the pad land on its edge; segments never
    /// get longer than the pad diagonal.
    fn clamp_to_pad(&self, x: f32, y: f32) -> (f32, f32) {
        let clamp = |value: f32, max: u32| {
            if value.is_nan() {
                0.0
            } else {
                value.clamp(0.0, max as f32)
            }
        };
        (clamp(x, self.width), clamp(y, self.height))
    }

    fn accept_point(&mut self) -> bool {
        if self.point_count >= MAX_POINTS {
            warn!(limit = MAX_POINTS, "Signature pad point limit reached, ignoring input");
            return false;
        }
        self.point_count += 1;
        true
    }

    /// Rasterize the strokes, black ink on a transparent background
    pub fn render(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        let radius = ((self.pen_width / 2.0).round() as i32).max(1);

        for stroke in &self.strokes {
            let mut points = stroke.iter();
            let Some(&(start_x, start_y)) = points.next() else {
                continue;
            };
            let (mut prev_x, mut prev_y) = (start_x, start_y);
            stamp(&mut canvas, prev_x, prev_y, radius);

            for &(x, y) in points {
                // Stamp along the segment at one-pixel spacing
                let steps = (x - prev_x).hypot(y - prev_y).ceil().max(1.0) as u32;
                for step in 1..=steps {
                    let t = step as f32 / steps as f32;
                    stamp(
                        &mut canvas,
                        prev_x + (x - prev_x) * t,
                        prev_y + (y - prev_y) * t,
                        radius,
                    );
                }
                prev_x = x;
                prev_y = y;
            }
        }

        canvas
    }

    /// Encode the signature as a `data:image/png;base64,...` URL
    pub fn to_data_url(&self) -> DeskResult<String> {
        let canvas = self.render();

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(
                canvas.as_raw(),
                self.width,
                self.height,
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| DeskError::Signature {
                message: e.to_string(),
            })?;

        debug!(
            strokes = self.strokes.len(),
            points = self.point_count,
            png_bytes = png.len(),
            "Rendered signature"
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
        Ok(format!("data:image/png;base64,{}", encoded))
    }
}

fn stamp(canvas: &mut RgbaImage, x: f32, y: f32, radius: i32) {
    draw_filled_circle_mut(canvas, (x.round() as i32, y.round() as i32), radius, INK);
}
