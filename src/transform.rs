//! Coordinate mapping between original-image and display pixel space
//!
//! The display view is the source photograph scaled to fit the canvas and
//! optionally zoomed. A single scalar relates the two spaces:
//! `display = original * scale_factor` and `original = display / scale_factor`.

use serde::{Deserialize, Serialize};

/// Maps between original-image pixels and display pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    scale_factor: f64,
}

impl ViewTransform {
    /// 1:1 mapping, used before any image is loaded
    pub fn identity() -> Self {
        Self { scale_factor: 1.0 }
    }

    /// Fit scale on image load: shrink to the canvas, never upscale.
    pub fn fit_to_canvas(image_w: u32, image_h: u32, canvas_w: u32, canvas_h: u32) -> Self {
        let scale_w = canvas_w as f64 / image_w as f64;
        let scale_h = canvas_h as f64 / image_h as f64;
        Self {
            scale_factor: scale_w.min(scale_h).min(1.0),
        }
    }

    /// Scale under zoom. The image is first resized by the zoom level, then
    /// fit to the canvas, and the fit scale is recomposed with the zoom:
    ///
    ///   scale = min(canvas_w / (w * zoom), canvas_h / (h * zoom)) * zoom
    ///
    /// The fit term changes once the zoomed image exceeds the canvas, so the
    /// effective magnification is not a plain multiple of the zoom level.
    pub fn with_zoom(image_w: u32, image_h: u32, canvas_w: u32, canvas_h: u32, zoom: f64) -> Self {
        let new_w = image_w as f64 * zoom;
        let new_h = image_h as f64 * zoom;
        let fit = (canvas_w as f64 / new_w).min(canvas_h as f64 / new_h);
        Self {
            scale_factor: fit * zoom,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Original-image pixel to display pixel
    #[inline]
    pub fn to_display(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_factor, y * self.scale_factor)
    }

    /// Display pixel back to original-image pixel
    #[inline]
    pub fn to_original(&self, x: f64, y: f64) -> (f64, f64) {
        (x / self.scale_factor, y / self.scale_factor)
    }
}

/// Zoom level clamped to a fixed range, stepped by a fixed increment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomState {
    level: f64,
    min_zoom: f64,
    max_zoom: f64,
    step: f64,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(0.1, 5.0, 0.1)
    }
}

impl ZoomState {
    pub fn new(min_zoom: f64, max_zoom: f64, step: f64) -> Self {
        Self {
            level: 1.0,
            min_zoom,
            max_zoom,
            step,
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    /// Step in; returns false when already at the maximum.
    pub fn zoom_in(&mut self) -> bool {
        if self.level < self.max_zoom {
            self.level = (self.level + self.step).min(self.max_zoom);
            true
        } else {
            false
        }
    }

    /// Step out; returns false when already at the minimum.
    pub fn zoom_out(&mut self) -> bool {
        if self.level > self.min_zoom {
            self.level = (self.level - self.step).max(self.min_zoom);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.level = 1.0;
    }
}
