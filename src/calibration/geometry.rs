use serde::{Deserialize, Serialize};

use crate::models::Point;

/// Pointer position on the displayed (possibly scaled) image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// Offset from the image's left edge, in screen pixels
    pub x: f64,
    pub y: f64,
    /// On-screen size of the image when the event fired
    pub displayed_width: f64,
    pub displayed_height: f64,
}

impl PointerEvent {
    pub fn new(x: f64, y: f64, displayed_width: f64, displayed_height: f64) -> Self {
        Self {
            x,
            y,
            displayed_width,
            displayed_height,
        }
    }

    /// Event on an image displayed at its natural size
    pub fn unscaled(x: f64, y: f64, natural: (u32, u32)) -> Self {
        Self::new(x, y, natural.0 as f64, natural.1 as f64)
    }

    /// Convert to native image pixels.
    ///
    /// The ratio is taken from this event's own displayed size, so a resize
    /// between events never uses a stale scale. Returns `None` when the
    /// natural size is unknown or the displayed size is degenerate.
    pub fn to_natural(&self, natural: Option<(u32, u32)>) -> Option<Point> {
        let (natural_w, natural_h) = natural?;
        if natural_w == 0 || natural_h == 0 {
            return None;
        }
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(self.displayed_width) || !valid(self.displayed_height) {
            return None;
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }

        let ratio_x = natural_w as f64 / self.displayed_width;
        let ratio_y = natural_h as f64 / self.displayed_height;
        Some(Point::new(self.x * ratio_x, self.y * ratio_y))
    }
}
