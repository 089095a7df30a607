use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_text_mut, text_size, Blend,
};
use imageproc::rect::Rect;

use crate::models::{BoundingBox, Point};
use crate::overlay::surface::{OverlaySurface, Stroke};

/// Opacity of the innermost glow ring relative to the stroke color
const GLOW_STRENGTH: f64 = 0.5;

/// Label font used unless [`RasterSurface::with_font`] replaces it
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Alpha-blended RGBA canvas.
///
/// Labels use the bundled DejaVu Sans. If no font could be loaded,
/// `fill_text` draws nothing and `measure_text` falls back to an estimate.
pub struct RasterSurface {
    canvas: Blend<RgbaImage>,
    font: Option<FontArc>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            canvas: Blend(RgbaImage::new(width, height)),
            font: FontArc::try_from_slice(DEFAULT_FONT).ok(),
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TTF/OTF font from disk
    pub fn load_font(path: &Path) -> anyhow::Result<FontArc> {
        let data = std::fs::read(path)?;
        FontArc::try_from_vec(data)
            .map_err(|e| anyhow::anyhow!("Failed to load font {}: {}", path.display(), e))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.canvas.0
    }

    pub fn into_image(self) -> RgbaImage {
        self.canvas.0
    }

    /// The overlay drawn on top of `base`, which is stretched to the canvas size
    pub fn composite_over(&self, base: &DynamicImage) -> RgbaImage {
        let (width, height) = self.canvas.0.dimensions();
        let mut out = base.to_rgba8();
        if out.dimensions() != (width, height) {
            out = image::imageops::resize(
                &out,
                width,
                height,
                image::imageops::FilterType::Triangle,
            );
        }
        image::imageops::overlay(&mut out, &self.canvas.0, 0, 0);
        out
    }

    fn line(&mut self, from: Point, to: Point, color: Rgba<u8>, width: f64) {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            self.fill_circle(from, width / 2.0, color);
            return;
        }
        // unit normal
        let (nx, ny) = (-dy / length, dx / length);
        let steps = width.round().max(1.0) as i32;
        for i in 0..steps {
            let offset = i as f64 - (steps - 1) as f64 / 2.0;
            draw_line_segment_mut(
                &mut self.canvas,
                ((from.x + nx * offset) as f32, (from.y + ny * offset) as f32),
                ((to.x + nx * offset) as f32, (to.y + ny * offset) as f32),
                color,
            );
        }
    }

    fn line_glow(&mut self, from: Point, to: Point, stroke: &Stroke) {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let length = (dx * dx + dy * dy).sqrt();
        if length == 0.0 {
            return;
        }
        let (nx, ny) = (-dy / length, dx / length);
        let half = stroke.width / 2.0;
        let rings = stroke.glow.ceil() as i32;
        for ring in 1..=rings {
            let color = glow_color(stroke.color, ring, stroke.glow);
            for side in [-1.0, 1.0] {
                let offset = side * (half + ring as f64);
                draw_line_segment_mut(
                    &mut self.canvas,
                    ((from.x + nx * offset) as f32, (from.y + ny * offset) as f32),
                    ((to.x + nx * offset) as f32, (to.y + ny * offset) as f32),
                    color,
                );
            }
        }
    }

    fn outline(&mut self, rect: &BoundingBox, grow: f64, color: Rgba<u8>) {
        let x = (rect.x1 - grow).round() as i32;
        let y = (rect.y1 - grow).round() as i32;
        let w = (rect.width() + 2.0 * grow).round();
        let h = (rect.height() + 2.0 * grow).round();
        if w < 1.0 || h < 1.0 {
            return;
        }
        draw_hollow_rect_mut(&mut self.canvas, Rect::at(x, y).of_size(w as u32, h as u32), color);
    }

    fn font_scale(size: f32) -> PxScale {
        PxScale::from(size.max(1.0))
    }
}

fn glow_color(base: Rgba<u8>, ring: i32, radius: f64) -> Rgba<u8> {
    let falloff = 1.0 - ring as f64 / (radius + 1.0);
    let alpha = base[3] as f64 * GLOW_STRENGTH * falloff.max(0.0);
    Rgba([base[0], base[1], base[2], alpha.round() as u8])
}

impl OverlaySurface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) {
        if self.canvas.0.dimensions() != (width, height) {
            self.canvas = Blend(RgbaImage::new(width, height));
        }
    }

    fn size(&self) -> (u32, u32) {
        self.canvas.0.dimensions()
    }

    fn clear(&mut self) {
        for pixel in self.canvas.0.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn stroke_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        if stroke.glow > 0.0 {
            self.line_glow(from, to, stroke);
        }
        let Some([dash, gap]) = stroke.dash else {
            self.line(from, to, stroke.color, stroke.width);
            return;
        };

        let length = from.distance_to(&to);
        if length == 0.0 || dash <= 0.0 {
            return;
        }
        let (ux, uy) = ((to.x - from.x) / length, (to.y - from.y) / length);
        let mut travelled = 0.0;
        while travelled < length {
            let end = (travelled + dash).min(length);
            let a = Point::new(from.x + ux * travelled, from.y + uy * travelled);
            let b = Point::new(from.x + ux * end, from.y + uy * end);
            self.line(a, b, stroke.color, stroke.width);
            travelled = end + gap.max(0.0);
        }
    }

    fn stroke_rect(&mut self, rect: &BoundingBox, stroke: &Stroke) {
        let half = stroke.width / 2.0;
        let rings = stroke.glow.ceil() as i32;
        for ring in (1..=rings).rev() {
            let color = glow_color(stroke.color, ring, stroke.glow);
            self.outline(rect, half + ring as f64, color);
        }

        let layers = stroke.width.round().max(1.0) as i32;
        for i in 0..layers {
            let grow = i as f64 - (layers - 1) as f64 / 2.0;
            self.outline(rect, grow, stroke.color);
        }
    }

    fn fill_rect(&mut self, rect: &BoundingBox, color: Rgba<u8>) {
        let w = rect.width().round();
        let h = rect.height().round();
        if w < 1.0 || h < 1.0 {
            return;
        }
        let area = Rect::at(rect.x1.round() as i32, rect.y1.round() as i32)
            .of_size(w as u32, h as u32);
        draw_filled_rect_mut(&mut self.canvas, area, color);
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba<u8>) {
        draw_filled_circle_mut(
            &mut self.canvas,
            (center.x.round() as i32, center.y.round() as i32),
            radius.round().max(1.0) as i32,
            color,
        );
    }

    fn fill_text(&mut self, text: &str, origin: Point, size: f32, color: Rgba<u8>) {
        let Some(font) = &self.font else {
            return;
        };
        draw_text_mut(
            &mut self.canvas,
            color,
            origin.x.round() as i32,
            origin.y.round() as i32,
            Self::font_scale(size),
            font,
            text,
        );
    }

    fn measure_text(&self, text: &str, size: f32) -> (f64, f64) {
        match &self.font {
            Some(font) => {
                let (w, h) = text_size(Self::font_scale(size), font, text);
                (w as f64, h.max(1) as f64)
            }
            None => (text.chars().count() as f64 * size as f64 * 0.6, size as f64),
        }
    }

    fn snapshot(&self) -> Option<RgbaImage> {
        Some(self.canvas.0.clone())
    }
}
