use image::Rgba;

use crate::models::{BoundingBox, Point};

/// How a line or outline is stroked
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub width: f64,
    /// Dash and gap length; solid when `None`
    pub dash: Option<[f64; 2]>,
    /// Soft halo radius around the stroke, 0 for none
    pub glow: f64,
}

impl Stroke {
    pub fn solid(color: Rgba<u8>, width: f64) -> Self {
        Self {
            color,
            width,
            dash: None,
            glow: 0.0,
        }
    }

    pub fn dashed(mut self, dash: [f64; 2]) -> Self {
        self.dash = Some(dash);
        self
    }

    pub fn with_glow(mut self, radius: f64) -> Self {
        self.glow = radius.max(0.0);
        self
    }
}

/// 2D drawing target sized in native image pixels
pub trait OverlaySurface: Send {
    fn resize(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);
    /// Make every pixel transparent
    fn clear(&mut self);
    fn stroke_line(&mut self, from: Point, to: Point, stroke: &Stroke);
    fn stroke_rect(&mut self, rect: &BoundingBox, stroke: &Stroke);
    fn fill_rect(&mut self, rect: &BoundingBox, color: Rgba<u8>);
    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba<u8>);
    /// Draw text with its top-left corner at `origin`
    fn fill_text(&mut self, text: &str, origin: Point, size: f32, color: Rgba<u8>);
    /// Width and height `text` would occupy at `size`
    fn measure_text(&self, text: &str, size: f32) -> (f64, f64);

    /// Current pixels, for surfaces that have any
    fn snapshot(&self) -> Option<image::RgbaImage> {
        None
    }
}

/// One recorded drawing call
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Resize { width: u32, height: u32 },
    Clear,
    Line { from: Point, to: Point, stroke: Stroke },
    StrokeRect { rect: BoundingBox, stroke: Stroke },
    FillRect { rect: BoundingBox, color: Rgba<u8> },
    FillCircle { center: Point, radius: f64, color: Rgba<u8> },
    Text { text: String, origin: Point, size: f32, color: Rgba<u8> },
}

/// Surface that only records what was drawn since the last clear
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    size: (u32, u32),
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl OverlaySurface for DisplayList {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
    }

    fn stroke_line(&mut self, from: Point, to: Point, stroke: &Stroke) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            stroke: *stroke,
        });
    }

    fn stroke_rect(&mut self, rect: &BoundingBox, stroke: &Stroke) {
        self.commands.push(DrawCommand::StrokeRect {
            rect: *rect,
            stroke: *stroke,
        });
    }

    fn fill_rect(&mut self, rect: &BoundingBox, color: Rgba<u8>) {
        self.commands.push(DrawCommand::FillRect { rect: *rect, color });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Rgba<u8>) {
        self.commands.push(DrawCommand::FillCircle {
            center,
            radius,
            color,
        });
    }

    fn fill_text(&mut self, text: &str, origin: Point, size: f32, color: Rgba<u8>) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            size,
            color,
        });
    }

    fn measure_text(&self, text: &str, size: f32) -> (f64, f64) {
        // Rough average glyph advance
        let width = text.chars().count() as f64 * size as f64 * 0.6;
        (width, size as f64)
    }
}
