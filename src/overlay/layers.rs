use image::Rgba;

use crate::config::OverlayConfig;
use crate::models::{BoundingBox, Color, Point};
use crate::overlay::scene::OverlayScene;
use crate::overlay::surface::{OverlaySurface, Stroke};

/// Padding between label text and its chip edge
const CHIP_PADDING: f64 = 4.0;

/// Per-frame inputs shared by all layers
pub struct FrameContext<'a> {
    /// Wall-clock milliseconds, drives the highlight pulse
    pub now_ms: f64,
    pub config: &'a OverlayConfig,
}

/// One drawing pass of the overlay
pub trait OverlayLayer: Send + Sync {
    fn draw(
        &self,
        scene: &OverlayScene,
        surface: &mut dyn OverlaySurface,
        frame: &FrameContext<'_>,
    );

    /// Human-readable name (used in logs and debug frame names)
    fn name(&self) -> &str;
}

/// Pulse factor in `[0.4, 1.0]`, independent of frame rate
pub fn pulse(now_ms: f64, speed: f64) -> f64 {
    (now_ms * speed).sin() * 0.3 + 0.7
}

fn draw_chip(
    surface: &mut dyn OverlaySurface,
    text: &str,
    chip: &BoundingBox,
    size: f32,
    background: Rgba<u8>,
    foreground: Rgba<u8>,
) {
    surface.fill_rect(chip, background);
    surface.fill_text(
        text,
        Point::new(chip.x1 + CHIP_PADDING, chip.y1 + CHIP_PADDING),
        size,
        foreground,
    );
}

/// Confirmed scale reference: solid line, endpoint markers, centered length label
pub struct ScaleLineLayer;

impl OverlayLayer for ScaleLineLayer {
    fn draw(
        &self,
        scene: &OverlayScene,
        surface: &mut dyn OverlaySurface,
        frame: &FrameContext<'_>,
    ) {
        let Some(line) = &scene.scale_line else {
            return;
        };
        let config = frame.config;
        let color = config.scale_line_color.opaque();
        let (start, end) = (line.start(), line.end());

        surface.stroke_line(start, end, &Stroke::solid(color, config.scale_line_width));
        surface.fill_circle(start, config.endpoint_radius, color);
        surface.fill_circle(end, config.endpoint_radius, color);

        let label = line.label();
        let (w, h) = surface.measure_text(&label, config.label_size);
        let mid = start.midpoint(&end);
        let chip = BoundingBox::new(
            mid.x - w / 2.0 - CHIP_PADDING,
            mid.y - h / 2.0 - CHIP_PADDING,
            mid.x + w / 2.0 + CHIP_PADDING,
            mid.y + h / 2.0 + CHIP_PADDING,
        );
        draw_chip(surface, &label, &chip, config.label_size, Color::WHITE.opaque(), color);
    }

    fn name(&self) -> &str {
        "Scale Line"
    }
}

/// Line still being drawn: dashed, with a marker at its start
pub struct PreviewLayer;

impl OverlayLayer for PreviewLayer {
    fn draw(
        &self,
        scene: &OverlayScene,
        surface: &mut dyn OverlaySurface,
        frame: &FrameContext<'_>,
    ) {
        let Some((start, current)) = scene.preview else {
            return;
        };
        let config = frame.config;
        let color = config.preview_color.opaque();
        let stroke = Stroke::solid(color, config.preview_width).dashed(config.preview_dash);
        surface.stroke_line(start, current, &stroke);
        surface.fill_circle(start, config.endpoint_radius, color);
    }

    fn name(&self) -> &str {
        "Preview"
    }
}

/// Pulsing outline of the hovered detection
pub struct HighlightLayer;

impl OverlayLayer for HighlightLayer {
    fn draw(
        &self,
        scene: &OverlayScene,
        surface: &mut dyn OverlaySurface,
        frame: &FrameContext<'_>,
    ) {
        let Some(target) = &scene.hovered else {
            return;
        };
        let style = frame.config.highlight_style(scene.base);
        let p = pulse(frame.now_ms, frame.config.pulse_speed);
        let color = target.color;
        let bbox = target.bbox;

        surface.fill_rect(&bbox, color.with_alpha(style.fill_alpha));

        let outer = Stroke::solid(color.opaque(), (style.outer_width * p).max(1.0))
            .with_glow(style.glow_radius * p);
        surface.stroke_rect(&bbox, &outer);

        let inner = Stroke::solid(Color::WHITE.opaque(), style.inner_width);
        surface.stroke_rect(&bbox.inset(style.inner_inset), &inner);

        let (w, h) = surface.measure_text(&target.canonical_name, style.label_size);
        let chip_h = h + 2.0 * CHIP_PADDING;
        // Above the box, or inside it when the box touches the top edge
        let top = if bbox.y1 - chip_h >= 0.0 { bbox.y1 - chip_h } else { bbox.y1 };
        let chip = BoundingBox::new(bbox.x1, top, bbox.x1 + w + 2.0 * CHIP_PADDING, top + chip_h);
        draw_chip(
            surface,
            &target.canonical_name,
            &chip,
            style.label_size,
            color.opaque(),
            Color::WHITE.opaque(),
        );
    }

    fn name(&self) -> &str {
        "Highlight"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_stays_in_range() {
        for t in (0..10_000).step_by(7) {
            let p = pulse(t as f64, 0.005);
            assert!((0.4 - 1e-12..=1.0 + 1e-12).contains(&p));
        }
        assert!((pulse(0.0, 0.005) - 0.7).abs() < 1e-12);
    }
}
