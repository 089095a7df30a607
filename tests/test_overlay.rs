mod common;

use common::*;
use image::Rgba;
use planscope::calibration::ScaleCalibration;
use planscope::config::{BaseImage, OverlayConfig};
use planscope::detection::UNMAPPED_CLASS_COLOR;
use planscope::error::RenderError;
use planscope::models::Point;
use planscope::overlay::{
    DisplayList, DrawCommand, HighlightTarget, OverlayRenderer, OverlayScene, OverlaySurface,
    RasterSurface,
};

fn scale_line() -> ScaleCalibration {
    ScaleCalibration {
        start_x: 10.0,
        start_y: 200.0,
        end_x: 110.0,
        end_y: 200.0,
        real_world_length: 5.0,
        unit: Unit::Meters,
        pixels_per_unit: 20.0,
    }
}

fn full_scene() -> OverlayScene {
    let mut scene = OverlayScene::new(Some(PLAN_SIZE));
    scene.scale_line = Some(scale_line());
    scene.preview = Some((Point::new(0.0, 0.0), Point::new(50.0, 50.0)));
    scene.hovered = Some(HighlightTarget::new(
        "door",
        BoundingBox::new(100.0, 100.0, 160.0, 140.0),
    ));
    scene
}

fn outer_stroke(commands: &[DrawCommand]) -> planscope::overlay::Stroke {
    commands
        .iter()
        .find_map(|c| match c {
            DrawCommand::StrokeRect { stroke, .. } if stroke.glow > 0.0 => Some(*stroke),
            _ => None,
        })
        .expect("highlight outline drawn")
}

#[test]
fn test_layers_draw_in_fixed_order() -> anyhow::Result<()> {
    let mut renderer = OverlayRenderer::standard(DisplayList::new(), OverlayConfig::default());
    assert_eq!(renderer.layer_names(), vec!["Scale Line", "Preview", "Highlight"]);

    assert!(renderer.render(&full_scene(), 0.0)?);
    let surface = renderer.surface();
    assert_eq!(surface.size(), PLAN_SIZE);
    let commands = surface.commands();
    assert_eq!(commands[0], DrawCommand::Clear);

    let solid_line = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::Line { stroke, .. } if stroke.dash.is_none()))
        .unwrap();
    let dashed_line = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::Line { stroke, .. } if stroke.dash.is_some()))
        .unwrap();
    let highlight_fill = commands
        .iter()
        .position(|c| matches!(c, DrawCommand::FillRect { color, .. } if color[3] < 255))
        .unwrap();
    assert!(solid_line < dashed_line);
    assert!(dashed_line < highlight_fill);

    assert_eq!(surface.texts(), vec!["5 meters", "door"]);
    Ok(())
}

#[test]
fn test_each_frame_starts_from_a_clear_surface() -> anyhow::Result<()> {
    let mut renderer = OverlayRenderer::standard(DisplayList::new(), OverlayConfig::default());
    renderer.render(&full_scene(), 0.0)?;
    renderer.render(&OverlayScene::new(Some(PLAN_SIZE)), 16.0)?;
    assert_eq!(renderer.surface().commands(), &[DrawCommand::Clear]);
    assert_eq!(renderer.frames(), 2);
    Ok(())
}

#[test]
fn test_unknown_natural_size_skips_frame() -> anyhow::Result<()> {
    let mut renderer = OverlayRenderer::standard(DisplayList::new(), OverlayConfig::default());
    let mut scene = full_scene();
    scene.natural_size = None;
    assert!(!renderer.render(&scene, 0.0)?);
    assert!(renderer.surface().commands().is_empty());
    assert_eq!(renderer.frames(), 0);
    Ok(())
}

#[test]
fn test_annotated_base_uses_heavier_highlight() -> anyhow::Result<()> {
    let config = OverlayConfig::default();
    // sin(0) = 0, so the pulse factor is exactly 0.7
    let mut clean = OverlayRenderer::standard(DisplayList::new(), config.clone());
    let mut annotated = OverlayRenderer::standard(DisplayList::new(), config.clone());

    let mut scene = full_scene();
    clean.render(&scene, 0.0)?;
    scene.base = BaseImage::Annotated;
    annotated.render(&scene, 0.0)?;

    let clean_stroke = outer_stroke(clean.surface().commands());
    let annotated_stroke = outer_stroke(annotated.surface().commands());
    assert!((clean_stroke.glow - config.clean.glow_radius * 0.7).abs() < 1e-9);
    assert!((annotated_stroke.glow - config.annotated.glow_radius * 0.7).abs() < 1e-9);
    assert!(annotated_stroke.width > clean_stroke.width);
    Ok(())
}

#[test]
fn test_pulse_follows_wall_clock() -> anyhow::Result<()> {
    let config = OverlayConfig::default();
    let mut renderer = OverlayRenderer::standard(DisplayList::new(), config.clone());
    let scene = full_scene();

    // Peak of the sine wave
    let peak_ms = std::f64::consts::FRAC_PI_2 / config.pulse_speed;
    renderer.render(&scene, peak_ms)?;
    let glow = outer_stroke(renderer.surface().commands()).glow;
    assert!((glow - config.clean.glow_radius).abs() < 1e-6);
    Ok(())
}

#[test]
fn test_unmapped_class_uses_sentinel_color() -> anyhow::Result<()> {
    let mut renderer = OverlayRenderer::standard(DisplayList::new(), OverlayConfig::default());
    let mut scene = OverlayScene::new(Some(PLAN_SIZE));
    scene.hovered = Some(HighlightTarget::new(
        "spaceship",
        BoundingBox::new(10.0, 40.0, 50.0, 80.0),
    ));
    renderer.render(&scene, 0.0)?;
    assert_eq!(
        outer_stroke(renderer.surface().commands()).color,
        UNMAPPED_CLASS_COLOR.opaque()
    );
    Ok(())
}

#[test]
fn test_raster_highlight_paints_pixels() -> anyhow::Result<()> {
    let config = OverlayConfig::default();
    let mut renderer = OverlayRenderer::standard(RasterSurface::new(1, 1), config);
    let mut scene = OverlayScene::new(Some(PLAN_SIZE));
    let bbox = BoundingBox::new(100.0, 100.0, 160.0, 140.0);
    scene.hovered = Some(HighlightTarget::new("door", bbox));
    renderer.render(&scene, 0.0)?;

    let image = renderer.surface().image();
    assert_eq!(image.dimensions(), PLAN_SIZE);
    // Outline in the class color, translucent fill inside, nothing far away
    let door = planscope::detection::color_for("door");
    let edge = image.get_pixel(100, 120);
    let close = |a: u8, b: u8| (a as i16 - b as i16).abs() <= 1;
    assert!(close(edge[0], door.r) && close(edge[1], door.g) && close(edge[2], door.b));
    assert_eq!(edge[3], 255);
    let inside = image.get_pixel(130, 125);
    assert!(inside[3] > 0 && inside[3] < 255);
    assert_eq!(*image.get_pixel(300, 280), Rgba([0, 0, 0, 0]));
    Ok(())
}

#[test]
fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    std::fs::write(dir.path().join("leftover.txt"), "x")?;
    let result = OverlayRenderer::standard(RasterSurface::new(1, 1), OverlayConfig::default())
        .with_debug(dir.path().to_path_buf());
    assert!(matches!(result, Err(RenderError::DebugDirNotEmpty(_))));

    let empty = tempfile::TempDir::new()?;
    let mut renderer = OverlayRenderer::standard(RasterSurface::new(1, 1), OverlayConfig::default())
        .with_debug(empty.path().to_path_buf())?;
    renderer.render(&full_scene(), 0.0)?;
    renderer.render(&full_scene(), 16.0)?;
    assert!(empty.path().join("frame_0000.png").exists());
    assert!(empty.path().join("frame_0001.png").exists());
    Ok(())
}

#[test]
fn test_raster_scale_label_is_drawn_without_configured_font() -> anyhow::Result<()> {
    let config = OverlayConfig::default();
    let red = config.scale_line_color;
    let mut renderer = OverlayRenderer::standard(RasterSurface::new(1, 1), config);
    let mut scene = OverlayScene::new(Some(PLAN_SIZE));
    scene.scale_line = Some(ScaleCalibration {
        start_x: 10.0,
        start_y: 200.0,
        end_x: 310.0,
        end_y: 200.0,
        real_world_length: 5.0,
        unit: Unit::Meters,
        pixels_per_unit: 60.0,
    });
    renderer.render(&scene, 0.0)?;

    // The white chip hides the line around its midpoint; red pixels there are glyphs
    let image = renderer.surface().image();
    let glyph_pixels = (140..180)
        .flat_map(|x| (188..212).map(move |y| (x, y)))
        .filter(|&(x, y)| {
            let p = image.get_pixel(x, y);
            p[3] > 0 && p[0] > 200 && p[1] < 160 && p[0] > p[1] + 40
        })
        .count();
    assert!(glyph_pixels > 0, "label text missing, red = {}", red);
    Ok(())
}
