use std::sync::Arc;

use image::{DynamicImage, Rgb, RgbImage};
use planscope::models::{AnalysisResult, BoundingBox, DetectionRecord, ModelKind};
use planscope::overlay::{
    HighlightLayer, OverlayRenderer, OverlayScene, RasterSurface, ScaleLineLayer,
};
use planscope::session::ResultsView;
use planscope::OverlayConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Show the renderer's per-layer lines
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planscope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Plain plan: white sheet with a dark outer wall
    let mut plan = RgbImage::from_pixel(800, 600, Rgb([255, 255, 255]));
    for x in 40..760 {
        for t in 0..6 {
            plan.put_pixel(x, 40 + t, Rgb([40, 40, 40]));
            plan.put_pixel(x, 554 + t, Rgb([40, 40, 40]));
        }
    }
    let plan = DynamicImage::ImageRgb8(plan);
    println!("Created plan: {}x{}", plan.width(), plan.height());

    let results = vec![
        AnalysisResult::succeeded(
            "demo.png",
            ModelKind::Yolo,
            vec![
                DetectionRecord::new("Door", 0.92, BoundingBox::new(120.0, 40.0, 180.0, 60.0)),
                DetectionRecord::new("bed room", 0.81, BoundingBox::new(60.0, 80.0, 380.0, 320.0)),
            ],
        ),
        AnalysisResult::succeeded(
            "demo.png",
            ModelKind::Floorplan,
            vec![DetectionRecord::new("WC", 0.66, BoundingBox::new(600.0, 400.0, 700.0, 520.0))],
        ),
    ];
    let view = ResultsView::derive(&results);
    for category in &view.categories {
        println!("{} {}: {} classes", category.icon, category.name, category.entities.len());
    }

    let mut scene = OverlayScene::new(Some((plan.width(), plan.height())));
    scene.hovered = view.target("bedroom", 0);

    // Standard layer chain
    println!("\n=== Standard Overlay ===");
    let mut renderer = OverlayRenderer::standard(RasterSurface::new(1, 1), OverlayConfig::default())
        .with_verbose(true);
    println!("Layers: {:?}", renderer.layer_names());
    for (i, now_ms) in [0.0, 150.0, 300.0].into_iter().enumerate() {
        renderer.render(&scene, now_ms)?;
        let path = format!("overlay_{}.png", i);
        renderer.surface().composite_over(&plan).save(&path)?;
        println!("Saved {}", path);
    }

    // Custom chain without the preview layer
    println!("\n=== Custom Overlay ===");
    let mut custom = OverlayRenderer::new(RasterSurface::new(1, 1), OverlayConfig::default())
        .add_layer(Arc::new(ScaleLineLayer))
        .add_layer(Arc::new(HighlightLayer));
    scene.hovered = view.target("toilet", 0);
    custom.render(&scene, 0.0)?;
    custom.surface().composite_over(&plan).save("overlay_custom.png")?;
    println!("Saved overlay_custom.png");

    Ok(())
}
