use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::ImageReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use planscope::analysis::{run_batch, AnalysisFile, HttpAnalysisClient, StaticClient};
use planscope::calibration::{FileStore, PointerEvent, ScaleCalibrator, SessionToken, Unit};
use planscope::config::{AppConfig, BaseImage, FusionConfig, OverlayConfig};
use planscope::detection::fuse_all;
use planscope::models::{AnalysisResult, ModelKind, Point};
use planscope::overlay::{OverlayRenderer, OverlayScene, RasterSurface};
use planscope::session::ResultsView;

#[derive(Parser)]
#[command(name = "planscope")]
#[command(about = "Fuse floor-plan detections and render highlight overlays")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Overlay settings as JSON
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize saved analysis results by category
    Summarize {
        #[arg(value_name = "RESULTS", required = true)]
        results: Vec<PathBuf>,

        /// Add a combined result per file merged from the single-model results
        #[arg(long)]
        fuse: bool,

        /// Print the derived view as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render one overlay frame over a floor plan
    Render {
        #[arg(long, value_name = "IMAGE")]
        image: PathBuf,

        #[arg(long = "results", value_name = "RESULTS")]
        results: Vec<PathBuf>,

        /// Class to highlight, optionally with an instance index (`door:2`)
        #[arg(long, value_name = "CLASS[:N]")]
        hover: Option<String>,

        /// Draw over the service's annotated image instead of the clean plan
        #[arg(long)]
        annotated: bool,

        /// Show the scale line stored for this session
        #[arg(long, value_name = "TOKEN")]
        scale_session: Option<String>,

        /// Animation clock in milliseconds
        #[arg(long, default_value_t = 0.0)]
        at_ms: f64,

        /// Font for labels (falls back to PLANSCOPE_FONT)
        #[arg(long, value_name = "FONT")]
        font: Option<PathBuf>,

        /// Save every rendered frame to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,

        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
    },

    /// Set or clear the scale reference for a session
    Calibrate {
        #[arg(long, value_name = "TOKEN")]
        session: String,

        /// Floor plan the points refer to
        #[arg(long, value_name = "IMAGE", required_unless_present = "clear")]
        image: Option<PathBuf>,

        /// Start point in image pixels
        #[arg(
            long,
            value_name = "X,Y",
            value_parser = parse_point,
            required_unless_present = "clear"
        )]
        from: Option<Point>,

        /// End point in image pixels
        #[arg(
            long,
            value_name = "X,Y",
            value_parser = parse_point,
            required_unless_present = "clear"
        )]
        to: Option<Point>,

        /// Real-world length of the line
        #[arg(long, required_unless_present = "clear")]
        length: Option<String>,

        #[arg(long, default_value = "meters", value_parser = parse_unit)]
        unit: Unit,

        /// Remove the stored calibration instead
        #[arg(long)]
        clear: bool,
    },

    /// Send floor plans to the analysis service
    Analyze {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Models to run (repeatable)
        #[arg(short, long = "model", default_value = "yolo")]
        models: Vec<String>,

        /// Service base URL (falls back to PLANSCOPE_SERVICE_URL)
        #[arg(long, value_name = "URL")]
        service: Option<String>,

        /// Minimum confidence for floorplan OCR detections
        #[arg(long)]
        min_conf: Option<f64>,

        #[arg(long)]
        json: bool,
    },
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got {value:?}"))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok(Point::new(x, y))
}

fn parse_unit(value: &str) -> Result<Unit, String> {
    value.parse().map_err(|e: planscope::error::ConfigError| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Cli::parse();

    let default_filter = if args.verbose { "planscope=debug" } else { "planscope=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = AppConfig::from_env();
    let overlay = match &args.config {
        Some(path) => OverlayConfig::from_file(path)?,
        None => OverlayConfig::default(),
    };

    match args.command {
        Command::Summarize { results, fuse, json } => {
            let mut results = load_results(&results).await?;
            if fuse {
                add_fused(&mut results);
            }
            let view = ResultsView::derive(&results);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
        }

        Command::Render {
            image,
            results,
            hover,
            annotated,
            scale_session,
            at_ms,
            font,
            debug_out,
            output,
        } => {
            let plan = ImageReader::open(&image)
                .with_context(|| format!("Failed to open {}", image.display()))?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
            let natural = (plan.width(), plan.height());
            tracing::info!("Image loaded: {}x{}", natural.0, natural.1);

            let results = load_results(&results).await?;
            let view = ResultsView::derive(&results);

            let mut scene = OverlayScene::new(Some(natural));
            scene.base = if annotated { BaseImage::Annotated } else { BaseImage::Clean };
            if let Some(target_arg) = hover {
                let (name, index) = match target_arg.rsplit_once(':') {
                    Some((name, index)) => (name.to_string(), index.parse::<usize>()?),
                    None => (target_arg.clone(), 0),
                };
                let canonical = planscope::detection::normalize(&name);
                scene.hovered = Some(view.target(&canonical, index).with_context(|| {
                    format!("No detection {}#{} in results", canonical, index)
                })?);
            }
            if let Some(token) = scale_session {
                let store = FileStore::new(&app.store_dir);
                let mut calibrator =
                    ScaleCalibrator::new(SessionToken::new(token), Box::new(store));
                scene.scale_line = calibrator.restore()?.cloned();
            }

            let mut surface = RasterSurface::new(natural.0, natural.1);
            if let Some(path) = font.or(app.font_path) {
                surface = surface.with_font(RasterSurface::load_font(&path)?);
            }
            let mut renderer =
                OverlayRenderer::standard(surface, overlay).with_verbose(args.verbose);
            if let Some(dir) = debug_out {
                renderer = renderer.with_debug(dir)?;
            }
            renderer.render(&scene, at_ms)?;

            let base = match scene.base {
                BaseImage::Annotated => annotated_base(&results).unwrap_or(plan),
                BaseImage::Clean => plan,
            };
            let frame = renderer.surface().composite_over(&base);
            frame
                .save(&output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Saved overlay to {}", output.display());
        }

        Command::Calibrate {
            session,
            image,
            from,
            to,
            length,
            unit,
            clear,
        } => {
            let store = FileStore::new(&app.store_dir);
            let mut calibrator = ScaleCalibrator::new(SessionToken::new(session), Box::new(store));
            if clear {
                calibrator.clear()?;
                println!("Scale calibration cleared");
                return Ok(());
            }

            let (Some(image), Some(from), Some(to), Some(length)) = (image, from, to, length) else {
                anyhow::bail!("--image, --from, --to and --length are required");
            };
            let natural = image::image_dimensions(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            calibrator.set_natural_size(Some(natural));
            calibrator.set_drawing_mode(true);
            calibrator.pointer_down(&PointerEvent::unscaled(from.x, from.y, natural));
            calibrator.pointer_up(&PointerEvent::unscaled(to.x, to.y, natural));
            let calibration = calibrator.commit(&length, unit)?;
            println!(
                "{:.1} px = {} → {:.3} px per {}",
                calibration.pixel_length(),
                calibration.label(),
                calibration.pixels_per_unit,
                calibration.unit
            );
        }

        Command::Analyze {
            files,
            models,
            service,
            min_conf,
            json,
        } => {
            let mut client = HttpAnalysisClient::new(service.unwrap_or(app.service_url));
            if let Some(min_conf) = min_conf {
                client = client.with_min_conf(min_conf);
            }
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                uploads.push(AnalysisFile::open(path).await?);
            }
            let models: Vec<ModelKind> =
                models.iter().map(|m| ModelKind::from(m.as_str())).collect();

            let batch = run_batch(&client, &uploads, &models).await?;
            for failure in &batch.failures {
                eprintln!("warning: {}", failure);
            }
            let view = ResultsView::derive(&batch.results);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_view(&view);
            }
        }
    }

    Ok(())
}

async fn load_results(paths: &[PathBuf]) -> anyhow::Result<Vec<AnalysisResult>> {
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let client = StaticClient::load(paths).await?;
    Ok(client.results())
}

fn add_fused(results: &mut Vec<AnalysisResult>) {
    for (filename, summary) in fuse_all(results, &FusionConfig::default()) {
        println!(
            "{}: {} fused detections, {} unique classes, {} confirmed by all models",
            filename,
            summary.total_detections,
            summary.unique_classes,
            summary
                .detections_by_source_count
                .get(&ModelKind::TALLIED.len())
                .copied()
                .unwrap_or(0)
        );
    }
}

fn annotated_base(results: &[AnalysisResult]) -> Option<image::DynamicImage> {
    results.iter().find_map(|result| match result.decode_result_image() {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Ignoring result image of {}: {}", result.filename, e);
            None
        }
    })
}

fn print_view(view: &ResultsView) {
    if view.is_empty() {
        println!("No detections");
        return;
    }
    for category in &view.categories {
        println!("\n{} {} ({})", category.icon, category.name, category.entities.len());
        for entity in &category.entities {
            println!(
                "  {:<20} x{:<4} avg {:.2}  yolo {} / detectron2 {} / floorplan {}  [{}]",
                entity.canonical_name,
                entity.total_count,
                entity.avg_confidence,
                entity.per_model_count.yolo,
                entity.per_model_count.detectron2,
                entity.per_model_count.floorplan,
                entity.contributing_models.join(", ")
            );
        }
    }
}

