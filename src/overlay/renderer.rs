use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::OverlayConfig;
use crate::error::RenderError;
use crate::overlay::layers::{
    FrameContext, HighlightLayer, OverlayLayer, PreviewLayer, ScaleLineLayer,
};
use crate::overlay::scene::OverlayScene;
use crate::overlay::surface::OverlaySurface;

/// Paints the overlay layers, in order, onto a surface sized to the image
pub struct OverlayRenderer<S> {
    surface: S,
    layers: Vec<Arc<dyn OverlayLayer>>,
    config: OverlayConfig,
    verbose: bool,
    debug_dir: Option<PathBuf>,
    frames: usize,
}

impl<S: OverlaySurface> OverlayRenderer<S> {
    /// Renderer with no layers
    pub fn new(surface: S, config: OverlayConfig) -> Self {
        Self {
            surface,
            layers: Vec::new(),
            config,
            verbose: false,
            debug_dir: None,
            frames: 0,
        }
    }

    /// Scale line, then preview, then highlight
    pub fn standard(surface: S, config: OverlayConfig) -> Self {
        Self::new(surface, config)
            .add_layer(Arc::new(ScaleLineLayer))
            .add_layer(Arc::new(PreviewLayer))
            .add_layer(Arc::new(HighlightLayer))
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Save every rendered frame as a PNG.
    /// The directory must be empty or non-existent.
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self, RenderError> {
        if output_dir.exists() {
            if std::fs::read_dir(&output_dir)?.next().is_some() {
                return Err(RenderError::DebugDirNotEmpty(output_dir));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        self.debug_dir = Some(output_dir);
        Ok(self)
    }

    pub fn add_layer(mut self, layer: Arc<dyn OverlayLayer>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.name()).collect()
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Frames painted so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Paint one frame. Returns `false` without touching the surface when the
    /// image's natural size is not known yet.
    pub fn render(&mut self, scene: &OverlayScene, now_ms: f64) -> Result<bool, RenderError> {
        let Some((width, height)) = scene.natural_size else {
            debug!("Skipping frame, natural image size unknown");
            return Ok(false);
        };

        self.surface.resize(width, height);
        self.surface.clear();

        let frame = FrameContext {
            now_ms,
            config: &self.config,
        };
        for layer in &self.layers {
            if self.verbose {
                info!("Drawing layer: {}", layer.name());
            }
            layer.draw(scene, &mut self.surface, &frame);
        }

        if let Some(dir) = &self.debug_dir {
            if let Some(pixels) = self.surface.snapshot() {
                let path = dir.join(format!("frame_{:04}.png", self.frames));
                pixels.save(&path)?;
                if self.verbose {
                    info!("Debug: saved {}", path.display());
                }
            }
        }

        self.frames += 1;
        Ok(true)
    }
}
