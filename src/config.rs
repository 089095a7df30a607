use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::{Color, ModelKind};

/// Default analysis service location
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

/// Which raster the overlay sits on top of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseImage {
    /// The uploaded floor plan as-is
    #[default]
    Clean,
    /// The service's result image with its own boxes already burned in
    Annotated,
}

/// Visual weight of the hovered-detection highlight
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighlightStyle {
    pub glow_radius: f64,
    pub outer_width: f64,
    pub inner_width: f64,
    /// Distance between the outer box and the white inner stroke
    pub inner_inset: f64,
    pub fill_alpha: f64,
    pub label_size: f32,
}

impl HighlightStyle {
    pub const CLEAN: HighlightStyle = HighlightStyle {
        glow_radius: 15.0,
        outer_width: 3.0,
        inner_width: 1.0,
        inner_inset: 2.0,
        fill_alpha: 0.15,
        label_size: 14.0,
    };

    /// Heavier strokes so the highlight reads over already-drawn boxes
    pub const ANNOTATED: HighlightStyle = HighlightStyle {
        glow_radius: 25.0,
        outer_width: 5.0,
        inner_width: 2.0,
        inner_inset: 3.0,
        fill_alpha: 0.25,
        label_size: 16.0,
    };
}

/// Overlay look and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub frame_interval_ms: u64,
    /// Multiplier `k` in `sin(now_ms * k)`
    pub pulse_speed: f64,
    pub hover_clear_delay_ms: u64,
    pub scale_line_color: Color,
    pub preview_color: Color,
    pub scale_line_width: f64,
    pub preview_width: f64,
    pub endpoint_radius: f64,
    /// Dash and gap length of the in-progress preview line
    pub preview_dash: [f64; 2],
    pub label_size: f32,
    pub clean: HighlightStyle,
    pub annotated: HighlightStyle,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            pulse_speed: 0.005,
            hover_clear_delay_ms: 150,
            scale_line_color: Color::rgb(0xEF, 0x44, 0x44),
            preview_color: Color::rgb(0xF5, 0x9E, 0x0B),
            scale_line_width: 3.0,
            preview_width: 2.0,
            endpoint_radius: 5.0,
            preview_dash: [8.0, 4.0],
            label_size: 14.0,
            clean: HighlightStyle::CLEAN,
            annotated: HighlightStyle::ANNOTATED,
        }
    }
}

impl OverlayConfig {
    /// Load from a JSON file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: OverlayConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "frame_interval_ms",
                value: "0".into(),
            });
        }
        if !self.pulse_speed.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "pulse_speed",
                value: self.pulse_speed.to_string(),
            });
        }
        if self.preview_dash.iter().any(|len| *len <= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "preview_dash",
                value: format!("{:?}", self.preview_dash),
            });
        }
        Ok(())
    }

    pub fn highlight_style(&self, base: BaseImage) -> HighlightStyle {
        match base {
            BaseImage::Clean => self.clean,
            BaseImage::Annotated => self.annotated,
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn hover_clear_delay(&self) -> Duration {
        Duration::from_millis(self.hover_clear_delay_ms)
    }
}

/// Multi-model merge parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub iou_threshold: f64,
    /// Per-model multiplier applied to confidences before ranking
    pub weights: BTreeMap<String, f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        let weights = [("yolo", 1.0), ("detectron2", 1.0), ("floorplan", 0.9)]
            .into_iter()
            .map(|(model, weight)| (model.to_string(), weight))
            .collect();
        Self {
            iou_threshold: 0.3,
            weights,
        }
    }
}

impl FusionConfig {
    /// Weight for `model`; unlisted models count fully
    pub fn weight(&self, model: &ModelKind) -> f64 {
        self.weights.get(model.as_str()).copied().unwrap_or(1.0)
    }
}

/// Process-level settings taken from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub service_url: String,
    /// Directory backing the calibration file store
    pub store_dir: PathBuf,
    pub font_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read `PLANSCOPE_*` variables, falling back to defaults.
    ///
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Self {
        let service_url = std::env::var("PLANSCOPE_SERVICE_URL")
            .unwrap_or_else(|_| DEFAULT_SERVICE_URL.to_string());
        let store_dir = std::env::var("PLANSCOPE_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".planscope"));
        let font_path = std::env::var("PLANSCOPE_FONT").ok().map(PathBuf::from);

        Self {
            service_url: service_url.trim_end_matches('/').to_string(),
            store_dir,
            font_path,
        }
    }
}
