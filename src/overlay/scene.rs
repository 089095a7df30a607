use std::sync::{Arc, Mutex};

use crate::calibration::ScaleCalibration;
use crate::config::BaseImage;
use crate::detection::palette::color_for;
use crate::models::{BoundingBox, Color, DetectionInstance, Point};

/// The hovered detection, resolved to what the highlight layer needs
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightTarget {
    pub canonical_name: String,
    pub bbox: BoundingBox,
    pub color: Color,
}

impl HighlightTarget {
    pub fn new(canonical_name: impl Into<String>, bbox: BoundingBox) -> Self {
        let canonical_name = canonical_name.into();
        let color = color_for(&canonical_name);
        Self {
            canonical_name,
            bbox,
            color,
        }
    }

    pub fn from_instance(canonical_name: &str, instance: &DetectionInstance) -> Self {
        Self::new(canonical_name, instance.record.bbox)
    }
}

/// Everything the overlay layers read for one frame
#[derive(Debug, Clone, Default)]
pub struct OverlayScene {
    /// Native pixel size of the displayed image; `None` until it has loaded
    pub natural_size: Option<(u32, u32)>,
    pub base: BaseImage,
    pub scale_line: Option<ScaleCalibration>,
    /// Line being drawn or awaiting confirmation
    pub preview: Option<(Point, Point)>,
    pub hovered: Option<HighlightTarget>,
}

impl OverlayScene {
    pub fn new(natural_size: Option<(u32, u32)>) -> Self {
        Self {
            natural_size,
            ..Default::default()
        }
    }

    /// Whether anything on screen needs continuous repainting
    pub fn is_animated(&self) -> bool {
        self.hovered.is_some() || self.scale_line.is_some() || self.preview.is_some()
    }
}

pub type SharedScene = Arc<Mutex<OverlayScene>>;

pub fn shared(scene: OverlayScene) -> SharedScene {
    Arc::new(Mutex::new(scene))
}
