use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, Rgba};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ResultImageError};

/// A point in native image pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Opaque display color. Serialized as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Pixel with the given opacity in `[0, 1]`
    pub fn with_alpha(&self, alpha: f64) -> Rgba<u8> {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        Rgba([self.r, self.g, self.b, a])
    }

    pub fn opaque(&self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidColor(s.to_string()));
        }
        let value = u32::from_str_radix(digits, 16)
            .map_err(|_| ConfigError::InvalidColor(s.to_string()))?;
        Ok(Color {
            r: ((value >> 16) & 0xFF) as u8,
            g: ((value >> 8) & 0xFF) as u8,
            b: (value & 0xFF) as u8,
        })
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.hex()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Axis-aligned box in native image pixel space, as emitted by the analysis service
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Point {
        Point::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Shrink every side by `margin`; collapses to the center instead of inverting
    pub fn inset(&self, margin: f64) -> BoundingBox {
        let center = self.center();
        let half_w = (self.width() / 2.0 - margin).max(0.0);
        let half_h = (self.height() / 2.0 - margin).max(0.0);
        BoundingBox::new(
            center.x - half_w,
            center.y - half_h,
            center.x + half_w,
            center.y + half_h,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Intersection over union, 0 for disjoint or degenerate boxes
    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let left = self.x1.max(other.x1);
        let top = self.y1.max(other.y1);
        let right = self.x2.min(other.x2);
        let bottom = self.y2.min(other.y2);

        if right < left || bottom < top {
            return 0.0;
        }

        let intersection = (right - left) * (bottom - top);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// Which detector produced an analysis result
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelKind {
    Yolo,
    Detectron2,
    Floorplan,
    /// Backend-side fusion of several models
    Combined,
    Other(String),
}

impl ModelKind {
    /// The three detectors that get a per-model tally
    pub const TALLIED: [ModelKind; 3] =
        [ModelKind::Yolo, ModelKind::Detectron2, ModelKind::Floorplan];

    pub fn as_str(&self) -> &str {
        match self {
            ModelKind::Yolo => "yolo",
            ModelKind::Detectron2 => "detectron2",
            ModelKind::Floorplan => "floorplan",
            ModelKind::Combined => "combined",
            ModelKind::Other(name) => name,
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, ModelKind::Combined)
    }
}

impl From<&str> for ModelKind {
    fn from(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "yolo" => ModelKind::Yolo,
            "detectron2" => ModelKind::Detectron2,
            "floorplan" => ModelKind::Floorplan,
            "combined" => ModelKind::Combined,
            _ => ModelKind::Other(value.trim().to_string()),
        }
    }
}

impl From<String> for ModelKind {
    fn from(value: String) -> Self {
        ModelKind::from(value.as_str())
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection as reported by the analysis service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub class_name: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Present only when the record is already a multi-model fusion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_confidences: Option<BTreeMap<String, f64>>,
}

impl DetectionRecord {
    pub fn new(class_name: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            class_name: class_name.into(),
            confidence,
            bbox,
            sources: None,
            source_confidences: None,
        }
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = Some(sources.into_iter().map(Into::into).collect());
        self
    }
}

/// `analysis_results` object of a service response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub detections: Option<Vec<DetectionRecord>>,
    #[serde(default)]
    pub total_detections: usize,
}

/// Raw JSON body returned by the analysis service for one (file, model) pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub model_used: String,
    #[serde(default)]
    pub analysis_results: Option<AnalysisPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of running one model against one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub filename: String,
    pub model_used: ModelKind,
    /// `None` when the response carried no detection list at all
    pub detections: Option<Vec<DetectionRecord>>,
    pub total_detections: usize,
    /// Base64 raster with the model's own boxes burned in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn succeeded(
        filename: impl Into<String>,
        model_used: ModelKind,
        detections: Vec<DetectionRecord>,
    ) -> Self {
        Self {
            success: true,
            filename: filename.into(),
            model_used,
            total_detections: detections.len(),
            detections: Some(detections),
            result_image: None,
            error: None,
        }
    }

    pub fn failed(
        filename: impl Into<String>,
        model_used: ModelKind,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            filename: filename.into(),
            model_used,
            detections: None,
            total_detections: 0,
            result_image: None,
            error: Some(error.into()),
        }
    }

    /// Parse a raw service body
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let response: AnalysisResponse = serde_json::from_str(body)?;
        Ok(response.into())
    }

    /// Decode the annotated image the service returned, if any
    pub fn decode_result_image(&self) -> Result<Option<DynamicImage>, ResultImageError> {
        let Some(encoded) = &self.result_image else {
            return Ok(None);
        };
        // Accept both bare base64 and data URLs
        let payload = match encoded.split_once(";base64,") {
            Some((_, data)) => data,
            None => encoded.as_str(),
        };
        let bytes = STANDARD.decode(payload.trim())?;
        Ok(Some(image::load_from_memory(&bytes)?))
    }
}

impl From<AnalysisResponse> for AnalysisResult {
    fn from(response: AnalysisResponse) -> Self {
        let (detections, total_detections) = match response.analysis_results {
            Some(payload) => (payload.detections, payload.total_detections),
            None => (None, 0),
        };
        let error = if response.success {
            None
        } else {
            response.error.or(response.message)
        };
        Self {
            success: response.success,
            filename: response.filename,
            model_used: ModelKind::from(response.model_used),
            detections,
            total_detections,
            result_image: response.result_image,
            error,
        }
    }
}

/// A detection record annotated with where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionInstance {
    pub record: DetectionRecord,
    /// `model_used` of the originating result
    pub model: String,
    /// Position of the originating result in the result list
    pub result_index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_and_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 20.0, 30.0, 30.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-12);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn inset_never_inverts() {
        let bbox = BoundingBox::new(0.0, 0.0, 4.0, 10.0);
        let inset = bbox.inset(3.0);
        assert_eq!(inset.width(), 0.0);
        assert_eq!(inset.height(), 4.0);
        assert_eq!(inset.center(), bbox.center());
    }

    #[test]
    fn color_hex_round_trip_and_rejects_garbage() {
        let color: Color = "#ef4444".parse().unwrap();
        assert_eq!(color, Color::rgb(0xEF, 0x44, 0x44));
        assert_eq!(color.hex(), "#EF4444");
        assert!("red".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
    }

    #[test]
    fn model_kind_parses_case_insensitively() {
        assert_eq!(ModelKind::from("YOLO"), ModelKind::Yolo);
        assert_eq!(ModelKind::from("combined"), ModelKind::Combined);
        assert_eq!(ModelKind::from("sam"), ModelKind::Other("sam".into()));
    }

    #[test]
    fn response_without_detections_keeps_none() {
        let body = r#"{"success": true, "filename": "a.png", "model_used": "yolo", "analysis_results": {"total_detections": 0}}"#;
        let result = AnalysisResult::from_json(body).unwrap();
        assert!(result.success);
        assert!(result.detections.is_none());
    }

    #[test]
    fn failed_response_carries_error() {
        let body = r#"{"success": false, "filename": "a.png", "model_used": "detectron2", "error": "model missing"}"#;
        let result = AnalysisResult::from_json(body).unwrap();
        assert!(!result.success);
        assert_eq!(result.model_used, ModelKind::Detectron2);
        assert_eq!(result.error.as_deref(), Some("model missing"));
    }

    #[test]
    fn result_image_decodes_from_data_url() {
        use base64::Engine as _;

        let mut png = Vec::new();
        DynamicImage::new_rgba8(3, 2)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let mut result = AnalysisResult::succeeded("a.png", ModelKind::Yolo, vec![]);
        assert!(result.decode_result_image().unwrap().is_none());

        result.result_image = Some(format!("data:image/png;base64,{}", STANDARD.encode(&png)));
        let image = result.decode_result_image().unwrap().unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));

        result.result_image = Some("***".to_string());
        assert!(matches!(
            result.decode_result_image(),
            Err(ResultImageError::Base64(_))
        ));
    }
}
