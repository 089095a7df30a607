use image::{ImageBuffer, Rgb};
use planscope::calibration::{MemoryStore, ScaleCalibrator, SessionToken};
use planscope::models::{AnalysisResult, BoundingBox, DetectionRecord, ModelKind};
use tempfile::NamedTempFile;

/// Natural size used by the overlay and calibration tests
pub const PLAN_SIZE: (u32, u32) = (400, 300);

/// Writes a 100x100 floor plan (white sheet, 2 px dark outer wall) to a
/// temporary PNG. The file is removed when the handle is dropped.
pub fn create_test_image() -> NamedTempFile {
    let plan = ImageBuffer::from_fn(100, 100, |x, y| {
        if x < 2 || y < 2 || x > 97 || y > 97 {
            Rgb([40u8, 40, 40])
        } else {
            Rgb([255u8, 255, 255])
        }
    });
    let file = tempfile::Builder::new()
        .prefix("plan")
        .suffix(".png")
        .tempfile()
        .expect("temp plan file");
    plan.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("write plan png");
    file
}

/// Detection at a fixed 10x10 box offset by `x`
pub fn make_detection(class_name: &str, confidence: f64, x: f64) -> DetectionRecord {
    DetectionRecord::new(class_name, confidence, BoundingBox::new(x, 10.0, x + 10.0, 20.0))
}

/// Successful single-model result for `plan.png`
pub fn make_result(model: ModelKind, detections: Vec<DetectionRecord>) -> AnalysisResult {
    AnalysisResult::succeeded("plan.png", model, detections)
}

pub fn make_failed(model: ModelKind, error: &str) -> AnalysisResult {
    AnalysisResult::failed("plan.png", model, error)
}

/// Calibrator over an in-memory store; the store handle is returned for inspection
pub fn make_calibrator(token: &str) -> (ScaleCalibrator, MemoryStore) {
    let store = MemoryStore::new();
    let mut calibrator = ScaleCalibrator::new(SessionToken::new(token), Box::new(store.clone()));
    calibrator.set_natural_size(Some(PLAN_SIZE));
    (calibrator, store)
}
