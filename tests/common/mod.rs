#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from planscope for tests
pub use planscope::calibration::{
    CalibrationStore, FileStore, MemoryStore, PointerEvent, ScaleCalibrator, SessionToken, Unit,
};
pub use planscope::models::{AnalysisResult, BoundingBox, DetectionRecord, ModelKind};
