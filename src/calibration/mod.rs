//! Scale reference line: the draw gesture, its confirmation and persistence.

pub mod geometry;
pub mod scale;
pub mod store;

pub use geometry::PointerEvent;
pub use scale::{Gesture, ScaleCalibration, ScaleCalibrator, StoredCalibration, Unit};
pub use store::{CalibrationStore, FileStore, MemoryStore, SessionToken};
