pub mod analysis;
pub mod calibration;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod overlay;
pub mod session;

pub use analysis::{
    run_batch, AnalysisBatch, AnalysisClient, AnalysisFile, HttpAnalysisClient, StaticClient,
};
pub use calibration::{
    CalibrationStore, FileStore, MemoryStore, PointerEvent, ScaleCalibrator, SessionToken, Unit,
};
pub use config::{AppConfig, BaseImage, FusionConfig, HighlightStyle, OverlayConfig};
pub use detection::{classify, combine, normalize, AggregatedEntity, Category};
pub use models::{AnalysisResult, BoundingBox, Color, DetectionRecord, ModelKind, Point};
pub use overlay::{DisplayList, OverlayRenderer, OverlayScene, OverlaySurface, RasterSurface};
pub use session::{OverlaySession, ResultsView};
