use std::fmt;
use std::path::PathBuf;

use crate::models::ModelKind;

/// Problems with configuration values or files
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid color {0:?}, expected #RRGGBB")]
    InvalidColor(String),

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failures of the session-scoped calibration store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored calibration is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures of the scale calibration gesture
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// User-facing validation error; the drawn line is kept for a retry
    #[error("Real-world length must be a positive number, got {0:?}")]
    InvalidLength(String),

    #[error("No scale line is waiting for confirmation")]
    NothingPending,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures talking to the analysis service
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Analysis service error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed analysis response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No result for {filename} with model {model}")]
    NotFound { filename: String, model: ModelKind },

    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One (file, model) request that did not produce a usable result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub filename: String,
    pub model: ModelKind,
    pub message: String,
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.filename, self.model, self.message)
    }
}

/// Batch-level failures
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("Nothing to analyze: no files or no models selected")]
    NothingToAnalyze,

    #[error("All {} analysis requests failed:\n{}", .failures.len(), format_failures(.failures))]
    AllFailed { failures: Vec<RequestFailure> },
}

fn format_failures(failures: &[RequestFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("  - {}", failure))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failures while painting an overlay frame
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to save debug frame: {0}")]
    DebugFrame(#[from] image::ImageError),

    #[error("Debug directory is not empty: {0:?}")]
    DebugDirNotEmpty(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures decoding the annotated raster attached to a result
#[derive(Debug, thiserror::Error)]
pub enum ResultImageError {
    #[error("Result image is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decode result image: {0}")]
    Image(#[from] image::ImageError),
}
