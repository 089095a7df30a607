//! Talking to the analysis service and fanning requests out over files and models.

pub mod batch;
pub mod http;

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use crate::error::ClientError;
use crate::models::{AnalysisResult, ModelKind};

pub use batch::{run_batch, AnalysisBatch};
pub use http::HttpAnalysisClient;

/// An uploaded floor plan
#[derive(Debug, Clone)]
pub struct AnalysisFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl AnalysisFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk, keeping only its file name
    pub async fn open(path: &Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, bytes })
    }
}

/// Runs one model against one file
pub trait AnalysisClient {
    fn analyze(
        &self,
        file: &AnalysisFile,
        model: &ModelKind,
    ) -> impl Future<Output = Result<AnalysisResult, ClientError>>;
}

/// Serves canned results, keyed by file name and model
#[derive(Debug, Clone, Default)]
pub struct StaticClient {
    responses: HashMap<(String, ModelKind), Result<AnalysisResult, (u16, String)>>,
}

impl StaticClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result(mut self, result: AnalysisResult) -> Self {
        let key = (result.filename.clone(), result.model_used.clone());
        self.responses.insert(key, Ok(result));
        self
    }

    /// Make requests for this pair fail as if the service returned `status`
    pub fn with_failure(
        mut self,
        filename: impl Into<String>,
        model: ModelKind,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        self.responses
            .insert((filename.into(), model), Err((status, body.into())));
        self
    }

    /// Load result JSON files as produced by the service
    pub async fn load(paths: &[impl AsRef<Path>]) -> Result<Self, ClientError> {
        let mut client = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ClientError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            client = client.with_result(AnalysisResult::from_json(&text)?);
        }
        Ok(client)
    }

    pub fn results(&self) -> Vec<AnalysisResult> {
        let mut results: Vec<_> = self
            .responses
            .values()
            .filter_map(|response| response.as_ref().ok().cloned())
            .collect();
        results.sort_by(|a, b| {
            (a.filename.as_str(), &a.model_used).cmp(&(b.filename.as_str(), &b.model_used))
        });
        results
    }
}

impl AnalysisClient for StaticClient {
    async fn analyze(
        &self,
        file: &AnalysisFile,
        model: &ModelKind,
    ) -> Result<AnalysisResult, ClientError> {
        match self.responses.get(&(file.filename.clone(), model.clone())) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err((status, body))) => Err(ClientError::Api {
                status: *status,
                body: body.clone(),
            }),
            None => Err(ClientError::NotFound {
                filename: file.filename.clone(),
                model: model.clone(),
            }),
        }
    }
}
