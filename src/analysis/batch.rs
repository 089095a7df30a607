use futures::future::join_all;
use tracing::{info, warn};

use crate::analysis::{AnalysisClient, AnalysisFile};
use crate::error::{BatchError, RequestFailure};
use crate::models::{AnalysisResult, ModelKind};

/// Settled outcome of every (file, model) request
#[derive(Debug, Clone, Default)]
pub struct AnalysisBatch {
    /// One entry per request, failed ones with `success == false`
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<RequestFailure>,
}

impl AnalysisBatch {
    pub fn succeeded(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|r| r.success)
    }
}

/// Issue every file × model request concurrently and wait for all of them.
///
/// Individual failures are recorded and turned into failed results; only a
/// batch where nothing succeeded is an error.
pub async fn run_batch<C: AnalysisClient>(
    client: &C,
    files: &[AnalysisFile],
    models: &[ModelKind],
) -> Result<AnalysisBatch, BatchError> {
    if files.is_empty() || models.is_empty() {
        return Err(BatchError::NothingToAnalyze);
    }

    let requests = files.iter().flat_map(move |file| {
        models.iter().map(move |model| async move {
            let outcome = client.analyze(file, model).await;
            (file, model, outcome)
        })
    });

    info!(
        "Analyzing {} file(s) with {} model(s)",
        files.len(),
        models.len()
    );
    let settled = join_all(requests).await;

    let mut batch = AnalysisBatch::default();
    for (file, model, outcome) in settled {
        let result = match outcome {
            Ok(result) => result,
            Err(e) => AnalysisResult::failed(file.filename.clone(), model.clone(), e.to_string()),
        };
        if !result.success {
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "analysis failed".to_string());
            warn!("Analysis of {} with {} failed: {}", file.filename, model, message);
            batch.failures.push(RequestFailure {
                filename: file.filename.clone(),
                model: model.clone(),
                message,
            });
        }
        batch.results.push(result);
    }

    if batch.succeeded().next().is_none() {
        return Err(BatchError::AllFailed {
            failures: batch.failures,
        });
    }

    info!(
        "Batch finished: {} succeeded, {} failed",
        batch.results.len() - batch.failures.len(),
        batch.failures.len()
    );
    Ok(batch)
}
