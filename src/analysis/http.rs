use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::analysis::{AnalysisClient, AnalysisFile};
use crate::error::ClientError;
use crate::models::{AnalysisResult, ModelKind};

/// Client for the analysis service's `POST /analyze` endpoint
pub struct HttpAnalysisClient {
    client: reqwest::Client,
    base_url: String,
    min_conf: Option<f64>,
    iou_threshold: Option<f64>,
    keep_classes: Vec<String>,
}

/// FastAPI-style error body
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

impl HttpAnalysisClient {
    /// `base_url` without a trailing slash, e.g. `http://localhost:8000`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            min_conf: None,
            iou_threshold: None,
            keep_classes: Vec::new(),
        }
    }

    /// Minimum confidence for floorplan OCR detections
    pub fn with_min_conf(mut self, min_conf: f64) -> Self {
        self.min_conf = Some(min_conf);
        self
    }

    /// IoU threshold the service uses in `combined` mode
    pub fn with_iou_threshold(mut self, threshold: f64) -> Self {
        self.iou_threshold = Some(threshold);
        self
    }

    /// Restrict detections to these class names
    pub fn with_keep_classes(mut self, classes: Vec<String>) -> Self {
        self.keep_classes = classes;
        self
    }

    fn query(&self, model: &ModelKind) -> Vec<(&'static str, String)> {
        let mut query = vec![("model_type", model.as_str().to_string())];
        if let Some(min_conf) = self.min_conf {
            query.push(("min_conf", min_conf.to_string()));
        }
        if let Some(threshold) = self.iou_threshold {
            query.push(("iou_threshold", threshold.to_string()));
        }
        if !self.keep_classes.is_empty() {
            query.push(("keep_classes", self.keep_classes.join(",")));
        }
        query
    }
}

impl AnalysisClient for HttpAnalysisClient {
    async fn analyze(
        &self,
        file: &AnalysisFile,
        model: &ModelKind,
    ) -> Result<AnalysisResult, ClientError> {
        // The service rejects uploads whose part is not typed image/*
        let mime = image::ImageFormat::from_path(&file.filename)
            .map(|format| format.to_mime_type())
            .unwrap_or("image/png");
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        debug!("POST {}/analyze {} with {}", self.base_url, file.filename, model);
        let response = self
            .client
            .post(format!("{}/analyze", self.base_url))
            .query(&self.query(model))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let body = serde_json::from_str::<ErrorDetail>(&body)
                .map(|e| e.detail)
                .unwrap_or(body);
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut result = AnalysisResult::from_json(&body)?;
        if result.filename.is_empty() {
            result.filename = file.filename.clone();
        }
        if matches!(&result.model_used, ModelKind::Other(name) if name.is_empty()) {
            result.model_used = model.clone();
        }
        Ok(result)
    }
}
