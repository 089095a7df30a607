//! Merging per-model detection lists into canonical entities.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::detection::normalize::normalize;
use crate::models::{AnalysisResult, DetectionInstance, DetectionRecord, ModelKind};

/// Per-model presence counters.
///
/// A fused record bumps every model in its sources, so the sum of the
/// counters may exceed the entity's instance count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelTally {
    pub yolo: usize,
    pub detectron2: usize,
    pub floorplan: usize,
}

impl ModelTally {
    /// Count one detection from `model`; models outside the tallied three are ignored
    pub fn record(&mut self, model: &ModelKind) {
        match model {
            ModelKind::Yolo => self.yolo += 1,
            ModelKind::Detectron2 => self.detectron2 += 1,
            ModelKind::Floorplan => self.floorplan += 1,
            ModelKind::Combined | ModelKind::Other(_) => {}
        }
    }

    pub fn get(&self, model: &ModelKind) -> usize {
        match model {
            ModelKind::Yolo => self.yolo,
            ModelKind::Detectron2 => self.detectron2,
            ModelKind::Floorplan => self.floorplan,
            ModelKind::Combined | ModelKind::Other(_) => 0,
        }
    }

    pub fn sum(&self) -> usize {
        self.yolo + self.detectron2 + self.floorplan
    }
}

/// All detections sharing one canonical class
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedEntity {
    pub canonical_name: String,
    pub total_count: usize,
    pub per_model_count: ModelTally,
    pub avg_confidence: f64,
    /// Insertion-ordered, no duplicates
    pub contributing_models: Vec<String>,
    pub instances: Vec<DetectionInstance>,
}

impl AggregatedEntity {
    fn new(canonical_name: String) -> Self {
        Self {
            canonical_name,
            total_count: 0,
            per_model_count: ModelTally::default(),
            avg_confidence: 0.0,
            contributing_models: Vec::new(),
            instances: Vec::new(),
        }
    }

    fn add_contributor(&mut self, model: &str) {
        if !self.contributing_models.iter().any(|m| m == model) {
            self.contributing_models.push(model.to_string());
        }
    }

    fn ingest(&mut self, ingested: IngestedRecord, model_used: &ModelKind, result_index: usize) {
        self.total_count += 1;
        let n = self.total_count as f64;
        let confidence = ingested.record().confidence;
        self.avg_confidence = (self.avg_confidence * (n - 1.0) + confidence) / n;

        match &ingested {
            IngestedRecord::Fused { sources, .. } => {
                if sources.is_empty() {
                    self.add_contributor(ModelKind::Combined.as_str());
                }
                for source in sources {
                    self.per_model_count.record(source);
                    self.add_contributor(source.as_str());
                }
            }
            IngestedRecord::Single { model, .. } => {
                self.per_model_count.record(model);
                self.add_contributor(model.as_str());
            }
        }

        self.instances.push(DetectionInstance {
            record: ingested.into_record(),
            model: model_used.to_string(),
            result_index,
        });
    }
}

/// A record resolved once at ingestion into its counting rule
#[derive(Debug, Clone, PartialEq)]
pub enum IngestedRecord {
    /// Already merged by the service from several models
    Fused {
        record: DetectionRecord,
        sources: Vec<ModelKind>,
    },
    Single {
        record: DetectionRecord,
        model: ModelKind,
    },
}

impl IngestedRecord {
    pub fn resolve(record: DetectionRecord, model_used: &ModelKind) -> Self {
        if model_used.is_combined() {
            let sources = record
                .sources
                .iter()
                .flatten()
                .map(|name| ModelKind::from(name.as_str()))
                .collect();
            IngestedRecord::Fused { record, sources }
        } else {
            IngestedRecord::Single {
                record,
                model: model_used.clone(),
            }
        }
    }

    pub fn record(&self) -> &DetectionRecord {
        match self {
            IngestedRecord::Fused { record, .. } | IngestedRecord::Single { record, .. } => record,
        }
    }

    pub fn into_record(self) -> DetectionRecord {
        match self {
            IngestedRecord::Fused { record, .. } | IngestedRecord::Single { record, .. } => record,
        }
    }
}

/// Merge every successful result into entities keyed by canonical class,
/// most frequent first. Ties keep discovery order.
pub fn combine(results: &[AnalysisResult]) -> Vec<AggregatedEntity> {
    let mut entities: Vec<AggregatedEntity> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for (result_index, result) in results.iter().enumerate() {
        if !result.success {
            debug!(
                "Skipping failed result {} ({})",
                result.filename, result.model_used
            );
            continue;
        }
        let Some(detections) = &result.detections else {
            debug!(
                "Result {} ({}) has no detection list",
                result.filename, result.model_used
            );
            continue;
        };

        for record in detections {
            let canonical = normalize(&record.class_name);
            let slot = *index_by_name.entry(canonical.clone()).or_insert_with(|| {
                entities.push(AggregatedEntity::new(canonical));
                entities.len() - 1
            });
            let ingested = IngestedRecord::resolve(record.clone(), &result.model_used);
            entities[slot].ingest(ingested, &result.model_used, result_index);
        }
    }

    // sort_by is stable
    entities.sort_by(|a, b| b.total_count.cmp(&a.total_count));
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn record(class_name: &str, confidence: f64) -> DetectionRecord {
        DetectionRecord::new(class_name, confidence, BoundingBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn running_mean_matches_plain_mean() {
        let result = AnalysisResult::succeeded(
            "plan.png",
            ModelKind::Yolo,
            vec![record("door", 0.5), record("Door", 0.7), record("DOOR", 0.9)],
        );
        let entities = combine(&[result]);
        assert_eq!(entities.len(), 1);
        assert!((entities[0].avg_confidence - 0.7).abs() < 1e-9);
        assert_eq!(entities[0].per_model_count.yolo, 3);
    }

    #[test]
    fn fused_record_without_sources_credits_combined() {
        let result =
            AnalysisResult::succeeded("plan.png", ModelKind::Combined, vec![record("window", 0.6)]);
        let entities = combine(&[result]);
        assert_eq!(entities[0].per_model_count.sum(), 0);
        assert_eq!(entities[0].contributing_models, vec!["combined".to_string()]);
        assert_eq!(entities[0].instances[0].model, "combined");
    }

    #[test]
    fn untallied_models_still_count_as_instances() {
        let result = AnalysisResult::succeeded(
            "plan.png",
            ModelKind::Other("sam".into()),
            vec![record("sink", 0.4)],
        );
        let entities = combine(&[result]);
        assert_eq!(entities[0].total_count, 1);
        assert_eq!(entities[0].per_model_count, ModelTally::default());
        assert_eq!(entities[0].contributing_models, vec!["sam".to_string()]);
    }

    #[test]
    fn ties_keep_discovery_order() {
        let result = AnalysisResult::succeeded(
            "plan.png",
            ModelKind::Floorplan,
            vec![
                record("kitchen", 0.5),
                record("door", 0.5),
                record("wall", 0.5),
                record("door", 0.5),
            ],
        );
        let names: Vec<_> = combine(&[result])
            .into_iter()
            .map(|e| e.canonical_name)
            .collect();
        assert_eq!(names, vec!["door", "kitchen", "wall"]);
    }
}
