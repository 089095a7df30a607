//! IoU-based merge of several models' detections on the same file.
//!
//! Produces the `combined` results that [`crate::detection::aggregate`]
//! counts through their `sources`.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::FusionConfig;
use crate::detection::normalize::normalize;
use crate::models::{AnalysisResult, DetectionRecord, ModelKind};

struct Candidate<'a> {
    model: &'a ModelKind,
    record: &'a DetectionRecord,
    canonical: String,
    weighted: f64,
}

/// Merge per-model detection lists.
///
/// Detections are ranked by confidence times model weight. Each unclaimed
/// detection seeds a group and absorbs every later detection of the same
/// canonical class whose IoU with the seed exceeds the threshold. The merged
/// confidence is the mean over contributing models.
pub fn fuse(
    inputs: &[(ModelKind, Vec<DetectionRecord>)],
    config: &FusionConfig,
) -> Vec<DetectionRecord> {
    let mut candidates: Vec<Candidate<'_>> = inputs
        .iter()
        .flat_map(|(model, records)| {
            let weight = config.weight(model);
            records.iter().map(move |record| Candidate {
                model,
                record,
                canonical: normalize(&record.class_name),
                weighted: record.confidence * weight,
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.weighted.total_cmp(&a.weighted));

    let mut claimed = vec![false; candidates.len()];
    let mut merged = Vec::new();

    for i in 0..candidates.len() {
        if claimed[i] {
            continue;
        }
        claimed[i] = true;
        let seed = &candidates[i];

        let mut sources = vec![seed.model.as_str().to_string()];
        let mut source_confidences = BTreeMap::new();
        source_confidences.insert(seed.model.as_str().to_string(), seed.record.confidence);

        for j in (i + 1)..candidates.len() {
            let other = &candidates[j];
            if claimed[j] || other.canonical != seed.canonical {
                continue;
            }
            if seed.record.bbox.iou(&other.record.bbox) > config.iou_threshold {
                claimed[j] = true;
                let name = other.model.as_str().to_string();
                if !sources.contains(&name) {
                    sources.push(name.clone());
                }
                source_confidences.insert(name, other.record.confidence);
            }
        }

        let confidence =
            source_confidences.values().sum::<f64>() / source_confidences.len() as f64;
        merged.push(DetectionRecord {
            class_name: title_case(&seed.canonical),
            confidence,
            bbox: seed.record.bbox,
            sources: Some(sources),
            source_confidences: Some(source_confidences),
        });
    }

    debug!(
        "Fused {} detections into {}",
        candidates.len(),
        merged.len()
    );
    merged
}

/// Build one `combined` result per filename from successful single-model results.
///
/// Returns `None` when no single-model result for `filename` succeeded.
pub fn fuse_results(
    filename: &str,
    results: &[AnalysisResult],
    config: &FusionConfig,
) -> Option<AnalysisResult> {
    let inputs: Vec<(ModelKind, Vec<DetectionRecord>)> = results
        .iter()
        .filter(|r| r.success && r.filename == filename && !r.model_used.is_combined())
        .map(|r| (r.model_used.clone(), r.detections.clone().unwrap_or_default()))
        .collect();

    if inputs.is_empty() {
        return None;
    }

    let merged = fuse(&inputs, config);
    Some(AnalysisResult::succeeded(filename, ModelKind::Combined, merged))
}

/// Fuse every filename in place: its successful single-model results are
/// replaced by one `combined` result. Failed results and `combined` results
/// already in the list are kept. Returns the summary of each fused file.
pub fn fuse_all(
    results: &mut Vec<AnalysisResult>,
    config: &FusionConfig,
) -> Vec<(String, FusionSummary)> {
    let mut filenames: Vec<String> = results.iter().map(|r| r.filename.clone()).collect();
    filenames.sort();
    filenames.dedup();

    let mut summaries = Vec::new();
    for filename in filenames {
        let Some(combined) = fuse_results(&filename, results, config) else {
            continue;
        };
        let records = combined.detections.as_deref().unwrap_or_default();
        summaries.push((filename.clone(), FusionSummary::from_records(records)));
        results.retain(|r| r.filename != filename || !r.success || r.model_used.is_combined());
        results.push(combined);
    }
    summaries
}

/// Statistics over a fused detection list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FusionSummary {
    pub total_detections: usize,
    pub detections_by_class: BTreeMap<String, usize>,
    /// Number of contributing models → number of detections
    pub detections_by_source_count: BTreeMap<usize, usize>,
    pub model_contributions: BTreeMap<String, usize>,
    pub unique_classes: usize,
}

impl FusionSummary {
    pub fn from_records(records: &[DetectionRecord]) -> Self {
        let mut summary = FusionSummary {
            total_detections: records.len(),
            ..Default::default()
        };
        for count in 1..=ModelKind::TALLIED.len() {
            summary.detections_by_source_count.insert(count, 0);
        }
        for model in &ModelKind::TALLIED {
            summary.model_contributions.insert(model.to_string(), 0);
        }

        for record in records {
            *summary
                .detections_by_class
                .entry(record.class_name.clone())
                .or_default() += 1;

            let sources = record.sources.as_deref().unwrap_or_default();
            *summary
                .detections_by_source_count
                .entry(sources.len())
                .or_default() += 1;
            for source in sources {
                *summary
                    .model_contributions
                    .entry(source.clone())
                    .or_default() += 1;
            }
        }

        summary.unique_classes = summary.detections_by_class.len();
        summary
    }
}

/// "living room" → "Living Room"
pub fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn det(class_name: &str, confidence: f64, bbox: BoundingBox) -> DetectionRecord {
        DetectionRecord::new(class_name, confidence, bbox)
    }

    #[test]
    fn overlapping_same_class_boxes_merge() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let shifted = BoundingBox::new(10.0, 0.0, 110.0, 100.0);
        let inputs = vec![
            (ModelKind::Yolo, vec![det("Bed Room", 0.9, bbox)]),
            (ModelKind::Detectron2, vec![det("bedroom", 0.7, shifted)]),
        ];
        let merged = fuse(&inputs, &FusionConfig::default());
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].class_name, "Bedroom");
        assert_eq!(merged[0].bbox, bbox);
        assert!((merged[0].confidence - 0.8).abs() < 1e-9);
        assert_eq!(
            merged[0].sources.as_deref(),
            Some(&["yolo".to_string(), "detectron2".to_string()][..])
        );
    }

    #[test]
    fn different_classes_or_distant_boxes_stay_apart() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let far = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
        let inputs = vec![
            (ModelKind::Yolo, vec![det("door", 0.9, a), det("window", 0.8, a)]),
            (ModelKind::Floorplan, vec![det("door", 0.9, far)]),
        ];
        let merged = fuse(&inputs, &FusionConfig::default());
        assert_eq!(merged.len(), 3);
        assert!(merged.iter().all(|r| r.sources.as_ref().map(Vec::len) == Some(1)));
    }

    #[test]
    fn floorplan_weight_lowers_rank() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let inputs = vec![
            (ModelKind::Floorplan, vec![det("kitchen", 0.8, bbox)]),
            (ModelKind::Yolo, vec![det("kitchen", 0.75, BoundingBox::new(1.0, 1.0, 11.0, 11.0))]),
        ];
        let merged = fuse(&inputs, &FusionConfig::default());
        // 0.8 * 0.9 < 0.75, so yolo seeds the group and keeps its box
        assert_eq!(merged[0].bbox, BoundingBox::new(1.0, 1.0, 11.0, 11.0));
        assert_eq!(merged[0].sources.as_ref().unwrap()[0], "yolo");
    }

    #[test]
    fn summary_counts_sources() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let records = vec![
            det("Door", 0.9, bbox).with_sources(["yolo", "detectron2"]),
            det("Door", 0.8, bbox).with_sources(["floorplan"]),
            det("Wall", 0.7, bbox).with_sources(["yolo"]),
        ];
        let summary = FusionSummary::from_records(&records);
        assert_eq!(summary.total_detections, 3);
        assert_eq!(summary.unique_classes, 2);
        assert_eq!(summary.detections_by_class["Door"], 2);
        assert_eq!(summary.detections_by_source_count[&1], 2);
        assert_eq!(summary.detections_by_source_count[&2], 1);
        assert_eq!(summary.detections_by_source_count[&3], 0);
        assert_eq!(summary.model_contributions["yolo"], 2);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("living room"), "Living Room");
        assert_eq!(title_case("wc"), "Wc");
    }
}
