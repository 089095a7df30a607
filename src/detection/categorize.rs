use serde::Serialize;

use crate::detection::aggregate::AggregatedEntity;

/// Fixed display groups, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CategoryKind {
    Rooms,
    ElementsAndFixtures,
    LabelsAndText,
    Other,
}

impl CategoryKind {
    pub const ALL: [CategoryKind; 4] = [
        CategoryKind::Rooms,
        CategoryKind::ElementsAndFixtures,
        CategoryKind::LabelsAndText,
        CategoryKind::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoryKind::Rooms => "Rooms",
            CategoryKind::ElementsAndFixtures => "Elements & Fixtures",
            CategoryKind::LabelsAndText => "Labels & Text",
            CategoryKind::Other => "Other",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            CategoryKind::Rooms => "🏠",
            CategoryKind::ElementsAndFixtures => "🚪",
            CategoryKind::LabelsAndText => "🏷️",
            CategoryKind::Other => "📦",
        }
    }

    pub fn color_tag(&self) -> &'static str {
        match self {
            CategoryKind::Rooms => "blue",
            CategoryKind::ElementsAndFixtures => "green",
            CategoryKind::LabelsAndText => "purple",
            CategoryKind::Other => "gray",
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            CategoryKind::Rooms => &[
                "bedroom",
                "bathroom",
                "kitchen",
                "living room",
                "dining room",
                "toilet",
                "wc",
                "hallway",
                "corridor",
                "balcony",
                "room",
                "office",
                "garage",
                "laundry",
                "lobby",
                "foyer",
                "study",
                "utility",
                "storage",
                "terrace",
                "veranda",
            ],
            CategoryKind::ElementsAndFixtures => &[
                "door",
                "window",
                "sink",
                "bathtub",
                "stairs",
                "column",
                "furniture",
                "cabinet",
                "counter",
                "wall",
                "bed",
                "sofa",
                "table",
                "chair",
                "refrigerator",
                "wardrobe",
                "shower",
                "stove",
                "oven",
                "desk",
                "fireplace",
                "washer",
            ],
            CategoryKind::LabelsAndText => {
                &["label", "text", "dimension", "note", "symbol", "scale"]
            }
            CategoryKind::Other => &[],
        }
    }

    /// First group whose keyword occurs in `canonical`
    pub fn of(canonical: &str) -> CategoryKind {
        CategoryKind::ALL
            .into_iter()
            .find(|kind| kind.keywords().iter().any(|kw| canonical.contains(kw)))
            .unwrap_or(CategoryKind::Other)
    }
}

/// A non-empty display group of entities
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub kind: CategoryKind,
    pub name: &'static str,
    pub icon: &'static str,
    pub color_tag: &'static str,
    pub entities: Vec<AggregatedEntity>,
}

/// Partition entities into the fixed groups; empty groups are left out
pub fn classify(entities: &[AggregatedEntity]) -> Vec<Category> {
    let mut buckets: [Vec<AggregatedEntity>; 4] = Default::default();
    for entity in entities {
        let slot = CategoryKind::ALL
            .iter()
            .position(|kind| *kind == CategoryKind::of(&entity.canonical_name))
            .unwrap_or(CategoryKind::ALL.len() - 1);
        buckets[slot].push(entity.clone());
    }

    CategoryKind::ALL
        .into_iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(kind, mut bucket)| {
            bucket.sort_by(|a, b| b.total_count.cmp(&a.total_count));
            Category {
                kind,
                name: kind.name(),
                icon: kind.icon(),
                color_tag: kind.color_tag(),
                entities: bucket,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_group_wins() {
        // "bed" is a fixture keyword but "bedroom" matches Rooms first
        assert_eq!(CategoryKind::of("bedroom"), CategoryKind::Rooms);
        assert_eq!(CategoryKind::of("bed"), CategoryKind::ElementsAndFixtures);
        assert_eq!(CategoryKind::of("dimension"), CategoryKind::LabelsAndText);
        assert_eq!(CategoryKind::of("unknown"), CategoryKind::Other);
        assert_eq!(CategoryKind::of("dining table"), CategoryKind::ElementsAndFixtures);
    }

    #[test]
    fn empty_input_has_no_categories() {
        assert!(classify(&[]).is_empty());
    }
}
