//! Label vocabulary normalization.
//!
//! Independent models name the same thing differently ("Bed Room", "bedroom",
//! "master_bedroom"). [`normalize`] maps every raw label onto one canonical
//! class name that is then used as the aggregation key.

/// Returned for labels that are blank after normalization
pub const UNKNOWN_CLASS: &str = "unknown";

/// Ordered keyword rules. A keyword matches on word boundaries; the first
/// matching rule wins.
const CLASS_RULES: &[(&str, &[&str])] = &[
    (
        "toilet",
        &[
            "toilet",
            "bathroom",
            "bath room",
            "restroom",
            "rest room",
            "washroom",
            "wash room",
            "wc",
            "lavatory",
            "powder room",
        ],
    ),
    (
        "bedroom",
        &["bedroom", "bed room", "master bedroom", "guest room", "guestroom"],
    ),
    (
        "living room",
        &["living room", "livingroom", "lounge", "family room", "sitting room"],
    ),
    ("dining room", &["dining room", "diningroom", "dining area"]),
    ("kitchen", &["kitchen", "kitchenette"]),
    (
        "hallway",
        &["hallway", "hall", "corridor", "passage", "foyer", "entry hall"],
    ),
    ("balcony", &["balcony", "terrace", "veranda"]),
    ("stairs", &["stairs", "stair", "staircase", "stairway"]),
    ("door", &["door", "doorway", "sliding door", "double door"]),
    ("window", &["window", "windows"]),
    ("wall", &["wall", "walls"]),
    ("column", &["column", "pillar"]),
];

/// Exact-match synonyms consulted when no rule matched
const SYNONYMS: &[(&str, &str)] = &[
    ("wc", "toilet"),
    ("fridge", "refrigerator"),
    ("couch", "sofa"),
    ("settee", "sofa"),
    ("tub", "bathtub"),
    ("bath", "bathtub"),
    ("basin", "sink"),
    ("washbasin", "sink"),
    ("wash basin", "sink"),
    ("cupboard", "cabinet"),
    ("closet", "wardrobe"),
    ("worktop", "counter"),
    ("countertop", "counter"),
    ("text label", "label"),
    ("dim", "dimension"),
    ("dimensions", "dimension"),
    ("step", "stairs"),
    ("steps", "stairs"),
];

/// Map a raw model label to its canonical class name.
///
/// Lower-cases and trims the label and collapses whitespace, `_` and `-`
/// runs into single spaces. Then tries [`CLASS_RULES`] in order, then the
/// exact synonym table, and otherwise returns the cleaned label itself.
/// Pure, idempotent and total; never returns an empty string.
pub fn normalize(raw: &str) -> String {
    let cleaned = clean_label(raw);
    if cleaned.is_empty() {
        return UNKNOWN_CLASS.to_string();
    }

    let padded = format!(" {} ", cleaned);
    for (canonical, keywords) in CLASS_RULES {
        if keywords
            .iter()
            .any(|keyword| padded.contains(&format!(" {} ", keyword)))
        {
            return (*canonical).to_string();
        }
    }

    if let Some((_, canonical)) = SYNONYMS.iter().find(|(alias, _)| *alias == cleaned) {
        return (*canonical).to_string();
    }

    cleaned
}

/// Canonical names produced by the rule table, in rule order
pub fn rule_classes() -> impl Iterator<Item = &'static str> {
    CLASS_RULES.iter().map(|(canonical, _)| *canonical)
}

fn clean_label(raw: &str) -> String {
    raw.to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bathroom_spellings_collapse_to_toilet() {
        for raw in ["Bathroom", " bath room ", "WC", "Rest_Room", "lavatory 2", "toilet"] {
            assert_eq!(normalize(raw), "toilet", "raw label {raw:?}");
        }
    }

    #[test]
    fn keywords_match_on_word_boundaries_only() {
        // "hall" must not fire inside "hallmark"; "bath" is a synonym, not a rule
        assert_eq!(normalize("hallmark"), "hallmark");
        assert_eq!(normalize("Bath"), "bathtub");
        assert_eq!(normalize("bathtub"), "bathtub");
        assert_eq!(normalize("Master_Bedroom"), "bedroom");
        assert_eq!(normalize("Bed"), "bed");
    }

    #[test]
    fn synonyms_are_exact_matches() {
        assert_eq!(normalize("Fridge"), "refrigerator");
        assert_eq!(normalize("fridge magnet"), "fridge magnet");
        assert_eq!(normalize("Couch"), "sofa");
    }

    #[test]
    fn unmatched_labels_are_cleaned_but_kept() {
        assert_eq!(normalize("  Dining   Table "), "dining table");
        assert_eq!(normalize("Room"), "room");
    }

    #[test]
    fn blank_labels_map_to_unknown() {
        assert_eq!(normalize(""), UNKNOWN_CLASS);
        assert_eq!(normalize("  _ - "), UNKNOWN_CLASS);
        assert_eq!(normalize(UNKNOWN_CLASS), UNKNOWN_CLASS);
    }

    #[test]
    fn every_rule_class_is_a_fixed_point() {
        for canonical in rule_classes() {
            assert_eq!(normalize(canonical), canonical);
        }
        for (_, canonical) in SYNONYMS {
            assert_eq!(normalize(canonical), *canonical);
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "Bed Room",
            "LIVING-ROOM",
            "kitchenette",
            "Sliding Door",
            "dims",
            "steps",
            "Wash Basin",
            "  ",
            "Conference Room",
            "column_a",
            "éntrée",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert!(!once.is_empty());
            assert_eq!(normalize(&once), once, "raw label {raw:?}");
        }
    }
}
