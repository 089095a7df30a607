use crate::models::Color;

/// Color for classes with no palette entry.
///
/// Magenta never appears among the overlay strokes (scale line red, preview
/// amber, inner stroke white) and stays visible on white plan backgrounds.
pub const UNMAPPED_CLASS_COLOR: Color = Color::rgb(0xFF, 0x00, 0xFF);

const PALETTE: &[(&str, Color)] = &[
    // rooms
    ("toilet", Color::rgb(0x06, 0xB6, 0xD4)),
    ("bedroom", Color::rgb(0x8B, 0x5C, 0xF6)),
    ("living room", Color::rgb(0x10, 0xB9, 0x81)),
    ("dining room", Color::rgb(0xF9, 0x73, 0x16)),
    ("kitchen", Color::rgb(0xEA, 0xB3, 0x08)),
    ("hallway", Color::rgb(0x64, 0x74, 0x8B)),
    ("balcony", Color::rgb(0x84, 0xCC, 0x16)),
    ("room", Color::rgb(0x3B, 0x82, 0xF6)),
    // structure
    ("stairs", Color::rgb(0xA8, 0x55, 0xF7)),
    ("door", Color::rgb(0xB4, 0x53, 0x09)),
    ("window", Color::rgb(0x0E, 0xA5, 0xE9)),
    ("wall", Color::rgb(0x37, 0x41, 0x51)),
    ("column", Color::rgb(0x78, 0x71, 0x6C)),
    // fixtures and furniture
    ("sink", Color::rgb(0x14, 0xB8, 0xA6)),
    ("bathtub", Color::rgb(0x22, 0xD3, 0xEE)),
    ("bed", Color::rgb(0xEC, 0x48, 0x99)),
    ("sofa", Color::rgb(0xF4, 0x3F, 0x5E)),
    ("table", Color::rgb(0xD9, 0x77, 0x06)),
    ("chair", Color::rgb(0xFB, 0x92, 0x3C)),
    ("cabinet", Color::rgb(0xA1, 0x62, 0x07)),
    ("counter", Color::rgb(0xCA, 0x8A, 0x04)),
    ("refrigerator", Color::rgb(0x25, 0x63, 0xEB)),
    ("wardrobe", Color::rgb(0x7C, 0x3A, 0xED)),
    // annotations
    ("label", Color::rgb(0x63, 0x66, 0xF1)),
    ("text", Color::rgb(0x4F, 0x46, 0xE5)),
    ("dimension", Color::rgb(0x08, 0x91, 0xB2)),
    ("symbol", Color::rgb(0x93, 0x33, 0xEA)),
];

/// Display color for a canonical class name
pub fn color_for(canonical: &str) -> Color {
    PALETTE
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, color)| *color)
        .unwrap_or(UNMAPPED_CLASS_COLOR)
}
