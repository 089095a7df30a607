pub mod aggregate;
pub mod categorize;
pub mod fusion;
pub mod normalize;
pub mod palette;

pub use aggregate::{combine, AggregatedEntity, IngestedRecord, ModelTally};
pub use categorize::{classify, Category, CategoryKind};
pub use fusion::{fuse, fuse_all, fuse_results, FusionSummary};
pub use normalize::{normalize, UNKNOWN_CLASS};
pub use palette::{color_for, UNMAPPED_CLASS_COLOR};
