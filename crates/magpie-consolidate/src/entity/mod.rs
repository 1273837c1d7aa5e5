//! Entity normalization: name cleaning, pairwise matching, grouping and merging.

mod grouper;
mod matcher;
mod merger;
mod name;
mod normalizer;

pub use grouper::EntityGrouper;
pub use matcher::{similarity, MatchOutcome, MatchReason, SimilarityMatcher};
pub use merger::EntityMerger;
pub use name::{is_acronym, CleanName, NameNormalizer};
pub use normalizer::{EntityNormalizer, NameResolution};
