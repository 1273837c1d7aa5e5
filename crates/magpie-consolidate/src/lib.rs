//! magpie-consolidate - Entity resolution and consolidation for magpie.
//!
//! Three nested scopes are covered:
//!
//! - one extraction pass: [`EntityNormalizer`] cleans, groups and merges
//!   entities and points relationships at canonical names
//! - overlapping windows of one transcript: [`ChunkMerger`] folds per-chunk
//!   results with exact-key matching
//! - a collection of videos: [`SeriesAggregator`] builds frequency tables,
//!   recurring relationships, topic trends and insights
//!
//! # Example
//!
//! ```ignore
//! use magpie_consolidate::{ChunkMerger, EntityNormalizer, SeriesAggregator};
//! use magpie_core::{ConsolidatedVideoResult, ConsolidationConfig};
//!
//! let config = ConsolidationConfig::from_file("magpie.toml")?;
//! let normalizer = EntityNormalizer::new(config.normalizer.clone())?;
//!
//! let merged = ChunkMerger::new(&config.normalizer).merge_chunks(chunks);
//! let video = normalizer.normalize_result(merged.value);
//! let videos = vec![ConsolidatedVideoResult::from_extraction("ep-1", video.value)];
//!
//! let series = SeriesAggregator::new(&config)?.aggregate(&videos);
//! for insight in &series.value.insights {
//!     println!("{}", insight);
//! }
//! ```

pub mod chunk;
pub mod entity;
pub mod series;

// Re-export commonly used types
pub use chunk::{ChunkAccumulator, ChunkMerger};
pub use entity::{
    EntityGrouper, EntityMerger, EntityNormalizer, MatchOutcome, MatchReason, NameNormalizer,
    NameResolution, SimilarityMatcher,
};
pub use series::{InsightGenerator, SeriesAggregator};
