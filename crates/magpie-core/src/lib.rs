//! magpie-core - Core types for magpie.
//!
//! This crate provides the record types (entities, relationships, topics,
//! per-video and per-series results), the error taxonomy, discard notices,
//! configuration, and lenient decoding of raw extractor payloads.
//!
//! # Example
//!
//! ```ignore
//! use magpie_core::raw::RawExtractionResult;
//!
//! let raw = RawExtractionResult::from_json(payload)?;
//! let outcome = raw.into_typed(Some("extractor-v2"));
//! for notice in &outcome.discarded {
//!     tracing::warn!("{}", notice);
//! }
//! ```

pub mod config;
pub mod error;
pub mod raw;
pub mod types;

// Re-export commonly used types
pub use config::{ConsolidationConfig, NormalizerConfig, SeriesConfig, TypePair};
pub use error::{ErrorCode, MagpieError, MagpieResult};
pub use types::{
    ConsolidatedVideoResult, Discard, DiscardKind, Entity, EntityStats, EntityType, Evidence,
    ExtractionResult, KeyMoment, Outcome, RankedEntity, RecurringRelationship, Relationship,
    RelationshipKey, Sentiment, SeriesAnalysisResult, TimeRange, Topic, TopicPoint, TopicTrend,
    TrendDirection, VideoEvidence,
};
