//! Record types consumed and produced by consolidation.

mod discard;
mod entity;
mod extraction;
mod relationship;
mod series;

pub use discard::{Discard, DiscardKind, Outcome};
pub use entity::{Entity, EntityType, Evidence};
pub use extraction::{
    ConsolidatedVideoResult, ExtractionResult, KeyMoment, Sentiment, TimeRange, Topic,
};
pub use relationship::{Relationship, RelationshipKey};
pub use series::{
    EntityStats, RankedEntity, RecurringRelationship, SeriesAnalysisResult, TopicPoint,
    TopicTrend, TrendDirection, VideoEvidence,
};
