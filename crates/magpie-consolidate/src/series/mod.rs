//! Series-level aggregation: entity frequency, recurring relationships,
//! topic trends and insights over an ordered collection of videos.

mod aggregator;
mod insights;
mod trends;

pub use aggregator::SeriesAggregator;
pub use insights::InsightGenerator;
pub use trends::topic_trends;
