//! Collection-level analysis results.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::entity::{EntityType, Evidence};
use super::relationship::RelationshipKey;

/// Evidence tagged with the video it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEvidence {
    /// Position of the video in the analyzed sequence.
    pub video_index: usize,
    #[serde(flatten)]
    pub evidence: Evidence,
}

/// Frequency statistics for one entity across a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStats {
    /// Total mentions across all videos.
    pub count: u32,
    /// Indices of the videos the entity appeared in.
    pub videos: BTreeSet<usize>,
    pub entity_type: EntityType,
    /// Mean confidence over every record of the entity.
    pub average_confidence: f32,
    pub evidence: Vec<VideoEvidence>,
}

impl EntityStats {
    /// Number of distinct videos the entity appeared in.
    pub fn video_count(&self) -> usize {
        self.videos.len()
    }
}

/// One row of the entity ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntity {
    pub name: String,
    pub entity_type: EntityType,
    pub mentions: u32,
    pub video_count: usize,
    pub average_confidence: f32,
}

/// A relationship triple seen in more than one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringRelationship {
    pub key: RelationshipKey,
    /// Total records of the triple across all videos.
    pub count: u32,
    pub videos: BTreeSet<usize>,
    pub average_confidence: f32,
    pub evidence: Vec<VideoEvidence>,
}

/// Direction of a topic's relevance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increased,
    Decreased,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Increased => "increased",
            Self::Decreased => "decreased",
            Self::Stable => "stable",
        };
        write!(f, "{}", s)
    }
}

/// Relevance of a topic in one video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopicPoint {
    pub video_index: usize,
    pub relevance: f32,
}

/// How a topic's relevance moved across the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicTrend {
    /// Relevance per video, ordered by video index.
    pub points: Vec<TopicPoint>,
    /// `(last - first) / first`, absent when the first relevance is zero.
    pub change: Option<f32>,
    pub direction: TrendDirection,
    /// Whether `|change|` exceeded the configured threshold.
    pub significant: bool,
    /// Human-readable note, present only for significant trends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TopicTrend {
    pub fn first_relevance(&self) -> Option<f32> {
        self.points.first().map(|p| p.relevance)
    }

    pub fn last_relevance(&self) -> Option<f32> {
        self.points.last().map(|p| p.relevance)
    }
}

/// Result of analyzing a collection of videos.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesAnalysisResult {
    pub video_count: usize,
    pub total_duration_seconds: f64,
    pub total_cost: f64,
    pub unique_entity_count: usize,
    /// Entities ranked by mentions, then video count, then name.
    pub top_entities: Vec<RankedEntity>,
    pub entity_frequency: BTreeMap<String, EntityStats>,
    /// Triples seen in more than one video, ranked like `top_entities`.
    pub recurring_relationships: Vec<RecurringRelationship>,
    pub topic_trends: BTreeMap<String, TopicTrend>,
    pub insights: Vec<String>,
}

impl SeriesAnalysisResult {
    /// Whether no videos were analyzed.
    pub fn is_empty(&self) -> bool {
        self.video_count == 0
    }

    /// Look up a recurring relationship by its exact triple.
    pub fn recurring(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
    ) -> Option<&RecurringRelationship> {
        let key = RelationshipKey::new(subject, predicate, object);
        self.recurring_relationships.iter().find(|r| r.key == key)
    }
}
