//! Extraction results for a single pass, a single video, and their parts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entity::Entity;
use super::relationship::Relationship;

/// Where in the media a topic was discussed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeRange {
    /// Free-form label as produced by the extractor (e.g., "00:05-00:12").
    Label(String),
    /// Start and end offsets in seconds.
    Interval { start: f64, end: f64 },
}

/// A discussed topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    /// Topic name.
    pub name: String,
    /// How central the topic was, in [0, 1].
    pub relevance: f32,
    /// When the topic was discussed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
}

impl Topic {
    /// Create a new topic without a time range.
    pub fn new(name: impl Into<String>, relevance: f32) -> Self {
        Self {
            name: name.into(),
            relevance,
            time_range: None,
        }
    }

    /// Set the time range.
    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }
}

/// A notable, time-anchored moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    /// What happened.
    pub description: String,
    /// Offset into the media, in seconds.
    pub timestamp: f64,
    /// How significant the moment is, in [0, 1].
    pub significance: f32,
}

impl KeyMoment {
    pub fn new(description: impl Into<String>, timestamp: f64, significance: f32) -> Self {
        Self {
            description: description.into(),
            timestamp,
            significance,
        }
    }
}

/// Sentiment scores, each in [-1, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// Sentiment of the whole text.
    pub overall: f32,
    /// Sentiment per topic name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub per_topic: BTreeMap<String, f32>,
}

impl Sentiment {
    pub fn new(overall: f32) -> Self {
        Self {
            overall,
            per_topic: BTreeMap::new(),
        }
    }

    /// Add a per-topic score.
    pub fn with_topic(mut self, topic: impl Into<String>, score: f32) -> Self {
        self.per_topic.insert(topic.into(), score);
        self
    }
}

/// Output of one extraction pass (one transcript, or one chunk of it).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl ExtractionResult {
    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.relationships.is_empty()
            && self.topics.is_empty()
            && self.key_moments.is_empty()
            && self.sentiment.is_none()
    }

    /// Get entity count.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Get relationship count.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}

/// Everything extracted from one video, after chunk merging and normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedVideoResult {
    /// Caller-assigned video identifier.
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Media length in seconds.
    #[serde(default)]
    pub duration_seconds: f64,
    /// What processing this video cost upstream, in the caller's currency.
    #[serde(default)]
    pub processing_cost: f64,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(default)]
    pub key_moments: Vec<KeyMoment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
}

impl ConsolidatedVideoResult {
    /// Wrap an extraction result for a video.
    pub fn from_extraction(video_id: impl Into<String>, result: ExtractionResult) -> Self {
        Self {
            video_id: video_id.into(),
            title: None,
            duration_seconds: 0.0,
            processing_cost: 0.0,
            entities: result.entities,
            relationships: result.relationships,
            topics: result.topics,
            key_moments: result.key_moments,
            sentiment: result.sentiment,
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the media duration.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    /// Set the processing cost.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.processing_cost = cost;
        self
    }
}
