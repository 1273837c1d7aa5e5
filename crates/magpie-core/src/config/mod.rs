//! Configuration system for magpie.
//!
//! Every threshold the consolidation pipeline uses lives here with a
//! documented default. Configs load from TOML, JSON, or YAML files and can be
//! overridden from `MAGPIE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MagpieError, MagpieResult};
use crate::types::EntityType;

/// Two entity types allowed to match each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypePair(pub EntityType, pub EntityType);

impl TypePair {
    /// Whether this pair covers `a` and `b`, in either order.
    pub fn covers(&self, a: EntityType, b: EntityType) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }
}

/// Configuration for per-pass entity normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Minimum fuzzy similarity for two names to match, in (0, 1].
    /// Default: 0.85
    pub similarity_threshold: f32,
    /// Names shorter than this are dropped unless fully uppercase.
    /// Default: 2
    pub min_name_length: usize,
    /// Cap on evidence spans kept per merged entity.
    /// Default: 20
    pub max_evidence_per_entity: usize,
    /// Cross-type pairs allowed to match. Identical types always may.
    /// Default: none
    pub compatible_types: Vec<TypePair>,
    /// Honorifics stripped in addition to the built-in list (lowercase, no dots).
    pub extra_titles: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            min_name_length: 2,
            max_evidence_per_entity: 20,
            compatible_types: Vec::new(),
            extra_titles: Vec::new(),
        }
    }
}

impl NormalizerConfig {
    /// Create a config with a custom threshold.
    pub fn with_threshold(similarity_threshold: f32) -> Self {
        Self {
            similarity_threshold,
            ..Default::default()
        }
    }

    /// Allow two different types to match.
    pub fn allow_types(mut self, a: EntityType, b: EntityType) -> Self {
        self.compatible_types.push(TypePair(a, b));
        self
    }

    /// Whether entities of these types may be compared at all.
    pub fn types_compatible(&self, a: EntityType, b: EntityType) -> bool {
        a == b || self.compatible_types.iter().any(|p| p.covers(a, b))
    }

    /// Validate configuration values are in valid ranges.
    pub fn validate(&self) -> MagpieResult<()> {
        let t = self.similarity_threshold;
        if !t.is_finite() || t <= 0.0 || t > 1.0 {
            return Err(MagpieError::invalid_threshold(t));
        }
        if self.min_name_length == 0 {
            return Err(MagpieError::configuration("min_name_length must be at least 1"));
        }
        Ok(())
    }
}

/// Configuration for collection-level aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    /// Relative relevance change that makes a topic trend significant.
    /// Default: 0.5 (50%)
    pub trend_threshold: f32,
    /// Maximum number of insights emitted.
    /// Default: 5
    pub max_insights: usize,
    /// Below this many insights a generic coverage statement is appended.
    /// Default: 3
    pub min_insights_before_coverage: usize,
    /// Length of the `top_entities` ranking.
    /// Default: 20
    pub top_entities_limit: usize,
    /// Cap on evidence spans kept per entity and per relationship.
    /// Default: 20
    pub max_evidence_per_entity: usize,
    /// Resolve entity names across videos before counting.
    /// Default: true
    pub resolve_across_videos: bool,
}

impl Default for SeriesConfig {
    fn default() -> Self {
        Self {
            trend_threshold: 0.5,
            max_insights: 5,
            min_insights_before_coverage: 3,
            top_entities_limit: 20,
            max_evidence_per_entity: 20,
            resolve_across_videos: true,
        }
    }
}

impl SeriesConfig {
    /// Validate configuration values are in valid ranges.
    pub fn validate(&self) -> MagpieResult<()> {
        if !self.trend_threshold.is_finite() || self.trend_threshold <= 0.0 {
            return Err(MagpieError::configuration(format!(
                "trend_threshold must be positive, got {}",
                self.trend_threshold
            )));
        }
        if self.max_insights == 0 {
            return Err(MagpieError::configuration("max_insights must be at least 1"));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    pub normalizer: NormalizerConfig,
    pub series: SeriesConfig,
}

impl ConsolidationConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> MagpieResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| MagpieError::configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| MagpieError::configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| MagpieError::configuration(e.to_string()))?,
            other => return Err(MagpieError::unsupported_format(other)),
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded consolidation config");
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply `MAGPIE_*` overrides from a variable lookup.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            let raw = lookup(key)?;
            match raw.trim().parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                    None
                }
            }
        }

        if let Some(v) = parse(&lookup, "MAGPIE_SIMILARITY_THRESHOLD") {
            self.normalizer.similarity_threshold = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_MIN_NAME_LENGTH") {
            self.normalizer.min_name_length = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_MAX_EVIDENCE") {
            self.normalizer.max_evidence_per_entity = v;
            self.series.max_evidence_per_entity = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_TREND_THRESHOLD") {
            self.series.trend_threshold = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_MAX_INSIGHTS") {
            self.series.max_insights = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_TOP_ENTITIES") {
            self.series.top_entities_limit = v;
        }
        if let Some(v) = parse(&lookup, "MAGPIE_RESOLVE_ACROSS_VIDEOS") {
            self.series.resolve_across_videos = v;
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> MagpieResult<()> {
        self.normalizer.validate()?;
        self.series.validate()
    }
}
