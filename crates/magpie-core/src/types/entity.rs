//! Entity records and entity type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Entity types that extractors assign to named things.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// A person (e.g., "Donald Trump", "Dr. Jane Goodall").
    Person,
    /// An organization (e.g., "Federal Reserve", "NATO").
    Organization,
    /// A physical or political location (e.g., "Washington", "Ukraine").
    Location,
    /// An abstract concept or topic (e.g., "inflation", "democracy").
    Concept,
    /// A named event (e.g., "World War II", "the 2008 financial crisis").
    Event,
    /// A product or work (e.g., "iPhone", "Das Kapital").
    Product,
    /// A technology or technique (e.g., "CRISPR", "machine learning").
    Technology,
    /// Anything the extractor could not classify.
    Other,
}

impl EntityType {
    /// Parse entity type from string with flexible matching.
    ///
    /// Extractors are inconsistent: "PERSON", "Person", "per", "people",
    /// "company", "place" all show up in practice.
    pub fn from_str_flexible(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");

        match normalized.as_str() {
            "person" | "per" | "people" | "individual" | "human" | "speaker" | "guest"
            | "host" => Some(Self::Person),

            "organization" | "org" | "organisation" | "company" | "corporation"
            | "institution" | "business" | "agency" | "government" | "party" => {
                Some(Self::Organization)
            }

            "location" | "loc" | "place" | "city" | "country" | "region" | "state"
            | "gpe" | "geo" | "venue" => Some(Self::Location),

            "concept" | "idea" | "topic" | "theme" | "theory" | "subject" | "field"
            | "ideology" => Some(Self::Concept),

            "event" | "evt" | "meeting" | "conference" | "war" | "election"
            | "incident" => Some(Self::Event),

            "product" | "work" | "book" | "film" | "brand" | "work_of_art" => {
                Some(Self::Product)
            }

            "technology" | "tech" | "tool" | "software" | "method" | "technique" => {
                Some(Self::Technology)
            }

            "other" | "misc" | "miscellaneous" | "unknown" => Some(Self::Other),

            _ => None,
        }
    }

    /// Get all entity type variants.
    pub fn all() -> &'static [EntityType] {
        &[
            Self::Person,
            Self::Organization,
            Self::Location,
            Self::Concept,
            Self::Event,
            Self::Product,
            Self::Technology,
            Self::Other,
        ]
    }

    /// Convert to string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Concept => "CONCEPT",
            Self::Event => "EVENT",
            Self::Product => "PRODUCT",
            Self::Technology => "TECHNOLOGY",
            Self::Other => "OTHER",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_flexible(s).ok_or_else(|| format!("Unknown entity type: {}", s))
    }
}

/// A short span of supporting text, optionally anchored in the media timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// The quoted or paraphrased text.
    pub text: String,
    /// Offset into the media, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl Evidence {
    /// Create evidence without a timestamp.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: None,
        }
    }

    /// Anchor the evidence at a media offset.
    pub fn at(mut self, seconds: f64) -> Self {
        self.timestamp = Some(seconds);
        self
    }
}

fn default_mentions() -> u32 {
    1
}

/// A named thing mentioned in the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Display name.
    pub name: String,
    /// Entity type.
    #[serde(rename = "type", alias = "entity_type")]
    pub entity_type: EntityType,
    /// Extractor confidence in [0, 1].
    pub confidence: f32,
    /// Other display names this entity was seen under.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub aliases: BTreeSet<String>,
    /// Supporting text spans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
    /// Upstream extractors that produced this entity.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub sources: BTreeSet<String>,
    /// How many times the entity was mentioned.
    #[serde(default = "default_mentions")]
    pub mentions: u32,
}

impl Entity {
    /// Create a new entity with a single mention.
    pub fn new(name: impl Into<String>, entity_type: EntityType, confidence: f32) -> Self {
        Self {
            name: name.into(),
            entity_type,
            confidence,
            aliases: BTreeSet::new(),
            evidence: Vec::new(),
            sources: BTreeSet::new(),
            mentions: 1,
        }
    }

    /// Add an alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    /// Add a piece of evidence.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// Record the extractor that produced this entity.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.sources.insert(source.into());
        self
    }

    /// Set the mention count.
    pub fn with_mentions(mut self, mentions: u32) -> Self {
        self.mentions = mentions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_from_str_flexible() {
        assert_eq!(EntityType::from_str_flexible("PERSON"), Some(EntityType::Person));
        assert_eq!(EntityType::from_str_flexible("person"), Some(EntityType::Person));
        assert_eq!(EntityType::from_str_flexible("company"), Some(EntityType::Organization));
        assert_eq!(EntityType::from_str_flexible("GPE"), Some(EntityType::Location));
        assert_eq!(EntityType::from_str_flexible("work of art"), Some(EntityType::Product));
        assert_eq!(EntityType::from_str_flexible("  tech  "), Some(EntityType::Technology));

        assert_eq!(EntityType::from_str_flexible("gibberish"), None);
        assert_eq!(EntityType::from_str_flexible(""), None);
    }

    #[test]
    fn test_entity_type_display_and_parse() {
        assert_eq!(EntityType::Organization.to_string(), "ORGANIZATION");
        assert_eq!("location".parse::<EntityType>(), Ok(EntityType::Location));
        assert!("nonsense".parse::<EntityType>().is_err());
        assert_eq!(EntityType::all().len(), 8);
    }

    #[test]
    fn test_entity_serde() {
        let entity = Entity::new("NATO", EntityType::Organization, 0.9)
            .with_alias("North Atlantic Treaty Organization")
            .with_evidence(Evidence::new("NATO expanded eastward").at(61.5));

        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(json["type"], "ORGANIZATION");
        assert_eq!(json["mentions"], 1);
        assert!(json.get("sources").is_none());

        let parsed: Entity = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entity);
    }

    #[test]
    fn test_entity_mentions_default_on_deserialize() {
        let parsed: Entity =
            serde_json::from_str(r#"{"name": "Kyiv", "type": "LOCATION", "confidence": 0.7}"#)
                .unwrap();
        assert_eq!(parsed.mentions, 1);
        assert!(parsed.aliases.is_empty());
    }
}
