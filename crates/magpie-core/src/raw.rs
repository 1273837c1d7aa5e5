//! Lenient decoding of extractor payloads.
//!
//! Extractors emit loosely-shaped JSON: fields go missing, names vary
//! (`type` vs `entity_type`, `source` vs `subject`), evidence is sometimes a
//! string and sometimes an object. The raw structures here accept all of
//! that, and [`RawExtractionResult::into_typed`] converts them into typed
//! records, reporting every record it had to drop.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{ErrorCode, MagpieError, MagpieResult};
use crate::types::{
    Discard, Entity, EntityType, Evidence, ExtractionResult, KeyMoment, Outcome, Relationship,
    Sentiment, TimeRange, Topic,
};

/// Confidence assumed when an extractor omits it.
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Relevance assumed when an extractor omits it.
pub const DEFAULT_RELEVANCE: f32 = 0.5;

/// Evidence given either as bare text or as a span object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawEvidence {
    Text(String),
    Span {
        #[serde(alias = "quote", alias = "span")]
        text: String,
        #[serde(default, alias = "time", alias = "start")]
        timestamp: Option<f64>,
    },
}

impl RawEvidence {
    fn into_evidence(self) -> Option<Evidence> {
        let (text, timestamp) = match self {
            Self::Text(text) => (text, None),
            Self::Span { text, timestamp } => (text, timestamp),
        };
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Evidence {
            text: text.to_string(),
            timestamp,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEntity {
    pub name: Option<String>,
    #[serde(alias = "type", alias = "entityType")]
    pub entity_type: Option<String>,
    pub confidence: Option<f32>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub evidence: Vec<RawEvidence>,
    /// Single-span context some extractors emit instead of `evidence`.
    pub context: Option<String>,
    #[serde(alias = "source_attribution")]
    pub source: Option<String>,
    pub mentions: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRelationship {
    #[serde(alias = "source", alias = "from")]
    pub subject: Option<String>,
    #[serde(alias = "relation", alias = "relationship", alias = "type")]
    pub predicate: Option<String>,
    #[serde(alias = "target", alias = "to")]
    pub object: Option<String>,
    pub confidence: Option<f32>,
    #[serde(default)]
    pub evidence: Vec<RawEvidence>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTopic {
    #[serde(alias = "topic")]
    pub name: Option<String>,
    #[serde(alias = "score", alias = "importance")]
    pub relevance: Option<f32>,
    #[serde(alias = "timeRange", alias = "time")]
    pub time_range: Option<TimeRange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawKeyMoment {
    #[serde(alias = "text", alias = "summary")]
    pub description: Option<String>,
    #[serde(alias = "time", alias = "start")]
    pub timestamp: Option<f64>,
    #[serde(alias = "importance")]
    pub significance: Option<f32>,
}

/// One extraction payload as produced upstream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtractionResult {
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    #[serde(default)]
    pub topics: Vec<RawTopic>,
    #[serde(default, alias = "keyMoments")]
    pub key_moments: Vec<RawKeyMoment>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

impl RawExtractionResult {
    /// Parse a payload, tolerating a surrounding markdown code fence.
    pub fn from_json(content: &str) -> MagpieResult<Self> {
        let content = content.trim();
        if content.is_empty() {
            return Ok(Self::default());
        }

        let json_str = extract_json(content);
        match serde_json::from_str(json_str) {
            Ok(raw) => Ok(raw),
            Err(e) => lenient_parse(json_str).ok_or_else(|| {
                tracing::warn!("Failed to parse extraction payload: {}", e);
                MagpieError::parse(e.to_string())
            }),
        }
    }

    /// Convert into typed records, tagging entities with `source` if given.
    pub fn into_typed(self, source: Option<&str>) -> Outcome<ExtractionResult> {
        let mut discarded = Vec::new();

        let entities = self
            .entities
            .into_iter()
            .filter_map(|raw| match convert_entity(raw, source) {
                Ok(entity) => Some(entity),
                Err(discard) => {
                    discarded.push(discard);
                    None
                }
            })
            .collect();

        let relationships = self
            .relationships
            .into_iter()
            .filter_map(|raw| match convert_relationship(raw) {
                Ok(rel) => Some(rel),
                Err(discard) => {
                    discarded.push(discard);
                    None
                }
            })
            .collect();

        let topics = self
            .topics
            .into_iter()
            .filter_map(|raw| match convert_topic(raw) {
                Ok(topic) => Some(topic),
                Err(discard) => {
                    discarded.push(discard);
                    None
                }
            })
            .collect();

        // Moments without a description carry nothing worth keeping.
        let key_moments = self
            .key_moments
            .into_iter()
            .filter_map(|raw| {
                let description = raw.description?.trim().to_string();
                if description.is_empty() {
                    return None;
                }
                Some(KeyMoment::new(
                    description,
                    raw.timestamp.unwrap_or(0.0),
                    raw.significance.unwrap_or(DEFAULT_RELEVANCE),
                ))
            })
            .collect();

        if !discarded.is_empty() {
            tracing::debug!(count = discarded.len(), "Dropped invalid raw records");
        }

        Outcome::new(
            ExtractionResult {
                entities,
                relationships,
                topics,
                key_moments,
                sentiment: self.sentiment,
            },
            discarded,
        )
    }
}

/// Extract JSON from a payload (handles markdown code blocks).
fn extract_json(content: &str) -> &str {
    static JSON_BLOCK: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"```(?:json)?\s*\n?([\s\S]*?)\n?```").unwrap());

    if let Some(caps) = JSON_BLOCK.captures(content) {
        if let Some(m) = caps.get(1) {
            return m.as_str().trim();
        }
    }

    content
}

/// Lenient parsing for trailing commas.
fn lenient_parse(json_str: &str) -> Option<RawExtractionResult> {
    static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([\]}])").unwrap());

    let fixed = TRAILING_COMMA.replace_all(json_str, "$1");
    serde_json::from_str(&fixed).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn collect_evidence(evidence: Vec<RawEvidence>, context: Option<String>) -> Vec<Evidence> {
    let mut spans: Vec<Evidence> = evidence
        .into_iter()
        .filter_map(RawEvidence::into_evidence)
        .collect();
    if let Some(context) = non_empty(context) {
        spans.push(Evidence::new(context));
    }
    spans
}

fn convert_entity(raw: RawEntity, source: Option<&str>) -> Result<Entity, Discard> {
    let name = non_empty(raw.name)
        .ok_or_else(|| Discard::entity("", "missing name", ErrorCode::ValMissingName))?;

    let type_label = non_empty(raw.entity_type)
        .ok_or_else(|| Discard::entity(&name, "missing type", ErrorCode::ValMissingType))?;

    let entity_type = EntityType::from_str_flexible(&type_label).unwrap_or_else(|| {
        tracing::debug!(entity = %name, label = %type_label, "Unknown entity type, using OTHER");
        EntityType::Other
    });

    let confidence = raw.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    if !confidence.is_finite() {
        return Err(Discard::entity(
            &name,
            "confidence is not a number",
            ErrorCode::ValInvalidConfidence,
        ));
    }

    let mut entity = Entity::new(name, entity_type, confidence.clamp(0.0, 1.0));
    entity.aliases = raw
        .aliases
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty() && *a != entity.name)
        .collect();
    entity.evidence = collect_evidence(raw.evidence, raw.context);
    if let Some(source) = non_empty(raw.source).as_deref().or(source) {
        entity.sources.insert(source.to_string());
    }
    entity.mentions = raw.mentions.unwrap_or(1).max(1);

    Ok(entity)
}

fn convert_relationship(raw: RawRelationship) -> Result<Relationship, Discard> {
    let subject = non_empty(raw.subject);
    let predicate = non_empty(raw.predicate);
    let object = non_empty(raw.object);

    let (subject, predicate, object) = match (subject, predicate, object) {
        (Some(s), Some(p), Some(o)) => (s, p, o),
        (s, p, o) => {
            let label = format!(
                "{} {} {}",
                s.as_deref().unwrap_or("?"),
                p.as_deref().unwrap_or("?"),
                o.as_deref().unwrap_or("?")
            );
            return Err(Discard::relationship(
                label,
                "missing subject, predicate, or object",
            ));
        }
    };

    let confidence = raw
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0);

    let mut rel = Relationship::new(subject, predicate, object, confidence);
    rel.evidence = collect_evidence(raw.evidence, raw.context);
    Ok(rel)
}

fn convert_topic(raw: RawTopic) -> Result<Topic, Discard> {
    let name = non_empty(raw.name).ok_or_else(|| Discard::topic("", "missing name"))?;
    let relevance = raw
        .relevance
        .filter(|r| r.is_finite())
        .unwrap_or(DEFAULT_RELEVANCE)
        .clamp(0.0, 1.0);

    Ok(Topic {
        name,
        relevance,
        time_range: raw.time_range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DiscardKind;

    #[test]
    fn test_parse_valid_json() {
        let json = r#"{
            "entities": [
                {"name": "Jerome Powell", "type": "person", "confidence": 0.95},
                {"name": "Federal Reserve", "entity_type": "ORG"}
            ],
            "relationships": [
                {"subject": "Jerome Powell", "predicate": "chairs", "object": "Federal Reserve"}
            ],
            "topics": [{"name": "interest rates", "relevance": 0.8}],
            "key_moments": [{"description": "Rate decision announced", "timestamp": 95.0}]
        }"#;

        let outcome = RawExtractionResult::from_json(json).unwrap().into_typed(None);
        assert!(outcome.is_clean());

        let result = outcome.value;
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.entities[0].entity_type, EntityType::Person);
        assert_eq!(result.entities[1].entity_type, EntityType::Organization);
        assert_eq!(result.entities[1].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.relationships[0].object, "Federal Reserve");
        assert_eq!(result.topics[0].relevance, 0.8);
        assert_eq!(result.key_moments[0].timestamp, 95.0);
    }

    #[test]
    fn test_parse_json_in_code_block() {
        let json = "```json\n{\"entities\": [{\"name\": \"NATO\", \"type\": \"organization\"}]}\n```";
        let raw = RawExtractionResult::from_json(json).unwrap();
        assert_eq!(raw.entities.len(), 1);
    }

    #[test]
    fn test_parse_trailing_commas() {
        let json = r#"{"entities": [{"name": "NATO", "type": "organization",},],}"#;
        let raw = RawExtractionResult::from_json(json).unwrap();
        assert_eq!(raw.entities.len(), 1);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let err = RawExtractionResult::from_json("not json at all").unwrap_err();
        assert_eq!(err.code(), ErrorCode::ParseInvalidJson);

        assert!(RawExtractionResult::from_json("   ").unwrap().entities.is_empty());
    }

    #[test]
    fn test_alternative_relationship_fields() {
        let json = r#"{"relationships": [{"source": "A", "relation": "causes", "target": "B"}]}"#;
        let result = RawExtractionResult::from_json(json).unwrap().into_typed(None).value;
        assert_eq!(result.relationships[0].subject, "A");
        assert_eq!(result.relationships[0].predicate, "causes");
        assert_eq!(result.relationships[0].object, "B");
    }

    #[test]
    fn test_invalid_records_are_discarded() {
        let json = r#"{
            "entities": [
                {"name": "Valid", "type": "person"},
                {"type": "person"},
                {"name": "   ", "type": "person"},
                {"name": "Typeless"}
            ],
            "relationships": [
                {"subject": "A", "predicate": "causes"},
                {"subject": "A", "predicate": "causes", "object": "B"}
            ],
            "topics": [{"relevance": 0.3}]
        }"#;

        let outcome = RawExtractionResult::from_json(json).unwrap().into_typed(None);
        assert_eq!(outcome.value.entities.len(), 1);
        assert_eq!(outcome.value.relationships.len(), 1);
        assert!(outcome.value.topics.is_empty());

        let kinds: Vec<DiscardKind> = outcome.discarded.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                DiscardKind::InvalidEntity,
                DiscardKind::InvalidEntity,
                DiscardKind::InvalidEntity,
                DiscardKind::InvalidRelationship,
                DiscardKind::InvalidTopic,
            ]
        );
        assert_eq!(outcome.discarded[2].code, ErrorCode::ValMissingType);
        assert_eq!(outcome.discarded[3].record, "A causes ?");
    }

    #[test]
    fn test_unknown_type_and_clamped_confidence() {
        let json = r#"{"entities": [{"name": "Thing", "type": "widget", "confidence": 1.7}]}"#;
        let result = RawExtractionResult::from_json(json).unwrap().into_typed(None).value;
        assert_eq!(result.entities[0].entity_type, EntityType::Other);
        assert_eq!(result.entities[0].confidence, 1.0);
    }

    #[test]
    fn test_source_attribution_and_evidence() {
        let json = r#"{"entities": [{
            "name": "Kyiv",
            "type": "city",
            "evidence": ["shelling in Kyiv", {"text": "Kyiv's mayor said", "timestamp": 310.5}],
            "context": "capital of Ukraine"
        }]}"#;
        let result = RawExtractionResult::from_json(json)
            .unwrap()
            .into_typed(Some("gpt-extractor"))
            .value;

        let entity = &result.entities[0];
        assert!(entity.sources.contains("gpt-extractor"));
        assert_eq!(entity.evidence.len(), 3);
        assert_eq!(entity.evidence[1].timestamp, Some(310.5));
        assert_eq!(entity.evidence[2].text, "capital of Ukraine");
    }
}
