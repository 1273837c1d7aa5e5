//! Entity normalization for one extraction pass.
//!
//! Pipeline: clean names -> group matching entities -> merge each group.
//! Running it twice changes nothing: every canonical name is one of the
//! original names, so any two canonical names that matched would already
//! have been grouped together in the first run.

use std::collections::HashMap;

use magpie_core::{
    Discard, Entity, ExtractionResult, MagpieResult, NormalizerConfig, Outcome, Relationship,
    RelationshipKey,
};

use super::grouper::EntityGrouper;
use super::matcher::SimilarityMatcher;
use super::merger::EntityMerger;
use super::name::NameNormalizer;

/// Maps comparison keys of every name seen in a group to its canonical name.
///
/// A key claimed by two different canonical names (the same name used for a
/// person and a place) is ambiguous and resolves to nothing.
#[derive(Debug, Clone, Default)]
pub struct NameResolution {
    by_key: HashMap<String, Option<String>>,
}

impl NameResolution {
    /// Record that `key` refers to `canonical`.
    pub fn insert(&mut self, key: String, canonical: &str) {
        self.by_key
            .entry(key)
            .and_modify(|existing| {
                if existing.as_deref() != Some(canonical) {
                    *existing = None;
                }
            })
            .or_insert_with(|| Some(canonical.to_string()));
    }

    /// Record every name and alias of a merged entity.
    pub fn insert_entity(&mut self, names: &NameNormalizer, entity: &Entity) {
        for name in std::iter::once(&entity.name).chain(entity.aliases.iter()) {
            if let Some(clean) = names.clean(name) {
                self.insert(clean.key, &entity.name);
            }
        }
    }

    /// Canonical name for a raw name, if it resolves unambiguously.
    pub fn lookup(&self, names: &NameNormalizer, raw: &str) -> Option<&str> {
        let clean = names.clean(raw)?;
        self.by_key.get(&clean.key)?.as_deref()
    }

    /// Canonical name for a raw name, or the trimmed raw name.
    pub fn resolve(&self, names: &NameNormalizer, raw: &str) -> String {
        self.lookup(names, raw)
            .map(str::to_string)
            .unwrap_or_else(|| raw.trim().to_string())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Normalizes the entities of one extraction pass.
#[derive(Debug, Clone)]
pub struct EntityNormalizer {
    grouper: EntityGrouper,
    merger: EntityMerger,
    max_evidence: usize,
}

impl EntityNormalizer {
    /// Create a normalizer. Fails fast on an invalid configuration.
    pub fn new(config: NormalizerConfig) -> MagpieResult<Self> {
        let merger = EntityMerger::new(&config);
        let max_evidence = config.max_evidence_per_entity;
        let matcher = SimilarityMatcher::new(config)?;
        Ok(Self {
            grouper: EntityGrouper::new(matcher),
            merger,
            max_evidence,
        })
    }

    /// Create a normalizer with the default configuration.
    pub fn with_defaults() -> Self {
        let config = NormalizerConfig::default();
        Self {
            grouper: EntityGrouper::new(SimilarityMatcher::default()),
            merger: EntityMerger::new(&config),
            max_evidence: config.max_evidence_per_entity,
        }
    }

    pub fn names(&self) -> &NameNormalizer {
        self.grouper.matcher().names()
    }

    pub fn grouper(&self) -> &EntityGrouper {
        &self.grouper
    }

    pub fn merger(&self) -> &EntityMerger {
        &self.merger
    }

    /// Clean, group and merge entities.
    pub fn normalize(&self, entities: Vec<Entity>) -> Outcome<Vec<Entity>> {
        let input = entities.len();
        let (cleaned, discarded) = self.names().clean_entities(entities).into_parts();

        let merged: Vec<Entity> = self
            .grouper
            .group(cleaned)
            .into_iter()
            .filter_map(|group| self.merger.merge(group))
            .collect();

        tracing::debug!(
            input,
            output = merged.len(),
            discarded = discarded.len(),
            "Normalized entities"
        );
        Outcome::new(merged, discarded)
    }

    /// Normalize the entities of a result and point relationships at the
    /// canonical names.
    ///
    /// Relationships missing a field are dropped. Relationships that become
    /// identical after rewriting are collapsed, keeping the highest confidence
    /// and the evidence of both.
    pub fn normalize_result(&self, result: ExtractionResult) -> Outcome<ExtractionResult> {
        let ExtractionResult {
            entities,
            relationships,
            topics,
            key_moments,
            sentiment,
        } = result;

        let (entities, mut discarded) = self.normalize(entities).into_parts();

        let mut resolution = NameResolution::default();
        for entity in &entities {
            resolution.insert_entity(self.names(), entity);
        }

        let mut rewritten: Vec<Relationship> = Vec::with_capacity(relationships.len());
        let mut index: HashMap<RelationshipKey, usize> = HashMap::new();
        for mut rel in relationships {
            if let Err(e) = rel.validate() {
                tracing::debug!("Dropping relationship: {}", e);
                discarded.push(Discard::relationship(rel.key().to_string(), e.to_string()));
                continue;
            }
            rel.subject = resolution.resolve(self.names(), &rel.subject);
            rel.predicate = rel.predicate.trim().to_string();
            rel.object = resolution.resolve(self.names(), &rel.object);

            match index.get(&rel.key()) {
                Some(&slot) => {
                    let existing = &mut rewritten[slot];
                    existing.confidence = existing.confidence.max(rel.confidence);
                    existing.evidence.extend(rel.evidence);
                    existing.evidence.truncate(self.max_evidence);
                }
                None => {
                    index.insert(rel.key(), rewritten.len());
                    rewritten.push(rel);
                }
            }
        }

        Outcome::new(
            ExtractionResult {
                entities,
                relationships: rewritten,
                topics,
                key_moments,
                sentiment,
            },
            discarded,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::{DiscardKind, EntityType, Evidence, Topic};

    fn person(name: &str, confidence: f32) -> Entity {
        Entity::new(name, EntityType::Person, confidence)
    }

    #[test]
    fn test_rejects_bad_threshold_before_processing() {
        assert!(EntityNormalizer::new(NormalizerConfig::with_threshold(0.0)).is_err());
        assert!(EntityNormalizer::new(NormalizerConfig::with_threshold(1.5)).is_err());
    }

    #[test]
    fn test_normalize_merges_and_discards() {
        let normalizer = EntityNormalizer::with_defaults();
        let outcome = normalizer.normalize(vec![
            person("Donald Trump", 0.9),
            person("x", 0.9),
            person("Trump", 0.8),
            Entity::new("Washington", EntityType::Location, 0.7),
            person("Washington", 0.6),
        ]);

        let names: Vec<&str> = outcome.value.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Donald Trump", "Washington", "Washington"]);
        assert_eq!(outcome.value[0].confidence, 0.9);
        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(outcome.discarded[0].kind, DiscardKind::InvalidEntity);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = EntityNormalizer::with_defaults();
        let once = normalizer
            .normalize(vec![
                person("Dr. Anthony Fauci", 0.8),
                person("Fauci", 0.9),
                person("Anthony Fauci", 0.7),
                Entity::new("NIH", EntityType::Organization, 0.9),
                Entity::new("National Institutes of Health", EntityType::Organization, 0.6),
            ])
            .value;
        let twice = normalizer.normalize(once.clone()).value;
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_normalize_result_rewrites_relationships() {
        let normalizer = EntityNormalizer::with_defaults();
        let result = ExtractionResult {
            entities: vec![
                person("Jerome Powell", 0.9),
                person("Powell", 0.8),
                Entity::new("Federal Reserve", EntityType::Organization, 0.9),
            ],
            relationships: vec![
                Relationship::new("Powell", "chairs", "Federal Reserve", 0.6)
                    .with_evidence(Evidence::new("Powell, who chairs the Fed")),
                Relationship::new("Jerome Powell", " chairs ", "Federal Reserve", 0.9),
                Relationship::new("Powell", "", "Federal Reserve", 0.9),
                Relationship::new("Janet Yellen", "criticized", "Powell", 0.5),
            ],
            topics: vec![Topic::new("monetary policy", 0.8)],
            ..Default::default()
        };

        let outcome = normalizer.normalize_result(result);
        let result = outcome.value;
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.topics.len(), 1);

        assert_eq!(result.relationships.len(), 2);
        let chairs = &result.relationships[0];
        assert_eq!(chairs.subject, "Jerome Powell");
        assert_eq!(chairs.predicate, "chairs");
        assert_eq!(chairs.confidence, 0.9);
        assert_eq!(chairs.evidence.len(), 1);
        assert_eq!(result.relationships[1].subject, "Janet Yellen");
        assert_eq!(result.relationships[1].object, "Jerome Powell");

        assert_eq!(outcome.discarded.len(), 1);
        assert_eq!(outcome.discarded[0].kind, DiscardKind::InvalidRelationship);
    }

    #[test]
    fn test_ambiguous_names_are_left_alone() {
        let normalizer = EntityNormalizer::with_defaults();
        let result = ExtractionResult {
            entities: vec![
                Entity::new("Jordan", EntityType::Location, 0.9),
                person("Michael Jordan", 0.9),
                person("Jordan", 0.8),
            ],
            relationships: vec![
                Relationship::new("jordan", "borders", "Israel", 0.7),
                Relationship::new("michael jordan", "played for", "Chicago Bulls", 0.8),
            ],
            ..Default::default()
        };
        let result = normalizer.normalize_result(result).value;
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relationships[0].subject, "jordan");
        assert_eq!(result.relationships[1].subject, "Michael Jordan");
    }

    #[test]
    fn test_name_resolution_lookup() {
        let names = NameNormalizer::default();
        let mut resolution = NameResolution::default();
        resolution.insert_entity(&names, &person("Donald Trump", 0.9).with_alias("Trump"));
        assert_eq!(resolution.lookup(&names, "  TRUMP "), Some("Donald Trump"));
        assert_eq!(resolution.resolve(&names, " Pence "), "Pence");
        assert_eq!(resolution.len(), 2);
    }
}
