//! Collapsing an equivalence group into one entity.
//!
//! The canonical name is the most descriptive display name in the group:
//! most words, then most characters, then highest total confidence across
//! the records carrying it, then first seen. Confidence is the maximum of
//! the group; every other name becomes an alias.

use magpie_core::{Entity, NormalizerConfig};

/// Merges equivalence groups into single entities.
#[derive(Debug, Clone)]
pub struct EntityMerger {
    max_evidence: usize,
}

impl Default for EntityMerger {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

/// Ranking of one distinct display name within a group.
struct NameScore<'a> {
    name: &'a str,
    words: usize,
    chars: usize,
    total_confidence: f32,
    /// Position of the first record carrying this name.
    first: usize,
}

impl NameScore<'_> {
    fn beats(&self, other: &NameScore<'_>) -> bool {
        (self.words, self.chars)
            .cmp(&(other.words, other.chars))
            .then(self.total_confidence.total_cmp(&other.total_confidence))
            .is_gt()
    }
}

impl EntityMerger {
    /// Create a merger from the normalizer config.
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            max_evidence: config.max_evidence_per_entity,
        }
    }

    /// Position of the record whose name should represent the group.
    ///
    /// Among records sharing the winning name, the most confident one
    /// (first on ties) is returned, so callers can take its type too.
    pub fn canonical_index<'a>(&self, group: impl IntoIterator<Item = &'a Entity>) -> Option<usize> {
        let members: Vec<&Entity> = group.into_iter().collect();
        let mut scores: Vec<NameScore<'_>> = Vec::new();

        for (i, entity) in members.iter().enumerate() {
            match scores.iter_mut().find(|s| s.name == entity.name) {
                Some(score) => score.total_confidence += entity.confidence,
                None => scores.push(NameScore {
                    name: &entity.name,
                    words: entity.name.split_whitespace().count(),
                    chars: entity.name.chars().count(),
                    total_confidence: entity.confidence,
                    first: i,
                }),
            }
        }

        let mut best: Option<&NameScore<'_>> = None;
        for score in &scores {
            if best.map_or(true, |b| score.beats(b)) {
                best = Some(score);
            }
        }
        let best = best?;

        let mut chosen = best.first;
        for (i, entity) in members.iter().enumerate().skip(best.first + 1) {
            if entity.name == best.name && entity.confidence > members[chosen].confidence {
                chosen = i;
            }
        }
        Some(chosen)
    }

    /// Merge one equivalence group. Returns `None` for an empty group; a
    /// single-entity group is returned unchanged.
    pub fn merge(&self, mut group: Vec<Entity>) -> Option<Entity> {
        if group.len() <= 1 {
            return group.pop();
        }

        let chosen = self.canonical_index(&group)?;
        let mut merged = group[chosen].clone();
        merged.confidence = group
            .iter()
            .map(|e| e.confidence)
            .fold(f32::MIN, f32::max);
        merged.mentions = group
            .iter()
            .fold(0u32, |acc, e| acc.saturating_add(e.mentions));

        merged.aliases.clear();
        merged.evidence.clear();
        merged.sources.clear();
        for entity in group {
            if entity.name != merged.name {
                merged.aliases.insert(entity.name);
            }
            merged.aliases.extend(entity.aliases);
            merged.sources.extend(entity.sources);
            merged.evidence.extend(entity.evidence);
        }
        merged.aliases.remove(&merged.name);
        merged.evidence.truncate(self.max_evidence);

        tracing::debug!(
            canonical = %merged.name,
            aliases = merged.aliases.len(),
            "Merged entity group"
        );
        Some(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::{EntityType, Evidence};

    fn person(name: &str, confidence: f32) -> Entity {
        Entity::new(name, EntityType::Person, confidence)
    }

    #[test]
    fn test_empty_and_singleton() {
        let merger = EntityMerger::default();
        assert!(merger.merge(Vec::new()).is_none());

        let single = person("Trump", 0.4).with_evidence(Evidence::new("said Trump"));
        assert_eq!(merger.merge(vec![single.clone()]), Some(single));
    }

    #[test]
    fn test_longest_name_wins() {
        let merger = EntityMerger::default();
        let merged = merger
            .merge(vec![person("Trump", 0.8), person("Donald Trump", 0.9)])
            .unwrap();
        assert_eq!(merged.name, "Donald Trump");
        assert_eq!(merged.confidence, 0.9);
        assert!(merged.aliases.contains("Trump"));
        assert!(!merged.aliases.contains("Donald Trump"));
        assert_eq!(merged.mentions, 2);
    }

    #[test]
    fn test_confidence_is_maximum_not_canonical() {
        let merger = EntityMerger::default();
        let merged = merger
            .merge(vec![person("Donald J Trump", 0.3), person("Trump", 0.95)])
            .unwrap();
        assert_eq!(merged.name, "Donald J Trump");
        assert_eq!(merged.confidence, 0.95);
    }

    #[test]
    fn test_tie_break_by_total_confidence_then_first_seen() {
        let merger = EntityMerger::default();
        // Same words and length: "Smith Anne" appears twice, so more total confidence.
        let merged = merger
            .merge(vec![
                person("Anne Smith", 0.9),
                person("Smith Anne", 0.5),
                person("Smith Anne", 0.5),
            ])
            .unwrap();
        assert_eq!(merged.name, "Smith Anne");

        let merged = merger
            .merge(vec![person("Anne Smith", 0.5), person("Smith Anne", 0.5)])
            .unwrap();
        assert_eq!(merged.name, "Anne Smith");
    }

    #[test]
    fn test_type_follows_most_confident_canonical_record() {
        let merger = EntityMerger::default();
        let merged = merger
            .merge(vec![
                Entity::new("Tesla", EntityType::Product, 0.4),
                Entity::new("Tesla", EntityType::Organization, 0.9),
            ])
            .unwrap();
        assert_eq!(merged.entity_type, EntityType::Organization);
    }

    #[test]
    fn test_aliases_sources_and_evidence_are_unioned() {
        let config = NormalizerConfig {
            max_evidence_per_entity: 3,
            ..Default::default()
        };
        let merger = EntityMerger::new(&config);
        let a = person("Joe Biden", 0.9)
            .with_alias("Biden")
            .with_source("chunk-0")
            .with_evidence(Evidence::new("one"))
            .with_evidence(Evidence::new("two"));
        let b = person("President Biden", 0.7)
            .with_source("chunk-1")
            .with_evidence(Evidence::new("three"))
            .with_evidence(Evidence::new("four"));

        let merged = merger.merge(vec![a, b]).unwrap();
        assert_eq!(merged.name, "President Biden");
        assert_eq!(
            merged.aliases.iter().cloned().collect::<Vec<_>>(),
            vec!["Biden".to_string(), "Joe Biden".to_string()]
        );
        assert_eq!(merged.sources.len(), 2);
        assert_eq!(merged.evidence.len(), 3);
        assert_eq!(merged.evidence[2].text, "three");
    }
}
