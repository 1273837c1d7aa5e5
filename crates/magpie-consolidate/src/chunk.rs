//! Folding the results of overlapping transcript windows into one result.
//!
//! Matching here is deliberately coarse: entities collide only when their
//! type and comparison key are identical. "Trump" and "Donald Trump" coming
//! from two windows both survive; run an `EntityNormalizer` over the merged
//! result to resolve them.
//!
//! The key includes the entity type, not the cleaned name alone, so the same
//! name reported as a person and as a place stays two entities, matching the
//! type gate of full normalization.

use std::collections::{BTreeMap, HashMap, HashSet};

use magpie_core::{
    Discard, Entity, EntityType, ExtractionResult, KeyMoment, NormalizerConfig, Outcome,
    Relationship, RelationshipKey, Sentiment, Topic,
};

use crate::entity::NameNormalizer;

/// Merges per-chunk extraction results.
#[derive(Debug, Clone, Default)]
pub struct ChunkMerger {
    names: NameNormalizer,
}

impl ChunkMerger {
    pub fn new(config: &NormalizerConfig) -> Self {
        Self {
            names: NameNormalizer::new(config),
        }
    }

    /// Start an empty fold.
    pub fn accumulator(&self) -> ChunkAccumulator<'_> {
        ChunkAccumulator::new(&self.names)
    }

    /// Merge chunk results in order.
    pub fn merge_chunks(&self, chunks: Vec<ExtractionResult>) -> Outcome<ExtractionResult> {
        let mut acc = self.accumulator();
        for chunk in chunks {
            acc.absorb(chunk);
        }
        let chunk_count = acc.chunks;
        let outcome = acc.finish();

        tracing::info!(
            chunks = chunk_count,
            entities = outcome.value.entities.len(),
            relationships = outcome.value.relationships.len(),
            topics = outcome.value.topics.len(),
            key_moments = outcome.value.key_moments.len(),
            discarded = outcome.discarded.len(),
            "Merged chunk results"
        );
        outcome
    }
}

#[derive(Debug, Clone, Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: f32) {
        self.sum += f64::from(value);
        self.count += 1;
    }

    fn merge(&mut self, other: &Mean) {
        self.sum += other.sum;
        self.count += other.count;
    }

    fn value(&self) -> Option<f32> {
        (self.count > 0).then(|| (self.sum / f64::from(self.count)) as f32)
    }
}

/// Partial fold over some chunks.
///
/// Accumulators over disjoint runs of chunks can be built independently and
/// joined with [`combine`](Self::combine), left run first. Joining in order
/// gives the same result as absorbing every chunk into one accumulator.
#[derive(Debug, Clone)]
pub struct ChunkAccumulator<'a> {
    names: &'a NameNormalizer,
    chunks: usize,
    entities: Vec<Entity>,
    entity_index: HashMap<(EntityType, String), usize>,
    relationships: Vec<Relationship>,
    relationship_index: HashSet<RelationshipKey>,
    topics: Vec<Topic>,
    topic_index: HashMap<String, usize>,
    key_moments: Vec<KeyMoment>,
    overall: Mean,
    per_topic: BTreeMap<String, Mean>,
    discarded: Vec<Discard>,
}

impl<'a> ChunkAccumulator<'a> {
    fn new(names: &'a NameNormalizer) -> Self {
        Self {
            names,
            chunks: 0,
            entities: Vec::new(),
            entity_index: HashMap::new(),
            relationships: Vec::new(),
            relationship_index: HashSet::new(),
            topics: Vec::new(),
            topic_index: HashMap::new(),
            key_moments: Vec::new(),
            overall: Mean::default(),
            per_topic: BTreeMap::new(),
            discarded: Vec::new(),
        }
    }

    /// Number of chunks folded so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks
    }

    /// Fold one chunk in.
    pub fn absorb(&mut self, chunk: ExtractionResult) {
        self.chunks += 1;

        let (entities, discarded) = self.names.clean_entities(chunk.entities).into_parts();
        self.discarded.extend(discarded);
        for entity in entities {
            self.insert_entity(entity);
        }

        for mut rel in chunk.relationships {
            if let Err(e) = rel.validate() {
                tracing::debug!("Dropping relationship: {}", e);
                self.discarded
                    .push(Discard::relationship(rel.key().to_string(), e.to_string()));
                continue;
            }
            rel.subject = rel.subject.trim().to_string();
            rel.predicate = rel.predicate.trim().to_string();
            rel.object = rel.object.trim().to_string();
            self.insert_relationship(rel);
        }

        for mut topic in chunk.topics {
            let name = topic.name.trim().to_string();
            if name.is_empty() {
                tracing::debug!("Dropping topic without a name");
                self.discarded
                    .push(Discard::topic(topic.name, "missing topic name"));
                continue;
            }
            topic.name = name;
            self.insert_topic(topic);
        }

        self.key_moments.extend(chunk.key_moments);

        if let Some(sentiment) = chunk.sentiment {
            self.overall.add(sentiment.overall);
            for (topic, score) in sentiment.per_topic {
                self.per_topic.entry(topic).or_default().add(score);
            }
        }
    }

    /// Append a fold over later chunks.
    pub fn combine(&mut self, other: ChunkAccumulator<'_>) {
        self.chunks += other.chunks;
        self.discarded.extend(other.discarded);
        for entity in other.entities {
            self.insert_entity(entity);
        }
        for rel in other.relationships {
            self.insert_relationship(rel);
        }
        for topic in other.topics {
            self.insert_topic(topic);
        }
        self.key_moments.extend(other.key_moments);
        self.overall.merge(&other.overall);
        for (topic, mean) in &other.per_topic {
            self.per_topic.entry(topic.clone()).or_default().merge(mean);
        }
    }

    /// Produce the merged result.
    pub fn finish(self) -> Outcome<ExtractionResult> {
        let sentiment = self.overall.value().map(|overall| Sentiment {
            overall,
            per_topic: self
                .per_topic
                .iter()
                .filter_map(|(topic, mean)| mean.value().map(|v| (topic.clone(), v)))
                .collect(),
        });

        Outcome::new(
            ExtractionResult {
                entities: self.entities,
                relationships: self.relationships,
                topics: self.topics,
                key_moments: self.key_moments,
                sentiment,
            },
            self.discarded,
        )
    }

    // Entities arriving here already carry a cleaned name.
    fn insert_entity(&mut self, entity: Entity) {
        let Some(clean) = self.names.clean(&entity.name) else {
            return;
        };
        match self.entity_index.get(&(entity.entity_type, clean.key.clone())) {
            Some(&slot) => {
                if entity.confidence > self.entities[slot].confidence {
                    self.entities[slot] = entity;
                }
            }
            None => {
                self.entity_index
                    .insert((entity.entity_type, clean.key), self.entities.len());
                self.entities.push(entity);
            }
        }
    }

    fn insert_relationship(&mut self, rel: Relationship) {
        if self.relationship_index.insert(rel.key()) {
            self.relationships.push(rel);
        }
    }

    fn insert_topic(&mut self, topic: Topic) {
        match self.topic_index.get(&topic.name) {
            Some(&slot) => {
                if topic.relevance > self.topics[slot].relevance {
                    self.topics[slot] = topic;
                }
            }
            None => {
                self.topic_index.insert(topic.name.clone(), self.topics.len());
                self.topics.push(topic);
            }
        }
    }
}
