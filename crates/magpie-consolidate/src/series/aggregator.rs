//! Folding many per-video results into one series result.

use std::collections::{BTreeMap, BTreeSet};

use magpie_core::{
    ConsolidatedVideoResult, ConsolidationConfig, Discard, Entity, EntityStats, EntityType,
    MagpieResult, Outcome, RankedEntity, RecurringRelationship, RelationshipKey,
    SeriesAnalysisResult, SeriesConfig, VideoEvidence,
};

use super::insights::InsightGenerator;
use super::trends::topic_trends;
use crate::entity::{EntityNormalizer, NameResolution};

/// Builds collection-level statistics from per-video results.
#[derive(Debug, Clone)]
pub struct SeriesAggregator {
    config: SeriesConfig,
    normalizer: EntityNormalizer,
    insights: InsightGenerator,
}

/// Running totals for one entity.
struct EntityTally {
    count: u32,
    videos: BTreeSet<usize>,
    entity_type: EntityType,
    confidence_sum: f64,
    records: u32,
    evidence: Vec<VideoEvidence>,
}

/// Running totals for one relationship triple.
#[derive(Default)]
struct RelationshipTally {
    count: u32,
    videos: BTreeSet<usize>,
    confidence_sum: f64,
    evidence: Vec<VideoEvidence>,
}

fn mean(sum: f64, n: u32) -> f32 {
    if n == 0 {
        0.0
    } else {
        (sum / f64::from(n)) as f32
    }
}

impl SeriesAggregator {
    /// Create an aggregator. Fails fast on an invalid configuration.
    pub fn new(config: &ConsolidationConfig) -> MagpieResult<Self> {
        config.series.validate()?;
        Ok(Self {
            normalizer: EntityNormalizer::new(config.normalizer.clone())?,
            insights: InsightGenerator::new(&config.series),
            config: config.series.clone(),
        })
    }

    /// Create an aggregator with the default configuration.
    pub fn with_defaults() -> Self {
        let config = SeriesConfig::default();
        Self {
            normalizer: EntityNormalizer::with_defaults(),
            insights: InsightGenerator::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &SeriesConfig {
        &self.config
    }

    /// Aggregate videos in sequence order. Empty input yields an empty result.
    pub fn aggregate(&self, videos: &[ConsolidatedVideoResult]) -> Outcome<SeriesAnalysisResult> {
        if videos.is_empty() {
            tracing::info!("No videos to aggregate");
            return Outcome::clean(SeriesAnalysisResult::default());
        }

        let mut discarded = Vec::new();

        // Every usable entity record, tagged with its video.
        let mut records: Vec<(usize, Entity)> = Vec::new();
        for (video_index, video) in videos.iter().enumerate() {
            let (cleaned, dropped) = self
                .normalizer
                .names()
                .clean_entities(video.entities.clone())
                .into_parts();
            discarded.extend(dropped);
            records.extend(cleaned.into_iter().map(|e| (video_index, e)));
        }

        let (canonical, resolution) = self.resolve_names(&records);

        let mut tallies: BTreeMap<String, EntityTally> = BTreeMap::new();
        let mut per_video: Vec<BTreeSet<&str>> = vec![BTreeSet::new(); videos.len()];
        for ((video_index, entity), (name, entity_type)) in records.iter().zip(&canonical) {
            per_video[*video_index].insert(name.as_str());
            let tally = tallies.entry(name.clone()).or_insert_with(|| EntityTally {
                count: 0,
                videos: BTreeSet::new(),
                entity_type: *entity_type,
                confidence_sum: 0.0,
                records: 0,
                evidence: Vec::new(),
            });
            tally.count = tally.count.saturating_add(entity.mentions.max(1));
            tally.videos.insert(*video_index);
            tally.confidence_sum += f64::from(entity.confidence);
            tally.records += 1;
            for evidence in &entity.evidence {
                if tally.evidence.len() >= self.config.max_evidence_per_entity {
                    break;
                }
                tally.evidence.push(VideoEvidence {
                    video_index: *video_index,
                    evidence: evidence.clone(),
                });
            }
        }

        let average_entities = per_video.iter().map(BTreeSet::len).sum::<usize>() as f32
            / videos.len() as f32;

        let entity_frequency: BTreeMap<String, EntityStats> = tallies
            .into_iter()
            .map(|(name, t)| {
                let stats = EntityStats {
                    count: t.count,
                    videos: t.videos,
                    entity_type: t.entity_type,
                    average_confidence: mean(t.confidence_sum, t.records),
                    evidence: t.evidence,
                };
                (name, stats)
            })
            .collect();

        let mut top_entities: Vec<RankedEntity> = entity_frequency
            .iter()
            .map(|(name, stats)| RankedEntity {
                name: name.clone(),
                entity_type: stats.entity_type,
                mentions: stats.count,
                video_count: stats.video_count(),
                average_confidence: stats.average_confidence,
            })
            .collect();
        top_entities.sort_by(|a, b| {
            b.mentions
                .cmp(&a.mentions)
                .then(b.video_count.cmp(&a.video_count))
                .then_with(|| a.name.cmp(&b.name))
        });
        top_entities.truncate(self.config.top_entities_limit);

        let recurring_relationships =
            self.recurring_relationships(videos, resolution.as_ref(), &mut discarded);

        let (topic_trends, topic_discards) = topic_trends(videos, self.config.trend_threshold);
        discarded.extend(topic_discards);

        let mut result = SeriesAnalysisResult {
            video_count: videos.len(),
            total_duration_seconds: videos.iter().map(|v| v.duration_seconds).sum(),
            total_cost: videos.iter().map(|v| v.processing_cost).sum(),
            unique_entity_count: entity_frequency.len(),
            top_entities,
            entity_frequency,
            recurring_relationships,
            topic_trends,
            insights: Vec::new(),
        };
        result.insights = self.insights.generate(&result, average_entities);

        tracing::info!(
            videos = result.video_count,
            unique_entities = result.unique_entity_count,
            recurring_relationships = result.recurring_relationships.len(),
            topic_trends = result.topic_trends.len(),
            insights = result.insights.len(),
            discarded = discarded.len(),
            "Aggregated series"
        );
        Outcome::new(result, discarded)
    }

    /// Canonical `(name, type)` for every record, plus the key map used to
    /// rewrite relationship endpoints. Without cross-video resolution each
    /// record keeps its own cleaned name and there is no key map.
    fn resolve_names(
        &self,
        records: &[(usize, Entity)],
    ) -> (Vec<(String, EntityType)>, Option<NameResolution>) {
        if !self.config.resolve_across_videos {
            let own = records
                .iter()
                .map(|(_, e)| (e.name.clone(), e.entity_type))
                .collect();
            return (own, None);
        }

        let entities: Vec<&Entity> = records.iter().map(|(_, e)| e).collect();
        let groups = self.normalizer.grouper().partition(&entities);

        let mut canonical: Vec<(String, EntityType)> = records
            .iter()
            .map(|(_, e)| (e.name.clone(), e.entity_type))
            .collect();
        let mut resolution = NameResolution::default();

        for group in &groups {
            let Some(pos) = self
                .normalizer
                .merger()
                .canonical_index(group.iter().map(|&i| entities[i]))
            else {
                continue;
            };
            let chosen = entities[group[pos]];
            for &i in group {
                canonical[i] = (chosen.name.clone(), chosen.entity_type);
                let member = entities[i];
                for name in std::iter::once(&member.name).chain(&member.aliases) {
                    if let Some(clean) = self.normalizer.names().clean(name) {
                        resolution.insert(clean.key, &chosen.name);
                    }
                }
            }
        }

        tracing::debug!(
            records = records.len(),
            groups = groups.len(),
            "Resolved entity names across videos"
        );
        (canonical, Some(resolution))
    }

    fn recurring_relationships(
        &self,
        videos: &[ConsolidatedVideoResult],
        resolution: Option<&NameResolution>,
        discarded: &mut Vec<Discard>,
    ) -> Vec<RecurringRelationship> {
        let names = self.normalizer.names();
        let endpoint = |raw: &str| match resolution {
            Some(r) => r.resolve(names, raw),
            None => raw.trim().to_string(),
        };

        let mut buckets: BTreeMap<RelationshipKey, RelationshipTally> = BTreeMap::new();
        for (video_index, video) in videos.iter().enumerate() {
            for rel in &video.relationships {
                if let Err(e) = rel.validate() {
                    tracing::debug!(video = %video.video_id, "Dropping relationship: {}", e);
                    discarded.push(Discard::relationship(rel.key().to_string(), e.to_string()));
                    continue;
                }
                let key = RelationshipKey::new(
                    &endpoint(&rel.subject),
                    rel.predicate.trim(),
                    &endpoint(&rel.object),
                );
                let tally = buckets.entry(key).or_default();
                tally.count = tally.count.saturating_add(1);
                tally.videos.insert(video_index);
                tally.confidence_sum += f64::from(rel.confidence);
                for evidence in &rel.evidence {
                    if tally.evidence.len() >= self.config.max_evidence_per_entity {
                        break;
                    }
                    tally.evidence.push(VideoEvidence {
                        video_index,
                        evidence: evidence.clone(),
                    });
                }
            }
        }

        let mut recurring: Vec<RecurringRelationship> = buckets
            .into_iter()
            .filter(|(_, t)| t.videos.len() > 1)
            .map(|(key, t)| RecurringRelationship {
                key,
                count: t.count,
                average_confidence: mean(t.confidence_sum, t.count),
                videos: t.videos,
                evidence: t.evidence,
            })
            .collect();
        recurring.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(b.videos.len().cmp(&a.videos.len()))
                .then_with(|| a.key.cmp(&b.key))
        });
        recurring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::{Evidence, ExtractionResult, NormalizerConfig, Relationship};

    fn video(id: &str, entities: Vec<Entity>) -> ConsolidatedVideoResult {
        ConsolidatedVideoResult::from_extraction(
            id,
            ExtractionResult {
                entities,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = ConsolidationConfig::default();
        config.series.trend_threshold = 0.0;
        assert!(SeriesAggregator::new(&config).is_err());

        let config = ConsolidationConfig {
            normalizer: NormalizerConfig::with_threshold(2.0),
            ..Default::default()
        };
        assert!(SeriesAggregator::new(&config).is_err());
    }

    #[test]
    fn test_empty_input() {
        let outcome = SeriesAggregator::with_defaults().aggregate(&[]);
        assert!(outcome.is_clean());
        assert!(outcome.value.is_empty());
        assert_eq!(outcome.value, SeriesAnalysisResult::default());
    }

    #[test]
    fn test_counters() {
        let videos = vec![
            video("a", Vec::new()).with_duration(600.0).with_cost(0.25),
            video("b", Vec::new()).with_duration(300.0).with_cost(0.5),
        ];
        let result = SeriesAggregator::with_defaults().aggregate(&videos).value;
        assert_eq!(result.video_count, 2);
        assert_eq!(result.total_duration_seconds, 900.0);
        assert_eq!(result.total_cost, 0.75);
        assert_eq!(result.unique_entity_count, 0);
    }

    #[test]
    fn test_mentions_and_average_confidence() {
        let videos = vec![
            video(
                "a",
                vec![
                    Entity::new("Powell", EntityType::Person, 0.6).with_mentions(4),
                    Entity::new("Powell", EntityType::Person, 1.0),
                ],
            ),
            video("b", vec![Entity::new("Powell", EntityType::Person, 0.8)]),
        ];
        let result = SeriesAggregator::with_defaults().aggregate(&videos).value;
        let stats = &result.entity_frequency["Powell"];
        assert_eq!(stats.count, 6);
        assert_eq!(stats.video_count(), 2);
        assert!((stats.average_confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_cross_video_resolution() {
        let videos = vec![
            video("a", vec![Entity::new("Trump", EntityType::Person, 0.8)]),
            video(
                "b",
                vec![Entity::new("Donald Trump", EntityType::Person, 0.9)
                    .with_evidence(Evidence::new("Donald Trump said"))],
            ),
        ];
        let result = SeriesAggregator::with_defaults().aggregate(&videos).value;
        assert_eq!(result.unique_entity_count, 1);
        let stats = &result.entity_frequency["Donald Trump"];
        assert_eq!(stats.count, 2);
        assert_eq!(stats.videos, BTreeSet::from([0, 1]));
        assert_eq!(stats.evidence[0].video_index, 1);
    }

    #[test]
    fn test_resolution_can_be_disabled() {
        let mut config = ConsolidationConfig::default();
        config.series.resolve_across_videos = false;
        let aggregator = SeriesAggregator::new(&config).unwrap();
        let videos = vec![
            video("a", vec![Entity::new("Trump", EntityType::Person, 0.8)]),
            video("b", vec![Entity::new("Donald Trump", EntityType::Person, 0.9)]),
        ];
        let result = aggregator.aggregate(&videos).value;
        assert_eq!(result.unique_entity_count, 2);
    }

    #[test]
    fn test_relationship_endpoints_follow_resolution() {
        let mut a = video("a", vec![Entity::new("Donald Trump", EntityType::Person, 0.9)]);
        a.relationships = vec![Relationship::new("Donald Trump", "criticized", "Fed", 0.8)];
        let mut b = video("b", vec![Entity::new("Trump", EntityType::Person, 0.7)]);
        b.relationships = vec![
            Relationship::new("Trump", "criticized", "Fed", 0.6),
            Relationship::new("Trump", "", "Fed", 0.6),
        ];

        let outcome = SeriesAggregator::with_defaults().aggregate(&[a, b]);
        let rel = outcome
            .value
            .recurring("Donald Trump", "criticized", "Fed")
            .unwrap();
        assert_eq!(rel.count, 2);
        assert!((rel.average_confidence - 0.7).abs() < 1e-6);
        assert_eq!(outcome.discarded.len(), 1);
    }

    #[test]
    fn test_top_entities_ranking() {
        let videos = vec![
            video(
                "a",
                vec![
                    Entity::new("Beta", EntityType::Concept, 0.5).with_mentions(2),
                    Entity::new("Alpha", EntityType::Concept, 0.5).with_mentions(2),
                    Entity::new("Gamma", EntityType::Concept, 0.5),
                ],
            ),
            video("b", vec![Entity::new("Gamma", EntityType::Concept, 0.5)]),
        ];
        let mut config = ConsolidationConfig::default();
        config.series.top_entities_limit = 2;
        let result = SeriesAggregator::new(&config).unwrap().aggregate(&videos).value;

        let ranked: Vec<&str> = result.top_entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(ranked, vec!["Gamma", "Alpha"]);
        assert_eq!(result.unique_entity_count, 3);
    }
}
