//! Partitioning entities into equivalence groups.
//!
//! Matching is not transitive on its own ("Trump" ~ "Donald Trump",
//! "Donald Trump" ~ "Donald J Trump", but maybe not "Trump" ~ "Donald J
//! Trump"). Grouping takes the transitive closure with a union-find, so the
//! resulting partition depends only on which pairs match, never on input or
//! evaluation order.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};

use petgraph::unionfind::UnionFind;

use magpie_core::{Entity, EntityType};

use super::matcher::SimilarityMatcher;

/// Groups entities that the matcher considers the same.
#[derive(Debug, Clone)]
pub struct EntityGrouper {
    matcher: SimilarityMatcher,
}

impl EntityGrouper {
    pub fn new(matcher: SimilarityMatcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &SimilarityMatcher {
        &self.matcher
    }

    /// Partition entities into groups of indices.
    ///
    /// Every index appears in exactly one group. Groups are ordered by their
    /// first member, and members keep input order. Entities are bucketed by
    /// type first, so only compatible buckets are compared pairwise.
    pub fn partition<E: Borrow<Entity>>(&self, entities: &[E]) -> Vec<Vec<usize>> {
        let n = entities.len();
        if n == 0 {
            return Vec::new();
        }

        let keys: Vec<_> = entities
            .iter()
            .map(|e| self.matcher.names().clean(&e.borrow().name))
            .collect();

        let mut buckets: BTreeMap<EntityType, Vec<usize>> = BTreeMap::new();
        for (i, entity) in entities.iter().enumerate() {
            buckets.entry(entity.borrow().entity_type).or_default().push(i);
        }
        let types: Vec<EntityType> = buckets.keys().copied().collect();

        let mut sets = UnionFind::<usize>::new(n);
        let mut comparisons = 0usize;

        for (ti, &a_type) in types.iter().enumerate() {
            for &b_type in &types[ti..] {
                if !self.matcher.types_compatible(a_type, b_type) {
                    continue;
                }
                let left = &buckets[&a_type];
                let right = &buckets[&b_type];

                for (li, &a) in left.iter().enumerate() {
                    let Some(a_key) = &keys[a] else { continue };
                    let candidates = if a_type == b_type { &left[li + 1..] } else { &right[..] };

                    for &b in candidates {
                        if sets.equiv(a, b) {
                            continue;
                        }
                        let Some(b_key) = &keys[b] else { continue };
                        comparisons += 1;
                        if self
                            .matcher
                            .compare_keys(a_type, a_key, b_type, b_key)
                            .matched
                        {
                            sets.union(a, b);
                        }
                    }
                }
            }
        }

        let labels = sets.into_labeling();
        let mut slot_of: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, label) in labels.into_iter().enumerate() {
            let slot = *slot_of.entry(label).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(i);
        }

        tracing::debug!(
            entities = n,
            buckets = types.len(),
            comparisons,
            groups = groups.len(),
            "Grouped entities"
        );
        groups
    }

    /// Partition entities into groups of entities.
    pub fn group(&self, entities: Vec<Entity>) -> Vec<Vec<Entity>> {
        let groups = self.partition(&entities);
        let mut slots: Vec<Option<Entity>> = entities.into_iter().map(Some).collect();
        groups
            .into_iter()
            .map(|members| {
                members
                    .into_iter()
                    .filter_map(|i| slots[i].take())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magpie_core::NormalizerConfig;
    use std::collections::BTreeSet;

    fn grouper() -> EntityGrouper {
        EntityGrouper::new(SimilarityMatcher::new(NormalizerConfig::default()).unwrap())
    }

    fn names(groups: &[Vec<Entity>]) -> BTreeSet<BTreeSet<String>> {
        groups
            .iter()
            .map(|g| g.iter().map(|e| e.name.clone()).collect())
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(grouper().group(Vec::new()).is_empty());
    }

    #[test]
    fn test_partition_covers_every_entity_once() {
        let entities = vec![
            Entity::new("Donald Trump", EntityType::Person, 0.9),
            Entity::new("Joe Biden", EntityType::Person, 0.9),
            Entity::new("Trump", EntityType::Person, 0.8),
            Entity::new("Washington", EntityType::Location, 0.7),
            Entity::new("Washington", EntityType::Person, 0.6),
        ];
        let groups = grouper().partition(&entities);

        let mut seen: Vec<usize> = groups.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(groups, vec![vec![0, 2], vec![1], vec![3], vec![4]]);
    }

    #[test]
    fn test_transitive_closure() {
        // "Zelensky" and "Volodymyr Zelenskyy" do not match directly; the
        // bridging record comes last and still joins all three.
        let entities = vec![
            Entity::new("Zelensky", EntityType::Person, 0.7),
            Entity::new("Volodymyr Zelenskyy", EntityType::Person, 0.6),
            Entity::new("Volodymyr Zelensky", EntityType::Person, 0.9),
        ];
        let g = grouper();
        assert!(!g.matcher().same(&entities[0], &entities[1]));

        let groups = g.group(entities);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_order_does_not_change_partition() {
        let entities = vec![
            Entity::new("United States", EntityType::Location, 0.9),
            Entity::new("USA", EntityType::Location, 0.8),
            Entity::new("U.S.", EntityType::Location, 0.7),
            Entity::new("Russia", EntityType::Location, 0.9),
            Entity::new("Russian Federation", EntityType::Location, 0.6),
        ];
        let forward = names(&grouper().group(entities.clone()));
        let mut reversed_input = entities;
        reversed_input.reverse();
        let backward = names(&grouper().group(reversed_input));
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_short_name_does_not_bridge_people() {
        let entities = vec![
            Entity::new("Jo", EntityType::Person, 0.5),
            Entity::new("John Obrien", EntityType::Person, 0.9),
            Entity::new("Jane Ogden", EntityType::Person, 0.8),
        ];
        assert_eq!(grouper().partition(&entities), vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_type_buckets_never_mix() {
        let entities = vec![
            Entity::new("Jordan", EntityType::Person, 0.9),
            Entity::new("Jordan", EntityType::Location, 0.9),
            Entity::new("Jordan", EntityType::Product, 0.9),
        ];
        assert_eq!(grouper().group(entities).len(), 3);
    }

    #[test]
    fn test_compatible_types_share_groups() {
        let config = NormalizerConfig::default()
            .allow_types(EntityType::Organization, EntityType::Product);
        let grouper = EntityGrouper::new(SimilarityMatcher::new(config).unwrap());
        let entities = vec![
            Entity::new("Tesla", EntityType::Organization, 0.9),
            Entity::new("Tesla", EntityType::Product, 0.5),
            Entity::new("Tesla", EntityType::Person, 0.5),
        ];
        let groups = grouper.partition(&entities);
        assert_eq!(groups, vec![vec![0, 1], vec![2]]);
    }
}
