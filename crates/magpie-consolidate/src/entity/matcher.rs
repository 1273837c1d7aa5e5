//! Pairwise entity matching.
//!
//! Checks run cheapest first and stop at the first decision:
//!
//! 1. Type gate: incompatible types never match, whatever the names
//! 2. Exact comparison key
//! 3. Title-insensitive key ("Dr. Fauci" vs "Fauci")
//! 4. Fuzzy score (token overlap or edit ratio) against the threshold
//! 5. Acronym initials ("USA" vs "United States of America"); only names
//!    written as acronyms qualify, so "Al" never matches "Alan Lee"
//!
//! Every check is symmetric, so `same(a, b) == same(b, a)`.

use std::collections::BTreeSet;

use magpie_core::{Entity, EntityType, MagpieResult, NormalizerConfig};

use super::name::{CleanName, NameNormalizer, STOPWORDS};

/// Which check decided a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    TypeMismatch,
    EmptyName,
    Exact,
    TitleInsensitive,
    Fuzzy,
    Abbreviation,
    BelowThreshold,
}

/// Result of comparing two entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Similarity in [0, 1]; 1.0 for exact, title and initials matches.
    pub similarity: f32,
    pub reason: MatchReason,
}

impl MatchOutcome {
    fn matched(similarity: f32, reason: MatchReason) -> Self {
        Self {
            matched: true,
            similarity,
            reason,
        }
    }

    fn rejected(similarity: f32, reason: MatchReason) -> Self {
        Self {
            matched: false,
            similarity,
            reason,
        }
    }
}

/// Decides whether two entities denote the same thing.
#[derive(Debug, Clone)]
pub struct SimilarityMatcher {
    config: NormalizerConfig,
    names: NameNormalizer,
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        let config = NormalizerConfig::default();
        Self {
            names: NameNormalizer::new(&config),
            config,
        }
    }
}

impl SimilarityMatcher {
    /// Create a matcher. Fails if the similarity threshold is outside (0, 1].
    pub fn new(config: NormalizerConfig) -> MagpieResult<Self> {
        config.validate()?;
        let names = NameNormalizer::new(&config);
        Ok(Self { config, names })
    }

    /// The name normalizer used to derive comparison keys.
    pub fn names(&self) -> &NameNormalizer {
        &self.names
    }

    pub fn threshold(&self) -> f32 {
        self.config.similarity_threshold
    }

    /// Whether entities of these types may be compared at all.
    pub fn types_compatible(&self, a: EntityType, b: EntityType) -> bool {
        self.config.types_compatible(a, b)
    }

    /// Whether two entities denote the same thing.
    pub fn same(&self, a: &Entity, b: &Entity) -> bool {
        self.compare(a, b).matched
    }

    /// Compare two entities, reporting the deciding check.
    pub fn compare(&self, a: &Entity, b: &Entity) -> MatchOutcome {
        if !self.types_compatible(a.entity_type, b.entity_type) {
            return MatchOutcome::rejected(0.0, MatchReason::TypeMismatch);
        }
        match (self.names.clean(&a.name), self.names.clean(&b.name)) {
            (Some(ka), Some(kb)) => self.compare_keys(a.entity_type, &ka, b.entity_type, &kb),
            _ => MatchOutcome::rejected(0.0, MatchReason::EmptyName),
        }
    }

    /// Compare precomputed keys. Used by the grouper to avoid re-cleaning names.
    pub fn compare_keys(
        &self,
        a_type: EntityType,
        a: &CleanName,
        b_type: EntityType,
        b: &CleanName,
    ) -> MatchOutcome {
        if !self.types_compatible(a_type, b_type) {
            return MatchOutcome::rejected(0.0, MatchReason::TypeMismatch);
        }
        if a.key.is_empty() || b.key.is_empty() {
            return MatchOutcome::rejected(0.0, MatchReason::EmptyName);
        }
        if a.key == b.key {
            return MatchOutcome::matched(1.0, MatchReason::Exact);
        }
        if a.stripped == b.stripped {
            return MatchOutcome::matched(1.0, MatchReason::TitleInsensitive);
        }

        // Single characters only match exactly or as initials.
        let fuzzy_eligible = a.stripped.chars().count() > 1 && b.stripped.chars().count() > 1;
        let score = if fuzzy_eligible { similarity(a, b) } else { 0.0 };
        if score >= self.config.similarity_threshold {
            return MatchOutcome::matched(score, MatchReason::Fuzzy);
        }

        if is_abbreviation(a, b) || is_abbreviation(b, a) {
            return MatchOutcome::matched(1.0, MatchReason::Abbreviation);
        }

        MatchOutcome::rejected(score, MatchReason::BelowThreshold)
    }
}

/// Fuzzy similarity of two stripped keys: the better of token overlap and
/// normalized edit similarity.
pub fn similarity(a: &CleanName, b: &CleanName) -> f32 {
    let edit = strsim::normalized_levenshtein(&a.stripped, &b.stripped) as f32;
    edit.max(token_score(&a.tokens, &b.tokens))
}

fn content_tokens(tokens: &[String]) -> Vec<&str> {
    tokens
        .iter()
        .map(String::as_str)
        .filter(|t| !STOPWORDS.contains(t))
        .collect()
}

/// Token-set score. A name whose tokens are a subset of the other's scores
/// 1.0 when it keeps the other's head (last) token, so "Trump" matches
/// "Donald Trump" but "Donald" does not. Otherwise Jaccard.
fn token_score(a: &[String], b: &[String]) -> f32 {
    let a_tokens = content_tokens(a);
    let b_tokens = content_tokens(b);
    let a_set: BTreeSet<&str> = a_tokens.iter().copied().collect();
    let b_set: BTreeSet<&str> = b_tokens.iter().copied().collect();
    if a_set.is_empty() || b_set.is_empty() {
        return 0.0;
    }

    let intersection = a_set.intersection(&b_set).count();
    if intersection == 0 {
        return 0.0;
    }
    let union = a_set.union(&b_set).count();
    let jaccard = intersection as f32 / union as f32;

    let head_kept = |small: &BTreeSet<&str>, large_tokens: &[&str]| {
        large_tokens
            .last()
            .map(|head| small.contains(head))
            .unwrap_or(false)
    };

    if a_set.is_subset(&b_set) && head_kept(&a_set, &b_tokens) {
        return 1.0;
    }
    if b_set.is_subset(&a_set) && head_kept(&b_set, &a_tokens) {
        return 1.0;
    }
    jaccard
}

/// Whether `short` is an acronym spelling the initials of `long`.
fn is_abbreviation(short: &CleanName, long: &CleanName) -> bool {
    // "USA" or "U.S.", never "Al" or "Jo"
    if !short.acronym {
        return false;
    }
    let single_token = short.key_tokens.len() == 1
        || short.key_tokens.iter().all(|t| t.chars().count() == 1);
    if !single_token || long.key_tokens.len() < 2 {
        return false;
    }

    let compact: String = short.key_tokens.concat();
    if compact.chars().count() < 2 {
        return false;
    }

    let initials = |tokens: &[&str]| -> String {
        tokens.iter().filter_map(|t| t.chars().next()).collect()
    };
    let all_tokens: Vec<&str> = long.key_tokens.iter().map(String::as_str).collect();
    let content = content_tokens(&long.key_tokens);

    compact == initials(&all_tokens) || compact == initials(&content)
}
