//! Name cleaning and comparison keys.
//!
//! The display name an extractor produced is kept (whitespace aside). Matching
//! never looks at it directly; it uses two derived keys:
//!
//! - `key`: lowercased, punctuation-normalized tokens ("U.S." -> "us")
//! - `stripped`: `key` without leading honorifics and trailing suffixes
//!   ("president joe biden jr" -> "joe biden")

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use magpie_core::{Discard, Entity, ErrorCode, NormalizerConfig, Outcome};

/// Honorifics and roles stripped when they lead a name. Multi-word titles are
/// matched as token sequences.
const LEADING_TITLES: &[&str] = &[
    "former",
    "vice president",
    "president",
    "prime minister",
    "chief justice",
    "justice",
    "dr",
    "doctor",
    "mr",
    "mrs",
    "ms",
    "miss",
    "mx",
    "prof",
    "professor",
    "general",
    "gen",
    "senator",
    "sen",
    "governor",
    "gov",
    "representative",
    "rep",
    "congressman",
    "congresswoman",
    "secretary",
    "minister",
    "chancellor",
    "ambassador",
    "mayor",
    "judge",
    "sir",
    "dame",
    "lord",
    "lady",
    "king",
    "queen",
    "prince",
    "princess",
    "pope",
    "rev",
    "reverend",
    "ceo",
    "chairman",
    "chairwoman",
    "captain",
    "capt",
    "colonel",
    "col",
    "lieutenant",
    "lt",
    "sergeant",
    "sgt",
    "admiral",
    "adm",
];

/// Suffixes stripped when they end a name.
const TRAILING_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "phd", "md", "esq"];

/// Function words ignored by token comparison and initials.
pub(crate) const STOPWORDS: &[&str] = &["the", "of", "and", "a", "an", "for", "in", "on", "&"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// A cleaned name with its comparison keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanName {
    /// Display form: trimmed, whitespace collapsed, case preserved.
    pub display: String,
    /// Lowercased, punctuation-normalized form.
    pub key: String,
    /// `key` with titles and suffixes removed.
    pub stripped: String,
    /// Tokens of `stripped`.
    pub tokens: Vec<String>,
    /// Tokens of `key`, titles included.
    pub key_tokens: Vec<String>,
    /// Whether the display form is written as an acronym ("USA", "U.S.").
    pub acronym: bool,
}

/// Cleans raw entity names into comparable form.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    min_name_length: usize,
    titles: Vec<Vec<String>>,
    suffixes: HashSet<String>,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(&NormalizerConfig::default())
    }
}

impl NameNormalizer {
    /// Create a name normalizer from the normalizer config.
    pub fn new(config: &NormalizerConfig) -> Self {
        let mut titles: Vec<Vec<String>> = LEADING_TITLES
            .iter()
            .copied()
            .chain(config.extra_titles.iter().map(String::as_str))
            .map(|t| tokenize(&t.to_lowercase()))
            .filter(|t| !t.is_empty())
            .collect();
        // Longest first so "vice president" wins over "president".
        titles.sort_by(|a, b| b.len().cmp(&a.len()));

        Self {
            min_name_length: config.min_name_length,
            titles,
            suffixes: TRAILING_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Clean a raw name. Returns `None` if nothing usable is left.
    pub fn clean(&self, name: &str) -> Option<CleanName> {
        let display = WHITESPACE.replace_all(name.trim(), " ").into_owned();
        if display.is_empty() {
            return None;
        }
        if display.chars().count() < self.min_name_length && !is_acronym(&display) {
            return None;
        }

        let key_tokens = tokenize(&display.to_lowercase());
        if key_tokens.is_empty() {
            return None;
        }
        let tokens = self.strip_titles(&key_tokens);

        Some(CleanName {
            key: key_tokens.join(" "),
            stripped: tokens.join(" "),
            acronym: is_acronym(&display),
            display,
            tokens,
            key_tokens,
        })
    }

    /// Why `clean` would reject this name, for discard notices.
    fn rejection_reason(&self, name: &str) -> String {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            "empty name".to_string()
        } else if trimmed.chars().count() < self.min_name_length && !is_acronym(trimmed) {
            format!(
                "name shorter than {} characters and not an acronym",
                self.min_name_length
            )
        } else {
            "name has no letters or digits".to_string()
        }
    }

    /// Clean every entity's name, dropping unusable records.
    ///
    /// Surviving entities carry their cleaned display name and a confidence
    /// clamped to [0, 1].
    pub fn clean_entities(&self, entities: Vec<Entity>) -> Outcome<Vec<Entity>> {
        let mut kept = Vec::with_capacity(entities.len());
        let mut discarded = Vec::new();

        for mut entity in entities {
            if !entity.confidence.is_finite() {
                tracing::debug!(entity = %entity.name, "Dropping entity with non-numeric confidence");
                discarded.push(Discard::entity(
                    entity.name,
                    "confidence is not a number",
                    ErrorCode::ValInvalidConfidence,
                ));
                continue;
            }

            let Some(clean) = self.clean(&entity.name) else {
                tracing::debug!(entity = %entity.name, "Dropping entity with unusable name");
                let reason = self.rejection_reason(&entity.name);
                discarded.push(Discard::entity(entity.name, reason, ErrorCode::ValMissingName));
                continue;
            };

            if !(0.0..=1.0).contains(&entity.confidence) {
                tracing::warn!(
                    entity = %clean.display,
                    confidence = entity.confidence,
                    "Clamping out-of-range confidence"
                );
                entity.confidence = entity.confidence.clamp(0.0, 1.0);
            }
            entity.name = clean.display;
            kept.push(entity);
        }

        Outcome::new(kept, discarded)
    }

    fn strip_titles(&self, tokens: &[String]) -> Vec<String> {
        let mut start = 0;
        let mut end = tokens.len();

        // Strip leading titles while something remains after them.
        'outer: loop {
            for title in &self.titles {
                let remaining = &tokens[start..end];
                if remaining.len() > title.len() && remaining.starts_with(title) {
                    start += title.len();
                    continue 'outer;
                }
            }
            break;
        }

        while end - start > 1 && self.suffixes.contains(&tokens[end - 1]) {
            end -= 1;
        }

        tokens[start..end].to_vec()
    }
}

/// Whether a name is an all-caps acronym such as "US" or "UN".
pub fn is_acronym(name: &str) -> bool {
    let mut letters = name.chars().filter(|c| c.is_alphabetic()).peekable();
    letters.peek().is_some() && letters.all(|c| c.is_uppercase())
}

/// Lowercased input to comparison tokens. Dots and apostrophes vanish
/// ("u.s." -> "us"), other punctuation separates tokens.
fn tokenize(lowered: &str) -> Vec<String> {
    let mut normalized = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            '.' | '\'' | '\u{2019}' => {}
            c if c.is_alphanumeric() || c == '&' => normalized.push(c),
            _ => normalized.push(' '),
        }
    }
    normalized.split_whitespace().map(str::to_string).collect()
}
