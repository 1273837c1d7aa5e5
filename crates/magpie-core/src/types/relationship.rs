//! Subject-predicate-object relationships between entities.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::Evidence;
use crate::error::{MagpieError, MagpieResult};

/// A relationship asserted in the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// The entity doing or being something.
    pub subject: String,
    /// The relation (e.g., "leads", "causes", "criticized").
    pub predicate: String,
    /// The entity acted upon.
    pub object: String,
    /// Extractor confidence in [0, 1].
    pub confidence: f32,
    /// Supporting text spans.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

impl Relationship {
    /// Create a new relationship.
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
        confidence: f32,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            confidence,
            evidence: Vec::new(),
        }
    }

    /// Add a piece of evidence.
    pub fn with_evidence(mut self, evidence: Evidence) -> Self {
        self.evidence.push(evidence);
        self
    }

    /// The exact triple used for bucketing.
    pub fn key(&self) -> RelationshipKey {
        RelationshipKey::new(&self.subject, &self.predicate, &self.object)
    }

    /// Check that subject, predicate and object are all present.
    pub fn validate(&self) -> MagpieResult<()> {
        let missing: Vec<&str> = [
            ("subject", &self.subject),
            ("predicate", &self.predicate),
            ("object", &self.object),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MagpieError::invalid_relationship(format!(
                "missing {} in '{}'",
                missing.join(", "),
                self.key()
            )))
        }
    }
}

/// An exact `(subject, predicate, object)` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipKey {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

impl RelationshipKey {
    pub fn new(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
        }
    }
}

impl fmt::Display for RelationshipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}
