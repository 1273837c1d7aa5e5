//! Notices for records dropped during consolidation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ErrorCode, MagpieError};

/// What kind of record was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardKind {
    InvalidEntity,
    InvalidRelationship,
    InvalidTopic,
}

/// A record that was dropped, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discard {
    pub kind: DiscardKind,
    /// Short label identifying the record (a name, or a rendered triple).
    pub record: String,
    pub reason: String,
    pub code: ErrorCode,
}

impl Discard {
    /// An entity was dropped.
    pub fn entity(record: impl Into<String>, reason: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            kind: DiscardKind::InvalidEntity,
            record: record.into(),
            reason: reason.into(),
            code,
        }
    }

    /// A relationship was dropped.
    pub fn relationship(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: DiscardKind::InvalidRelationship,
            record: record.into(),
            reason: reason.into(),
            code: ErrorCode::ValMissingRelationshipField,
        }
    }

    /// A topic was dropped.
    pub fn topic(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: DiscardKind::InvalidTopic,
            record: record.into(),
            reason: reason.into(),
            code: ErrorCode::ValMissingTopicName,
        }
    }

    /// Convert into the equivalent error, for callers that want to escalate.
    pub fn into_error(self) -> MagpieError {
        let message = format!("{}: {}", self.record, self.reason);
        match self.kind {
            DiscardKind::InvalidRelationship => MagpieError::invalid_relationship(message),
            DiscardKind::InvalidEntity | DiscardKind::InvalidTopic => {
                MagpieError::invalid_entity(message, self.code)
            }
        }
    }
}

impl fmt::Display for Discard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] '{}': {}", self.code.as_str(), self.record, self.reason)
    }
}

/// A consolidation result plus the records dropped while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub discarded: Vec<Discard>,
}

impl<T> Outcome<T> {
    /// An outcome with nothing discarded.
    pub fn clean(value: T) -> Self {
        Self {
            value,
            discarded: Vec::new(),
        }
    }

    pub fn new(value: T, discarded: Vec<Discard>) -> Self {
        Self { value, discarded }
    }

    /// Whether every input record survived.
    pub fn is_clean(&self) -> bool {
        self.discarded.is_empty()
    }

    /// Transform the value, keeping the discards.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            discarded: self.discarded,
        }
    }

    /// Split into value and discards.
    pub fn into_parts(self) -> (T, Vec<Discard>) {
        (self.value, self.discarded)
    }
}
