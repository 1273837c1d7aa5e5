//! Error types for magpie operations.
//!
//! Only configuration problems abort an operation. Bad individual records
//! (an entity without a name, a relationship without an object) are recovered
//! locally and reported as [`Discard`](crate::types::Discard) notices instead.

use thiserror::Error;

/// Result type alias for magpie operations.
pub type MagpieResult<T> = Result<T, MagpieError>;

/// Main error type for all magpie operations.
#[derive(Error, Debug)]
pub enum MagpieError {
    /// Configuration rejected at construction time.
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// An entity record could not be used.
    #[error("Invalid entity: {message}")]
    InvalidEntity { message: String, code: ErrorCode },

    /// A relationship record could not be used.
    #[error("Invalid relationship: {message}")]
    InvalidRelationship { message: String, code: ErrorCode },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalidThreshold,
    CfgInvalidValue,
    CfgUnsupportedFormat,

    // Validation (VAL_xxx)
    ValMissingName,
    ValMissingType,
    ValInvalidConfidence,
    ValMissingRelationshipField,
    ValMissingTopicName,

    // Parse (PARSE_xxx)
    ParseInvalidJson,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalidThreshold => "CFG_001",
            ErrorCode::CfgInvalidValue => "CFG_002",
            ErrorCode::CfgUnsupportedFormat => "CFG_003",
            ErrorCode::ValMissingName => "VAL_001",
            ErrorCode::ValMissingType => "VAL_002",
            ErrorCode::ValInvalidConfidence => "VAL_003",
            ErrorCode::ValMissingRelationshipField => "VAL_004",
            ErrorCode::ValMissingTopicName => "VAL_005",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl MagpieError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            code: ErrorCode::CfgInvalidValue,
            suggestion: None,
        }
    }

    /// Create a configuration error for an out-of-range similarity threshold.
    pub fn invalid_threshold(threshold: f32) -> Self {
        Self::Configuration {
            message: format!("similarity_threshold must be in (0, 1], got {}", threshold),
            code: ErrorCode::CfgInvalidThreshold,
            suggestion: Some("Use a value such as 0.85".to_string()),
        }
    }

    /// Create an unsupported config format error.
    pub fn unsupported_format(extension: Option<&str>) -> Self {
        Self::Configuration {
            message: format!(
                "Unsupported config file format {:?}. Use .toml, .json, or .yaml",
                extension.unwrap_or("")
            ),
            code: ErrorCode::CfgUnsupportedFormat,
            suggestion: None,
        }
    }

    /// Create an invalid entity error.
    pub fn invalid_entity(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::InvalidEntity {
            message: message.into(),
            code,
        }
    }

    /// Create an invalid relationship error.
    pub fn invalid_relationship(message: impl Into<String>) -> Self {
        Self::InvalidRelationship {
            message: message.into(),
            code: ErrorCode::ValMissingRelationshipField,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { code, .. } => *code,
            Self::InvalidEntity { code, .. } => *code,
            Self::InvalidRelationship { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration { suggestion, .. } => suggestion.as_deref(),
            Self::InvalidEntity { .. } => Some("Entities need a non-empty name and a type"),
            Self::InvalidRelationship { .. } => {
                Some("Relationships need a subject, a predicate, and an object")
            }
            Self::Parse { .. } | Self::Serialization(_) => {
                Some("Check that the extractor returned valid JSON")
            }
            Self::Io(_) => None,
        }
    }

    /// Whether this error aborts the whole operation rather than a single record.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::InvalidEntity { .. } | Self::InvalidRelationship { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_threshold_error() {
        let err = MagpieError::invalid_threshold(1.5);
        assert_eq!(err.code(), ErrorCode::CfgInvalidThreshold);
        assert!(err.to_string().contains("1.5"));
        assert!(err.suggestion().is_some());
        assert!(err.is_fatal());
    }

    #[test]
    fn test_record_errors_are_not_fatal() {
        let err = MagpieError::invalid_entity("empty name", ErrorCode::ValMissingName);
        assert!(!err.is_fatal());
        assert_eq!(err.code().as_str(), "VAL_001");

        let err = MagpieError::invalid_relationship("missing object");
        assert!(!err.is_fatal());
        assert_eq!(err.code(), ErrorCode::ValMissingRelationshipField);
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::CfgInvalidThreshold.as_str(), "CFG_001");
        assert_eq!(ErrorCode::ParseInvalidJson.as_str(), "PARSE_001");
    }
}
