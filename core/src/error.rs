use serde::Serialize;
use thiserror::Error;

/// Unified error type for analysis calls.
///
/// Serializes to JSON as `{"type": ..., "details": {...}}` so that callers
/// exchanging results as JSON can surface the failure kind.
#[derive(Error, Debug, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AnalysisError {
    #[error("Rule table error: {message}")]
    Rules { message: String },

    #[error("Classification error: {message}")]
    Classification { message: String },

    #[error("Input text is empty")]
    EmptyInput,

    #[error("Ingest error: {message}")]
    Ingest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl AnalysisError {
    pub fn rules(message: impl Into<String>) -> Self {
        Self::Rules {
            message: message.into(),
        }
    }

    pub fn classification(message: impl Into<String>) -> Self {
        Self::Classification {
            message: message.into(),
        }
    }

    pub fn ingest(message: impl Into<String>) -> Self {
        Self::Ingest {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Check if this error is recoverable (the caller can retry or fix the input)
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Classifier runs and IO may be transient; empty input just needs text
            Self::Classification { .. } | Self::Io { .. } | Self::EmptyInput => true,
            // A bad rule table, config or document won't change on retry
            Self::Rules { .. } | Self::Config { .. } | Self::Ingest { .. } => false,
        }
    }
}

impl From<crate::rules::RuleError> for AnalysisError {
    fn from(err: crate::rules::RuleError) -> Self {
        // An unreadable rule document is a setup failure, not a transient one.
        AnalysisError::rules(err.to_string())
    }
}

impl From<crate::classify::ClassifyError> for AnalysisError {
    fn from(err: crate::classify::ClassifyError) -> Self {
        use crate::classify::ClassifyError;
        match err {
            ClassifyError::NotFound(program) => {
                AnalysisError::classification(format!("Classifier executable not found: {program}"))
            }
            ClassifyError::CommandFailed(msg) => {
                AnalysisError::classification(format!("Command failed: {msg}"))
            }
            ClassifyError::ParseError(msg) => {
                AnalysisError::classification(format!("Parse error: {msg}"))
            }
            ClassifyError::EmptyResponse => {
                AnalysisError::classification("Empty response from classifier")
            }
            ClassifyError::InvalidThreshold(t) => {
                AnalysisError::config(format!("Classifier threshold must be within [0, 1], got {t}"))
            }
            ClassifyError::Io(e) => AnalysisError::classification(format!("IO: {e}")),
        }
    }
}

impl From<crate::ingest::IngestError> for AnalysisError {
    fn from(err: crate::ingest::IngestError) -> Self {
        AnalysisError::ingest(err.to_string())
    }
}

impl From<crate::config::ConfigError> for AnalysisError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::Io(e) => AnalysisError::io(e.to_string()),
            other => AnalysisError::config(other.to_string()),
        }
    }
}

impl From<std::io::Error> for AnalysisError {
    fn from(err: std::io::Error) -> Self {
        AnalysisError::io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifyError;
    use crate::rules::RuleError;

    #[test]
    fn test_error_serialization() {
        let err = AnalysisError::classification("model crashed");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"type\":\"Classification\""));
        assert!(json.contains("\"message\":\"model crashed\""));

        let json = serde_json::to_string(&AnalysisError::EmptyInput).unwrap();
        assert_eq!(json, r#"{"type":"EmptyInput"}"#);
    }

    #[test]
    fn test_is_recoverable() {
        assert!(AnalysisError::classification("timeout").is_recoverable());
        assert!(AnalysisError::EmptyInput.is_recoverable());
        assert!(!AnalysisError::rules("bad yaml").is_recoverable());
        assert!(!AnalysisError::config("threshold").is_recoverable());
    }

    #[test]
    fn test_conversions() {
        let err: AnalysisError = RuleError::UnmappedCategory {
            category: "misc".to_owned(),
        }
        .into();
        match err {
            AnalysisError::Rules { message } => assert!(message.contains("misc")),
            other => panic!("Wrong variant: {other:?}"),
        }

        let err: AnalysisError = ClassifyError::EmptyResponse.into();
        assert!(matches!(err, AnalysisError::Classification { .. }));

        let err: AnalysisError = ClassifyError::InvalidThreshold(2.0).into();
        assert!(matches!(err, AnalysisError::Config { .. }));

        let err: AnalysisError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, AnalysisError::Io { .. }));
    }

    #[test]
    fn test_unreadable_rules_are_fatal() {
        let io = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "stream did not contain valid UTF-8",
        );
        let err: AnalysisError = RuleError::Io(io).into();
        match &err {
            AnalysisError::Rules { message } => assert!(message.contains("valid UTF-8")),
            other => panic!("Wrong variant: {other:?}"),
        }
        assert!(!err.is_recoverable());
    }
}
