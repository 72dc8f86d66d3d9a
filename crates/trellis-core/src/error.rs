use thiserror::Error;

/// Core error type for the Trellis domain layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Graph validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Condition expression error
    #[error("Condition error: {0}")]
    ConditionError(String),

    /// Flow run state transition error
    #[error("Run state error: {0}")]
    RunStateError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

impl From<&str> for CoreError {
    fn from(err: &str) -> Self {
        CoreError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                CoreError::ValidationError("duplicate key".to_string()),
                "Validation error: duplicate key",
            ),
            (
                CoreError::ConditionError("no comparator".to_string()),
                "Condition error: no comparator",
            ),
            (
                CoreError::RunStateError("cannot start".to_string()),
                "Run state error: cannot start",
            ),
            (
                CoreError::SerializationError("bad json".to_string()),
                "Serialization error: bad json",
            ),
            (CoreError::Other("other".to_string()), "other"),
        ];

        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let error: CoreError = json_error.into();

        match error {
            CoreError::SerializationError(msg) => assert!(msg.contains("expected")),
            _ => panic!("Expected SerializationError variant"),
        }
    }

    #[test]
    fn test_from_string() {
        let error: CoreError = "boom".into();
        assert_eq!(error, CoreError::Other("boom".to_string()));
    }
}
