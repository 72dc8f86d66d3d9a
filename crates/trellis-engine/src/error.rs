use thiserror::Error;
use trellis_core::CoreError;

/// Engine error types
#[derive(Error, Debug)]
pub enum EngineError {
    /// Domain-level error (validation, run state, condition syntax)
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A planned request failed catalog validation even after alias
    /// correction; execution was not attempted
    #[error("Invalid endpoint: {method} {path}")]
    InvalidEndpoint {
        /// Requested method
        method: String,
        /// Requested path
        path: String,
        /// Ranked same-method suggestions, best first
        suggestions: Vec<String>,
    },

    /// A sandboxed code node exceeded its timeout
    #[error("Code step timed out after {timeout_ms}ms")]
    StepTimeout {
        /// The configured timeout
        timeout_ms: u64,
    },

    /// A sandboxed script raised a runtime error
    #[error("Script error: {0}")]
    ScriptError(String),

    /// A declared package is not on the sandbox allow-list
    #[error("Package not allowed: {0}")]
    PackageNotAllowed(String),

    /// An external API or workflow call failed
    #[error("Upstream call failed: {0}")]
    UpstreamCall(String),

    /// No handler is registered for the operation type
    #[error("No handler registered for operation: {0}")]
    UnknownOperation(String),

    /// Operation options did not match the handler's expected shape
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::InvalidOptions(err.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::UpstreamCall(err.to_string())
    }
}
