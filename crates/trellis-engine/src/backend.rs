//! The black-box boundary to the commerce framework. The engine
//! validates and plans; these traits execute. Implementations live with
//! the embedding application.

use crate::error::EngineError;
use async_trait::async_trait;
use serde_json::Value;
use trellis_catalog::PlannedRequest;

/// Executes catalog-validated data requests against the framework's ORM
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Execute a validated request and return the raw response value
    async fn execute(&self, request: &PlannedRequest) -> Result<Value, EngineError>;
}

/// Starts workflows and flows on the framework's orchestration runtime
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    /// Start a named workflow; block for its result iff `wait` is set
    async fn trigger_workflow(
        &self,
        name: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError>;

    /// Start another flow by id; block for its result iff `wait` is set
    async fn trigger_flow(
        &self,
        flow_id: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError>;
}

/// Delivers notifications and e-mail
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a notification to a channel
    async fn notify(&self, channel: &str, title: &str, message: &str)
        -> Result<Value, EngineError>;

    /// Send an e-mail
    async fn send_email(&self, to: &str, subject: &str, body: &str)
        -> Result<Value, EngineError>;
}
