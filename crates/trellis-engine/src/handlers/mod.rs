//! Operation handlers: one per operation type, looked up through a
//! registry keyed by the operation's type tag. Each handler owns the
//! typed options struct it deserializes from the node's (already
//! template-resolved) options value.

mod control;
mod data;
mod http;
mod notify;
mod script;
mod workflow;

pub use control::{ConditionHandler, LogHandler, SleepHandler, TransformHandler};
pub use data::{
    BulkUpdateDataHandler, CreateDataHandler, DeleteDataHandler, ReadDataHandler,
    UpdateDataHandler,
};
pub use http::HttpRequestHandler;
pub use notify::{NotificationHandler, SendEmailHandler};
pub use script::ExecuteCodeHandler;
pub use workflow::{TriggerFlowHandler, TriggerWorkflowHandler};

use crate::backend::{DataBackend, Notifier, WorkflowBackend};
use crate::error::EngineError;
use crate::sandbox::CodeRunner;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use trellis_catalog::CatalogService;
use trellis_core::{ExecutionContext, OperationType};

/// Everything a handler may need: the catalog, the backend traits, the
/// code runner, and a shared HTTP client
pub struct EngineServices {
    /// Catalog used to validate data requests
    pub catalog: Arc<CatalogService>,
    /// Executes validated data requests
    pub data: Arc<dyn DataBackend>,
    /// Executes workflow/flow triggers
    pub workflows: Arc<dyn WorkflowBackend>,
    /// Delivers notifications and e-mail
    pub notifier: Arc<dyn Notifier>,
    /// Sandboxed code execution
    pub code: Arc<CodeRunner>,
    /// Shared HTTP client for http_request nodes
    pub http: reqwest::Client,
}

impl EngineServices {
    /// Assemble services around the given backends
    pub fn new(
        catalog: Arc<CatalogService>,
        data: Arc<dyn DataBackend>,
        workflows: Arc<dyn WorkflowBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            catalog,
            data,
            workflows,
            notifier,
            code: Arc::new(CodeRunner::new()),
            http,
        }
    }
}

/// A single operation's execution logic
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// The operation type this handler serves
    fn operation_type(&self) -> OperationType;

    /// Option fields the orchestrator must hand over untouched instead
    /// of template-resolving (condition expressions and script bodies
    /// own their `{{ }}`/brace syntax)
    fn raw_option_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Execute against resolved options and the current context
    async fn execute(
        &self,
        options: &Value,
        ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError>;
}

/// Registry mapping operation-type tags to handlers
pub struct HandlerRegistry {
    handlers: HashMap<OperationType, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    /// Registry with every built-in operation registered
    pub fn standard() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
        };
        registry.register(Arc::new(ReadDataHandler));
        registry.register(Arc::new(CreateDataHandler));
        registry.register(Arc::new(UpdateDataHandler));
        registry.register(Arc::new(DeleteDataHandler));
        registry.register(Arc::new(BulkUpdateDataHandler));
        registry.register(Arc::new(LogHandler));
        registry.register(Arc::new(ConditionHandler));
        registry.register(Arc::new(HttpRequestHandler));
        registry.register(Arc::new(TransformHandler));
        registry.register(Arc::new(SendEmailHandler));
        registry.register(Arc::new(SleepHandler));
        registry.register(Arc::new(NotificationHandler));
        registry.register(Arc::new(ExecuteCodeHandler));
        registry.register(Arc::new(TriggerWorkflowHandler));
        registry.register(Arc::new(TriggerFlowHandler));
        registry
    }

    /// Register (or replace) a handler under its operation type
    pub fn register(&mut self, handler: Arc<dyn OperationHandler>) {
        self.handlers.insert(handler.operation_type(), handler);
    }

    /// Look up the handler for an operation type
    pub fn get(&self, operation: OperationType) -> Result<&Arc<dyn OperationHandler>, EngineError> {
        self.handlers
            .get(&operation)
            .ok_or_else(|| EngineError::UnknownOperation(operation.tag().to_string()))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Deserialize a handler's typed options struct
pub(crate) fn parse_options<T: serde::de::DeserializeOwned>(
    options: &Value,
) -> Result<T, EngineError> {
    serde_json::from_value(options.clone())
        .map_err(|e| EngineError::InvalidOptions(e.to_string()))
}
