//! The `execute_code` operation: a sandboxed script whose return value
//! becomes the node output.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use trellis_core::{ExecutionContext, OperationType};

#[derive(Debug, Deserialize)]
struct ExecuteCodeOptions {
    code: String,
    #[serde(default)]
    packages: Vec<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

/// `execute_code`: run a user script in the sandbox
pub struct ExecuteCodeHandler;

#[async_trait]
impl OperationHandler for ExecuteCodeHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::ExecuteCode
    }

    fn raw_option_fields(&self) -> &'static [&'static str] {
        // Script bodies own their braces; the sandbox binds context
        // variables itself
        &["code"]
    }

    async fn execute(
        &self,
        options: &Value,
        ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: ExecuteCodeOptions = parse_options(options)?;
        let timeout = opts.timeout_ms.map(Duration::from_millis);
        let outcome = services
            .code
            .execute(&opts.code, &opts.packages, ctx, timeout)
            .await?;
        for line in &outcome.logs {
            debug!(script_log = %line, "Code step log");
        }
        Ok(outcome.value)
    }
}
