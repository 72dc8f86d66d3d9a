//! Workflow and flow trigger operations, delegated to the workflow
//! backend. `wait_for_completion` decides whether the run blocks for
//! the result or fires and continues.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use trellis_core::{ExecutionContext, OperationType};

#[derive(Debug, Deserialize)]
struct TriggerWorkflowOptions {
    workflow_name: String,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    wait_for_completion: bool,
}

/// `trigger_workflow`: start a named workflow on the backend
pub struct TriggerWorkflowHandler;

#[async_trait]
impl OperationHandler for TriggerWorkflowHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::TriggerWorkflow
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: TriggerWorkflowOptions = parse_options(options)?;
        services
            .workflows
            .trigger_workflow(
                &opts.workflow_name,
                opts.input.unwrap_or(Value::Null),
                opts.wait_for_completion,
            )
            .await
    }
}

#[derive(Debug, Deserialize)]
struct TriggerFlowOptions {
    flow_id: String,
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    wait_for_completion: bool,
}

/// `trigger_flow`: start another flow
pub struct TriggerFlowHandler;

#[async_trait]
impl OperationHandler for TriggerFlowHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::TriggerFlow
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: TriggerFlowOptions = parse_options(options)?;
        services
            .workflows
            .trigger_flow(
                &opts.flow_id,
                opts.input.unwrap_or(Value::Null),
                opts.wait_for_completion,
            )
            .await
    }
}
