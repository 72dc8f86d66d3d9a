//! Control-surface operations: logging, condition gating, data
//! transformation, and sleeping.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use trellis_core::{condition, template, ExecutionContext, OperationType};

#[derive(Debug, Deserialize)]
struct LogOptions {
    #[serde(default)]
    message: String,
    #[serde(default)]
    level: Option<String>,
}

/// `log`: emit the resolved message at the requested level
pub struct LogHandler;

#[async_trait]
impl OperationHandler for LogHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::Log
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        _services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: LogOptions = parse_options(options)?;
        match opts.level.as_deref().unwrap_or("info") {
            "debug" => debug!("{}", opts.message),
            "warn" => warn!("{}", opts.message),
            "error" => error!("{}", opts.message),
            _ => info!("{}", opts.message),
        }
        Ok(json!({"message": opts.message}))
    }
}

#[derive(Debug, Deserialize)]
struct ConditionOptions {
    expression: String,
}

/// `condition`: compile the comparison expression, resolve its left-hand
/// path against the context, and emit the verdict. A false verdict
/// gates this node's outgoing edges; the orchestrator skips the branch.
pub struct ConditionHandler;

#[async_trait]
impl OperationHandler for ConditionHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::Condition
    }

    fn raw_option_fields(&self) -> &'static [&'static str] {
        // The compiler owns the `{{ }}` wrapper; never pre-resolve it
        &["expression"]
    }

    async fn execute(
        &self,
        options: &Value,
        ctx: &ExecutionContext,
        _services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: ConditionOptions = parse_options(options)?;
        let rule = condition::compile(&opts.expression)?;
        let lhs = template::lookup(&rule.path, ctx);
        let passed = rule.evaluate(&lhs);
        debug!(path = %rule.path, op = rule.op.tag(), passed, "Condition evaluated");
        Ok(Value::Bool(passed))
    }
}

#[derive(Debug, Deserialize)]
struct TransformOptions {
    #[serde(default)]
    data: Value,
}

/// `transform`: the node's resolved `data` template becomes its output
pub struct TransformHandler;

#[async_trait]
impl OperationHandler for TransformHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::Transform
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        _services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: TransformOptions = parse_options(options)?;
        Ok(opts.data)
    }
}

#[derive(Debug, Deserialize)]
struct SleepOptions {
    #[serde(default)]
    duration_ms: u64,
}

/// `sleep`: suspend the run for a duration
pub struct SleepHandler;

#[async_trait]
impl OperationHandler for SleepHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::Sleep
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        _services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: SleepOptions = parse_options(options)?;
        tokio::time::sleep(std::time::Duration::from_millis(opts.duration_ms)).await;
        Ok(json!({"slept_ms": opts.duration_ms}))
    }
}
