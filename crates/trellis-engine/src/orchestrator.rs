//! The top-level flow interpreter.
//!
//! Walks operation nodes in topological order, one at a time. Each node
//! sees only previously-completed outputs: its options are template-
//! resolved against the context as it stands when the node's turn comes.
//! Condition nodes gate their outgoing edges; a node with no active
//! parent is skipped. Failures are recorded per node and halt the run
//! unless the node opts into `continue_on_error` (the default only for
//! `bulk_update_data`). There is no hidden retry policy; retries are
//! explicit extra nodes.

use crate::handlers::{EngineServices, HandlerRegistry};
use crate::EngineError;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use trellis_core::{
    template, FlowGraph, FlowRun, Node, NodeId, NodeKind, OperationType, RunId,
};

/// Handle to a run started with [`FlowEngine::start`]
pub struct StartedRun {
    /// The run's id, known before the run finishes
    pub run_id: RunId,
    /// Cancels the run between nodes
    pub cancel: CancellationToken,
    /// Resolves to the finished run
    pub handle: tokio::task::JoinHandle<Result<FlowRun, EngineError>>,
}

/// Interprets flow graphs against a set of services
pub struct FlowEngine {
    services: EngineServices,
    registry: HandlerRegistry,
}

impl FlowEngine {
    /// Engine with the standard handler registry
    pub fn new(services: EngineServices) -> Self {
        Self {
            services,
            registry: HandlerRegistry::standard(),
        }
    }

    /// Engine with a custom registry
    pub fn with_registry(services: EngineServices, registry: HandlerRegistry) -> Self {
        Self { services, registry }
    }

    /// Execute a flow to completion
    pub async fn execute(
        &self,
        graph: &FlowGraph,
        trigger: Value,
        input: Value,
    ) -> Result<FlowRun, EngineError> {
        self.execute_cancellable(graph, trigger, input, CancellationToken::new())
            .await
    }

    /// Execute a flow, stopping between nodes once `cancel` fires
    pub async fn execute_cancellable(
        &self,
        graph: &FlowGraph,
        trigger: Value,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<FlowRun, EngineError> {
        let run = FlowRun::new(graph.id.clone());
        self.drive(run, graph, trigger, input, cancel).await
    }

    /// Start a run on a spawned task, returning its id and a handle
    /// immediately. Used by webhook triggers that must acknowledge
    /// before the run finishes.
    pub fn start(self: Arc<Self>, graph: FlowGraph, trigger: Value, input: Value) -> StartedRun {
        let run = FlowRun::new(graph.id.clone());
        let run_id = run.id.clone();
        let cancel = CancellationToken::new();
        let child_token = cancel.clone();

        let handle = tokio::spawn(async move {
            self.drive(run, &graph, trigger, input, child_token).await
        });

        StartedRun {
            run_id,
            cancel,
            handle,
        }
    }

    async fn drive(
        &self,
        mut run: FlowRun,
        graph: &FlowGraph,
        trigger: Value,
        input: Value,
        cancel: CancellationToken,
    ) -> Result<FlowRun, EngineError> {
        graph.validate()?;

        let order = graph.topological_order()?;

        // Binding the trigger payload moves Pending -> Running
        run.start(trigger, input)?;
        info!(flow = %graph.id.0, run = %run.id.0, "Flow run started");

        // Nodes whose output exists and whose outgoing edges are live
        let mut active: HashSet<NodeId> = HashSet::new();
        // Condition nodes that evaluated false: completed, but gating
        let mut gated: HashSet<NodeId> = HashSet::new();

        for node in order {
            if node.kind == NodeKind::Trigger {
                active.insert(node.id.clone());
                continue;
            }

            if cancel.is_cancelled() {
                warn!(run = %run.id.0, "Flow run cancelled");
                run.cancel()?;
                return Ok(run);
            }

            let has_active_parent = graph
                .parents(&node.id)
                .into_iter()
                .any(|p| active.contains(p) && !gated.contains(p));
            if !has_active_parent {
                debug!(node = %node.id.0, "Skipping node with no active parent");
                run.record_skipped(&node.id, &node.operation_key);
                continue;
            }

            // Validation guarantees a type on every operation node
            let operation = node
                .operation_type
                .ok_or_else(|| EngineError::UnknownOperation(node.id.0.clone()))?;
            let handler = self.registry.get(operation)?;

            let options = resolve_options(node, handler.raw_option_fields(), &run);

            match handler.execute(&options, &run.context, &self.services).await {
                Ok(output) => {
                    if operation == OperationType::Condition {
                        let passed = output.as_bool().unwrap_or(false);
                        run.record_completed(&node.id, &node.operation_key, output);
                        active.insert(node.id.clone());
                        if !passed {
                            debug!(node = %node.id.0, "Condition gated its branch");
                            gated.insert(node.id.clone());
                        }
                    } else {
                        run.record_completed(&node.id, &node.operation_key, output);
                        active.insert(node.id.clone());
                    }
                }
                Err(e) => {
                    warn!(node = %node.id.0, "Node failed: {e}");
                    run.record_failed(&node.id, &node.operation_key, &e.to_string());

                    if !continues_on_error(&options, operation) {
                        run.fail(format!("Node {} failed: {e}", node.id.0))?;
                        return Ok(run);
                    }
                    // Walk proceeds to siblings; this node's children
                    // see no active parent and are skipped
                }
            }
        }

        run.complete()?;
        info!(run = %run.id.0, "Flow run succeeded");
        Ok(run)
    }
}

/// Resolve every templated field of a node's options against the current
/// context, restoring fields the handler owns verbatim (condition
/// expressions, script bodies).
fn resolve_options(node: &Node, raw_fields: &[&str], run: &FlowRun) -> Value {
    let mut resolved = template::resolve_value(&node.options, &run.context);
    if !raw_fields.is_empty() {
        if let (Value::Object(resolved_map), Value::Object(raw_map)) =
            (&mut resolved, &node.options)
        {
            for field in raw_fields {
                if let Some(raw) = raw_map.get(*field) {
                    resolved_map.insert((*field).to_string(), raw.clone());
                }
            }
        }
    }
    resolved
}

/// Per-node failure policy: explicit `continue_on_error` wins, and
/// `bulk_update_data` defaults to tolerant
fn continues_on_error(options: &Value, operation: OperationType) -> bool {
    options
        .get("continue_on_error")
        .and_then(Value::as_bool)
        .unwrap_or(operation == OperationType::BulkUpdateData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_core::Edge;

    #[test]
    fn test_continues_on_error_defaults() {
        assert!(!continues_on_error(&json!({}), OperationType::ReadData));
        assert!(continues_on_error(
            &json!({}),
            OperationType::BulkUpdateData
        ));
        assert!(continues_on_error(
            &json!({"continue_on_error": true}),
            OperationType::ReadData
        ));
        assert!(!continues_on_error(
            &json!({"continue_on_error": false}),
            OperationType::BulkUpdateData
        ));
    }

    #[test]
    fn test_resolve_options_restores_raw_fields() {
        let mut run = FlowRun::new(trellis_core::FlowId("f".to_string()));
        run.start(json!({}), Value::Null).unwrap();
        run.context.record_output("count", json!(3));

        let node = Node::operation(
            "c",
            OperationType::Condition,
            "check",
            json!({
                "expression": "{{ count > 0 }}",
                "label": "{{ count }} items",
            }),
        );

        let resolved = resolve_options(&node, &["expression"], &run);
        // The expression survives untouched for the compiler
        assert_eq!(resolved["expression"], json!("{{ count > 0 }}"));
        // Everything else resolves normally
        assert_eq!(resolved["label"], json!("3 items"));
    }

    #[tokio::test]
    async fn test_graph_validation_precedes_execution() {
        // Duplicate operation keys must be rejected before any node runs
        let graph = FlowGraph::new(
            "f",
            "Dup",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::Log, "same", json!({"message": "x"})),
                Node::operation("b", OperationType::Log, "same", json!({"message": "y"})),
            ],
            vec![Edge::new("t", "a"), Edge::new("a", "b")],
        );

        let engine = FlowEngine::new(crate::test_support::stub_services());
        let result = engine.execute(&graph, json!({}), Value::Null).await;
        assert!(matches!(
            result,
            Err(EngineError::Core(trellis_core::CoreError::ValidationError(_)))
        ));
    }
}
