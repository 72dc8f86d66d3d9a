use crate::context::ExecutionContext;
use crate::graph::{FlowId, NodeId};
use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Value object: Run ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

/// Flow run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run created, trigger payload not yet bound
    Pending,
    /// Trigger payload bound, nodes executing
    Running,
    /// All nodes walked to completion
    Succeeded,
    /// A node failure halted the run
    Failed,
    /// The run was cancelled between nodes
    Cancelled,
}

/// Outcome of a single node within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeOutcome {
    /// Handler ran and produced an output
    Completed,
    /// Handler returned an error
    Failed,
    /// No active parent, or a gating condition held the branch back
    Skipped,
}

/// Per-node record kept in the run log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeResult {
    /// Node ID
    pub node_id: NodeId,
    /// Operation key of the node
    pub operation_key: String,
    /// What happened
    pub outcome: NodeOutcome,
    /// Error message when the outcome is Failed
    pub error: Option<String>,
    /// When the node finished
    pub finished_at: DateTime<Utc>,
}

/// Aggregate: a single execution of a flow graph.
///
/// State machine: `Pending -> Running -> {Succeeded | Failed | Cancelled}`.
/// Transitions out of order are errors, not silent corrections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowRun {
    /// Unique identifier
    pub id: RunId,

    /// Flow this run executes
    pub flow_id: FlowId,

    /// Current status
    pub status: RunStatus,

    /// The run's private execution context
    pub context: ExecutionContext,

    /// Per-node outcomes, in execution order
    pub node_results: Vec<NodeResult>,

    /// Error message if the run failed
    pub error: Option<String>,

    /// When the run was created
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl FlowRun {
    /// Create a pending run for the given flow
    pub fn new(flow_id: FlowId) -> Self {
        Self {
            id: RunId(Uuid::new_v4().to_string()),
            flow_id,
            status: RunStatus::Pending,
            context: ExecutionContext::default(),
            node_results: Vec::new(),
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Bind the trigger payload and move to Running
    pub fn start(&mut self, trigger: Value, input: Value) -> Result<(), CoreError> {
        if self.status != RunStatus::Pending {
            return Err(CoreError::RunStateError(format!(
                "Cannot start run in state: {:?}",
                self.status
            )));
        }
        self.context = ExecutionContext::with_input(trigger, input);
        self.status = RunStatus::Running;
        Ok(())
    }

    /// Record a completed node
    pub fn record_completed(&mut self, node_id: &NodeId, operation_key: &str, output: Value) {
        self.context.record_output(operation_key, output);
        self.node_results.push(NodeResult {
            node_id: node_id.clone(),
            operation_key: operation_key.to_string(),
            outcome: NodeOutcome::Completed,
            error: None,
            finished_at: Utc::now(),
        });
    }

    /// Record a failed node with its raw error message
    pub fn record_failed(&mut self, node_id: &NodeId, operation_key: &str, error: &str) {
        self.node_results.push(NodeResult {
            node_id: node_id.clone(),
            operation_key: operation_key.to_string(),
            outcome: NodeOutcome::Failed,
            error: Some(error.to_string()),
            finished_at: Utc::now(),
        });
    }

    /// Record a skipped node
    pub fn record_skipped(&mut self, node_id: &NodeId, operation_key: &str) {
        self.node_results.push(NodeResult {
            node_id: node_id.clone(),
            operation_key: operation_key.to_string(),
            outcome: NodeOutcome::Skipped,
            error: None,
            finished_at: Utc::now(),
        });
    }

    /// Finish the run successfully
    pub fn complete(&mut self) -> Result<(), CoreError> {
        if self.status != RunStatus::Running {
            return Err(CoreError::RunStateError(format!(
                "Cannot complete run in state: {:?}",
                self.status
            )));
        }
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Finish the run as failed
    pub fn fail(&mut self, error: String) -> Result<(), CoreError> {
        if self.status == RunStatus::Succeeded || self.status == RunStatus::Failed {
            return Err(CoreError::RunStateError(format!(
                "Cannot fail run in state: {:?}",
                self.status
            )));
        }
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Finish the run as cancelled
    pub fn cancel(&mut self) -> Result<(), CoreError> {
        if self.status != RunStatus::Pending && self.status != RunStatus::Running {
            return Err(CoreError::RunStateError(format!(
                "Cannot cancel run in state: {:?}",
                self.status
            )));
        }
        self.status = RunStatus::Cancelled;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Whether any node in this run failed
    pub fn has_failures(&self) -> bool {
        self.node_results
            .iter()
            .any(|r| r.outcome == NodeOutcome::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn running_run() -> FlowRun {
        let mut run = FlowRun::new(FlowId("flow1".to_string()));
        run.start(json!({"order_id": "o_1"}), Value::Null).unwrap();
        run
    }

    #[test]
    fn test_run_lifecycle() {
        let mut run = FlowRun::new(FlowId("flow1".to_string()));
        assert_eq!(run.status, RunStatus::Pending);
        assert!(!run.id.0.is_empty());

        run.start(json!({"a": 1}), Value::Null).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.context.trigger, json!({"a": 1}));

        run.complete().unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut run = running_run();
        let result = run.start(json!({}), Value::Null);
        match result {
            Err(CoreError::RunStateError(msg)) => {
                assert!(msg.contains("Cannot start run in state"));
            }
            _ => panic!("Expected RunStateError"),
        }
    }

    #[test]
    fn test_complete_requires_running() {
        let mut run = FlowRun::new(FlowId("flow1".to_string()));
        assert!(run.complete().is_err());
    }

    #[test]
    fn test_fail_records_error() {
        let mut run = running_run();
        run.fail("backend unavailable".to_string()).unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("backend unavailable"));

        // Terminal states do not transition again
        assert!(run.fail("again".to_string()).is_err());
    }

    #[test]
    fn test_cancel_from_running() {
        let mut run = running_run();
        run.cancel().unwrap();
        assert_eq!(run.status, RunStatus::Cancelled);

        let mut done = running_run();
        done.complete().unwrap();
        assert!(done.cancel().is_err());
    }

    #[test]
    fn test_node_result_log() {
        let mut run = running_run();
        run.record_completed(&NodeId("a".to_string()), "products", json!([1, 2]));
        run.record_failed(&NodeId("b".to_string()), "mailer", "smtp refused");
        run.record_skipped(&NodeId("c".to_string()), "after_mailer");

        assert_eq!(run.node_results.len(), 3);
        assert_eq!(run.node_results[0].outcome, NodeOutcome::Completed);
        assert_eq!(run.node_results[1].outcome, NodeOutcome::Failed);
        assert_eq!(run.node_results[1].error.as_deref(), Some("smtp refused"));
        assert_eq!(run.node_results[2].outcome, NodeOutcome::Skipped);
        assert!(run.has_failures());

        // Completed output is threaded into the context
        assert_eq!(run.context.last, json!([1, 2]));
        assert_eq!(run.context.outputs.get("products").unwrap(), &json!([1, 2]));
    }
}
