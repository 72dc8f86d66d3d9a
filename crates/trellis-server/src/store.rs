//! In-memory stores backing the HTTP surface: registered flows and the
//! status of their runs.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use trellis_core::{FlowGraph, FlowRun, RunStatus};

/// Registered flows, keyed by flow id
#[derive(Default)]
pub struct FlowStore {
    flows: DashMap<String, FlowGraph>,
}

impl FlowStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a flow under its id
    pub fn insert(&self, graph: FlowGraph) {
        self.flows.insert(graph.id.0.clone(), graph);
    }

    /// Fetch a flow by id
    pub fn get(&self, flow_id: &str) -> Option<FlowGraph> {
        self.flows.get(flow_id).map(|entry| entry.clone())
    }

    /// Ids of all registered flows
    pub fn ids(&self) -> Vec<String> {
        self.flows.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Snapshot of a run's progress, kept after the run object is gone
#[derive(Debug, Clone, Serialize)]
pub struct RunRecord {
    /// Run id
    pub run_id: String,
    /// Flow id
    pub flow_id: String,
    /// Last observed status
    pub status: RunStatus,
    /// Error message for failed runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

/// Run status registry, keyed by run id
#[derive(Default)]
pub struct RunRegistry {
    runs: DashMap<String, RunRecord>,
}

impl RunRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly accepted run
    pub fn accepted(&self, run_id: &str, flow_id: &str) {
        self.runs.insert(
            run_id.to_string(),
            RunRecord {
                run_id: run_id.to_string(),
                flow_id: flow_id.to_string(),
                status: RunStatus::Pending,
                error: None,
                updated_at: Utc::now(),
            },
        );
    }

    /// Record a finished run
    pub fn finished(&self, run: &FlowRun) {
        self.runs.insert(
            run.id.0.clone(),
            RunRecord {
                run_id: run.id.0.clone(),
                flow_id: run.flow_id.0.clone(),
                status: run.status,
                error: run.error.clone(),
                updated_at: Utc::now(),
            },
        );
    }

    /// Record a run that never produced a FlowRun (validation failure)
    pub fn errored(&self, run_id: &str, flow_id: &str, error: &str) {
        self.runs.insert(
            run_id.to_string(),
            RunRecord {
                run_id: run_id.to_string(),
                flow_id: flow_id.to_string(),
                status: RunStatus::Failed,
                error: Some(error.to_string()),
                updated_at: Utc::now(),
            },
        );
    }

    /// Fetch a run record
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|entry| entry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::{FlowId, Node};

    #[test]
    fn test_flow_store_roundtrip() {
        let store = FlowStore::new();
        let graph = FlowGraph::new("flow_1", "Test", vec![Node::trigger("t")], vec![]);
        store.insert(graph);

        assert!(store.get("flow_1").is_some());
        assert!(store.get("ghost").is_none());
        assert_eq!(store.ids(), vec!["flow_1".to_string()]);
    }

    #[test]
    fn test_run_registry_lifecycle() {
        let registry = RunRegistry::new();
        registry.accepted("run_1", "flow_1");
        assert_eq!(registry.get("run_1").unwrap().status, RunStatus::Pending);

        let mut run = FlowRun::new(FlowId("flow_1".to_string()));
        run.start(serde_json::json!({}), serde_json::Value::Null)
            .unwrap();
        run.complete().unwrap();
        // Simulate the registry observing the finished run under its id
        registry.accepted(&run.id.0, "flow_1");
        registry.finished(&run);
        assert_eq!(
            registry.get(&run.id.0).unwrap().status,
            RunStatus::Succeeded
        );
    }
}
