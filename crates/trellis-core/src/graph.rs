use crate::condition;
use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Value object: Flow ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowId(pub String);

/// Value object: Node ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

/// The kind of a node in a flow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry node of the flow (webhook, event, schedule, or another flow)
    Trigger,
    /// A single automation step
    Operation,
}

/// Exhaustive set of operation types forming the dispatch surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Read entities from the data backend
    ReadData,
    /// Create an entity in the data backend
    CreateData,
    /// Update an entity in the data backend
    UpdateData,
    /// Delete an entity from the data backend
    DeleteData,
    /// Emit a log message
    Log,
    /// Evaluate a comparison and gate downstream branches
    Condition,
    /// Make an arbitrary HTTP request
    HttpRequest,
    /// Shape data from prior outputs
    Transform,
    /// Send an e-mail through the notifier
    SendEmail,
    /// Pause the run for a duration
    Sleep,
    /// Send a notification through the notifier
    Notification,
    /// Run a sandboxed user script
    ExecuteCode,
    /// Update many entities, tolerating per-item failures
    BulkUpdateData,
    /// Start a named workflow on the workflow backend
    TriggerWorkflow,
    /// Start another flow
    TriggerFlow,
}

impl OperationType {
    /// The wire tag for this operation type (`read_data`, `execute_code`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            OperationType::ReadData => "read_data",
            OperationType::CreateData => "create_data",
            OperationType::UpdateData => "update_data",
            OperationType::DeleteData => "delete_data",
            OperationType::Log => "log",
            OperationType::Condition => "condition",
            OperationType::HttpRequest => "http_request",
            OperationType::Transform => "transform",
            OperationType::SendEmail => "send_email",
            OperationType::Sleep => "sleep",
            OperationType::Notification => "notification",
            OperationType::ExecuteCode => "execute_code",
            OperationType::BulkUpdateData => "bulk_update_data",
            OperationType::TriggerWorkflow => "trigger_workflow",
            OperationType::TriggerFlow => "trigger_flow",
        }
    }
}

/// A node in a flow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node ID, unique within the graph
    pub id: NodeId,

    /// Trigger or operation
    pub kind: NodeKind,

    /// Operation type; required for operation nodes
    #[serde(default)]
    pub operation_type: Option<OperationType>,

    /// Name under which this node's output is addressable by later nodes
    #[serde(default)]
    pub operation_key: String,

    /// Human-readable label shown in the editor
    #[serde(default)]
    pub label: String,

    /// Operation-type-specific options; each handler deserializes its own
    /// typed options struct from this value
    #[serde(default)]
    pub options: serde_json::Value,
}

impl Node {
    /// Create a trigger node
    pub fn trigger(id: &str) -> Self {
        Self {
            id: NodeId(id.to_string()),
            kind: NodeKind::Trigger,
            operation_type: None,
            operation_key: String::new(),
            label: String::new(),
            options: serde_json::Value::Null,
        }
    }

    /// Create an operation node
    pub fn operation(
        id: &str,
        operation_type: OperationType,
        operation_key: &str,
        options: serde_json::Value,
    ) -> Self {
        Self {
            id: NodeId(id.to_string()),
            kind: NodeKind::Operation,
            operation_type: Some(operation_type),
            operation_key: operation_key.to_string(),
            label: String::new(),
            options,
        }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Source node ID
    pub source: NodeId,
    /// Target node ID
    pub target: NodeId,
}

impl Edge {
    /// Create an edge from `source` to `target`
    pub fn new(source: &str, target: &str) -> Self {
        Self {
            source: NodeId(source.to_string()),
            target: NodeId(target.to_string()),
        }
    }
}

/// A user-authored automation graph: one trigger plus operation nodes
/// connected by edges, forming a DAG
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowGraph {
    /// ID of the flow
    pub id: FlowId,

    /// Human-readable name
    pub name: String,

    /// The nodes in this graph
    pub nodes: Vec<Node>,

    /// The edges in this graph
    pub edges: Vec<Edge>,
}

impl FlowGraph {
    /// Create a new flow graph
    pub fn new(id: &str, name: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self {
            id: FlowId(id.to_string()),
            name: name.to_string(),
            nodes,
            edges,
        }
    }

    /// Find the trigger node
    pub fn trigger(&self) -> Result<&Node, CoreError> {
        let mut triggers = self.nodes.iter().filter(|n| n.kind == NodeKind::Trigger);
        let trigger = triggers
            .next()
            .ok_or_else(|| CoreError::ValidationError("Flow has no trigger node".to_string()))?;
        if triggers.next().is_some() {
            return Err(CoreError::ValidationError(
                "Flow must have exactly one trigger node".to_string(),
            ));
        }
        Ok(trigger)
    }

    /// Look up a node by ID
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// IDs of the direct parents of a node
    pub fn parents(&self, id: &NodeId) -> Vec<&NodeId> {
        self.edges
            .iter()
            .filter(|e| &e.target == id)
            .map(|e| &e.source)
            .collect()
    }

    /// IDs of the direct children of a node
    pub fn children(&self, id: &NodeId) -> Vec<&NodeId> {
        self.edges
            .iter()
            .filter(|e| &e.source == id)
            .map(|e| &e.target)
            .collect()
    }

    /// Validate the graph: exactly one trigger, non-empty unique operation
    /// keys, every operation node reachable from the trigger, no cycles,
    /// and parseable condition expressions.
    ///
    /// These are authoring-time errors; execution never begins on a graph
    /// that fails validation.
    pub fn validate(&self) -> Result<(), CoreError> {
        let trigger = self.trigger()?;

        // Edge endpoints must exist
        let node_ids: HashSet<&NodeId> = self.nodes.iter().map(|n| &n.id).collect();
        for edge in &self.edges {
            if !node_ids.contains(&edge.source) {
                return Err(CoreError::ValidationError(format!(
                    "Edge references unknown source node: {}",
                    edge.source.0
                )));
            }
            if !node_ids.contains(&edge.target) {
                return Err(CoreError::ValidationError(format!(
                    "Edge references unknown target node: {}",
                    edge.target.0
                )));
            }
        }

        // Operation nodes need a type and a non-empty, unique key
        let mut seen_keys = HashSet::new();
        for node in self.operation_nodes() {
            if node.operation_type.is_none() {
                return Err(CoreError::ValidationError(format!(
                    "Operation node {} has no operation type",
                    node.id.0
                )));
            }
            if node.operation_key.is_empty() {
                return Err(CoreError::ValidationError(format!(
                    "Operation node {} has an empty operation key",
                    node.id.0
                )));
            }
            if !seen_keys.insert(node.operation_key.as_str()) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate operation key: {}",
                    node.operation_key
                )));
            }
        }

        // Every operation node must be reachable from the trigger
        let reachable = self.reachable_from(&trigger.id);
        for node in self.operation_nodes() {
            if !reachable.contains(&node.id) {
                return Err(CoreError::ValidationError(format!(
                    "Node {} is not reachable from the trigger",
                    node.id.0
                )));
            }
        }

        self.check_for_cycles()?;

        // Condition expressions must compile
        for node in self.operation_nodes() {
            if node.operation_type == Some(OperationType::Condition) {
                let expression = node
                    .options
                    .get("expression")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                condition::compile(expression)?;
            }
        }

        Ok(())
    }

    /// The set of node IDs reachable by walking edges backward from
    /// `target` (target→source, breadth-first). Used to restrict which
    /// operation keys are offered as variable-suggestion candidates: a
    /// node must not reference outputs of nodes that cannot have executed
    /// before it.
    pub fn upstream_of(&self, target: &NodeId) -> HashSet<NodeId> {
        let mut upstream = HashSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(target.clone());

        while let Some(id) = queue.pop_front() {
            for parent in self.parents(&id) {
                if upstream.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
        }

        upstream
    }

    /// Operation keys valid as variable references for the given node,
    /// sorted for stable suggestion ordering
    pub fn suggestion_keys(&self, target: &NodeId) -> Vec<String> {
        let upstream = self.upstream_of(target);
        let mut keys: Vec<String> = self
            .operation_nodes()
            .filter(|n| upstream.contains(&n.id))
            .map(|n| n.operation_key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Nodes in topological order, trigger first, parents before children
    pub fn topological_order(&self) -> Result<Vec<&Node>, CoreError> {
        let mut in_degree: HashMap<&NodeId, usize> =
            self.nodes.iter().map(|n| (&n.id, 0)).collect();
        for edge in &self.edges {
            if let Some(count) = in_degree.get_mut(&edge.target) {
                *count += 1;
            }
        }

        let mut queue: VecDeque<&NodeId> = self
            .nodes
            .iter()
            .filter(|n| in_degree.get(&n.id) == Some(&0))
            .map(|n| &n.id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            if let Some(node) = self.node(id) {
                order.push(node);
            }
            for child in self.children(id) {
                if let Some(count) = in_degree.get_mut(child) {
                    *count -= 1;
                    if *count == 0 {
                        queue.push_back(child);
                    }
                }
            }
        }

        if order.len() != self.nodes.len() {
            return Err(CoreError::ValidationError(
                "Cycle detected in flow graph".to_string(),
            ));
        }

        Ok(order)
    }

    fn operation_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Operation)
    }

    fn reachable_from(&self, start: &NodeId) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        reachable.insert(start.clone());
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());

        while let Some(id) = queue.pop_front() {
            for child in self.children(&id) {
                if reachable.insert(child.clone()) {
                    queue.push_back(child.clone());
                }
            }
        }

        reachable
    }

    /// Check for cycles in the edge set
    fn check_for_cycles(&self) -> Result<(), CoreError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in &self.nodes {
            if self.is_cyclic(&node.id, &mut visited, &mut rec_stack) {
                return Err(CoreError::ValidationError(format!(
                    "Cycle detected in flow graph involving node: {}",
                    node.id.0
                )));
            }
        }

        Ok(())
    }

    fn is_cyclic<'a>(
        &'a self,
        node_id: &'a NodeId,
        visited: &mut HashSet<&'a NodeId>,
        rec_stack: &mut HashSet<&'a NodeId>,
    ) -> bool {
        if !visited.contains(node_id) {
            visited.insert(node_id);
            rec_stack.insert(node_id);

            for edge in self.edges.iter().filter(|e| &e.source == node_id) {
                let child = &edge.target;
                if (!visited.contains(child) && self.is_cyclic(child, visited, rec_stack))
                    || rec_stack.contains(child)
                {
                    return true;
                }
            }
        }

        rec_stack.remove(node_id);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn linear_graph() -> FlowGraph {
        FlowGraph::new(
            "flow1",
            "Linear",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "products", json!({})),
                Node::operation("b", OperationType::Log, "log_step", json!({})),
            ],
            vec![Edge::new("t", "a"), Edge::new("a", "b")],
        )
    }

    #[test]
    fn test_validate_linear_graph() {
        assert!(linear_graph().validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_operation_key() {
        let graph = FlowGraph::new(
            "flow1",
            "Dup",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "step", json!({})),
                Node::operation("b", OperationType::Log, "step", json!({})),
            ],
            vec![Edge::new("t", "a"), Edge::new("a", "b")],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("Duplicate operation key"));
                assert!(msg.contains("step"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_empty_operation_key() {
        let graph = FlowGraph::new(
            "flow1",
            "Empty key",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "", json!({})),
            ],
            vec![Edge::new("t", "a")],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("empty operation key"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_unreachable_node() {
        let graph = FlowGraph::new(
            "flow1",
            "Orphan",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "a_key", json!({})),
                Node::operation("orphan", OperationType::Log, "orphan_key", json!({})),
            ],
            vec![Edge::new("t", "a")],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("not reachable from the trigger"));
                assert!(msg.contains("orphan"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_missing_trigger() {
        let graph = FlowGraph::new(
            "flow1",
            "No trigger",
            vec![Node::operation(
                "a",
                OperationType::ReadData,
                "a_key",
                json!({}),
            )],
            vec![],
        );

        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_validate_two_triggers() {
        let graph = FlowGraph::new(
            "flow1",
            "Two triggers",
            vec![Node::trigger("t1"), Node::trigger("t2")],
            vec![],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("exactly one trigger"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_cycle() {
        let graph = FlowGraph::new(
            "flow1",
            "Cycle",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "a_key", json!({})),
                Node::operation("b", OperationType::Log, "b_key", json!({})),
            ],
            vec![
                Edge::new("t", "a"),
                Edge::new("a", "b"),
                Edge::new("b", "a"),
            ],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("Cycle detected"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_unknown_edge_endpoint() {
        let graph = FlowGraph::new(
            "flow1",
            "Bad edge",
            vec![Node::trigger("t")],
            vec![Edge::new("t", "ghost")],
        );

        let result = graph.validate();
        match result {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("unknown target node"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_validate_malformed_condition() {
        let graph = FlowGraph::new(
            "flow1",
            "Bad condition",
            vec![
                Node::trigger("t"),
                Node::operation(
                    "c",
                    OperationType::Condition,
                    "check",
                    json!({"expression": "$last.count"}),
                ),
            ],
            vec![Edge::new("t", "c")],
        );

        assert!(graph.validate().is_err());
    }

    #[test]
    fn test_upstream_of() {
        // t -> a -> b, t -> c
        let graph = FlowGraph::new(
            "flow1",
            "Diamondish",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "a_key", json!({})),
                Node::operation("b", OperationType::Log, "b_key", json!({})),
                Node::operation("c", OperationType::Log, "c_key", json!({})),
            ],
            vec![
                Edge::new("t", "a"),
                Edge::new("a", "b"),
                Edge::new("t", "c"),
            ],
        );

        let upstream = graph.upstream_of(&NodeId("b".to_string()));
        assert!(upstream.contains(&NodeId("a".to_string())));
        assert!(upstream.contains(&NodeId("t".to_string())));
        assert!(!upstream.contains(&NodeId("c".to_string())));
        assert!(!upstream.contains(&NodeId("b".to_string())));
    }

    #[test]
    fn test_suggestion_keys_scoped_to_upstream() {
        let graph = FlowGraph::new(
            "flow1",
            "Scope",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::ReadData, "products", json!({})),
                Node::operation("b", OperationType::ExecuteCode, "script", json!({})),
                Node::operation("c", OperationType::Log, "side_log", json!({})),
            ],
            vec![
                Edge::new("t", "a"),
                Edge::new("a", "b"),
                Edge::new("t", "c"),
            ],
        );

        // b may reference a's output but not c's, and a may not reference b
        assert_eq!(
            graph.suggestion_keys(&NodeId("b".to_string())),
            vec!["products".to_string()]
        );
        assert!(graph
            .suggestion_keys(&NodeId("a".to_string()))
            .is_empty());
    }

    #[test]
    fn test_topological_order() {
        let graph = linear_graph();
        let order = graph.topological_order().unwrap();
        let ids: Vec<&str> = order.iter().map(|n| n.id.0.as_str()).collect();
        assert_eq!(ids, vec!["t", "a", "b"]);
    }

    #[test]
    fn test_topological_order_cycle() {
        let graph = FlowGraph::new(
            "flow1",
            "Cycle",
            vec![
                Node::trigger("t"),
                Node::operation("a", OperationType::Log, "a_key", json!({})),
            ],
            vec![Edge::new("a", "a"), Edge::new("t", "a")],
        );

        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn test_operation_type_tags() {
        assert_eq!(OperationType::ReadData.tag(), "read_data");
        assert_eq!(OperationType::BulkUpdateData.tag(), "bulk_update_data");

        // Wire tag round-trips through serde
        let tagged: OperationType = serde_json::from_str("\"execute_code\"").unwrap();
        assert_eq!(tagged, OperationType::ExecuteCode);
        assert_eq!(
            serde_json::to_string(&OperationType::TriggerFlow).unwrap(),
            "\"trigger_flow\""
        );
    }

    #[test]
    fn test_graph_serialization() {
        let graph = linear_graph();
        let serialized = serde_json::to_string(&graph).unwrap();
        let deserialized: FlowGraph = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.id, graph.id);
        assert_eq!(deserialized.nodes.len(), 3);
        assert_eq!(deserialized.edges.len(), 2);
    }
}
