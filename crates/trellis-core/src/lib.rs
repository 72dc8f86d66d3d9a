//!
//! Trellis Core - Domain model for the Trellis flow engine
//!
//! This crate defines the flow-graph model, execution context, run state
//! machine, variable resolution, and condition compilation shared by all
//! other crates in the workspace.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Flow graphs: nodes, edges, operation types, validation, reachability
pub mod graph;

/// Per-run execution context
pub mod context;

/// Flow runs and their state machine
pub mod run;

/// Variable resolution for `{{ expr }}` templates
pub mod template;

/// Condition expression compilation and evaluation
pub mod condition;

/// Error types
pub mod error;

// Re-export key types
pub use condition::{FilterOp, FilterRule};
pub use context::ExecutionContext;
pub use error::CoreError;
pub use graph::{Edge, FlowGraph, FlowId, Node, NodeId, NodeKind, OperationType};
pub use run::{FlowRun, NodeOutcome, NodeResult, RunId, RunStatus};
