//!
//! Trellis Engine - flow execution for the Trellis platform
//!
//! Interprets validated flow graphs: topological node walking, template
//! resolution, per-operation handlers, condition gating, sandboxed code
//! steps, and delegation to the commerce framework's backends.

#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod sandbox;
pub mod test_support;

pub use backend::{DataBackend, Notifier, WorkflowBackend};
pub use error::EngineError;
pub use handlers::{EngineServices, HandlerRegistry, OperationHandler};
pub use orchestrator::{FlowEngine, StartedRun};
pub use sandbox::{CodeOutcome, CodeRunner, PackageRegistry, DEFAULT_TIMEOUT};
