//!
//! Trellis Chat - natural-language API action planning
//!
//! Turns chat messages into validated, never-executed planned requests
//! against the endpoint catalog, with dependency hints and ranked
//! suggestions when resolution fails.

#![forbid(unsafe_code)]

pub mod planner;
pub mod types;

pub use planner::{ChatPlanner, TOOL_NAME};
pub use types::{ChatRequest, ChatResponse, PlanStatus, ToolCall};
