//! Wire types for the chat planning entry point.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use trellis_catalog::PlannedRequest;

/// A chat planning request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message
    pub message: String,
    /// Conversation thread, echoed back
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Resource under discussion, echoed back
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Extra context: a `body` for the planned request, or an
    /// `executed_response` from a prior call to summarize
    #[serde(default)]
    pub context: Option<Value>,
}

impl ChatRequest {
    /// A bare message with no context
    pub fn message(text: &str) -> Self {
        Self {
            message: text.to_string(),
            thread_id: None,
            resource_id: None,
            context: None,
        }
    }
}

/// One planned tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name (`admin_api_request`)
    pub name: String,
    /// Tool arguments: the planned request
    pub arguments: Value,
}

/// Non-success planning statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// The candidate endpoint failed catalog validation even after
    /// alias and retrieval correction
    InvalidEndpoint,
}

/// The planner's reply
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Human-readable reply; the canonical plan summary when a plan
    /// exists
    pub reply: String,
    /// Planned (never executed) tool calls
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Prerequisite suggestions from the dependency planner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activations: Vec<PlannedRequest>,
    /// Set when planning failed in a structured way
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
    /// Ranked endpoint suggestions accompanying `invalid_endpoint`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Echoed thread id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
    /// Echoed resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ChatResponse {
    /// Empty response echoing the request's thread and resource ids
    pub fn for_request(request: &ChatRequest) -> Self {
        Self {
            reply: String::new(),
            tool_calls: Vec::new(),
            activations: Vec::new(),
            status: None,
            suggestions: Vec::new(),
            thread_id: request.thread_id.clone(),
            resource_id: request.resource_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_camel_case_wire_form() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message": "hi", "threadId": "t_1", "resourceId": "r_1"}"#,
        )
        .unwrap();
        assert_eq!(request.thread_id.as_deref(), Some("t_1"));
        assert_eq!(request.resource_id.as_deref(), Some("r_1"));
    }

    #[test]
    fn test_response_omits_empty_fields() {
        let response = ChatResponse::for_request(&ChatRequest::message("hi"));
        let wire = serde_json::to_value(&response).unwrap();
        assert!(wire.get("toolCalls").is_none());
        assert!(wire.get("activations").is_none());
        assert!(wire.get("status").is_none());
        assert!(wire.get("threadId").is_none());
    }
}
