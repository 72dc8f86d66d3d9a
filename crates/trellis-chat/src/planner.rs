//! Maps natural-language messages to planned API actions.
//!
//! The planner never executes anything: it produces a validated,
//! corrected [`PlannedRequest`] as a tool call plus a canonical summary
//! of what would run. When a concrete plan exists, that summary *is* the
//! reply, so free-text narrative never gets to claim an action happened.

use crate::types::{ChatRequest, ChatResponse, PlanStatus, ToolCall};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use trellis_catalog::{
    plan_prerequisites, CatalogService, Method, PlanHints, PlannedRequest, RetrievalSearch,
};

/// Tool name under which planned requests are surfaced
pub const TOOL_NAME: &str = "admin_api_request";

static EXPLICIT_ACTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(GET|POST|PUT|PATCH|DELETE)\s+(/\S+)").expect("explicit action pattern")
});

static GREETING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(hi|hiya|hello|hey|yo|howdy|thanks|thank you|good\s+(morning|afternoon|evening))[\s!.,?]*$")
        .expect("greeting pattern")
});

static ACTION_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(create|add|make|new|update|change|set|edit|publish|delete|remove|cancel|refund|list|show|get|fetch|find|search|ship|fulfill)\b")
        .expect("action verb pattern")
});

static WRITE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(create|add|make|new)\b").expect("write verb pattern")
});

static UPDATE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(update|change|set|edit|publish|ship|fulfill)\b").expect("update verb pattern")
});

static DELETE_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(delete|remove|cancel)\b").expect("delete verb pattern")
});

/// Plans API actions from chat messages
pub struct ChatPlanner {
    catalog: Arc<CatalogService>,
    retrieval: Arc<dyn RetrievalSearch>,
}

impl ChatPlanner {
    /// Planner over a catalog and a retrieval fallback
    pub fn new(catalog: Arc<CatalogService>, retrieval: Arc<dyn RetrievalSearch>) -> Self {
        Self { catalog, retrieval }
    }

    /// Plan a response for one message. Never executes the plan.
    pub async fn plan(&self, request: ChatRequest) -> ChatResponse {
        let message = request.message.trim();
        let mut response = ChatResponse::for_request(&request);

        // Small talk never produces a planned request
        if is_greeting(message) {
            response.reply =
                "Hello! Tell me what you would like to do, for example \"list products\" or \"GET /admin/orders\".".to_string();
            return response;
        }

        let candidate = match explicit_action(message) {
            Some(candidate) => Some(candidate),
            None if is_actionable(message) => self.infer_action(message).await,
            None => None,
        };

        let Some((method, path)) = candidate else {
            response.reply =
                "I could not map that to an API action. Try naming the thing to act on, or give an explicit `METHOD /path`.".to_string();
            return response;
        };

        // Correction: normalize, alias lookup, then retrieval fallback
        let index = self.catalog.index().await;
        let resolved = if index.is_empty() {
            // Catalog unreachable: pass the candidate through unvalidated
            Some(trellis_catalog::normalize_path(&path))
        } else if let Some(resolved) = index.resolve(method, &path) {
            Some(resolved)
        } else {
            self.retrieval
                .search_method(method, &path.replace(['/', '-', '_'], " "))
                .await
                .map(|e| e.path)
        };

        let Some(resolved_path) = resolved else {
            let suggestions: Vec<String> = index
                .suggestions(method, &path, 5)
                .into_iter()
                .map(|e| e.key())
                .collect();
            response.status = Some(PlanStatus::InvalidEndpoint);
            response.reply = if suggestions.is_empty() {
                format!("`{method} {path}` is not in the API catalog, and I have no close matches.")
            } else {
                format!(
                    "`{method} {path}` is not in the API catalog. Closest matches: {}.",
                    suggestions.join(", ")
                )
            };
            response.suggestions = suggestions;
            return response;
        };

        debug!(%method, path = %resolved_path, "Planned chat action");

        let body = request
            .context
            .as_ref()
            .and_then(|c| c.get("body"))
            .cloned();
        let hints = plan_prerequisites(method, &resolved_path, body.as_ref(), &index);
        let planned = PlannedRequest::new(method, &resolved_path, body);

        response.reply = summarize(&planned, &hints, request.context.as_ref());
        response.tool_calls.push(ToolCall {
            name: TOOL_NAME.to_string(),
            arguments: serde_json::to_value(&planned).unwrap_or_else(|_| json!({})),
        });
        response.activations = hints.next;
        response
    }

    /// Infer method and path from intent plus retrieval ranking
    async fn infer_action(&self, message: &str) -> Option<(Method, String)> {
        let method = infer_method(message);
        if let Some(endpoint) = self.retrieval.search_method(method, message).await {
            return Some((method, endpoint.path));
        }
        // Fall back to the best match of any method
        self.retrieval
            .search(message, 1)
            .await
            .into_iter()
            .next()
            .map(|s| (s.endpoint.method, s.endpoint.path))
    }
}

fn is_greeting(message: &str) -> bool {
    GREETING.is_match(message)
}

/// Actionable: contains an action verb, is longer than two tokens, and
/// is not small talk
fn is_actionable(message: &str) -> bool {
    message.split_whitespace().count() > 2
        && ACTION_VERB.is_match(message)
        && !is_greeting(message)
}

fn explicit_action(message: &str) -> Option<(Method, String)> {
    let captures = EXPLICIT_ACTION.captures(message)?;
    let method = Method::from_str(&captures[1]).ok()?;
    Some((method, captures[2].to_string()))
}

fn infer_method(message: &str) -> Method {
    if WRITE_VERB.is_match(message) {
        Method::Post
    } else if DELETE_VERB.is_match(message) {
        Method::Delete
    } else if UPDATE_VERB.is_match(message) {
        Method::Post
    } else {
        Method::Get
    }
}

/// Canonical plan summary. Always preferred over narrative, so the
/// reply can never claim the action already ran.
fn summarize(planned: &PlannedRequest, hints: &PlanHints, context: Option<&Value>) -> String {
    let mut reply = format!("Planned request: {} {}", planned.method, planned.path);

    if let Some(body) = &planned.body {
        reply.push_str(&format!(
            " with body {}",
            serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string())
        ));
    }
    reply.push_str(". Review and run it when ready.");

    if !hints.next.is_empty() {
        let prereqs: Vec<String> = hints
            .next
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        reply.push_str(&format!(
            " Suggested prerequisite lookups: {}.",
            prereqs.join(", ")
        ));
    }

    if let Some(executed) = context.and_then(|c| c.get("executed_response")) {
        reply.push_str(&format!(" {}", summarize_executed(executed)));
    }

    reply
}

fn summarize_executed(value: &Value) -> String {
    match value {
        Value::Array(items) => format!("The previous call returned {} records.", items.len()),
        Value::Object(map) => match map.get("id").and_then(Value::as_str) {
            Some(id) => format!("The previous call returned record `{id}`."),
            None => format!("The previous call returned an object with {} fields.", map.len()),
        },
        other => format!("The previous call returned: {other}."),
    }
}
