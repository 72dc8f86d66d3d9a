//! HTTP routes: the webhook trigger URL shape
//! (`POST /webhooks/flows/{flow_id}`), the chat planning entry point,
//! flow registration, and run status.

use crate::error::ServerError;
use crate::store::{FlowStore, RunRegistry};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use trellis_chat::{ChatPlanner, ChatRequest, ChatResponse};
use trellis_core::FlowGraph;
use trellis_engine::FlowEngine;

/// Shared application state
pub struct AppState {
    /// The flow engine
    pub engine: Arc<FlowEngine>,
    /// Registered flows
    pub flows: Arc<FlowStore>,
    /// Run status registry
    pub runs: Arc<RunRegistry>,
    /// Chat action planner
    pub planner: Arc<ChatPlanner>,
}

/// Build the router over the given state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/flows", post(register_flow))
        .route("/flows/:flow_id/runs/:run_id", get(run_status))
        .route("/webhooks/flows/:flow_id", post(trigger_flow))
        .route("/chat", post(chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn register_flow(
    State(state): State<Arc<AppState>>,
    Json(graph): Json<FlowGraph>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    graph.validate()?;
    let flow_id = graph.id.0.clone();
    state.flows.insert(graph);
    info!(%flow_id, "Registered flow");
    Ok((StatusCode::CREATED, Json(json!({"flow_id": flow_id}))))
}

/// Webhook trigger: `POST {origin}/webhooks/flows/{flow_id}` starts a
/// run with the request body as the trigger payload and acknowledges
/// with 202 before the run finishes.
async fn trigger_flow(
    State(state): State<Arc<AppState>>,
    Path(flow_id): Path<String>,
    body: Option<Json<Value>>,
) -> Result<(StatusCode, Json<Value>), ServerError> {
    let graph = state
        .flows
        .get(&flow_id)
        .ok_or_else(|| ServerError::NotFound(format!("Flow {flow_id}")))?;

    let trigger = body.map(|Json(v)| v).unwrap_or(Value::Null);
    let started = Arc::clone(&state.engine).start(graph, trigger, Value::Null);
    let run_id = started.run_id.0.clone();
    state.runs.accepted(&run_id, &flow_id);
    info!(%flow_id, %run_id, "Webhook accepted");

    // Observe the run's outcome without blocking the response
    let runs = Arc::clone(&state.runs);
    let record_run_id = run_id.clone();
    let record_flow_id = flow_id.clone();
    tokio::spawn(async move {
        match started.handle.await {
            Ok(Ok(run)) => runs.finished(&run),
            Ok(Err(e)) => {
                error!(run = %record_run_id, "Run failed to start: {e}");
                runs.errored(&record_run_id, &record_flow_id, &e.to_string());
            }
            Err(e) => {
                error!(run = %record_run_id, "Run task panicked: {e}");
                runs.errored(&record_run_id, &record_flow_id, &e.to_string());
            }
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({"run_id": run_id}))))
}

async fn run_status(
    State(state): State<Arc<AppState>>,
    Path((_flow_id, run_id)): Path<(String, String)>,
) -> Result<Json<Value>, ServerError> {
    let record = state
        .runs
        .get(&run_id)
        .ok_or_else(|| ServerError::NotFound(format!("Run {run_id}")))?;
    Ok(Json(serde_json::to_value(record).map_err(|e| {
        ServerError::InternalError(e.to_string())
    })?))
}

async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    Json(state.planner.plan(request).await)
}
