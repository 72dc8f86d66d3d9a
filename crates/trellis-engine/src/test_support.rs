//! Stub backends for tests and examples. These record what the engine
//! dispatched and answer with canned values, so orchestrator behavior
//! can be asserted without a live commerce framework.

use crate::backend::{DataBackend, Notifier, WorkflowBackend};
use crate::handlers::EngineServices;
use crate::EngineError;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use trellis_catalog::{CatalogService, CatalogSource, PlannedRequest};

/// Data backend that records requests and serves canned responses keyed
/// by `"METHOD /path"`
#[derive(Default)]
pub struct StubDataBackend {
    /// Requests the engine dispatched, in order
    pub requests: Mutex<Vec<PlannedRequest>>,
    /// Canned responses; unknown keys answer `{}`
    pub responses: Mutex<HashMap<String, Value>>,
    /// Keys that should fail with an upstream error
    pub failures: Mutex<Vec<String>>,
}

impl StubDataBackend {
    /// Empty stub
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `value` for `"METHOD /path"` requests
    pub fn respond(&self, key: &str, value: Value) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(key.to_string(), value);
        }
    }

    /// Fail `"METHOD /path"` requests with an upstream error
    pub fn fail_on(&self, key: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(key.to_string());
        }
    }

    /// Keys of all recorded requests, in dispatch order
    pub fn request_keys(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|reqs| {
                reqs.iter()
                    .map(|r| format!("{} {}", r.method, r.path))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl DataBackend for StubDataBackend {
    async fn execute(&self, request: &PlannedRequest) -> Result<Value, EngineError> {
        let key = format!("{} {}", request.method, request.path);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let failing = self
            .failures
            .lock()
            .map(|f| f.contains(&key))
            .unwrap_or(false);
        if failing {
            return Err(EngineError::UpstreamCall(format!("stubbed failure for {key}")));
        }
        Ok(self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(&key).cloned())
            .unwrap_or_else(|| json!({})))
    }
}

/// Workflow backend that records trigger calls
#[derive(Default)]
pub struct StubWorkflowBackend {
    /// `(name-or-id, input, wait)` tuples in call order
    pub calls: Mutex<Vec<(String, Value, bool)>>,
}

#[async_trait]
impl WorkflowBackend for StubWorkflowBackend {
    async fn trigger_workflow(
        &self,
        name: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((name.to_string(), input, wait));
        }
        Ok(json!({"workflow": name, "status": if wait { "completed" } else { "started" }}))
    }

    async fn trigger_flow(
        &self,
        flow_id: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((flow_id.to_string(), input, wait));
        }
        Ok(json!({"flow_id": flow_id, "status": if wait { "completed" } else { "started" }}))
    }
}

/// Notifier that records deliveries
#[derive(Default)]
pub struct StubNotifier {
    /// `(channel-or-address, title-or-subject, message-or-body)`
    pub sent: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn notify(
        &self,
        channel: &str,
        title: &str,
        message: &str,
    ) -> Result<Value, EngineError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((channel.to_string(), title.to_string(), message.to_string()));
        }
        Ok(json!({"delivered": true}))
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<Value, EngineError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((to.to_string(), subject.to_string(), body.to_string()));
        }
        Ok(json!({"delivered": true}))
    }
}

/// Services over stub backends and an empty (permissive) catalog
pub fn stub_services() -> EngineServices {
    stub_services_with(Arc::new(StubDataBackend::new()), CatalogSource::AllowList(vec![]))
}

/// Services over a given data backend and catalog source
pub fn stub_services_with(
    data: Arc<StubDataBackend>,
    source: CatalogSource,
) -> EngineServices {
    EngineServices::new(
        Arc::new(CatalogService::new(source)),
        data,
        Arc::new(StubWorkflowBackend::default()),
        Arc::new(StubNotifier::default()),
    )
}
