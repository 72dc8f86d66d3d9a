//! Default backend implementations for the standalone server binary.
//!
//! The commerce framework behind the engine is external; these adapters
//! either forward requests to it over HTTP or, when no upstream is
//! configured, log what would have run and echo the plan (dry-run).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;
use trellis_catalog::PlannedRequest;
use trellis_engine::{DataBackend, EngineError, Notifier, WorkflowBackend};

/// Forwards planned data requests to the framework's HTTP API
pub struct HttpDataBackend {
    client: reqwest::Client,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpDataBackend {
    /// Backend forwarding to `base_url` with an optional Authorization
    /// header
    pub fn new(base_url: &str, auth_header: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        }
    }
}

#[async_trait]
impl DataBackend for HttpDataBackend {
    async fn execute(&self, request: &PlannedRequest) -> Result<Value, EngineError> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = reqwest::Method::from_bytes(request.method.to_string().as_bytes())
            .map_err(|e| EngineError::UpstreamCall(e.to_string()))?;

        let mut http_request = self.client.request(method, &url);
        if let Some(header) = &self.auth_header {
            http_request = http_request.header(reqwest::header::AUTHORIZATION, header);
        }
        if let Some(body) = &request.body {
            http_request = http_request.json(body);
        }

        let response = http_request.send().await?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(EngineError::UpstreamCall(format!(
                "{} {} returned {status}",
                request.method, request.path
            )));
        }
        Ok(body)
    }
}

/// Dry-run data backend: logs the request and echoes the plan
#[derive(Default)]
pub struct DryRunDataBackend;

#[async_trait]
impl DataBackend for DryRunDataBackend {
    async fn execute(&self, request: &PlannedRequest) -> Result<Value, EngineError> {
        info!(method = %request.method, path = %request.path, "Dry-run data request");
        Ok(json!({"dry_run": true, "planned": request}))
    }
}

/// Workflow backend that only records intent
#[derive(Default)]
pub struct DryRunWorkflowBackend;

#[async_trait]
impl WorkflowBackend for DryRunWorkflowBackend {
    async fn trigger_workflow(
        &self,
        name: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError> {
        info!(workflow = %name, wait, "Dry-run workflow trigger");
        Ok(json!({"dry_run": true, "workflow": name, "input": input}))
    }

    async fn trigger_flow(
        &self,
        flow_id: &str,
        input: Value,
        wait: bool,
    ) -> Result<Value, EngineError> {
        info!(flow = %flow_id, wait, "Dry-run flow trigger");
        Ok(json!({"dry_run": true, "flow_id": flow_id, "input": input}))
    }
}

/// Notifier that logs deliveries instead of sending them
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        channel: &str,
        title: &str,
        message: &str,
    ) -> Result<Value, EngineError> {
        info!(%channel, %title, %message, "Notification");
        Ok(json!({"delivered": true}))
    }

    async fn send_email(&self, to: &str, subject: &str, _body: &str) -> Result<Value, EngineError> {
        info!(%to, %subject, "E-mail");
        Ok(json!({"delivered": true}))
    }
}
