//! Arbitrary HTTP requests from flows. The response envelope carries
//! status, headers, and the parsed body; non-2xx statuses are data, not
//! node failures, so flows can branch on them. Only transport failures
//! fail the node.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use reqwest::Method as HttpMethod;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;
use trellis_core::{ExecutionContext, OperationType};

#[derive(Debug, Deserialize)]
struct HttpRequestOptions {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    query: HashMap<String, Value>,
    #[serde(default)]
    body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// `http_request`: call an external HTTP endpoint
pub struct HttpRequestHandler;

#[async_trait]
impl OperationHandler for HttpRequestHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::HttpRequest
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: HttpRequestOptions = parse_options(options)?;

        let method = HttpMethod::from_str(&opts.method.to_uppercase())
            .map_err(|_| EngineError::InvalidOptions(format!("Invalid HTTP method: {}", opts.method)))?;

        let mut request = services.http.request(method.clone(), &opts.url);
        for (key, value) in &opts.headers {
            request = request.header(key, value);
        }
        if !opts.query.is_empty() {
            let params: Vec<(String, String)> = opts
                .query
                .iter()
                .map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), value)
                })
                .collect();
            request = request.query(&params);
        }
        if let Some(body) = &opts.body {
            if method != HttpMethod::GET && method != HttpMethod::HEAD {
                request = request.json(body);
            }
        }

        debug!(url = %opts.url, method = %method, "Making HTTP request");
        let response = request
            .send()
            .await
            .map_err(|e| EngineError::UpstreamCall(format!("HTTP request failed: {e}")))?;

        let status_code = response.status().as_u16();
        let is_success = response.status().is_success();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect();

        let text = response
            .text()
            .await
            .map_err(|e| EngineError::UpstreamCall(format!("Failed to read response: {e}")))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(json!({ "raw_body": text }));

        Ok(json!({
            "status_code": status_code,
            "is_success": is_success,
            "headers": headers,
            "body": body,
        }))
    }
}
