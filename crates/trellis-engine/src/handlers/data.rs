//! Data operations: catalog-validated requests against the commerce
//! framework's data backend. The engine validates the entity's
//! collection path against the catalog and hands a planned request to
//! the backend; an empty catalog passes requests through unvalidated.

use super::{parse_options, EngineServices, OperationHandler};
use crate::error::EngineError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::warn;
use trellis_catalog::{list_path, Method, PlannedRequest};
use trellis_core::{ExecutionContext, OperationType};

/// Validate an entity's collection path against the live catalog.
/// Returns the normalized path, or `InvalidEndpoint` with suggestions.
async fn validated_collection_path(
    services: &EngineServices,
    method: Method,
    entity: &str,
) -> Result<String, EngineError> {
    let path = list_path(entity);
    let index = services.catalog.index().await;

    if index.is_empty() {
        // Catalog unreachable: cannot validate, pass through
        warn!(%path, "Catalog index empty; skipping endpoint validation");
        return Ok(path);
    }

    index
        .resolve(method, &path)
        .ok_or_else(|| EngineError::InvalidEndpoint {
            method: method.to_string(),
            path: path.clone(),
            suggestions: index
                .suggestions(method, &path, 5)
                .into_iter()
                .map(|e| e.key())
                .collect(),
        })
}

#[derive(Debug, Deserialize)]
struct ReadDataOptions {
    entity: String,
    #[serde(default)]
    fields: Option<Vec<String>>,
    #[serde(default)]
    filters: Option<Value>,
    #[serde(default)]
    limit: Option<u64>,
}

/// `read_data`: list/read entities
pub struct ReadDataHandler;

#[async_trait]
impl OperationHandler for ReadDataHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::ReadData
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: ReadDataOptions = parse_options(options)?;
        let path = validated_collection_path(services, Method::Get, &opts.entity).await?;

        let mut body = Map::new();
        if let Some(limit) = opts.limit {
            body.insert("limit".to_string(), json!(limit));
        }
        if let Some(fields) = &opts.fields {
            body.insert("fields".to_string(), json!(fields));
        }
        if let Some(filters) = &opts.filters {
            body.insert("filters".to_string(), filters.clone());
        }

        let request = PlannedRequest::new(
            Method::Get,
            &path,
            (!body.is_empty()).then_some(Value::Object(body)),
        );
        services.data.execute(&request).await
    }
}

#[derive(Debug, Deserialize)]
struct CreateDataOptions {
    entity: String,
    data: Value,
}

/// `create_data`: create one entity
pub struct CreateDataHandler;

#[async_trait]
impl OperationHandler for CreateDataHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::CreateData
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: CreateDataOptions = parse_options(options)?;
        let path = validated_collection_path(services, Method::Post, &opts.entity).await?;
        let request = PlannedRequest::new(Method::Post, &path, Some(opts.data));
        services.data.execute(&request).await
    }
}

#[derive(Debug, Deserialize)]
struct UpdateDataOptions {
    entity: String,
    #[serde(default)]
    id: Option<String>,
    data: Value,
}

/// `update_data`: update one entity by id
pub struct UpdateDataHandler;

#[async_trait]
impl OperationHandler for UpdateDataHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::UpdateData
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: UpdateDataOptions = parse_options(options)?;
        let collection = validated_collection_path(services, Method::Post, &opts.entity).await?;
        let path = match &opts.id {
            Some(id) => format!("{collection}/{id}"),
            None => collection,
        };
        let request = PlannedRequest::new(Method::Post, &path, Some(opts.data));
        services.data.execute(&request).await
    }
}

#[derive(Debug, Deserialize)]
struct DeleteDataOptions {
    entity: String,
    #[serde(default)]
    id: Option<String>,
}

/// `delete_data`: delete one entity by id
pub struct DeleteDataHandler;

#[async_trait]
impl OperationHandler for DeleteDataHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::DeleteData
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: DeleteDataOptions = parse_options(options)?;
        let collection =
            validated_collection_path(services, Method::Delete, &opts.entity).await?;
        let path = match &opts.id {
            Some(id) => format!("{collection}/{id}"),
            None => collection,
        };
        let request = PlannedRequest::new(Method::Delete, &path, None);
        services.data.execute(&request).await
    }
}

#[derive(Debug, Deserialize)]
struct BulkUpdateOptions {
    entity: String,
    #[serde(default)]
    items: Vec<BulkItem>,
    #[serde(default = "default_true")]
    continue_on_error: bool,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    id: String,
    data: Value,
}

fn default_true() -> bool {
    true
}

/// `bulk_update_data`: update many entities, tolerating per-item
/// failures by default
pub struct BulkUpdateDataHandler;

#[async_trait]
impl OperationHandler for BulkUpdateDataHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::BulkUpdateData
    }

    async fn execute(
        &self,
        options: &Value,
        _ctx: &ExecutionContext,
        services: &EngineServices,
    ) -> Result<Value, EngineError> {
        let opts: BulkUpdateOptions = parse_options(options)?;
        let collection = validated_collection_path(services, Method::Post, &opts.entity).await?;

        let mut updated = 0u64;
        let mut failed = 0u64;
        let mut results = Vec::with_capacity(opts.items.len());

        for item in &opts.items {
            let request = PlannedRequest::new(
                Method::Post,
                &format!("{collection}/{}", item.id),
                Some(item.data.clone()),
            );
            match services.data.execute(&request).await {
                Ok(value) => {
                    updated += 1;
                    results.push(json!({"id": item.id, "ok": true, "result": value}));
                }
                Err(e) => {
                    failed += 1;
                    warn!(id = %item.id, "Bulk update item failed: {e}");
                    results.push(json!({"id": item.id, "ok": false, "error": e.to_string()}));
                    if !opts.continue_on_error {
                        return Err(e);
                    }
                }
            }
        }

        Ok(json!({
            "updated": updated,
            "failed": failed,
            "results": results,
        }))
    }
}
