//!
//! Trellis Server - HTTP surface for the Trellis flow engine
//!
//! Exposes webhook flow triggers, chat-driven action planning, flow
//! registration, and run status over axum, wired to the engine, the
//! catalog service, and in-memory stores.

#![forbid(unsafe_code)]

pub mod backends;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use routes::{router, AppState};
pub use store::{FlowStore, RunRegistry};

use std::sync::Arc;
use trellis_catalog::{CatalogService, CatalogSource, LexicalRetrieval};
use trellis_chat::ChatPlanner;
use trellis_engine::{EngineServices, FlowEngine};

/// Assemble the application state from configuration and backends
pub fn build_state(
    config: &ServerConfig,
    data: Arc<dyn trellis_engine::DataBackend>,
    workflows: Arc<dyn trellis_engine::WorkflowBackend>,
    notifier: Arc<dyn trellis_engine::Notifier>,
) -> Arc<AppState> {
    let source = match &config.catalog_url {
        Some(url) => CatalogSource::Remote {
            url: url.clone(),
            auth_token: config.catalog_auth_token.clone(),
            auth_header: config.catalog_auth_header.clone(),
        },
        None => CatalogSource::AllowList(vec![]),
    };
    let catalog = Arc::new(CatalogService::new(source));
    let retrieval = Arc::new(LexicalRetrieval::new(Arc::clone(&catalog)));

    let services = EngineServices::new(Arc::clone(&catalog), data, workflows, notifier);

    Arc::new(AppState {
        engine: Arc::new(FlowEngine::new(services)),
        flows: Arc::new(FlowStore::new()),
        runs: Arc::new(RunRegistry::new()),
        planner: Arc::new(ChatPlanner::new(catalog, retrieval)),
    })
}
