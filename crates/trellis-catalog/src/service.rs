//! Catalog fetching and the TTL-cached index.
//!
//! The cache is rebuilt whole on expiry (fetch-and-replace, last writer
//! wins), never patched incrementally. The clock is injected so TTL
//! behavior is testable without sleeping.

use crate::endpoint::{Endpoint, Method};
use crate::error::CatalogError;
use crate::index::CatalogIndex;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Default catalog cache TTL: five minutes
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Time source for TTL decisions
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where the set of allowed operations comes from
#[derive(Debug, Clone)]
pub enum CatalogSource {
    /// A fixed allow-list, no fetching
    AllowList(Vec<Endpoint>),
    /// A remote catalog endpoint returning either a flat endpoint array
    /// or an OpenAPI-style `paths` document
    Remote {
        /// Catalog URL
        url: String,
        /// Token used to build a Basic-auth Authorization header
        auth_token: Option<String>,
        /// Verbatim Authorization header value, overriding the token
        auth_header: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct FlatCatalog {
    endpoints: Vec<FlatEndpoint>,
}

#[derive(Debug, Deserialize)]
struct FlatEndpoint {
    method: String,
    path: String,
}

struct CachedIndex {
    index: Arc<CatalogIndex>,
    built_at: DateTime<Utc>,
}

/// Shared, read-mostly catalog service with a TTL-based cache
pub struct CatalogService {
    source: CatalogSource,
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: RwLock<Option<CachedIndex>>,
}

impl CatalogService {
    /// Create a service over the given source with the default TTL
    pub fn new(source: CatalogSource) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), DEFAULT_TTL)
    }

    /// Create a service with an explicit clock and TTL
    pub fn with_clock(source: CatalogSource, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            source,
            client,
            clock,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// The current index, rebuilding it when the cache is missing or its
    /// TTL has lapsed. On fetch failure this returns an empty index;
    /// validation degrades to permissive pass-through rather than
    /// blocking all automation.
    pub async fn index(&self) -> Arc<CatalogIndex> {
        let now = self.clock.now();

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if !self.expired(cached.built_at, now) {
                    return Arc::clone(&cached.index);
                }
            }
        }

        let index = match self.fetch().await {
            Ok(endpoints) => {
                let index = CatalogIndex::from_endpoints(endpoints);
                debug!(size = index.size(), "Rebuilt catalog index");
                Arc::new(index)
            }
            Err(e) => {
                warn!("Catalog fetch failed, degrading to permissive empty index: {e}");
                Arc::new(CatalogIndex::default())
            }
        };

        let mut cache = self.cache.write().await;
        *cache = Some(CachedIndex {
            index: Arc::clone(&index),
            built_at: self.clock.now(),
        });

        index
    }

    /// Drop the cached index so the next call rebuilds
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    fn expired(&self, built_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or_else(|_| ChronoDuration::seconds(300));
        now - built_at > ttl
    }

    async fn fetch(&self) -> Result<Vec<Endpoint>, CatalogError> {
        match &self.source {
            CatalogSource::AllowList(endpoints) => Ok(endpoints.clone()),
            CatalogSource::Remote {
                url,
                auth_token,
                auth_header,
            } => {
                let mut request = self.client.get(url);
                if let Some(header) = auth_header {
                    request = request.header(reqwest::header::AUTHORIZATION, header.clone());
                } else if let Some(token) = auth_token {
                    let encoded = base64::encode(format!("{token}:"));
                    request = request
                        .header(reqwest::header::AUTHORIZATION, format!("Basic {encoded}"));
                }

                let response = request.send().await?;
                if !response.status().is_success() {
                    return Err(CatalogError::Unavailable(format!(
                        "Catalog endpoint returned {}",
                        response.status()
                    )));
                }

                let document: Value = response.json().await?;
                parse_catalog_document(&document)
            }
        }
    }
}

/// Parse a catalog document in either supported shape: a flat
/// `{ endpoints: [...] }` array or an OpenAPI-style `{ paths: {...} }`
/// object
pub fn parse_catalog_document(document: &Value) -> Result<Vec<Endpoint>, CatalogError> {
    if document.get("endpoints").is_some() {
        let flat: FlatCatalog = serde_json::from_value(document.clone())?;
        let endpoints = flat
            .endpoints
            .into_iter()
            .filter_map(|e| {
                Method::from_str(&e.method)
                    .ok()
                    .map(|m| Endpoint::new(m, &e.path))
            })
            .collect();
        return Ok(endpoints);
    }

    if let Some(paths) = document.get("paths").and_then(|p| p.as_object()) {
        let mut endpoints = Vec::new();
        for (path, operations) in paths {
            let Some(operations) = operations.as_object() else {
                continue;
            };
            for method_key in operations.keys() {
                if let Ok(method) = Method::from_str(method_key) {
                    endpoints.push(Endpoint::new(method, path));
                }
            }
        }
        return Ok(endpoints);
    }

    Err(CatalogError::UnrecognizedDocument(
        "expected an `endpoints` array or OpenAPI `paths` object".to_string(),
    ))
}
