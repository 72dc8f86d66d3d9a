//! Retrieval search: the similarity fallback used when exact and alias
//! catalog matching fail. The default implementation is lexical
//! (token-overlap over the index); a semantic store can be swapped in
//! behind the same trait.

use crate::endpoint::{Endpoint, Method};
use crate::index::path_tokens;
use crate::service::CatalogService;
use async_trait::async_trait;
use std::sync::Arc;

/// A retrieval candidate with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEndpoint {
    /// The candidate endpoint
    pub endpoint: Endpoint,
    /// Similarity to the query, higher is better
    pub score: f32,
}

/// Similarity-based endpoint lookup
#[async_trait]
pub trait RetrievalSearch: Send + Sync {
    /// Best-matching endpoints for a free-text query, best first
    async fn search(&self, query: &str, limit: usize) -> Vec<ScoredEndpoint>;

    /// Best match restricted to one method, if any
    async fn search_method(&self, method: Method, query: &str) -> Option<Endpoint> {
        self.search(query, 10)
            .await
            .into_iter()
            .map(|s| s.endpoint)
            .find(|e| e.method == method)
    }
}

/// Token-overlap retrieval over the live catalog index
pub struct LexicalRetrieval {
    catalog: Arc<CatalogService>,
}

impl LexicalRetrieval {
    /// Create a retrieval over the given catalog service
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl RetrievalSearch for LexicalRetrieval {
    async fn search(&self, query: &str, limit: usize) -> Vec<ScoredEndpoint> {
        let index = self.catalog.index().await;
        let query_tokens = text_tokens(query);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<ScoredEndpoint> = index
            .endpoints()
            .iter()
            .filter_map(|endpoint| {
                let score = overlap_score(&query_tokens, &path_tokens(&endpoint.path));
                if score > 0.0 {
                    Some(ScoredEndpoint {
                        endpoint: endpoint.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.endpoint.path.cmp(&b.endpoint.path))
        });
        scored.truncate(limit);
        scored
    }
}

fn text_tokens(text: &str) -> Vec<String> {
    text.to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(str::to_string)
        .collect()
}

/// Fraction of path tokens matched by the query, with singular/plural
/// tolerance
fn overlap_score(query: &[String], path: &[String]) -> f32 {
    if path.is_empty() {
        return 0.0;
    }
    let matched = path
        .iter()
        .filter(|p| {
            query
                .iter()
                .any(|q| q == *p || q.trim_end_matches('s') == p.trim_end_matches('s'))
        })
        .count();
    matched as f32 / path.len() as f32
}
