use crate::endpoint::{alias_path, normalize_path, Endpoint, Method};
use std::collections::HashSet;

/// In-memory set of allowed `"METHOD /path"` operations.
///
/// Both the hyphenated and underscored form of every path are indexed so
/// lookups tolerate catalog drift in either direction. An empty index
/// means "cannot validate" and callers must pass requests through rather
/// than reject them.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    keys: HashSet<String>,
    endpoints: Vec<Endpoint>,
}

impl CatalogIndex {
    /// Build an index from endpoints, normalizing and de-duplicating
    pub fn from_endpoints<I>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = Endpoint>,
    {
        let mut keys = HashSet::new();
        let mut unique = Vec::new();

        for endpoint in endpoints {
            let normalized = Endpoint::new(endpoint.method, &endpoint.path);
            let key = normalized.key();
            let underscored = format!(
                "{} {}",
                normalized.method,
                normalized.path.replace('-', "_")
            );
            if keys.insert(key) {
                unique.push(normalized);
            }
            keys.insert(underscored);
        }

        Self {
            keys,
            endpoints: unique,
        }
    }

    /// Exact membership test after normalization
    pub fn has(&self, method: Method, path: &str) -> bool {
        let normalized = normalize_path(path);
        self.keys.contains(&format!("{method} {normalized}"))
    }

    /// Resolve a path to its normalized, catalog-known form: exact match
    /// first, then through the alias table. `None` when the operation is
    /// unknown to the catalog.
    pub fn resolve(&self, method: Method, path: &str) -> Option<String> {
        let normalized = normalize_path(path);
        if self.keys.contains(&format!("{method} {normalized}")) {
            return Some(normalized);
        }
        let aliased = alias_path(&normalized)?;
        if self.keys.contains(&format!("{method} {aliased}")) {
            return Some(aliased);
        }
        None
    }

    /// Number of distinct endpoints
    pub fn size(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether the index holds no endpoints (catalog unavailable or not
    /// yet fetched)
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// All indexed endpoints
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Same-method candidates ranked by path-token overlap with the
    /// given path, best first, at most `limit`. Ties go to the endpoint
    /// with fewer unmatched tokens.
    pub fn suggestions(&self, method: Method, path: &str, limit: usize) -> Vec<Endpoint> {
        let wanted = path_tokens(&normalize_path(path));
        let mut scored: Vec<(usize, usize, &Endpoint)> = self
            .endpoints
            .iter()
            .filter(|e| e.method == method)
            .map(|e| {
                let tokens = path_tokens(&e.path);
                (token_overlap(&wanted, &tokens), tokens.len(), e)
            })
            .filter(|(matched, _, _)| *matched > 0)
            .collect();

        scored.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.path.cmp(&b.2.path))
        });
        scored
            .into_iter()
            .take(limit)
            .map(|(_, _, e)| e.clone())
            .collect()
    }
}

/// Split a normalized path into lookup tokens, splitting hyphenated
/// segments so `inventory-items` matches `inventory`
pub fn path_tokens(path: &str) -> Vec<String> {
    path.split(['/', '-'])
        .filter(|s| !s.is_empty() && *s != "admin")
        .map(str::to_string)
        .collect()
}

fn token_overlap(a: &[String], b: &[String]) -> usize {
    a.iter()
        .filter(|t| b.iter().any(|u| u == *t || singular_eq(t, u)))
        .count()
}

// Tolerates plural/singular drift between message terms and path tokens
fn singular_eq(a: &str, b: &str) -> bool {
    a.strip_suffix('s').map(|s| s == b).unwrap_or(false)
        || b.strip_suffix('s').map(|s| s == a).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> CatalogIndex {
        CatalogIndex::from_endpoints(vec![
            Endpoint::new(Method::Get, "/admin/products"),
            Endpoint::new(Method::Post, "/admin/products"),
            Endpoint::new(Method::Get, "/admin/inventory_items"),
            Endpoint::new(Method::Get, "/admin/product-categories"),
            Endpoint::new(Method::Get, "/admin/orders"),
        ])
    }

    #[test]
    fn test_has_exact_after_normalization() {
        let index = sample_index();
        assert!(index.has(Method::Get, "/admin/products"));
        assert!(index.has(Method::Get, "products"));
        assert!(!index.has(Method::Delete, "/admin/products"));
    }

    #[test]
    fn test_underscore_hyphen_alias() {
        let index = sample_index();
        // Built from the underscored form, queried with hyphens
        assert!(index.has(Method::Get, "/admin/inventory-items"));
        // And the underscored query form normalizes to hyphenated
        assert!(index.has(Method::Get, "/admin/inventory_items"));
    }

    #[test]
    fn test_resolve_through_alias_table() {
        let index = sample_index();
        assert_eq!(
            index.resolve(Method::Get, "/admin/category").as_deref(),
            Some("/admin/product-categories")
        );
        assert_eq!(
            index.resolve(Method::Get, "/admin/inventory").as_deref(),
            Some("/admin/inventory-items")
        );
        assert_eq!(
            index.resolve(Method::Get, "/admin/products").as_deref(),
            Some("/admin/products")
        );
        assert!(index.resolve(Method::Get, "/admin/nothing-here").is_none());
    }

    #[test]
    fn test_size_and_dedup() {
        let index = CatalogIndex::from_endpoints(vec![
            Endpoint::new(Method::Get, "/admin/products"),
            Endpoint::new(Method::Get, "/admin/products/"),
            Endpoint::new(Method::Get, "products"),
        ]);
        assert_eq!(index.size(), 1);

        let empty = CatalogIndex::default();
        assert!(empty.is_empty());
        assert_eq!(empty.size(), 0);
    }

    #[test]
    fn test_suggestions_ranked_same_method() {
        let index = sample_index();
        let suggestions = index.suggestions(Method::Get, "/admin/product", 5);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0].path, "/admin/products");
        assert!(suggestions.iter().all(|e| e.method == Method::Get));

        // Unrelated paths are not suggested
        assert!(suggestions.iter().all(|e| e.path != "/admin/orders"));
    }

    #[test]
    fn test_suggestions_limit() {
        let index = sample_index();
        let suggestions = index.suggestions(Method::Get, "/admin/products/product-categories", 1);
        assert_eq!(suggestions.len(), 1);
    }
}
