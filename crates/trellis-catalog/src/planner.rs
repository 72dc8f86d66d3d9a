//! Dependency planning: before a write lands, look for empty identifier
//! references in its body and suggest the list calls that would fill
//! them. Suggestions are advisory only and never block the primary
//! request.

use crate::endpoint::{normalize_path, Method};
use crate::index::CatalogIndex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Fields checked, in order, for a best-effort search hint
const HINT_FIELDS: &[&str] = &[
    "q",
    "sku",
    "title",
    "handle",
    "email",
    "name",
    "code",
    "reference",
];

/// OpenAPI-style reference attached to a planned request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiRef {
    /// HTTP method
    pub method: Method,
    /// Normalized path
    pub path: String,
}

/// A validated, not-yet-executed description of an API call. The
/// planner never executes these itself; execution is delegated to an
/// external caller, keeping plan and execute strictly separate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedRequest {
    /// HTTP method
    pub method: Method,
    /// Normalized path
    pub path: String,
    /// Request body, when one applies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// OpenAPI-style reference mirroring method and path
    pub openapi: OpenApiRef,
}

impl PlannedRequest {
    /// Create a planned request, normalizing the path
    pub fn new(method: Method, path: &str, body: Option<Value>) -> Self {
        let path = normalize_path(path);
        Self {
            method,
            path: path.clone(),
            body,
            openapi: OpenApiRef { method, path },
        }
    }
}

/// Output of the dependency planner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanHints {
    /// Suggested prerequisite calls, if any
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub next: Vec<PlannedRequest>,
    /// Human-readable notes about what is missing
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

/// Scan a write request's body for empty `*_id`/`*_ids` references and
/// suggest prerequisite GET list calls for each one whose derived list
/// endpoint exists in the catalog.
pub fn plan_prerequisites(
    method: Method,
    _path: &str,
    body: Option<&Value>,
    index: &CatalogIndex,
) -> PlanHints {
    let mut hints = PlanHints::default();

    if !method.is_write() {
        return hints;
    }
    let Some(Value::Object(map)) = body else {
        return hints;
    };

    let hint = search_hint(map);

    for (key, value) in map {
        let Some(stem) = id_reference_stem(key) else {
            continue;
        };
        if !is_empty_reference(value) {
            continue;
        }

        let Some(resolved) = index.resolve(Method::Get, &list_path(&stem)) else {
            continue;
        };

        let mut list_body = Map::new();
        list_body.insert("limit".to_string(), json!(50));
        if let Some(hint) = &hint {
            list_body.insert("q".to_string(), hint.clone());
        }

        hints.next.push(PlannedRequest::new(
            Method::Get,
            &resolved,
            Some(Value::Object(list_body)),
        ));
        hints.notes.push(format!(
            "`{key}` is empty; list {resolved} first to find candidate ids"
        ));
    }

    hints
}

/// Derive the normalized list path for an entity name
/// (`draft_order` -> `/admin/draft-orders`)
pub fn list_path(entity: &str) -> String {
    normalize_path(&format!("/{}", pluralize(&entity.replace('_', "-"))))
}

/// The stem of a `*_id` / `*_ids` key, or `None` for other keys
fn id_reference_stem(key: &str) -> Option<String> {
    key.strip_suffix("_ids")
        .or_else(|| key.strip_suffix("_id"))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// Missing identifier values: null, empty string, empty array
fn is_empty_reference(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// First non-empty identifying field from the body, used as a `q` hint
fn search_hint(map: &Map<String, Value>) -> Option<Value> {
    for field in HINT_FIELDS {
        if let Some(value) = map.get(*field) {
            match value {
                Value::String(s) if !s.trim().is_empty() => return Some(value.clone()),
                Value::Number(_) => return Some(value.clone()),
                _ => {}
            }
        }
    }
    None
}

/// Minimal pluralization: `y -> ies`, `s/x/ch -> +es`, else `+s`.
/// Anything beyond this lives in the explicit alias table.
fn pluralize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix('y') {
        return format!("{stem}ies");
    }
    if word.ends_with('s') || word.ends_with('x') || word.ends_with("ch") {
        return format!("{word}es");
    }
    format!("{word}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;

    fn index() -> CatalogIndex {
        CatalogIndex::from_endpoints(vec![
            Endpoint::new(Method::Get, "/admin/products"),
            Endpoint::new(Method::Get, "/admin/product-categories"),
            Endpoint::new(Method::Get, "/admin/taxes"),
            Endpoint::new(Method::Post, "/admin/orders"),
        ])
    }

    #[test]
    fn test_missing_product_id_emits_one_suggestion() {
        let body = serde_json::json!({"product_id": null});
        let hints = plan_prerequisites(Method::Post, "/admin/orders", Some(&body), &index());

        assert_eq!(hints.next.len(), 1);
        let suggestion = &hints.next[0];
        assert_eq!(suggestion.method, Method::Get);
        assert_eq!(suggestion.path, "/admin/products");
        assert_eq!(suggestion.body, Some(serde_json::json!({"limit": 50})));
        assert_eq!(hints.notes.len(), 1);
    }

    #[test]
    fn test_hint_from_identifying_field() {
        let body = serde_json::json!({"product_id": "", "title": "Winter Jacket"});
        let hints = plan_prerequisites(Method::Post, "/admin/orders", Some(&body), &index());

        assert_eq!(
            hints.next[0].body,
            Some(serde_json::json!({"limit": 50, "q": "Winter Jacket"}))
        );
    }

    #[test]
    fn test_hint_priority_order() {
        // `sku` outranks `title` in the fixed priority list
        let body = serde_json::json!({
            "product_ids": [],
            "title": "Jacket",
            "sku": "JKT-01",
        });
        let hints = plan_prerequisites(Method::Post, "/admin/orders", Some(&body), &index());
        assert_eq!(
            hints.next[0].body,
            Some(serde_json::json!({"limit": 50, "q": "JKT-01"}))
        );
    }

    #[test]
    fn test_read_methods_are_ignored() {
        let body = serde_json::json!({"product_id": null});
        let hints = plan_prerequisites(Method::Get, "/admin/orders", Some(&body), &index());
        assert!(hints.next.is_empty());
        assert!(hints.notes.is_empty());
    }

    #[test]
    fn test_populated_reference_is_ignored() {
        let body = serde_json::json!({"product_id": "prod_123"});
        let hints = plan_prerequisites(Method::Post, "/admin/orders", Some(&body), &index());
        assert!(hints.next.is_empty());
    }

    #[test]
    fn test_unknown_list_endpoint_is_skipped() {
        let body = serde_json::json!({"warehouse_id": null});
        let hints = plan_prerequisites(Method::Post, "/admin/orders", Some(&body), &index());
        assert!(hints.next.is_empty());
    }

    #[test]
    fn test_alias_table_applies_to_derived_path() {
        // category_id -> /admin/categories, resolved to product-categories
        // through the alias table
        let body = serde_json::json!({"category_id": null});
        let hints = plan_prerequisites(Method::Post, "/admin/products", Some(&body), &index());
        assert_eq!(hints.next.len(), 1);
        assert_eq!(hints.next[0].path, "/admin/product-categories");
    }

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("product"), "products");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("tax"), "taxes");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("batch"), "batches");
    }

    #[test]
    fn test_ids_suffix_and_empty_array() {
        let body = serde_json::json!({"product_ids": []});
        let hints = plan_prerequisites(Method::Patch, "/admin/orders", Some(&body), &index());
        assert_eq!(hints.next.len(), 1);
        assert_eq!(hints.next[0].path, "/admin/products");
    }

    #[test]
    fn test_planned_request_openapi_mirror() {
        let request = PlannedRequest::new(Method::Post, "/admin/draft_orders", None);
        assert_eq!(request.path, "/admin/draft-orders");
        assert_eq!(request.openapi.method, Method::Post);
        assert_eq!(request.openapi.path, "/admin/draft-orders");
    }
}
