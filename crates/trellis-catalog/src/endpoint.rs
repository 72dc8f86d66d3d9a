//! Endpoint value objects and path normalization.
//!
//! Every path in the system is normalized before comparison: absolute,
//! rooted at the canonical `/admin` segment, hyphen-separated. The alias
//! table is a small explicit list of known catalog inconsistencies, not
//! a general pluralization algorithm.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical root segment every normalized path begins with
pub const ROOT_SEGMENT: &str = "admin";

/// HTTP method of a catalog endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Whether this method writes data (POST/PUT/PATCH/DELETE)
    pub fn is_write(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

/// A single allowed API operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// HTTP method
    pub method: Method,
    /// Normalized path
    pub path: String,
}

impl Endpoint {
    /// Create an endpoint, normalizing the path
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
        }
    }

    /// The index key for this endpoint (`"GET /admin/products"`)
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Normalize a path: absolute, `/admin`-rooted, hyphen-separated
/// segments, no duplicate or trailing slashes. Idempotent: applying it
/// twice yields the same result.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<String> = path
        .trim()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.replace('_', "-"))
        .collect();

    // Legacy form: a leading "api" segment before the root
    if segments.first().map(String::as_str) == Some("api") {
        segments.remove(0);
    }

    if segments.first().map(String::as_str) != Some(ROOT_SEGMENT) {
        segments.insert(0, ROOT_SEGMENT.to_string());
    }

    format!("/{}", segments.join("/"))
}

/// Known resource-segment aliases for catalog drift. Applied only after
/// an exact lookup fails.
const RESOURCE_ALIASES: &[(&str, &str)] = &[
    ("category", "product-categories"),
    ("categories", "product-categories"),
    ("product-category", "product-categories"),
    ("inventory", "inventory-items"),
    ("inventory-item", "inventory-items"),
    ("variant", "product-variants"),
    ("variants", "product-variants"),
];

/// Rewrite the resource segment of a normalized path through the alias
/// table. Returns `None` when no alias applies.
pub fn alias_path(normalized: &str) -> Option<String> {
    let mut segments: Vec<&str> = normalized.split('/').filter(|s| !s.is_empty()).collect();
    let resource = segments.get(1).copied()?;

    let replacement = RESOURCE_ALIASES
        .iter()
        .find(|(from, _)| *from == resource)
        .map(|(_, to)| *to)?;

    segments[1] = replacement;
    Some(format!("/{}", segments.join("/")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_idempotent() {
        let cases = [
            "/admin/products",
            "admin/products/",
            "/products",
            "/admin/inventory_items",
            "//admin//draft_orders//",
            "/api/admin/price_lists",
            "",
        ];
        for case in cases {
            let once = normalize_path(case);
            assert_eq!(normalize_path(&once), once, "not idempotent for {case:?}");
        }
    }

    #[test]
    fn test_normalize_path_forms() {
        assert_eq!(normalize_path("/admin/products"), "/admin/products");
        assert_eq!(normalize_path("products"), "/admin/products");
        assert_eq!(
            normalize_path("/admin/inventory_items"),
            "/admin/inventory-items"
        );
        assert_eq!(normalize_path("/api/admin/products"), "/admin/products");
        assert_eq!(normalize_path("admin/products/"), "/admin/products");
        assert_eq!(normalize_path(""), "/admin");
    }

    #[test]
    fn test_alias_path() {
        assert_eq!(
            alias_path("/admin/category").as_deref(),
            Some("/admin/product-categories")
        );
        assert_eq!(
            alias_path("/admin/inventory").as_deref(),
            Some("/admin/inventory-items")
        );
        assert_eq!(
            alias_path("/admin/variant/v_1").as_deref(),
            Some("/admin/product-variants/v_1")
        );
        assert!(alias_path("/admin/products").is_none());
        assert!(alias_path("/admin").is_none());
    }

    #[test]
    fn test_method_parse_and_display() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("PATCH".parse::<Method>().unwrap(), Method::Patch);
        assert!("TRACE".parse::<Method>().is_err());
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!(Method::Post.is_write());
        assert!(!Method::Get.is_write());
    }

    #[test]
    fn test_endpoint_key() {
        let ep = Endpoint::new(Method::Get, "/admin/inventory_items");
        assert_eq!(ep.key(), "GET /admin/inventory-items");
    }

    #[test]
    fn test_method_serde_uppercase() {
        let m: Method = serde_json::from_str("\"GET\"").unwrap();
        assert_eq!(m, Method::Get);
        assert_eq!(serde_json::to_string(&Method::Patch).unwrap(), "\"PATCH\"");
    }
}
