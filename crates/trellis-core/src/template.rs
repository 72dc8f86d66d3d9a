//! Variable resolution for `{{ expression }}` placeholders.
//!
//! Templates are resolved against a run's [`ExecutionContext`]. The
//! contract is deliberately lenient: a missing reference resolves to
//! null/empty, never an error, because templates are validated only at
//! authoring time and downstream handlers treat an unresolved reference
//! as "no value provided". Resolution therefore cannot fail.

use crate::context::ExecutionContext;
use serde_json::Value;

/// Resolve a template against the context, preserving the value type
/// when the template is exactly one placeholder.
///
/// `"{{ $last }}"` yields the raw last output (object, array, number,
/// whatever it is); `"count: {{ $last.count }}"` yields a string with
/// the placeholder stringified in place. A template without placeholders
/// comes back as a string unchanged.
pub fn resolve(template: &str, ctx: &ExecutionContext) -> Value {
    if let Some(expr) = single_placeholder(template) {
        return lookup(expr, ctx);
    }
    Value::String(resolve_str(template, ctx))
}

/// Resolve a template to a string, replacing every placeholder with the
/// stringified lookup. Missing paths become the empty string.
pub fn resolve_str(template: &str, ctx: &ExecutionContext) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let expr = after[..end].trim();
                out.push_str(&stringify(&lookup(expr, ctx)));
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated placeholder is kept verbatim
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Walk an arbitrary JSON value, resolving every string in place.
/// Used on node options before dispatch so each handler sees only
/// concrete values.
pub fn resolve_value(value: &Value, ctx: &ExecutionContext) -> Value {
    match value {
        Value::String(s) => resolve(s, ctx),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_value(v, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Look up a dotted path expression against the context roots.
/// Missing roots or path segments resolve to `Value::Null`.
pub fn lookup(expr: &str, ctx: &ExecutionContext) -> Value {
    let mut segments = expr.split('.');
    let root_name = match segments.next() {
        Some(name) if !name.is_empty() => name.trim(),
        _ => return Value::Null,
    };

    let mut current = match ctx.root(root_name) {
        Some(value) => value.clone(),
        None => return Value::Null,
    };

    for segment in segments {
        let segment = segment.trim();
        current = match &current {
            Value::Object(map) => match map.get(segment) {
                Some(v) => v.clone(),
                None => return Value::Null,
            },
            Value::Array(items) => match segment.parse::<usize>() {
                Ok(idx) => match items.get(idx) {
                    Some(v) => v.clone(),
                    None => return Value::Null,
                },
                Err(_) => return Value::Null,
            },
            _ => return Value::Null,
        };
    }

    current
}

/// If the trimmed template is exactly one `{{ expr }}`, return the inner
/// expression
fn single_placeholder(template: &str) -> Option<&str> {
    let trimmed = template.trim();
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        let mut ctx = ExecutionContext::with_input(
            json!({"order": {"id": "o_1", "total": 42}}),
            json!({"limit": 10}),
        );
        ctx.record_output("products", json!([{"sku": "SHIRT-S"}, {"sku": "SHIRT-M"}]));
        ctx.record_output("count", json!(2));
        ctx
    }

    #[test]
    fn test_single_placeholder_preserves_type() {
        let ctx = ctx();
        assert_eq!(resolve("{{ count }}", &ctx), json!(2));
        assert_eq!(
            resolve("{{ products }}", &ctx),
            json!([{"sku": "SHIRT-S"}, {"sku": "SHIRT-M"}])
        );
        assert_eq!(resolve("{{ $last }}", &ctx), json!(2));
        assert_eq!(resolve("{{ $trigger.order.total }}", &ctx), json!(42));
    }

    #[test]
    fn test_mixed_template_stringifies() {
        let ctx = ctx();
        assert_eq!(
            resolve("found {{ count }} for {{ $trigger.order.id }}", &ctx),
            json!("found 2 for o_1")
        );
    }

    #[test]
    fn test_array_indexing() {
        let ctx = ctx();
        assert_eq!(resolve("{{ products.1.sku }}", &ctx), json!("SHIRT-M"));
        assert_eq!(resolve("{{ products.9.sku }}", &ctx), Value::Null);
    }

    #[test]
    fn test_missing_path_is_null_not_error() {
        let ctx = ctx();
        assert_eq!(resolve("{{ nope }}", &ctx), Value::Null);
        assert_eq!(resolve("{{ $trigger.ghost.deep }}", &ctx), Value::Null);
        assert_eq!(resolve_str("value: {{ nope }}", &ctx), "value: ");
    }

    #[test]
    fn test_no_placeholder_passthrough() {
        let ctx = ctx();
        assert_eq!(resolve("plain text", &ctx), json!("plain text"));
    }

    #[test]
    fn test_unterminated_placeholder_kept_verbatim() {
        let ctx = ctx();
        assert_eq!(resolve_str("broken {{ count", &ctx), "broken {{ count");
    }

    #[test]
    fn test_input_root() {
        let ctx = ctx();
        assert_eq!(resolve("{{ $input.limit }}", &ctx), json!(10));
    }

    #[test]
    fn test_resolve_value_walks_options_tree() {
        let ctx = ctx();
        let options = json!({
            "entity": "products",
            "filters": {"q": "{{ $trigger.order.id }}"},
            "limits": ["{{ count }}", 5],
        });

        let resolved = resolve_value(&options, &ctx);
        assert_eq!(
            resolved,
            json!({
                "entity": "products",
                "filters": {"q": "o_1"},
                "limits": [2, 5],
            })
        );
        // Input template is untouched
        assert_eq!(options["filters"]["q"], json!("{{ $trigger.order.id }}"));
    }
}
