//! Compiles simple comparison expressions (`$last.count > 0`) into
//! structured filter rules evaluated at run time.
//!
//! Unsupported syntax is an explicit error, never a silently-wrong rule:
//! a condition node refuses to execute on an unparseable expression
//! rather than defaulting to always-true or always-false.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator tags, matching the filter-rule vocabulary used
/// across the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Equals
    #[serde(rename = "_eq")]
    Eq,
    /// Not equals
    #[serde(rename = "_neq")]
    Neq,
    /// Greater than
    #[serde(rename = "_gt")]
    Gt,
    /// Greater than or equal
    #[serde(rename = "_gte")]
    Gte,
    /// Less than
    #[serde(rename = "_lt")]
    Lt,
    /// Less than or equal
    #[serde(rename = "_lte")]
    Lte,
}

impl FilterOp {
    /// The rule tag (`_eq`, `_gte`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            FilterOp::Eq => "_eq",
            FilterOp::Neq => "_neq",
            FilterOp::Gt => "_gt",
            FilterOp::Gte => "_gte",
            FilterOp::Lt => "_lt",
            FilterOp::Lte => "_lte",
        }
    }
}

/// A compiled condition: a template path on the left, an operator, and a
/// coerced right-hand value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    /// Left-hand template path (e.g. `$last.count`)
    pub path: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Coerced right-hand operand
    pub value: Value,
}

impl FilterRule {
    /// Evaluate the rule against the resolved left-hand value.
    ///
    /// Equality compares JSON values with numeric normalization;
    /// ordering operators require both sides to be numbers (or both
    /// strings, compared lexicographically) and otherwise evaluate to
    /// false.
    pub fn evaluate(&self, lhs: &Value) -> bool {
        match self.op {
            FilterOp::Eq => values_equal(lhs, &self.value),
            FilterOp::Neq => !values_equal(lhs, &self.value),
            FilterOp::Gt => compare(lhs, &self.value).map(|o| o.is_gt()).unwrap_or(false),
            FilterOp::Gte => compare(lhs, &self.value).map(|o| o.is_ge()).unwrap_or(false),
            FilterOp::Lt => compare(lhs, &self.value).map(|o| o.is_lt()).unwrap_or(false),
            FilterOp::Lte => compare(lhs, &self.value).map(|o| o.is_le()).unwrap_or(false),
        }
    }
}

/// Parse a comparison expression, optionally wrapped in `{{ }}`, into a
/// [`FilterRule`]
pub fn compile(expression: &str) -> Result<FilterRule, CoreError> {
    let expr = strip_braces(expression.trim());

    let (lhs, op, rhs) = split_on_operator(expr).ok_or_else(|| {
        CoreError::ConditionError(format!(
            "No comparison operator found in expression: {expr}"
        ))
    })?;

    let path = lhs.trim();
    if path.is_empty() {
        return Err(CoreError::ConditionError(
            "Empty left-hand side in condition expression".to_string(),
        ));
    }

    Ok(FilterRule {
        path: path.to_string(),
        op,
        value: coerce_operand(rhs.trim()),
    })
}

fn strip_braces(expr: &str) -> &str {
    expr.strip_prefix("{{")
        .and_then(|e| e.strip_suffix("}}"))
        .map(str::trim)
        .unwrap_or(expr)
}

/// Find the first operator occurrence, longest match first at each
/// position so `>=` is never read as `>`
fn split_on_operator(expr: &str) -> Option<(&str, FilterOp, &str)> {
    for (i, _) in expr.char_indices() {
        let rest = &expr[i..];
        for (symbol, op) in [
            ("==", FilterOp::Eq),
            ("!=", FilterOp::Neq),
            (">=", FilterOp::Gte),
            ("<=", FilterOp::Lte),
            (">", FilterOp::Gt),
            ("<", FilterOp::Lt),
        ] {
            if rest.starts_with(symbol) {
                return Some((&expr[..i], op, &expr[i + symbol.len()..]));
            }
        }
    }
    None
}

/// Coerce a right-hand operand: booleans, null, numbers, quoted strings,
/// else the literal text (a template path left as-is)
fn coerce_operand(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    let quoted = (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
        || (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2);
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }

    Value::String(raw.to_string())
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    None
}
