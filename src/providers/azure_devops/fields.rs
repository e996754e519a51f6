//! Null-tolerant accessors over loosely shaped JSON nodes.
//!
//! Optional fields never fail: absent or `null` strings become `""` and
//! absent timestamps become `None`. Only the `required_*` accessors return
//! errors, for fields whose absence means the response has an incompatible
//! shape.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::{DashboardError, Result};

/// Looks up `name` on an object node, falling back to a case-insensitive match.
pub fn field<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    let object = node.as_object()?;
    object
        .get(name)
        .or_else(|| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_null())
}

/// Nested object, `None` if absent, `null` or not an object.
pub fn nested<'a>(node: &'a Value, name: &str) -> Option<&'a Value> {
    field(node, name).filter(|value| value.is_object())
}

/// String value of `name`, or `""` when absent or `null`.
///
/// Numbers and booleans are rendered as text.
pub fn string_field(node: &Value, name: &str) -> String {
    match field(node, name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// String value of `parent.child`, or `""` when either level is missing.
pub fn nested_string(node: &Value, parent: &str, child: &str) -> String {
    nested(node, parent)
        .map(|inner| string_field(inner, child))
        .unwrap_or_default()
}

/// Timestamp value of `name`.
///
/// Missing, unparsable and `0001-01-01` sentinel values all map to `None`.
pub fn timestamp_field(node: &Value, name: &str) -> Option<DateTime<Utc>> {
    let raw = field(node, name)?.as_str()?;
    parse_timestamp(raw).filter(|ts| ts.year() > 1)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Integer value of `name`, accepting numeric strings.
pub fn i64_field(node: &Value, name: &str) -> Option<i64> {
    match field(node, name)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn required_i64(node: &Value, name: &str, entity: &'static str) -> Result<i64> {
    i64_field(node, name)
        .ok_or_else(|| DashboardError::mapping(entity, format!("missing integer field `{name}`")))
}

pub fn required_string(node: &Value, name: &str, entity: &'static str) -> Result<String> {
    match field(node, name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(DashboardError::mapping(
            entity,
            format!("missing string field `{name}`"),
        )),
    }
}
