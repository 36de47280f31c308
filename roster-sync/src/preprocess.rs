//! Payload parsing: the single boundary between loosely-typed source JSON and
//! [`Descriptor`]. Pure, no I/O.
//!
//! Shape rules:
//! - a bare array of objects, or
//! - an object holding that array under `items`, `employees` or `data`
//!   (the first of those keys, in that order, whose value is an array).
//!
//! Anything else fails the whole payload.

use serde_json::{Map, Value};

use roster_core::Descriptor;

use crate::error::PayloadError;

const WRAPPER_KEYS: [&str; 3] = ["items", "employees", "data"];

/// Parse `raw` into descriptors, in input order.
pub fn normalize(raw: &Value) -> Result<Vec<Descriptor>, PayloadError> {
    let items = unwrap_items(raw)?;
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(obj) => descriptor(index, obj, item),
            _ => Err(PayloadError::ItemNotObject { index }),
        })
        .collect()
}

fn unwrap_items(raw: &Value) -> Result<&Vec<Value>, PayloadError> {
    match raw {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => WRAPPER_KEYS
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array))
            .ok_or(PayloadError::UnsupportedShape {
                found: "an object without an array under a known wrapper key",
            }),
        other => Err(PayloadError::UnsupportedShape { found: kind(other) }),
    }
}

fn descriptor(index: usize, obj: &Map<String, Value>, raw: &Value) -> Result<Descriptor, PayloadError> {
    let text = |field: &'static str| text_field(index, obj, field);
    let flag = |field: &'static str| flag_field(index, obj, field);

    Ok(Descriptor {
        external_ref: text("external_ref")?,
        email: text("email")?.map(|e| e.to_lowercase()).unwrap_or_default(),
        first_name: text("first_name")?.unwrap_or_default(),
        middle_name: text("middle_name")?,
        last_name: text("last_name")?.unwrap_or_default(),
        title: text("title")?,
        company: text("company")?,
        department: text("department")?,
        manager_external_ref: text("manager_external_ref")?,
        is_blocked_from_ad: flag("is_blocked_from_ad")?,
        is_in_blocked_ou: flag("is_in_blocked_ou")?,
        password_hash: text("password_hash")?,
        raw: raw.clone(),
    })
}

/// Trimmed string; numbers are rendered; blank and null become `None`.
fn text_field(
    index: usize,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(non_blank(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(PayloadError::InvalidField {
            index,
            field,
            found: kind(other),
        }),
    }
}

fn flag_field(
    index: usize,
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<bool>, PayloadError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Ok(Some(i != 0)),
            None => Err(PayloadError::InvalidField {
                index,
                field,
                found: "a fractional number",
            }),
        },
        Some(Value::String(s)) => Ok(parse_flag(index, field, s)),
        Some(other) => Err(PayloadError::InvalidField {
            index,
            field,
            found: kind(other),
        }),
    }
}

fn parse_flag(index: usize, field: &str, s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "true" | "1" | "yes" | "y" | "on" => Some(true),
        "false" | "0" | "no" | "n" | "off" => Some(false),
        other => {
            tracing::warn!(index, field, value = other, "unrecognised flag value; treating as unset");
            None
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
