// src/payload.rs
//! Tolerant readers over loosely-typed JSON payloads.
//!
//! Every accessor takes a fallback so that a missing key, a `null`, or a value of the
//! wrong shape never turns into an error. Reading a key from a non-object yields `None`.

use serde_json::Value;

/// Value under `key`, treating `null` as absent.
pub fn field<'a>(v: &'a Value, key: &str) -> Option<&'a Value> {
    v.get(key).filter(|x| !x.is_null())
}

/// Scalar rendered as text. Strings are taken verbatim, numbers and bools via Display,
/// containers as compact JSON.
pub fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Non-empty text under `key`.
pub fn opt_text(v: &Value, key: &str) -> Option<String> {
    field(v, key).and_then(as_text).filter(|s| !s.is_empty())
}

pub fn text_or(v: &Value, key: &str, default: &str) -> String {
    field(v, key)
        .and_then(as_text)
        .unwrap_or_else(|| default.to_string())
}

pub fn number_or(v: &Value, key: &str, default: f64) -> f64 {
    opt_number(v, key).unwrap_or(default)
}

/// Numeric value under `key`; numeric strings are accepted too.
pub fn opt_number(v: &Value, key: &str) -> Option<f64> {
    match field(v, key)? {
        Value::Number(n) => n.as_f64().filter(|x| x.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
        _ => None,
    }
}

pub fn int_or(v: &Value, key: &str, default: i64) -> i64 {
    match field(v, key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|x| x.is_finite()).map(|x| x.round() as i64))
            .unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

pub fn bool_or(v: &Value, key: &str, default: bool) -> bool {
    field(v, key).and_then(Value::as_bool).unwrap_or(default)
}

/// Identifier under `key`. String and integer ids are both normalised to text.
pub fn id_of(v: &Value, key: &str) -> Option<String> {
    match field(v, key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Nested record under `key`, or `Value::Null` (which every accessor treats as empty).
pub fn record<'a>(v: &'a Value, key: &str) -> &'a Value {
    static EMPTY: Value = Value::Null;
    field(v, key).filter(|x| x.is_object()).unwrap_or(&EMPTY)
}

/// Array under `key`, or an empty slice.
pub fn list<'a>(v: &'a Value, key: &str) -> &'a [Value] {
    field(v, key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Agent display name: `display_name`, then `displayName`, then `name`, then `fallback`.
pub fn agent_name(agent: &Value, fallback: &str) -> String {
    opt_text(agent, "display_name")
        .or_else(|| opt_text(agent, "displayName"))
        .or_else(|| opt_text(agent, "name"))
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_null_and_wrong_type_fall_back() {
        let v = json!({ "a": null, "b": "x", "n": "12", "f": 2.6 });
        assert_eq!(text_or(&v, "a", "dflt"), "dflt");
        assert_eq!(text_or(&v, "missing", "dflt"), "dflt");
        assert_eq!(number_or(&v, "b", 1500.0), 1500.0);
        assert_eq!(number_or(&v, "n", 0.0), 12.0);
        assert_eq!(int_or(&v, "f", 0), 3);
    }

    #[test]
    fn accessors_on_non_objects_are_empty() {
        let v = json!([1, 2, 3]);
        assert_eq!(opt_text(&v, "x"), None);
        assert!(record(&v, "x").is_null());
        assert!(list(&Value::Null, "rounds").is_empty());
    }

    #[test]
    fn ids_normalise_numbers() {
        let v = json!({ "id": 42, "other": "abc", "empty": "" });
        assert_eq!(id_of(&v, "id").as_deref(), Some("42"));
        assert_eq!(id_of(&v, "other").as_deref(), Some("abc"));
        assert_eq!(id_of(&v, "empty"), None);
    }

    #[test]
    fn agent_name_prefers_display_name() {
        assert_eq!(agent_name(&json!({"display_name": "Zed", "name": "z"}), "A"), "Zed");
        assert_eq!(agent_name(&json!({"display_name": "", "name": "z"}), "A"), "z");
        assert_eq!(agent_name(&Value::Null, "Agent A"), "Agent A");
    }
}
