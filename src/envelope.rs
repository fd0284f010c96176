// Response envelope handling + lenient scalar access for upstream JSON.
// Upstream bodies may be wrapped under `data` any number of times, and list bodies may be
// plain arrays or objects carrying `items` / `guests`.

use serde_json::Value;

/// Strips top-level `data` wrappers until the value no longer carries one.
pub fn unwrap(mut value: Value) -> Value {
    loop {
        match value {
            Value::Object(mut map) if map.contains_key("data") => {
                value = map.remove("data").unwrap_or(Value::Null);
            }
            other => return other,
        }
    }
}

/// Coerces a list-shaped body into a flat list. Anything else yields an empty list.
pub fn as_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in ["items", "guests"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return items;
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// `unwrap` followed by `as_list`.
pub fn list_of(value: Value) -> Vec<Value> {
    as_list(unwrap(value))
}

/// Splits a `;`- or `,`-delimited tag string into trimmed, non-empty tags.
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split([';', ','])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Number or numeric string as f64. Non-finite values are treated as absent.
pub fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Boolean-ish flag: true/false, 0/1, "0"/"1", on/off, yes/no.
pub fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => parse_flag(s),
        _ => None,
    }
}

pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

/// Scalar rendered as text (strings as-is, numbers/bools via Display).
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn num(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(as_f64)
}

pub fn text(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(as_text)
}

pub fn flag(obj: &Value, key: &str) -> Option<bool> {
    obj.get(key).and_then(as_flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwrap_descends_nested_data() {
        let v = json!({"data": {"data": {"data": [1, 2]}}});
        assert_eq!(unwrap(v), json!([1, 2]));
    }

    #[test]
    fn unwrap_stops_at_value_without_data() {
        let v = json!({"data": {"name": "pve", "inner": {"data": 1}}});
        assert_eq!(unwrap(v), json!({"name": "pve", "inner": {"data": 1}}));
    }

    #[test]
    fn unwrap_does_not_follow_data_inside_arrays() {
        let v = json!([{"data": 1}]);
        assert_eq!(unwrap(v.clone()), v);
    }

    #[test]
    fn unwrap_is_idempotent() {
        for v in [
            json!({"data": {"data": {"x": 1}}}),
            json!(null),
            json!(3),
            json!({"data": null}),
            json!([{"data": []}]),
        ] {
            let once = unwrap(v);
            assert_eq!(unwrap(once.clone()), once);
        }
    }

    #[test]
    fn as_list_accepts_arrays_items_and_guests() {
        assert_eq!(as_list(json!([1, 2])).len(), 2);
        assert_eq!(as_list(json!({"items": [1]})).len(), 1);
        assert_eq!(as_list(json!({"guests": [1, 2, 3]})).len(), 3);
    }

    #[test]
    fn as_list_returns_empty_for_other_shapes() {
        assert!(as_list(json!(null)).is_empty());
        assert!(as_list(json!(42)).is_empty());
        assert!(as_list(json!("x")).is_empty());
        assert!(as_list(json!({"rows": [1]})).is_empty());
        assert!(as_list(json!({"items": "nope"})).is_empty());
    }

    #[test]
    fn list_of_unwraps_first() {
        assert_eq!(list_of(json!({"data": {"items": [1, 2]}})).len(), 2);
    }

    #[test]
    fn split_tags_handles_both_delimiters() {
        assert_eq!(split_tags(" prod; web ,db;;"), vec!["prod", "web", "db"]);
        assert!(split_tags("").is_empty());
    }

    #[test]
    fn scalars_are_lenient() {
        let v = json!({"a": "1.5", "b": 2, "c": "on", "d": "x", "e": 0});
        assert_eq!(num(&v, "a"), Some(1.5));
        assert_eq!(num(&v, "b"), Some(2.0));
        assert_eq!(num(&v, "d"), None);
        assert_eq!(flag(&v, "c"), Some(true));
        assert_eq!(flag(&v, "e"), Some(false));
        assert_eq!(text(&v, "b").as_deref(), Some("2"));
    }
}
