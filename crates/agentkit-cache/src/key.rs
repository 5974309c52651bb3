//! Stable cache-key derivation.

use serde_json::Value;

/// Render `value` so that equal JSON values always produce the same string,
/// regardless of object key order.
///
/// `null` renders as `null`, strings, numbers and booleans as their plain
/// text, arrays as `[a,b]`, and objects as `{k:v,...}` with keys sorted.
pub fn stable_serialize(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(stable_serialize).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", k, stable_serialize(&map[k])))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}

/// The default key: the stable rendering of `params`, suffixed with
/// `|scope` when a scope is present.
pub fn default_key(params: &Value, scope: Option<&str>) -> String {
    let key = stable_serialize(params);
    match scope {
        Some(scope) => format!("{}|{}", key, scope),
        None => key,
    }
}
