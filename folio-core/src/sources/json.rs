//! Lenient readers for catalog JSON, whose shapes vary between records
//! (plain strings vs `{name}` / `{value}` / `{key}` objects, scalars vs arrays)

use serde_json::Value;

/// A string, or the `name` / `value` member of an object
pub fn text(value: &Value) -> Option<String> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("value"))
            .and_then(Value::as_str)?,
        _ => return None,
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Text of an optional member
pub fn field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(text)
}

/// Every text entry of an array member; a scalar counts as a one-item list
pub fn list(value: &Value, key: &str) -> Vec<String> {
    match value.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(text).collect(),
        Some(other) => text(other).into_iter().collect(),
        None => Vec::new(),
    }
}

/// First text entry of an array member (or the scalar itself)
pub fn first(value: &Value, key: &str) -> Option<String> {
    list(value, key).into_iter().next()
}

/// Language codes from `["fre"]` or `[{"key": "/languages/fre"}]`
pub fn language_keys(value: &Value, key: &str) -> Vec<String> {
    let Some(Value::Array(items)) = value.get(key) else {
        return list(value, key);
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("key").and_then(Value::as_str),
            _ => None,
        })
        .filter_map(|k| k.rsplit('/').next())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Unsigned integer member, accepting numeric strings
pub fn unsigned(value: &Value, key: &str) -> Option<u64> {
    match value.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Map the catalog's MARC language codes to ISO 639-1 where known
pub fn marc_language(code: &str) -> String {
    let code = code.trim().to_ascii_lowercase();
    let mapped = match code.as_str() {
        "fre" => "fr",
        "ger" => "de",
        "dut" => "nl",
        "chi" => "zh",
        "cze" => "cs",
        "gre" => "el",
        "per" => "fa",
        "rum" => "ro",
        "slo" => "sk",
        "wel" => "cy",
        "ice" => "is",
        "arm" => "hy",
        "geo" => "ka",
        "mac" => "mk",
        "alb" => "sq",
        "baq" => "eu",
        "bur" => "my",
        "may" => "ms",
        other => crate::extract::iso_639_1(other),
    };
    mapped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_or_object_lists() {
        let value = json!({
            "publishers": [{"name": "Gallimard"}, "Folio", {"other": 1}, "  "],
            "subjects": "Fables"
        });
        assert_eq!(list(&value, "publishers"), vec!["Gallimard", "Folio"]);
        assert_eq!(list(&value, "subjects"), vec!["Fables"]);
        assert!(list(&value, "missing").is_empty());
    }

    #[test]
    fn test_description_shapes() {
        let plain = json!({"description": "A tale."});
        let typed = json!({"description": {"type": "/type/text", "value": "A tale."}});
        assert_eq!(field(&plain, "description").as_deref(), Some("A tale."));
        assert_eq!(field(&typed, "description").as_deref(), Some("A tale."));
    }

    #[test]
    fn test_language_keys() {
        let value = json!({"languages": [{"key": "/languages/fre"}, "eng"]});
        assert_eq!(language_keys(&value, "languages"), vec!["fre", "eng"]);
        assert_eq!(marc_language("fre"), "fr");
        assert_eq!(marc_language("eng"), "en");
    }

    #[test]
    fn test_unsigned() {
        let value = json!({"a": 12, "b": "34", "c": -1});
        assert_eq!(unsigned(&value, "a"), Some(12));
        assert_eq!(unsigned(&value, "b"), Some(34));
        assert_eq!(unsigned(&value, "c"), None);
    }
}
