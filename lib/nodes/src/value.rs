//! JSON value helpers shared by node implementations.

use serde_json::Value as JsonValue;

/// Resolves a dotted path (`"order.customer.name"`) inside a JSON
/// value. Array elements are addressable by numeric segments.
#[must_use]
pub fn lookup_path<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            JsonValue::Object(map) => map.get(segment)?,
            JsonValue::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }
    Some(current)
}

/// Coerces a JSON value to `f64`.
///
/// Numbers pass through; strings are parsed as decimals after grouping
/// separators (commas, underscores, spaces) are stripped; booleans map
/// to 1/0. Anything else fails.
#[must_use]
pub fn coerce_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '_' | ' '))
                .collect();
            cleaned.parse().ok()
        }
        JsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Returns true if the value is "empty": null, empty string, empty
/// array, or empty object.
#[must_use]
pub fn is_empty(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Renders a value as plain text for substring-style comparisons.
///
/// Strings come back without quotes; everything else uses its JSON
/// rendering.
#[must_use]
pub fn display_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_nested_path() {
        let value = json!({"order": {"items": [{"sku": "a-1"}]}});
        assert_eq!(
            lookup_path(&value, "order.items.0.sku"),
            Some(&json!("a-1"))
        );
        assert_eq!(lookup_path(&value, "order.missing"), None);
    }

    #[test]
    fn coerce_number_handles_grouped_strings() {
        assert_eq!(coerce_number(&json!("1,234.5")), Some(1234.5));
        assert_eq!(coerce_number(&json!("19.99")), Some(19.99));
        assert_eq!(coerce_number(&json!(42)), Some(42.0));
        assert_eq!(coerce_number(&json!(true)), Some(1.0));
        assert_eq!(coerce_number(&json!("not a number")), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    #[test]
    fn is_empty_classification() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(is_empty(&json!({})));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!("x")));
    }

    #[test]
    fn display_string_unquotes() {
        assert_eq!(display_string(&json!("abc")), "abc");
        assert_eq!(display_string(&json!(12)), "12");
    }
}
