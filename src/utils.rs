// Utility functions and helpers
// Truthiness, emptiness and string rendering shared by the operator families

use crate::value::{number_to_string, Value};

/// Logical truth: booleans are themselves, null is false, everything else true.
pub fn is_logic_true(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        _ => true,
    }
}

/// Null, "", [] and {} are empty.
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

/// Text form used by `string()` and string concatenation: strings are raw,
/// null is empty, containers are JSON.
pub fn to_plain_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Convert value to list (wraps non-lists)
pub fn to_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.as_ref().clone(),
        Value::Null => Vec::new(),
        _ => vec![value.clone()],
    }
}

/// Flatten nested lists up to `depth` levels.
pub fn flatten(items: &[Value], depth: usize) -> Vec<Value> {
    let mut result = Vec::new();
    for item in items {
        match item {
            Value::List(inner) if depth > 0 => result.extend(flatten(inner, depth - 1)),
            _ => result.push(item.clone()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value;

    #[test]
    fn test_logic_truth() {
        assert!(is_logic_true(&value!(0)));
        assert!(is_logic_true(&value!("")));
        assert!(!is_logic_true(&value!(false)));
        assert!(!is_logic_true(&Value::Null));
    }

    #[test]
    fn test_plain_string() {
        assert_eq!(to_plain_string(&value!(3)), "3");
        assert_eq!(to_plain_string(&value!(1.5)), "1.5");
        assert_eq!(to_plain_string(&value!("a")), "a");
        assert_eq!(to_plain_string(&value!({"a": [1]})), r#"{"a":[1]}"#);
        assert_eq!(to_plain_string(&Value::Null), "");
    }

    #[test]
    fn test_to_list() {
        assert_eq!(to_list(&value!(42)).len(), 1);
        assert_eq!(to_list(&value!([1, 2])).len(), 2);
        assert!(to_list(&Value::Null).is_empty());
    }

    #[test]
    fn test_flatten() {
        let nested = value!([1, [2, [3]], 4]);
        let items = nested.as_list().unwrap();
        assert_eq!(Value::list(flatten(items, 1)), value!([1, 2, [3], 4]));
        assert_eq!(Value::list(flatten(items, usize::MAX)), value!([1, 2, 3, 4]));
    }
}
