// Tree-walking and polymorphic access utilities
// Reference extraction plus uniform property/index reads over state values

use std::collections::BTreeSet;

use crate::ast::Expression;
use crate::expression_type::ExpressionType;
use crate::scope::{GLOBAL, LOCAL};
use crate::signature::iterator_name;
use crate::value::Value;

/// Every state path `expr` reads, e.g. `a.b[c]` contributes `a.b` and `c`.
///
/// Works on raw and scope-resolved trees alike; iterator-local paths are left
/// out and `$global.` prefixes are removed.
pub fn references(expr: &Expression) -> BTreeSet<String> {
    let (path, mut refs) = reference_walk(expr);
    refs.extend(path);
    refs.into_iter().filter_map(normalize).collect()
}

fn normalize(path: String) -> Option<String> {
    let mut rest = path.as_str();
    while let Some(stripped) = rest.strip_prefix(GLOBAL) {
        match stripped.strip_prefix('.') {
            Some(tail) => rest = tail,
            None if stripped.is_empty() => return None,
            None => break,
        }
    }
    if rest.starts_with(LOCAL) {
        return None;
    }
    Some(rest.to_string())
}

/// Returns the path this node denotes (if it is a path) and the paths read
/// beneath it.
fn reference_walk(expr: &Expression) -> (Option<String>, BTreeSet<String>) {
    let children = expr.children();

    if expr.is(ExpressionType::Accessor) {
        let Some(property) = children
            .first()
            .and_then(|c| c.constant_value())
            .and_then(|v| v.as_str())
        else {
            return (None, BTreeSet::new());
        };
        return match children.get(1) {
            None => (Some(property.to_string()), BTreeSet::new()),
            Some(instance) => {
                let (path, refs) = reference_walk(instance);
                (path.map(|p| format!("{}.{}", p, property)), refs)
            }
        };
    }

    if expr.is(ExpressionType::Element) && children.len() == 2 {
        let (mut path, mut refs) = reference_walk(&children[0]);
        if let Some(p) = path.as_mut() {
            match children[1].constant_value() {
                Some(Value::String(s)) => {
                    p.push('.');
                    p.push_str(s);
                }
                Some(index) => p.push_str(&format!("[{}]", index)),
                None => {
                    refs.insert(p.clone());
                }
            }
        }
        let (index_path, index_refs) = reference_walk(&children[1]);
        refs.extend(index_refs);
        refs.extend(index_path);
        if children[1].constant_value().is_none() {
            // a computed index makes the whole element path unknowable
            path = None;
        }
        return (path, refs);
    }

    if expr.kind().map_or(false, |k| k.is_comprehension()) && children.len() == 3 {
        if let Some(iterator) = iterator_name(&children[1]) {
            let (collection_path, mut refs) = reference_walk(&children[0]);
            refs.extend(collection_path);

            let (body_path, mut body_refs) = reference_walk(&children[2]);
            body_refs.extend(body_path);
            refs.extend(body_refs.into_iter().filter(|r| !is_local_to(r, iterator)));
            return (None, refs);
        }
    }

    let mut refs = BTreeSet::new();
    for child in children {
        let (path, child_refs) = reference_walk(child);
        refs.extend(child_refs);
        refs.extend(path);
    }
    (None, refs)
}

fn is_local_to(reference: &str, iterator: &str) -> bool {
    reference == iterator
        || reference
            .strip_prefix(iterator)
            .map_or(false, |rest| rest.starts_with('.') || rest.starts_with('['))
}

/// Read `property` from `instance`.
///
/// Maps match the exact key first, then case-insensitively. Anything that is
/// not a map yields `Null`; absence is never an error.
pub fn access_property(instance: &Value, property: &str) -> Result<Value, String> {
    let Some(map) = instance.as_map() else {
        return Ok(Value::Null);
    };
    if let Some(value) = map.get(property) {
        return Ok(value.clone());
    }
    Ok(map
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(property))
        .map(|(_, v)| v.clone())
        .unwrap_or_default())
}

/// Read position `index` from a list.
pub fn access_index(instance: &Value, index: i64) -> Result<Value, String> {
    match instance {
        Value::Null => Ok(Value::Null),
        Value::List(_) => usize::try_from(index)
            .ok()
            .and_then(|i| instance.get_index(i))
            .cloned()
            .ok_or_else(|| format!("{} is out of range for {}", index, instance)),
        _ => Err(format!("{} is not a collection.", instance)),
    }
}

/// Copy of `instance` with `property` set; non-maps become maps.
pub fn set_property(instance: &Value, property: &str, value: Value) -> Value {
    let mut result = if instance.is_map() {
        instance.clone()
    } else {
        Value::empty_map()
    };
    if let Some(map) = result.as_map_mut() {
        map.insert(property.to_string(), value);
    }
    result
}
