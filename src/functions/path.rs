// Path operators
// Property and index reads plus in-place assignment through a path expression

use super::{child_text, integer};
use crate::ast::{Expression, ReturnType};
use crate::evaluator::{EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::extensions::{access_index, access_property};
use crate::signature;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Accessor => ExpressionEvaluator::custom(ty, accessor, ReturnType::Object, signature::validate_accessor),
        T::Element => ExpressionEvaluator::custom(ty, element, ReturnType::Object, signature::validate_binary),
        T::SetPathToValue => {
            ExpressionEvaluator::custom(ty, set_path_to_value, ReturnType::Object, signature::validate_binary)
        }
        _ => return None,
    };
    Some(evaluator)
}

/// `instance.name`, or `name` against the state; absent paths read as null.
fn accessor(expr: &Expression, state: &mut Value) -> EvalResult {
    let children = expr.children();
    let Some(property) = children
        .first()
        .and_then(|c| c.constant_value())
        .and_then(|v| v.as_str())
    else {
        return Ok(Value::Null);
    };
    let property = property.to_string();
    let result = match children.get(1) {
        Some(instance) => {
            let instance = instance.try_evaluate(state)?;
            access_property(&instance, &property)
        }
        None => access_property(state, &property),
    };
    result.map_err(EvaluationError::Reference)
}

/// `instance[index]`: integers index lists, strings name map properties.
fn element(expr: &Expression, state: &mut Value) -> EvalResult {
    let [instance, index] = expr.children() else {
        return Ok(Value::Null);
    };
    let instance_value = instance.try_evaluate(state)?;
    let index_value = index.try_evaluate(state)?;
    let result = if let Some(i) = integer(&index_value) {
        access_index(&instance_value, i)
    } else if let Some(name) = index_value.as_str() {
        access_property(&instance_value, name)
    } else {
        return Err(EvaluationError::Type(format!(
            "Could not coerce {} to an int or string.",
            index
        )));
    };
    result.map_err(EvaluationError::Reference)
}

// ── Assignment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Key {
    Name(String),
    Index(usize),
}

/// One step of an assignment path and the printed form of the container it
/// steps into.
#[derive(Debug)]
struct Segment {
    key: Key,
    container: String,
}

/// `setPathToValue(path, value)` stores `value` at `path` inside the state and
/// returns it. Missing containers are created; lists are padded with nulls.
fn set_path_to_value(expr: &Expression, state: &mut Value) -> EvalResult {
    let [path, value_expr] = expr.children() else {
        return Ok(Value::Null);
    };
    let value = value_expr.try_evaluate(state)?;

    let mut segments = Vec::new();
    collect_segments(path, state, &mut segments)?;
    tracing::trace!(path = %path, depth = segments.len(), "assigning through path");
    assign(state, &segments, value.clone())?;
    Ok(value)
}

/// Root-first segments of `path`; index expressions are evaluated now.
fn collect_segments(
    path: &Expression,
    state: &mut Value,
    segments: &mut Vec<Segment>,
) -> Result<(), EvaluationError> {
    let children = path.children();
    if path.is(ExpressionType::Accessor) {
        let name = children
            .first()
            .and_then(|c| c.constant_value())
            .and_then(|v| v.as_str())
            .ok_or_else(|| not_settable(path))?
            .to_string();
        let container = match children.get(1) {
            Some(instance) => {
                collect_segments(instance, state, segments)?;
                instance.to_string()
            }
            None => String::new(),
        };
        segments.push(Segment {
            key: Key::Name(name),
            container,
        });
        return Ok(());
    }

    if path.is(ExpressionType::Element) && children.len() == 2 {
        let index = children[1].try_evaluate(state)?;
        let key = if let Some(name) = index.as_str() {
            Key::Name(name.to_string())
        } else {
            match integer(&index).and_then(|i| usize::try_from(i).ok()) {
                Some(i) => Key::Index(i),
                None => {
                    return Err(EvaluationError::Reference(format!(
                        "{} is not a valid path.",
                        child_text(path, 0)
                    )))
                }
            }
        };
        collect_segments(&children[0], state, segments)?;
        segments.push(Segment {
            key,
            container: child_text(path, 0),
        });
        return Ok(());
    }

    Err(not_settable(path))
}

fn not_settable(path: &Expression) -> EvaluationError {
    EvaluationError::Reference(format!(
        "{} is not a path that can be set to a value.",
        path
    ))
}

/// Container shape the next segment needs. Existing maps and lists are kept;
/// only a null slot becomes a list, so indexing into a scalar fails.
fn prepare(slot: &mut Value, next: &Key) {
    match next {
        Key::Name(_) if !slot.is_map() => *slot = Value::empty_map(),
        Key::Index(_) if slot.is_null() => *slot = Value::list(Vec::new()),
        _ => {}
    }
}

fn assign(current: &mut Value, segments: &[Segment], value: Value) -> Result<(), EvaluationError> {
    let Some((segment, rest)) = segments.split_first() else {
        *current = value;
        return Ok(());
    };

    let slot = match &segment.key {
        Key::Name(name) => {
            if !current.is_map() {
                *current = Value::empty_map();
            }
            let Some(map) = current.as_map_mut() else {
                return Err(EvaluationError::Reference(format!(
                    "{} is not a valid path.",
                    segment.container
                )));
            };
            map.entry(name.clone()).or_insert(Value::Null)
        }
        Key::Index(index) => {
            let Some(items) = current.as_list_mut() else {
                return Err(EvaluationError::Reference(format!(
                    "{} is not a list.",
                    segment.container
                )));
            };
            if items.len() <= *index {
                items.resize(*index + 1, Value::Null);
            }
            &mut items[*index]
        }
    };

    if let Some(next) = rest.first() {
        prepare(slot, &next.key);
    }
    assign(slot, rest, value)
}

#[cfg(test)]
mod tests {
    use crate::ast::Expression;
    use crate::evaluator::EvaluationError;
    use crate::expression_type::ExpressionType;
    use crate::value;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn element(instance: Expression, index: Expression) -> Expression {
        Expression::make(ExpressionType::Element, vec![instance, index]).unwrap()
    }

    fn set(path: Expression, value: Expression) -> Expression {
        Expression::make(ExpressionType::SetPathToValue, vec![path, value]).unwrap()
    }

    #[test]
    fn test_accessor_reads() {
        let state = value!({"user": {"Name": "Ann"}, "n": 1});
        let name = Expression::accessor("name", Some(Expression::accessor("user", None)));
        assert_eq!(name.evaluate(&state), Ok(value!("Ann")));
        assert_eq!(Expression::accessor("missing", None).evaluate(&state), Ok(Value::Null));
        let deep = Expression::accessor("x", Some(Expression::accessor("missing", None)));
        assert_eq!(deep.evaluate(&state), Ok(Value::Null));
    }

    #[test]
    fn test_element_reads() {
        let state = value!({"items": ["a", "b"], "obj": {"k": 1}});
        let items = || Expression::accessor("items", None);
        assert_eq!(element(items(), Expression::constant(1)).evaluate(&state), Ok(value!("b")));
        assert_eq!(
            element(Expression::accessor("obj", None), Expression::constant("k")).evaluate(&state),
            Ok(value!(1))
        );
        assert_eq!(
            element(items(), Expression::constant(5)).evaluate(&state),
            Err(EvaluationError::Reference("5 is out of range for [\"a\",\"b\"]".to_string()))
        );
        assert_eq!(
            element(items(), Expression::constant(true)).evaluate(&state),
            Err(EvaluationError::Type("Could not coerce true to an int or string.".to_string()))
        );
    }

    #[test]
    fn test_set_creates_containers() {
        let mut state = value!({});
        let path = Expression::accessor("b", Some(Expression::accessor("a", None)));
        let result = set(path, Expression::constant(3)).try_evaluate(&mut state);
        assert_eq!(result, Ok(value!(3)));
        assert_eq!(state, value!({"a": {"b": 3}}));

        let indexed = element(Expression::accessor("list", None), Expression::constant(2));
        set(indexed, Expression::constant("x")).try_evaluate(&mut state).unwrap();
        assert_eq!(state.get("list"), Some(&value!([null, null, "x"])));
    }

    #[test]
    fn test_set_preserves_siblings() {
        let mut state = value!({"a": {"keep": 1, "list": [1, 2]}});
        let path = element(
            Expression::accessor("list", Some(Expression::accessor("a", None))),
            Expression::constant(0),
        );
        set(path, Expression::constant(9)).try_evaluate(&mut state).unwrap();
        assert_eq!(state, value!({"a": {"keep": 1, "list": [9, 2]}}));
    }

    #[test]
    fn test_set_index_into_scalar_fails() {
        let mut state = value!({"a": "text"});
        let path = element(Expression::accessor("a", None), Expression::constant(0));
        let err = set(path, Expression::constant(1)).try_evaluate(&mut state).unwrap_err();
        assert_eq!(err, EvaluationError::Reference("a is not a list.".to_string()));
        assert_eq!(state, value!({"a": "text"}));
    }

    #[test]
    fn test_set_rejects_non_paths() {
        let mut state = value!({});
        let path = Expression::make(
            ExpressionType::Add,
            vec![Expression::constant(1), Expression::constant(2)],
        )
        .unwrap();
        let err = set(path, Expression::constant(1)).try_evaluate(&mut state).unwrap_err();
        assert_eq!(err.to_string(), "(1 + 2) is not a path that can be set to a value.");
    }

    #[test]
    fn test_set_index_on_root_map_fails() {
        let mut state = value!({"a": 1});
        let path = element(
            Expression::accessor("a", None),
            Expression::accessor("missing", None),
        );
        let err = set(path, Expression::constant(1)).try_evaluate(&mut state).unwrap_err();
        assert_eq!(err.to_string(), "a is not a valid path.");
    }
}
