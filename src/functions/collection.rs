// Collection operators
// Set algebra, slicing, ordering and reshaping over lists

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::{arg, child_text, integer};
use crate::ast::{Expression, ReturnType};
use crate::evaluator::{self, evaluate_children, EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::extensions::access_property;
use crate::signature::{self, ExpressionError};
use crate::utils;
use crate::value::Value;

/// Nesting removed by `flatten` when no depth is given.
const DEFAULT_FLATTEN_DEPTH: usize = 100;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Union => ExpressionEvaluator::apply(
            ty,
            union,
            ReturnType::Object,
            signature::validate_at_least_one,
            Some(evaluator::verify_list),
        ),
        T::Intersection => ExpressionEvaluator::apply(
            ty,
            intersection,
            ReturnType::Object,
            signature::validate_at_least_one,
            Some(evaluator::verify_list),
        ),
        T::Skip => ExpressionEvaluator::apply(
            ty,
            skip,
            ReturnType::Object,
            validate_sequence_and_count,
            Some(verify_list_and_integer),
        ),
        T::Take => ExpressionEvaluator::apply(
            ty,
            take,
            ReturnType::Object,
            validate_sequence_and_count,
            Some(verify_sequence_and_integer),
        ),
        T::SubArray => ExpressionEvaluator::custom(ty, sub_array, ReturnType::Object, validate_sub_array),
        T::SortBy => ExpressionEvaluator::apply_with_error(
            ty,
            sort_by,
            ReturnType::Object,
            validate_list_and_property,
            None,
        ),
        T::SortByDescending => ExpressionEvaluator::apply_with_error(
            ty,
            sort_by_descending,
            ReturnType::Object,
            validate_list_and_property,
            None,
        ),
        T::IndicesAndValues => ExpressionEvaluator::apply(
            ty,
            indices_and_values,
            ReturnType::Object,
            signature::validate_unary,
            Some(evaluator::verify_list),
        ),
        T::Flatten => ExpressionEvaluator::apply(
            ty,
            flatten,
            ReturnType::Object,
            validate_list_and_depth,
            Some(verify_list_and_integer),
        ),
        T::Unique => ExpressionEvaluator::apply(
            ty,
            unique,
            ReturnType::Object,
            signature::validate_unary,
            Some(evaluator::verify_list),
        ),
        T::Reverse => ExpressionEvaluator::apply(
            ty,
            reverse,
            ReturnType::Object,
            signature::validate_unary,
            Some(verify_sequence),
        ),
        T::First => ExpressionEvaluator::apply(
            ty,
            first,
            ReturnType::Object,
            signature::validate_unary,
            None,
        ),
        T::Last => ExpressionEvaluator::apply(
            ty,
            last,
            ReturnType::Object,
            signature::validate_unary,
            None,
        ),
        T::CreateArray => ExpressionEvaluator::apply(
            ty,
            create_array,
            ReturnType::Object,
            validate_any_count,
            None,
        ),
        T::Array => ExpressionEvaluator::apply(
            ty,
            create_array,
            ReturnType::Object,
            signature::validate_unary,
            Some(evaluator::verify_string),
        ),
        _ => return None,
    };
    Some(evaluator)
}

// ── Validators and verifiers ─────────────────────────────────────────────────

fn validate_any_count(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_arity_and_any_type(expr, 0, usize::MAX, &[])
}

fn validate_sequence_and_count(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[], &[ReturnType::Object, ReturnType::Number])
}

fn validate_list_and_depth(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::Number], &[ReturnType::Object])
}

fn validate_list_and_property(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[ReturnType::Object])
}

fn validate_sub_array(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::Number],
        &[ReturnType::Object, ReturnType::Number],
    )
}

fn verify_sequence(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_list() && !value.is_string()).then(|| format!("{} is not a list or string.", expr))
}

fn verify_list_and_integer(value: &Value, expr: &Expression, pos: usize) -> Option<String> {
    match pos {
        0 => evaluator::verify_list(value, expr, pos),
        _ => evaluator::verify_integer(value, expr, pos),
    }
}

fn verify_sequence_and_integer(value: &Value, expr: &Expression, pos: usize) -> Option<String> {
    match pos {
        0 => verify_sequence(value, expr, pos),
        _ => evaluator::verify_integer(value, expr, pos),
    }
}

// ── Set algebra ──────────────────────────────────────────────────────────────

fn list(value: &Value) -> &[Value] {
    value.as_list().map_or(&[], |items| items.as_slice())
}

fn push_unique(items: &mut Vec<Value>, item: &Value) {
    if !items.contains(item) {
        items.push(item.clone());
    }
}

fn union(args: &[Value]) -> Value {
    let mut result = Vec::new();
    for item in args.iter().flat_map(list) {
        push_unique(&mut result, item);
    }
    Value::list(result)
}

/// Items of the first list present in every other list.
fn intersection(args: &[Value]) -> Value {
    let mut result = Vec::new();
    let Some((head, rest)) = args.split_first() else {
        return Value::list(result);
    };
    for item in list(head) {
        if rest.iter().all(|other| list(other).contains(item)) {
            push_unique(&mut result, item);
        }
    }
    Value::list(result)
}

fn unique(args: &[Value]) -> Value {
    let mut result = Vec::new();
    for item in list(arg(args, 0)) {
        push_unique(&mut result, item);
    }
    Value::list(result)
}

// ── Slicing ──────────────────────────────────────────────────────────────────

/// `n` clamped into `0..=len`.
fn clamp(n: &Value, len: usize) -> usize {
    integer(n).map_or(0, |n| n.clamp(0, len as i64) as usize)
}

fn skip(args: &[Value]) -> Value {
    let items = list(arg(args, 0));
    let start = clamp(arg(args, 1), items.len());
    Value::list(items[start..].to_vec())
}

fn take(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => {
            let count = clamp(arg(args, 1), s.chars().count());
            Value::from(s.chars().take(count).collect::<String>())
        }
        other => {
            let items = list(other);
            let count = clamp(arg(args, 1), items.len());
            Value::list(items[..count].to_vec())
        }
    }
}

/// `subArray(list, start[, end])`; positions outside the list are errors.
fn sub_array(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let Some(items) = arg(&args, 0).as_list() else {
        return Err(EvaluationError::Type(format!("{} is not array.", child_text(expr, 0))));
    };
    let bound = |pos: usize| -> Result<usize, EvaluationError> {
        let value = arg(&args, pos);
        let n = integer(value).ok_or_else(|| {
            EvaluationError::Type(format!("{} is not an integer.", child_text(expr, pos)))
        })?;
        if n < 0 || n as usize > items.len() {
            return Err(EvaluationError::Evaluation(format!(
                "{}={} which is out of range for {}",
                child_text(expr, pos),
                n,
                arg(&args, 0)
            )));
        }
        Ok(n as usize)
    };
    let start = bound(1)?;
    let end = if args.len() > 2 { bound(2)? } else { items.len() };
    let slice = items.get(start..end.max(start)).unwrap_or_default();
    Ok(Value::list(slice.to_vec()))
}

// ── Ordering ─────────────────────────────────────────────────────────────────

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) => 5,
    }
}

/// Total order used by `sortBy`: by kind, then naturally within a kind.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn sorted(args: &[Value]) -> Result<Vec<Value>, String> {
    let Some(items) = arg(args, 0).as_list() else {
        return Err(format!("{} is not array.", arg(args, 0)));
    };
    let mut items = items.to_vec();
    match args.get(1).and_then(Value::as_str) {
        Some(property) => {
            let mut keyed = items
                .into_iter()
                .map(|item| -> Result<(Value, Value), String> {
                    Ok((access_property(&item, property)?, item))
                })
                .collect::<Result<Vec<_>, String>>()?;
            keyed.sort_by(|(a, _), (b, _)| compare(a, b));
            items = keyed.into_iter().map(|(_, item)| item).collect();
        }
        None => items.sort_by(compare),
    }
    Ok(items)
}

fn sort_by(args: &[Value]) -> Result<Value, String> {
    sorted(args).map(Value::list)
}

fn sort_by_descending(args: &[Value]) -> Result<Value, String> {
    let mut items = sorted(args)?;
    items.reverse();
    Ok(Value::list(items))
}

// ── Reshaping ────────────────────────────────────────────────────────────────

fn indices_and_values(args: &[Value]) -> Value {
    let pairs = list(arg(args, 0))
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let mut entry = IndexMap::with_capacity(2);
            entry.insert("index".to_string(), Value::from(index));
            entry.insert("value".to_string(), value.clone());
            Value::map(entry)
        })
        .collect();
    Value::list(pairs)
}

fn flatten(args: &[Value]) -> Value {
    let depth = match args.get(1) {
        Some(depth) => integer(depth).map_or(0, |d| d.max(0) as usize),
        None => DEFAULT_FLATTEN_DEPTH,
    };
    Value::list(utils::flatten(list(arg(args, 0)), depth))
}

fn reverse(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::from(s.chars().rev().collect::<String>()),
        other => Value::list(list(other).iter().rev().cloned().collect()),
    }
}

fn first(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => s.chars().next().map(|c| c.to_string()).into(),
        Value::List(items) => items.first().cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}

fn last(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => s.chars().last().map(|c| c.to_string()).into(),
        Value::List(items) => items.last().cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}

fn create_array(args: &[Value]) -> Value {
    Value::list(args.to_vec())
}
