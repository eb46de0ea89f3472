// Comparison and logic operators
// Relational tests, deep equality, membership and short-circuit boolean logic

use std::cmp::Ordering;

use super::arg;
use crate::ast::{Expression, ReturnType};
use crate::evaluator::{self, evaluate_children, EvalResult, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::extensions;
use crate::signature;
use crate::utils::{is_empty, is_logic_true};
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::LessThan => relational(ty, less_than),
        T::LessThanOrEqual => relational(ty, less_than_or_equal),
        T::GreaterThan => relational(ty, greater_than),
        T::GreaterThanOrEqual => relational(ty, greater_than_or_equal),
        T::Equal => ExpressionEvaluator::comparison(ty, is_equal, signature::validate_binary, None),
        T::NotEqual => {
            ExpressionEvaluator::comparison(ty, is_not_equal, signature::validate_binary, None)
        }
        T::Exists => ExpressionEvaluator::comparison(ty, exists, signature::validate_unary, None),
        T::Empty => ExpressionEvaluator::comparison(ty, empty, signature::validate_unary, None),
        T::Contains => ExpressionEvaluator::custom(
            ty,
            contains,
            ReturnType::Boolean,
            signature::validate_binary,
        ),
        T::And => ExpressionEvaluator::custom(
            ty,
            and,
            ReturnType::Boolean,
            signature::validate_at_least_one,
        ),
        T::Or => ExpressionEvaluator::custom(
            ty,
            or,
            ReturnType::Boolean,
            signature::validate_at_least_one,
        ),
        T::Not => ExpressionEvaluator::custom(ty, not, ReturnType::Boolean, signature::validate_unary),
        T::If => ExpressionEvaluator::custom(ty, if_then_else, ReturnType::Object, validate_if),
        _ => return None,
    };
    Some(evaluator)
}

fn relational(ty: ExpressionType, func: fn(&[Value]) -> bool) -> ExpressionEvaluator {
    ExpressionEvaluator::comparison(
        ty,
        func,
        signature::validate_binary_number_or_string,
        Some(evaluator::verify_number_or_string),
    )
}

/// Order two numbers or two strings; anything else is unordered.
fn order(args: &[Value]) -> Option<Ordering> {
    match (arg(args, 0), arg(args, 1)) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn less_than(args: &[Value]) -> bool {
    order(args) == Some(Ordering::Less)
}

fn less_than_or_equal(args: &[Value]) -> bool {
    matches!(order(args), Some(Ordering::Less | Ordering::Equal))
}

fn greater_than(args: &[Value]) -> bool {
    order(args) == Some(Ordering::Greater)
}

fn greater_than_or_equal(args: &[Value]) -> bool {
    matches!(order(args), Some(Ordering::Greater | Ordering::Equal))
}

/// Deep equality; null equals only null and any two empty lists or maps are equal.
pub(crate) fn is_equal(args: &[Value]) -> bool {
    let (a, b) = (arg(args, 0), arg(args, 1));
    match (a, b) {
        (Value::List(x), Value::List(y)) if x.is_empty() && y.is_empty() => true,
        (Value::Map(x), Value::Map(y)) if x.is_empty() && y.is_empty() => true,
        _ => a == b,
    }
}

fn is_not_equal(args: &[Value]) -> bool {
    !is_equal(args)
}

fn exists(args: &[Value]) -> bool {
    !arg(args, 0).is_null()
}

fn empty(args: &[Value]) -> bool {
    is_empty(arg(args, 0))
}

/// Substring, list membership, map key, or a readable property. Errors read as
/// "not found".
fn contains(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = match evaluate_children(expr, state, None) {
        Ok(args) => args,
        Err(e) => {
            tracing::trace!(expression = %expr, error = %e, "contains operand failed");
            return Ok(Value::Bool(false));
        }
    };
    let found = match (arg(&args, 0), arg(&args, 1)) {
        (Value::String(haystack), Value::String(needle)) => haystack.contains(needle.as_ref()),
        (Value::List(items), item) => items.iter().any(|i| i == item),
        (Value::Map(map), Value::String(key)) => map.get(key.as_ref()).map_or(false, |v| !v.is_null()),
        (instance, Value::String(property)) => extensions::access_property(instance, property)
            .map_or(false, |v| !v.is_null()),
        _ => false,
    };
    Ok(Value::Bool(found))
}

/// Stops at the first false or failing child; failures read as false.
fn and(expr: &Expression, state: &mut Value) -> EvalResult {
    for child in expr.children() {
        match child.try_evaluate(state) {
            Ok(value) if is_logic_true(&value) => {}
            Ok(_) => return Ok(Value::Bool(false)),
            Err(e) => {
                tracing::trace!(expression = %child, error = %e, "and operand failed");
                return Ok(Value::Bool(false));
            }
        }
    }
    Ok(Value::Bool(true))
}

/// Stops at the first true child; failures read as false.
fn or(expr: &Expression, state: &mut Value) -> EvalResult {
    for child in expr.children() {
        match child.try_evaluate(state) {
            Ok(value) if is_logic_true(&value) => return Ok(Value::Bool(true)),
            Ok(_) => {}
            Err(e) => {
                tracing::trace!(expression = %child, error = %e, "or operand failed");
            }
        }
    }
    Ok(Value::Bool(false))
}

/// A failing operand negates to true.
fn not(expr: &Expression, state: &mut Value) -> EvalResult {
    let Some(child) = expr.children().first() else {
        return Ok(Value::Bool(true));
    };
    match child.try_evaluate(state) {
        Ok(value) => Ok(Value::Bool(!is_logic_true(&value))),
        Err(e) => {
            tracing::trace!(expression = %child, error = %e, "not operand failed");
            Ok(Value::Bool(true))
        }
    }
}

fn validate_if(expr: &Expression) -> Result<(), signature::ExpressionError> {
    signature::validate_arity_and_any_type(expr, 3, 3, &[])
}

/// Only the branch taken is evaluated; a failing condition takes the else branch.
fn if_then_else(expr: &Expression, state: &mut Value) -> EvalResult {
    let [condition, then, otherwise] = expr.children() else {
        return Err(format!("{} should have 3 children.", expr).into());
    };
    let branch = match condition.try_evaluate(state) {
        Ok(value) if is_logic_true(&value) => then,
        _ => otherwise,
    };
    branch.try_evaluate(state)
}
