// Structural validation of expression nodes
// Arity and static return-type checks run before any evaluation

use thiserror::Error;

use crate::ast::{Expression, ReturnType};
use crate::common_regex::{create_regex, RegexError};
use crate::expression_type::ExpressionType;

/// Structural errors raised while building or validating an expression tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("{0}")]
    Arity(String),

    #[error("{0}")]
    Type(String),

    #[error("{0}")]
    Syntax(String),

    #[error(transparent)]
    Regex(#[from] RegexError),

    #[error("{0} does not have an evaluator, it's not a built-in function or a customized function")]
    UnknownFunction(String),
}

/// Signature of a per-node validator stored on an evaluator.
pub type Validator = fn(&Expression) -> Result<(), ExpressionError>;

fn type_list(types: &[ReturnType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check the child count lies in `[min, max]` and every child's static type is
/// one of `types`. Children typed `Object` are only known at runtime and pass.
pub fn validate_arity_and_any_type(
    expr: &Expression,
    min: usize,
    max: usize,
    types: &[ReturnType],
) -> Result<(), ExpressionError> {
    let count = expr.children().len();
    if count < min {
        return Err(ExpressionError::Arity(format!(
            "{} should have at least {} children.",
            expr, min
        )));
    }
    if count > max {
        return Err(ExpressionError::Arity(format!(
            "{} can't have more than {} children.",
            expr, max
        )));
    }

    if types.is_empty() {
        return Ok(());
    }

    for child in expr.children() {
        let rt = child.return_type();
        if rt != ReturnType::Object && !types.contains(&rt) {
            let message = if types.len() == 1 {
                format!("{} is not a {} expression in {}.", child, types[0], expr)
            } else {
                format!(
                    "{} in {} is not any of [{}].",
                    child,
                    expr,
                    type_list(types)
                )
            };
            return Err(ExpressionError::Type(message));
        }
    }
    Ok(())
}

/// Positional check: the first `required.len()` children must match `required`
/// in order, the following ones may match `optional`.
pub fn validate_order(
    expr: &Expression,
    optional: &[ReturnType],
    required: &[ReturnType],
) -> Result<(), ExpressionError> {
    let children = expr.children();
    if children.len() < required.len() || children.len() > required.len() + optional.len() {
        let message = if optional.is_empty() {
            format!("{} should have {} children.", expr, required.len())
        } else {
            format!(
                "{} should have between {} and {} children.",
                expr,
                required.len(),
                required.len() + optional.len()
            )
        };
        return Err(ExpressionError::Arity(message));
    }

    let expected = required.iter().chain(optional.iter());
    for (child, ty) in children.iter().zip(expected) {
        let rt = child.return_type();
        if *ty != ReturnType::Object && rt != ReturnType::Object && rt != *ty {
            return Err(ExpressionError::Type(format!(
                "{} in {} is not a {}.",
                child, expr, ty
            )));
        }
    }
    Ok(())
}

// ── Shorthands ───────────────────────────────────────────────────────────────

pub fn validate_at_least_one(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, usize::MAX, &[])
}

pub fn validate_number(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, usize::MAX, &[ReturnType::Number])
}

pub fn validate_string(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, usize::MAX, &[ReturnType::String])
}

pub fn validate_binary(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 2, 2, &[])
}

pub fn validate_binary_number(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 2, 2, &[ReturnType::Number])
}

pub fn validate_two_or_more_than_two_numbers(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 2, usize::MAX, &[ReturnType::Number])
}

pub fn validate_binary_number_or_string(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 2, 2, &[ReturnType::Number, ReturnType::String])
}

/// One or more strings or numbers; null literals are untyped and pass.
pub fn validate_string_or_number_or_null(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, usize::MAX, &[ReturnType::String, ReturnType::Number])
}

pub fn validate_unary(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, 1, &[])
}

pub fn validate_unary_string(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, 1, &[ReturnType::String])
}

pub fn validate_unary_number(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 1, 1, &[ReturnType::Number])
}

pub fn validate_no_children(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 0, 0, &[])
}

// ── Special forms ────────────────────────────────────────────────────────────

/// `Accessor(name[, instance])` where `name` is a string literal.
pub fn validate_accessor(expr: &Expression) -> Result<(), ExpressionError> {
    let children = expr.children();
    let named = children
        .first()
        .and_then(|c| c.constant_value())
        .map_or(false, |v| v.is_string());
    if !named {
        return Err(ExpressionError::Syntax(format!(
            "{} must have a string as first argument.",
            expr
        )));
    }
    if children.len() > 2 {
        return Err(ExpressionError::Arity(format!(
            "{} has more than 2 children.",
            expr
        )));
    }
    if children.len() == 2 && children[1].return_type() != ReturnType::Object {
        return Err(ExpressionError::Type(format!(
            "{} must have an object as its second argument.",
            expr
        )));
    }
    Ok(())
}

/// Name bound by a comprehension's second child: a bare identifier `x`, or the
/// resolved form `$local.x`.
pub(crate) fn iterator_name(second: &Expression) -> Option<&str> {
    if !second.is(ExpressionType::Accessor) {
        return None;
    }
    let name = second.children().first()?.constant_value()?.as_str()?;
    match second.children() {
        [_] => Some(name),
        [_, scope] if is_local_root(scope) => Some(name),
        _ => None,
    }
}

fn is_local_root(expr: &Expression) -> bool {
    expr.is(ExpressionType::Accessor)
        && expr.children().len() == 1
        && expr.children()[0].constant_value().and_then(|v| v.as_str()) == Some("$local")
}

/// `foreach(collection, iterator, body)` and the other comprehensions.
pub fn validate_foreach(expr: &Expression) -> Result<(), ExpressionError> {
    let children = expr.children();
    if children.len() != 3 {
        return Err(ExpressionError::Arity(format!(
            "{} expect 3 parameters, found {}",
            expr.expr_type(),
            children.len()
        )));
    }
    let second = &children[1];
    if iterator_name(second).is_none() {
        return Err(ExpressionError::Syntax(format!(
            "Second parameter of {} is not an identifier : {}",
            expr.expr_type(),
            second
        )));
    }
    Ok(())
}

/// `isMatch(text, pattern)`; a literal pattern is compiled up front so a bad
/// pattern fails at build time.
pub fn validate_is_match(expr: &Expression) -> Result<(), ExpressionError> {
    validate_arity_and_any_type(expr, 2, 2, &[ReturnType::String])?;
    if let Some(pattern) = expr.children()[1].constant_value().and_then(|v| v.as_str()) {
        create_regex(pattern)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn call(name: &str, children: Vec<Expression>) -> Expression {
        Expression::unchecked(name, children)
    }

    #[test]
    fn test_arity_bounds() {
        let expr = call("+", vec![Expression::constant(1)]);
        let err = validate_arity_and_any_type(&expr, 2, 3, &[]).unwrap_err();
        assert_eq!(err.to_string(), "+(1) should have at least 2 children.");

        let expr = call("length", vec![Expression::constant("a"), Expression::constant("b")]);
        let err = validate_unary(&expr).unwrap_err();
        assert_eq!(err.to_string(), "length('a', 'b') can't have more than 1 children.");
    }

    #[test]
    fn test_type_mismatch_names_child() {
        let expr = call("+", vec![Expression::constant(1), Expression::constant("x")]);
        let err = validate_two_or_more_than_two_numbers(&expr).unwrap_err();
        assert_eq!(err.to_string(), "'x' is not a number expression in (1 + 'x').");
    }

    #[test]
    fn test_object_children_skip_static_check() {
        let expr = call("+", vec![Expression::accessor("a", None), Expression::constant(2)]);
        assert!(validate_two_or_more_than_two_numbers(&expr).is_ok());
    }

    #[test]
    fn test_validate_order_positions() {
        let expr = call(
            "substring",
            vec![Expression::constant("abc"), Expression::constant("x")],
        );
        let err = validate_order(&expr, &[ReturnType::Number], &[ReturnType::String, ReturnType::Number])
            .unwrap_err();
        assert_eq!(err.to_string(), "'x' in substring('abc', 'x') is not a number.");

        let expr = call("substring", vec![Expression::constant("abc")]);
        let err = validate_order(&expr, &[ReturnType::Number], &[ReturnType::String, ReturnType::Number])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "substring('abc') should have between 2 and 3 children."
        );
    }

    #[test]
    fn test_accessor_requires_name() {
        let bad = call("Accessor", vec![Expression::constant(1)]);
        assert!(validate_accessor(&bad).is_err());
        let good = call("Accessor", vec![Expression::constant(Value::from("a"))]);
        assert!(validate_accessor(&good).is_ok());
    }

    #[test]
    fn test_foreach_shape() {
        let expr = call(
            "foreach",
            vec![Expression::accessor("items", None), Expression::constant(1)],
        );
        assert_eq!(
            validate_foreach(&expr).unwrap_err().to_string(),
            "foreach expect 3 parameters, found 2"
        );

        let expr = call(
            "foreach",
            vec![
                Expression::accessor("items", None),
                Expression::constant("x"),
                Expression::accessor("x", None),
            ],
        );
        assert_eq!(
            validate_foreach(&expr).unwrap_err().to_string(),
            "Second parameter of foreach is not an identifier : 'x'"
        );
    }

    #[test]
    fn test_is_match_rejects_bad_literal() {
        let expr = call(
            "isMatch",
            vec![Expression::constant("abc"), Expression::constant("(unclosed")],
        );
        assert!(matches!(validate_is_match(&expr), Err(ExpressionError::Regex(_))));
    }
}
