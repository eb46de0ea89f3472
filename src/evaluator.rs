// Expression evaluators
// The (strategy, return type, validator) triple that gives a node its behavior

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ast::{Expression, ReturnType};
use crate::datetime;
use crate::signature::{self, ExpressionError, Validator};
use crate::value::Value;

/// Runtime evaluation errors.
///
/// Evaluation never panics; every data-level failure surfaces here and is
/// recoverable by the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    /// An argument had the wrong runtime shape.
    #[error("{0}")]
    Type(String),

    /// A path or index could not be followed.
    #[error("{0}")]
    Reference(String),

    #[error("{0}")]
    Evaluation(String),
}

impl EvaluationError {
    pub fn message(&self) -> &str {
        match self {
            EvaluationError::Type(m)
            | EvaluationError::Reference(m)
            | EvaluationError::Evaluation(m) => m,
        }
    }
}

impl From<String> for EvaluationError {
    fn from(message: String) -> Self {
        EvaluationError::Evaluation(message)
    }
}

impl From<datetime::DateTimeError> for EvaluationError {
    fn from(e: datetime::DateTimeError) -> Self {
        EvaluationError::Evaluation(e.to_string())
    }
}

pub type EvalResult = Result<Value, EvaluationError>;

/// Per-argument runtime check: `(value, child, position) -> error message`.
pub type Verifier = fn(&Value, &Expression, usize) -> Option<String>;

/// Evaluation body with full access to the node and the state.
pub type CustomFn = fn(&Expression, &mut Value) -> EvalResult;

/// Host-supplied closure wrapped as an expression.
pub type LambdaFn = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// How an evaluator computes its value.
///
/// Most operators are a pure function over already-evaluated arguments; the
/// variant records how arguments are fed to it and how failures are treated.
#[derive(Clone)]
pub enum Strategy {
    /// `func(args)` after evaluating and verifying every child.
    Apply {
        func: fn(&[Value]) -> Value,
        verify: Option<Verifier>,
    },
    /// Like `Apply`, but `func` can fail.
    ApplyWithError {
        func: fn(&[Value]) -> Result<Value, String>,
        verify: Option<Verifier>,
    },
    /// Left fold of a binary function over the arguments.
    Sequence {
        func: fn(&Value, &Value) -> Value,
        verify: Option<Verifier>,
    },
    /// Boolean predicate; child errors and mixed operand kinds give `false`.
    Comparison {
        func: fn(&[Value]) -> bool,
        verify: Option<Verifier>,
    },
    /// `(timestamp, amount[, format])` shifted by `func`.
    TimeTransform(fn(DateTime<Utc>, i64) -> Option<DateTime<Utc>>),
    Custom(CustomFn),
    Constant(Value),
    Lambda(LambdaFn),
}

impl fmt::Debug for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Apply { .. } => write!(f, "Apply"),
            Strategy::ApplyWithError { .. } => write!(f, "ApplyWithError"),
            Strategy::Sequence { .. } => write!(f, "Sequence"),
            Strategy::Comparison { .. } => write!(f, "Comparison"),
            Strategy::TimeTransform(_) => write!(f, "TimeTransform"),
            Strategy::Custom(_) => write!(f, "Custom"),
            Strategy::Constant(v) => write!(f, "Constant({})", v),
            Strategy::Lambda(_) => write!(f, "Lambda"),
        }
    }
}

/// Immutable behavior bound to an expression node.
#[derive(Clone, Debug)]
pub struct ExpressionEvaluator {
    expr_type: Arc<str>,
    strategy: Strategy,
    return_type: ReturnType,
    validator: Option<Validator>,
}

impl ExpressionEvaluator {
    pub fn new(
        expr_type: impl Into<Arc<str>>,
        strategy: Strategy,
        return_type: ReturnType,
        validator: Option<Validator>,
    ) -> Self {
        ExpressionEvaluator {
            expr_type: expr_type.into(),
            strategy,
            return_type,
            validator,
        }
    }

    pub fn custom(
        expr_type: impl Into<Arc<str>>,
        func: CustomFn,
        return_type: ReturnType,
        validator: Validator,
    ) -> Self {
        Self::new(expr_type, Strategy::Custom(func), return_type, Some(validator))
    }

    pub fn apply(
        expr_type: impl Into<Arc<str>>,
        func: fn(&[Value]) -> Value,
        return_type: ReturnType,
        validator: Validator,
        verify: Option<Verifier>,
    ) -> Self {
        Self::new(
            expr_type,
            Strategy::Apply { func, verify },
            return_type,
            Some(validator),
        )
    }

    pub fn apply_with_error(
        expr_type: impl Into<Arc<str>>,
        func: fn(&[Value]) -> Result<Value, String>,
        return_type: ReturnType,
        validator: Validator,
        verify: Option<Verifier>,
    ) -> Self {
        Self::new(
            expr_type,
            Strategy::ApplyWithError { func, verify },
            return_type,
            Some(validator),
        )
    }

    pub fn apply_sequence(
        expr_type: impl Into<Arc<str>>,
        func: fn(&Value, &Value) -> Value,
        return_type: ReturnType,
        validator: Validator,
        verify: Option<Verifier>,
    ) -> Self {
        Self::new(
            expr_type,
            Strategy::Sequence { func, verify },
            return_type,
            Some(validator),
        )
    }

    /// Numeric fold over one or more numbers.
    pub fn numeric(expr_type: impl Into<Arc<str>>, func: fn(&Value, &Value) -> Value) -> Self {
        Self::apply_sequence(
            expr_type,
            func,
            ReturnType::Number,
            signature::validate_number,
            Some(verify_number),
        )
    }

    /// Numeric fold over two or more numbers, with an optional custom verifier.
    pub fn multivariate_numeric(
        expr_type: impl Into<Arc<str>>,
        func: fn(&Value, &Value) -> Value,
        verify: Option<Verifier>,
    ) -> Self {
        Self::apply_sequence(
            expr_type,
            func,
            ReturnType::Number,
            signature::validate_two_or_more_than_two_numbers,
            Some(verify.unwrap_or(verify_number)),
        )
    }

    pub fn comparison(
        expr_type: impl Into<Arc<str>>,
        func: fn(&[Value]) -> bool,
        validator: Validator,
        verify: Option<Verifier>,
    ) -> Self {
        Self::new(
            expr_type,
            Strategy::Comparison { func, verify },
            ReturnType::Boolean,
            Some(validator),
        )
    }

    /// Unary string operator; a null argument is treated as "".
    pub fn string_transform(expr_type: impl Into<Arc<str>>, func: fn(&[Value]) -> Value) -> Self {
        Self::apply(
            expr_type,
            func,
            ReturnType::String,
            signature::validate_unary_string,
            Some(verify_string_or_null),
        )
    }

    pub fn time_transform(
        expr_type: impl Into<Arc<str>>,
        func: fn(DateTime<Utc>, i64) -> Option<DateTime<Utc>>,
    ) -> Self {
        Self::new(
            expr_type,
            Strategy::TimeTransform(func),
            ReturnType::String,
            Some(validate_time_transform),
        )
    }

    pub fn constant(value: Value) -> Self {
        let return_type = ReturnType::of(&value);
        Self::new(
            crate::expression_type::ExpressionType::Constant,
            Strategy::Constant(value),
            return_type,
            None,
        )
    }

    pub fn lambda(func: LambdaFn) -> Self {
        Self::new(
            crate::expression_type::ExpressionType::Lambda,
            Strategy::Lambda(func),
            ReturnType::Object,
            None,
        )
    }

    #[inline]
    pub fn expr_type(&self) -> &str {
        &self.expr_type
    }

    #[inline]
    pub fn return_type(&self) -> ReturnType {
        self.return_type
    }

    #[inline]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    #[inline]
    pub fn validator(&self) -> Option<Validator> {
        self.validator
    }

    /// Run the structural validator, if any, against `expr` alone.
    pub fn validate(&self, expr: &Expression) -> Result<(), ExpressionError> {
        match self.validator {
            Some(validate) => validate(expr),
            None => Ok(()),
        }
    }

    /// Evaluate `expr` against `state`.
    pub fn evaluate(&self, expr: &Expression, state: &mut Value) -> EvalResult {
        match &self.strategy {
            Strategy::Apply { func, verify } => {
                let args = evaluate_children(expr, state, *verify)?;
                Ok(func(&args))
            }
            Strategy::ApplyWithError { func, verify } => {
                let args = evaluate_children(expr, state, *verify)?;
                func(&args).map_err(EvaluationError::Evaluation)
            }
            Strategy::Sequence { func, verify } => {
                let args = evaluate_children(expr, state, *verify)?;
                let mut iter = args.into_iter();
                let first = iter.next().unwrap_or_default();
                Ok(iter.fold(first, |acc, next| func(&acc, &next)))
            }
            Strategy::Comparison { func, verify } => {
                match evaluate_children(expr, state, *verify) {
                    Ok(args) => {
                        if mixed_operand_kinds(&args) {
                            tracing::trace!(expression = %expr, "mixed operand kinds compare as false");
                            return Ok(Value::Bool(false));
                        }
                        Ok(Value::Bool(func(&args)))
                    }
                    Err(e) => {
                        tracing::trace!(expression = %expr, error = %e, "comparison operand failed");
                        Ok(Value::Bool(false))
                    }
                }
            }
            Strategy::TimeTransform(func) => time_transform(expr, state, *func),
            Strategy::Custom(func) => func(expr, state),
            Strategy::Constant(value) => Ok(value.clone()),
            Strategy::Lambda(func) => func(state).map_err(EvaluationError::Evaluation),
        }
    }
}

/// Non-null operands must be all numbers or all non-numbers.
fn mixed_operand_kinds(args: &[Value]) -> bool {
    let Some(first) = args.first() else {
        return false;
    };
    let numeric = first.is_number();
    args.iter()
        .filter(|a| !a.is_null())
        .any(|a| a.is_number() != numeric)
}

fn validate_time_transform(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_arity_and_any_type(
        expr,
        2,
        3,
        &[ReturnType::String, ReturnType::Number],
    )
}

fn time_transform(
    expr: &Expression,
    state: &mut Value,
    func: fn(DateTime<Utc>, i64) -> Option<DateTime<Utc>>,
) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let timestamp = args.first().and_then(|v| v.as_str());
    let amount = args.get(1).and_then(|v| v.as_f64());
    let (Some(timestamp), Some(amount)) = (timestamp, amount) else {
        return Err(EvaluationError::Type(format!("{} could not be evaluated", expr)));
    };
    let parsed = datetime::parse_iso8601(timestamp)?;
    let shifted = func(parsed, amount.trunc() as i64)
        .ok_or_else(|| EvaluationError::Evaluation(format!("{} could not be evaluated", expr)))?;
    let rendered = match args.get(2).and_then(|f| f.as_str()) {
        Some(format) => datetime::format_timestamp(&shifted, &datetime::timestamp_formatter(format))?,
        None => datetime::to_iso_string(&shifted),
    };
    Ok(Value::from(rendered))
}

// ── Combinators ──────────────────────────────────────────────────────────────

/// Evaluate every child left to right, verifying each value; the first error wins.
pub fn evaluate_children(
    expr: &Expression,
    state: &mut Value,
    verify: Option<Verifier>,
) -> Result<Vec<Value>, EvaluationError> {
    let mut args = Vec::with_capacity(expr.children().len());
    for (pos, child) in expr.children().iter().enumerate() {
        let value = child.try_evaluate(state)?;
        if let Some(verify) = verify {
            if let Some(message) = verify(&value, child, pos) {
                return Err(EvaluationError::Type(message));
            }
        }
        args.push(value);
    }
    Ok(args)
}

// ── Verifiers ────────────────────────────────────────────────────────────────

pub fn verify_number(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_number()).then(|| format!("{} is not a number.", expr))
}

pub fn verify_numeric_list(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    let Some(items) = value.as_list() else {
        return Some(format!("{} is not a list.", expr));
    };
    items
        .iter()
        .find(|item| !item.is_number())
        .map(|item| format!("{} is not a number in {}.", item, expr))
}

pub fn verify_numeric_list_or_number(value: &Value, expr: &Expression, pos: usize) -> Option<String> {
    if value.is_number() {
        return None;
    }
    verify_numeric_list(value, expr, pos)
}

pub fn verify_container(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    match value {
        Value::String(_) | Value::List(_) | Value::Map(_) => None,
        _ => Some(format!("{} must be a string or list or map.", expr)),
    }
}

pub fn verify_integer(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_integer()).then(|| format!("{} is not a integer.", expr))
}

pub fn verify_list(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_list()).then(|| format!("{} is not a list or array.", expr))
}

pub fn verify_string(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_string()).then(|| format!("{} is not a string.", expr))
}

pub fn verify_string_or_null(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_string() && !value.is_null())
        .then(|| format!("{} is neither a string nor a null object.", expr))
}

pub fn verify_number_or_string(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_number() && !value.is_string())
        .then(|| format!("{} is not string or number.", expr))
}

pub fn verify_number_or_string_or_null(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_number() && !value.is_string() && !value.is_null())
        .then(|| format!("{} is neither a number nor string", expr))
}

pub fn verify_boolean(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_bool()).then(|| format!("{} is not a boolean.", expr))
}

/// Any string a lenient date parser accepts.
pub fn verify_timestamp(value: &Value, _: &Expression, _: usize) -> Option<String> {
    match value.as_str() {
        Some(s) => datetime::parse_lenient(s).err().map(|e| e.to_string()),
        None => Some(format!("{} is not a valid datetime string.", value)),
    }
}

/// Only the canonical `YYYY-MM-DDTHH:mm:ss.fffZ` form.
pub fn verify_iso_timestamp(value: &Value, _: &Expression, _: usize) -> Option<String> {
    match value.as_str() {
        Some(s) => datetime::parse_iso8601(s).err().map(|e| e.to_string()),
        None => Some(format!("{} is not a ISO format datetime string.", value)),
    }
}
