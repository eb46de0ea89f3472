// Comprehension operators
// foreach / select / where / any / all over a list with a bound iterator name

use std::mem;

use indexmap::IndexMap;

use super::child_text;
use crate::ast::{Expression, ReturnType};
use crate::evaluator::{EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::scope::{self, GLOBAL, LOCAL};
use crate::signature::{self, iterator_name};
use crate::utils::is_logic_true;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let (func, return_type): (fn(&Expression, &mut Value) -> EvalResult, ReturnType) = match ty {
        T::Foreach | T::Select => (foreach, ReturnType::Object),
        T::Where => (filter, ReturnType::Object),
        T::Any => (any, ReturnType::Boolean),
        T::All => (all, ReturnType::Boolean),
        _ => return None,
    };
    Some(ExpressionEvaluator::custom(ty, func, return_type, signature::validate_foreach))
}

/// Collection items plus the iterator name and body of a resolved comprehension.
struct Comprehension<'a> {
    items: Vec<Value>,
    name: &'a str,
    body: &'a Expression,
}

impl<'a> Comprehension<'a> {
    fn open(expr: &'a Expression, state: &mut Value) -> Result<Comprehension<'a>, EvaluationError> {
        let [collection, iterator, body] = expr.children() else {
            return Err(EvaluationError::Evaluation(format!(
                "{} expect 3 parameters, found {}",
                expr.expr_type(),
                expr.children().len()
            )));
        };
        let name = iterator_name(iterator).ok_or_else(|| {
            EvaluationError::Evaluation(format!(
                "Second parameter of {} is not an identifier : {}",
                expr.expr_type(),
                iterator
            ))
        })?;
        let items = match collection.try_evaluate(state)? {
            Value::List(items) => items.as_ref().clone(),
            _ => {
                return Err(EvaluationError::Type(format!(
                    "{} is not a collection to run {}",
                    child_text(expr, 0),
                    expr.expr_type()
                )))
            }
        };
        Ok(Comprehension { items, name, body })
    }

    /// Evaluate the body for `item` in the scope
    /// `{ $global: state, $local: { name: item } }`.
    ///
    /// The enclosing state is moved into the scope and moved back afterwards,
    /// success or not, so writes made by the body persist.
    fn apply(&self, state: &mut Value, item: &Value) -> EvalResult {
        let mut local = IndexMap::with_capacity(1);
        local.insert(self.name.to_string(), item.clone());
        let mut frame = IndexMap::with_capacity(2);
        frame.insert(GLOBAL.to_string(), mem::take(state));
        frame.insert(LOCAL.to_string(), Value::map(local));
        let mut scope = Value::map(frame);

        let result = self.body.try_evaluate(&mut scope);

        if let Some(global) = scope.as_map_mut().and_then(|m| m.shift_remove(GLOBAL)) {
            *state = global;
        }
        result
    }
}

/// Evaluate an unresolved comprehension by resolving it first.
fn resolved(expr: &Expression, state: &mut Value) -> Option<EvalResult> {
    if !scope::needs_resolution(expr) {
        return None;
    }
    tracing::debug!(expression = %expr, "resolving comprehension scope at evaluation time");
    Some(expr.resolve_scopes().try_evaluate(state))
}

fn foreach(expr: &Expression, state: &mut Value) -> EvalResult {
    if let Some(result) = resolved(expr, state) {
        return result;
    }
    let comprehension = Comprehension::open(expr, state)?;
    let mut results = Vec::with_capacity(comprehension.items.len());
    for item in &comprehension.items {
        results.push(comprehension.apply(state, item)?);
    }
    Ok(Value::list(results))
}

/// `where`: items whose condition is truthy.
fn filter(expr: &Expression, state: &mut Value) -> EvalResult {
    if let Some(result) = resolved(expr, state) {
        return result;
    }
    let comprehension = Comprehension::open(expr, state)?;
    let mut kept = Vec::new();
    for item in &comprehension.items {
        if is_logic_true(&comprehension.apply(state, item)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::list(kept))
}

fn any(expr: &Expression, state: &mut Value) -> EvalResult {
    if let Some(result) = resolved(expr, state) {
        return result;
    }
    let comprehension = Comprehension::open(expr, state)?;
    for item in &comprehension.items {
        if is_logic_true(&comprehension.apply(state, item)?) {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn all(expr: &Expression, state: &mut Value) -> EvalResult {
    if let Some(result) = resolved(expr, state) {
        return result;
    }
    let comprehension = Comprehension::open(expr, state)?;
    for item in &comprehension.items {
        if !is_logic_true(&comprehension.apply(state, item)?) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}
