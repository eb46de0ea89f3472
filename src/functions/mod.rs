// Built-in function table
// Maps every operator name and alias to its evaluator

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::ast::ReturnType;
use crate::evaluator::{EvalResult, EvaluationError, ExpressionEvaluator, Strategy};
use crate::expression_type::ExpressionType;
use crate::signature::ExpressionError;
use crate::value::Value;

pub mod collection;
pub mod comparison;
pub mod convert;
pub mod iteration;
pub mod math;
pub mod object;
pub mod path;
pub mod string;
pub mod time;
pub mod uri;

static GLOBAL: Lazy<FunctionTable> = Lazy::new(FunctionTable::builtin);

/// Alternative spellings registered next to the canonical names.
const ALIASES: &[(&str, ExpressionType)] = &[
    ("add", ExpressionType::Add),
    ("mul", ExpressionType::Multiply),
    ("div", ExpressionType::Divide),
    ("sub", ExpressionType::Subtract),
    ("exp", ExpressionType::Power),
    ("mod", ExpressionType::Mod),
    ("and", ExpressionType::And),
    ("equals", ExpressionType::Equal),
    ("greater", ExpressionType::GreaterThan),
    ("greaterOrEquals", ExpressionType::GreaterThanOrEqual),
    ("less", ExpressionType::LessThan),
    ("lessOrEquals", ExpressionType::LessThanOrEqual),
    ("not", ExpressionType::Not),
    ("or", ExpressionType::Or),
    ("concat", ExpressionType::Concat),
];

/// Name → evaluator registry.
///
/// Read-only once built. Aliases share the `Arc` of their canonical entry.
#[derive(Debug, Clone)]
pub struct FunctionTable {
    functions: HashMap<String, Arc<ExpressionEvaluator>>,
    /// Lowercased name → registered name, for the case-insensitive fallback.
    folded: HashMap<String, String>,
}

impl FunctionTable {
    /// The process-wide built-in table, built on first use.
    pub fn global() -> &'static FunctionTable {
        &GLOBAL
    }

    /// A fresh table holding every built-in and alias.
    pub fn builtin() -> FunctionTable {
        let mut table = FunctionTable {
            functions: HashMap::with_capacity(ExpressionType::ALL.len() + ALIASES.len()),
            folded: HashMap::new(),
        };
        for ty in ExpressionType::ALL {
            table.insert(ty.name(), Arc::new(evaluator_for(*ty)));
        }
        for (alias, ty) in ALIASES {
            if let Some(evaluator) = table.functions.get(ty.name()).cloned() {
                table.insert(alias, evaluator);
            }
        }
        tracing::debug!(functions = table.functions.len(), "built function table");
        table
    }

    /// Register `evaluator` under `name`, replacing any existing entry.
    pub fn with(mut self, name: impl Into<String>, evaluator: ExpressionEvaluator) -> Self {
        let name = name.into();
        self.insert(&name, Arc::new(evaluator));
        self
    }

    fn insert(&mut self, name: &str, evaluator: Arc<ExpressionEvaluator>) {
        self.folded
            .entry(name.to_lowercase())
            .or_insert_with(|| name.to_string());
        self.functions.insert(name.to_string(), evaluator);
    }

    /// Evaluator registered for `name`; exact match first, then ignoring case.
    pub fn lookup(&self, name: &str) -> Result<Arc<ExpressionEvaluator>, ExpressionError> {
        if let Some(evaluator) = self.functions.get(name) {
            return Ok(Arc::clone(evaluator));
        }
        self.folded
            .get(&name.to_lowercase())
            .and_then(|registered| self.functions.get(registered))
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownFunction(name.to_string()))
    }

    /// Evaluator of a built-in type.
    pub fn get(&self, ty: ExpressionType) -> Arc<ExpressionEvaluator> {
        self.functions
            .get(ty.name())
            .cloned()
            .unwrap_or_else(|| Arc::new(evaluator_for(ty)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, aliases included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn evaluator_for(ty: ExpressionType) -> ExpressionEvaluator {
    use ExpressionType as T;
    match ty {
        T::Constant => ExpressionEvaluator::constant(Value::Null),
        T::Lambda => ExpressionEvaluator::lambda(Arc::new(|_: &Value| {
            Err("Lambda has no body.".to_string())
        })),
        _ => math::evaluator(ty)
            .or_else(|| comparison::evaluator(ty))
            .or_else(|| string::evaluator(ty))
            .or_else(|| time::evaluator(ty))
            .or_else(|| convert::evaluator(ty))
            .or_else(|| uri::evaluator(ty))
            .or_else(|| collection::evaluator(ty))
            .or_else(|| object::evaluator(ty))
            .or_else(|| path::evaluator(ty))
            .or_else(|| iteration::evaluator(ty))
            .unwrap_or_else(|| unknown(ty.name())),
    }
}

fn evaluate_unknown(expr: &crate::ast::Expression, _: &mut Value) -> EvalResult {
    Err(EvaluationError::Evaluation(
        ExpressionError::UnknownFunction(expr.expr_type().to_string()).to_string(),
    ))
}

/// Placeholder for a name with no registered behavior; evaluating it fails.
pub(crate) fn unknown(name: &str) -> ExpressionEvaluator {
    ExpressionEvaluator::new(name, Strategy::Custom(evaluate_unknown), ReturnType::Object, None)
}

// ── Shared argument helpers ──────────────────────────────────────────────────

static NULL: Value = Value::Null;

/// Positional argument; a missing position reads as null.
pub(crate) fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// String argument with null read as "".
pub(crate) fn str_or_empty(value: &Value) -> &str {
    value.as_str().unwrap_or("")
}

/// Printed form of child `index`, for error messages.
pub(crate) fn child_text(expr: &crate::ast::Expression, index: usize) -> String {
    expr.children()
        .get(index)
        .map_or_else(String::new, ToString::to_string)
}

pub(crate) fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Integer argument; `None` for fractional or non-numeric values.
pub(crate) fn integer(value: &Value) -> Option<i64> {
    value.is_integer().then(|| value.as_i64()).flatten()
}
