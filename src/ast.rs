// Expression tree
// Typed nodes bound to evaluators, plus construction helpers and printing

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::evaluator::{EvalResult, ExpressionEvaluator, Strategy};
use crate::expression_type::ExpressionType;
use crate::extensions;
use crate::functions::FunctionTable;
use crate::scope;
use crate::signature::ExpressionError;
use crate::value::Value;

/// Static type of an expression, used for validation before evaluation.
///
/// `Object` means "not known until runtime" and passes every static check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Boolean,
    Number,
    Object,
    String,
}

impl ReturnType {
    /// Type inferred from a literal.
    pub fn of(value: &Value) -> ReturnType {
        match value {
            Value::String(_) => ReturnType::String,
            Value::Number(_) => ReturnType::Number,
            Value::Bool(_) => ReturnType::Boolean,
            _ => ReturnType::Object,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ReturnType::Boolean => "boolean",
            ReturnType::Number => "number",
            ReturnType::Object => "object",
            ReturnType::String => "string",
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the expression tree.
///
/// The node's type is the name it was built with (which may be an alias such
/// as `add`); its behavior comes from the bound evaluator. Children are owned
/// exclusively, so a tree never shares or cycles.
#[derive(Clone)]
pub struct Expression {
    expr_type: Arc<str>,
    evaluator: Arc<ExpressionEvaluator>,
    children: Vec<Expression>,
}

// ── Construction ─────────────────────────────────────────────────────────────

impl Expression {
    /// Build a node and validate it.
    ///
    /// Without an explicit evaluator the type name is looked up in the global
    /// function table. Only this node is validated; call [`validate_tree`] or
    /// [`compile`] for the whole tree.
    ///
    /// [`validate_tree`]: Expression::validate_tree
    /// [`compile`]: Expression::compile
    pub fn make_expression(
        expr_type: &str,
        evaluator: Option<Arc<ExpressionEvaluator>>,
        children: Vec<Expression>,
    ) -> Result<Expression, ExpressionError> {
        let evaluator = match evaluator {
            Some(evaluator) => evaluator,
            None => FunctionTable::global().lookup(expr_type)?,
        };
        let expr = Expression {
            expr_type: Arc::from(expr_type),
            evaluator,
            children,
        };
        expr.validate()?;
        Ok(expr)
    }

    /// Build a validated node for a built-in type.
    pub fn make(ty: ExpressionType, children: Vec<Expression>) -> Result<Expression, ExpressionError> {
        Self::make_expression(ty.name(), None, children)
    }

    /// Bind `children` to `evaluator` without validating.
    pub fn with_evaluator(evaluator: Arc<ExpressionEvaluator>, children: Vec<Expression>) -> Expression {
        Expression {
            expr_type: Arc::from(evaluator.expr_type()),
            evaluator,
            children,
        }
    }

    /// Unvalidated node for a built-in name; unknown names evaluate to an error.
    pub(crate) fn unchecked(expr_type: &str, children: Vec<Expression>) -> Expression {
        let evaluator = FunctionTable::global()
            .lookup(expr_type)
            .unwrap_or_else(|_| Arc::new(crate::functions::unknown(expr_type)));
        Expression {
            expr_type: Arc::from(expr_type),
            evaluator,
            children,
        }
    }

    /// Same type and evaluator, new children.
    pub(crate) fn with_children(&self, children: Vec<Expression>) -> Expression {
        Expression {
            expr_type: Arc::clone(&self.expr_type),
            evaluator: Arc::clone(&self.evaluator),
            children,
        }
    }

    /// A literal leaf; its return type is inferred from the value.
    pub fn constant(value: impl Into<Value>) -> Expression {
        let evaluator = ExpressionEvaluator::constant(value.into());
        Expression::with_evaluator(Arc::new(evaluator), Vec::new())
    }

    /// Property access: `property` against `instance`, or against the state.
    pub fn accessor(property: &str, instance: Option<Expression>) -> Expression {
        let mut children = vec![Expression::constant(property)];
        children.extend(instance);
        Expression::with_evaluator(
            FunctionTable::global().get(ExpressionType::Accessor),
            children,
        )
    }

    /// Wrap a host closure; it receives the state and returns a value or a message.
    pub fn lambda<F>(func: F) -> Expression
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        let evaluator = ExpressionEvaluator::lambda(Arc::new(func));
        Expression::with_evaluator(Arc::new(evaluator), Vec::new())
    }

    pub fn and(children: Vec<Expression>) -> Result<Expression, ExpressionError> {
        Self::make(ExpressionType::And, children)
    }

    pub fn or(children: Vec<Expression>) -> Result<Expression, ExpressionError> {
        Self::make(ExpressionType::Or, children)
    }

    pub fn not(child: Expression) -> Result<Expression, ExpressionError> {
        Self::make(ExpressionType::Not, vec![child])
    }
}

// ── Inspection ───────────────────────────────────────────────────────────────

impl Expression {
    /// The name this node was built with.
    #[inline]
    pub fn expr_type(&self) -> &str {
        &self.expr_type
    }

    /// The canonical built-in type behind this node, if any.
    pub fn kind(&self) -> Option<ExpressionType> {
        ExpressionType::from_name(self.evaluator.expr_type())
    }

    /// Whether this node is backed by the built-in `ty`.
    #[inline]
    pub fn is(&self, ty: ExpressionType) -> bool {
        self.evaluator.expr_type() == ty.name()
    }

    #[inline]
    pub fn children(&self) -> &[Expression] {
        &self.children
    }

    #[inline]
    pub fn evaluator(&self) -> &Arc<ExpressionEvaluator> {
        &self.evaluator
    }

    #[inline]
    pub fn return_type(&self) -> ReturnType {
        self.evaluator.return_type()
    }

    /// The literal of a constant node.
    pub fn constant_value(&self) -> Option<&Value> {
        match self.evaluator.strategy() {
            Strategy::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Replace a constant's literal, re-inferring its return type.
    /// Returns `false` when this node is not a constant.
    pub fn set_value(&mut self, value: impl Into<Value>) -> bool {
        if self.constant_value().is_none() {
            return false;
        }
        self.evaluator = Arc::new(ExpressionEvaluator::constant(value.into()));
        true
    }

    /// State paths this expression reads.
    pub fn references(&self) -> BTreeSet<String> {
        extensions::references(self)
    }
}

// ── Validation and evaluation ────────────────────────────────────────────────

impl Expression {
    /// Validate this node alone.
    pub fn validate(&self) -> Result<(), ExpressionError> {
        self.evaluator.validate(self)
    }

    /// Validate this node, then every descendant.
    pub fn validate_tree(&self) -> Result<(), ExpressionError> {
        self.validate()?;
        for child in &self.children {
            child.validate_tree()?;
        }
        Ok(())
    }

    /// Scope-resolved copy of this tree; see [`scope::resolve`].
    pub fn resolve_scopes(&self) -> Expression {
        scope::resolve(self)
    }

    /// Resolve comprehension scopes and validate the result.
    pub fn compile(&self) -> Result<Expression, ExpressionError> {
        let resolved = self.resolve_scopes();
        resolved.validate_tree()?;
        Ok(resolved)
    }

    /// Evaluate against `state`. Path-set operators may mutate it.
    pub fn try_evaluate(&self, state: &mut Value) -> EvalResult {
        self.evaluator.evaluate(self, state)
    }

    /// Evaluate against a borrowed state, discarding any mutation.
    pub fn evaluate(&self, state: &Value) -> EvalResult {
        let mut scratch = state.clone();
        self.try_evaluate(&mut scratch)
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.expr_type == other.expr_type
            && self.evaluator.expr_type() == other.evaluator.expr_type()
            && self.constant_value() == other.constant_value()
            && self.children == other.children
    }
}

// ── Display ──────────────────────────────────────────────────────────────────

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.constant_value() {
            return match value {
                Value::String(s) => write!(f, "'{}'", s),
                other => write!(f, "{}", other),
            };
        }

        if self.is(ExpressionType::Accessor) {
            let property = self
                .children
                .first()
                .and_then(|c| c.constant_value())
                .and_then(|v| v.as_str());
            match (property, self.children.len()) {
                (Some(property), 1) => return write!(f, "{}", property),
                (Some(property), 2) => return write!(f, "{}.{}", self.children[1], property),
                _ => {}
            }
        } else if self.is(ExpressionType::Element) && self.children.len() == 2 {
            return write!(f, "{}[{}]", self.children[0], self.children[1]);
        }

        let infix = self
            .expr_type
            .chars()
            .next()
            .map_or(false, |c| !c.is_alphabetic())
            && self.children.len() >= 2;
        if !infix {
            write!(f, "{}", self.expr_type)?;
        }
        write!(f, "(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                if infix {
                    write!(f, " {} ", self.expr_type)?;
                } else {
                    write!(f, ", ")?;
                }
            }
            write!(f, "{}", child)?;
        }
        write!(f, ")")
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Expression({})", self)
    }
}
