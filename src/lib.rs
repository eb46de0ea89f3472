// memexpr - Embeddable expression language
// Copyright (c) 2025 memexpr contributors
// Licensed under the MIT License

//! # memexpr
//!
//! An embeddable expression language for reading, writing and deriving values
//! over a JSON-like state graph, such as a conversation memory.
//!
//! Expressions are trees of typed nodes. Each node is bound to an evaluator
//! from a [`FunctionTable`] that supplies its behavior, its static return type
//! and a validator for its children. Trees are built programmatically, checked
//! with [`Expression::compile`], then evaluated against a [`Value`] state any
//! number of times.
//!
//! ```
//! use memexpr::{value, Expression, ExpressionType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let expr = Expression::make(
//!     ExpressionType::Add,
//!     vec![Expression::accessor("a", None), Expression::constant(2)],
//! )?;
//! let state = value!({"a": 40});
//! assert_eq!(expr.evaluate(&state)?, value!(42));
//! assert_eq!(expr.to_string(), "(a + 2)");
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - `value` - the state and result value type
//! - `ast` - expression nodes, construction, printing and evaluation
//! - `evaluator` - evaluation strategies and runtime verifiers
//! - `signature` - arity and static type validation
//! - `functions` - the built-in function table, one module per family
//! - `scope` - `$global` / `$local` rewriting for comprehensions
//! - `extensions` - reference extraction and property / index access
//! - `datetime`, `timezone` - timestamp parsing, formatting and zone lookup
//! - `common_regex` - regex construction with inline flag groups

pub mod ast;
pub mod common_regex;
pub mod datetime;
pub mod evaluator;
pub mod expression_type;
pub mod extensions;
pub mod functions;
pub mod scope;
pub mod signature;
pub mod timezone;
pub mod utils;
pub mod value;

pub use ast::{Expression, ReturnType};
pub use common_regex::{create_regex, RegexError};
pub use evaluator::{EvalResult, EvaluationError, ExpressionEvaluator};
pub use expression_type::ExpressionType;
pub use extensions::references;
pub use functions::FunctionTable;
pub use signature::ExpressionError;
pub use timezone::TimeZoneConverter;
pub use value::Value;

#[doc(hidden)]
pub use indexmap::IndexMap as __IndexMap;
