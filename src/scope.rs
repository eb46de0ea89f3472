// Scope resolution for comprehensions
// Rewrites foreach/select/where/any/all bodies to explicit $global/$local lookups

use crate::ast::Expression;
use crate::expression_type::ExpressionType;
use crate::signature::iterator_name;

/// Key under which a comprehension scope keeps the enclosing state.
pub const GLOBAL: &str = "$global";

/// Key under which a comprehension scope keeps the iterator binding.
pub const LOCAL: &str = "$local";

/// Produce a scope-resolved copy of `expr`.
///
/// Inside a comprehension every root accessor is rewritten relative to the
/// per-element scope `{ $global: outer, $local: { name: element } }`:
///
/// - a reference to the iterator bound `k` levels out becomes
///   `$global` × k, then `$local.name`;
/// - any other reference becomes `$global` × depth, then the name.
///
/// The iterator child becomes `$local.name`. Roots already named `$global` or
/// `$local` are left alone, so resolving a resolved tree changes nothing.
pub fn resolve(expr: &Expression) -> Expression {
    let mut iterators = Vec::new();
    resolve_with(expr, &mut iterators)
}

/// Whether `expr` is a comprehension whose iterator is still a bare name.
pub fn needs_resolution(expr: &Expression) -> bool {
    expr.kind().map_or(false, |k| k.is_comprehension())
        && expr.children().len() == 3
        && expr.children()[1].is(ExpressionType::Accessor)
        && expr.children()[1].children().len() == 1
}

fn resolve_with(expr: &Expression, iterators: &mut Vec<String>) -> Expression {
    if expr.kind().map_or(false, |k| k.is_comprehension()) && expr.children().len() == 3 {
        if let Some(name) = iterator_name(&expr.children()[1]) {
            let name = name.to_string();
            let collection = resolve_with(&expr.children()[0], iterators);
            let iterator = Expression::accessor(&name, Some(Expression::accessor(LOCAL, None)));
            iterators.push(name);
            let body = resolve_with(&expr.children()[2], iterators);
            iterators.pop();
            return expr.with_children(vec![collection, iterator, body]);
        }
    }

    if !iterators.is_empty() && expr.is(ExpressionType::Accessor) {
        if let Some(rewritten) = rewrite_accessor(expr, iterators) {
            return rewritten;
        }
    }

    let children = expr
        .children()
        .iter()
        .map(|child| resolve_with(child, iterators))
        .collect();
    expr.with_children(children)
}

/// Rewrite the root of an accessor chain. `None` when the node is not a
/// well-formed accessor and should be walked generically.
fn rewrite_accessor(expr: &Expression, iterators: &mut Vec<String>) -> Option<Expression> {
    let name = expr.children().first()?.constant_value()?.as_str()?;
    match expr.children() {
        [_] => {
            if name == GLOBAL || name == LOCAL {
                return Some(expr.clone());
            }
            let depth = iterators.len();
            let instance = match iterators.iter().rposition(|it| it == name) {
                Some(bound) => Some(Expression::accessor(LOCAL, global_hops(depth - 1 - bound))),
                None => global_hops(depth),
            };
            Some(Expression::accessor(name, instance))
        }
        [property, instance] => {
            let instance = if instance.is(ExpressionType::Accessor) {
                rewrite_accessor(instance, iterators)
                    .unwrap_or_else(|| resolve_with(instance, iterators))
            } else {
                resolve_with(instance, iterators)
            };
            Some(expr.with_children(vec![property.clone(), instance]))
        }
        _ => None,
    }
}

/// `$global.$global...` nested `count` times; `None` for zero.
fn global_hops(count: usize) -> Option<Expression> {
    (0..count).fold(None, |inner, _| Some(Expression::accessor(GLOBAL, inner)))
}
