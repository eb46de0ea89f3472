// Arithmetic and aggregate operators
// +, -, *, /, ^, %, min/max, sum/average, count, range and rounding

use super::{arg, integer, number};
use crate::ast::{Expression, ReturnType};
use crate::evaluator::{self, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::signature;
use crate::utils;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Add => ExpressionEvaluator::multivariate_numeric(ty, add, None),
        T::Subtract => ExpressionEvaluator::multivariate_numeric(ty, subtract, None),
        T::Multiply => ExpressionEvaluator::multivariate_numeric(ty, multiply, None),
        T::Divide => ExpressionEvaluator::multivariate_numeric(ty, divide, Some(verify_divisor)),
        T::Power => ExpressionEvaluator::multivariate_numeric(ty, power, None),
        T::Mod => ExpressionEvaluator::apply_with_error(
            ty,
            modulo,
            ReturnType::Number,
            signature::validate_binary_number,
            Some(evaluator::verify_integer),
        ),
        T::Min => ExpressionEvaluator::apply_with_error(
            ty,
            min,
            ReturnType::Number,
            signature::validate_at_least_one,
            Some(evaluator::verify_numeric_list_or_number),
        ),
        T::Max => ExpressionEvaluator::apply_with_error(
            ty,
            max,
            ReturnType::Number,
            signature::validate_at_least_one,
            Some(evaluator::verify_numeric_list_or_number),
        ),
        T::Sum => ExpressionEvaluator::apply(
            ty,
            sum,
            ReturnType::Number,
            signature::validate_unary,
            Some(evaluator::verify_numeric_list),
        ),
        T::Average => ExpressionEvaluator::apply_with_error(
            ty,
            average,
            ReturnType::Number,
            signature::validate_unary,
            Some(evaluator::verify_numeric_list),
        ),
        T::Count => ExpressionEvaluator::apply(
            ty,
            count,
            ReturnType::Number,
            signature::validate_unary,
            Some(evaluator::verify_container),
        ),
        T::Range => ExpressionEvaluator::apply_with_error(
            ty,
            range,
            ReturnType::Object,
            signature::validate_binary_number,
            Some(evaluator::verify_integer),
        ),
        T::Floor => unary_numeric(ty, floor),
        T::Ceiling => unary_numeric(ty, ceiling),
        T::Abs => unary_numeric(ty, abs),
        T::Sqrt => ExpressionEvaluator::apply_with_error(
            ty,
            sqrt,
            ReturnType::Number,
            signature::validate_unary_number,
            Some(evaluator::verify_number),
        ),
        T::Round => ExpressionEvaluator::apply_with_error(
            ty,
            round,
            ReturnType::Number,
            validate_round,
            Some(evaluator::verify_number),
        ),
        _ => return None,
    };
    Some(evaluator)
}

fn unary_numeric(ty: ExpressionType, func: fn(&[Value]) -> Value) -> ExpressionEvaluator {
    ExpressionEvaluator::apply(
        ty,
        func,
        ReturnType::Number,
        signature::validate_unary_number,
        Some(evaluator::verify_number),
    )
}

fn floor(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)).floor())
}

fn ceiling(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)).ceil())
}

fn abs(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)).abs())
}

fn add(a: &Value, b: &Value) -> Value {
    Value::from(number(a) + number(b))
}

fn subtract(a: &Value, b: &Value) -> Value {
    Value::from(number(a) - number(b))
}

fn multiply(a: &Value, b: &Value) -> Value {
    Value::from(number(a) * number(b))
}

/// Integer operands divide to a floored integer; anything else divides exactly.
fn divide(a: &Value, b: &Value) -> Value {
    let quotient = number(a) / number(b);
    if a.is_integer() && b.is_integer() {
        Value::from(quotient.floor())
    } else {
        Value::from(quotient)
    }
}

fn power(a: &Value, b: &Value) -> Value {
    Value::from(number(a).powf(number(b)))
}

fn verify_divisor(value: &Value, expr: &Expression, pos: usize) -> Option<String> {
    evaluator::verify_number(value, expr, pos).or_else(|| {
        (pos > 0 && number(value) == 0.0).then(|| format!("Cannot divide by 0 from {}", expr))
    })
}

fn modulo(args: &[Value]) -> Result<Value, String> {
    let (a, b) = (number(arg(args, 0)), number(arg(args, 1)));
    if b == 0.0 {
        return Err("Cannot mod by 0.".to_string());
    }
    Ok(Value::from(a % b))
}

/// Every number in `args`, descending one level into lists.
fn numbers(args: &[Value]) -> impl Iterator<Item = f64> + '_ {
    args.iter().flat_map(|arg| match arg {
        Value::List(items) => items.iter().map(number).collect::<Vec<_>>(),
        other => vec![number(other)],
    })
}

fn min(args: &[Value]) -> Result<Value, String> {
    numbers(args)
        .reduce(f64::min)
        .map(Value::from)
        .ok_or_else(|| "Cannot take the min of an empty list.".to_string())
}

fn max(args: &[Value]) -> Result<Value, String> {
    numbers(args)
        .reduce(f64::max)
        .map(Value::from)
        .ok_or_else(|| "Cannot take the max of an empty list.".to_string())
}

fn sum(args: &[Value]) -> Value {
    Value::from(numbers(args).sum::<f64>())
}

fn average(args: &[Value]) -> Result<Value, String> {
    let items = arg(args, 0).as_list().map_or(0, |items| items.len());
    if items == 0 {
        return Err("Cannot take the average of an empty list.".to_string());
    }
    Ok(Value::from(numbers(args).sum::<f64>() / items as f64))
}

fn count(args: &[Value]) -> Value {
    match arg(args, 0) {
        Value::String(s) => Value::from(s.chars().count()),
        Value::List(items) => Value::from(items.len()),
        Value::Map(map) => Value::from(map.len()),
        _ => Value::Null,
    }
}

fn range(args: &[Value]) -> Result<Value, String> {
    let start = integer(arg(args, 0)).unwrap_or(0);
    let count = integer(arg(args, 1)).unwrap_or(0);
    if count <= 0 {
        return Err("Second paramter must be more than zero".to_string());
    }
    let last = start
        .checked_add(count - 1)
        .ok_or_else(|| format!("range({}, {}) is out of the integer range.", start, count))?;
    Ok(Value::list((start..=last).map(Value::from).collect()))
}

fn sqrt(args: &[Value]) -> Result<Value, String> {
    let n = number(arg(args, 0));
    if n < 0.0 {
        return Err(format!("{} is not a non-negative number.", utils::to_plain_string(arg(args, 0))));
    }
    Ok(Value::from(n.sqrt()))
}

fn validate_round(expr: &Expression) -> Result<(), signature::ExpressionError> {
    signature::validate_order(expr, &[ReturnType::Number], &[ReturnType::Number])
}

/// Round half away from zero to at most 15 fractional digits.
fn round(args: &[Value]) -> Result<Value, String> {
    let n = number(arg(args, 0));
    let digits = match args.get(1) {
        None => 0,
        Some(d) => match integer(d) {
            Some(d @ 0..=15) => d as i32,
            _ => {
                return Err(format!(
                    "The second parameter {} must be an integer between 0 and 15.",
                    utils::to_plain_string(d)
                ))
            }
        },
    };
    let scale = 10f64.powi(digits);
    Ok(Value::from((n * scale).round() / scale))
}

#[cfg(test)]
mod tests {
    use crate::ast::Expression;
    use crate::evaluator::EvaluationError;
    use crate::expression_type::ExpressionType;
    use crate::value;
    use crate::value::Value;

    fn eval(ty: ExpressionType, args: Vec<Value>) -> Result<Value, EvaluationError> {
        let children = args.into_iter().map(Expression::constant).collect();
        Expression::make(ty, children).unwrap().evaluate(&Value::Null)
    }

    #[test]
    fn test_arithmetic_folds_left() {
        assert_eq!(eval(ExpressionType::Add, vec![value!(1), value!(2), value!(3)]), Ok(value!(6)));
        assert_eq!(eval(ExpressionType::Subtract, vec![value!(10), value!(3), value!(2)]), Ok(value!(5)));
        assert_eq!(eval(ExpressionType::Multiply, vec![value!(2), value!(2.5)]), Ok(value!(5)));
        assert_eq!(eval(ExpressionType::Power, vec![value!(2), value!(10)]), Ok(value!(1024)));
    }

    #[test]
    fn test_divide() {
        assert_eq!(eval(ExpressionType::Divide, vec![value!(7), value!(2)]), Ok(value!(3)));
        assert_eq!(eval(ExpressionType::Divide, vec![value!(7.0), value!(2.5)]), Ok(value!(2.8)));
        assert_eq!(
            eval(ExpressionType::Divide, vec![value!(0), value!(0)]),
            Err(EvaluationError::Type("Cannot divide by 0 from 0".to_string()))
        );
    }

    #[test]
    fn test_mod() {
        assert_eq!(eval(ExpressionType::Mod, vec![value!(7), value!(3)]), Ok(value!(1)));
        assert_eq!(
            eval(ExpressionType::Mod, vec![value!(7), value!(0)]),
            Err(EvaluationError::Evaluation("Cannot mod by 0.".to_string()))
        );
        assert!(eval(ExpressionType::Mod, vec![value!(7.5), value!(2)]).is_err());
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(eval(ExpressionType::Min, vec![value!([3, 1, 2])]), Ok(value!(1)));
        assert_eq!(eval(ExpressionType::Max, vec![value!(3), value!([4, 9]), value!(2)]), Ok(value!(9)));
        assert_eq!(eval(ExpressionType::Sum, vec![value!([1, 2, 3])]), Ok(value!(6)));
        assert_eq!(eval(ExpressionType::Average, vec![value!([1, 2, 3])]), Ok(value!(2)));
        assert!(eval(ExpressionType::Average, vec![value!([])]).is_err());
        assert_eq!(
            eval(ExpressionType::Min, vec![value!([])]),
            Err(EvaluationError::Evaluation("Cannot take the min of an empty list.".to_string()))
        );
        assert_eq!(
            eval(ExpressionType::Max, vec![value!([]), value!([])]),
            Err(EvaluationError::Evaluation("Cannot take the max of an empty list.".to_string()))
        );
        assert_eq!(eval(ExpressionType::Count, vec![value!("héllo")]), Ok(value!(5)));
        assert_eq!(eval(ExpressionType::Count, vec![value!({"a": 1})]), Ok(value!(1)));
        assert!(eval(ExpressionType::Count, vec![value!(true)]).is_err());
    }

    #[test]
    fn test_range() {
        assert_eq!(eval(ExpressionType::Range, vec![value!(3), value!(3)]), Ok(value!([3, 4, 5])));
        assert_eq!(
            eval(ExpressionType::Range, vec![value!(1), value!(0)]),
            Err(EvaluationError::Evaluation("Second paramter must be more than zero".to_string()))
        );
        assert!(matches!(
            eval(ExpressionType::Range, vec![Value::from(9223372036854775807.0), value!(3)]),
            Err(EvaluationError::Evaluation(_))
        ));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(eval(ExpressionType::Floor, vec![value!(-1.5)]), Ok(value!(-2)));
        assert_eq!(eval(ExpressionType::Ceiling, vec![value!(1.2)]), Ok(value!(2)));
        assert_eq!(eval(ExpressionType::Abs, vec![value!(-4)]), Ok(value!(4)));
        assert_eq!(eval(ExpressionType::Round, vec![value!(2.5)]), Ok(value!(3)));
        assert_eq!(eval(ExpressionType::Round, vec![value!(3.14159), value!(2)]), Ok(value!(3.14)));
        assert!(eval(ExpressionType::Round, vec![value!(1), value!(16)]).is_err());
        assert_eq!(eval(ExpressionType::Sqrt, vec![value!(9)]), Ok(value!(3)));
        assert!(eval(ExpressionType::Sqrt, vec![value!(-1)]).is_err());
    }
}
