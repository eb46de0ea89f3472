// String operators
// Concatenation, search and replace, casing, splitting and formatting

use regex::NoExpand;

use super::{arg, child_text, integer, str_or_empty};
use crate::ast::{Expression, ReturnType};
use crate::common_regex::create_regex;
use crate::evaluator::{self, evaluate_children, EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::signature::{self, ExpressionError};
use crate::utils::to_plain_string;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Concat => ExpressionEvaluator::apply(
            ty,
            concat,
            ReturnType::String,
            signature::validate_string_or_number_or_null,
            Some(evaluator::verify_number_or_string_or_null),
        ),
        T::Length => ExpressionEvaluator::apply(
            ty,
            length,
            ReturnType::Number,
            signature::validate_unary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::Replace => ExpressionEvaluator::apply_with_error(
            ty,
            replace,
            ReturnType::String,
            validate_ternary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::ReplaceIgnoreCase => ExpressionEvaluator::apply_with_error(
            ty,
            replace_ignore_case,
            ReturnType::String,
            validate_ternary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::Split => ExpressionEvaluator::apply(
            ty,
            split,
            ReturnType::Object,
            validate_one_or_two_strings,
            Some(evaluator::verify_string_or_null),
        ),
        T::Substring => ExpressionEvaluator::custom(
            ty,
            substring,
            ReturnType::String,
            validate_substring,
        ),
        T::ToLower => ExpressionEvaluator::string_transform(ty, to_lower),
        T::ToUpper => ExpressionEvaluator::string_transform(ty, to_upper),
        T::Trim => ExpressionEvaluator::string_transform(ty, trim),
        T::SentenceCase => ExpressionEvaluator::string_transform(ty, sentence_case),
        T::TitleCase => ExpressionEvaluator::string_transform(ty, title_case),
        T::StartsWith => ExpressionEvaluator::apply(
            ty,
            starts_with,
            ReturnType::Boolean,
            validate_binary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::EndsWith => ExpressionEvaluator::apply(
            ty,
            ends_with,
            ReturnType::Boolean,
            validate_binary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::CountWord => ExpressionEvaluator::apply(
            ty,
            count_word,
            ReturnType::Number,
            signature::validate_unary_string,
            Some(evaluator::verify_string_or_null),
        ),
        T::AddOrdinal => ExpressionEvaluator::apply(
            ty,
            add_ordinal,
            ReturnType::String,
            signature::validate_unary_number,
            Some(evaluator::verify_integer),
        ),
        T::NewGuid => ExpressionEvaluator::apply(
            ty,
            new_guid,
            ReturnType::String,
            signature::validate_no_children,
            None,
        ),
        T::IndexOf => ExpressionEvaluator::apply_with_error(
            ty,
            index_of,
            ReturnType::Number,
            signature::validate_binary,
            None,
        ),
        T::LastIndexOf => ExpressionEvaluator::apply_with_error(
            ty,
            last_index_of,
            ReturnType::Number,
            signature::validate_binary,
            None,
        ),
        T::Join => ExpressionEvaluator::custom(ty, join, ReturnType::String, validate_join),
        T::Eol => ExpressionEvaluator::apply(
            ty,
            eol,
            ReturnType::String,
            signature::validate_no_children,
            None,
        ),
        T::FormatNumber => ExpressionEvaluator::apply_with_error(
            ty,
            format_number,
            ReturnType::String,
            validate_format_number,
            None,
        ),
        T::IsMatch => ExpressionEvaluator::apply_with_error(
            ty,
            is_match,
            ReturnType::Boolean,
            signature::validate_is_match,
            Some(evaluator::verify_string_or_null),
        ),
        _ => return None,
    };
    Some(evaluator)
}

fn validate_binary_string(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_arity_and_any_type(expr, 2, 2, &[ReturnType::String])
}

fn validate_ternary_string(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_arity_and_any_type(expr, 3, 3, &[ReturnType::String])
}

fn validate_one_or_two_strings(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_arity_and_any_type(expr, 1, 2, &[ReturnType::String])
}

fn concat(args: &[Value]) -> Value {
    Value::from(args.iter().map(to_plain_string).collect::<String>())
}

fn length(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).chars().count())
}

fn replace(args: &[Value]) -> Result<Value, String> {
    let search = str_or_empty(arg(args, 1));
    if search.is_empty() {
        return Err(format!(
            "{} should be a string with length at least 1",
            arg(args, 1)
        ));
    }
    let text = str_or_empty(arg(args, 0));
    Ok(Value::from(text.replace(search, str_or_empty(arg(args, 2)))))
}

fn replace_ignore_case(args: &[Value]) -> Result<Value, String> {
    let search = str_or_empty(arg(args, 1));
    if search.is_empty() {
        return Err(format!(
            "{} should be a string with length at least 1",
            arg(args, 1)
        ));
    }
    let pattern = create_regex(&format!("(?i){}", regex::escape(search))).map_err(|e| e.to_string())?;
    let text = str_or_empty(arg(args, 0));
    let replaced = pattern.replace_all(text, NoExpand(str_or_empty(arg(args, 2))));
    Ok(Value::from(replaced.into_owned()))
}

/// An empty or missing separator splits into characters.
fn split(args: &[Value]) -> Value {
    let text = str_or_empty(arg(args, 0));
    let separator = str_or_empty(arg(args, 1));
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        text.split(separator).map(Value::from).collect()
    };
    Value::list(parts)
}

fn validate_substring(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::Number],
        &[ReturnType::String, ReturnType::Number],
    )
}

/// `substring(text, start[, length])` over characters.
fn substring(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let text = match arg(&args, 0) {
        Value::String(s) => s.clone(),
        Value::Null => return Ok(Value::from("")),
        _ => {
            return Err(EvaluationError::Type(format!(
                "{} is neither a string nor a null object.",
                child_text(expr, 0)
            )))
        }
    };
    let chars: Vec<char> = text.chars().collect();

    let start = integer(arg(&args, 1))
        .ok_or_else(|| EvaluationError::Type(format!("{} is not an integer.", child_text(expr, 1))))?;
    if start < 0 || start as usize > chars.len() {
        return Err(EvaluationError::Evaluation(format!(
            "{}={} which is out of range for {}",
            child_text(expr, 1),
            start,
            text
        )));
    }
    let start = start as usize;

    let end = match args.get(2) {
        Some(length) => {
            let length = integer(length).ok_or_else(|| {
                EvaluationError::Type(format!("{} is not an integer.", child_text(expr, 2)))
            })?;
            if length < 0 || length as u64 > (chars.len() - start) as u64 {
                return Err(EvaluationError::Evaluation(format!(
                    "{}={} which is out of range for {}",
                    child_text(expr, 2),
                    length,
                    text
                )));
            }
            start + length as usize
        }
        None => chars.len(),
    };
    Ok(Value::from(chars[start..end].iter().collect::<String>()))
}

fn to_lower(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).to_lowercase())
}

fn to_upper(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).to_uppercase())
}

fn trim(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).trim())
}

fn sentence_case(args: &[Value]) -> Value {
    let lower = str_or_empty(arg(args, 0)).to_lowercase();
    let mut chars = lower.chars();
    let cased = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Value::from(cased)
}

/// Upper-case every letter that starts a word.
fn title_case(args: &[Value]) -> Value {
    let mut cased = String::new();
    let mut at_boundary = true;
    for c in str_or_empty(arg(args, 0)).to_lowercase().chars() {
        let word = c.is_alphanumeric() || c == '_';
        if word && at_boundary {
            cased.extend(c.to_uppercase());
        } else {
            cased.push(c);
        }
        at_boundary = !word;
    }
    Value::from(cased)
}

fn starts_with(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).starts_with(str_or_empty(arg(args, 1))))
}

fn ends_with(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).ends_with(str_or_empty(arg(args, 1))))
}

fn count_word(args: &[Value]) -> Value {
    Value::from(str_or_empty(arg(args, 0)).split_whitespace().count())
}

/// `1st`, `2nd`, `3rd`, `11th`; non-positive numbers get no suffix.
fn add_ordinal(args: &[Value]) -> Value {
    let n = integer(arg(args, 0)).unwrap_or(0);
    if n <= 0 {
        return Value::from(n.to_string());
    }
    let suffix = match (n % 100, n % 10) {
        (11..=13, _) => "th",
        (_, 1) => "st",
        (_, 2) => "nd",
        (_, 3) => "rd",
        _ => "th",
    };
    Value::from(format!("{}{}", n, suffix))
}

fn new_guid(_: &[Value]) -> Value {
    Value::from(uuid::Uuid::new_v4().to_string())
}

/// Character position of a byte offset into `text`.
fn char_position(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

fn index_of(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0) {
        Value::String(_) | Value::Null => {
            let text = str_or_empty(arg(args, 0));
            let position = text
                .find(str_or_empty(arg(args, 1)))
                .map_or(-1, |byte| char_position(text, byte) as i64);
            Ok(Value::from(position))
        }
        Value::List(items) => {
            let item = arg(args, 1);
            Ok(Value::from(
                items.iter().position(|i| i == item).map_or(-1, |p| p as i64),
            ))
        }
        other => Err(format!("{} is not a string or list.", other)),
    }
}

fn last_index_of(args: &[Value]) -> Result<Value, String> {
    match arg(args, 0) {
        Value::String(_) | Value::Null => {
            let text = str_or_empty(arg(args, 0));
            let position = text
                .rfind(str_or_empty(arg(args, 1)))
                .map_or(-1, |byte| char_position(text, byte) as i64);
            Ok(Value::from(position))
        }
        Value::List(items) => {
            let item = arg(args, 1);
            Ok(Value::from(
                items.iter().rposition(|i| i == item).map_or(-1, |p| p as i64),
            ))
        }
        other => Err(format!("{} is not a string or list.", other)),
    }
}

fn validate_join(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::String],
        &[ReturnType::Object, ReturnType::String],
    )
}

/// `join(list, sep[, lastSep])`; with `lastSep` the final pair is joined by it.
fn join(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let children = expr.children();
    let Some(items) = arg(&args, 0).as_list() else {
        return Err(EvaluationError::Type(format!(
            "{} evaluates to {} which is not a list.",
            child_text(expr, 0),
            arg(&args, 0)
        )));
    };
    for (pos, separator) in args.iter().enumerate().skip(1) {
        if let Some(message) = evaluator::verify_string(separator, &children[pos], pos) {
            return Err(EvaluationError::Type(message));
        }
    }
    let separator = str_or_empty(arg(&args, 1));
    let items: Vec<String> = items.iter().map(to_plain_string).collect();

    let joined = match args.get(2).map(str_or_empty) {
        Some(last) if items.len() < 3 => items.join(last),
        Some(last) => match items.split_last() {
            Some((tail, head)) => format!("{}{}{}", head.join(separator), last, tail),
            None => String::new(),
        },
        None => items.join(separator),
    };
    Ok(Value::from(joined))
}

fn eol(_: &[Value]) -> Value {
    Value::from(if cfg!(windows) { "\r\n" } else { "\n" })
}

fn validate_format_number(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::String],
        &[ReturnType::Number, ReturnType::Number],
    )
}

/// Fixed precision with comma-grouped thousands, e.g. `1,234.50`.
fn format_number(args: &[Value]) -> Result<Value, String> {
    let n = arg(args, 0)
        .as_f64()
        .ok_or_else(|| format!("formatNumber's first argument {} is not a number.", arg(args, 0)))?;
    let precision = match integer(arg(args, 1)) {
        Some(p @ 0..=20) => p as usize,
        _ => {
            return Err(format!(
                "formatNumber's precision {} must be an integer between 0 and 20.",
                arg(args, 1)
            ))
        }
    };
    let fixed = format!("{:.*}", precision, n.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(fixed.len() + whole.len() / 3 + 1);
    if n < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.push('-');
    }
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if !fraction.is_empty() {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    Ok(Value::from(grouped))
}

fn is_match(args: &[Value]) -> Result<Value, String> {
    let pattern = create_regex(str_or_empty(arg(args, 1))).map_err(|e| e.to_string())?;
    Ok(Value::from(pattern.is_match(str_or_empty(arg(args, 0)))))
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
    fn test_concat_renders_plain_strings() {
        assert_eq!(
            eval(ExpressionType::Concat, vec![value!("a"), value!(1), Value::Null, value!("b")]),
            Ok(value!("a1b"))
        );
        let alias = Expression::make_expression(
            "concat",
            None,
            vec![Expression::constant("x"), Expression::constant("y")],
        )
        .unwrap();
        assert_eq!(alias.evaluate(&Value::Null), Ok(value!("xy")));
    }

    #[test]
    fn test_replace() {
        assert_eq!(
            eval(ExpressionType::Replace, vec![value!("a-b-c"), value!("-"), value!("+")]),
            Ok(value!("a+b+c"))
        );
        assert_eq!(
            eval(ExpressionType::ReplaceIgnoreCase, vec![value!("Hello hello"), value!("HELLO"), value!("$1")]),
            Ok(value!("$1 $1"))
        );
        assert_eq!(
            eval(ExpressionType::ReplaceIgnoreCase, vec![value!("a.b"), value!("."), value!("!")]),
            Ok(value!("a!b"))
        );
        assert!(eval(ExpressionType::Replace, vec![value!("abc"), value!(""), value!("x")]).is_err());
    }

    #[test]
    fn test_split() {
        assert_eq!(eval(ExpressionType::Split, vec![value!("a,b"), value!(",")]), Ok(value!(["a", "b"])));
        assert_eq!(eval(ExpressionType::Split, vec![value!("ab"), value!("")]), Ok(value!(["a", "b"])));
        assert_eq!(eval(ExpressionType::Split, vec![value!("ab")]), Ok(value!(["a", "b"])));
    }

    #[test]
    fn test_substring() {
        assert_eq!(eval(ExpressionType::Substring, vec![value!("hello"), value!(1), value!(3)]), Ok(value!("ell")));
        assert_eq!(eval(ExpressionType::Substring, vec![value!("hello"), value!(2)]), Ok(value!("llo")));
        assert_eq!(eval(ExpressionType::Substring, vec![Value::Null, value!(2)]), Ok(value!("")));
        assert_eq!(
            eval(ExpressionType::Substring, vec![value!("hello"), value!(6)]),
            Err(EvaluationError::Evaluation("6=6 which is out of range for hello".to_string()))
        );
        assert_eq!(
            eval(ExpressionType::Substring, vec![value!("hello"), value!(2), value!(9)]),
            Err(EvaluationError::Evaluation("9=9 which is out of range for hello".to_string()))
        );
    }

    #[test]
    fn test_casing() {
        assert_eq!(eval(ExpressionType::ToUpper, vec![value!("abc")]), Ok(value!("ABC")));
        assert_eq!(eval(ExpressionType::ToLower, vec![Value::Null]), Ok(value!("")));
        assert_eq!(eval(ExpressionType::Trim, vec![value!("  x ")]), Ok(value!("x")));
        assert_eq!(eval(ExpressionType::SentenceCase, vec![value!("aBC dEF")]), Ok(value!("Abc def")));
        assert_eq!(eval(ExpressionType::TitleCase, vec![value!("hello wORLD-wide")]), Ok(value!("Hello World-Wide")));
    }

    #[test]
    fn test_word_helpers() {
        assert_eq!(eval(ExpressionType::CountWord, vec![value!("  one two\tthree ")]), Ok(value!(3)));
        assert_eq!(eval(ExpressionType::AddOrdinal, vec![value!(11)]), Ok(value!("11th")));
        assert_eq!(eval(ExpressionType::AddOrdinal, vec![value!(22)]), Ok(value!("22nd")));
        assert_eq!(eval(ExpressionType::AddOrdinal, vec![value!(103)]), Ok(value!("103rd")));
        assert_eq!(eval(ExpressionType::AddOrdinal, vec![value!(0)]), Ok(value!("0")));
        assert_eq!(eval(ExpressionType::StartsWith, vec![value!("hello"), value!("he")]), Ok(value!(true)));
        assert_eq!(eval(ExpressionType::EndsWith, vec![value!("hello"), value!("he")]), Ok(value!(false)));
    }

    #[test]
    fn test_new_guid_is_v4() {
        let guid = eval(ExpressionType::NewGuid, vec![]).unwrap();
        let parsed = uuid::Uuid::parse_str(guid.as_str().unwrap()).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn test_index_of() {
        assert_eq!(eval(ExpressionType::IndexOf, vec![value!("héllo"), value!("l")]), Ok(value!(2)));
        assert_eq!(eval(ExpressionType::LastIndexOf, vec![value!("héllo"), value!("l")]), Ok(value!(3)));
        assert_eq!(eval(ExpressionType::IndexOf, vec![value!([1, 2, 1]), value!(1)]), Ok(value!(0)));
        assert_eq!(eval(ExpressionType::LastIndexOf, vec![value!([1, 2, 1]), value!(1)]), Ok(value!(2)));
        assert_eq!(eval(ExpressionType::IndexOf, vec![value!("abc"), value!("z")]), Ok(Value::from(-1)));
        assert!(eval(ExpressionType::IndexOf, vec![value!(5), value!(1)]).is_err());
    }

    #[test]
    fn test_join() {
        assert_eq!(eval(ExpressionType::Join, vec![value!(["a", "b", "c"]), value!(",")]), Ok(value!("a,b,c")));
        assert_eq!(
            eval(ExpressionType::Join, vec![value!(["a", "b", "c"]), value!(", "), value!(" and ")]),
            Ok(value!("a, b and c"))
        );
        assert_eq!(
            eval(ExpressionType::Join, vec![value!(["a", "b"]), value!(", "), value!(" and ")]),
            Ok(value!("a and b"))
        );
        assert_eq!(
            eval(ExpressionType::Join, vec![value!("abc"), value!(",")]),
            Err(EvaluationError::Type("'abc' evaluates to \"abc\" which is not a list.".to_string()))
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(eval(ExpressionType::FormatNumber, vec![value!(1234.567), value!(2)]), Ok(value!("1,234.57")));
        assert_eq!(eval(ExpressionType::FormatNumber, vec![value!(12), value!(0)]), Ok(value!("12")));
        assert_eq!(eval(ExpressionType::FormatNumber, vec![value!(-1234567), value!(1)]), Ok(value!("-1,234,567.0")));
        assert!(eval(ExpressionType::FormatNumber, vec![value!(1), value!(1.5)]).is_err());
    }

    #[test]
    fn test_is_match() {
        assert_eq!(eval(ExpressionType::IsMatch, vec![value!("abc"), value!("^A(?i)")]), Ok(value!(true)));
        assert_eq!(eval(ExpressionType::IsMatch, vec![value!("abc"), value!("^b")]), Ok(value!(false)));
        assert!(Expression::make(
            ExpressionType::IsMatch,
            vec![Expression::constant("a"), Expression::constant("(")]
        )
        .is_err());
    }
}
