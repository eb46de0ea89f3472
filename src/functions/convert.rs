// Conversion operators
// Number parsing, string rendering, base64 / data URI codecs and URI components

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::{arg, str_or_empty};
use crate::ast::ReturnType;
use crate::evaluator::{self, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::signature;
use crate::utils::{is_logic_true, to_plain_string};
use crate::value::Value;

const DATA_URI_PREFIX: &str = "data:text/plain;charset=utf-8;base64,";

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Float => ExpressionEvaluator::apply_with_error(
            ty,
            float,
            ReturnType::Number,
            signature::validate_unary,
            None,
        ),
        T::Int => ExpressionEvaluator::apply_with_error(
            ty,
            int,
            ReturnType::Number,
            signature::validate_unary,
            None,
        ),
        T::String => ExpressionEvaluator::apply(
            ty,
            string,
            ReturnType::String,
            signature::validate_unary,
            None,
        ),
        T::Bool => ExpressionEvaluator::comparison(ty, boolean, signature::validate_unary, None),
        T::JsonStringify => ExpressionEvaluator::apply_with_error(
            ty,
            json_stringify,
            ReturnType::String,
            signature::validate_unary,
            None,
        ),
        T::Binary => text_codec(ty, binary),
        T::Base64 => text_codec(ty, base64),
        T::Base64ToBinary => text_codec(ty, binary),
        T::DataUri => text_codec(ty, data_uri),
        T::DataUriToBinary => text_codec(ty, binary),
        T::UriComponent => text_codec(ty, uri_component),
        T::Base64ToString => fallible_text_codec(ty, base64_to_string),
        T::DataUriToString => fallible_text_codec(ty, data_uri_to_string),
        T::UriComponentToString => fallible_text_codec(ty, uri_component_to_string),
        _ => return None,
    };
    Some(evaluator)
}

fn text_codec(ty: ExpressionType, func: fn(&[Value]) -> Value) -> ExpressionEvaluator {
    ExpressionEvaluator::apply(
        ty,
        func,
        ReturnType::String,
        signature::validate_unary,
        Some(evaluator::verify_string),
    )
}

fn fallible_text_codec(
    ty: ExpressionType,
    func: fn(&[Value]) -> Result<Value, String>,
) -> ExpressionEvaluator {
    ExpressionEvaluator::apply_with_error(
        ty,
        func,
        ReturnType::String,
        signature::validate_unary,
        Some(evaluator::verify_string),
    )
}

fn not_a_number(value: &Value) -> String {
    format!("parameter {} is not a valid number string.", to_plain_string(value))
}

fn parse_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| not_a_number(value)),
        _ => Err(not_a_number(value)),
    }
}

fn float(args: &[Value]) -> Result<Value, String> {
    parse_number(arg(args, 0)).map(Value::from)
}

/// Truncates toward zero.
fn int(args: &[Value]) -> Result<Value, String> {
    let n = parse_number(arg(args, 0))?;
    if !n.is_finite() {
        return Err(not_a_number(arg(args, 0)));
    }
    Ok(Value::from(n.trunc()))
}

fn string(args: &[Value]) -> Value {
    Value::from(to_plain_string(arg(args, 0)))
}

fn boolean(args: &[Value]) -> bool {
    is_logic_true(arg(args, 0))
}

fn json_stringify(args: &[Value]) -> Result<Value, String> {
    arg(args, 0)
        .to_json_string()
        .map(Value::from)
        .map_err(|e| e.to_string())
}

/// Eight binary digits per character code.
fn binary(args: &[Value]) -> Value {
    let bits: String = str_or_empty(arg(args, 0))
        .chars()
        .map(|c| format!("{:08b}", c as u32))
        .collect();
    Value::from(bits)
}

fn base64(args: &[Value]) -> Value {
    Value::from(STANDARD.encode(str_or_empty(arg(args, 0))))
}

fn decode_base64(encoded: &str) -> Result<String, String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("{} is not a valid base64 string: {}", encoded, e))?;
    String::from_utf8(bytes).map_err(|_| format!("{} does not decode to UTF-8 text.", encoded))
}

fn base64_to_string(args: &[Value]) -> Result<Value, String> {
    decode_base64(str_or_empty(arg(args, 0))).map(Value::from)
}

fn data_uri(args: &[Value]) -> Value {
    Value::from(format!(
        "{}{}",
        DATA_URI_PREFIX,
        STANDARD.encode(str_or_empty(arg(args, 0)))
    ))
}

/// The base64 payload after the first comma.
fn data_uri_to_string(args: &[Value]) -> Result<Value, String> {
    let uri = str_or_empty(arg(args, 0));
    let (_, payload) = uri
        .split_once(',')
        .ok_or_else(|| format!("{} is not a valid data URI.", uri))?;
    decode_base64(payload).map(Value::from)
}

fn uri_component(args: &[Value]) -> Value {
    Value::from(urlencoding::encode(str_or_empty(arg(args, 0))).into_owned())
}

fn uri_component_to_string(args: &[Value]) -> Result<Value, String> {
    let encoded = str_or_empty(arg(args, 0));
    urlencoding::decode(encoded)
        .map(|decoded| Value::from(decoded.into_owned()))
        .map_err(|e| format!("{} is not a valid URI component: {}", encoded, e))
}
