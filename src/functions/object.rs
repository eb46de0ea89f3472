// Object operators
// Property editing, JSON / XML queries, type tests and miscellaneous helpers

use indexmap::IndexMap;
use rand::Rng;
use serde_json_path::JsonPath;
use sxd_document::dom::{Document, Element};
use sxd_document::{parser, writer, Package};
use sxd_xpath::evaluate_xpath;

use super::{arg, integer, str_or_empty};
use crate::ast::{Expression, ReturnType};
use crate::datetime;
use crate::evaluator::{self, EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::extensions::{access_property, set_property};
use crate::signature::{self, ExpressionError};
use crate::utils::to_plain_string;
use crate::value::Value;

/// Element name used when a value has no single natural XML root.
const XML_ROOT: &str = "root";

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::Json => ExpressionEvaluator::apply_with_error(
            ty,
            json,
            ReturnType::Object,
            signature::validate_unary_string,
            Some(evaluator::verify_string),
        ),
        T::AddProperty => ExpressionEvaluator::apply_with_error(
            ty,
            add_property,
            ReturnType::Object,
            validate_object_name_value,
            Some(verify_map_and_name),
        ),
        T::SetProperty => ExpressionEvaluator::apply(
            ty,
            set_property_copy,
            ReturnType::Object,
            validate_object_name_value,
            Some(verify_map_and_name),
        ),
        T::RemoveProperty => ExpressionEvaluator::apply(
            ty,
            remove_property,
            ReturnType::Object,
            validate_object_name,
            Some(verify_map_and_name),
        ),
        T::GetProperty => ExpressionEvaluator::custom(ty, get_property, ReturnType::Object, validate_get_property),
        T::Coalesce => ExpressionEvaluator::apply(
            ty,
            coalesce,
            ReturnType::Object,
            signature::validate_at_least_one,
            None,
        ),
        T::Merge => ExpressionEvaluator::apply(
            ty,
            merge,
            ReturnType::Object,
            signature::validate_at_least_one,
            Some(verify_map),
        ),
        T::Rand => ExpressionEvaluator::apply_with_error(
            ty,
            random,
            ReturnType::Number,
            signature::validate_binary_number,
            Some(evaluator::verify_integer),
        ),
        T::JPath => ExpressionEvaluator::apply_with_error(
            ty,
            json_path,
            ReturnType::Object,
            validate_object_and_path,
            None,
        ),
        T::Xml => ExpressionEvaluator::apply_with_error(
            ty,
            xml,
            ReturnType::String,
            signature::validate_unary,
            None,
        ),
        T::XPath => ExpressionEvaluator::apply_with_error(
            ty,
            xpath,
            ReturnType::Object,
            validate_xml_and_path,
            Some(evaluator::verify_string),
        ),
        T::SimpleEntity => ExpressionEvaluator::apply(
            ty,
            simple_entity,
            ReturnType::Object,
            signature::validate_unary,
            None,
        ),
        T::Callstack => ExpressionEvaluator::custom(ty, callstack, ReturnType::Object, signature::validate_unary),
        T::IsString => type_test(ty, is_string),
        T::IsInteger => type_test(ty, is_integer),
        T::IsFloat => type_test(ty, is_float),
        T::IsArray => type_test(ty, is_array),
        T::IsObject => type_test(ty, is_object),
        T::IsBoolean => type_test(ty, is_boolean),
        T::IsDateTime => type_test(ty, is_date_time),
        _ => return None,
    };
    Some(evaluator)
}

// ── Validators and verifiers ─────────────────────────────────────────────────

fn validate_object_name(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[], &[ReturnType::Object, ReturnType::String])
}

fn validate_object_name_value(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[],
        &[ReturnType::Object, ReturnType::String, ReturnType::Object],
    )
}

/// `getProperty(obj, name)` or `getProperty(name)`.
fn validate_get_property(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[ReturnType::Object])
}

fn validate_object_and_path(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[], &[ReturnType::Object, ReturnType::String])
}

fn validate_xml_and_path(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[], &[ReturnType::String, ReturnType::String])
}

fn verify_map(value: &Value, expr: &Expression, _: usize) -> Option<String> {
    (!value.is_map()).then(|| format!("{} is not an object.", expr))
}

fn verify_map_and_name(value: &Value, expr: &Expression, pos: usize) -> Option<String> {
    match pos {
        0 => verify_map(value, expr, pos),
        1 => evaluator::verify_string(value, expr, pos),
        _ => None,
    }
}

// ── Property editing ─────────────────────────────────────────────────────────

fn json(args: &[Value]) -> Result<Value, String> {
    let text = str_or_empty(arg(args, 0));
    Value::from_json_str(text).map_err(|e| format!("{} is not a valid json string: {}", text, e))
}

fn add_property(args: &[Value]) -> Result<Value, String> {
    let name = str_or_empty(arg(args, 1));
    if arg(args, 0).get(name).is_some() {
        return Err(format!("{} already exists", name));
    }
    Ok(set_property(arg(args, 0), name, arg(args, 2).clone()))
}

fn set_property_copy(args: &[Value]) -> Value {
    set_property(arg(args, 0), str_or_empty(arg(args, 1)), arg(args, 2).clone())
}

fn remove_property(args: &[Value]) -> Value {
    let mut result = arg(args, 0).clone();
    if let Some(map) = result.as_map_mut() {
        map.shift_remove(str_or_empty(arg(args, 1)));
    }
    result
}

fn get_property(expr: &Expression, state: &mut Value) -> EvalResult {
    let children = expr.children();
    let (instance, name_expr) = match children {
        [name] => (state.clone(), name),
        [instance, name, ..] => (instance.try_evaluate(state)?, name),
        [] => return Ok(Value::Null),
    };
    let name = name_expr.try_evaluate(state)?;
    let Some(name) = name.as_str() else {
        return Err(EvaluationError::Type(format!("{} is not a string.", name_expr)));
    };
    access_property(&instance, name).map_err(EvaluationError::Reference)
}

fn coalesce(args: &[Value]) -> Value {
    args.iter().find(|v| !v.is_null()).cloned().unwrap_or_default()
}

/// Later maps win on key collisions.
fn merge(args: &[Value]) -> Value {
    let mut merged = IndexMap::new();
    for map in args.iter().filter_map(Value::as_map) {
        for (key, value) in map {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::map(merged)
}

/// Uniform integer in `[min, max)`; `min` when the range is empty.
fn random(args: &[Value]) -> Result<Value, String> {
    let (min, max) = (integer(arg(args, 0)).unwrap_or(0), integer(arg(args, 1)).unwrap_or(0));
    if min > max {
        return Err(format!(
            "Min value {} cannot be greater than max value {}.",
            min, max
        ));
    }
    if min == max {
        return Ok(Value::from(min));
    }
    Ok(Value::from(rand::thread_rng().gen_range(min..max)))
}

fn simple_entity(args: &[Value]) -> Value {
    let mut result = arg(args, 0);
    while let Some([only]) = result.as_list().map(Vec::as_slice) {
        result = only;
    }
    result.clone()
}

/// First non-null `name` found walking the `callstack` list in state.
fn callstack(expr: &Expression, state: &mut Value) -> EvalResult {
    let Some(frames) = access_property(state, "callstack")?.as_list().cloned() else {
        return Ok(Value::Null);
    };
    let property = match expr.children().first() {
        Some(child) => child.try_evaluate(state)?,
        None => return Ok(Value::Null),
    };
    let property = to_plain_string(&property);
    for frame in frames.iter() {
        let value = access_property(frame, &property)?;
        if !value.is_null() {
            return Ok(value);
        }
    }
    Ok(Value::Null)
}

// ── Type tests ───────────────────────────────────────────────────────────────

fn type_test(ty: ExpressionType, test: fn(&[Value]) -> bool) -> ExpressionEvaluator {
    ExpressionEvaluator::comparison(ty, test, signature::validate_unary, None)
}

fn is_string(args: &[Value]) -> bool {
    arg(args, 0).is_string()
}

fn is_integer(args: &[Value]) -> bool {
    arg(args, 0).is_integer()
}

fn is_float(args: &[Value]) -> bool {
    let value = arg(args, 0);
    value.is_number() && !value.is_integer()
}

fn is_array(args: &[Value]) -> bool {
    arg(args, 0).is_list()
}

fn is_object(args: &[Value]) -> bool {
    arg(args, 0).is_map()
}

fn is_boolean(args: &[Value]) -> bool {
    arg(args, 0).is_bool()
}

/// Only the canonical ISO 8601 form counts.
fn is_date_time(args: &[Value]) -> bool {
    arg(args, 0)
        .as_str()
        .map_or(false, |s| datetime::parse_iso8601(s).is_ok())
}

// ── JSON path ────────────────────────────────────────────────────────────────

/// `.a.b` and `a.b` are read as `$.a.b`.
fn normalize_json_path(path: &str) -> String {
    if path.starts_with('$') {
        path.to_string()
    } else if path.starts_with('.') || path.starts_with('[') {
        format!("${}", path)
    } else {
        format!("$.{}", path)
    }
}

fn json_path(args: &[Value]) -> Result<Value, String> {
    let document: serde_json::Value = match arg(args, 0) {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|_| format!("{} is not a valid json string", text))?,
        value @ (Value::Map(_) | Value::List(_)) => serde_json::Value::from(value),
        _ => return Err("the first parameter should be either an object or a string".to_string()),
    };
    let path = str_or_empty(arg(args, 1));
    let query = JsonPath::parse(&normalize_json_path(path))
        .map_err(|e| format!("{} is not a valid path + {}", path, e))?;
    let matches = query
        .query(&document)
        .all()
        .into_iter()
        .map(|node| Value::from(node.clone()))
        .collect();
    Ok(Value::list(matches))
}

// ── XML ──────────────────────────────────────────────────────────────────────

/// Serialize JSON-shaped data as XML. A map with one non-list entry names
/// the root element; anything else is wrapped in `<root>`.
fn xml(args: &[Value]) -> Result<Value, String> {
    let content = match arg(args, 0) {
        Value::String(text) => Value::from_json_str(text).map_err(|_| "Invalid json".to_string())?,
        other => other.clone(),
    };

    let package = Package::new();
    let document = package.as_document();
    let root = match content.as_map().filter(|m| m.len() == 1).and_then(|m| m.first()) {
        Some((name, body)) if !body.is_list() => {
            let element = document.create_element(name.as_str());
            fill_element(&document, element, body);
            element
        }
        _ => {
            let element = document.create_element(XML_ROOT);
            fill_element(&document, element, &content);
            element
        }
    };
    document.root().append_child(root);

    let mut out = Vec::new();
    writer::format_document(&document, &mut out).map_err(|e| e.to_string())?;
    String::from_utf8(out)
        .map(Value::from)
        .map_err(|e| e.to_string())
}

fn fill_element<'d>(document: &Document<'d>, element: Element<'d>, value: &Value) {
    match value {
        Value::Null => {}
        Value::Map(map) => {
            for (name, child) in map.iter() {
                append_element(document, element, name, child);
            }
        }
        Value::List(items) => {
            for item in items.iter() {
                append_element(document, element, "item", item);
            }
        }
        scalar => {
            element.append_child(document.create_text(&to_plain_string(scalar)));
        }
    }
}

/// Lists repeat the element once per item.
fn append_element<'d>(document: &Document<'d>, parent: Element<'d>, name: &str, value: &Value) {
    if let Value::List(items) = value {
        for item in items.iter() {
            append_element(document, parent, name, item);
        }
        return;
    }
    let child = document.create_element(name);
    parent.append_child(child);
    fill_element(document, child, value);
}

/// Scalars come back as is; node sets as the string value of each node.
fn xpath(args: &[Value]) -> Result<Value, String> {
    let text = str_or_empty(arg(args, 0));
    let path = str_or_empty(arg(args, 1));
    let package = parser::parse(text).map_err(|_| format!("{} is not valid xml", text))?;
    let document = package.as_document();
    let result = evaluate_xpath(&document, path)
        .map_err(|_| format!("{} is not an valid expression", path))?;
    Ok(match result {
        sxd_xpath::Value::Boolean(b) => Value::Bool(b),
        sxd_xpath::Value::Number(n) => Value::from(n),
        sxd_xpath::Value::String(s) => Value::from(s),
        sxd_xpath::Value::Nodeset(nodes) => {
            let values: Vec<Value> = nodes
                .document_order()
                .into_iter()
                .map(|node| Value::from(node.string_value()))
                .collect();
            if values.is_empty() {
                Value::Null
            } else {
                Value::list(values)
            }
        }
    })
}
