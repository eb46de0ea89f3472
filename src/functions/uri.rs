// URI operators
// Component extraction from absolute URIs via the url crate

use url::Url;

use super::{arg, str_or_empty};
use crate::ast::ReturnType;
use crate::evaluator::{self, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::signature;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let func: fn(&[Value]) -> Result<Value, String> = match ty {
        T::UriHost => uri_host,
        T::UriPath => uri_path,
        T::UriPathAndQuery => uri_path_and_query,
        T::UriPort => uri_port,
        T::UriQuery => uri_query,
        T::UriScheme => uri_scheme,
        _ => return None,
    };
    Some(ExpressionEvaluator::apply_with_error(
        ty,
        func,
        ReturnType::String,
        signature::validate_unary_string,
        Some(evaluator::verify_string),
    ))
}

fn parse(args: &[Value]) -> Result<Url, String> {
    let uri = str_or_empty(arg(args, 0));
    Url::parse(uri).map_err(|_| format!("{} must be an absolute URI", uri))
}

fn uri_host(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(parse(args)?.host_str().unwrap_or_default()))
}

fn uri_path(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(parse(args)?.path()))
}

fn uri_path_and_query(args: &[Value]) -> Result<Value, String> {
    let url = parse(args)?;
    let rendered = match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    };
    Ok(Value::from(rendered))
}

/// Explicit port as text; "" when the scheme default is used.
fn uri_port(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(
        parse(args)?.port().map(|p| p.to_string()).unwrap_or_default(),
    ))
}

/// Query including its leading `?`, or "".
fn uri_query(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(
        parse(args)?.query().map(|q| format!("?{}", q)).unwrap_or_default(),
    ))
}

fn uri_scheme(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(parse(args)?.scheme()))
}
