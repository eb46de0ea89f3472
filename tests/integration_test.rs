// Integration tests for expression building + evaluation
//
// These tests drive the public API end to end: trees are built and compiled,
// then evaluated against memory-shaped state converted from serde_json.

use memexpr::{
    references, value, EvaluationError, Expression, ExpressionError, ExpressionEvaluator,
    ExpressionType, FunctionTable, ReturnType, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Route library logs to the test writer; `RUST_LOG=memexpr=trace` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn memory() -> Value {
    json!({
        "user": {
            "name": "Ada",
            "age": 36,
            "tags": ["admin", "beta"],
            "visits": [
                {"page": "home", "ms": 120},
                {"page": "docs", "ms": 480},
                {"page": "home", "ms": 60}
            ]
        },
        "turn": {"count": 3, "lastIntent": "Greeting"},
        "threshold": 100
    })
    .into()
}

fn call(ty: ExpressionType, children: Vec<Expression>) -> Expression {
    Expression::make(ty, children).unwrap()
}

fn path(dotted: &str) -> Expression {
    dotted
        .split('.')
        .fold(None, |instance, name| Some(Expression::accessor(name, instance)))
        .unwrap()
}

#[test]
fn test_nested_property_access() {
    let state = memory();
    assert_eq!(path("user.name").evaluate(&state), Ok(value!("Ada")));
    assert_eq!(path("turn.lastIntent").evaluate(&state), Ok(value!("Greeting")));
    assert_eq!(path("user.missing.deeper").evaluate(&state), Ok(Value::Null));
}

#[test]
fn test_arithmetic_and_comparison() {
    let state = memory();
    let older = call(
        ExpressionType::GreaterThan,
        vec![
            call(ExpressionType::Multiply, vec![path("user.age"), Expression::constant(3)]),
            path("threshold"),
        ],
    );
    assert_eq!(older.evaluate(&state), Ok(value!(true)));
    assert_eq!(older.to_string(), "((user.age * 3) > threshold)");
}

#[test]
fn test_string_building() {
    let state = memory();
    let greeting = call(
        ExpressionType::Concat,
        vec![
            Expression::constant("Hello, "),
            call(ExpressionType::ToUpper, vec![path("user.name")]),
            Expression::constant("!"),
        ],
    );
    assert_eq!(greeting.evaluate(&state), Ok(value!("Hello, ADA!")));

    let tags = call(
        ExpressionType::Join,
        vec![path("user.tags"), Expression::constant(", ")],
    );
    assert_eq!(tags.evaluate(&state), Ok(value!("admin, beta")));
}

#[test]
fn test_comprehension_pipeline() {
    init_tracing();
    let state = memory();
    let slow = call(
        ExpressionType::Where,
        vec![
            path("user.visits"),
            Expression::accessor("v", None),
            call(
                ExpressionType::GreaterThan,
                vec![path("v.ms"), Expression::constant(100)],
            ),
        ],
    );
    let pages = call(
        ExpressionType::Select,
        vec![slow, Expression::accessor("v", None), path("v.page")],
    )
    .compile()
    .unwrap();
    assert_eq!(pages.evaluate(&state), Ok(value!(["home", "docs"])));

    let distinct = call(ExpressionType::Unique, vec![pages]);
    assert_eq!(distinct.evaluate(&state), Ok(value!(["home", "docs"])));
}

#[test]
fn test_comprehension_reads_outer_state() {
    let state = memory();
    let over = call(
        ExpressionType::Any,
        vec![
            path("user.visits"),
            Expression::accessor("v", None),
            call(
                ExpressionType::GreaterThan,
                vec![path("v.ms"), path("threshold")],
            ),
        ],
    )
    .compile()
    .unwrap();
    assert_eq!(over.evaluate(&state), Ok(value!(true)));
}

#[test]
fn test_set_path_mutates_state() {
    let mut state = memory();
    let set = call(
        ExpressionType::SetPathToValue,
        vec![
            path("turn.count"),
            call(ExpressionType::Add, vec![path("turn.count"), Expression::constant(1)]),
        ],
    );
    assert_eq!(set.try_evaluate(&mut state), Ok(value!(4)));
    assert_eq!(path("turn.count").evaluate(&state), Ok(value!(4)));

    // evaluate() works on a copy
    let before = memory();
    set.evaluate(&before).unwrap();
    assert_eq!(path("turn.count").evaluate(&before), Ok(value!(3)));
}

#[test]
fn test_references() {
    let expr = call(
        ExpressionType::Foreach,
        vec![
            path("user.visits"),
            Expression::accessor("v", None),
            call(ExpressionType::Add, vec![path("v.ms"), path("threshold")]),
        ],
    );
    let refs: Vec<String> = references(&expr).into_iter().collect();
    assert_eq!(refs, vec!["threshold", "user.visits"]);
}

#[test]
fn test_build_errors() {
    let err = Expression::make(ExpressionType::Add, vec![Expression::constant(1)]).unwrap_err();
    assert!(matches!(err, ExpressionError::Arity(_)));

    let err = Expression::make(
        ExpressionType::ToUpper,
        vec![Expression::constant(1)],
    )
    .unwrap_err();
    assert!(matches!(err, ExpressionError::Type(_)));

    let err = Expression::make_expression("noSuchFunction", None, vec![]).unwrap_err();
    assert!(matches!(err, ExpressionError::UnknownFunction(_)));
}

#[test]
fn test_runtime_errors_are_values() {
    init_tracing();
    let state = memory();
    let divide = call(
        ExpressionType::Divide,
        vec![path("user.age"), Expression::constant(0)],
    );
    assert!(matches!(divide.evaluate(&state), Err(EvaluationError::Type(_))));

    // comparisons absorb operand errors
    let guarded = call(
        ExpressionType::Equal,
        vec![divide.clone(), Expression::constant(1)],
    );
    assert_eq!(guarded.evaluate(&state), Ok(value!(false)));

    let fallback = call(
        ExpressionType::If,
        vec![
            call(ExpressionType::Exists, vec![path("user.nickname")]),
            path("user.nickname"),
            path("user.name"),
        ],
    );
    assert_eq!(fallback.evaluate(&state), Ok(value!("Ada")));
}

#[test]
fn test_host_functions_and_lambdas() {
    fn shout(args: &[Value]) -> Value {
        let text = args.first().and_then(Value::as_str).unwrap_or("");
        Value::from(format!("{}!!", text.to_uppercase()))
    }

    let table = FunctionTable::builtin().with(
        "shout",
        ExpressionEvaluator::apply(
            "shout",
            shout,
            ReturnType::String,
            memexpr::signature::validate_unary_string,
            None,
        ),
    );
    let expr = Expression::make_expression(
        "shout",
        Some(table.lookup("shout").unwrap()),
        vec![path("user.name")],
    )
    .unwrap();
    assert_eq!(expr.evaluate(&memory()), Ok(value!("ADA!!")));

    let lambda = Expression::lambda(|state| {
        state
            .get("threshold")
            .cloned()
            .ok_or_else(|| "no threshold".to_string())
    });
    let doubled = call(ExpressionType::Multiply, vec![lambda, Expression::constant(2)]);
    assert_eq!(doubled.evaluate(&memory()), Ok(value!(200)));
    assert_eq!(
        doubled.evaluate(&value!({})),
        Err(EvaluationError::Evaluation("no threshold".to_string()))
    );
}

#[test]
fn test_dates_over_state() {
    let state: Value = json!({"created": "2018-03-15T13:00:00.000Z"}).into();
    let next = call(
        ExpressionType::AddDays,
        vec![path("created"), Expression::constant(1)],
    );
    assert_eq!(next.evaluate(&state), Ok(value!("2018-03-16T13:00:00.000Z")));
    let year = call(ExpressionType::Year, vec![path("created")]);
    assert_eq!(year.evaluate(&state), Ok(value!(2018)));
}

#[test]
fn test_json_round_trip() {
    let state = memory();
    let back = serde_json::Value::from(&state);
    assert_eq!(back["user"]["tags"], json!(["admin", "beta"]));
    let text = state.to_json_string().unwrap();
    assert_eq!(Value::from_json_str(&text).unwrap(), state);
}
