//! Criterion benchmarks for the memexpr evaluator.
//!
//! Measures evaluation cost over prebuilt, compiled trees; building and
//! compiling are benchmarked separately in the `compile` group.
//!
//! Run:
//!   cargo bench
//!   cargo bench -- simple_path      # one group
//!   cargo bench -- comprehension    # one group

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use memexpr::{Expression, ExpressionType, Value};

// ── Data builders ─────────────────────────────────────────────────────────────

/// Flat list of numbers under `values`: [0, 1, ..., n-1].
fn numeric_list(n: usize) -> Value {
    let values: Vec<Value> = (0..n).map(Value::from).collect();
    let mut root = IndexMap::new();
    root.insert("values".to_string(), Value::list(values));
    root.insert("threshold".to_string(), Value::from(n / 2));
    Value::map(root)
}

/// 100 visit records: {page, ms, tags}.
fn visits_100() -> Value {
    let pages = ["home", "docs", "pricing", "blog"];
    let visits: Vec<Value> = (0..100_usize)
        .map(|i| {
            let mut m = IndexMap::new();
            m.insert("page".to_string(), Value::from(pages[i % pages.len()]));
            m.insert("ms".to_string(), Value::from(50 + (i * 37) % 900));
            m.insert(
                "tags".to_string(),
                Value::list((0..i % 4).map(|j| Value::from(format!("tag{j}"))).collect()),
            );
            Value::map(m)
        })
        .collect();
    let mut user = IndexMap::new();
    user.insert("name".to_string(), Value::from("Ada"));
    user.insert("visits".to_string(), Value::list(visits));
    let mut root = IndexMap::new();
    root.insert("user".to_string(), Value::map(user));
    root.insert("threshold".to_string(), Value::from(300));
    Value::map(root)
}

// ── Tree builders ─────────────────────────────────────────────────────────────

fn call(ty: ExpressionType, children: Vec<Expression>) -> Expression {
    Expression::make(ty, children).unwrap()
}

fn path(dotted: &str) -> Expression {
    dotted
        .split('.')
        .fold(None, |instance, name| Some(Expression::accessor(name, instance)))
        .unwrap()
}

fn eval(expr: &Expression, state: &Value) -> Value {
    expr.evaluate(state).unwrap()
}

// ── Bench groups ──────────────────────────────────────────────────────────────

fn bench_simple_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_path");
    group.sample_size(300);

    {
        let expr = path("name");
        let state = Value::from_json_str(r#"{"name":"Ada","age":36}"#).unwrap();
        group.bench_function("simple_path", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    {
        let expr = path("a.b.c.d.e");
        let state = Value::from_json_str(r#"{"a":{"b":{"c":{"d":{"e":42}}}}}"#).unwrap();
        group.bench_function("deep_path_5", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    {
        let expr = call(ExpressionType::Element, vec![path("values"), Expression::constant(42)]);
        let state = numeric_list(100);
        group.bench_function("element_100", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    {
        let expr = call(
            ExpressionType::GreaterThan,
            vec![
                call(ExpressionType::Multiply, vec![path("price"), path("quantity")]),
                Expression::constant(20),
            ],
        );
        let state = Value::from_json_str(r#"{"price":10.5,"quantity":3}"#).unwrap();
        group.bench_function("arithmetic", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    group.finish();
}

fn bench_collections(c: &mut Criterion) {
    let mut group = c.benchmark_group("collections");

    for n in [100_usize, 1000, 10000] {
        let state = numeric_list(n);
        let sum = call(ExpressionType::Sum, vec![path("values")]);
        let max = call(ExpressionType::Max, vec![path("values")]);
        let sorted = call(ExpressionType::SortByDescending, vec![path("values")]);

        group.bench_with_input(BenchmarkId::new("sum", n), &state, |b, s| {
            b.iter(|| black_box(eval(black_box(&sum), black_box(s))))
        });
        group.bench_with_input(BenchmarkId::new("max", n), &state, |b, s| {
            b.iter(|| black_box(eval(black_box(&max), black_box(s))))
        });
        if n <= 1000 {
            group.bench_with_input(BenchmarkId::new("sort_desc", n), &state, |b, s| {
                b.iter(|| black_box(eval(black_box(&sorted), black_box(s))))
            });
        }
    }

    group.finish();
}

fn bench_comprehensions(c: &mut Criterion) {
    let mut group = c.benchmark_group("comprehension");
    let state = visits_100();

    {
        let expr = call(
            ExpressionType::Where,
            vec![
                path("user.visits"),
                Expression::accessor("v", None),
                call(ExpressionType::GreaterThan, vec![path("v.ms"), path("threshold")]),
            ],
        )
        .compile()
        .unwrap();
        group.bench_function("where_100", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    {
        let expr = call(
            ExpressionType::Select,
            vec![
                path("user.visits"),
                Expression::accessor("v", None),
                call(
                    ExpressionType::Concat,
                    vec![path("v.page"), Expression::constant(":"), path("v.ms")],
                ),
            ],
        )
        .compile()
        .unwrap();
        group.bench_function("select_concat_100", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    {
        let inner = call(
            ExpressionType::Count,
            vec![path("v.tags")],
        );
        let expr = call(
            ExpressionType::Sum,
            vec![call(
                ExpressionType::Foreach,
                vec![path("user.visits"), Expression::accessor("v", None), inner],
            )],
        )
        .compile()
        .unwrap();
        group.bench_function("sum_of_counts_100", |b| {
            b.iter(|| black_box(eval(black_box(&expr), black_box(&state))))
        });
    }

    group.finish();
}

fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");
    let state = Value::from_json_str(r#"{"text":"The quick brown fox jumps over the lazy dog"}"#).unwrap();

    let cases = [
        ("to_upper", call(ExpressionType::ToUpper, vec![path("text")])),
        ("title_case", call(ExpressionType::TitleCase, vec![path("text")])),
        (
            "replace_ignore_case",
            call(
                ExpressionType::ReplaceIgnoreCase,
                vec![path("text"), Expression::constant("THE"), Expression::constant("a")],
            ),
        ),
        (
            "is_match",
            call(
                ExpressionType::IsMatch,
                vec![path("text"), Expression::constant("(?i)QUICK\\s+brown")],
            ),
        ),
    ];
    for (name, expr) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(eval(black_box(expr), black_box(&state))))
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    group.bench_function("build_and_compile_nested", |b| {
        b.iter(|| {
            let inner = call(
                ExpressionType::Foreach,
                vec![
                    path("v.tags"),
                    Expression::accessor("t", None),
                    call(ExpressionType::Concat, vec![path("v.page"), path("t")]),
                ],
            );
            let outer = call(
                ExpressionType::Foreach,
                vec![path("user.visits"), Expression::accessor("v", None), inner],
            );
            black_box(outer.compile().unwrap())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_simple_paths,
    bench_collections,
    bench_comprehensions,
    bench_strings,
    bench_compile,
);
criterion_main!(benches);
