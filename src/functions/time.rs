// Date and time operators
// Calendar arithmetic, date parts, formatting and timezone conversion over chrono

use chrono::{DateTime, Datelike, LocalResult, TimeZone, Timelike, Utc};

use super::{arg, integer, number, str_or_empty};
use crate::ast::{Expression, ReturnType};
use crate::datetime::{self, DateTimeError, TimeUnit, DEFAULT_FORMAT, ISO_FORMAT};
use crate::evaluator::{self, evaluate_children, EvalResult, EvaluationError, ExpressionEvaluator};
use crate::expression_type::ExpressionType;
use crate::signature::{self, ExpressionError};
use crate::timezone::TimeZoneConverter;
use crate::value::Value;

pub(super) fn evaluator(ty: ExpressionType) -> Option<ExpressionEvaluator> {
    use ExpressionType as T;
    let evaluator = match ty {
        T::AddDays => ExpressionEvaluator::time_transform(ty, datetime::add_days),
        T::AddHours => ExpressionEvaluator::time_transform(ty, datetime::add_hours),
        T::AddMinutes => ExpressionEvaluator::time_transform(ty, datetime::add_minutes),
        T::AddSeconds => ExpressionEvaluator::time_transform(ty, datetime::add_seconds),
        T::DayOfMonth => date_part(ty, day_of_month, ReturnType::Number),
        T::DayOfWeek => date_part(ty, day_of_week, ReturnType::Number),
        T::DayOfYear => date_part(ty, day_of_year, ReturnType::Number),
        T::Month => date_part(ty, month, ReturnType::Number),
        T::Date => date_part(ty, date, ReturnType::String),
        T::Year => date_part(ty, year, ReturnType::Number),
        T::Ticks => date_part(ty, ticks, ReturnType::Number),
        T::GetTimeOfDay => date_part(ty, time_of_day, ReturnType::String),
        T::UtcNow => ExpressionEvaluator::apply_with_error(
            ty,
            utc_now,
            ReturnType::String,
            validate_optional_format,
            Some(evaluator::verify_string),
        ),
        T::FormatDateTime => ExpressionEvaluator::apply_with_error(
            ty,
            format_date_time,
            ReturnType::String,
            validate_timestamp_and_format,
            None,
        ),
        T::FormatEpoch => ExpressionEvaluator::apply_with_error(
            ty,
            format_epoch,
            ReturnType::String,
            validate_number_and_format,
            None,
        ),
        T::FormatTicks => ExpressionEvaluator::apply_with_error(
            ty,
            format_ticks,
            ReturnType::String,
            validate_number_and_format,
            None,
        ),
        T::SubtractFromTime => ExpressionEvaluator::custom(
            ty,
            subtract_from_time,
            ReturnType::String,
            validate_time_unit_shift,
        ),
        T::AddToTime => ExpressionEvaluator::custom(
            ty,
            add_to_time,
            ReturnType::String,
            validate_time_unit_shift,
        ),
        T::GetFutureTime => ExpressionEvaluator::custom(
            ty,
            get_future_time,
            ReturnType::String,
            validate_relative_time,
        ),
        T::GetPastTime => ExpressionEvaluator::custom(
            ty,
            get_past_time,
            ReturnType::String,
            validate_relative_time,
        ),
        T::DateReadBack => ExpressionEvaluator::apply_with_error(
            ty,
            date_read_back,
            ReturnType::String,
            validate_two_timestamps,
            Some(evaluator::verify_string),
        ),
        T::ConvertFromUtc => ExpressionEvaluator::custom(
            ty,
            convert_from_utc,
            ReturnType::String,
            validate_timezone_conversion,
        ),
        T::ConvertToUtc => ExpressionEvaluator::custom(
            ty,
            convert_to_utc,
            ReturnType::String,
            validate_timezone_conversion,
        ),
        T::StartOfDay => start_of(ty, start_of_day),
        T::StartOfHour => start_of(ty, start_of_hour),
        T::StartOfMonth => start_of(ty, start_of_month),
        T::TicksToDays => ticks_to(ty, ticks_to_days),
        T::TicksToHours => ticks_to(ty, ticks_to_hours),
        T::TicksToMinutes => ticks_to(ty, ticks_to_minutes),
        T::DateTimeDiff => ExpressionEvaluator::apply_with_error(
            ty,
            date_time_diff,
            ReturnType::Number,
            validate_two_timestamps,
            Some(evaluator::verify_timestamp),
        ),
        _ => return None,
    };
    Some(evaluator)
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Render with a user format when given, otherwise with `default`.
fn render<Tz>(dt: &DateTime<Tz>, format: Option<&Value>, default: &str) -> Result<String, DateTimeError>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match format.and_then(Value::as_str) {
        Some(format) => datetime::format_timestamp(dt, &datetime::timestamp_formatter(format)),
        None => datetime::format_timestamp(dt, default),
    }
}

fn iso(value: &Value) -> Result<DateTime<Utc>, String> {
    datetime::parse_iso8601(str_or_empty(value)).map_err(|e| e.to_string())
}

fn cannot_evaluate(expr: &Expression) -> EvaluationError {
    EvaluationError::Type(format!("{} can't evaluate.", expr))
}

fn validate_optional_format(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[])
}

fn validate_number_and_format(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[ReturnType::Number])
}

fn validate_string_and_format(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[ReturnType::String])
}

fn validate_timestamp_and_format(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[ReturnType::String], &[ReturnType::Object])
}

fn validate_two_timestamps(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(expr, &[], &[ReturnType::String, ReturnType::String])
}

// ── Date parts ───────────────────────────────────────────────────────────────

/// Unary operator over a strict ISO timestamp.
fn date_part(
    ty: ExpressionType,
    func: fn(&[Value]) -> Result<Value, String>,
    return_type: ReturnType,
) -> ExpressionEvaluator {
    ExpressionEvaluator::apply_with_error(
        ty,
        func,
        return_type,
        signature::validate_unary_string,
        Some(evaluator::verify_string),
    )
}

fn day_of_month(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(iso(arg(args, 0))?.day() as i64))
}

/// Sunday is 0.
fn day_of_week(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(iso(arg(args, 0))?.weekday().num_days_from_sunday() as i64))
}

fn day_of_year(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(iso(arg(args, 0))?.ordinal() as i64))
}

fn month(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(iso(arg(args, 0))?.month() as i64))
}

/// `M/D/YYYY`.
fn date(args: &[Value]) -> Result<Value, String> {
    let dt = iso(arg(args, 0))?;
    Ok(Value::from(format!("{}/{}/{}", dt.month(), dt.day(), dt.year())))
}

fn year(args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(iso(arg(args, 0))?.year() as i64))
}

fn ticks(args: &[Value]) -> Result<Value, String> {
    let dt = iso(arg(args, 0))?;
    datetime::ticks(&dt)
        .map(Value::from)
        .ok_or_else(|| format!("{} is out of the datetime range.", dt))
}

fn time_of_day(args: &[Value]) -> Result<Value, String> {
    let dt = iso(arg(args, 0))?;
    Ok(Value::from(datetime::time_of_day(dt.hour(), dt.minute())))
}

fn date_read_back(args: &[Value]) -> Result<Value, String> {
    let reference = iso(arg(args, 0))?;
    let target = iso(arg(args, 1))?;
    Ok(Value::from(datetime::read_back(
        reference.date_naive(),
        target.date_naive(),
    )))
}

// ── Formatting ───────────────────────────────────────────────────────────────

fn utc_now(args: &[Value]) -> Result<Value, String> {
    let now = Utc::now();
    Ok(Value::from(render(&now, args.first(), ISO_FORMAT).map_err(|e| e.to_string())?))
}

/// A number is taken as Unix seconds; a string may be any parseable timestamp.
fn format_date_time(args: &[Value]) -> Result<Value, String> {
    let dt = match arg(args, 0) {
        Value::Number(seconds) => epoch(*seconds)?,
        Value::String(s) => datetime::parse_lenient(s).map_err(|e| e.to_string())?,
        other => return Err(format!("{} is not a valid datetime string.", other)),
    };
    Ok(Value::from(render(&dt, args.get(1), ISO_FORMAT).map_err(|e| e.to_string())?))
}

fn epoch(seconds: f64) -> Result<DateTime<Utc>, String> {
    DateTime::from_timestamp_millis((seconds * 1000.0).round() as i64)
        .ok_or_else(|| format!("{} is out of the datetime range.", seconds))
}

fn format_epoch(args: &[Value]) -> Result<Value, String> {
    let seconds = arg(args, 0)
        .as_f64()
        .ok_or_else(|| format!("{} is not a number.", arg(args, 0)))?;
    let dt = epoch(seconds)?;
    Ok(Value::from(render(&dt, args.get(1), ISO_FORMAT).map_err(|e| e.to_string())?))
}

fn format_ticks(args: &[Value]) -> Result<Value, String> {
    let ticks = integer(arg(args, 0)).ok_or_else(|| format!("{} is not a integer.", arg(args, 0)))?;
    let dt = datetime::from_ticks(ticks)
        .ok_or_else(|| format!("{} is out of the datetime range.", ticks))?;
    Ok(Value::from(render(&dt, args.get(1), ISO_FORMAT).map_err(|e| e.to_string())?))
}

// ── Unit arithmetic ──────────────────────────────────────────────────────────

fn validate_time_unit_shift(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::String],
        &[ReturnType::String, ReturnType::Number, ReturnType::String],
    )
}

fn validate_relative_time(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::String],
        &[ReturnType::Number, ReturnType::String],
    )
}

/// `(timestamp, amount, unit[, format])` shifted by `sign * amount` units.
fn shift_timestamp(expr: &Expression, state: &mut Value, sign: i64, default: &str) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let (Value::String(timestamp), Some(amount), Value::String(unit)) =
        (arg(&args, 0), integer(arg(&args, 1)), arg(&args, 2))
    else {
        return Err(cannot_evaluate(expr));
    };
    let unit: TimeUnit = unit.parse()?;
    let parsed = datetime::parse_iso8601(timestamp)?;
    let shifted = amount
        .checked_mul(sign)
        .and_then(|amount| unit.add(parsed, amount))
        .ok_or_else(|| EvaluationError::Evaluation(format!("{} is out of the datetime range.", expr)))?;
    Ok(Value::from(render(&shifted, args.get(3), default)?))
}

fn subtract_from_time(expr: &Expression, state: &mut Value) -> EvalResult {
    shift_timestamp(expr, state, -1, ISO_FORMAT)
}

fn add_to_time(expr: &Expression, state: &mut Value) -> EvalResult {
    shift_timestamp(expr, state, 1, DEFAULT_FORMAT)
}

/// `(amount, unit[, format])` relative to now.
fn shift_now(expr: &Expression, state: &mut Value, sign: i64) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let (Some(amount), Value::String(unit)) = (integer(arg(&args, 0)), arg(&args, 1)) else {
        return Err(cannot_evaluate(expr));
    };
    let unit: TimeUnit = unit.parse()?;
    let shifted = amount
        .checked_mul(sign)
        .and_then(|amount| unit.add(Utc::now(), amount))
        .ok_or_else(|| EvaluationError::Evaluation(format!("{} is out of the datetime range.", expr)))?;
    Ok(Value::from(render(&shifted, args.get(2), DEFAULT_FORMAT)?))
}

fn get_future_time(expr: &Expression, state: &mut Value) -> EvalResult {
    shift_now(expr, state, 1)
}

fn get_past_time(expr: &Expression, state: &mut Value) -> EvalResult {
    shift_now(expr, state, -1)
}

// ── Timezones ────────────────────────────────────────────────────────────────

fn validate_timezone_conversion(expr: &Expression) -> Result<(), ExpressionError> {
    signature::validate_order(
        expr,
        &[ReturnType::String],
        &[ReturnType::String, ReturnType::String],
    )
}

fn resolve_timezone(id: &str) -> Result<chrono_tz::Tz, EvaluationError> {
    TimeZoneConverter::global()
        .resolve(id)
        .ok_or_else(|| EvaluationError::Evaluation(format!("{} is not a valid timezone", id)))
}

/// ISO UTC timestamp rendered as wall-clock time in the target zone.
fn convert_from_utc(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let (Value::String(timestamp), Value::String(zone)) = (arg(&args, 0), arg(&args, 1)) else {
        return Err(EvaluationError::Type(format!("{} cannot evaluate", expr)));
    };
    let parsed = datetime::parse_iso8601(timestamp)?;
    let zone = resolve_timezone(zone)?;
    Ok(Value::from(render(&parsed.with_timezone(&zone), args.get(2), DEFAULT_FORMAT)?))
}

/// Wall-clock time in the source zone rendered as UTC. A timestamp that
/// already carries an offset keeps its instant.
fn convert_to_utc(expr: &Expression, state: &mut Value) -> EvalResult {
    let args = evaluate_children(expr, state, None)?;
    let (Value::String(timestamp), Value::String(zone_id)) = (arg(&args, 0), arg(&args, 1)) else {
        return Err(EvaluationError::Type(format!("{} cannot evaluate", expr)));
    };
    let zone = resolve_timezone(zone_id)?;
    let (naive, instant) = datetime::parse_local(timestamp)
        .ok_or_else(|| DateTimeError::Invalid(timestamp.to_string()))?;
    let utc = match instant {
        Some(instant) => instant,
        None => match zone.from_local_datetime(&naive) {
            LocalResult::Single(local) | LocalResult::Ambiguous(local, _) => local.with_timezone(&Utc),
            LocalResult::None => {
                return Err(EvaluationError::Evaluation(format!(
                    "{} with {} is not a valid timestamp with specified timeZone:",
                    timestamp, zone_id
                )))
            }
        },
    };
    Ok(Value::from(render(&utc, args.get(2), DEFAULT_FORMAT)?))
}

// ── Truncation ───────────────────────────────────────────────────────────────

fn start_of(ty: ExpressionType, func: fn(&[Value]) -> Result<Value, String>) -> ExpressionEvaluator {
    ExpressionEvaluator::apply_with_error(
        ty,
        func,
        ReturnType::String,
        validate_string_and_format,
        Some(evaluator::verify_string),
    )
}

fn truncate(
    args: &[Value],
    func: fn(&DateTime<Utc>) -> Option<DateTime<Utc>>,
) -> Result<Value, String> {
    let dt = iso(arg(args, 0))?;
    let truncated = func(&dt).ok_or_else(|| format!("{} cannot be truncated.", arg(args, 0)))?;
    Ok(Value::from(
        render(&truncated, args.get(1), DEFAULT_FORMAT).map_err(|e| e.to_string())?,
    ))
}

fn start_of_day(args: &[Value]) -> Result<Value, String> {
    truncate(args, datetime::start_of_day)
}

fn start_of_hour(args: &[Value]) -> Result<Value, String> {
    truncate(args, datetime::start_of_hour)
}

fn start_of_month(args: &[Value]) -> Result<Value, String> {
    truncate(args, datetime::start_of_month)
}

// ── Ticks ────────────────────────────────────────────────────────────────────

fn ticks_to(ty: ExpressionType, func: fn(&[Value]) -> Value) -> ExpressionEvaluator {
    ExpressionEvaluator::apply(
        ty,
        func,
        ReturnType::Number,
        signature::validate_unary_number,
        Some(evaluator::verify_integer),
    )
}

fn ticks_to_days(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)) / datetime::TICKS_PER_DAY as f64)
}

fn ticks_to_hours(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)) / datetime::TICKS_PER_HOUR as f64)
}

fn ticks_to_minutes(args: &[Value]) -> Value {
    Value::from(number(arg(args, 0)) / datetime::TICKS_PER_MINUTE as f64)
}

/// Difference `first - second` in ticks.
fn date_time_diff(args: &[Value]) -> Result<Value, String> {
    let first = datetime::parse_lenient(str_or_empty(arg(args, 0))).map_err(|e| e.to_string())?;
    let second = datetime::parse_lenient(str_or_empty(arg(args, 1))).map_err(|e| e.to_string())?;
    datetime::ticks(&first)
        .zip(datetime::ticks(&second))
        .and_then(|(a, b)| a.checked_sub(b))
        .map(Value::from)
        .ok_or_else(|| format!("The difference between {} and {} is out of the datetime range.", first, second))
}

#[cfg(test)]
mod tests {
    use crate::ast::Expression;
    use crate::evaluator::EvaluationError;
    use crate::expression_type::ExpressionType;
    use crate::value;
    use crate::value::Value;
    use chrono::DateTime;

    const TS: &str = "2018-03-15T13:00:00.000Z";

    fn eval(ty: ExpressionType, args: Vec<Value>) -> Result<Value, EvaluationError> {
        let children = args.into_iter().map(Expression::constant).collect();
        Expression::make(ty, children).unwrap().evaluate(&Value::Null)
    }

    #[test]
    fn test_add_transforms() {
        assert_eq!(eval(ExpressionType::AddDays, vec![value!(TS), value!(1)]), Ok(value!("2018-03-16T13:00:00.000Z")));
        assert_eq!(eval(ExpressionType::AddHours, vec![value!(TS), value!(-14)]), Ok(value!("2018-03-14T23:00:00.000Z")));
        assert_eq!(
            eval(ExpressionType::AddMinutes, vec![value!(TS), value!(30), value!("MM-dd-yy HH:mm")]),
            Ok(value!("03-15-18 13:30"))
        );
        assert!(eval(ExpressionType::AddSeconds, vec![value!("2018-03-15"), value!(1)]).is_err());
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(eval(ExpressionType::DayOfMonth, vec![value!(TS)]), Ok(value!(15)));
        assert_eq!(eval(ExpressionType::DayOfWeek, vec![value!(TS)]), Ok(value!(4)));
        assert_eq!(eval(ExpressionType::DayOfYear, vec![value!(TS)]), Ok(value!(74)));
        assert_eq!(eval(ExpressionType::Month, vec![value!(TS)]), Ok(value!(3)));
        assert_eq!(eval(ExpressionType::Date, vec![value!(TS)]), Ok(value!("3/15/2018")));
        assert_eq!(eval(ExpressionType::Year, vec![value!(TS)]), Ok(value!(2018)));
        assert_eq!(eval(ExpressionType::GetTimeOfDay, vec![value!(TS)]), Ok(value!("afternoon")));
        assert_eq!(
            eval(ExpressionType::Month, vec![value!("2018-03-15")]),
            Err(EvaluationError::Evaluation("2018-03-15 is not a ISO format datetime string.".to_string()))
        );
    }

    #[test]
    fn test_format_date_time() {
        assert_eq!(
            eval(ExpressionType::FormatDateTime, vec![value!("2018-03-15T13:00:00Z")]),
            Ok(value!(TS))
        );
        assert_eq!(
            eval(ExpressionType::FormatDateTime, vec![value!(1521118800), value!("yyyy-MM-dd")]),
            Ok(value!("2018-03-15"))
        );
        assert_eq!(eval(ExpressionType::FormatEpoch, vec![value!(1521118800)]), Ok(value!(TS)));
        assert_eq!(
            eval(ExpressionType::FormatTicks, vec![value!(636503904000000000_i64)]),
            Ok(value!("2018-01-01T08:00:00.000Z"))
        );
    }

    #[test]
    fn test_unit_arithmetic() {
        assert_eq!(
            eval(ExpressionType::AddToTime, vec![value!("2018-01-01T08:00:00.000Z"), value!(1), value!("Day")]),
            Ok(value!("2018-01-02T08:00:00.000+00:00"))
        );
        assert_eq!(
            eval(ExpressionType::SubtractFromTime, vec![value!(TS), value!(1), value!("Month")]),
            Ok(value!("2018-02-15T13:00:00.000Z"))
        );
        assert_eq!(
            eval(ExpressionType::SubtractFromTime, vec![value!(TS), value!(1), value!("Fortnight")]),
            Err(EvaluationError::Evaluation("Fortnight is not a valid time unit.".to_string()))
        );
        assert!(matches!(
            eval(ExpressionType::AddToTime, vec![value!(TS), value!(1.5), value!("Day")]),
            Err(EvaluationError::Type(_))
        ));
    }

    #[test]
    fn test_relative_to_now() {
        let before = chrono::Utc::now();
        let future = eval(ExpressionType::GetFutureTime, vec![value!(1), value!("Day")]).unwrap();
        let future = DateTime::parse_from_rfc3339(future.as_str().unwrap()).unwrap();
        assert!(future > before + chrono::Duration::hours(23));

        let past = eval(ExpressionType::GetPastTime, vec![value!(1), value!("Week"), value!("yyyy")]).unwrap();
        assert_eq!(past.as_str().unwrap().len(), 4);
    }

    #[test]
    fn test_timezone_conversion() {
        assert_eq!(
            eval(ExpressionType::ConvertFromUtc, vec![value!("2018-01-01T08:00:00.000Z"), value!("Pacific Standard Time")]),
            Ok(value!("2018-01-01T00:00:00.000-08:00"))
        );
        assert_eq!(
            eval(ExpressionType::ConvertToUtc, vec![value!("2018-01-01T00:00:00"), value!("America/Los_Angeles")]),
            Ok(value!("2018-01-01T08:00:00.000+00:00"))
        );
        assert_eq!(
            eval(ExpressionType::ConvertFromUtc, vec![value!(TS), value!("Mars/Olympus")]),
            Err(EvaluationError::Evaluation("Mars/Olympus is not a valid timezone".to_string()))
        );
    }

    #[test]
    fn test_start_of() {
        assert_eq!(
            eval(ExpressionType::StartOfDay, vec![value!("2018-03-15T13:30:30.000Z")]),
            Ok(value!("2018-03-15T00:00:00.000+00:00"))
        );
        assert_eq!(
            eval(ExpressionType::StartOfHour, vec![value!("2018-03-15T13:30:30.000Z"), value!("HH:mm")]),
            Ok(value!("13:00"))
        );
        assert_eq!(
            eval(ExpressionType::StartOfMonth, vec![value!("2018-03-15T13:30:30.000Z")]),
            Ok(value!("2018-03-01T00:00:00.000+00:00"))
        );
    }

    #[test]
    fn test_ticks() {
        assert_eq!(
            eval(ExpressionType::Ticks, vec![value!("2018-01-01T08:00:00.000Z")]),
            Ok(value!(636503904000000000_i64))
        );
        assert_eq!(eval(ExpressionType::TicksToDays, vec![value!(864000000000_i64)]), Ok(value!(1)));
        assert_eq!(eval(ExpressionType::TicksToHours, vec![value!(18000000000_i64)]), Ok(value!(0.5)));
        assert_eq!(eval(ExpressionType::TicksToMinutes, vec![value!(600000000_i64)]), Ok(value!(1)));
        assert_eq!(
            eval(ExpressionType::DateTimeDiff, vec![value!("2019-01-01T08:00:00.000Z"), value!("2018-01-01T08:00:00.000Z")]),
            Ok(value!(315360000000000_i64))
        );
    }

    #[test]
    fn test_extreme_amounts_are_errors() {
        let out_of_range = |result: Result<Value, EvaluationError>| {
            matches!(result, Err(EvaluationError::Evaluation(msg)) if msg.contains("out of the datetime range"))
        };
        assert!(out_of_range(eval(ExpressionType::FormatTicks, vec![Value::from(i64::MIN)])));
        assert!(out_of_range(eval(
            ExpressionType::SubtractFromTime,
            vec![value!(TS), Value::from(i64::MIN), value!("Second")]
        )));
        assert!(out_of_range(eval(
            ExpressionType::AddToTime,
            vec![value!(TS), Value::from(i64::MAX), value!("Year")]
        )));
        assert!(out_of_range(eval(
            ExpressionType::GetPastTime,
            vec![Value::from(i64::MIN), value!("Second")]
        )));
    }

    #[test]
    fn test_date_read_back() {
        assert_eq!(
            eval(ExpressionType::DateReadBack, vec![value!("2018-03-15T13:00:00.000Z"), value!("2018-03-16T13:00:00.000Z")]),
            Ok(value!("tomorrow"))
        );
    }
}
