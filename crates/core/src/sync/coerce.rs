//! Cell value coercion into declared destination types.
//!
//! Coercion is total: a bad cell degrades to a safe default instead of
//! failing, so one malformed value can never abort a batch. Whether the
//! resulting row is acceptable is the validator's call, not coercion's.

use chrono::NaiveDate;
use serde_json::Value;

use crate::catalog::FieldType;

/// Coerce one raw sheet cell into the destination field's declared type.
///
/// Empty or null input yields `0` for numbers and `Null` for every other
/// type. Never panics and never errors.
pub fn coerce(raw: &Value, field_type: FieldType) -> Value {
    if is_blank(raw) {
        return match field_type {
            FieldType::Number => Value::from(0),
            _ => Value::Null,
        };
    }

    match field_type {
        FieldType::Number => coerce_number(raw),
        FieldType::Boolean => Value::Bool(coerce_boolean(raw)),
        FieldType::Date => coerce_date(raw),
        FieldType::String | FieldType::Identifier => raw.clone(),
    }
}

/// True for `Null` and for strings that are empty after trimming.
pub fn is_blank(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}

fn coerce_number(raw: &Value) -> Value {
    match raw {
        Value::Number(_) => raw.clone(),
        Value::Bool(flag) => Value::from(i64::from(*flag)),
        Value::String(text) => json_number(parse_locale_number(text).unwrap_or(0.0)),
        _ => Value::from(0),
    }
}

/// Parse a pt-BR formatted amount: currency markers and grouping dots are
/// stripped, a decimal comma becomes a decimal point. "R$ 1.234,56" → 1234.56.
fn parse_locale_number(text: &str) -> Option<f64> {
    let mut cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.contains(',') {
        cleaned.retain(|c| c != '.');
        cleaned = cleaned.replace(',', ".");
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn json_number(value: f64) -> Value {
    // Whole amounts land as JSON integers so they compare cleanly against
    // destination rows; fractional ones keep their f64 representation.
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

fn coerce_boolean(raw: &Value) -> bool {
    match raw {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "sim" | "true" | "1" | "s" => true,
            other => !other.is_empty(),
        },
        _ => true,
    }
}

fn coerce_date(raw: &Value) -> Value {
    if let Value::String(text) = raw {
        if let Ok(date) = NaiveDate::parse_from_str(text.trim(), "%d/%m/%Y") {
            return Value::String(date.format("%Y-%m-%d").to_string());
        }
    }
    // Any other shape passes through; the destination rejects malformed dates.
    raw.clone()
}
