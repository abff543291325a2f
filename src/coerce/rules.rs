//! Generic coercion rules shared by every handler.
//!
//! [`StringRule`] covers the string-keyed facets (uri args, query params)
//! where every incoming value starts life as a string. [`JsonRule`]
//! covers parsed JSON bodies, where the only mismatch worth repairing is
//! an integral float where an integer is expected.
//!
//! Both rules are forgiving: a value they cannot convert is returned
//! unchanged so the structural validator reports it with full context
//! instead of the rule guessing.

use serde_json::Value;
use std::sync::Arc;

use super::matcher::{CoercionRule, ValueCoercer};

/// Schema `type` keyword, when present and a plain string.
fn schema_type(schema: &Value) -> Option<&str> {
    schema.get("type").and_then(Value::as_str)
}

/// Generous string-to-typed conversions for parameter facets.
///
/// Claims nodes typed `integer`, `number`, `boolean`, `array` or
/// `object`; see the module docs for what each conversion accepts.
/// Nodes typed `string`, untyped nodes and union types are declined.
pub struct StringRule;

impl CoercionRule for StringRule {
    fn coercer(&self, schema: &Value) -> Option<ValueCoercer> {
        match schema_type(schema)? {
            "integer" => Some(Arc::new(to_integer)),
            "number" => Some(Arc::new(to_number)),
            "boolean" => Some(Arc::new(to_boolean)),
            "array" => Some(Arc::new(split_csv)),
            "object" => Some(Arc::new(parse_object)),
            _ => None,
        }
    }
}

/// Minimal repairs for values that arrived as parsed JSON.
///
/// Only claims `integer` nodes, narrowing integral floats (`3.0`) to
/// integers. Everything else in a JSON body already has its final shape.
pub struct JsonRule;

impl CoercionRule for JsonRule {
    fn coercer(&self, schema: &Value) -> Option<ValueCoercer> {
        match schema_type(schema)? {
            "integer" => Some(Arc::new(narrow_integral)),
            _ => None,
        }
    }
}

/// Finite, fractionless and within i64 range. The upper bound is strict:
/// `i64::MAX as f64` rounds up to 2^63, which `as i64` would saturate.
fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// `"42"` -> `42`, `"3.0"` -> `3`, integral floats narrowed; anything
/// else unchanged.
fn to_integer(value: Value) -> Value {
    match value {
        Value::String(s) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                return Value::from(n);
            }
            if let Ok(f) = s.trim().parse::<f64>() {
                if is_integral(f) {
                    return Value::from(f as i64);
                }
            }
            Value::String(s)
        }
        other => narrow_integral(other),
    }
}

/// `"3.5"` -> `3.5`, `"42"` -> `42`; anything else unchanged.
fn to_number(value: Value) -> Value {
    match value {
        Value::String(s) => {
            if let Ok(n) = s.trim().parse::<i64>() {
                return Value::from(n);
            }
            if let Ok(f) = s.trim().parse::<f64>() {
                if let Some(n) = serde_json::Number::from_f64(f) {
                    return Value::Number(n);
                }
            }
            Value::String(s)
        }
        other => other,
    }
}

/// `"true"`/`"false"` -> booleans; anything else unchanged.
fn to_boolean(value: Value) -> Value {
    match value {
        Value::String(s) => match s.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s),
        },
        other => other,
    }
}

/// Comma-split a string into an array of trimmed strings.
///
/// Element-level conversion is not done here; the walker descends into
/// the `items` schema afterwards, where the integer/number/boolean
/// conversions apply per element. Empty chunks are dropped, so `"a,,b"`
/// and `"a,b"` split identically and `""` becomes an empty array.
fn split_csv(value: Value) -> Value {
    match value {
        Value::String(s) => Value::Array(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect(),
        ),
        other => other,
    }
}

/// Parse a JSON object literal out of a string.
///
/// Non-object parses and parse failures leave the string unchanged.
fn parse_object(value: Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(parsed @ Value::Object(_)) => parsed,
            _ => Value::String(s),
        },
        other => other,
    }
}

/// `3.0` -> `3` where an integer is expected; everything else unchanged.
fn narrow_integral(value: Value) -> Value {
    if let Value::Number(n) = &value {
        if !n.is_i64() && !n.is_u64() {
            if let Some(f) = n.as_f64() {
                if is_integral(f) {
                    return Value::from(f as i64);
                }
            }
        }
    }
    value
}
