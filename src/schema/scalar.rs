//! Scalar coercion
//!
//! Output values go through [`serialize`], input values (arguments and
//! variables) through [`parse_input`]. Built-in scalars follow the GraphQL
//! coercion rules; custom scalars delegate to their [`ScalarCoercer`] or pass
//! values through unchanged.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::ScalarType;

/// Custom coercion rules for a scalar type
pub trait ScalarCoercer: Send + Sync {
    /// Coerce a resolved value into its response representation
    fn serialize(&self, value: &Value) -> Result<Value, String>;

    /// Coerce an input value (argument or variable)
    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        self.serialize(value)
    }
}

/// The scalars every schema contains
pub fn builtin_scalars() -> Vec<ScalarType> {
    vec![
        ScalarType::new("Int").with_description("A signed 32-bit integer"),
        ScalarType::new("Float").with_description("A signed double-precision floating-point value"),
        ScalarType::new("String").with_description("A UTF-8 character sequence"),
        ScalarType::new("Boolean").with_description("`true` or `false`"),
        ScalarType::new("ID").with_description("A unique identifier, serialized as a string"),
    ]
}

/// Coerce a resolved value for a response
pub fn serialize(scalar: &ScalarType, value: &Value) -> Result<Value, String> {
    match scalar.name.as_str() {
        "Int" => serialize_int(value),
        "Float" => serialize_float(value),
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(format!("String cannot represent value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s == "true" || s == "false" => Ok(Value::Bool(s == "true")),
            _ => Err(format!("Boolean cannot represent value: {}", value)),
        },
        "ID" => coerce_id(value),
        _ => match &scalar.coercer {
            Some(coercer) => coercer.serialize(value),
            None => Ok(value.clone()),
        },
    }
}

/// Coerce an argument or variable value
pub fn parse_input(scalar: &ScalarType, value: &Value) -> Result<Value, String> {
    match scalar.name.as_str() {
        "Int" => value
            .as_i64()
            .filter(|n| i32::try_from(*n).is_ok())
            .map(Value::from)
            .ok_or_else(|| format!("Int cannot represent value: {}", value)),
        "Float" => value
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| format!("Float cannot represent value: {}", value)),
        "String" => match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(format!("String cannot represent value: {}", value)),
        },
        "Boolean" => match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(format!("Boolean cannot represent value: {}", value)),
        },
        "ID" => coerce_id(value),
        _ => match &scalar.coercer {
            Some(coercer) => coercer.parse_value(value),
            None => Ok(value.clone()),
        },
    }
}

fn serialize_int(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };
    parsed
        .filter(|n| i32::try_from(*n).is_ok())
        .map(Value::from)
        .ok_or_else(|| format!("Int cannot represent value: {}", value))
}

fn serialize_float(value: &Value) -> Result<Value, String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .map(Value::from)
        .ok_or_else(|| format!("Float cannot represent value: {}", value))
}

fn coerce_id(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::String(n.to_string())),
        _ => Err(format!("ID cannot represent value: {}", value)),
    }
}

/// RFC 3339 date-time scalar, always serialized in UTC with millisecond
/// precision; integers are read as epoch milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeScalar;

impl DateTimeScalar {
    fn format(date: DateTime<Utc>) -> Value {
        Value::String(date.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    fn parse_str(s: &str) -> Result<Value, String> {
        DateTime::parse_from_rfc3339(s)
            .map(|date| Self::format(date.with_timezone(&Utc)))
            .map_err(|e| format!("DateTime cannot represent value '{}': {}", s, e))
    }
}

impl ScalarCoercer for DateTimeScalar {
    fn serialize(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(s) => Self::parse_str(s),
            Value::Number(n) => n
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .map(Self::format)
                .ok_or_else(|| format!("DateTime cannot represent value: {}", value)),
            _ => Err(format!("DateTime cannot represent value: {}", value)),
        }
    }

    fn parse_value(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::String(s) => Self::parse_str(s),
            _ => Err(format!("DateTime cannot represent value: {}", value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scalar(name: &str) -> ScalarType {
        ScalarType::new(name)
    }

    #[test]
    fn test_int_serialization() {
        let int = scalar("Int");
        assert_eq!(serialize(&int, &json!(42)), Ok(json!(42)));
        assert_eq!(serialize(&int, &json!(4.0)), Ok(json!(4)));
        assert_eq!(serialize(&int, &json!("17")), Ok(json!(17)));
        assert!(serialize(&int, &json!(4.5)).is_err());
        assert!(serialize(&int, &json!(i64::from(i32::MAX) + 1)).is_err());
        assert!(serialize(&int, &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_string_serialization_stringifies_primitives() {
        let string = scalar("String");
        assert_eq!(serialize(&string, &json!("ok")), Ok(json!("ok")));
        assert_eq!(serialize(&string, &json!(12)), Ok(json!("12")));
        assert_eq!(serialize(&string, &json!(true)), Ok(json!("true")));
        assert!(serialize(&string, &json!([1])).is_err());
    }

    #[test]
    fn test_id_accepts_strings_and_integers() {
        let id = scalar("ID");
        assert_eq!(serialize(&id, &json!("abc")), Ok(json!("abc")));
        assert_eq!(serialize(&id, &json!(7)), Ok(json!("7")));
        assert!(serialize(&id, &json!(1.5)).is_err());
    }

    #[test]
    fn test_input_coercion_is_strict() {
        assert!(parse_input(&scalar("Int"), &json!("1")).is_err());
        assert!(parse_input(&scalar("String"), &json!(1)).is_err());
        assert!(parse_input(&scalar("Boolean"), &json!("true")).is_err());
        assert_eq!(parse_input(&scalar("Float"), &json!(1)), Ok(json!(1.0)));
    }

    #[test]
    fn test_custom_scalar_without_coercer_passes_through() {
        let json_scalar = scalar("JSON");
        let value = json!({ "nested": [1, 2] });
        assert_eq!(serialize(&json_scalar, &value), Ok(value.clone()));
        assert_eq!(parse_input(&json_scalar, &value), Ok(value));
    }

    #[test]
    fn test_date_time_normalizes_to_utc() {
        let date_time = ScalarType::date_time();
        assert_eq!(
            serialize(&date_time, &json!("2016-05-01T12:30:00+02:00")),
            Ok(json!("2016-05-01T10:30:00.000Z"))
        );
        assert_eq!(serialize(&date_time, &json!(0)), Ok(json!("1970-01-01T00:00:00.000Z")));
        assert!(serialize(&date_time, &json!("yesterday")).is_err());
        assert!(parse_input(&date_time, &json!(0)).is_err());
    }
}
