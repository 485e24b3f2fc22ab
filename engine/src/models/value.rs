//! Typed values produced by the transform chains.

use chrono::{DateTime, FixedOffset, NaiveTime};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{TransformError, TransformResult};

/// Parsed values of one row, keyed by field key.
pub type Record = BTreeMap<String, Value>;

// =============================================================================
// Time of day with offset
// =============================================================================

/// A time of day bound to a fixed UTC offset.
///
/// `chrono` has no offset-aware time type, so the two halves travel together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTime {
    pub time: NaiveTime,
    pub offset: FixedOffset,
}

impl fmt::Display for OffsetTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.time, self.offset)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A single value flowing through a field's chain.
///
/// Raw values enter as [`Value::Str`]; type converters turn them into the
/// other variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value (optional or nullable field).
    Null,
    /// UTF-8 string.
    Str(String),
    /// 64-bit signed integer.
    Int(i64),
    /// Arbitrary-precision decimal.
    Decimal(Decimal),
    /// Time of day with offset.
    Time(OffsetTime),
    /// Date and time with offset.
    DateTime(DateTime<FixedOffset>),
}

impl Value {
    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Decimal(_) => "decimal",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Null or the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Falsy values are null, the empty string and numeric zero.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Str(s) => !s.is_empty(),
            Value::Int(i) => *i != 0,
            Value::Decimal(d) => !d.is_zero(),
            Value::Time(_) | Value::DateTime(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of the value; integers are widened to decimals.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Multiply two numeric values.
    ///
    /// Integer times integer stays an integer; any decimal operand makes the
    /// result a decimal.
    pub fn multiply(&self, other: &Value) -> TransformResult<Value> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.checked_mul(*b).map(Value::Int).ok_or_else(|| {
                TransformError::rejected(format!("multiplying {a} by {b} overflows"))
            }),
            _ => match (self.as_decimal(), other.as_decimal()) {
                (Some(a), Some(b)) => a.checked_mul(b).map(Value::Decimal).ok_or_else(|| {
                    TransformError::rejected(format!("multiplying {a} by {b} overflows"))
                }),
                _ => Err(TransformError::IncompatibleTypes(format!(
                    "cannot multiply '{}' by '{}'",
                    self.type_name(),
                    other.type_name()
                ))),
            },
        }
    }

    /// Divide two numeric values. The result is always a decimal.
    pub fn divide(&self, other: &Value) -> TransformResult<Value> {
        let (Some(numerator), Some(denominator)) = (self.as_decimal(), other.as_decimal()) else {
            return Err(TransformError::IncompatibleTypes(format!(
                "cannot divide '{}' by '{}'",
                self.type_name(),
                other.type_name()
            )));
        };
        if denominator.is_zero() {
            return Err(TransformError::rejected(format!("cannot divide {numerator} by zero")));
        }
        numerator
            .checked_div(denominator)
            .map(Value::Decimal)
            .ok_or_else(|| TransformError::rejected(format!("dividing {numerator} by {denominator} overflows")))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Str(s) => f.write_str(s),
            Value::Int(i) => write!(f, "{i}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Int(i) => serializer.serialize_i64(*i),
            // Strings keep precision and offsets intact.
            other => serializer.collect_str(other),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Decimal(dec("0.00")).is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Int(-1).is_truthy());
    }

    #[test]
    fn test_multiply_keeps_integers() {
        assert_eq!(Value::Int(3).multiply(&Value::Int(4)).unwrap(), Value::Int(12));
        assert_eq!(
            Value::Decimal(dec("1.5")).multiply(&Value::Int(2)).unwrap(),
            Value::Decimal(dec("3"))
        );
    }

    #[test]
    fn test_multiply_rejects_strings() {
        let err = Value::from("e").multiply(&Value::from("e")).unwrap_err();
        assert!(matches!(err, TransformError::IncompatibleTypes(_)));
    }

    #[test]
    fn test_divide_yields_decimal() {
        assert_eq!(Value::Int(1).divide(&Value::Int(2)).unwrap(), Value::Decimal(dec("0.5")));
        assert!(Value::Int(1).divide(&Value::Int(0)).is_err());
        assert!(Value::from("e").divide(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_value(Value::Decimal(dec("6.66"))).unwrap();
        assert_eq!(json, serde_json::json!("6.66"));
        assert_eq!(serde_json::to_value(Value::Int(7)).unwrap(), serde_json::json!(7));
        assert_eq!(serde_json::to_value(Value::Null).unwrap(), serde_json::Value::Null);
    }
}
