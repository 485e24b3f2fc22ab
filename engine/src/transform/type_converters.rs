//! Type converters: turn the pre-processed string into a typed value.
//!
//! Exactly one converter sits in every field chain. Converters also accept
//! already-typed input so they can follow a builder in a computed field.

use chrono::{DateTime, FixedOffset, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{ConfigResult, TransformError, TransformResult};
use crate::models::{OffsetTime, Value};

use super::registry::Registry;
use super::{Buildable, Parameters, Transform};

pub(crate) fn register_builtins(registry: &mut Registry<dyn Transform>) {
    registry.register::<StrConverter>();
    registry.register::<IntConverter>();
    registry.register::<DecimalConverter>();
    registry.register::<TimeConverter>();
    registry.register::<DateTimeConverter>();
}

/// Wraps the configured converter: with `nullable`, empty input becomes
/// null without calling the converter.
#[derive(Debug)]
pub struct Nullable {
    converter: Box<dyn Transform>,
    nullable: bool,
}

impl Nullable {
    pub fn new(converter: Box<dyn Transform>, nullable: bool) -> Self {
        Self { converter, nullable }
    }
}

impl Transform for Nullable {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        if self.nullable && value.is_empty() {
            return Ok(Value::Null);
        }
        self.converter.apply(value)
    }
}

// =============================================================================
// Scalars
// =============================================================================

#[derive(Debug)]
pub struct StrConverter;

impl Buildable for StrConverter {
    const KEY: &'static str = "str";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for StrConverter {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        match value {
            Value::Str(_) => Ok(value),
            other => Ok(Value::Str(other.to_string())),
        }
    }
}

/// 64-bit integers. Surrounding whitespace is tolerated.
#[derive(Debug)]
pub struct IntConverter;

impl Buildable for IntConverter {
    const KEY: &'static str = "int";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for IntConverter {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let converted = match &value {
            Value::Int(i) => Some(*i),
            Value::Str(s) => s.trim().parse::<i64>().ok(),
            Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            _ => None,
        };
        converted
            .map(Value::Int)
            .ok_or_else(|| TransformError::rejected(format!("value '{value}' is not a valid integer")))
    }
}

/// Arbitrary-precision decimals, plain or in scientific notation.
#[derive(Debug)]
pub struct DecimalConverter;

impl Buildable for DecimalConverter {
    const KEY: &'static str = "decimal";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for DecimalConverter {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let converted = match &value {
            Value::Decimal(d) => Some(*d),
            Value::Int(i) => Some(Decimal::from(*i)),
            Value::Str(s) => {
                let s = s.trim();
                Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
            }
            _ => None,
        };
        converted
            .map(Value::Decimal)
            .ok_or_else(|| TransformError::rejected(format!("value '{value}' is not a valid decimal")))
    }
}

// =============================================================================
// Temporal values
// =============================================================================

/// Parse a UTC offset: `Z`, `+HH`, `+HHMM` or `+HH:MM`.
fn parse_offset(s: &str) -> Option<FixedOffset> {
    if s == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match s.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = s[1..].chars().filter(|c| *c != ':').collect();
    if !matches!(digits.len(), 2 | 4) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = if digits.len() == 4 { digits[2..].parse().ok()? } else { 0 };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_time(s: &str) -> Option<OffsetTime> {
    // Time of day never contains a sign, so the first one starts the offset.
    let split = s.find(['+', '-', 'Z'].as_slice())?;
    let (time, offset) = s.split_at(split);
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))
        .ok()?;
    Some(OffsetTime {
        time,
        offset: parse_offset(offset)?,
    })
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        DATETIME_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(s, format).ok())
    })
}

/// ISO time of day with an offset. Naive times are rejected.
#[derive(Debug)]
pub struct TimeConverter;

impl Buildable for TimeConverter {
    const KEY: &'static str = "time";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for TimeConverter {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let converted = match &value {
            Value::Time(t) => Some(*t),
            Value::Str(s) => parse_time(s.trim()),
            _ => None,
        };
        converted.map(Value::Time).ok_or_else(|| {
            TransformError::rejected(format!("value '{value}' is not a valid time representation"))
        })
    }
}

/// ISO datetime with an offset. Naive datetimes are rejected.
#[derive(Debug)]
pub struct DateTimeConverter;

impl Buildable for DateTimeConverter {
    const KEY: &'static str = "datetime";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for DateTimeConverter {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let converted = match &value {
            Value::DateTime(dt) => Some(*dt),
            Value::Str(s) => parse_datetime(s.trim()),
            _ => None,
        };
        converted.map(Value::DateTime).ok_or_else(|| {
            TransformError::rejected(format!("value '{value}' is not a valid datetime representation"))
        })
    }
}
