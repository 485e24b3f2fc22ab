//! Validators: accept or reject a typed value without changing it.

use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::{ConfigResult, TransformError, TransformResult};
use crate::models::Value;

use super::registry::Registry;
use super::{Buildable, Parameters, Transform};

pub(crate) fn register_builtins(registry: &mut Registry<dyn Transform>) {
    registry.register::<RegexMatches>();
    registry.register::<GreaterThan>();
    registry.register::<LessThan>();
    registry.register::<NotNullOrEmpty>();
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternParams {
    pattern: String,
}

/// The whole string must match `pattern`.
#[derive(Debug)]
pub struct RegexMatches {
    pattern: String,
    regex: Regex,
}

impl Buildable for RegexMatches {
    const KEY: &'static str = "regex-matches";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let PatternParams { pattern } = parameters.parse()?;
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| parameters.invalid(format!("invalid pattern: {e}")))?;
        Ok(Self { pattern, regex })
    }
}

impl Transform for RegexMatches {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let matched = value.as_str().is_some_and(|s| self.regex.is_match(s));
        if matched {
            Ok(value)
        } else {
            Err(TransformError::rejected(format!(
                "string does not match regex '{}'",
                self.pattern
            )))
        }
    }
}

// =============================================================================
// Thresholds
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThresholdParams {
    threshold: serde_json::Number,
}

fn threshold(parameters: &Parameters) -> ConfigResult<Decimal> {
    let ThresholdParams { threshold } = parameters.parse()?;
    let literal = threshold.to_string();
    Decimal::from_str(&literal)
        .or_else(|_| Decimal::from_scientific(&literal))
        .map_err(|_| parameters.invalid(format!("'threshold' parameter {literal} is out of range")))
}

/// Compare a numeric value against a threshold.
fn compare(value: &Value, threshold: Decimal) -> TransformResult<Ordering> {
    value.as_decimal().map(|d| d.cmp(&threshold)).ok_or_else(|| {
        TransformError::IncompatibleTypes(format!(
            "cannot compare '{}' with a numeric threshold",
            value.type_name()
        ))
    })
}

/// Strictly greater than `threshold`.
#[derive(Debug)]
pub struct GreaterThan {
    threshold: Decimal,
}

impl Buildable for GreaterThan {
    const KEY: &'static str = "greater-than";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        Ok(Self {
            threshold: threshold(parameters)?,
        })
    }
}

impl Transform for GreaterThan {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        match compare(&value, self.threshold)? {
            Ordering::Greater => Ok(value),
            _ => Err(TransformError::rejected(format!(
                "value must be greater than {}",
                self.threshold
            ))),
        }
    }
}

/// Strictly less than `threshold`.
#[derive(Debug)]
pub struct LessThan {
    threshold: Decimal,
}

impl Buildable for LessThan {
    const KEY: &'static str = "less-than";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        Ok(Self {
            threshold: threshold(parameters)?,
        })
    }
}

impl Transform for LessThan {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        match compare(&value, self.threshold)? {
            Ordering::Less => Ok(value),
            _ => Err(TransformError::rejected(format!(
                "value must be less than {}",
                self.threshold
            ))),
        }
    }
}

/// Rejects null and the empty string.
#[derive(Debug)]
pub struct NotNullOrEmpty;

impl Buildable for NotNullOrEmpty {
    const KEY: &'static str = "not-null-or-empty";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for NotNullOrEmpty {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        if value.is_empty() {
            return Err(TransformError::rejected("value must not be null or empty"));
        }
        Ok(value)
    }
}
