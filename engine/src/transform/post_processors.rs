//! Post-processors: numeric adjustments applied after validation.

use serde::Deserialize;

use crate::error::{ConfigResult, TransformError, TransformResult};
use crate::models::Value;

use super::registry::Registry;
use super::{Buildable, Parameters, Transform};

pub(crate) fn register_builtins(registry: &mut Registry<dyn Transform>) {
    registry.register::<Divide>();
    registry.register::<Round>();
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DivideParams {
    denominator: i64,
}

/// Divide by a positive integer. The result is always a decimal.
#[derive(Debug)]
pub struct Divide {
    denominator: Value,
}

impl Buildable for Divide {
    const KEY: &'static str = "divide";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let invalid = || parameters.invalid("'denominator' parameter must be a positive integer");
        let DivideParams { denominator } = parameters.parse().map_err(|_| invalid())?;
        if denominator <= 0 {
            return Err(invalid());
        }
        Ok(Self {
            denominator: Value::Int(denominator),
        })
    }
}

impl Transform for Divide {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        value.divide(&self.denominator)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RoundParams {
    precision: i64,
}

/// Round decimals to `precision` digits, half to even. Integers are left
/// as they are.
#[derive(Debug)]
pub struct Round {
    precision: u32,
}

impl Buildable for Round {
    const KEY: &'static str = "round";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let invalid = || parameters.invalid("'precision' parameter must be a positive or zero integer");
        let RoundParams { precision } = parameters.parse().map_err(|_| invalid())?;
        let precision = u32::try_from(precision).map_err(|_| invalid())?;
        Ok(Self { precision })
    }
}

impl Transform for Round {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        match value {
            Value::Int(_) => Ok(value),
            Value::Decimal(d) => Ok(Value::Decimal(d.round_dp(self.precision))),
            other => Err(TransformError::IncompatibleTypes(format!(
                "cannot round '{}'",
                other.type_name()
            ))),
        }
    }
}
