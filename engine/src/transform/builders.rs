//! Builders: compute a value from the fields already parsed in a row.

use serde::Deserialize;

use crate::error::{ConfigResult, TransformError, TransformResult};
use crate::models::{Record, Value};

use super::registry::Registry;
use super::{Buildable, Builder, Parameters};

pub(crate) fn register_builtins(registry: &mut Registry<dyn Builder>) {
    registry.register::<Concat>();
    registry.register::<Divide>();
    registry.register::<Multiply>();
    registry.register::<Coalesce>();
}

fn lookup<'r>(record: &'r Record, key: &str) -> TransformResult<&'r Value> {
    record
        .get(key)
        .ok_or_else(|| TransformError::MissingKey(key.to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldsParams {
    fields: Vec<String>,
}

/// At least two field names, none of them empty.
fn field_list(parameters: &Parameters) -> ConfigResult<Vec<String>> {
    let invalid = || parameters.invalid("'fields' parameter must be a list[str] with at least two elements");
    let FieldsParams { fields } = parameters.parse().map_err(|_| invalid())?;
    if fields.len() < 2 || fields.iter().any(String::is_empty) {
        return Err(invalid());
    }
    Ok(fields)
}

/// A field name parameter that must be a non-empty string.
fn field_name(parameters: &Parameters, name: &str) -> ConfigResult<String> {
    match parameters.get(name).and_then(|value| value.as_str()) {
        Some(field) if !field.is_empty() => Ok(field.to_string()),
        _ => Err(parameters.invalid(format!("'{name}' parameter must be a non null str"))),
    }
}

// =============================================================================
// String builders
// =============================================================================

/// Concatenate string fields in order.
#[derive(Debug)]
pub struct Concat {
    fields: Vec<String>,
}

impl Buildable for Concat {
    const KEY: &'static str = "concat";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        Ok(Self {
            fields: field_list(parameters)?,
        })
    }
}

impl Builder for Concat {
    fn apply(&self, record: &Record) -> TransformResult<Value> {
        let mut joined = String::new();
        for field in &self.fields {
            match lookup(record, field)? {
                Value::Str(s) => joined.push_str(s),
                other => {
                    return Err(TransformError::IncompatibleTypes(format!(
                        "cannot concatenate '{}' field '{field}'",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(Value::Str(joined))
    }
}

/// First truthy value among the fields, or null.
#[derive(Debug)]
pub struct Coalesce {
    fields: Vec<String>,
}

impl Buildable for Coalesce {
    const KEY: &'static str = "coalesce";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        Ok(Self {
            fields: field_list(parameters)?,
        })
    }
}

impl Builder for Coalesce {
    fn apply(&self, record: &Record) -> TransformResult<Value> {
        for field in &self.fields {
            let value = lookup(record, field)?;
            if value.is_truthy() {
                return Ok(value.clone());
            }
        }
        Ok(Value::Null)
    }
}

// =============================================================================
// Arithmetic builders
// =============================================================================

/// `numerator / denominator`, as a decimal.
#[derive(Debug)]
pub struct Divide {
    numerator: String,
    denominator: String,
}

impl Buildable for Divide {
    const KEY: &'static str = "divide";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_only(&["numerator", "denominator"])?;
        Ok(Self {
            numerator: field_name(parameters, "numerator")?,
            denominator: field_name(parameters, "denominator")?,
        })
    }
}

impl Builder for Divide {
    fn apply(&self, record: &Record) -> TransformResult<Value> {
        lookup(record, &self.numerator)?.divide(lookup(record, &self.denominator)?)
    }
}

/// `x_factor * y_factor`; integers stay integers.
#[derive(Debug)]
pub struct Multiply {
    x_factor: String,
    y_factor: String,
}

impl Buildable for Multiply {
    const KEY: &'static str = "multiply";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_only(&["x_factor", "y_factor"])?;
        Ok(Self {
            x_factor: field_name(parameters, "x_factor")?,
            y_factor: field_name(parameters, "y_factor")?,
        })
    }
}

impl Builder for Multiply {
    fn apply(&self, record: &Record) -> TransformResult<Value> {
        lookup(record, &self.x_factor)?.multiply(lookup(record, &self.y_factor)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::registry::build_builder;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::str::FromStr;

    fn build(name: &str, parameters: serde_json::Value) -> ConfigResult<Box<dyn Builder>> {
        build_builder(Some(name), parameters.as_object())
    }

    fn record(values: &[(&str, Value)]) -> Record {
        values
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_concat() {
        let concat = build("concat", json!({"fields": ["code_1", "code_2", "code_3"]})).unwrap();
        let row = record(&[("code_1", "X".into()), ("code_2", "Y".into()), ("code_3", "Z".into())]);
        assert_eq!(concat.apply(&row).unwrap(), Value::from("XYZ"));
    }

    #[test]
    fn test_concat_rejects_integers() {
        let concat = build("concat", json!({"fields": ["code_1", "code_2"]})).unwrap();
        let row = record(&[("code_1", Value::Int(1)), ("code_2", Value::Int(2))]);
        assert!(matches!(concat.apply(&row), Err(TransformError::IncompatibleTypes(_))));
    }

    #[test]
    fn test_concat_missing_field() {
        let concat = build("concat", json!({"fields": ["code_1", "code_2"]})).unwrap();
        assert_eq!(
            concat.apply(&Record::new()).unwrap_err(),
            TransformError::MissingKey("code_1".into())
        );
    }

    #[test]
    fn test_fields_parameter() {
        let expected = "builder 'concat': 'fields' parameter must be a list[str] with at least two elements";
        for params in [json!({}), json!({"fields": ""}), json!({"fields": "xxx"}), json!({"fields": ["code"]})] {
            assert_eq!(build("concat", params).unwrap_err().to_string(), expected);
        }
        assert!(build("coalesce", json!({"fields": ["a"]})).is_err());
    }

    #[test]
    fn test_divide() {
        let divide = build("divide", json!({"numerator": "price", "denominator": "price_by_unit"})).unwrap();
        let row = record(&[("price", Value::Int(1)), ("price_by_unit", Value::Int(2))]);
        assert_eq!(divide.apply(&row).unwrap(), Value::Decimal(Decimal::from_str("0.5").unwrap()));

        let row = record(&[("price", "e".into()), ("price_by_unit", Value::Int(1))]);
        assert!(divide.apply(&row).is_err());
        assert!(divide.apply(&Record::new()).is_err());
    }

    #[test]
    fn test_divide_parameters() {
        let err = build("divide", json!({"numerator": "", "denominator": "price_by_unit"})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "builder 'divide': 'numerator' parameter must be a non null str"
        );
        assert!(build("divide", json!({"numerator": "price"})).is_err());
        assert!(build("divide", json!({})).is_err());
    }

    #[test]
    fn test_multiply() {
        let multiply = build("multiply", json!({"x_factor": "price", "y_factor": "unit"})).unwrap();
        let row = record(&[("price", Value::Decimal(Decimal::from_str("1.5").unwrap())), ("unit", Value::Int(2))]);
        assert_eq!(multiply.apply(&row).unwrap(), Value::Decimal(Decimal::from(3)));

        let row = record(&[("price", Value::Int(3)), ("unit", Value::Int(4))]);
        assert_eq!(multiply.apply(&row).unwrap(), Value::Int(12));

        assert!(build("multiply", json!({"x_factor": "price", "y_factor": "unit", "z": "w"})).is_err());
    }

    #[test]
    fn test_coalesce() {
        let coalesce = build("coalesce", json!({"fields": ["a", "b", "c"]})).unwrap();
        let row = record(&[("a", Value::Int(0)), ("b", "".into()), ("c", Value::Int(3))]);
        assert_eq!(coalesce.apply(&row).unwrap(), Value::Int(3));

        let row = record(&[("a", Value::Null), ("b", "".into()), ("c", Value::Int(0))]);
        assert_eq!(coalesce.apply(&row).unwrap(), Value::Null);
    }
}
