//! Value transforms
//!
//! A field's raw value flows through an ordered chain of transforms:
//!
//! ```text
//! [pre-processors...] -> type converter -> [validators...] -> [post-processors...]
//! ```
//!
//! Every family shares the [`Transform`] shape; the family only decides
//! where in the chain an instance may sit. Computed fields read their raw
//! value from a [`Builder`], which works on the whole record instead of a
//! single value.
//!
//! ## Extending
//!
//! Implement [`Transform`] (or [`Builder`]) plus [`Buildable`], then register
//! the type before building a schema:
//!
//! ```ignore
//! rowparse::register_transform::<IsEven>(Family::Validator);
//! ```

pub mod builders;
pub mod chain;
pub mod post_processors;
pub mod pre_processors;
pub mod registry;
pub mod type_converters;
pub mod validators;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

use crate::error::{ConfigError, ConfigResult, TransformResult};
use crate::models::{Record, Value};

pub use chain::{BuilderStep, Chain, Flow, Step};

// =============================================================================
// Traits
// =============================================================================

/// A value-to-value step of a field chain.
///
/// Transforms are built once per schema and shared by every row, so `apply`
/// must not depend on anything but its input.
pub trait Transform: Send + Sync + fmt::Debug {
    fn apply(&self, value: Value) -> TransformResult<Value>;
}

/// A record-to-value step, the source of a computed field.
pub trait Builder: Send + Sync + fmt::Debug {
    fn apply(&self, record: &Record) -> TransformResult<Value>;
}

/// Construction from configuration, used by the registries.
pub trait Buildable: Sized {
    /// Registry key, e.g. `"strip-whitespaces"`.
    const KEY: &'static str;

    fn build(parameters: &Parameters) -> ConfigResult<Self>;
}

// =============================================================================
// Families and error policy
// =============================================================================

/// Role of a transform inside a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    PreProcessor,
    TypeConverter,
    Validator,
    PostProcessor,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::PreProcessor,
        Family::TypeConverter,
        Family::Validator,
        Family::PostProcessor,
    ];

    /// Name used in configuration errors.
    pub fn label(self) -> &'static str {
        match self {
            Family::PreProcessor => "pre-processor",
            Family::TypeConverter => "type",
            Family::Validator => "validator",
            Family::PostProcessor => "post-processor",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Label of the builder family.
pub const BUILDER: &str = "builder";

/// What the chain does when a step rejects a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnError {
    /// The error escapes and the row fails.
    #[default]
    Raise,
    /// The rest of the chain is skipped and the row is skipped.
    SkipRow,
}

// =============================================================================
// Parameters
// =============================================================================

/// Configuration parameters of one transform, tagged with where they come
/// from so errors can name the transform.
#[derive(Debug, Clone)]
pub struct Parameters {
    family: &'static str,
    name: String,
    values: Map<String, JsonValue>,
}

impl Parameters {
    pub fn new(family: &'static str, name: impl Into<String>, values: Map<String, JsonValue>) -> Self {
        Self {
            family,
            name: name.into(),
            values,
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.values.get(key)
    }

    /// Deserialize the parameters into a typed struct.
    pub fn parse<T: DeserializeOwned>(&self) -> ConfigResult<T> {
        serde_json::from_value(JsonValue::Object(self.values.clone()))
            .map_err(|e| self.invalid(e.to_string()))
    }

    /// Reject any parameter, for transforms that take none.
    pub fn expect_none(&self) -> ConfigResult<()> {
        self.expect_only(&[])
    }

    /// Reject parameters not listed in `known`.
    pub fn expect_only(&self, known: &[&str]) -> ConfigResult<()> {
        match self.values.keys().find(|key| !known.contains(&key.as_str())) {
            Some(key) => Err(self.invalid(format!("unexpected parameter '{key}'"))),
            None => Ok(()),
        }
    }

    /// A parameter error naming this transform.
    pub fn invalid(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::InvalidParameters {
            family: self.family,
            name: self.name.clone(),
            message: message.into(),
        }
    }
}
