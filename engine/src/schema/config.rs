//! Schema configuration
//!
//! The JSON document describing a record layout. Keys use the wire spelling
//! (`column-number`, `pre-processors`, `on-error`, ...). Keys whose absence
//! must be reported with a specific message are kept optional here and
//! checked when the schema is built.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::ConfigResult;
use crate::transform::OnError;

/// A complete schema configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaConfig {
    /// `csv`, `columnar` or a registered file type.
    #[serde(default)]
    pub file_type: Option<String>,

    /// Whether the first record is a header to discard.
    #[serde(default)]
    pub has_header: bool,

    /// Encoding label of the input bytes.
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Token separator (csv only).
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Quote character (csv only). Absent means no quoting at all.
    #[serde(default)]
    pub quotechar: Option<char>,

    /// Fields read from the row, in output order.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,

    /// Fields computed from the parsed values, in evaluation order.
    #[serde(default, rename = "computed-fields", alias = "computed_fields")]
    pub computed_fields: Vec<ComputedFieldConfig>,

    /// Keys not recognised here, available to registered file types.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_delimiter() -> char {
    ','
}

impl SchemaConfig {
    /// Load a configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON value, leaving the value untouched.
    pub fn from_value(value: &JsonValue) -> ConfigResult<Self> {
        Ok(Self::deserialize(value)?)
    }
}

/// A field read from a row position.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    #[serde(default)]
    pub key: Option<String>,

    #[serde(default, rename = "type")]
    pub type_spec: Option<TypeSpec>,

    /// Empty values yield null instead of failing.
    #[serde(default)]
    pub optional: bool,

    #[serde(default, rename = "pre-processors", alias = "pre_processors")]
    pub pre_processors: Vec<TransformConfig>,

    #[serde(default)]
    pub validators: Vec<TransformConfig>,

    #[serde(default, rename = "post-processors", alias = "post_processors")]
    pub post_processors: Vec<TransformConfig>,

    /// 1-based column of a delimited row.
    #[serde(default, rename = "column-number")]
    pub column_number: Option<usize>,

    /// 0-based first character of a fixed-width row.
    #[serde(default, rename = "column-start")]
    pub column_start: Option<usize>,

    #[serde(default, rename = "column-length")]
    pub column_length: Option<usize>,
}

/// A field computed by a builder from the values parsed so far.
#[derive(Debug, Clone, Deserialize)]
pub struct ComputedFieldConfig {
    #[serde(default)]
    pub key: Option<String>,

    /// Optional: without it the builder's value is kept as produced.
    #[serde(default, rename = "type")]
    pub type_spec: Option<TypeSpec>,

    #[serde(default)]
    pub optional: bool,

    #[serde(default)]
    pub builder: Option<TransformConfig>,

    #[serde(default, rename = "pre-processors", alias = "pre_processors")]
    pub pre_processors: Vec<TransformConfig>,

    #[serde(default)]
    pub validators: Vec<TransformConfig>,

    #[serde(default, rename = "post-processors", alias = "post_processors")]
    pub post_processors: Vec<TransformConfig>,
}

/// Type of a field: a bare key or a detailed object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    /// `"type": "int"`
    Name(String),
    /// `"type": {"key": "int", "nullable": true, "on-error": "skip-row"}`
    Detailed {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        nullable: bool,
        #[serde(default, rename = "on-error", alias = "on_error")]
        on_error: OnError,
        /// Anything else is handed to the converter.
        #[serde(flatten)]
        parameters: Map<String, JsonValue>,
    },
}

/// One pre-processor, validator, post-processor or builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub parameters: Option<Map<String, JsonValue>>,

    #[serde(default, rename = "on-error", alias = "on_error")]
    pub on_error: OnError,
}
