//! Error types for the row parsing engine.
//!
//! Errors are split by the moment they can happen:
//!
//! - [`ConfigError`] - the schema configuration is structurally invalid.
//!   Always raised while building, before any row is read.
//! - [`TransformError`] - a single transform rejected a value. Row-scoped:
//!   the schema turns it into a [`crate::FieldError`] and keeps going.
//! - [`Error`] - top-level failures of the entry points (configuration,
//!   decoding, I/O).
//!
//! Conversion into [`Error`] is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Build-time Errors
// =============================================================================

/// Errors raised while building a schema from its configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A transform configuration has no `name`.
    #[error("{family} must have a 'name' key")]
    MissingName { family: &'static str },

    /// The `name` does not resolve in the family registry.
    #[error("invalid {family} '{name}'")]
    UnknownTransform { family: &'static str, name: String },

    /// A field has no `type`.
    #[error("missing key 'type'")]
    MissingType,

    /// The type key does not resolve in the type converter registry.
    #[error("invalid type '{0}'")]
    UnknownType(String),

    /// A transform rejected its parameters.
    #[error("{family} '{name}': {message}")]
    InvalidParameters {
        family: &'static str,
        name: String,
        message: String,
    },

    /// A field or computed field has no `key`.
    #[error("key is required in {0} definition")]
    MissingFieldKey(&'static str),

    /// A field declares neither `column-number` nor `column-start`/`column-length`.
    #[error("missing field position for field: '{0}'")]
    MissingPosition(String),

    /// A computed field has no `builder`.
    #[error("missing builder for computed field: '{0}'")]
    MissingBuilder(String),

    /// The schema has no `file_type`.
    #[error("missing key 'file_type'")]
    MissingFileType,

    /// The `file_type` does not resolve in the schema registry.
    #[error("unknown file type '{0}'")]
    UnknownFileType(String),

    /// The `encoding` is not a known label.
    #[error("unknown encoding '{0}'")]
    UnknownEncoding(String),

    /// A schema-level option has an unusable value.
    #[error("'{key}' {message}")]
    InvalidOption { key: &'static str, message: String },

    /// The configuration document itself is malformed.
    #[error("invalid schema configuration: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Row-time Errors
// =============================================================================

/// A transform (or builder) rejected the value it was given.
///
/// Messages are meant for end users and include the offending value where
/// it is safe to do so.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// Generic rejection with a ready-made message.
    #[error("{0}")]
    Rejected(String),

    /// A non-optional field read an empty value.
    #[error("{key} field is required but the value was empty")]
    Required { key: String },

    /// A builder referenced a key that is not in the record.
    #[error("missing key '{0}' in record")]
    MissingKey(String),

    /// Operands cannot be combined (e.g. multiplying a string).
    #[error("{0}")]
    IncompatibleTypes(String),
}

impl TransformError {
    /// Shorthand for [`TransformError::Rejected`].
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

// =============================================================================
// Top-level Errors
// =============================================================================

/// Errors returned by the parsing entry points.
///
/// Row-level problems never show up here: they are reported inside
/// [`crate::RowOutcome`] values.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema could not be built.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The input is not valid in the configured encoding.
    #[error("input is not valid {encoding}")]
    Decode { encoding: String },

    /// Reading the input failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for schema construction.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for transform application.
pub type TransformResult<T> = std::result::Result<T, TransformError>;

/// Result type for the entry points.
pub type Result<T> = std::result::Result<T, Error>;
