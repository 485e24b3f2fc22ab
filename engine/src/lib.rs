//! # Rowparse - schema-driven row parsing
//!
//! Rowparse reads delimited (CSV) or fixed-width (columnar) text according
//! to a JSON schema, runs every field through its transform chain and
//! classifies each row as parsed, skipped or failed.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │    Bytes    │────▶│   Reader    │────▶│   Fields    │────▶│ RowOutcome  │
//! │ (any enc.)  │     │ (csv/fixed) │     │  (chains)   │     │ (per row)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! let schema = json!({
//!     "file_type": "csv",
//!     "has_header": true,
//!     "fields": [
//!         {"key": "name", "type": "str", "column-number": 1},
//!         {"key": "age", "type": "int", "column-number": 2}
//!     ]
//! });
//! for outcome in rowparse::stream_parse("name,age\nBob,42\n".as_bytes(), &schema)? {
//!     println!("{}", serde_json::to_string(&outcome)?);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`models`] - Values, records and row outcomes
//! - [`reader`] - Decoding and record readers
//! - [`transform`] - Transform families, chains and registries
//! - [`fields`] - Field extraction and processing
//! - [`schema`] - Schema building and row classification

// Core modules
pub mod error;
pub mod models;

// Input
pub mod reader;

// Processing
pub mod fields;
pub mod transform;

// Schemas
pub mod schema;

use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, ConfigResult, Error, Result, TransformError, TransformResult};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{FieldError, OffsetTime, Position, Record, RowOutcome, Summary, Value};

// =============================================================================
// Re-exports - Readers
// =============================================================================

pub use reader::{RecordReader, Row, Rows, TextEncoding};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::registry::{
    register_builder, register_builder_fn, register_transform, register_transform_fn, registered_keys,
};
pub use transform::{Buildable, Builder, Family, OnError, Parameters, Transform};

// =============================================================================
// Re-exports - Schemas
// =============================================================================

pub use schema::{register_schema, registered_file_types, RowStream, Schema, SchemaConfig};

// =============================================================================
// Entry points
// =============================================================================

/// Build a schema from `config` and parse all of `data`.
///
/// Fails only on configuration, decoding or I/O errors; row problems are
/// reported inside the returned outcomes.
pub fn parse<R: Read>(data: R, config: &JsonValue) -> Result<Vec<RowOutcome>> {
    Schema::from_value(config)?.parse(data)
}

/// Build a schema from `config` and return a lazy stream of outcomes.
pub fn stream_parse<R: Read>(data: R, config: &JsonValue) -> Result<RowStream<Schema>> {
    Schema::from_value(config)?.into_stream(data)
}

/// Parse a file on disk.
pub fn parse_file<P: AsRef<Path>>(path: P, config: &JsonValue) -> Result<Vec<RowOutcome>> {
    let path = path.as_ref();
    info!(path = %path.display(), "Parsing file");
    let file = File::open(path)?;
    parse(BufReader::new(file), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn people_schema() -> JsonValue {
        json!({
            "file_type": "csv",
            "has_header": true,
            "fields": [
                {"key": "name", "type": "str", "column-number": 1},
                {"key": "age", "type": "int", "column-number": 2, "optional": true}
            ]
        })
    }

    #[test]
    fn test_parse() {
        let outcomes = parse("name,age\nBob,42\nAlice,\n".as_bytes(), &people_schema()).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[1].values().unwrap()["age"], Value::Null);
    }

    #[test]
    fn test_stream_parse_matches_parse() {
        let data = "name,age\nBob,42\nEve,x\n\nAlice,7\n";
        let eager = parse(data.as_bytes(), &people_schema()).unwrap();
        let lazy: Vec<RowOutcome> = stream_parse(data.as_bytes(), &people_schema()).unwrap().collect();
        assert_eq!(eager, lazy);
        assert_eq!(Summary::from_outcomes(&lazy).to_string(), "Parsed: 2 rows, 0 skipped, 1 failed");
    }

    #[test]
    fn test_config_error_before_reading() {
        struct Unreadable;
        impl Read for Unreadable {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                panic!("input must not be read");
            }
        }

        let config = json!({
            "file_type": "csv",
            "fields": [{"key": "a", "type": "str", "column-number": 1,
                        "post-processors": [{"name": "anything"}]}]
        });
        let err = parse(Unreadable, &config).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::UnknownTransform { .. })));
        assert_eq!(err.to_string(), "configuration error: invalid post-processor 'anything'");
    }

    #[test]
    fn test_config_is_not_mutated() {
        let config = people_schema();
        let before = config.clone();
        parse("name,age\n".as_bytes(), &config).unwrap();
        assert_eq!(config, before);
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"name,age\nBob,42\n").unwrap();

        let outcomes = parse_file(file.path(), &people_schema()).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].row_number(), 2);

        let err = parse_file("/nonexistent/rows.csv", &people_schema()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[derive(Debug)]
    struct Even;

    impl Transform for Even {
        fn apply(&self, value: Value) -> TransformResult<Value> {
            match value {
                Value::Int(n) if n % 2 == 0 => Ok(Value::Int(n)),
                other => Err(TransformError::rejected(format!("{other} is not even"))),
            }
        }
    }

    impl Buildable for Even {
        const KEY: &'static str = "is-even";

        fn build(parameters: &Parameters) -> ConfigResult<Self> {
            parameters.expect_none()?;
            Ok(Even)
        }
    }

    #[test]
    fn test_custom_validator() {
        register_transform::<Even>(Family::Validator);
        let config = json!({
            "file_type": "csv",
            "fields": [{"key": "n", "type": "int", "column-number": 1,
                        "validators": [{"name": "is-even"}]}]
        });
        let outcomes = parse("2\n3\n".as_bytes(), &config).unwrap();
        assert!(outcomes[0].is_parsed());
        assert_eq!(outcomes[1].errors()[0].error, "3 is not even");
    }
}
