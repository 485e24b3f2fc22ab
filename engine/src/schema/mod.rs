//! Schemas
//!
//! A [`Schema`] is built once from a [`SchemaConfig`] and then parses any
//! number of inputs:
//!
//! ```text
//! bytes -> decode -> RecordReader -> rows -> fields -> computed fields -> RowOutcome
//! ```
//!
//! Every configuration problem surfaces while building, so a schema that
//! builds never fails on a row: row problems become [`RowOutcome::Skipped`]
//! or [`RowOutcome::Failed`] and parsing carries on with the next row.
//!
//! The file type selects the [`RecordReader`]. `csv` and `columnar` are
//! built in; [`register_schema`] adds more.

pub mod config;
mod stream;

use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult, Result};
use crate::fields::Field;
use crate::models::{FieldError, Record, RowOutcome, Summary};
use crate::reader::{ColumnarReader, CsvReader, RecordReader, Row, TextEncoding};
use crate::transform::Flow;

pub use config::SchemaConfig;
pub use stream::RowStream;

/// Builds the reader of one file type from the whole configuration.
pub type ReaderConstructor = Arc<dyn Fn(&SchemaConfig) -> ConfigResult<Box<dyn RecordReader>> + Send + Sync>;

// =============================================================================
// File type registry
// =============================================================================

static FILE_TYPES: Lazy<RwLock<HashMap<String, ReaderConstructor>>> = Lazy::new(|| {
    let mut file_types: HashMap<String, ReaderConstructor> = HashMap::new();
    file_types.insert(
        "csv".to_string(),
        Arc::new(|config: &SchemaConfig| {
            let reader = CsvReader::new(config.delimiter, config.quotechar)?;
            Ok(Box::new(reader) as Box<dyn RecordReader>)
        }),
    );
    file_types.insert(
        "columnar".to_string(),
        Arc::new(|_: &SchemaConfig| Ok(Box::new(ColumnarReader) as Box<dyn RecordReader>)),
    );
    RwLock::new(file_types)
});

/// Register a file type. Schemas built afterwards with this `file_type` read
/// their rows with the constructed reader. An existing file type is replaced.
pub fn register_schema<F>(file_type: impl Into<String>, constructor: F)
where
    F: Fn(&SchemaConfig) -> ConfigResult<Box<dyn RecordReader>> + Send + Sync + 'static,
{
    FILE_TYPES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(file_type.into(), Arc::new(constructor));
}

/// Registered file types, sorted.
pub fn registered_file_types() -> Vec<String> {
    let mut keys: Vec<String> = FILE_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .cloned()
        .collect();
    keys.sort();
    keys
}

fn build_reader(config: &SchemaConfig) -> ConfigResult<Box<dyn RecordReader>> {
    let file_type = config.file_type.as_deref().ok_or(ConfigError::MissingFileType)?;
    let constructor = FILE_TYPES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(file_type)
        .cloned()
        .ok_or_else(|| ConfigError::UnknownFileType(file_type.to_string()))?;
    constructor(config)
}

// =============================================================================
// Schema
// =============================================================================

/// A built schema: reader, encoding and field chains.
#[derive(Debug)]
pub struct Schema {
    reader: Box<dyn RecordReader>,
    encoding: TextEncoding,
    has_header: bool,
    fields: Vec<Field>,
    computed_fields: Vec<Field>,
}

impl Schema {
    /// Build every field and the reader. The configuration is left untouched.
    pub fn build(config: &SchemaConfig) -> ConfigResult<Self> {
        let reader = build_reader(config)?;
        let encoding = TextEncoding::for_label(&config.encoding)?;
        let fields = config
            .fields
            .iter()
            .map(Field::build)
            .collect::<ConfigResult<Vec<_>>>()?;
        let computed_fields = config
            .computed_fields
            .iter()
            .map(Field::build_computed)
            .collect::<ConfigResult<Vec<_>>>()?;

        debug!(
            file_type = config.file_type.as_deref().unwrap_or_default(),
            encoding = %config.encoding,
            has_header = config.has_header,
            fields = fields.len(),
            computed_fields = computed_fields.len(),
            "Schema built"
        );

        Ok(Self {
            reader,
            encoding,
            has_header: config.has_header,
            fields,
            computed_fields,
        })
    }

    /// Build from a JSON configuration value.
    pub fn from_value(config: &JsonValue) -> ConfigResult<Self> {
        Self::build(&SchemaConfig::from_value(config)?)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn computed_fields(&self) -> &[Field] {
        &self.computed_fields
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// Read and decode the whole input.
    fn decode<R: Read>(&self, mut data: R) -> Result<String> {
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)?;
        self.encoding.decode(&bytes)
    }

    /// Lazily parse `data`, one outcome per non-blank row.
    pub fn stream<R: Read>(&self, data: R) -> Result<RowStream<&Self>> {
        let text = self.decode(data)?;
        Ok(RowStream::new(self, text))
    }

    /// Like [`Schema::stream`], with the stream owning the schema.
    pub fn into_stream<R: Read>(self, data: R) -> Result<RowStream<Self>> {
        let text = self.decode(data)?;
        Ok(RowStream::new(self, text))
    }

    /// Parse `data` to completion.
    pub fn parse<R: Read>(&self, data: R) -> Result<Vec<RowOutcome>> {
        let outcomes: Vec<RowOutcome> = self.stream(data)?.collect();
        let summary = Summary::from_outcomes(&outcomes);
        info!(
            parsed = summary.parsed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Parsing complete"
        );
        Ok(outcomes)
    }

    /// Classify one non-blank row.
    ///
    /// Every field runs, even after an earlier one failed, so all of the
    /// row's errors are reported together. Computed fields run only when
    /// every field succeeded; each one sees the values of the fields and
    /// of the computed fields before it. A single skip-row error makes the
    /// whole row skipped.
    pub fn process_row(&self, row_number: usize, row: &Row) -> RowOutcome {
        let mut state = RowState::default();
        state.run(&self.fields, row);
        if state.errors.is_empty() {
            state.run(&self.computed_fields, row);
        }

        let RowState { values, errors, skip } = state;
        if errors.is_empty() {
            return RowOutcome::Parsed { row_number, values };
        }
        debug!(row_number, skip, errors = errors.len(), "Row rejected");
        if skip {
            RowOutcome::Skipped { row_number, errors }
        } else {
            RowOutcome::Failed { row_number, errors }
        }
    }
}

#[derive(Default)]
struct RowState {
    values: Record,
    errors: Vec<FieldError>,
    skip: bool,
}

impl RowState {
    fn run(&mut self, fields: &[Field], row: &Row) {
        for field in fields {
            match field.run(row, &self.values) {
                Ok(Flow::Ok(value)) => {
                    self.values.insert(field.key().to_string(), value);
                }
                Ok(Flow::SkipRow(error)) => {
                    self.skip = true;
                    self.errors.push(field.error(&error));
                }
                Err(error) => self.errors.push(field.error(&error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::{Position, Value};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn schema(config: JsonValue) -> Schema {
        Schema::from_value(&config).unwrap()
    }

    fn parse(config: JsonValue, data: &str) -> Vec<RowOutcome> {
        schema(config).parse(data.as_bytes()).unwrap()
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_csv_with_header() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "has_header": true,
                "fields": [
                    {"key": "name", "type": "str", "column-number": 1},
                    {"key": "age", "type": "int", "column-number": 2}
                ]
            }),
            "name,age\nBob,42\nAlice,7\n",
        );
        assert_eq!(
            outcomes,
            vec![
                RowOutcome::Parsed {
                    row_number: 2,
                    values: record(&[("name", "Bob".into()), ("age", Value::Int(42))]),
                },
                RowOutcome::Parsed {
                    row_number: 3,
                    values: record(&[("name", "Alice".into()), ("age", Value::Int(7))]),
                },
            ]
        );
    }

    #[test]
    fn test_columnar() {
        let outcomes = parse(
            json!({
                "file_type": "columnar",
                "fields": [
                    {"key": "name", "type": "str", "column-start": 0, "column-length": 5,
                     "pre-processors": [{"name": "strip-whitespaces"}]},
                    {"key": "age", "type": "int", "column-start": 5, "column-length": 2}
                ]
            }),
            "Bob  42\nJosé 07\n",
        );
        assert_eq!(outcomes.len(), 2);
        assert_eq!(
            outcomes[1],
            RowOutcome::Parsed {
                row_number: 2,
                values: record(&[("name", "José".into()), ("age", Value::Int(7))]),
            }
        );
    }

    #[test]
    fn test_errors_do_not_halt_parsing() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [{"key": "n", "type": "int", "column-number": 1}]
            }),
            "1\na\n3\n",
        );
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_parsed());
        assert_eq!(
            outcomes[1],
            RowOutcome::Failed {
                row_number: 2,
                errors: vec![FieldError {
                    position: Position::Column { column_number: 1 },
                    field_key: "n".into(),
                    error: "value 'a' is not a valid integer".into(),
                }],
            }
        );
        assert_eq!(outcomes[2].values(), Some(&record(&[("n", Value::Int(3))])));
    }

    #[test]
    fn test_skip_dominates_and_keeps_every_error() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [
                    {"key": "a", "type": "int", "column-number": 1},
                    {"key": "b", "type": {"key": "int", "on-error": "skip-row"}, "column-number": 2}
                ]
            }),
            "x,y\n",
        );
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            RowOutcome::Skipped { row_number, errors } => {
                assert_eq!(*row_number, 1);
                let keys: Vec<&str> = errors.iter().map(|e| e.field_key.as_str()).collect();
                assert_eq!(keys, vec!["a", "b"]);
            }
            other => panic!("expected a skipped row, got {other:?}"),
        }
    }

    #[test]
    fn test_computed_fields() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [
                    {"key": "a", "type": "int", "column-number": 1},
                    {"key": "b", "type": "int", "column-number": 2},
                    {"key": "c", "type": "int", "column-number": 3}
                ],
                "computed-fields": [
                    {"key": "m", "builder": {"name": "multiply", "parameters": {"x_factor": "a", "y_factor": "b"}}},
                    {"key": "d", "type": "decimal",
                     "builder": {"name": "divide", "parameters": {"numerator": "m", "denominator": "c"}}}
                ]
            }),
            "3,4,2\n",
        );
        let values = outcomes[0].values().unwrap();
        assert_eq!(values.get("m"), Some(&Value::Int(12)));
        assert_eq!(values.get("d"), Some(&Value::Decimal(Decimal::from(6))));
    }

    #[test]
    fn test_computed_fields_wait_for_valid_fields() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [{"key": "a", "type": "int", "column-number": 1}],
                "computed-fields": [
                    {"key": "s", "builder": {"name": "concat", "parameters": {"fields": ["a", "missing"]}}}
                ]
            }),
            "x\n",
        );
        // Only the primary error: computed fields never ran.
        assert_eq!(outcomes[0].errors().len(), 1);
        assert_eq!(outcomes[0].errors()[0].field_key, "a");
    }

    #[test]
    fn test_every_computed_failure_is_reported() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [{"key": "a", "type": "str", "column-number": 1}],
                "computed-fields": [
                    {"key": "x", "builder": {"name": "concat", "parameters": {"fields": ["a", "nope"]}}},
                    {"key": "y", "builder": {"name": "concat", "parameters": {"fields": ["a", "a"]}}},
                    {"key": "z", "builder": {"name": "multiply", "parameters": {"x_factor": "a", "y_factor": "a"}}}
                ]
            }),
            "v\n",
        );
        let errors = outcomes[0].errors();
        assert!(matches!(outcomes[0], RowOutcome::Failed { .. }));
        let keys: Vec<&str> = errors.iter().map(|e| e.field_key.as_str()).collect();
        assert_eq!(keys, vec!["x", "z"]);
        assert_eq!(errors[0].error, "missing key 'nope' in record");
        assert_eq!(errors[0].position, Position::Computed {});
    }

    #[test]
    fn test_blank_lines_keep_numbering() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "has_header": true,
                "fields": [{"key": "n", "type": "int", "column-number": 1}]
            }),
            "n\n1\n\n2\n,\n3\n",
        );
        let numbers: Vec<usize> = outcomes.iter().map(RowOutcome::row_number).collect();
        assert_eq!(numbers, vec![2, 4, 6]);
    }

    #[test]
    fn test_empty_fields_parse_to_empty_records() {
        let outcomes = parse(json!({"file_type": "csv"}), "a,b\nc\n");
        assert_eq!(
            outcomes,
            vec![
                RowOutcome::Parsed { row_number: 1, values: Record::new() },
                RowOutcome::Parsed { row_number: 2, values: Record::new() },
            ]
        );
    }

    #[test]
    fn test_quoting() {
        let config = json!({
            "file_type": "csv",
            "quotechar": "\"",
            "fields": [{"key": "s", "type": "str", "column-number": 1}]
        });
        let outcomes = parse(config, "\"a,b\"\n\"say \"\"hi\"\"\"\n\"two\nlines\"\n");
        let values: Vec<&Value> = outcomes.iter().map(|o| &o.values().unwrap()["s"]).collect();
        assert_eq!(
            values,
            vec![&Value::from("a,b"), &Value::from("say \"hi\""), &Value::from("two\nlines")]
        );

        let unquoted = json!({
            "file_type": "csv",
            "fields": [{"key": "s", "type": "str", "column-number": 1}]
        });
        let outcomes = parse(unquoted, "\"test \"\"quoting\"\"\n");
        assert_eq!(
            outcomes[0].values().unwrap()["s"],
            Value::from("\"test \"\"quoting\"\"")
        );
    }

    #[test]
    fn test_literal_quote_does_not_swallow_rows() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "quotechar": "\"",
                "fields": [
                    {"key": "a", "type": "str", "column-number": 1},
                    {"key": "b", "type": "str", "column-number": 2}
                ]
            }),
            "5\" pipe,x\nnext,2\n\nthird,3\n",
        );
        let numbers: Vec<usize> = outcomes.iter().map(RowOutcome::row_number).collect();
        assert_eq!(numbers, vec![1, 2, 4]);
        assert_eq!(outcomes[0].values().unwrap()["a"], Value::from("5\" pipe"));
        assert_eq!(outcomes[2].values().unwrap()["a"], Value::from("third"));
    }

    #[test]
    fn test_computed_skip_row_skips_the_row() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "fields": [
                    {"key": "a", "type": "int", "column-number": 1},
                    {"key": "b", "type": "int", "column-number": 2}
                ],
                "computed-fields": [
                    {"key": "ratio", "type": "decimal",
                     "builder": {"name": "divide", "parameters": {"numerator": "a", "denominator": "b"},
                                 "on-error": "skip-row"}},
                    {"key": "product",
                     "builder": {"name": "multiply", "parameters": {"x_factor": "a", "y_factor": "b"}},
                     "validators": [{"name": "greater-than", "parameters": {"threshold": 0}}]}
                ]
            }),
            "6,3\n1,0\n",
        );
        assert_eq!(
            outcomes[0].values().unwrap()["ratio"],
            Value::Decimal(Decimal::from(2))
        );
        match &outcomes[1] {
            RowOutcome::Skipped { row_number, errors } => {
                assert_eq!(*row_number, 2);
                let keys: Vec<&str> = errors.iter().map(|e| e.field_key.as_str()).collect();
                // The raised failure is reported alongside the skip.
                assert_eq!(keys, vec!["ratio", "product"]);
                assert_eq!(errors[0].position, Position::Computed {});
            }
            other => panic!("expected a skipped row, got {other:?}"),
        }
    }

    #[test]
    fn test_carriage_return_rows_are_numbered() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "has_header": true,
                "fields": [{"key": "n", "type": "int", "column-number": 1}]
            }),
            "n\r1\r\r3\r",
        );
        let numbers: Vec<usize> = outcomes.iter().map(RowOutcome::row_number).collect();
        assert_eq!(numbers, vec![2, 4]);
    }

    #[test]
    fn test_custom_delimiter() {
        let outcomes = parse(
            json!({
                "file_type": "csv",
                "delimiter": ";",
                "fields": [{"key": "b", "type": "decimal", "column-number": 2,
                            "pre-processors": [{"name": "replace", "parameters": {"pattern": ",", "replacement": "."}}]}]
            }),
            "x;1,5\n",
        );
        assert_eq!(
            outcomes[0].values().unwrap()["b"],
            Value::Decimal(Decimal::new(15, 1))
        );
    }

    #[test]
    fn test_encoding() {
        let schema = schema(json!({
            "file_type": "columnar",
            "encoding": "iso8859_5",
            "fields": [{"key": "city", "type": "str", "column-start": 0, "column-length": 6}]
        }));
        let bytes: &[u8] = &[0xBC, 0xDE, 0xE1, 0xDA, 0xD2, 0xD0];
        let outcomes = schema.parse(bytes).unwrap();
        assert_eq!(outcomes[0].values().unwrap()["city"], Value::from("Москва"));
    }

    #[test]
    fn test_decode_failure_is_an_error() {
        let schema = schema(json!({"file_type": "csv"}));
        let err = schema.parse(&[0x66u8, 0xFF][..]).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_build_errors() {
        let err = Schema::from_value(&json!({"fields": []})).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFileType));

        let err = Schema::from_value(&json!({"file_type": "xml"})).unwrap_err();
        assert_eq!(err.to_string(), "unknown file type 'xml'");

        let err = Schema::from_value(&json!({"file_type": "csv", "encoding": "klingon"})).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownEncoding(_)));

        let err = Schema::from_value(&json!({
            "file_type": "csv",
            "fields": [{"key": "a", "type": "str", "column-number": 1,
                        "validators": [{"name": "anything"}]}]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid validator 'anything'");
    }

    #[test]
    fn test_schema_is_reusable() {
        let schema = schema(json!({
            "file_type": "csv",
            "fields": [{"key": "n", "type": "int", "column-number": 1}]
        }));
        assert_eq!(schema.parse("1\n".as_bytes()).unwrap().len(), 1);
        assert_eq!(schema.parse("1\n2\n".as_bytes()).unwrap().len(), 2);
    }

    #[derive(Debug)]
    struct PipedReader;

    impl RecordReader for PipedReader {
        fn rows(&self, text: String) -> crate::reader::Rows {
            let rows: Vec<Row> = text
                .split('|')
                .map(|item| Row::Columns(vec![item.to_string()]))
                .collect();
            Box::new(rows.into_iter())
        }
    }

    #[test]
    fn test_register_schema() {
        register_schema("piped", |_: &SchemaConfig| Ok(Box::new(PipedReader) as Box<dyn RecordReader>));
        assert!(registered_file_types().contains(&"piped".to_string()));

        let outcomes = parse(
            json!({
                "file_type": "piped",
                "fields": [{"key": "name", "type": "str", "column-number": 1}]
            }),
            "Joe|William|Jack|Averell",
        );
        let names: Vec<&Value> = outcomes.iter().map(|o| &o.values().unwrap()["name"]).collect();
        assert_eq!(
            names,
            vec![
                &Value::from("Joe"),
                &Value::from("William"),
                &Value::from("Jack"),
                &Value::from("Averell"),
            ]
        );
    }
}
