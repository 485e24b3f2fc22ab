//! Fields
//!
//! A [`Field`] pulls one raw value out of a row (or computes it from the
//! values parsed so far) and threads it through its chain:
//!
//! ```text
//! raw value -> [pre-processors] -> type converter -> [validators] -> [post-processors]
//! ```
//!
//! Empty raw values never reach the chain: an optional field yields null,
//! any other field fails with a required-field error.

use crate::error::{ConfigError, ConfigResult, TransformError, TransformResult};
use crate::models::{FieldError, Position, Record, Value};
use crate::reader::Row;
use crate::schema::config::{ComputedFieldConfig, FieldConfig, TransformConfig, TypeSpec};
use crate::transform::registry::{build_builder, build_transform, build_type_converter};
use crate::transform::{BuilderStep, Chain, Family, Flow, OnError, Step};

/// Where a field's raw value comes from.
#[derive(Debug)]
pub enum Source {
    /// 1-based column of a delimited row.
    Column(usize),
    /// Character range `[start, start + length)` of a fixed-width row.
    Span { start: usize, length: usize },
    /// Builder evaluated against the record parsed so far.
    Builder(BuilderStep),
}

/// One output value of a row.
#[derive(Debug)]
pub struct Field {
    key: String,
    source: Source,
    chain: Chain,
    optional: bool,
}

// =============================================================================
// Building
// =============================================================================

impl Field {
    /// Build a field read from a row position.
    pub fn build(config: &FieldConfig) -> ConfigResult<Self> {
        let key = required_key(config.key.as_deref(), "field")?;

        let source = match (config.column_number, config.column_start, config.column_length) {
            (Some(0), _, _) => {
                return Err(ConfigError::InvalidOption {
                    key: "column-number",
                    message: format!("must be at least 1 for field '{key}'"),
                })
            }
            (Some(number), _, _) => Source::Column(number),
            (None, Some(start), Some(length)) => Source::Span { start, length },
            _ => return Err(ConfigError::MissingPosition(key)),
        };

        let type_spec = config.type_spec.as_ref().ok_or(ConfigError::MissingType)?;
        let chain = build_chain(
            &config.pre_processors,
            Some(type_spec),
            &config.validators,
            &config.post_processors,
        )?;

        Ok(Self {
            key,
            source,
            chain,
            optional: config.optional,
        })
    }

    /// Build a field computed by a builder.
    pub fn build_computed(config: &ComputedFieldConfig) -> ConfigResult<Self> {
        let key = required_key(config.key.as_deref(), "computed field")?;
        let builder = config
            .builder
            .as_ref()
            .ok_or_else(|| ConfigError::MissingBuilder(key.clone()))?;
        let builder = BuilderStep::new(
            build_builder(builder.name.as_deref(), builder.parameters.as_ref())?,
            builder.on_error,
        );

        let chain = build_chain(
            &config.pre_processors,
            config.type_spec.as_ref(),
            &config.validators,
            &config.post_processors,
        )?;

        Ok(Self {
            key,
            source: Source::Builder(builder),
            chain,
            optional: config.optional,
        })
    }
}

fn required_key(key: Option<&str>, kind: &'static str) -> ConfigResult<String> {
    match key {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(ConfigError::MissingFieldKey(kind)),
    }
}

fn build_steps(family: Family, configs: &[TransformConfig]) -> ConfigResult<Vec<Step>> {
    configs
        .iter()
        .map(|config| {
            let transform = build_transform(family, config.name.as_deref(), config.parameters.as_ref())?;
            Ok(Step::new(transform, config.on_error))
        })
        .collect()
}

fn build_type_step(spec: &TypeSpec) -> ConfigResult<Step> {
    match spec {
        TypeSpec::Name(key) => Ok(Step::new(
            build_type_converter(key, false, Default::default())?,
            OnError::Raise,
        )),
        TypeSpec::Detailed {
            key,
            nullable,
            on_error,
            parameters,
        } => {
            let key = key.as_deref().ok_or(ConfigError::MissingType)?;
            let converter = build_type_converter(key, *nullable, parameters.clone())?;
            Ok(Step::new(converter, *on_error))
        }
    }
}

fn build_chain(
    pre_processors: &[TransformConfig],
    type_spec: Option<&TypeSpec>,
    validators: &[TransformConfig],
    post_processors: &[TransformConfig],
) -> ConfigResult<Chain> {
    let mut steps = build_steps(Family::PreProcessor, pre_processors)?;
    if let Some(spec) = type_spec {
        steps.push(build_type_step(spec)?);
    }
    steps.extend(build_steps(Family::Validator, validators)?);
    steps.extend(build_steps(Family::PostProcessor, post_processors)?);
    Ok(Chain::new(steps))
}

// =============================================================================
// Running
// =============================================================================

impl Field {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.source, Source::Builder(_))
    }

    /// Position reported in errors.
    pub fn position(&self) -> Position {
        match self.source {
            Source::Column(column_number) => Position::Column { column_number },
            Source::Span { start, length } => Position::Span {
                column_start: start,
                column_length: length,
            },
            Source::Builder(_) => Position::Computed {},
        }
    }

    /// Extract the raw value: a slice of the row, or the builder's output.
    pub fn read_raw_value(&self, row: &Row, record: &Record) -> TransformResult<Flow> {
        let raw = match (&self.source, row) {
            (Source::Builder(builder), _) => return builder.run(record),
            (Source::Column(number), Row::Columns(columns)) => columns
                .get(number - 1)
                .cloned()
                .ok_or_else(|| TransformError::rejected(format!("column {number} is missing from row")))?,
            (Source::Column(1), Row::Line(line)) => line.clone(),
            (Source::Column(number), Row::Line(_)) => {
                return Err(TransformError::rejected(format!("column {number} is missing from row")))
            }
            (Source::Span { start, length }, Row::Line(line)) => line.chars().skip(*start).take(*length).collect(),
            (Source::Span { .. }, Row::Columns(_)) => {
                return Err(TransformError::rejected("fixed-width field cannot read a delimited row"))
            }
        };
        Ok(Flow::Ok(Value::Str(raw)))
    }

    /// Read and process this field's value.
    ///
    /// `Err` means a step with the `raise` policy rejected the value;
    /// [`Flow::SkipRow`] means a step with the `skip-row` policy did.
    pub fn run(&self, row: &Row, record: &Record) -> TransformResult<Flow> {
        let raw = match self.read_raw_value(row, record)? {
            Flow::Ok(raw) => raw,
            skip => return Ok(skip),
        };
        if raw.is_empty() {
            if self.optional {
                return Ok(Flow::Ok(Value::Null));
            }
            return Err(TransformError::Required { key: self.key.clone() });
        }
        self.chain.run(raw)
    }

    /// Render an error raised while running this field.
    pub fn error(&self, error: &TransformError) -> FieldError {
        FieldError {
            position: self.position(),
            field_key: self.key.clone(),
            error: error.to_string(),
        }
    }
}
