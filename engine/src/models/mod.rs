//! Data model of the engine.
//!
//! - [`Value`] - a typed value produced by a field's chain
//! - [`Record`] - the values of one row, keyed by field key
//! - [`RowOutcome`] - the classification of one row (parsed, skipped, failed)
//! - [`FieldError`] - one field's failure, with its position in the source

mod outcome;
mod value;

pub use outcome::{FieldError, Position, RowOutcome, Summary};
pub use value::{OffsetTime, Record, Value};
