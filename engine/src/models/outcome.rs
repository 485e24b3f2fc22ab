//! Row classification results.

use serde::Serialize;

use super::value::Record;

// =============================================================================
// Field errors
// =============================================================================

/// Where a field reads its raw value from, as reported in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Position {
    /// 1-based column of a delimited row.
    Column {
        #[serde(rename = "column-number")]
        column_number: usize,
    },
    /// Character range of a fixed-width row.
    Span {
        #[serde(rename = "column-start")]
        column_start: usize,
        #[serde(rename = "column-length")]
        column_length: usize,
    },
    /// Computed from the record; no position in the source.
    Computed {},
}

/// One field's failure inside a row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    #[serde(flatten)]
    pub position: Position,
    #[serde(rename = "field-key")]
    pub field_key: String,
    pub error: String,
}

// =============================================================================
// Row outcomes
// =============================================================================

/// Result of processing one row.
///
/// `Parsed` never carries errors; `Skipped` and `Failed` always carry at
/// least one [`FieldError`] and never carry values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    Parsed {
        #[serde(rename = "row-number")]
        row_number: usize,
        values: Record,
    },
    Skipped {
        #[serde(rename = "row-number")]
        row_number: usize,
        errors: Vec<FieldError>,
    },
    Failed {
        #[serde(rename = "row-number")]
        row_number: usize,
        errors: Vec<FieldError>,
    },
}

impl RowOutcome {
    /// 1-based number of the row in the source, header included.
    pub fn row_number(&self) -> usize {
        match self {
            RowOutcome::Parsed { row_number, .. }
            | RowOutcome::Skipped { row_number, .. }
            | RowOutcome::Failed { row_number, .. } => *row_number,
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, RowOutcome::Parsed { .. })
    }

    pub fn values(&self) -> Option<&Record> {
        match self {
            RowOutcome::Parsed { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Field errors of the row (empty for parsed rows).
    pub fn errors(&self) -> &[FieldError] {
        match self {
            RowOutcome::Parsed { .. } => &[],
            RowOutcome::Skipped { errors, .. } | RowOutcome::Failed { errors, .. } => errors,
        }
    }
}

/// Counts of each outcome kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub parsed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &RowOutcome) {
        match outcome {
            RowOutcome::Parsed { .. } => self.parsed += 1,
            RowOutcome::Skipped { .. } => self.skipped += 1,
            RowOutcome::Failed { .. } => self.failed += 1,
        }
    }

    pub fn from_outcomes(outcomes: &[RowOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.parsed + self.skipped + self.failed
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Parsed: {} rows, {} skipped, {} failed",
            self.parsed, self.skipped, self.failed
        )
    }
}
