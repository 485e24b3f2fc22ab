use std::borrow::Borrow;
use std::fmt;
use tracing::trace;

use super::Schema;
use crate::models::RowOutcome;
use crate::reader::Rows;

/// Lazy sequence of row outcomes.
///
/// Rows are numbered from 1 in source order. The header and blank rows take
/// a number but yield no outcome. `S` is either `&Schema` or an owned
/// [`Schema`].
pub struct RowStream<S: Borrow<Schema>> {
    schema: S,
    rows: Rows,
    row_number: usize,
}

impl<S: Borrow<Schema>> RowStream<S> {
    pub(super) fn new(schema: S, text: String) -> Self {
        let mut rows = schema.borrow().reader.rows(text);
        let mut row_number = 0;
        if schema.borrow().has_header && rows.next().is_some() {
            row_number = 1;
        }
        Self {
            schema,
            rows,
            row_number,
        }
    }

    /// Number of the last row read.
    pub fn row_number(&self) -> usize {
        self.row_number
    }
}

impl<S: Borrow<Schema>> Iterator for RowStream<S> {
    type Item = RowOutcome;

    fn next(&mut self) -> Option<RowOutcome> {
        loop {
            let row = self.rows.next()?;
            self.row_number += 1;
            if row.is_blank() {
                trace!(row_number = self.row_number, "Blank row");
                continue;
            }
            return Some(self.schema.borrow().process_row(self.row_number, &row));
        }
    }
}

impl<S: Borrow<Schema>> fmt::Debug for RowStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("row_number", &self.row_number)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(&json!({
            "file_type": "csv",
            "has_header": true,
            "fields": [{"key": "n", "type": "int", "column-number": 1}]
        }))
        .unwrap()
    }

    #[test]
    fn test_stream_is_lazy() {
        let schema = schema();
        let mut stream = schema.stream("n\n1\nx\n3\n".as_bytes()).unwrap();
        assert_eq!(stream.row_number(), 1);

        let first = stream.next().unwrap();
        assert_eq!(first.row_number(), 2);
        assert_eq!(stream.row_number(), 2);

        let rest: Vec<RowOutcome> = stream.collect();
        assert_eq!(rest.len(), 2);
        assert!(!rest[0].is_parsed());
        assert_eq!(rest[1].row_number(), 4);
    }

    #[test]
    fn test_owned_stream() {
        let stream = schema().into_stream("n\n\n5\n".as_bytes()).unwrap();
        let outcomes: Vec<RowOutcome> = stream.collect();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].row_number(), 3);
    }

    #[test]
    fn test_header_only_input() {
        let schema = schema();
        assert_eq!(schema.stream("n\n".as_bytes()).unwrap().count(), 0);
        assert_eq!(schema.stream("".as_bytes()).unwrap().count(), 0);
    }
}
