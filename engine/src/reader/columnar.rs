use super::{Lines, RecordReader, Row, Rows};

/// Fixed-width records: one line per record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarReader;

impl RecordReader for ColumnarReader {
    fn rows(&self, text: String) -> Rows {
        Box::new(Lines::new(text).map(Row::Line))
    }
}
