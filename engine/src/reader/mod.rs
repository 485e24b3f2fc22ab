//! Record sources.
//!
//! A [`RecordReader`] turns decoded text into a lazy sequence of [`Row`]s,
//! one per logical record. Blank records are yielded too (as blank rows) so
//! the schema can keep row numbers aligned with the source.
//!
//! Built-in readers:
//!
//! - [`CsvReader`] - delimited records with optional quoting
//! - [`ColumnarReader`] - fixed-width lines

mod columnar;
mod delimited;
pub mod encoding;

use std::fmt;

pub use self::columnar::ColumnarReader;
pub use self::delimited::CsvReader;
pub use encoding::TextEncoding;

/// One raw record, before any field reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Tokens of a delimited record.
    Columns(Vec<String>),
    /// A fixed-width line, terminator stripped.
    Line(String),
}

impl Row {
    /// Every token is empty.
    pub fn is_blank(&self) -> bool {
        match self {
            Row::Columns(columns) => columns.iter().all(String::is_empty),
            Row::Line(line) => line.is_empty(),
        }
    }
}

/// Lazy sequence of rows.
pub type Rows = Box<dyn Iterator<Item = Row> + Send>;

/// Splits decoded text into rows.
pub trait RecordReader: Send + Sync + fmt::Debug {
    fn rows(&self, text: String) -> Rows;
}

/// Rewrite `\r\n` and bare `\r` line endings as `\n`.
pub fn normalize_newlines(text: String) -> String {
    if !text.contains('\r') {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Physical lines of an owned text, terminators (`\n`, `\r\n` or `\r`)
/// stripped.
///
/// A trailing terminator does not produce a final empty line.
#[derive(Debug)]
pub struct Lines {
    text: String,
    position: usize,
}

impl Lines {
    pub fn new(text: String) -> Self {
        Self {
            text: normalize_newlines(text),
            position: 0,
        }
    }
}

impl Iterator for Lines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.position >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.position..];
        let (line, consumed) = match rest.find('\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        let line = line.to_string();
        self.position += consumed;
        Some(line)
    }
}
