use std::io::Cursor;
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

use super::{normalize_newlines, RecordReader, Row, Rows};

/// Delimited records.
///
/// Without a quote character every byte between delimiters is kept as is.
/// With one, quoted tokens may contain delimiters, doubled quotes and line
/// breaks. A quote inside an unquoted token is kept as a literal.
#[derive(Debug, Clone, Copy)]
pub struct CsvReader {
    delimiter: u8,
    quote: Option<u8>,
}

impl CsvReader {
    pub fn new(delimiter: char, quotechar: Option<char>) -> ConfigResult<Self> {
        let delimiter = single_byte("delimiter", delimiter)?;
        let quote = quotechar.map(|q| single_byte("quotechar", q)).transpose()?;
        Ok(Self { delimiter, quote })
    }
}

fn single_byte(key: &'static str, c: char) -> ConfigResult<u8> {
    u8::try_from(c).ok().filter(u8::is_ascii).ok_or_else(|| ConfigError::InvalidOption {
        key,
        message: format!("must be a single ASCII character, got '{c}'"),
    })
}

impl RecordReader for CsvReader {
    fn rows(&self, text: String) -> Rows {
        let mut builder = csv::ReaderBuilder::new();
        builder.has_headers(false).flexible(true).delimiter(self.delimiter);
        match self.quote {
            Some(quote) => builder.quote(quote),
            None => builder.quoting(false),
        };
        let reader = builder.from_reader(Cursor::new(normalize_newlines(text)));
        Box::new(Records {
            reader,
            record: csv::StringRecord::new(),
            blanks: 0,
            pending: None,
        })
    }
}

/// Tokenized records of the whole text.
///
/// The csv reader drops empty lines; they come back here as blank rows so
/// row numbers keep following the source lines.
struct Records {
    reader: csv::Reader<Cursor<String>>,
    record: csv::StringRecord,
    blanks: usize,
    pending: Option<Row>,
}

impl Records {
    /// Empty lines between the reader's position and the next record.
    fn empty_lines_ahead(&self) -> usize {
        let text = self.reader.get_ref().get_ref();
        let offset = usize::try_from(self.reader.position().byte()).unwrap_or(text.len());
        text.get(offset..)
            .map_or(0, |rest| rest.bytes().take_while(|b| *b == b'\n').count())
    }
}

impl Iterator for Records {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        if self.blanks > 0 {
            self.blanks -= 1;
            return Some(Row::Columns(Vec::new()));
        }
        if let Some(row) = self.pending.take() {
            return Some(row);
        }

        let blanks = self.empty_lines_ahead();
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(error) => {
                warn!(%error, "Stopped reading delimited records");
                return None;
            }
        }
        let row = Row::Columns(self.record.iter().map(str::to_string).collect());
        if blanks == 0 {
            return Some(row);
        }
        self.blanks = blanks - 1;
        self.pending = Some(row);
        Some(Row::Columns(Vec::new()))
    }
}
