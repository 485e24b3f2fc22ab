//! Byte to text decoding.
//!
//! Labels are resolved through `encoding_rs` (WHATWG names). Python-style
//! codec names such as `iso8859_5` or `latin_1` are accepted too. The
//! special label `auto` detects the encoding with `chardet`.

use encoding_rs::{Encoding, UTF_8};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult, Error, Result};

/// Encoding declared by a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Fixed(&'static Encoding),
    /// Detected from the input bytes.
    Auto,
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::Fixed(UTF_8)
    }
}

impl TextEncoding {
    /// Resolve a configuration label.
    pub fn for_label(label: &str) -> ConfigResult<Self> {
        if label.eq_ignore_ascii_case("auto") {
            return Ok(TextEncoding::Auto);
        }
        lookup(label)
            .map(TextEncoding::Fixed)
            .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string()))
    }

    /// Decode the whole input. Malformed sequences are an error, never
    /// silently replaced. A leading byte order mark is dropped.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        let encoding = match self {
            TextEncoding::Fixed(encoding) => *encoding,
            TextEncoding::Auto => detect_encoding(bytes),
        };
        let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(Error::Decode {
                encoding: encoding.name().to_string(),
            });
        }
        Ok(text.into_owned())
    }
}

fn lookup(label: &str) -> Option<&'static Encoding> {
    let label = label.trim().to_ascii_lowercase();
    Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(label.replace('_', "-").as_bytes()))
        .or_else(|| Encoding::for_label(label.replace(&['_', '-'][..], "").as_bytes()))
}

/// Detect the encoding of raw bytes using chardet, falling back to UTF-8.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let (charset, confidence, _language) = chardet::detect(bytes);
    let encoding = lookup(chardet::charset2encoding(&charset)).unwrap_or(UTF_8);
    warn!(
        detected = %charset,
        confidence,
        encoding = encoding.name(),
        "Encoding auto-detected"
    );
    encoding
}
