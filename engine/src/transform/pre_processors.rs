//! Pre-processors: string to string clean-up applied before type conversion.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{ConfigResult, TransformError, TransformResult};
use crate::models::Value;

use super::registry::Registry;
use super::{Buildable, Parameters, Transform};

pub(crate) fn register_builtins(registry: &mut Registry<dyn Transform>) {
    registry.register::<StripWhitespaces>();
    registry.register::<LeftPadZeroes>();
    registry.register::<LeftPad>();
    registry.register::<Replace>();
    registry.register::<RegexExtract>();
    registry.register::<Map>();
    registry.register::<LeftStrip>();
}

/// Pre-processors only ever see strings, unless a custom one upstream
/// produced something else.
fn expect_str(key: &str, value: Value) -> TransformResult<String> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(TransformError::IncompatibleTypes(format!(
            "pre-processor '{key}' expects a string, got '{}'",
            other.type_name()
        ))),
    }
}

// =============================================================================
// Whitespace and padding
// =============================================================================

/// Remove leading and trailing whitespace.
#[derive(Debug)]
pub struct StripWhitespaces;

impl Buildable for StripWhitespaces {
    const KEY: &'static str = "strip-whitespaces";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        parameters.expect_none()?;
        Ok(Self)
    }
}

impl Transform for StripWhitespaces {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        Ok(Value::Str(s.trim().to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WidthParams {
    width: usize,
}

/// Pad with zeroes up to `width` characters, after any leading sign.
#[derive(Debug)]
pub struct LeftPadZeroes {
    width: usize,
}

impl Buildable for LeftPadZeroes {
    const KEY: &'static str = "left-pad-zeroes";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let WidthParams { width } = parameters.parse()?;
        Ok(Self { width })
    }
}

impl Transform for LeftPadZeroes {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        let len = s.chars().count();
        if len >= self.width {
            return Ok(Value::Str(s));
        }
        let zeroes = "0".repeat(self.width - len);
        let padded = match s.strip_prefix(&['+', '-'][..]) {
            Some(rest) => format!("{}{zeroes}{rest}", &s[..1]),
            None => format!("{zeroes}{s}"),
        };
        Ok(Value::Str(padded))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LeftPadParams {
    width: usize,
    character: String,
}

/// Pad with an arbitrary character up to `width` characters.
#[derive(Debug)]
pub struct LeftPad {
    width: usize,
    character: char,
}

impl Buildable for LeftPad {
    const KEY: &'static str = "left-pad";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let LeftPadParams { width, character } = parameters.parse()?;
        let mut chars = character.chars();
        match (chars.next(), chars.next()) {
            (Some(character), None) => Ok(Self { width, character }),
            _ => Err(parameters.invalid("'character' parameter must be a single character")),
        }
    }
}

impl Transform for LeftPad {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        let missing = self.width.saturating_sub(s.chars().count());
        let mut padded: String = std::iter::repeat(self.character).take(missing).collect();
        padded.push_str(&s);
        Ok(Value::Str(padded))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CharactersParams {
    characters: String,
}

/// Remove any leading character found in `characters`.
#[derive(Debug)]
pub struct LeftStrip {
    characters: Vec<char>,
}

impl Buildable for LeftStrip {
    const KEY: &'static str = "left-strip";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let CharactersParams { characters } = parameters.parse()?;
        Ok(Self {
            characters: characters.chars().collect(),
        })
    }
}

impl Transform for LeftStrip {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        Ok(Value::Str(s.trim_start_matches(self.characters.as_slice()).to_string()))
    }
}

// =============================================================================
// Substitution
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplaceParams {
    pattern: String,
    replacement: String,
}

/// Replace every literal occurrence of `pattern`.
#[derive(Debug)]
pub struct Replace {
    pattern: String,
    replacement: String,
}

impl Buildable for Replace {
    const KEY: &'static str = "replace";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let ReplaceParams { pattern, replacement } = parameters.parse()?;
        Ok(Self { pattern, replacement })
    }
}

impl Transform for Replace {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        Ok(Value::Str(s.replace(&self.pattern, &self.replacement)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternParams {
    pattern: String,
}

/// Keep only the `value` group of a regex matched at the start of the value.
#[derive(Debug)]
pub struct RegexExtract {
    pattern: String,
    regex: Regex,
}

impl Buildable for RegexExtract {
    const KEY: &'static str = "regex-extract";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let PatternParams { pattern } = parameters.parse()?;
        let regex = Regex::new(&format!("^(?:{pattern})"))
            .map_err(|e| parameters.invalid(format!("invalid pattern: {e}")))?;
        if !regex.capture_names().any(|name| name == Some("value")) {
            return Err(parameters.invalid("regex-extract's pattern must contain a group named 'value'"));
        }
        Ok(Self { pattern, regex })
    }
}

impl Transform for RegexExtract {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        self.regex
            .captures(&s)
            .and_then(|captures| captures.name("value"))
            .map(|m| Value::Str(m.as_str().to_string()))
            .ok_or_else(|| {
                TransformError::rejected(format!("cannot extract value from pattern '{}'", self.pattern))
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MapParams {
    values: BTreeMap<String, String>,
}

/// Look the value up in a dictionary.
#[derive(Debug)]
pub struct Map {
    values: BTreeMap<String, String>,
    known_keys: String,
}

impl Buildable for Map {
    const KEY: &'static str = "map";

    fn build(parameters: &Parameters) -> ConfigResult<Self> {
        let MapParams { values } = parameters.parse()?;
        let known_keys = values
            .keys()
            .map(|key| format!("'{key}'"))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self { values, known_keys })
    }
}

impl Transform for Map {
    fn apply(&self, value: Value) -> TransformResult<Value> {
        let s = expect_str(Self::KEY, value)?;
        match self.values.get(&s) {
            Some(mapped) => Ok(Value::Str(mapped.clone())),
            None => Err(TransformError::rejected(format!(
                "value '{s}' does not map to any values in [{}]",
                self.known_keys
            ))),
        }
    }
}
