//! Typed access to a field of a JSON manifest and normalized comparison.
//!
//! The launch command written by the instrumentation step may differ from
//! the expected one only in whitespace, so both sides are compared after
//! every whitespace character has been removed.

use std::fmt;
use std::str::FromStr;

use dropcheck_common::error::{DropcheckError, Result};
use serde_json::Value;

/// Dotted path to a nested field, such as `scripts.start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    /// Parses a dotted path.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Config` if the path or any segment is empty.
    pub fn parse(raw: &str) -> Result<Self> {
        let segments: Vec<String> = raw.split('.').map(str::to_owned).collect();
        if raw.is_empty() || segments.iter().any(String::is_empty) {
            return Err(DropcheckError::Config {
                message: format!("invalid field path {raw:?}"),
            });
        }
        Ok(Self {
            raw: raw.to_owned(),
            segments,
        })
    }

    /// Path segments from the document root.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for FieldPath {
    type Err = DropcheckError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Removes every whitespace character.
#[must_use]
pub fn normalize(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Outcome of comparing a normalized actual value against a normalized
/// expected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Normalized expected value.
    pub expected: String,
    /// Normalized value found in the manifest.
    pub actual: String,
}

impl Comparison {
    /// Normalizes both sides.
    #[must_use]
    pub fn new(expected: &str, actual: &str) -> Self {
        Self {
            expected: normalize(expected),
            actual: normalize(actual),
        }
    }

    /// Whether the normalized values are equal.
    #[must_use]
    pub fn matched(&self) -> bool {
        self.expected == self.actual
    }
}

/// Parses `bytes` as JSON and returns the string at `field`.
///
/// `entry` names the archive entry in error messages.
///
/// # Errors
///
/// Returns `UnparseableManifest` if `bytes` is not JSON, and `MissingField`
/// if a segment is absent, a parent is not an object, or the leaf is not a
/// string.
pub fn extract_string_field(bytes: &[u8], entry: &str, field: &FieldPath) -> Result<String> {
    let document: Value =
        serde_json::from_slice(bytes).map_err(|e| DropcheckError::UnparseableManifest {
            entry: entry.to_owned(),
            source: e,
        })?;

    let mut current = &document;
    let mut walked = String::from("<root>");
    for segment in field.segments() {
        let Value::Object(map) = current else {
            return Err(missing(field, format!("{walked} is {}, not an object", kind_of(current))));
        };
        current = map
            .get(segment)
            .ok_or_else(|| missing(field, format!("{walked} has no key {segment:?}")))?;
        if walked == "<root>" {
            walked.clone_from(segment);
        } else {
            walked.push('.');
            walked.push_str(segment);
        }
    }

    current
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| missing(field, format!("value is {}, not a string", kind_of(current))))
}

/// Extracts `field` from the manifest bytes and compares it with `expected`.
///
/// # Errors
///
/// Propagates the errors of [`extract_string_field`].
pub fn compare_field(
    bytes: &[u8],
    entry: &str,
    field: &FieldPath,
    expected: &str,
) -> Result<Comparison> {
    let actual = extract_string_field(bytes, entry, field)?;
    let comparison = Comparison::new(expected, &actual);
    tracing::debug!(
        field = %field,
        matched = comparison.matched(),
        actual = %comparison.actual,
        "compared manifest field"
    );
    Ok(comparison)
}

fn missing(field: &FieldPath, reason: String) -> DropcheckError {
    DropcheckError::MissingField {
        field: field.as_str().to_owned(),
        reason,
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
