//! Parse/format function pairs, one per scalar kind.
//!
//! A [`Coercion`] is selected once when a column descriptor is built and then
//! reused for every cell of that column.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

use super::types::{ScalarKind, Value};

/// Text to value conversion.
pub type ParseFn = fn(&str) -> Result<Value, CoercionError>;

/// Value to canonical text conversion.
pub type FormatFn = fn(&Value) -> String;

/// Reasons a value cannot be produced for a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("invalid integer '{0}'")]
    Integer(String),

    #[error("invalid float '{0}'")]
    Float(String),

    #[error("invalid boolean '{0}'")]
    Boolean(String),

    #[error("invalid timestamp '{0}' (expected RFC 3339, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD')")]
    Timestamp(String),

    #[error("value {value} is out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("expected {expected} value, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Parse/format pair for one scalar kind.
#[derive(Clone, Copy)]
pub struct Coercion {
    kind: ScalarKind,
    parse: ParseFn,
    format: FormatFn,
}

impl Coercion {
    /// Select the function pair for a kind.
    pub fn for_kind(kind: ScalarKind) -> Self {
        let (parse, format): (ParseFn, FormatFn) = match kind {
            ScalarKind::Text => (parse_text, format_text),
            ScalarKind::Integer => (parse_integer, format_integer),
            ScalarKind::Float => (parse_float, format_float),
            ScalarKind::Boolean => (parse_boolean, format_boolean),
            ScalarKind::Timestamp => (parse_timestamp, format_timestamp),
        };
        Self {
            kind,
            parse,
            format,
        }
    }

    /// Kind this pair converts.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Convert cell text into a value.
    pub fn parse(&self, text: &str) -> Result<Value, CoercionError> {
        (self.parse)(text)
    }

    /// Convert a value into its canonical cell text.
    pub fn format(&self, value: &Value) -> String {
        (self.format)(value)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion").field("kind", &self.kind).finish()
    }
}

impl PartialEq for Coercion {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Text is never trimmed so it round-trips byte for byte.
fn parse_text(text: &str) -> Result<Value, CoercionError> {
    Ok(Value::Text(text.to_string()))
}

fn parse_integer(text: &str) -> Result<Value, CoercionError> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map(Value::Integer)
        .map_err(|_| CoercionError::Integer(trimmed.to_string()))
}

fn parse_float(text: &str) -> Result<Value, CoercionError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map(Value::Float)
        .map_err(|_| CoercionError::Float(trimmed.to_string()))
}

fn parse_boolean(text: &str) -> Result<Value, CoercionError> {
    let trimmed = text.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(Value::Boolean(true)),
        "false" | "f" | "0" | "no" | "n" => Ok(Value::Boolean(false)),
        _ => Err(CoercionError::Boolean(trimmed.to_string())),
    }
}

fn parse_timestamp(text: &str) -> Result<Value, CoercionError> {
    let trimmed = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Value::Timestamp(ts.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(Value::Timestamp(naive.and_utc()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Value::Timestamp(naive.and_utc()))
        .ok_or_else(|| CoercionError::Timestamp(trimmed.to_string()))
}

fn format_text(value: &Value) -> String {
    value.to_string()
}

fn format_integer(value: &Value) -> String {
    match value {
        Value::Integer(i) => i.to_string(),
        Value::Float(x) if x.fract() == 0.0 && x.is_finite() => format!("{}", *x as i64),
        other => other.to_string(),
    }
}

fn format_float(value: &Value) -> String {
    match value {
        Value::Float(x) => x.to_string(),
        Value::Integer(i) => (*i as f64).to_string(),
        other => other.to_string(),
    }
}

fn format_boolean(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => (*i != 0).to_string(),
        other => other.to_string(),
    }
}

fn format_timestamp(value: &Value) -> String {
    value.to_string()
}
