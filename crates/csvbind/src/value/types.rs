//! Core type definitions for field values.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::coerce::CoercionError;

/// Kind of a single cell value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    /// Free text, taken verbatim.
    Text,
    /// Signed 64-bit integer.
    Integer,
    /// 64-bit floating point number.
    Float,
    /// true/false.
    Boolean,
    /// Instant in UTC.
    Timestamp,
}

impl ScalarKind {
    /// Value a field of this kind holds when its cell is absent or empty.
    pub fn zero(self) -> Value {
        match self {
            ScalarKind::Text => Value::Text(String::new()),
            ScalarKind::Integer => Value::Integer(0),
            ScalarKind::Float => Value::Float(0.0),
            ScalarKind::Boolean => Value::Boolean(false),
            ScalarKind::Timestamp => Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    /// Get a human-readable label for the kind.
    pub fn label(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

/// Declared kind of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// A single value.
    Scalar(ScalarKind),
    /// An ordered sequence of values of one kind.
    Sequence(ScalarKind),
}

impl FieldKind {
    /// Returns true if this kind is a sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldKind::Sequence(_))
    }

    /// Kind of each individual value (the element kind for sequences).
    pub fn element(&self) -> ScalarKind {
        match self {
            FieldKind::Scalar(kind) | FieldKind::Sequence(kind) => *kind,
        }
    }

    /// Zero value for a field of this kind.
    pub fn zero(&self) -> FieldValue {
        match self {
            FieldKind::Scalar(kind) => FieldValue::Scalar(kind.zero()),
            FieldKind::Sequence(_) => FieldValue::Sequence(Vec::new()),
        }
    }
}

/// Storage width of a numeric field type, bounding the values it can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericWidth {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    F32,
    F64,
}

impl NumericWidth {
    /// Name of the Rust type of this width.
    pub fn label(self) -> &'static str {
        match self {
            NumericWidth::I8 => "i8",
            NumericWidth::I16 => "i16",
            NumericWidth::I32 => "i32",
            NumericWidth::I64 => "i64",
            NumericWidth::U8 => "u8",
            NumericWidth::U16 => "u16",
            NumericWidth::U32 => "u32",
            NumericWidth::F32 => "f32",
            NumericWidth::F64 => "f64",
        }
    }

    /// Check that `value` fits this width. Values of other kinds pass.
    ///
    /// A finite float fails for `f32` when narrowing would overflow to
    /// infinity; infinities and NaN pass unchanged.
    pub fn check(self, value: &Value) -> Result<(), CoercionError> {
        let fits = match (self, value) {
            (NumericWidth::I8, Value::Integer(i)) => i8::try_from(*i).is_ok(),
            (NumericWidth::I16, Value::Integer(i)) => i16::try_from(*i).is_ok(),
            (NumericWidth::I32, Value::Integer(i)) => i32::try_from(*i).is_ok(),
            (NumericWidth::U8, Value::Integer(i)) => u8::try_from(*i).is_ok(),
            (NumericWidth::U16, Value::Integer(i)) => u16::try_from(*i).is_ok(),
            (NumericWidth::U32, Value::Integer(i)) => u32::try_from(*i).is_ok(),
            (NumericWidth::F32, Value::Float(x)) => !x.is_finite() || (*x as f32).is_finite(),
            _ => true,
        };
        if fits {
            Ok(())
        } else {
            Err(CoercionError::OutOfRange {
                target: self.label(),
                value: value.to_string(),
            })
        }
    }
}

/// A single typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Kind of this value.
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Text(_) => ScalarKind::Text,
            Value::Integer(_) => ScalarKind::Integer,
            Value::Float(_) => ScalarKind::Float,
            Value::Boolean(_) => ScalarKind::Boolean,
            Value::Timestamp(_) => ScalarKind::Timestamp,
        }
    }
}

/// Canonical text of the value, readable back by the parser of its kind.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// The value of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Sequence(Vec<Value>),
}

impl FieldValue {
    /// Returns true if this is a sequence value.
    pub fn is_sequence(&self) -> bool {
        matches!(self, FieldValue::Sequence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_width_bounds() {
        assert!(NumericWidth::U8.check(&Value::Integer(255)).is_ok());
        assert_eq!(
            NumericWidth::U8.check(&Value::Integer(300)),
            Err(CoercionError::OutOfRange {
                target: "u8",
                value: "300".to_string()
            })
        );
        assert!(NumericWidth::I8.check(&Value::Integer(-129)).is_err());
        assert!(NumericWidth::U32.check(&Value::Integer(-1)).is_err());
        assert!(NumericWidth::I64.check(&Value::Integer(i64::MIN)).is_ok());
        assert!(NumericWidth::U8.check(&Value::Text("300".to_string())).is_ok());
    }

    #[test]
    fn test_f32_width_rejects_finite_overflow() {
        assert!(NumericWidth::F32.check(&Value::Float(1e40)).is_err());
        assert!(NumericWidth::F32.check(&Value::Float(3.0e38)).is_ok());
        assert!(NumericWidth::F32.check(&Value::Float(f64::INFINITY)).is_ok());
        assert!(NumericWidth::F64.check(&Value::Float(1e300)).is_ok());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(ScalarKind::Text.zero(), Value::Text(String::new()));
        assert_eq!(ScalarKind::Integer.zero(), Value::Integer(0));
        assert_eq!(ScalarKind::Boolean.zero(), Value::Boolean(false));
        assert_eq!(
            FieldKind::Sequence(ScalarKind::Float).zero(),
            FieldValue::Sequence(Vec::new())
        );
    }

    #[test]
    fn test_timestamp_display_is_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T12:30:00+02:00")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Value::Timestamp(ts).to_string(), "2024-03-01T10:30:00Z");
    }

    #[test]
    fn test_field_kind_serde() {
        let kind = FieldKind::Sequence(ScalarKind::Integer);
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"sequence":"integer"}"#);
        let back: FieldKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kind);
    }
}
