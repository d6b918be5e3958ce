//! Mapping between Rust field types and [`FieldValue`].

use chrono::{DateTime, Utc};

use super::coerce::CoercionError;
use super::types::{FieldKind, FieldValue, NumericWidth, ScalarKind, Value};

/// A Rust type that can hold one cell value.
pub trait ScalarField: Sized {
    /// Kind of the cell value.
    const KIND: ScalarKind;

    /// Width bounding the values of numeric types.
    const WIDTH: Option<NumericWidth> = None;

    /// Convert into a typed value.
    fn to_value(&self) -> Value;

    /// Convert back from a typed value.
    fn from_value(value: Value) -> Result<Self, CoercionError>;
}

/// A Rust type usable as a record field.
///
/// Implemented for every [`ScalarField`] type and for `Vec` of each of them.
pub trait CsvField: Sized {
    /// Declared kind of the field.
    const KIND: FieldKind;

    /// Width bounding each value of the field, for numeric types.
    const WIDTH: Option<NumericWidth>;

    /// Read the field as a [`FieldValue`].
    fn to_field_value(&self) -> FieldValue;

    /// Build the field from a [`FieldValue`].
    fn from_field_value(value: FieldValue) -> Result<Self, CoercionError>;
}

/// Kind of the field reached through `accessor`.
///
/// Used by [`record!`](crate::record) to learn a field's kind from its
/// declared type without naming the type.
pub fn kind_of<R, T, F>(_accessor: F) -> FieldKind
where
    T: CsvField,
    F: Fn(&R) -> &T,
{
    T::KIND
}

/// Numeric width of the field reached through `accessor`, if any.
pub fn width_of<R, T, F>(_accessor: F) -> Option<NumericWidth>
where
    T: CsvField,
    F: Fn(&R) -> &T,
{
    T::WIDTH
}

fn mismatch(expected: ScalarKind, found: &Value) -> CoercionError {
    CoercionError::KindMismatch {
        expected: expected.label(),
        found: found.kind().label(),
    }
}

impl ScalarField for String {
    const KIND: ScalarKind = ScalarKind::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

macro_rules! impl_integer_field {
    ($($ty:ty => $width:ident),*) => {
        $(
            impl ScalarField for $ty {
                const KIND: ScalarKind = ScalarKind::Integer;
                const WIDTH: Option<NumericWidth> = Some(NumericWidth::$width);

                fn to_value(&self) -> Value {
                    Value::Integer(i64::from(*self))
                }

                fn from_value(value: Value) -> Result<Self, CoercionError> {
                    match value {
                        Value::Integer(i) => <$ty>::try_from(i).map_err(|_| {
                            CoercionError::OutOfRange {
                                target: stringify!($ty),
                                value: i.to_string(),
                            }
                        }),
                        other => Err(mismatch(ScalarKind::Integer, &other)),
                    }
                }
            }
        )*
    };
}

impl_integer_field!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32
);

impl ScalarField for f64 {
    const KIND: ScalarKind = ScalarKind::Float;
    const WIDTH: Option<NumericWidth> = Some(NumericWidth::F64);

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch(ScalarKind::Float, &other)),
        }
    }
}

impl ScalarField for f32 {
    const KIND: ScalarKind = ScalarKind::Float;
    const WIDTH: Option<NumericWidth> = Some(NumericWidth::F32);

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        NumericWidth::F32.check(&value)?;
        match value {
            Value::Float(x) => Ok(x as f32),
            Value::Integer(i) => Ok(i as f32),
            other => Err(mismatch(ScalarKind::Float, &other)),
        }
    }
}

impl ScalarField for bool {
    const KIND: ScalarKind = ScalarKind::Boolean;

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch(ScalarKind::Boolean, &other)),
        }
    }
}

impl ScalarField for DateTime<Utc> {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            other => Err(mismatch(ScalarKind::Timestamp, &other)),
        }
    }
}

macro_rules! impl_csv_field {
    ($($ty:ty),*) => {
        $(
            impl CsvField for $ty {
                const KIND: FieldKind = FieldKind::Scalar(<$ty as ScalarField>::KIND);
                const WIDTH: Option<NumericWidth> = <$ty as ScalarField>::WIDTH;

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Scalar(self.to_value())
                }

                fn from_field_value(value: FieldValue) -> Result<Self, CoercionError> {
                    match value {
                        FieldValue::Scalar(v) => <$ty as ScalarField>::from_value(v),
                        FieldValue::Sequence(mut values) if values.len() == 1 => {
                            <$ty as ScalarField>::from_value(values.remove(0))
                        }
                        FieldValue::Sequence(_) => Err(CoercionError::KindMismatch {
                            expected: <$ty as ScalarField>::KIND.label(),
                            found: "sequence",
                        }),
                    }
                }
            }

            impl CsvField for Vec<$ty> {
                const KIND: FieldKind = FieldKind::Sequence(<$ty as ScalarField>::KIND);
                const WIDTH: Option<NumericWidth> = <$ty as ScalarField>::WIDTH;

                fn to_field_value(&self) -> FieldValue {
                    FieldValue::Sequence(self.iter().map(ScalarField::to_value).collect())
                }

                fn from_field_value(value: FieldValue) -> Result<Self, CoercionError> {
                    match value {
                        FieldValue::Sequence(values) => values
                            .into_iter()
                            .map(<$ty as ScalarField>::from_value)
                            .collect(),
                        FieldValue::Scalar(v) => Ok(vec![<$ty as ScalarField>::from_value(v)?]),
                    }
                }
            }
        )*
    };
}

impl_csv_field!(String, i8, i16, i32, i64, u8, u16, u32, f64, f32, bool, DateTime<Utc>);

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        count: u32,
        tags: Vec<String>,
    }

    #[test]
    fn test_kind_of_reads_declared_type() {
        assert_eq!(
            kind_of(|s: &Sample| &s.count),
            FieldKind::Scalar(ScalarKind::Integer)
        );
        assert_eq!(
            kind_of(|s: &Sample| &s.tags),
            FieldKind::Sequence(ScalarKind::Text)
        );
    }

    #[test]
    fn test_narrow_integer_rejects_out_of_range() {
        let err = u8::from_field_value(FieldValue::Scalar(Value::Integer(300))).unwrap_err();
        assert_eq!(
            err,
            CoercionError::OutOfRange {
                target: "u8",
                value: "300".to_string()
            }
        );
        assert_eq!(
            i32::from_field_value(FieldValue::Scalar(Value::Integer(-5))).unwrap(),
            -5
        );
    }

    #[test]
    fn test_width_of_reads_declared_type() {
        struct Narrow {
            small: u8,
            ratios: Vec<f32>,
            label: String,
        }
        assert_eq!(width_of(|n: &Narrow| &n.small), Some(NumericWidth::U8));
        assert_eq!(width_of(|n: &Narrow| &n.ratios), Some(NumericWidth::F32));
        assert_eq!(width_of(|n: &Narrow| &n.label), None);
    }

    #[test]
    fn test_f32_rejects_overflow() {
        let err = f32::from_field_value(FieldValue::Scalar(Value::Float(1e40))).unwrap_err();
        assert!(matches!(err, CoercionError::OutOfRange { target: "f32", .. }));
        assert_eq!(
            f32::from_field_value(FieldValue::Scalar(Value::Float(1.5))).unwrap(),
            1.5
        );
    }

    #[test]
    fn test_sequence_from_values() {
        let value = FieldValue::Sequence(vec![Value::Integer(2), Value::Integer(3)]);
        assert_eq!(Vec::<i64>::from_field_value(value).unwrap(), vec![2, 3]);

        let single = FieldValue::Scalar(Value::Text("solo".to_string()));
        assert_eq!(Vec::<String>::from_field_value(single).unwrap(), vec!["solo"]);
    }

    #[test]
    fn test_kind_mismatch() {
        let err = bool::from_field_value(FieldValue::Scalar(Value::Integer(1))).unwrap_err();
        assert!(matches!(err, CoercionError::KindMismatch { expected: "boolean", .. }));
    }
}
