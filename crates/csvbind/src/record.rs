//! Record type descriptions and field access.
//!
//! A [`Record`] describes its fields once (name, kind, annotation) and gives the
//! codec by-name access to their values. The [`record!`](crate::record) macro
//! writes the implementation for a plain struct.

use thiserror::Error;

use crate::value::{CoercionError, FieldKind, FieldValue, NumericWidth};

/// Description of one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    /// Field name as declared on the record.
    pub name: String,
    /// Declared kind.
    pub kind: FieldKind,
    /// Width bounding numeric values, checked per cell while decoding.
    pub width: Option<NumericWidth>,
    /// Column annotation, e.g. `"name,span=3"`.
    pub annotation: Option<String>,
    /// Field must never be transmitted (subject to the skip-excluded option).
    pub transient: bool,
}

impl FieldDef {
    /// Create an unannotated field description.
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            width: None,
            annotation: None,
            transient: false,
        }
    }

    /// Bound numeric values to `width`.
    pub fn with_width(mut self, width: Option<NumericWidth>) -> Self {
        self.width = width;
        self
    }

    /// Attach a column annotation.
    pub fn annotated(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Mark the field as never transmitted.
    pub fn transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }
}

/// Ordered field descriptions of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Look up a field description by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Failure writing a field through [`Record::set_field`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldAccessError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

/// A typed record the codec can read from and write into.
pub trait Record {
    /// Describe the record's fields in declaration order.
    fn record_type() -> RecordType
    where
        Self: Sized;

    /// Whether a field with this name exists.
    fn has_field(&self, name: &str) -> bool;

    /// Current value of a field.
    fn field(&self, name: &str) -> Option<FieldValue>;

    /// Replace the value of a field.
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldAccessError>;
}

/// Implement [`Record`] for a struct.
///
/// Each entry names a field, optionally followed by `=> "annotation"` and
/// `as transient`:
///
/// ```
/// use csvbind::record;
///
/// #[derive(Debug, Default)]
/// struct Product {
///     id: i64,
///     name: String,
///     tags: Vec<String>,
///     cost: f64,
///     scratch: String,
/// }
///
/// record!(Product {
///     id => "product_id",
///     name,
///     tags => "tag,span=3",
///     cost => "cost" as transient,
///     scratch => "exclude",
/// });
/// ```
#[macro_export]
macro_rules! record {
    ($name:ident { $( $field:ident $(=> $annotation:literal)? $(as $marker:ident)? ),+ $(,)? }) => {
        impl $crate::Record for $name {
            fn record_type() -> $crate::RecordType {
                $crate::RecordType::new(
                    stringify!($name),
                    vec![$(
                        $crate::FieldDef::new(
                            stringify!($field),
                            $crate::value::kind_of(|record: &$name| &record.$field),
                        )
                        .with_width($crate::value::width_of(|record: &$name| &record.$field))
                        $(.annotated($annotation))?
                        $(.transient($crate::__transient_marker!($marker)))?
                    ),+],
                )
            }

            fn has_field(&self, name: &str) -> bool {
                match name {
                    $(stringify!($field) => true,)+
                    _ => false,
                }
            }

            fn field(&self, name: &str) -> Option<$crate::value::FieldValue> {
                match name {
                    $(stringify!($field) => Some($crate::value::CsvField::to_field_value(&self.$field)),)+
                    _ => None,
                }
            }

            fn set_field(
                &mut self,
                name: &str,
                value: $crate::value::FieldValue,
            ) -> ::std::result::Result<(), $crate::FieldAccessError> {
                match name {
                    $(stringify!($field) => {
                        self.$field = $crate::value::CsvField::from_field_value(value)?;
                        Ok(())
                    })+
                    _ => Err($crate::FieldAccessError::UnknownField(name.to_string())),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __transient_marker {
    (transient) => {
        true
    };
}
