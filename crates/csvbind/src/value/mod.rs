//! Field kinds, typed values, and text coercion.

mod coerce;
mod field;
mod types;

pub use coerce::{Coercion, CoercionError, FormatFn, ParseFn};
pub use field::{kind_of, width_of, CsvField, ScalarField};
pub use types::{FieldKind, FieldValue, NumericWidth, ScalarKind, Value};
