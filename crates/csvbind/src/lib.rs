//! csvbind: map CSV rows to typed records and back.
//!
//! The column layout is declared once per record type through short field
//! annotations, then reused for every row in both directions.
//!
//! # Annotations
//!
//! - `"weight"`: column header name (matching ignores case and padding).
//! - `"weight,mass"`: extra names accepted while decoding.
//! - `"name,span=3"`: a sequence field spread over three columns.
//! - `"note,limit=40"`: cells cut to 40 characters when encoding.
//! - `"exclude"`: the field never becomes a column.
//!
//! # Example
//!
//! ```
//! use csvbind::{record, CodecConfig, Decoder, Encoder};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Shipment {
//!     id: i64,
//!     items: Vec<String>,
//!     weight: f64,
//! }
//!
//! record!(Shipment {
//!     id => "shipment_id",
//!     items => "item,span=2",
//!     weight => "weight kg",
//! });
//!
//! let config = CodecConfig { emit_bom: false, ..Default::default() };
//!
//! let encoder = Encoder::from_writer(Vec::new(), config.clone())?;
//! encoder.encode(&Shipment { id: 7, items: vec!["bolts".into()], weight: 1.5 })?;
//! let bytes = encoder.finish()?;
//! assert_eq!(bytes, b"shipment_id,item,item,weight kg\n7,bolts,,1.5\n");
//!
//! let decoder = Decoder::from_reader(bytes.as_slice(), config)?;
//! let mut shipment = Shipment::default();
//! let errors = decoder.read_record(&mut shipment)?.into_errors().unwrap_or_default();
//! assert!(errors.is_empty());
//! assert_eq!(shipment.items, vec!["bolts"]);
//! # Ok::<(), csvbind::CsvBindError>(())
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod header;
pub mod record;
pub mod row;
pub mod schema;
pub mod value;

pub use config::CodecConfig;
pub use decoder::{CsvDecoder, Decoder, ReadOutcome, Records};
pub use encoder::{CsvEncoder, Encoder};
pub use error::{CellErrors, CellParseError, CsvBindError, Result};
pub use record::{FieldAccessError, FieldDef, Record, RecordType};
pub use row::{CsvSink, RawRow, RowBuffer, RowSink, RowSource};
pub use schema::{ColumnDescriptor, Schema, SchemaBuilder, SchemaCache};
pub use value::{CsvField, FieldKind, FieldValue, NumericWidth, ScalarKind, Value};
