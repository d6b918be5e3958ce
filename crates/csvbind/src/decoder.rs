//! Row decoder: turns a header row plus data rows into populated records.
//!
//! The first row of a stream names the columns. Every later row is decoded
//! into one record. Structural problems (schema mismatch, wrong cell count)
//! fail the call; cells that do not convert are collected in [`CellErrors`]
//! while the rest of the row is still applied.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::CodecConfig;
use crate::error::{CellErrors, CellParseError, CsvBindError, Result};
use crate::header::HeaderIndex;
use crate::record::{FieldAccessError, Record};
use crate::row::{RawRow, RowSource};
use crate::schema::{ColumnDescriptor, Schema, SchemaCache, SchemaSlot};
use crate::value::{FieldValue, Value};

/// Result of one successful decode call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ReadOutcome {
    /// A row was decoded; carries the cells that failed to convert.
    Row(CellErrors),
    /// The source is exhausted. The record was not touched.
    EndOfStream,
}

impl ReadOutcome {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, ReadOutcome::EndOfStream)
    }

    /// Cell errors of a decoded row, `None` at end of stream.
    pub fn into_errors(self) -> Option<CellErrors> {
        match self {
            ReadOutcome::Row(errors) => Some(errors),
            ReadOutcome::EndOfStream => None,
        }
    }
}

/// Physical positions feeding one schema column.
#[derive(Debug, Clone)]
struct ColumnBinding {
    column: usize,
    positions: Vec<usize>,
}

struct DecoderState<S> {
    source: S,
    config: CodecConfig,
    schema: SchemaSlot,
    header: Option<HeaderIndex>,
    bindings: Vec<ColumnBinding>,
    rows_read: u64,
}

/// Decodes rows from a [`RowSource`] into records.
///
/// All calls on one decoder are serialized by an internal lock; the schema and
/// header are negotiated at most once, on the first call.
pub struct Decoder<S> {
    state: Mutex<DecoderState<S>>,
}

/// Decoder reading CSV text.
pub type CsvDecoder<R> = Decoder<csv::Reader<R>>;

impl<R: io::Read> Decoder<csv::Reader<R>> {
    /// Decode CSV read from `reader`.
    pub fn from_reader(reader: R, config: CodecConfig) -> Result<Self> {
        let source = config.reader_builder().from_reader(reader);
        Self::new(source, config)
    }
}

impl Decoder<csv::Reader<File>> {
    /// Decode a CSV file.
    pub fn from_path(path: impl AsRef<Path>, config: CodecConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CsvBindError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_reader(file, config)
    }
}

impl<S: RowSource> Decoder<S> {
    /// Decode rows from any row source.
    pub fn new(source: S, config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(DecoderState {
                source,
                config,
                schema: SchemaSlot::default(),
                header: None,
                bindings: Vec::new(),
                rows_read: 0,
            }),
        })
    }

    /// Use an explicit schema instead of deriving one from the record type.
    pub fn with_schema(mut self, schema: Arc<Schema>) -> Self {
        self.state.get_mut().schema.set_schema(schema);
        self
    }

    /// Derive schemas through a shared cache.
    pub fn with_schema_cache(mut self, cache: Arc<SchemaCache>) -> Self {
        self.state.get_mut().schema.set_cache(cache);
        self
    }

    /// Decode the next data row into `record`.
    ///
    /// Fields whose column is absent or whose cell is empty are set to their
    /// zero value, as are fields whose cell fails to convert; the latter are
    /// reported in the returned [`CellErrors`].
    pub fn read_record<T: Record + 'static>(&self, record: &mut T) -> Result<ReadOutcome> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let schema = state.schema.resolve::<T>(&state.config)?;
        schema.ensure_fields(record, state.config.skip_excluded)?;

        if state.header.is_none() {
            let Some(row) = state.source.read_row()? else {
                return Ok(ReadOutcome::EndOfStream);
            };
            let header = HeaderIndex::new(&row.cells);
            state.bindings = bind_columns(&schema, &header, state.config.skip_excluded);
            debug!(
                columns = header.width(),
                labels = header.distinct_labels().count(),
                bound = state.bindings.iter().filter(|b| !b.positions.is_empty()).count(),
                "established header row"
            );
            state.header = Some(header);
        }
        let width = state.header.as_ref().map_or(0, HeaderIndex::width);

        let Some(row) = state.source.read_row()? else {
            return Ok(ReadOutcome::EndOfStream);
        };
        state.rows_read += 1;

        if row.cells.len() != width {
            return Err(CsvBindError::RowLengthMismatch {
                line: row.line,
                expected: width,
                found: row.cells.len(),
            });
        }

        let mut errors = CellErrors::new();
        let staged: Vec<(&ColumnBinding, &ColumnDescriptor, FieldValue)> = state
            .bindings
            .iter()
            .map(|binding| {
                let column = &schema.columns()[binding.column];
                let value = decode_column(
                    column,
                    &binding.positions,
                    &row,
                    &state.config.element_delimiter,
                    &mut errors,
                );
                (binding, column, value)
            })
            .collect();

        for (binding, column, value) in staged {
            let err = match record.set_field(column.lookup_field(), value) {
                Ok(()) => continue,
                Err(FieldAccessError::Coercion(err)) => err,
                Err(err @ FieldAccessError::UnknownField(_)) => {
                    return Err(CsvBindError::Schema(err.to_string()));
                }
            };
            errors.push(CellParseError {
                line: row.line,
                column: column.header_name().to_string(),
                field: column.lookup_field().to_string(),
                value: cell_text(&binding.positions, &row, &state.config.element_delimiter),
                message: err.to_string(),
            });
            if let Err(err) = record.set_field(column.lookup_field(), column.kind().zero()) {
                warn!(
                    field = column.lookup_field(),
                    error = %err,
                    "could not reset field to its zero value"
                );
            }
        }

        trace!(line = row.line, errors = errors.len(), "decoded row");
        Ok(ReadOutcome::Row(errors))
    }

    /// Iterate over the remaining rows as freshly defaulted records.
    ///
    /// Rows with the wrong cell count are yielded as errors and iteration
    /// continues; any other error ends the iteration after being yielded.
    pub fn records<T: Record + Default + 'static>(&self) -> Records<'_, S, T> {
        Records {
            decoder: self,
            done: false,
            _record: PhantomData,
        }
    }

    /// Trimmed header labels, once the header row has been read.
    pub fn headers(&self) -> Option<Vec<String>> {
        self.state
            .lock()
            .header
            .as_ref()
            .map(|header| header.labels().to_vec())
    }

    /// Number of data rows consumed, including rejected ones.
    pub fn rows_read(&self) -> u64 {
        self.state.lock().rows_read
    }

    /// The schema in use, once known.
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.state.lock().schema.get()
    }

    /// Give back the row source.
    pub fn into_inner(self) -> S {
        self.state.into_inner().source
    }
}

/// Iterator returned by [`Decoder::records`].
pub struct Records<'a, S, T> {
    decoder: &'a Decoder<S>,
    done: bool,
    _record: PhantomData<fn() -> T>,
}

impl<S: RowSource, T: Record + Default + 'static> Iterator for Records<'_, S, T> {
    type Item = Result<(T, CellErrors)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut record = T::default();
        match self.decoder.read_record(&mut record) {
            Ok(ReadOutcome::Row(errors)) => Some(Ok((record, errors))),
            Ok(ReadOutcome::EndOfStream) => {
                self.done = true;
                None
            }
            Err(err @ CsvBindError::RowLengthMismatch { .. }) => Some(Err(err)),
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// Assign header positions to schema columns.
///
/// Columns sharing a label take that label's positions in schema order: a
/// multi-span column takes up to its span, any other column takes one.
fn bind_columns(schema: &Schema, header: &HeaderIndex, skip_excluded: bool) -> Vec<ColumnBinding> {
    let mut consumed: HashMap<String, usize> = HashMap::new();
    let mut bindings = Vec::with_capacity(schema.len());

    for (idx, column) in schema.columns().iter().enumerate() {
        if skip_excluded && column.is_excluded() {
            continue;
        }
        let wanted = column.num_span();
        let mut positions = Vec::new();

        for label in column.match_labels() {
            let Some(available) = header.positions(&label) else {
                continue;
            };
            let cursor = consumed.entry(label).or_insert(0);
            if *cursor >= available.len() {
                continue;
            }
            let end = (*cursor + wanted).min(available.len());
            positions.extend_from_slice(&available[*cursor..end]);
            *cursor = end;
            break;
        }

        if positions.is_empty() {
            warn!(
                column = column.header_name(),
                field = column.lookup_field(),
                "no header label matches column, field will stay zero-valued"
            );
        }
        bindings.push(ColumnBinding {
            column: idx,
            positions,
        });
    }

    bindings
}

fn decode_column(
    column: &ColumnDescriptor,
    positions: &[usize],
    row: &RawRow,
    element_delimiter: &str,
    errors: &mut CellErrors,
) -> FieldValue {
    let mut cells = positions
        .iter()
        .filter_map(|&p| row.cells.get(p).map(String::as_str));

    if !column.is_sequence() {
        return match cells.next() {
            Some(text) => FieldValue::Scalar(parse_cell(column, text, row.line, errors)),
            None => column.kind().zero(),
        };
    }

    if !column.is_multi_span() {
        return match cells.next() {
            Some(text) if !text.is_empty() => FieldValue::Sequence(
                text.split(element_delimiter)
                    .map(|piece| parse_cell(column, piece, row.line, errors))
                    .collect(),
            ),
            _ => FieldValue::Sequence(Vec::new()),
        };
    }

    let mut texts: Vec<&str> = cells.collect();
    while texts.last().is_some_and(|text| text.is_empty()) {
        texts.pop();
    }
    FieldValue::Sequence(
        texts
            .into_iter()
            .map(|text| parse_cell(column, text, row.line, errors))
            .collect(),
    )
}

/// Text of the cells feeding one column, joined as a single-cell sequence.
fn cell_text(positions: &[usize], row: &RawRow, element_delimiter: &str) -> String {
    positions
        .iter()
        .filter_map(|&p| row.cells.get(p).map(String::as_str))
        .collect::<Vec<_>>()
        .join(element_delimiter)
}

/// Empty text and unconvertible or out-of-range text all yield the zero value;
/// only the latter two are reported.
fn parse_cell(column: &ColumnDescriptor, text: &str, line: u64, errors: &mut CellErrors) -> Value {
    let zero = || column.kind().element().zero();
    if text.is_empty() {
        return zero();
    }
    let parsed = column
        .coercion()
        .parse(text)
        .and_then(|value| match column.width() {
            Some(width) => width.check(&value).map(|()| value),
            None => Ok(value),
        });
    match parsed {
        Ok(value) => value,
        Err(err) => {
            errors.push(CellParseError {
                line,
                column: column.header_name().to_string(),
                field: column.lookup_field().to_string(),
                value: text.to_string(),
                message: err.to_string(),
            });
            zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowBuffer;

    #[derive(Debug, Default, PartialEq)]
    struct Item {
        int: i64,
        text: String,
    }

    crate::record!(Item {
        int => "int",
        text => "string",
    });

    #[derive(Debug, Default, PartialEq)]
    struct Slices {
        name: String,
        strings: Vec<String>,
        ints: Vec<i64>,
    }

    crate::record!(Slices {
        name => "name",
        strings => "str_slice",
        ints => "int_slice",
    });

    fn decoder(data: &str) -> CsvDecoder<&[u8]> {
        Decoder::from_reader(data.as_bytes(), CodecConfig::default()).unwrap()
    }

    #[test]
    fn test_decode_basic_row() {
        let decoder = decoder("int,string\n5,hello\n");
        let mut item = Item::default();

        let outcome = decoder.read_record(&mut item).unwrap();
        assert_eq!(outcome, ReadOutcome::Row(CellErrors::new()));
        assert_eq!(
            item,
            Item {
                int: 5,
                text: "hello".to_string()
            }
        );
        assert_eq!(decoder.headers().unwrap(), vec!["int", "string"]);
        assert_eq!(decoder.rows_read(), 1);
    }

    #[test]
    fn test_end_of_stream_leaves_record_untouched() {
        let decoder = decoder("int,string\n5,hello\n");
        let mut item = Item::default();
        let _ = decoder.read_record(&mut item).unwrap();

        let before = Item {
            int: 5,
            text: "hello".to_string(),
        };
        assert_eq!(item, before);
        assert!(decoder.read_record(&mut item).unwrap().is_end_of_stream());
        assert_eq!(item, before);
    }

    #[test]
    fn test_header_only_stream_is_end_of_stream() {
        let header_only = decoder("int,string\n");
        let mut item = Item::default();
        assert!(header_only.read_record(&mut item).unwrap().is_end_of_stream());
        assert!(header_only.headers().is_some());

        let empty = decoder("");
        assert!(empty.read_record(&mut item).unwrap().is_end_of_stream());
        assert!(empty.headers().is_none());
    }

    #[test]
    fn test_row_length_mismatch_rejects_whole_row() {
        let decoder = decoder("int,string\n7\n8,next\n");
        let mut item = Item {
            int: 1,
            text: "keep".to_string(),
        };

        let err = decoder.read_record(&mut item).unwrap_err();
        assert!(matches!(
            err,
            CsvBindError::RowLengthMismatch {
                line: 2,
                expected: 2,
                found: 1
            }
        ));
        assert_eq!(item.int, 1);
        assert_eq!(item.text, "keep");

        // The stream moved past the rejected row.
        let _ = decoder.read_record(&mut item).unwrap();
        assert_eq!(item.int, 8);
        assert_eq!(decoder.rows_read(), 2);
    }

    #[test]
    fn test_cell_errors_do_not_abort_row() {
        let decoder = decoder("int,string\nabc,still here\n");
        let mut item = Item {
            int: 99,
            text: String::new(),
        };

        let errors = decoder.read_record(&mut item).unwrap().into_errors().unwrap();
        assert_eq!(errors.len(), 1);
        let err = errors.iter().next().unwrap();
        assert_eq!(err.column, "int");
        assert_eq!(err.field, "int");
        assert_eq!(err.value, "abc");
        assert_eq!(err.line, 2);

        assert_eq!(item.int, 0);
        assert_eq!(item.text, "still here");
    }

    #[test]
    fn test_header_matching_ignores_case_and_padding() {
        let decoder = decoder("\u{feff} INT , String\t\n3,x\n");
        let mut item = Item::default();
        let _ = decoder.read_record(&mut item).unwrap();
        assert_eq!(item.int, 3);
        assert_eq!(item.text, "x");
    }

    #[test]
    fn test_missing_column_stays_zero() {
        let decoder = decoder("string,other\nonly text,ignored\n");
        let mut item = Item {
            int: 42,
            text: String::new(),
        };
        let outcome = decoder.read_record(&mut item).unwrap();
        assert_eq!(outcome.into_errors().unwrap().len(), 0);
        assert_eq!(item.int, 0);
        assert_eq!(item.text, "only text");
    }

    #[test]
    fn test_single_cell_sequences() {
        let config = CodecConfig {
            element_delimiter: ":".to_string(),
            ..Default::default()
        };
        let data = "name,str_slice,int_slice\n\
                    hovey,foo:bar:,2:3:5:8:13\n\
                    chen,,1024:\n";
        let decoder = Decoder::from_reader(data.as_bytes(), config).unwrap();

        let rows: Vec<Slices> = decoder
            .records::<Slices>()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].strings, vec!["foo", "bar", ""]);
        assert_eq!(rows[0].ints, vec![2, 3, 5, 8, 13]);
        assert!(rows[1].strings.is_empty());
        assert_eq!(rows[1].ints, vec![1024, 0]);
    }

    #[test]
    fn test_bad_sequence_piece_is_reported() {
        let config = CodecConfig {
            element_delimiter: ":".to_string(),
            ..Default::default()
        };
        let data = "name,str_slice,int_slice\nx,,1:two:3\n";
        let decoder = Decoder::from_reader(data.as_bytes(), config).unwrap();
        let mut slices = Slices::default();

        let errors = decoder.read_record(&mut slices).unwrap().into_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(slices.ints, vec![1, 0, 3]);
    }

    #[derive(Debug, Default)]
    struct Span {
        names: Vec<String>,
        age: i32,
    }

    crate::record!(Span {
        names => "name,span=3",
        age,
    });

    #[test]
    fn test_multi_span_drops_padding() {
        let decoder = decoder("name,name,name,age\na,b,,20\nx,,z,21\n");
        let mut span = Span::default();

        let _ = decoder.read_record(&mut span).unwrap();
        assert_eq!(span.names, vec!["a", "b"]);
        assert_eq!(span.age, 20);

        let _ = decoder.read_record(&mut span).unwrap();
        assert_eq!(span.names, vec!["x", "", "z"]);
    }

    #[test]
    fn test_explicit_schema_must_fit_record() {
        use crate::value::{FieldKind, ScalarKind};

        let schema = Schema::new(vec![ColumnDescriptor::new(
            "code",
            "code",
            FieldKind::Scalar(ScalarKind::Text),
        )])
        .unwrap();
        let decoder = decoder("code\nA1\n").with_schema(Arc::new(schema));
        let mut item = Item::default();

        let err = decoder.read_record(&mut item).unwrap_err();
        assert!(matches!(err, CsvBindError::Schema(_)));
        assert!(decoder.headers().is_none());
    }

    #[derive(Debug, Default, PartialEq)]
    struct Narrow {
        small: u8,
        smalls: Vec<u8>,
    }

    crate::record!(Narrow {
        small => "small",
        smalls => "smalls",
    });

    #[test]
    fn test_out_of_range_cells_are_zeroed_per_piece() {
        let config = CodecConfig {
            element_delimiter: ":".to_string(),
            ..Default::default()
        };
        let decoder = Decoder::from_reader("small,smalls\n300,1:2:999\n".as_bytes(), config).unwrap();
        let mut narrow = Narrow {
            small: 7,
            smalls: vec![42],
        };

        let errors = decoder.read_record(&mut narrow).unwrap().into_errors().unwrap();
        assert_eq!(
            narrow,
            Narrow {
                small: 0,
                smalls: vec![1, 2, 0],
            }
        );
        let reported: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.field.as_str(), e.value.as_str()))
            .collect();
        assert_eq!(reported, vec![("small", "300"), ("smalls", "999")]);
        assert!(errors.iter().all(|e| e.message.contains("out of range for u8")));
    }

    #[test]
    fn test_unbounded_schema_resets_field_on_assignment_failure() {
        use crate::value::{FieldKind, ScalarKind};

        let schema = Schema::new(vec![
            ColumnDescriptor::new("small", "small", FieldKind::Scalar(ScalarKind::Integer)),
            ColumnDescriptor::new("smalls", "smalls", FieldKind::Sequence(ScalarKind::Integer)),
        ])
        .unwrap();
        let config = CodecConfig {
            element_delimiter: ":".to_string(),
            ..Default::default()
        };
        let decoder = Decoder::from_reader("small,smalls\n300,1:999\n".as_bytes(), config)
            .unwrap()
            .with_schema(Arc::new(schema));
        let mut narrow = Narrow {
            small: 7,
            smalls: vec![42],
        };

        let errors = decoder.read_record(&mut narrow).unwrap().into_errors().unwrap();
        assert_eq!(narrow, Narrow::default());
        let values: Vec<&str> = errors.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["300", "1:999"]);
    }

    #[test]
    fn test_decode_from_row_buffer() {
        let rows: RowBuffer = vec![vec!["int", "string"], vec!["12", "buffered"]]
            .into_iter()
            .collect();
        let decoder = Decoder::new(rows, CodecConfig::default()).unwrap();
        let mut item = Item::default();
        let _ = decoder.read_record(&mut item).unwrap();
        assert_eq!(item.int, 12);
        assert!(decoder.into_inner().is_empty());
    }
}
