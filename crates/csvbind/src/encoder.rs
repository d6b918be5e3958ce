//! Row encoder: writes a header row once, then one row per record.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CodecConfig;
use crate::error::{CsvBindError, Result};
use crate::record::Record;
use crate::row::{CsvSink, RowSink};
use crate::schema::{ColumnDescriptor, Schema, SchemaCache, SchemaSlot};
use crate::value::FieldValue;

struct EncoderState<S> {
    sink: S,
    config: CodecConfig,
    schema: SchemaSlot,
    header_written: bool,
    rows_written: u64,
}

/// Encodes records into rows of a [`RowSink`].
///
/// All calls on one encoder are serialized by an internal lock. The header
/// row is emitted by the first [`encode`](Encoder::encode) call and never
/// again.
pub struct Encoder<S> {
    state: Mutex<EncoderState<S>>,
}

/// Encoder writing CSV text.
pub type CsvEncoder<W> = Encoder<CsvSink<W>>;

impl<W: Write> Encoder<CsvSink<W>> {
    /// Encode CSV into `writer`.
    pub fn from_writer(writer: W, config: CodecConfig) -> Result<Self> {
        config.validate()?;
        let sink = CsvSink::new(writer, config.writer_builder());
        Self::new(sink, config)
    }

    /// Flush everything and return the underlying writer.
    pub fn finish(self) -> Result<W> {
        let mut sink = self.state.into_inner().sink;
        sink.flush()?;
        sink.into_inner()
    }
}

impl Encoder<CsvSink<File>> {
    /// Encode into a newly created (or truncated) CSV file.
    pub fn create(path: impl AsRef<Path>, config: CodecConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CsvBindError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_writer(file, config)
    }
}

impl<S: RowSink> Encoder<S> {
    /// Encode into any row sink.
    pub fn new(sink: S, config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: Mutex::new(EncoderState {
                sink,
                config,
                schema: SchemaSlot::default(),
                header_written: false,
                rows_written: 0,
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

    /// Write one record, preceded by the header row on the first call.
    pub fn encode<T: Record + 'static>(&self, record: &T) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let schema = state.schema.resolve::<T>(&state.config)?;
        let skip_excluded = state.config.skip_excluded;
        schema.ensure_fields(record, skip_excluded)?;

        if !state.header_written {
            state.header_written = true;
            if state.config.emit_bom {
                state.sink.write_bom()?;
            }
            let header = schema.header_row(skip_excluded);
            state.sink.write_row(&header)?;
            debug!(columns = header.len(), "wrote header row");
        }

        let mut row = Vec::with_capacity(schema.width(skip_excluded));
        for column in schema.active(skip_excluded) {
            let value = record
                .field(column.lookup_field())
                .unwrap_or_else(|| column.kind().zero());
            render_column(column, &value, &state.config.element_delimiter, &mut row);
        }
        state.sink.write_row(&row)?;
        state.rows_written += 1;

        trace!(row = state.rows_written, cells = row.len(), "encoded row");
        Ok(())
    }

    /// Write every record of `records`, stopping at the first error.
    pub fn encode_all<'a, T, I>(&self, records: I) -> Result<u64>
    where
        T: Record + 'static,
        I: IntoIterator<Item = &'a T>,
    {
        let mut count = 0;
        for record in records {
            self.encode(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Push buffered rows to the output.
    pub fn flush(&self) -> Result<()> {
        self.state.lock().sink.flush()
    }

    /// Flush, reporting any write error the buffered rows run into.
    pub fn close(&self) -> Result<()> {
        self.flush()
    }

    /// Number of data rows written.
    pub fn rows_written(&self) -> u64 {
        self.state.lock().rows_written
    }

    /// The schema in use, once known.
    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.state.lock().schema.get()
    }

    /// Give back the row sink without flushing.
    pub fn into_inner(self) -> S {
        self.state.into_inner().sink
    }
}

/// Append the cells of one column to `out`.
///
/// Single-cell columns join sequence elements with `element_delimiter`;
/// multi-span columns emit exactly `num_span` cells, padding with empty cells
/// or dropping excess elements. Each cell is cut to the column limit.
fn render_column(
    column: &ColumnDescriptor,
    value: &FieldValue,
    element_delimiter: &str,
    out: &mut Vec<String>,
) {
    let coercion = column.coercion();
    let texts: Vec<String> = match value {
        FieldValue::Scalar(v) => vec![coercion.format(v)],
        FieldValue::Sequence(values) => values.iter().map(|v| coercion.format(v)).collect(),
    };

    if !column.is_multi_span() {
        out.push(column.limit_content(texts.join(element_delimiter)));
        return;
    }

    out.extend(
        texts
            .into_iter()
            .chain(std::iter::repeat_with(String::new))
            .take(column.num_span())
            .map(|text| column.limit_content(text)),
    );
}
