//! Row-level collaborators: where the decoder reads rows from and where the
//! encoder writes them to. Tokenizing and quoting are left to the `csv` crate.

use std::collections::VecDeque;
use std::io::{self, Write};

use crate::error::Result;

/// UTF-8 byte-order mark.
pub const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];

/// One physical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line the row starts on, when known.
    pub line: u64,
    pub cells: Vec<String>,
}

/// Supplies rows to a decoder.
pub trait RowSource {
    /// Next row, or `None` once the source is exhausted.
    fn read_row(&mut self) -> Result<Option<RawRow>>;
}

/// Accepts rows from an encoder.
pub trait RowSink {
    /// Write a byte-order mark. Called at most once, before the first row.
    fn write_bom(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_row(&mut self, cells: &[String]) -> Result<()>;

    /// Push buffered rows to the underlying output.
    fn flush(&mut self) -> Result<()>;
}

impl<R: io::Read> RowSource for csv::Reader<R> {
    fn read_row(&mut self) -> Result<Option<RawRow>> {
        let mut record = csv::StringRecord::new();
        if !self.read_record(&mut record)? {
            return Ok(None);
        }
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        Ok(Some(RawRow {
            line,
            cells: record.iter().map(str::to_string).collect(),
        }))
    }
}

/// CSV output that can emit a byte-order mark ahead of the first record.
///
/// The `csv::Writer` is created lazily so raw bytes can still be written to
/// the underlying output before any record.
pub struct CsvSink<W: Write> {
    builder: csv::WriterBuilder,
    raw: Option<W>,
    writer: Option<csv::Writer<W>>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(output: W, builder: csv::WriterBuilder) -> Self {
        Self {
            builder,
            raw: Some(output),
            writer: None,
        }
    }

    /// Flush and return the underlying output.
    pub fn into_inner(self) -> Result<W> {
        if let Some(writer) = self.writer {
            return writer
                .into_inner()
                .map_err(|e| csv::Error::from(e.into_error()).into());
        }
        self.raw
            .ok_or_else(|| csv::Error::from(io::Error::other("csv output already taken")).into())
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_bom(&mut self) -> Result<()> {
        // Once rows went out a mark would land mid-stream.
        if let Some(raw) = self.raw.as_mut() {
            raw.write_all(BOM_UTF8).map_err(csv::Error::from)?;
        }
        Ok(())
    }

    fn write_row(&mut self, cells: &[String]) -> Result<()> {
        if let Some(raw) = self.raw.take() {
            self.writer = Some(self.builder.from_writer(raw));
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write_record(cells)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush().map_err(csv::Error::from)?,
            None => {
                if let Some(raw) = self.raw.as_mut() {
                    raw.flush().map_err(csv::Error::from)?;
                }
            }
        }
        Ok(())
    }
}

/// In-memory rows, usable as both source and sink.
///
/// Handy when rows are tokenized elsewhere or for moving rows between an
/// encoder and a decoder without a byte stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowBuffer {
    rows: VecDeque<Vec<String>>,
    read: u64,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push_back(row);
    }

    /// Rows not yet read.
    pub fn rows(&self) -> impl Iterator<Item = &Vec<String>> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<S: Into<String>> FromIterator<Vec<S>> for RowBuffer {
    fn from_iter<I: IntoIterator<Item = Vec<S>>>(iter: I) -> Self {
        Self {
            rows: iter
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
            read: 0,
        }
    }
}

impl RowSource for RowBuffer {
    fn read_row(&mut self) -> Result<Option<RawRow>> {
        Ok(self.rows.pop_front().map(|cells| {
            self.read += 1;
            RawRow {
                line: self.read,
                cells,
            }
        }))
    }
}

impl RowSink for RowBuffer {
    fn write_row(&mut self, cells: &[String]) -> Result<()> {
        self.rows.push_back(cells.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_csv_reader_source_is_flexible() {
        let data = "a,b,c\n1,2\n";
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data.as_bytes());

        let header = reader.read_row().unwrap().unwrap();
        assert_eq!(header.cells, cells(&["a", "b", "c"]));
        assert_eq!(header.line, 1);

        let short = reader.read_row().unwrap().unwrap();
        assert_eq!(short.cells, cells(&["1", "2"]));
        assert_eq!(short.line, 2);

        assert!(reader.read_row().unwrap().is_none());
    }

    #[test]
    fn test_csv_sink_bom_precedes_rows() {
        let mut sink = CsvSink::new(Vec::new(), csv::WriterBuilder::new());
        sink.write_bom().unwrap();
        sink.write_row(&cells(&["x", "y,z"])).unwrap();
        let bytes = sink.into_inner().unwrap();

        assert!(bytes.starts_with(BOM_UTF8));
        assert_eq!(&bytes[3..], b"x,\"y,z\"\n");
    }

    #[test]
    fn test_csv_sink_quotes_like_csv() {
        let mut sink = CsvSink::new(Vec::new(), csv::WriterBuilder::new());
        sink.write_row(&cells(&["say \"hi\"", "two\nlines", "plain"])).unwrap();
        let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(text, "\"say \"\"hi\"\"\",\"two\nlines\",plain\n");
    }

    #[test]
    fn test_row_buffer_round_trip() {
        let mut buffer: RowBuffer = vec![vec!["h"], vec!["1"]].into_iter().collect();
        buffer.write_row(&cells(&["2"])).unwrap();
        assert_eq!(buffer.len(), 3);

        let lines: Vec<u64> = std::iter::from_fn(|| buffer.read_row().unwrap())
            .map(|row| row.line)
            .collect();
        assert_eq!(lines, vec![1, 2, 3]);
        assert!(buffer.is_empty());
    }
}
