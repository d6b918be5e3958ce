//! Column schema: the ordered descriptor list shared by decoder and encoder.

mod builder;
mod cache;
mod column;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CsvBindError, Result};
use crate::record::Record;

pub use builder::{SchemaBuilder, EXCLUDE_ANNOTATION};
pub use cache::SchemaCache;
pub(crate) use cache::SchemaSlot;
pub use column::ColumnDescriptor;

/// Ordered column descriptors, one per eligible field.
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ColumnDescriptor>", into = "Vec<ColumnDescriptor>")]
pub struct Schema {
    columns: Vec<ColumnDescriptor>,
}

impl Schema {
    /// Validate an explicit layout.
    ///
    /// A header label (name or alias, compared case-insensitively) may not be
    /// claimed by both a scalar column and a multi-span sequence column.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        #[derive(Default)]
        struct Claims {
            scalar: bool,
            multi_span: bool,
        }

        let mut claims: HashMap<String, Claims> = HashMap::new();
        for column in &columns {
            for label in column.match_labels() {
                let claim = claims.entry(label).or_default();
                if column.is_sequence() {
                    claim.multi_span |= column.is_multi_span();
                } else {
                    claim.scalar = true;
                }
                if claim.scalar && claim.multi_span {
                    return Err(CsvBindError::ConflictingColumn {
                        header: column.header_name().to_string(),
                    });
                }
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns that take part in transmission.
    pub fn active(&self, skip_excluded: bool) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns
            .iter()
            .filter(move |column| !(skip_excluded && column.is_excluded()))
    }

    /// Header row as emitted by the encoder: each header name repeated once
    /// per spanned column.
    pub fn header_row(&self, skip_excluded: bool) -> Vec<String> {
        self.active(skip_excluded)
            .flat_map(|column| {
                std::iter::repeat(column.header_name().to_string()).take(column.num_span())
            })
            .collect()
    }

    /// Number of physical columns in the emitted layout.
    pub fn width(&self, skip_excluded: bool) -> usize {
        self.active(skip_excluded).map(ColumnDescriptor::num_span).sum()
    }

    /// Check that `record` has every field the active columns refer to.
    pub fn ensure_fields<T: Record + ?Sized>(&self, record: &T, skip_excluded: bool) -> Result<()> {
        match self
            .active(skip_excluded)
            .find(|column| !record.has_field(column.lookup_field()))
        {
            Some(column) => Err(CsvBindError::Schema(format!(
                "column '{}' refers to field '{}', which the record does not have",
                column.header_name(),
                column.lookup_field()
            ))),
            None => Ok(()),
        }
    }

    /// Parse a schema from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Render the schema as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a schema stored as JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CsvBindError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Store the schema as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| CsvBindError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

impl TryFrom<Vec<ColumnDescriptor>> for Schema {
    type Error = CsvBindError;

    fn try_from(columns: Vec<ColumnDescriptor>) -> Result<Self> {
        Schema::new(columns)
    }
}

impl From<Schema> for Vec<ColumnDescriptor> {
    fn from(schema: Schema) -> Self {
        schema.columns
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FieldKind, ScalarKind};

    const TEXT: FieldKind = FieldKind::Scalar(ScalarKind::Text);
    const TEXTS: FieldKind = FieldKind::Sequence(ScalarKind::Text);

    #[test]
    fn test_header_row_repeats_spans() {
        let schema = Schema::new(vec![
            ColumnDescriptor::new("name", "Names", TEXTS).with_span(3),
            ColumnDescriptor::new("departs", "Departs", TEXTS),
            ColumnDescriptor::new("age", "Age", TEXT),
            ColumnDescriptor::new("absent", "Absent", TEXT).excluded(true),
        ])
        .unwrap();

        assert_eq!(
            schema.header_row(true),
            vec!["name", "name", "name", "departs", "age"]
        );
        assert_eq!(schema.width(true), 5);
        assert_eq!(schema.width(false), 6);
        assert_eq!(schema.header_row(false).last().unwrap(), "absent");
    }

    #[test]
    fn test_scalar_and_multi_span_conflict() {
        let result = Schema::new(vec![
            ColumnDescriptor::new("Code", "Code", TEXT),
            ColumnDescriptor::new("code", "Codes", TEXTS).with_span(2),
        ]);
        assert!(matches!(
            result,
            Err(CsvBindError::ConflictingColumn { ref header }) if header == "code"
        ));
    }

    #[test]
    fn test_alias_conflict_is_detected() {
        let result = Schema::new(vec![
            ColumnDescriptor::new("tag", "Tags", TEXTS).with_span(2),
            ColumnDescriptor::new("label", "Label", TEXT).with_aliases(vec!["TAG".to_string()]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_shared_labels_without_multi_span_are_allowed() {
        let schema = Schema::new(vec![
            ColumnDescriptor::new("code", "Primary", TEXT),
            ColumnDescriptor::new("code", "Secondary", TEXT),
            ColumnDescriptor::new("code", "All", TEXTS),
        ]);
        assert!(schema.is_ok());
    }

    #[test]
    fn test_json_round_trip_validates() {
        let schema = Schema::new(vec![
            ColumnDescriptor::new("name", "Names", TEXTS).with_span(2).with_limit(8),
        ])
        .unwrap();
        let json = schema.to_json_string().unwrap();
        assert_eq!(Schema::from_json_str(&json).unwrap(), schema);

        let conflicting = r#"[
            {"header": "x", "field": "A", "kind": {"scalar": "text"}},
            {"header": "x", "field": "B", "kind": {"sequence": "text"}, "span": 2}
        ]"#;
        assert!(Schema::from_json_str(conflicting).is_err());
    }
}
