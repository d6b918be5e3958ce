//! Derives a [`Schema`] from a record type's field annotations.
//!
//! Annotation grammar, split on the alias delimiter:
//!
//! - `exclude` (or `-`) as the whole annotation drops the field.
//! - A bare token is a header label. The first one is the column's header
//!   name, later ones are aliases accepted while decoding.
//! - `span=N` (N >= 1) sets the number of physical columns of a sequence.
//! - `limit=N` caps emitted cells at N characters; a negative N drops the field.
//!
//! Malformed tokens are ignored, so building never fails on annotation text.

use tracing::debug;

use crate::config::{CodecConfig, DEFAULT_ALIAS_DELIMITER};
use crate::error::Result;
use crate::record::{FieldDef, Record, RecordType};

use super::column::ColumnDescriptor;
use super::Schema;

/// Annotation that removes a field from the schema.
pub const EXCLUDE_ANNOTATION: &str = "exclude";

/// Parsed form of one field annotation.
#[derive(Debug, Default, PartialEq)]
struct Annotation {
    excluded: bool,
    names: Vec<String>,
    span: Option<usize>,
    limit: Option<i64>,
}

fn parse_annotation(text: &str, delimiter: &str) -> Annotation {
    let mut annotation = Annotation::default();

    let whole = text.trim();
    if whole == EXCLUDE_ANNOTATION || whole == "-" {
        annotation.excluded = true;
        return annotation;
    }

    for token in whole.split(delimiter).map(str::trim) {
        if token.is_empty() {
            continue;
        }
        let Some((key, value)) = token.split_once('=') else {
            annotation.names.push(token.to_string());
            continue;
        };
        match key.trim() {
            "span" => {
                if let Ok(n) = value.trim().parse::<usize>() {
                    if n >= 1 {
                        annotation.span = Some(n);
                    }
                }
            }
            "limit" => {
                if let Ok(n) = value.trim().parse::<i64>() {
                    annotation.limit = Some(n);
                }
            }
            _ => {}
        }
    }

    annotation
}

/// Builds schemas from record descriptions.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    alias_delimiter: String,
}

impl SchemaBuilder {
    /// Create a builder using the default alias delimiter.
    pub fn new() -> Self {
        Self {
            alias_delimiter: DEFAULT_ALIAS_DELIMITER.to_string(),
        }
    }

    /// Create a builder using the alias delimiter of a codec configuration.
    pub fn from_config(config: &CodecConfig) -> Self {
        Self {
            alias_delimiter: config.alias_delimiter.clone(),
        }
    }

    /// Set the delimiter splitting annotations into tokens.
    pub fn with_alias_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.alias_delimiter = delimiter.into();
        self
    }

    /// Separator between annotation tokens.
    pub fn alias_delimiter(&self) -> &str {
        &self.alias_delimiter
    }

    /// Build the schema for a record type.
    pub fn build_for<T: Record>(&self) -> Result<Schema> {
        self.build(&T::record_type())
    }

    /// Build the schema for a record description.
    ///
    /// Fails only when the resulting layout is ambiguous, see [`Schema::new`].
    pub fn build(&self, record_type: &RecordType) -> Result<Schema> {
        let columns: Vec<ColumnDescriptor> = record_type
            .fields
            .iter()
            .filter_map(|field| self.describe(field))
            .collect();

        debug!(
            record = %record_type.name,
            fields = record_type.fields.len(),
            columns = columns.len(),
            "built column schema"
        );

        Schema::new(columns)
    }

    fn describe(&self, field: &FieldDef) -> Option<ColumnDescriptor> {
        let annotation = field
            .annotation
            .as_deref()
            .map(|text| parse_annotation(text, &self.alias_delimiter))
            .unwrap_or_default();

        if annotation.excluded {
            return None;
        }

        let limit = match annotation.limit {
            Some(n) if n < 0 => return None,
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
            None => 0,
        };

        let mut names = annotation.names.into_iter();
        let header = names.next().unwrap_or_else(|| field.name.clone());

        Some(
            ColumnDescriptor::new(header, field.name.clone(), field.kind)
                .with_span(annotation.span.unwrap_or(1))
                .with_limit(limit)
                .with_aliases(names.collect())
                .with_width(field.width)
                .excluded(field.transient),
        )
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}
