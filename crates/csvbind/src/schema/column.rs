//! Column descriptor definition.

use serde::{Deserialize, Serialize};

use crate::header::normalize_label;
use crate::value::{Coercion, FieldKind, NumericWidth};

/// How one record field maps onto one or more physical columns.
///
/// A descriptor spans more than one column only when its field is a sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColumnSpec", into = "ColumnSpec")]
pub struct ColumnDescriptor {
    header_name: String,
    aliases: Vec<String>,
    lookup_field: String,
    num_span: usize,
    limit: usize,
    is_excluded: bool,
    kind: FieldKind,
    width: Option<NumericWidth>,
    coercion: Coercion,
}

impl ColumnDescriptor {
    /// Create a single-column, unbounded descriptor.
    pub fn new(header_name: impl Into<String>, lookup_field: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            header_name: header_name.into(),
            aliases: Vec::new(),
            lookup_field: lookup_field.into(),
            num_span: 1,
            limit: 0,
            is_excluded: false,
            kind,
            width: None,
            coercion: Coercion::for_kind(kind.element()),
        }
    }

    /// Number of physical columns. Ignored (kept at 1) for non-sequences.
    pub fn with_span(mut self, num_span: usize) -> Self {
        self.num_span = if self.kind.is_sequence() {
            num_span.max(1)
        } else {
            1
        };
        self
    }

    /// Maximum characters per emitted cell; 0 is unbounded.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Additional header labels accepted while decoding.
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Bound decoded numeric values to `width`.
    pub fn with_width(mut self, width: Option<NumericWidth>) -> Self {
        self.width = width;
        self
    }

    /// Mark the column as never transmitted.
    pub fn excluded(mut self, excluded: bool) -> Self {
        self.is_excluded = excluded;
        self
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn lookup_field(&self) -> &str {
        &self.lookup_field
    }

    pub fn num_span(&self) -> usize {
        self.num_span
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_sequence(&self) -> bool {
        self.kind.is_sequence()
    }

    pub fn is_excluded(&self) -> bool {
        self.is_excluded
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn width(&self) -> Option<NumericWidth> {
        self.width
    }

    /// Parse/format pair for this column's values.
    pub fn coercion(&self) -> &Coercion {
        &self.coercion
    }

    /// Spans more than one physical column.
    pub fn is_multi_span(&self) -> bool {
        self.num_span > 1
    }

    /// Normalized labels this column answers to, header name first.
    pub fn match_labels(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.header_name)
            .chain(self.aliases.iter())
            .map(|label| normalize_label(label))
    }

    /// Truncate `text` to this column's limit, counted in characters.
    pub fn limit_content(&self, mut text: String) -> String {
        if self.limit == 0 {
            return text;
        }
        if let Some((idx, _)) = text.char_indices().nth(self.limit) {
            text.truncate(idx);
        }
        text
    }
}

/// Serialized form of a [`ColumnDescriptor`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnSpec {
    header: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    field: String,
    kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    width: Option<NumericWidth>,
    #[serde(default = "default_span")]
    span: usize,
    #[serde(default)]
    limit: usize,
    #[serde(default)]
    excluded: bool,
}

fn default_span() -> usize {
    1
}

impl From<ColumnSpec> for ColumnDescriptor {
    fn from(spec: ColumnSpec) -> Self {
        ColumnDescriptor::new(spec.header, spec.field, spec.kind)
            .with_span(spec.span)
            .with_limit(spec.limit)
            .with_aliases(spec.aliases)
            .with_width(spec.width)
            .excluded(spec.excluded)
    }
}

impl From<ColumnDescriptor> for ColumnSpec {
    fn from(column: ColumnDescriptor) -> Self {
        Self {
            header: column.header_name,
            aliases: column.aliases,
            field: column.lookup_field,
            kind: column.kind,
            width: column.width,
            span: column.num_span,
            limit: column.limit,
            excluded: column.is_excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ScalarKind;

    #[test]
    fn test_span_forced_to_one_for_scalars() {
        let scalar = ColumnDescriptor::new("age", "Age", FieldKind::Scalar(ScalarKind::Integer))
            .with_span(4);
        assert_eq!(scalar.num_span(), 1);

        let seq = ColumnDescriptor::new("name", "Names", FieldKind::Sequence(ScalarKind::Text))
            .with_span(3);
        assert_eq!(seq.num_span(), 3);
        assert!(seq.is_multi_span());

        let zero = ColumnDescriptor::new("name", "Names", FieldKind::Sequence(ScalarKind::Text))
            .with_span(0);
        assert_eq!(zero.num_span(), 1);
    }

    #[test]
    fn test_limit_counts_characters() {
        let column = ColumnDescriptor::new("d", "D", FieldKind::Scalar(ScalarKind::Text))
            .with_limit(3);
        assert_eq!(column.limit_content("héllo".to_string()), "hél");
        assert_eq!(column.limit_content("ab".to_string()), "ab");

        let unbounded = ColumnDescriptor::new("d", "D", FieldKind::Scalar(ScalarKind::Text));
        assert_eq!(unbounded.limit_content("a".repeat(500)).len(), 500);
    }

    #[test]
    fn test_serde_form() {
        let json = r#"{"header":"tag","field":"Tags","kind":{"sequence":"text"},"span":2}"#;
        let column: ColumnDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(column.header_name(), "tag");
        assert_eq!(column.num_span(), 2);
        assert_eq!(column.limit(), 0);
        assert_eq!(column.coercion().kind(), ScalarKind::Text);

        let back = serde_json::to_value(&column).unwrap();
        assert_eq!(back["field"], "Tags");
        assert!(back.get("aliases").is_none());
        assert!(back.get("width").is_none());
    }

    #[test]
    fn test_serde_keeps_numeric_width() {
        let json = r#"{"header":"qty","field":"Qty","kind":{"scalar":"integer"},"width":"u8"}"#;
        let column: ColumnDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(column.width(), Some(NumericWidth::U8));

        let back = serde_json::to_value(&column).unwrap();
        assert_eq!(back["width"], "u8");
    }

    #[test]
    fn test_match_labels_are_normalized() {
        let column = ColumnDescriptor::new(" Weight KG ", "Weight", FieldKind::Scalar(ScalarKind::Float))
            .with_aliases(vec!["Mass".to_string()]);
        let labels: Vec<String> = column.match_labels().collect();
        assert_eq!(labels, vec!["weight kg", "mass"]);
    }
}
