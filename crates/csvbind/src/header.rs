//! Header row handling: label normalization and the per-stream label index.

use indexmap::IndexMap;

const BOM: char = '\u{feff}';

/// Characters stripped from both ends of a header label.
fn is_ignorable(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(c, BOM | '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{2060}')
}

/// Trim whitespace and non-printable characters from a label.
pub fn trim_label(label: &str) -> &str {
    label.trim_matches(is_ignorable)
}

/// Canonical form used for case-insensitive header matching.
pub fn normalize_label(label: &str) -> String {
    trim_label(label).to_lowercase()
}

/// Mapping from each header label to the physical positions carrying it.
///
/// Built once from the first row of a stream.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    labels: Vec<String>,
    positions: IndexMap<String, Vec<usize>>,
}

impl HeaderIndex {
    /// Index a header row. A leading byte-order mark is dropped.
    pub fn new(row: &[String]) -> Self {
        let labels: Vec<String> = row
            .iter()
            .map(|cell| trim_label(cell).to_string())
            .collect();

        let mut positions: IndexMap<String, Vec<usize>> = IndexMap::new();
        for (idx, label) in labels.iter().enumerate() {
            positions
                .entry(label.to_lowercase())
                .or_default()
                .push(idx);
        }

        Self { labels, positions }
    }

    /// Trimmed header labels in physical order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of physical columns.
    pub fn width(&self) -> usize {
        self.labels.len()
    }

    /// Positions carrying a normalized label, in physical order.
    pub fn positions(&self, normalized: &str) -> Option<&[usize]> {
        self.positions.get(normalized).map(Vec::as_slice)
    }

    /// Distinct normalized labels in first-appearance order.
    pub fn distinct_labels(&self) -> impl Iterator<Item = &str> {
        self.positions.keys().map(String::as_str)
    }
}
