//! Codec configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CsvBindError, Result};

/// Default delimiter joining sequence elements that share one cell.
pub const DEFAULT_ELEMENT_DELIMITER: &str = "\n";

/// Default delimiter splitting a field annotation into tokens.
pub const DEFAULT_ALIAS_DELIMITER: &str = ",";

/// Options shared by the decoder, the encoder, and the schema builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Joins/splits sequence elements stored in a single cell.
    pub element_delimiter: String,
    /// Splits a field annotation into names and `key=value` options.
    pub alias_delimiter: String,
    /// Omit columns of transient fields from header and data rows.
    pub skip_excluded: bool,
    /// Prefix the output with a UTF-8 byte-order mark.
    pub emit_bom: bool,
    /// Field separator of the row format.
    pub separator: char,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            element_delimiter: DEFAULT_ELEMENT_DELIMITER.to_string(),
            alias_delimiter: DEFAULT_ALIAS_DELIMITER.to_string(),
            skip_excluded: true,
            emit_bom: true,
            separator: ',',
        }
    }
}

impl CodecConfig {
    /// Parse a configuration from JSON; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CodecConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the options describe a usable codec.
    pub fn validate(&self) -> Result<()> {
        if self.element_delimiter.is_empty() {
            return Err(CsvBindError::Config(
                "element delimiter must not be empty".to_string(),
            ));
        }
        if self.alias_delimiter.is_empty() {
            return Err(CsvBindError::Config(
                "alias delimiter must not be empty".to_string(),
            ));
        }
        let control = self.separator.is_ascii_control() && self.separator != '\t';
        if !self.separator.is_ascii() || control || self.separator == '"' {
            return Err(CsvBindError::Config(format!(
                "separator must be a printable ASCII character or tab other than '\"', got {:?}",
                self.separator
            )));
        }
        Ok(())
    }

    pub(crate) fn separator_byte(&self) -> u8 {
        self.separator as u8
    }

    /// Reader settings: header and row lengths are handled by the decoder.
    pub(crate) fn reader_builder(&self) -> csv::ReaderBuilder {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.separator_byte())
            .has_headers(false)
            .flexible(true);
        builder
    }

    pub(crate) fn writer_builder(&self) -> csv::WriterBuilder {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(self.separator_byte()).has_headers(false);
        builder
    }
}
