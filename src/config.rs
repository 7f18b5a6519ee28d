//! Session configuration
//!
//! Options applied uniformly to decode and encode sessions. The struct is
//! serde-deserializable so that embedding applications can load it from their
//! own configuration files.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Line Ending
// ============================================================================

/// Record terminator used when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineEnding {
    /// `\n`
    #[default]
    #[serde(rename = "LF")]
    Lf,
    /// `\r\n`
    #[serde(rename = "CRLF")]
    Crlf,
}

impl LineEnding {
    fn terminator(self) -> csv::Terminator {
        match self {
            LineEnding::Lf => csv::Terminator::Any(b'\n'),
            LineEnding::Crlf => csv::Terminator::CRLF,
        }
    }
}

// ============================================================================
// CSV Options
// ============================================================================

/// Options for a decode or encode session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field delimiter (default: comma)
    pub delimiter: char,

    /// Line ending for written records (default: LF)
    pub line_ending: LineEnding,

    /// Whether a header line is read/written (default: true)
    pub header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            line_ending: LineEnding::default(),
            header: true,
        }
    }
}

impl CsvOptions {
    /// Create options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the field delimiter
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the line ending
    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Use `\r\n` line endings
    #[must_use]
    pub fn crlf(self) -> Self {
        self.with_line_ending(LineEnding::Crlf)
    }

    /// Enable or disable the header line
    #[must_use]
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Disable the header line
    #[must_use]
    pub fn without_header(self) -> Self {
        self.with_header(false)
    }

    /// Check that the options can drive the underlying CSV reader/writer
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte().map(|_| ())
    }

    /// The delimiter as a single byte
    fn delimiter_byte(&self) -> Result<u8> {
        let delimiter = self.delimiter;
        if !delimiter.is_ascii() {
            return Err(Error::config(format!(
                "delimiter {delimiter:?} must be a single ASCII character"
            )));
        }
        if matches!(delimiter, '"' | '\r' | '\n') {
            return Err(Error::config(format!(
                "delimiter {delimiter:?} conflicts with quoting or line endings"
            )));
        }
        Ok(delimiter as u8)
    }

    /// Build a reader that yields every line as a raw record.
    ///
    /// Header handling is done by the session, so the csv-level header is
    /// always off. Records may be shorter or longer than the schema.
    pub(crate) fn reader_builder(&self) -> Result<csv::ReaderBuilder> {
        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.delimiter_byte()?)
            .has_headers(false)
            .flexible(true);
        Ok(builder)
    }

    pub(crate) fn writer_builder(&self) -> Result<csv::WriterBuilder> {
        let mut builder = csv::WriterBuilder::new();
        builder
            .delimiter(self.delimiter_byte()?)
            .terminator(self.line_ending.terminator())
            .has_headers(false);
        Ok(builder)
    }
}
