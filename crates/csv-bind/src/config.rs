//! CSV configuration options

use crate::errors::{CsvBindError, CsvBindResult};
use serde::{Deserialize, Serialize};

/// Configuration for CSV reading and writing.
///
/// An immutable value: every builder method consumes the config and returns
/// an updated copy, so a reader or writer can swap in a new config between
/// calls without affecting one that is already in use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvConfig {
    /// Field separator character (default: comma)
    pub separator: char,
    /// Quote character for writing; `None` writes fields unquoted. Reading
    /// falls back to `"` when unset (default: none)
    pub quote_char: Option<char>,
    /// Escape character for embedded quotes; `None` doubles them (default: none)
    pub escape_char: Option<char>,
    /// Row terminator used when writing (default: `\n`)
    pub line_end: String,
    /// Whether the CSV has a header row (default: true)
    pub has_header: bool,
    /// Physical lines discarded before the header or first row (default: 0)
    pub skip_lines: usize,
    /// Drop characters outside quotes when reading (default: false)
    pub strict_quotes: bool,
    /// Trim leading whitespace of each field when reading (default: false)
    pub ignore_leading_white_space: bool,
    /// Skip rows whose fields are all blank (default: false)
    pub ignore_empty_lines: bool,
    /// Treat quote characters as plain text when reading (default: false)
    pub ignore_quotations: bool,
    /// Preserve source order in results (default: true)
    pub ordered_results: bool,
    /// Abort on the first row failure instead of skipping it (default: true)
    pub throws_exceptions: bool,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            separator: ',',
            quote_char: None,
            escape_char: None,
            line_end: "\n".to_string(),
            has_header: true,
            skip_lines: 0,
            strict_quotes: false,
            ignore_leading_white_space: false,
            ignore_empty_lines: false,
            ignore_quotations: false,
            ordered_results: true,
            throws_exceptions: true,
        }
    }
}

impl CsvConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the separator character
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Set the quote character
    pub fn quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = Some(quote_char);
        self
    }

    /// Disable quoting
    pub fn without_quotes(mut self) -> Self {
        self.quote_char = None;
        self
    }

    /// Set the escape character
    pub fn escape_char(mut self, escape_char: char) -> Self {
        self.escape_char = Some(escape_char);
        self
    }

    /// Set the row terminator
    pub fn line_end(mut self, line_end: impl Into<String>) -> Self {
        self.line_end = line_end.into();
        self
    }

    /// Configure header presence
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Disable header row
    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    /// Set the number of leading lines to skip
    pub fn skip_lines(mut self, skip_lines: usize) -> Self {
        self.skip_lines = skip_lines;
        self
    }

    /// Configure strict quote handling
    pub fn strict_quotes(mut self, strict_quotes: bool) -> Self {
        self.strict_quotes = strict_quotes;
        self
    }

    /// Configure trimming of leading whitespace
    pub fn ignore_leading_white_space(mut self, ignore: bool) -> Self {
        self.ignore_leading_white_space = ignore;
        self
    }

    /// Configure skipping of blank rows
    pub fn ignore_empty_lines(mut self, ignore: bool) -> Self {
        self.ignore_empty_lines = ignore;
        self
    }

    /// Configure whether quote characters are treated as plain text
    pub fn ignore_quotations(mut self, ignore: bool) -> Self {
        self.ignore_quotations = ignore;
        self
    }

    /// Configure result ordering
    pub fn ordered_results(mut self, ordered: bool) -> Self {
        self.ordered_results = ordered;
        self
    }

    /// Configure whether row failures abort the read
    pub fn throws_exceptions(mut self, throws: bool) -> Self {
        self.throws_exceptions = throws;
        self
    }

    /// Convert separator to u8 for csv crate
    pub fn separator_u8(&self) -> CsvBindResult<u8> {
        single_byte("separator", self.separator)
    }

    /// Convert quote char to u8 for csv crate
    pub fn quote_char_u8(&self) -> CsvBindResult<Option<u8>> {
        self.quote_char
            .map(|c| single_byte("quote character", c))
            .transpose()
    }

    /// Get escape character as u8
    pub fn escape_char_u8(&self) -> CsvBindResult<Option<u8>> {
        self.escape_char
            .map(|c| single_byte("escape character", c))
            .transpose()
    }

    /// Get the row terminator for the csv writer
    pub fn terminator(&self) -> CsvBindResult<csv::Terminator> {
        match self.line_end.as_str() {
            "\r\n" => Ok(csv::Terminator::CRLF),
            "\n" => Ok(csv::Terminator::Any(b'\n')),
            "\r" => Ok(csv::Terminator::Any(b'\r')),
            other => Err(CsvBindError::config(format!(
                "unsupported line end {other:?}; expected \"\\n\", \"\\r\" or \"\\r\\n\""
            ))),
        }
    }

    /// Quote character recognized when reading
    pub fn read_quote_char(&self) -> char {
        self.quote_char.unwrap_or(DEFAULT_READ_QUOTE)
    }

    /// Whether the reader tokenizer should honor quotes
    pub fn reads_quoted(&self) -> bool {
        !self.ignore_quotations && !self.strict_quotes
    }

    /// Check every setting up front so misconfiguration fails before any I/O
    pub fn validate(&self) -> CsvBindResult<()> {
        let separator = self.separator_u8()?;
        let quote = self.quote_char_u8()?;
        self.escape_char_u8()?;
        self.terminator()?;
        if quote == Some(separator) {
            return Err(CsvBindError::config(
                "quote character must differ from the separator",
            ));
        }
        Ok(())
    }

    /// Build a csv reader configured from this config
    pub fn reader_builder(&self) -> CsvBindResult<csv::ReaderBuilder> {
        self.validate()?;
        let mut builder = csv::ReaderBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.separator_u8()?)
            .quoting(self.reads_quoted());
        if self.reads_quoted() {
            let quote = single_byte("quote character", self.read_quote_char())?;
            if quote == self.separator_u8()? {
                return Err(CsvBindError::config(
                    "separator must differ from the read quote character",
                ));
            }
            builder.quote(quote);
        }
        if let Some(escape) = self.escape_char_u8()? {
            builder.escape(Some(escape)).double_quote(false);
        }
        Ok(builder)
    }

    /// Build a csv writer configured from this config
    pub fn writer_builder(&self) -> CsvBindResult<csv::WriterBuilder> {
        self.validate()?;
        let mut builder = csv::WriterBuilder::new();
        builder
            .has_headers(false)
            .flexible(true)
            .delimiter(self.separator_u8()?)
            .terminator(self.terminator()?);
        match self.quote_char_u8()? {
            Some(quote) => {
                builder.quote(quote).quote_style(csv::QuoteStyle::Always);
            }
            None => {
                builder.quote_style(csv::QuoteStyle::Never);
            }
        }
        if let Some(escape) = self.escape_char_u8()? {
            builder.escape(escape).double_quote(false);
        }
        Ok(builder)
    }
}

const DEFAULT_READ_QUOTE: char = '"';

fn single_byte(what: &str, c: char) -> CsvBindResult<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(CsvBindError::config(format!(
            "{what} {c:?} must be a single-byte ASCII character"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CsvConfig::default();
        assert_eq!(config.separator, ',');
        assert_eq!(config.quote_char, None);
        assert_eq!(config.escape_char, None);
        assert_eq!(config.line_end, "\n");
        assert!(config.has_header);
        assert_eq!(config.skip_lines, 0);
        assert!(!config.strict_quotes);
        assert!(!config.ignore_leading_white_space);
        assert!(!config.ignore_empty_lines);
        assert!(config.ordered_results);
        assert!(config.throws_exceptions);
    }

    #[test]
    fn test_config_builder() {
        let config = CsvConfig::new()
            .separator(';')
            .quote_char('\'')
            .escape_char('\\')
            .line_end("\r\n")
            .without_header()
            .skip_lines(2)
            .ignore_empty_lines(true)
            .throws_exceptions(false);

        assert_eq!(config.separator, ';');
        assert_eq!(config.quote_char, Some('\''));
        assert_eq!(config.escape_char, Some('\\'));
        assert_eq!(config.line_end, "\r\n");
        assert!(!config.has_header);
        assert_eq!(config.skip_lines, 2);
        assert!(config.ignore_empty_lines);
        assert!(!config.throws_exceptions);
    }

    #[test]
    fn test_builder_leaves_original_untouched() {
        let base = CsvConfig::new();
        let changed = base.clone().separator('\t');
        assert_eq!(base.separator, ',');
        assert_eq!(changed.separator, '\t');
    }

    #[test]
    fn test_config_conversions() {
        let config = CsvConfig::new()
            .separator('\t')
            .quote_char('\'')
            .escape_char('\\');

        assert_eq!(config.separator_u8().unwrap(), b'\t');
        assert_eq!(config.quote_char_u8().unwrap(), Some(b'\''));
        assert_eq!(config.escape_char_u8().unwrap(), Some(b'\\'));
    }

    #[test]
    fn test_non_ascii_separator_rejected() {
        let config = CsvConfig::new().separator('§');
        assert!(matches!(
            config.validate(),
            Err(CsvBindError::Configuration(_))
        ));
    }

    #[test]
    fn test_line_end_terminators() {
        assert!(matches!(
            CsvConfig::new().line_end("\r\n").terminator().unwrap(),
            csv::Terminator::CRLF
        ));
        assert!(matches!(
            CsvConfig::new().terminator().unwrap(),
            csv::Terminator::Any(b'\n')
        ));
        assert!(CsvConfig::new().line_end("||").terminator().is_err());
    }

    #[test]
    fn test_quote_equal_to_separator_rejected() {
        let config = CsvConfig::new().quote_char(',');
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_read_quote_defaults_to_double_quote() {
        let config = CsvConfig::new();
        assert_eq!(config.read_quote_char(), '"');
        assert!(config.reads_quoted());
        assert_eq!(CsvConfig::new().quote_char('\'').read_quote_char(), '\'');
        assert!(!CsvConfig::new().ignore_quotations(true).reads_quoted());
    }

    #[test]
    fn test_double_quote_separator_rejected_for_reading() {
        let config = CsvConfig::new().separator('"');
        assert!(config.writer_builder().is_ok());
        assert!(config.reader_builder().is_err());
        assert!(config.ignore_quotations(true).reader_builder().is_ok());
    }

    #[test]
    fn test_partial_config_from_json() {
        let config: CsvConfig =
            serde_json::from_str(r#"{"separator": ";", "has_header": false}"#).unwrap();
        assert_eq!(config.separator, ';');
        assert!(!config.has_header);
        assert_eq!(config.line_end, "\n");
        assert!(config.throws_exceptions);
    }
}
