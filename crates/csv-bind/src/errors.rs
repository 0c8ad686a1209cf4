//! Error types for record binding with context

use thiserror::Error;

/// Errors that can occur when mapping CSV rows to records and back
#[derive(Error, Debug)]
pub enum CsvBindError {
    /// Bad or contradictory binding metadata, strategy choice, or config
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A header line was expected but the source had no content
    #[error("The CSV source is empty")]
    EmptySource,

    /// Source header differs from the generated header in count or order
    #[error(
        "CSV headers do not match the expected headers: expected [{}], found [{}] in header line '{raw}'",
        .expected.join(", "),
        .actual.join(", ")
    )]
    HeaderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
        raw: String,
    },

    /// A data row could not be converted to or from a record
    #[error("Row mapping error at row {row}: {message}")]
    RowMapping { row: usize, message: String },

    /// A field marked as required had no value
    #[error("Required field '{field}' is empty at row {row}")]
    RequiredFieldEmpty { row: usize, field: String },

    /// The source location could not be used (empty path, missing file)
    #[error("Invalid source: {0}")]
    InvalidSource(String),

    /// I/O error from the underlying stream
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tokenizer or serializer error from the csv crate
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Base64 payload could not be decoded
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl CsvBindError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a header mismatch error
    pub fn header_mismatch(expected: &[String], actual: &[String], raw: impl Into<String>) -> Self {
        Self::HeaderMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            raw: raw.into(),
        }
    }

    /// Create a row mapping error at a 1-based data row
    pub fn row_mapping(row: usize, message: impl Into<String>) -> Self {
        Self::RowMapping {
            row,
            message: message.into(),
        }
    }

    /// Create a required-field error at a 1-based data row
    pub fn required_field_empty(row: usize, field: impl Into<String>) -> Self {
        Self::RequiredFieldEmpty {
            row,
            field: field.into(),
        }
    }

    /// Create an invalid source error
    pub fn invalid_source(message: impl Into<String>) -> Self {
        Self::InvalidSource(message.into())
    }

    /// Get the row number if available
    pub fn row_number(&self) -> Option<usize> {
        match self {
            Self::RowMapping { row, .. } | Self::RequiredFieldEmpty { row, .. } => Some(*row),
            _ => None,
        }
    }

    /// Whether the failure is confined to a single row.
    ///
    /// Row-level failures may be captured and skipped when the reader is
    /// configured not to throw; everything else aborts the operation.
    pub fn is_row_level(&self) -> bool {
        matches!(
            self,
            Self::RowMapping { .. } | Self::RequiredFieldEmpty { .. }
        )
    }
}

/// Result type alias for binding operations
pub type CsvBindResult<T> = std::result::Result<T, CsvBindError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_row_mapping_error() {
        let err = CsvBindError::row_mapping(5, "expected 2 columns, got 3");
        assert!(err.to_string().contains("row 5"));
        assert!(err.to_string().contains("expected 2 columns"));
        assert_eq!(err.row_number(), Some(5));
        assert!(err.is_row_level());
    }

    #[test]
    fn test_required_field_error() {
        let err = CsvBindError::required_field_empty(2, "name");
        assert_eq!(err.to_string(), "Required field 'name' is empty at row 2");
        assert_eq!(err.row_number(), Some(2));
    }

    #[test]
    fn test_header_mismatch_message() {
        let expected = vec!["name".to_string(), "age".to_string()];
        let actual = vec!["age".to_string(), "name".to_string()];
        let err = CsvBindError::header_mismatch(&expected, &actual, "age,name");

        let message = err.to_string();
        assert!(message.contains("expected [name, age]"));
        assert!(message.contains("found [age, name]"));
        assert!(message.contains("'age,name'"));
        assert_eq!(err.row_number(), None);
        assert!(!err.is_row_level());
    }

    #[test]
    fn test_io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed");
        let err = CsvBindError::from(io);
        assert!(err.to_string().contains("sink closed"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_empty_source_display() {
        assert_eq!(CsvBindError::EmptySource.to_string(), "The CSV source is empty");
    }
}
