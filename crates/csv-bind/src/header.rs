//! Header validation

use crate::errors::{CsvBindError, CsvBindResult};
use tracing::info;

/// Check a source header against the expected header.
///
/// Exact match only: same number of columns and the same value at every
/// position. Two headers holding the same names in a different order do not
/// match.
///
/// # Errors
///
/// Returns [`CsvBindError::HeaderMismatch`] carrying both headers and the
/// raw header line.
pub fn validate_header(actual: &[String], expected: &[String], raw: &str) -> CsvBindResult<()> {
    info!(?actual, "Actual header");
    info!(?expected, "Expected header");

    if actual == expected {
        Ok(())
    } else {
        Err(CsvBindError::header_mismatch(expected, actual, raw))
    }
}

/// The first physical line of `text`, without its line terminator
pub fn first_line(text: &str) -> &str {
    let line = text.split('\n').next().unwrap_or_default();
    line.strip_suffix('\r').unwrap_or(line)
}

/// Drop the first `count` physical lines of `text`
pub fn skip_lines(text: &str, count: usize) -> &str {
    let mut rest = text;
    for _ in 0..count {
        match rest.find('\n') {
            Some(end) => rest = &rest[end + 1..],
            None => return "",
        }
    }
    rest
}
