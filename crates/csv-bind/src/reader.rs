//! CSV reader

use crate::config::CsvConfig;
use crate::errors::{CsvBindError, CsvBindResult};
use crate::header;
use crate::record::CsvRecord;
use crate::strategy::MappingStrategy;
use crate::transform::{RecordTransformer, TransformPipeline};
use base64::Engine as _;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Lifecycle of a single read operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Nothing resolved yet
    Created,
    /// Strategy resolved and config checked
    Configured,
    /// Header read and matched, or no header expected
    HeaderValidated,
    /// Data rows being mapped
    Parsing,
    /// All rows mapped and transformed
    Done,
    /// Aborted with an error
    Failed,
}

/// Records read from a source, with row failures that were skipped
#[derive(Debug)]
pub struct ReadReport<T> {
    /// Mapped and transformed records, in source order
    pub records: Vec<T>,
    /// Row-level failures captured while `throws_exceptions` is off
    pub skipped: Vec<CsvBindError>,
}

/// Reader mapping CSV rows to records of type `T`
pub struct CsvReader<T> {
    config: CsvConfig,
    strategy: Option<MappingStrategy<T>>,
    pipeline: TransformPipeline<T>,
}

impl<T: CsvRecord> CsvReader<T> {
    /// Create a new CSV reader
    pub fn new() -> Self {
        Self {
            config: CsvConfig::default(),
            strategy: None,
            pipeline: TransformPipeline::identity(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Update the configuration from its current value
    pub fn config(mut self, update: impl FnOnce(CsvConfig) -> CsvConfig) -> Self {
        self.config = update(self.config);
        self
    }

    /// Use an explicit mapping strategy instead of the record's own metadata
    pub fn with_strategy(mut self, strategy: MappingStrategy<T>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the transformer applied to every record read
    pub fn transform(mut self, transformer: impl RecordTransformer<T> + 'static) -> Self {
        self.pipeline = TransformPipeline::new(transformer);
        self
    }

    /// Set the whole transform pipeline
    pub fn with_pipeline(mut self, pipeline: TransformPipeline<T>) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Current configuration
    pub fn current_config(&self) -> &CsvConfig {
        &self.config
    }

    /// Read all records from a character stream
    ///
    /// # Errors
    ///
    /// Fails on the first configuration, I/O, header, or row error; no
    /// partial result is returned. With `throws_exceptions` off, row errors
    /// are logged and skipped instead.
    pub fn read<R: Read>(&self, source: R) -> CsvBindResult<Vec<T>> {
        self.read_report(source).map(|report| report.records)
    }

    /// Read all records, also returning the row failures that were skipped
    ///
    /// # Errors
    ///
    /// Same as [`CsvReader::read`].
    pub fn read_report<R: Read>(&self, source: R) -> CsvBindResult<ReadReport<T>> {
        let mut state = ReadState::Created;
        let result = self.run(source, &mut state);
        if let Err(e) = &result {
            debug!(from = ?state, error = %e, "CSV read failed");
            advance(&mut state, ReadState::Failed);
        }
        result
    }

    /// Read records from an in-memory string
    ///
    /// # Errors
    ///
    /// Same as [`CsvReader::read`].
    pub fn read_str(&self, content: &str) -> CsvBindResult<Vec<T>> {
        self.read(content.as_bytes())
    }

    /// Read records from UTF-8 bytes
    ///
    /// # Errors
    ///
    /// Same as [`CsvReader::read`], plus an I/O error for invalid UTF-8.
    pub fn read_bytes(&self, content: &[u8]) -> CsvBindResult<Vec<T>> {
        self.read(content)
    }

    /// Read records from Base64-encoded CSV content
    ///
    /// # Errors
    ///
    /// Returns a Base64 error when the content does not decode, otherwise
    /// the same as [`CsvReader::read`].
    pub fn read_base64(&self, content: &str) -> CsvBindResult<Vec<T>> {
        let decoded = base64::engine::general_purpose::STANDARD.decode(content.trim())?;
        self.read(decoded.as_slice())
    }

    /// Read records from a file
    ///
    /// # Errors
    ///
    /// Returns an invalid source error for an empty or missing path,
    /// otherwise the same as [`CsvReader::read`].
    pub fn read_path(&self, path: impl AsRef<Path>) -> CsvBindResult<Vec<T>> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CsvBindError::invalid_source("file path cannot be empty"));
        }
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                CsvBindError::invalid_source(format!("file not found: {}", path.display()))
            }
            _ => CsvBindError::Io(e),
        })?;
        debug!(path = %path.display(), "Reading CSV file");
        self.read(file)
    }

    fn run<R: Read>(
        &self,
        mut source: R,
        state: &mut ReadState,
    ) -> CsvBindResult<ReadReport<T>> {
        let strategy = match &self.strategy {
            Some(strategy) => strategy.clone(),
            None => MappingStrategy::for_type()?,
        };
        let builder = self.config.reader_builder()?;
        advance(state, ReadState::Configured);

        let mut text = String::new();
        source.read_to_string(&mut text)?;
        drop(source);

        let body = header::skip_lines(&text, self.config.skip_lines);
        let mut rows = physical_rows(body, builder, &self.config)?.into_iter();

        let source_header = if self.config.has_header {
            if body.is_empty() {
                return Err(CsvBindError::EmptySource);
            }
            let actual = match rows.next() {
                Some(RawRow::Fields(first)) => self.clean(&first),
                _ => vec![String::new()],
            };
            header::validate_header(
                &actual,
                &strategy.generate_header(),
                header::first_line(body),
            )?;
            Some(actual)
        } else {
            None
        };
        advance(state, ReadState::HeaderValidated);

        if !self.config.ordered_results {
            debug!("Unordered results requested; source order is kept regardless");
        }

        let layout = strategy.layout(source_header.as_deref());
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        advance(state, ReadState::Parsing);

        for (index, row) in rows.enumerate() {
            let row_number = index + 1;
            let fields = match row {
                RawRow::Fields(record) => self.clean(&record),
                RawRow::Blank => vec![String::new()],
            };

            if self.config.ignore_empty_lines && fields.iter().all(|f| f.trim().is_empty()) {
                trace!(row = row_number, "Skipping blank row");
                continue;
            }

            match strategy.to_record(&fields, &layout, row_number) {
                Ok(record) => records.push(record),
                Err(e) if !self.config.throws_exceptions && e.is_row_level() => {
                    warn!(row = row_number, error = %e, "Skipping row that failed to map");
                    skipped.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        let records = self.pipeline.apply(records);
        advance(state, ReadState::Done);
        debug!(
            record_count = records.len(),
            skipped = skipped.len(),
            "Finished reading CSV"
        );
        Ok(ReadReport { records, skipped })
    }

    fn clean(&self, record: &csv::StringRecord) -> Vec<String> {
        let mut fields = if self.config.strict_quotes {
            strict_quote_fields(
                record,
                self.config.separator,
                self.config.read_quote_char(),
                self.config.escape_char,
            )
        } else {
            record.iter().map(str::to_string).collect()
        };
        if self.config.ignore_leading_white_space {
            for field in &mut fields {
                let trimmed = field.trim_start();
                if trimmed.len() != field.len() {
                    *field = trimmed.to_string();
                }
            }
        }
        fields
    }
}

impl<T: CsvRecord> Default for CsvReader<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn advance(state: &mut ReadState, next: ReadState) {
    trace!(from = ?*state, to = ?next, "CSV read state");
    *state = next;
}

/// One physical row of the source: a tokenized record, or an empty line the
/// tokenizer passed over
#[derive(Debug)]
enum RawRow {
    Fields(csv::StringRecord),
    Blank,
}

/// Tokenize `body`, restoring the empty lines the csv tokenizer skips so
/// that every physical row keeps its place and row number.
fn physical_rows(
    body: &str,
    builder: csv::ReaderBuilder,
    config: &CsvConfig,
) -> CsvBindResult<Vec<RawRow>> {
    let quote = config.reads_quoted().then_some(config.read_quote_char());
    let mut records = builder.from_reader(body.as_bytes()).into_records();
    let mut rows = Vec::new();

    for blank in blank_lines(body, config.separator, quote, config.escape_char) {
        if blank {
            rows.push(RawRow::Blank);
            continue;
        }
        match records.next() {
            Some(record) => rows.push(RawRow::Fields(record?)),
            None => break,
        }
    }
    for record in records {
        rows.push(RawRow::Fields(record?));
    }
    Ok(rows)
}

/// For each logical line of `text`, whether it is empty.
///
/// Line breaks inside a quoted field do not end the line. A quote opens a
/// quoted field only at the start of a field, as in the csv tokenizer.
fn blank_lines(
    text: &str,
    separator: char,
    quote: Option<char>,
    escape: Option<char>,
) -> Vec<bool> {
    let mut lines = Vec::new();
    let mut empty = true;
    let mut in_quotes = false;
    let mut field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if escape == Some(c) && quote != Some(c) {
                chars.next();
            } else if quote == Some(c) {
                if escape.is_none() && chars.peek() == quote.as_ref() {
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            continue;
        }
        match c {
            '\r' | '\n' => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(empty);
                empty = true;
                field_start = true;
            }
            _ => {
                empty = false;
                if c == separator {
                    field_start = true;
                } else {
                    in_quotes = field_start && quote == Some(c);
                    field_start = false;
                }
            }
        }
    }
    if !empty {
        lines.push(false);
    }
    lines
}

/// Rebuild fields from a record tokenized with quoting off, keeping only
/// the characters inside quotes.
///
/// Pieces that were split on a separator inside an open quote are joined
/// back together first.
fn strict_quote_fields(
    record: &csv::StringRecord,
    separator: char,
    quote: char,
    escape: Option<char>,
) -> Vec<String> {
    let mut fields = Vec::with_capacity(record.len());
    let mut pending: Option<String> = None;

    for piece in record.iter() {
        let raw = match pending.take() {
            Some(mut open) => {
                open.push(separator);
                open.push_str(piece);
                open
            }
            None => piece.to_string(),
        };
        let (content, still_open) = quoted_content(&raw, quote, escape);
        if still_open {
            pending = Some(raw);
        } else {
            fields.push(content);
        }
    }
    if let Some(open) = pending {
        fields.push(quoted_content(&open, quote, escape).0);
    }
    fields
}

fn quoted_content(raw: &str, quote: char, escape: Option<char>) -> (String, bool) {
    let mut content = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes && Some(c) != Some(quote) && Some(c) == escape {
            if let Some(next) = chars.next() {
                content.push(next);
            }
        } else if c == quote {
            if in_quotes && chars.peek() == Some(&quote) {
                content.push(quote);
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if in_quotes {
            content.push(c);
        }
    }
    (content, in_quotes)
}
