//! CSV writer

use crate::config::CsvConfig;
use crate::errors::{CsvBindError, CsvBindResult};
use crate::record::CsvRecord;
use crate::strategy::MappingStrategy;
use crate::transform::{RecordTransformer, TransformPipeline};
use base64::Engine as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, trace};

/// Writer mapping records of type `T` to CSV rows
pub struct CsvWriter<T> {
    config: CsvConfig,
    strategy: Option<MappingStrategy<T>>,
    pipeline: TransformPipeline<T>,
}

impl<T: CsvRecord> CsvWriter<T> {
    /// Create a new CSV writer
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

    /// Set the transformer applied to every record before writing
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

    /// Write records to a character sink, header first.
    ///
    /// An empty sequence writes nothing at all, not even the header.
    ///
    /// # Errors
    ///
    /// Fails on configuration, required-field, or I/O errors. Rows written
    /// before the failure stay in the sink.
    pub fn write<W: Write>(
        &self,
        sink: W,
        records: impl IntoIterator<Item = T>,
    ) -> CsvBindResult<()> {
        self.write_optional(sink, records.into_iter().map(Some))
    }

    /// Write records where some entries may be absent.
    ///
    /// An absent entry writes as a row of empty values as wide as the header.
    ///
    /// # Errors
    ///
    /// Same as [`CsvWriter::write`].
    pub fn write_optional<W: Write>(
        &self,
        sink: W,
        records: impl IntoIterator<Item = Option<T>>,
    ) -> CsvBindResult<()> {
        let strategy = match &self.strategy {
            Some(strategy) => strategy.clone(),
            None => MappingStrategy::for_type()?,
        };
        let builder = self.config.writer_builder()?;

        let records: Vec<Option<T>> = records.into_iter().collect();
        if records.is_empty() {
            debug!("No records to write");
            return Ok(());
        }
        let records = self.pipeline.apply_optional(records);

        let mut csv_writer = builder.from_writer(sink);
        if self.config.has_header {
            csv_writer.write_record(strategy.generate_header())?;
        }

        for (index, record) in records.iter().enumerate() {
            let row = match record {
                Some(record) => strategy.from_record(record, index + 1)?,
                None => strategy.empty_row(),
            };
            csv_writer.write_record(&row)?;
            trace!(?row, "Wrote CSV row");
        }

        csv_writer.flush()?;
        debug!(record_count = records.len(), "Finished writing CSV");
        Ok(())
    }

    /// Write records into a byte buffer
    ///
    /// # Errors
    ///
    /// Same as [`CsvWriter::write`].
    pub fn write_to_bytes(&self, records: impl IntoIterator<Item = T>) -> CsvBindResult<Vec<u8>> {
        let mut output = Vec::new();
        self.write(&mut output, records)?;
        Ok(output)
    }

    /// Write records and Base64-encode the output
    ///
    /// # Errors
    ///
    /// Same as [`CsvWriter::write`].
    pub fn write_to_base64(&self, records: impl IntoIterator<Item = T>) -> CsvBindResult<String> {
        let output = self.write_to_bytes(records)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(output))
    }

    /// Write records to a file, replacing its contents
    ///
    /// # Errors
    ///
    /// Returns an invalid source error for an empty path, otherwise the same
    /// as [`CsvWriter::write`].
    pub fn write_path(
        &self,
        path: impl AsRef<Path>,
        records: impl IntoIterator<Item = T>,
    ) -> CsvBindResult<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(CsvBindError::invalid_source("file path cannot be empty"));
        }
        let file = File::create(path)?;
        debug!(path = %path.display(), "Writing CSV file");
        self.write(file, records)
    }
}

impl<T: CsvRecord> Default for CsvWriter<T> {
    fn default() -> Self {
        Self::new()
    }
}
