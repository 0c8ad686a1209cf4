//! # csv-bind
//!
//! Metadata-driven mapping between CSV rows and typed records.
//!
//! A record type declares, once, which column name or position each of its
//! fields binds to. From that metadata this crate builds a mapping strategy
//! that generates the header, validates the header of a source, and converts
//! rows to records and back.
//!
//! ## Example Usage
//!
//! ```rust
//! use csv_bind::{CsvReader, CsvRecord, CsvWriter, FieldDescriptor, FieldValue, RecordDescriptor};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Student {
//!     name: String,
//!     age: Option<u32>,
//! }
//!
//! impl CsvRecord for Student {
//!     fn descriptor() -> RecordDescriptor {
//!         RecordDescriptor::new("Student")
//!             .field(FieldDescriptor::new("name").column("name").required())
//!             .field(FieldDescriptor::new("age").column("age"))
//!     }
//!
//!     fn field_value(&self, ident: &str) -> Option<String> {
//!         match ident {
//!             "name" => self.name.to_field(),
//!             "age" => self.age.to_field(),
//!             _ => None,
//!         }
//!     }
//!
//!     fn set_field_value(&mut self, ident: &str, raw: &str) -> Result<(), String> {
//!         match ident {
//!             "name" => self.name = FieldValue::from_field(raw)?,
//!             "age" => self.age = FieldValue::from_field(raw)?,
//!             _ => {}
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let students = CsvReader::<Student>::new()
//!     .read_str("name,age\nJohn,30\nAlice,\n")
//!     .unwrap();
//! assert_eq!(students[1].age, None);
//!
//! let bytes = CsvWriter::<Student>::new()
//!     .config(|c| c.separator(';'))
//!     .write_to_bytes(students)
//!     .unwrap();
//! assert_eq!(bytes, b"name;age\nJohn;30\nAlice;\n");
//! ```

pub mod config;
pub mod errors;
pub mod header;
pub mod metadata;
pub mod reader;
pub mod record;
pub mod strategy;
pub mod transform;
pub mod writer;

// Re-export main types
pub use config::CsvConfig;
pub use errors::{CsvBindError, CsvBindResult};
pub use header::validate_header;
pub use metadata::{BindingMode, FieldBinding, FieldDescriptor, RecordDescriptor};
pub use reader::{CsvReader, ReadReport};
pub use record::{CsvRecord, FieldValue, RowRecord};
pub use strategy::{ColumnLayout, MappingStrategy};
pub use transform::{Identity, RecordTransformer, TransformPipeline};
pub use writer::CsvWriter;

pub use errors::CsvBindError as Error;
pub type Result<T> = CsvBindResult<T>;

/// Shared settings handing out readers and writers that agree on config,
/// strategy, and transform
pub struct CsvBinder<T> {
    config: CsvConfig,
    strategy: Option<MappingStrategy<T>>,
    pipeline: TransformPipeline<T>,
}

impl<T: CsvRecord> CsvBinder<T> {
    /// Create a binder with default configuration
    pub fn new() -> Self {
        Self {
            config: CsvConfig::default(),
            strategy: None,
            pipeline: TransformPipeline::identity(),
        }
    }

    /// Set configuration
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Set an explicit mapping strategy
    pub fn with_strategy(mut self, strategy: MappingStrategy<T>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the transformer shared by reads and writes
    pub fn transform(mut self, transformer: impl RecordTransformer<T> + 'static) -> Self {
        self.pipeline = TransformPipeline::new(transformer);
        self
    }

    /// Get a reader configured with this binder's settings
    pub fn reader(&self) -> CsvReader<T> {
        let mut reader = CsvReader::new()
            .with_config(self.config.clone())
            .with_pipeline(self.pipeline.clone());
        if let Some(strategy) = &self.strategy {
            reader = reader.with_strategy(strategy.clone());
        }
        reader
    }

    /// Get a writer configured with this binder's settings
    pub fn writer(&self) -> CsvWriter<T> {
        let mut writer = CsvWriter::new()
            .with_config(self.config.clone())
            .with_pipeline(self.pipeline.clone());
        if let Some(strategy) = &self.strategy {
            writer = writer.with_strategy(strategy.clone());
        }
        writer
    }
}

impl<T: CsvRecord> Default for CsvBinder<T> {
    fn default() -> Self {
        Self::new()
    }
}
