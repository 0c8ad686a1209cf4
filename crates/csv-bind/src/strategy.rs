//! Mapping strategies
//!
//! A [`MappingStrategy`] converts between raw rows and records for one
//! record type, and generates the header row that goes with its column
//! layout. The mode is fixed at construction; all construction-time checks
//! on the binding metadata happen there, never while rows are processed.

use crate::errors::{CsvBindError, CsvBindResult};
use crate::metadata::{self, BindingMode, FieldBinding, RecordDescriptor};
use crate::record::CsvRecord;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

/// Conversion rules between raw rows and records of type `T`
pub struct MappingStrategy<T> {
    mode: BindingMode,
    bindings: Arc<[FieldBinding]>,
    /// Column slot of each binding in the generated layout
    slots: Vec<usize>,
    width: usize,
    _record: PhantomData<fn() -> T>,
}

/// Where each binding's value sits in the rows of one particular source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<Option<usize>>,
    width: usize,
}

impl ColumnLayout {
    /// Number of values each row must carry
    pub fn width(&self) -> usize {
        self.width
    }

    /// Column index for the binding at `binding_index`, if the source has one
    pub fn column(&self, binding_index: usize) -> Option<usize> {
        self.columns.get(binding_index).copied().flatten()
    }
}

impl<T: CsvRecord> MappingStrategy<T> {
    /// Strategy whose mode follows the record's own metadata
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the metadata is inconsistent with
    /// the detected mode.
    pub fn for_type() -> CsvBindResult<Self> {
        let bindings = metadata::resolve_type::<T>();
        let mode = BindingMode::detect(&bindings);
        Self::build(mode, bindings)
    }

    /// Name-based strategy: columns are located through the source header
    ///
    /// # Errors
    ///
    /// Returns a configuration error when two fields bind the same column name.
    pub fn name_based() -> CsvBindResult<Self> {
        Self::build(BindingMode::NameBased, metadata::resolve_type::<T>())
    }

    /// Position-based strategy: columns are located by declared position
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no field carries a position, when
    /// only some fields carry one, or when two fields claim the same position.
    pub fn position_based() -> CsvBindResult<Self> {
        Self::build(BindingMode::PositionBased, metadata::resolve_type::<T>())
    }

    /// Unbound strategy: declaration order is column order
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the record declares no fields.
    pub fn unbound() -> CsvBindResult<Self> {
        Self::build(BindingMode::Unbound, metadata::resolve_type::<T>())
    }

    /// Strategy over metadata supplied at runtime instead of `T::descriptor()`
    ///
    /// With `mode` of `None` the mode is detected from the descriptor.
    ///
    /// # Errors
    ///
    /// Returns a configuration error under the same rules as the typed
    /// constructors.
    pub fn with_descriptor(
        mode: Option<BindingMode>,
        descriptor: &RecordDescriptor,
    ) -> CsvBindResult<Self> {
        let bindings: Arc<[FieldBinding]> = metadata::resolve(descriptor).into();
        let mode = mode.unwrap_or_else(|| BindingMode::detect(&bindings));
        Self::build(mode, bindings)
    }

    fn build(mode: BindingMode, bindings: Arc<[FieldBinding]>) -> CsvBindResult<Self> {
        if bindings.is_empty() {
            return Err(CsvBindError::config(
                "record type declares no mappable fields",
            ));
        }

        let (slots, width) = match mode {
            BindingMode::NameBased => {
                let mut seen = HashSet::new();
                for binding in bindings.iter() {
                    if !seen.insert(binding.column_name.as_str()) {
                        return Err(CsvBindError::config(format!(
                            "column name '{}' is bound more than once",
                            binding.column_name
                        )));
                    }
                }
                ((0..bindings.len()).collect(), bindings.len())
            }
            BindingMode::PositionBased => position_slots(&bindings)?,
            BindingMode::Unbound => ((0..bindings.len()).collect(), bindings.len()),
        };

        debug!(%mode, fields = bindings.len(), width, "Built mapping strategy");
        Ok(Self {
            mode,
            bindings,
            slots,
            width,
            _record: PhantomData,
        })
    }

    /// Binding mode of this strategy
    pub fn mode(&self) -> BindingMode {
        self.mode
    }

    /// Resolved field bindings in declaration order
    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    /// Header row for this strategy's column layout.
    ///
    /// Name-based: column names in declaration order. Position-based: column
    /// names by position, with empty names for unclaimed positions.
    /// Unbound: field identifiers in declaration order.
    pub fn generate_header(&self) -> Vec<String> {
        let mut header = vec![String::new(); self.width];
        for (binding, &slot) in self.bindings.iter().zip(&self.slots) {
            header[slot] = match self.mode {
                BindingMode::Unbound => binding.ident.clone(),
                _ => binding.column_name.clone(),
            };
        }
        header
    }

    /// Column layout for a source, given its header when one was read.
    ///
    /// Only name-based strategies consult the source header, so the column
    /// order in the file need not match declaration order.
    pub fn layout(&self, source_header: Option<&[String]>) -> ColumnLayout {
        match (self.mode, source_header) {
            (BindingMode::NameBased, Some(header)) => {
                let index: HashMap<&str, usize> = header
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.as_str(), i))
                    .collect();
                ColumnLayout {
                    columns: self
                        .bindings
                        .iter()
                        .map(|b| index.get(b.column_name.as_str()).copied())
                        .collect(),
                    width: header.len(),
                }
            }
            _ => ColumnLayout {
                columns: self.slots.iter().copied().map(Some).collect(),
                width: self.width,
            },
        }
    }

    /// Build a record from a raw row.
    ///
    /// Empty or absent values leave the field at its default value unless
    /// the field is required.
    ///
    /// # Errors
    ///
    /// Returns a row mapping error when the row width does not match the
    /// layout or a value does not convert, and a required-field error when a
    /// required value is empty.
    pub fn to_record(
        &self,
        row: &[String],
        layout: &ColumnLayout,
        row_number: usize,
    ) -> CsvBindResult<T> {
        if row.len() != layout.width {
            return Err(CsvBindError::row_mapping(
                row_number,
                format!("expected {} columns, found {}", layout.width, row.len()),
            ));
        }

        let mut record = T::default();
        for (i, binding) in self.bindings.iter().enumerate() {
            let value = layout
                .column(i)
                .and_then(|c| row.get(c))
                .map(String::as_str)
                .unwrap_or("");

            if value.is_empty() {
                if binding.required {
                    return Err(CsvBindError::required_field_empty(
                        row_number,
                        &binding.column_name,
                    ));
                }
                continue;
            }

            record
                .set_field_value(&binding.ident, value)
                .map_err(|message| {
                    CsvBindError::row_mapping(
                        row_number,
                        format!("field '{}': {message}", binding.ident),
                    )
                })?;
        }
        trace!(row = row_number, "Mapped row to record");
        Ok(record)
    }

    /// Build a raw row from a record, in the same order as the header.
    ///
    /// # Errors
    ///
    /// Returns a required-field error when a required field is null or empty.
    pub fn from_record(&self, record: &T, row_number: usize) -> CsvBindResult<Vec<String>> {
        let mut row = self.empty_row();
        for (binding, &slot) in self.bindings.iter().zip(&self.slots) {
            let value = record.field_value(&binding.ident).unwrap_or_default();
            if binding.required && value.is_empty() {
                return Err(CsvBindError::required_field_empty(
                    row_number,
                    &binding.column_name,
                ));
            }
            row[slot] = value;
        }
        Ok(row)
    }

    /// A row of empty values as wide as the header
    pub fn empty_row(&self) -> Vec<String> {
        vec![String::new(); self.width]
    }
}

fn position_slots(bindings: &[FieldBinding]) -> CsvBindResult<(Vec<usize>, usize)> {
    if bindings.iter().all(|b| b.position.is_none()) {
        return Err(CsvBindError::config(
            "position-based mapping requires at least one field bound by position",
        ));
    }

    let unpositioned: Vec<&str> = bindings
        .iter()
        .filter(|b| b.position.is_none())
        .map(|b| b.ident.as_str())
        .collect();
    if !unpositioned.is_empty() {
        return Err(CsvBindError::config(format!(
            "position-based mapping requires a position on every field; missing on: {}",
            unpositioned.join(", ")
        )));
    }

    let mut claimed: HashMap<usize, &str> = HashMap::new();
    let mut slots = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let position = binding.position.unwrap_or_default();
        if let Some(other) = claimed.insert(position, binding.ident.as_str()) {
            return Err(CsvBindError::config(format!(
                "fields '{other}' and '{}' both claim position {position}",
                binding.ident
            )));
        }
        slots.push(position);
    }

    let width = slots.iter().max().map_or(0, |max| max + 1);
    Ok((slots, width))
}

impl<T> Clone for MappingStrategy<T> {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            bindings: Arc::clone(&self.bindings),
            slots: self.slots.clone(),
            width: self.width,
            _record: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for MappingStrategy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingStrategy")
            .field("mode", &self.mode)
            .field("bindings", &self.bindings)
            .field("width", &self.width)
            .finish()
    }
}
