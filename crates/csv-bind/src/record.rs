//! Record access traits
//!
//! A [`CsvRecord`] is the per-type binding table: it declares its field
//! metadata once and exposes its fields as text by identifier. The mapping
//! engine never inspects a record any other way.

use crate::metadata::RecordDescriptor;
use std::collections::BTreeMap;

/// A record type that can be mapped to and from CSV rows
pub trait CsvRecord: Default + 'static {
    /// Binding metadata for this type, in field declaration order
    fn descriptor() -> RecordDescriptor;

    /// Text value of a field; `None` is a null value and writes as empty
    fn field_value(&self, ident: &str) -> Option<String>;

    /// Set a field from its non-empty text value
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the text does not convert
    /// to the field's type.
    fn set_field_value(&mut self, ident: &str, raw: &str) -> Result<(), String>;
}

/// Conversion of a single field type to and from CSV text
pub trait FieldValue: Sized {
    /// Text for the field; `None` writes as an empty value
    fn to_field(&self) -> Option<String>;

    /// Parse a non-empty text value
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the text does not parse.
    fn from_field(raw: &str) -> Result<Self, String>;
}

impl FieldValue for String {
    fn to_field(&self) -> Option<String> {
        Some(self.clone())
    }

    fn from_field(raw: &str) -> Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn to_field(&self) -> Option<String> {
        self.as_ref().and_then(FieldValue::to_field)
    }

    fn from_field(raw: &str) -> Result<Self, String> {
        if raw.is_empty() {
            Ok(None)
        } else {
            T::from_field(raw).map(Some)
        }
    }
}

macro_rules! parsed_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn to_field(&self) -> Option<String> {
                    Some(self.to_string())
                }

                fn from_field(raw: &str) -> Result<Self, String> {
                    raw.trim().parse::<$ty>().map_err(|e| {
                        format!("cannot convert '{raw}' to {}: {e}", stringify!($ty))
                    })
                }
            }
        )*
    };
}

parsed_field_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

/// An untyped record holding column text by field identifier.
///
/// Used when the binding metadata is only known at runtime, such as a
/// descriptor loaded from a file; pair it with
/// [`MappingStrategy::with_descriptor`](crate::strategy::MappingStrategy::with_descriptor).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRecord {
    values: BTreeMap<String, String>,
}

impl RowRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value
    pub fn with(mut self, ident: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(ident.into(), value.into());
        self
    }

    /// Get a field value
    pub fn get(&self, ident: &str) -> Option<&str> {
        self.values.get(ident).map(String::as_str)
    }

    /// Number of populated fields
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if no field is populated
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl CsvRecord for RowRecord {
    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::new("RowRecord")
    }

    fn field_value(&self, ident: &str) -> Option<String> {
        self.values.get(ident).cloned()
    }

    fn set_field_value(&mut self, ident: &str, raw: &str) -> Result<(), String> {
        self.values.insert(ident.to_string(), raw.to_string());
        Ok(())
    }
}
