//! Record binding metadata and its resolution into field bindings

use crate::record::CsvRecord;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Binding metadata for a record type, one entry per declared field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    /// Record type name/identifier
    #[serde(default)]
    pub name: String,
    /// Field declarations in declaration order
    pub fields: Vec<FieldDescriptor>,
}

/// Binding metadata for a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier on the record
    pub ident: String,
    /// Bound column name
    #[serde(default)]
    pub column: Option<String>,
    /// Bound column position (0-based)
    #[serde(default)]
    pub position: Option<usize>,
    /// Whether an empty value is an error
    #[serde(default)]
    pub required: bool,
    /// Whether the field takes no part in mapping
    #[serde(default)]
    pub ignored: bool,
}

impl RecordDescriptor {
    /// Create an empty descriptor with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field declaration
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field declaration by identifier
    pub fn get_field(&self, ident: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.ident == ident)
    }
}

impl FieldDescriptor {
    /// Create an unbound field declaration
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            column: None,
            position: None,
            required: false,
            ignored: false,
        }
    }

    /// Bind the field to a named column
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Bind the field to a column position
    pub fn position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Exclude the field from mapping
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }
}

/// A resolved, immutable field-to-column binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    /// Field identifier on the record
    pub ident: String,
    /// Column name: explicit name metadata, else the field identifier
    pub column_name: String,
    /// Whether the column name came from explicit metadata
    pub named: bool,
    /// Explicit column position
    pub position: Option<usize>,
    /// Whether an empty value is an error
    pub required: bool,
}

/// How a record type binds its fields to columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingMode {
    /// Columns are looked up by header name
    NameBased,
    /// Columns are looked up by declared position
    PositionBased,
    /// No binding metadata; declaration order is column order
    Unbound,
}

impl BindingMode {
    /// Derive the mode from resolved bindings.
    ///
    /// Name metadata wins over position metadata when both are present.
    pub fn detect(bindings: &[FieldBinding]) -> Self {
        if bindings.iter().any(|b| b.named) {
            BindingMode::NameBased
        } else if bindings.iter().any(|b| b.position.is_some()) {
            BindingMode::PositionBased
        } else {
            BindingMode::Unbound
        }
    }
}

impl std::fmt::Display for BindingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindingMode::NameBased => write!(f, "name-based"),
            BindingMode::PositionBased => write!(f, "position-based"),
            BindingMode::Unbound => write!(f, "unbound"),
        }
    }
}

/// Resolve a descriptor into ordered field bindings.
///
/// Ignored fields are dropped; the rest keep declaration order.
pub fn resolve(descriptor: &RecordDescriptor) -> Vec<FieldBinding> {
    descriptor
        .fields
        .iter()
        .filter(|f| !f.ignored)
        .map(|f| FieldBinding {
            ident: f.ident.clone(),
            column_name: f.column.clone().unwrap_or_else(|| f.ident.clone()),
            named: f.column.is_some(),
            position: f.position,
            required: f.required,
        })
        .collect()
}

fn binding_cache() -> &'static DashMap<TypeId, Arc<[FieldBinding]>> {
    static CACHE: OnceLock<DashMap<TypeId, Arc<[FieldBinding]>>> = OnceLock::new();
    CACHE.get_or_init(DashMap::new)
}

/// Resolve the bindings of a record type, once per type.
pub fn resolve_type<T: CsvRecord>() -> Arc<[FieldBinding]> {
    let cache = binding_cache();
    let id = TypeId::of::<T>();
    if let Some(hit) = cache.get(&id) {
        return Arc::clone(&hit);
    }

    // Resolved outside the shard lock; a racing insert keeps the first value.
    let descriptor = T::descriptor();
    let bindings: Arc<[FieldBinding]> = resolve(&descriptor).into();
    debug!(
        record = %descriptor.name,
        fields = bindings.len(),
        "Resolved record bindings"
    );
    Arc::clone(&cache.entry(id).or_insert(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student() -> RecordDescriptor {
        RecordDescriptor::new("Student")
            .field(FieldDescriptor::new("name").column("name").position(0))
            .field(FieldDescriptor::new("age").column("age").position(1))
    }

    #[test]
    fn test_resolve_keeps_declaration_order() {
        let bindings = resolve(&student());
        let idents: Vec<_> = bindings.iter().map(|b| b.ident.as_str()).collect();
        assert_eq!(idents, vec!["name", "age"]);
        assert_eq!(bindings[1].position, Some(1));
    }

    #[test]
    fn test_column_name_falls_back_to_ident() {
        let descriptor = RecordDescriptor::new("Person")
            .field(FieldDescriptor::new("full_name").column("Full Name"))
            .field(FieldDescriptor::new("email"));

        let bindings = resolve(&descriptor);
        assert_eq!(bindings[0].column_name, "Full Name");
        assert!(bindings[0].named);
        assert_eq!(bindings[1].column_name, "email");
        assert!(!bindings[1].named);
    }

    #[test]
    fn test_ignored_fields_are_dropped() {
        let descriptor = RecordDescriptor::new("Person")
            .field(FieldDescriptor::new("id").position(0))
            .field(FieldDescriptor::new("cache").ignored())
            .field(FieldDescriptor::new("name").position(1).required());

        let bindings = resolve(&descriptor);
        assert_eq!(bindings.len(), 2);
        assert!(bindings.iter().all(|b| b.ident != "cache"));
        assert!(bindings[1].required);
    }

    #[test]
    fn test_detect_binding_mode() {
        assert_eq!(BindingMode::detect(&resolve(&student())), BindingMode::NameBased);

        let positional = RecordDescriptor::new("P")
            .field(FieldDescriptor::new("a").position(1))
            .field(FieldDescriptor::new("b").position(0));
        assert_eq!(
            BindingMode::detect(&resolve(&positional)),
            BindingMode::PositionBased
        );

        let bare = RecordDescriptor::new("B").field(FieldDescriptor::new("a"));
        assert_eq!(BindingMode::detect(&resolve(&bare)), BindingMode::Unbound);
    }

    #[test]
    fn test_ignored_metadata_does_not_count() {
        let descriptor = RecordDescriptor::new("P")
            .field(FieldDescriptor::new("a"))
            .field(FieldDescriptor::new("b").column("B").ignored());
        assert_eq!(BindingMode::detect(&resolve(&descriptor)), BindingMode::Unbound);
    }

    #[test]
    fn test_descriptor_from_yaml() {
        let yaml = r#"
name: Student
fields:
  - ident: name
    column: name
    required: true
  - ident: age
    position: 1
"#;
        let descriptor: RecordDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(descriptor.fields.len(), 2);
        assert!(descriptor.get_field("name").unwrap().required);
        assert_eq!(descriptor.get_field("age").unwrap().position, Some(1));
        assert!(!descriptor.get_field("age").unwrap().ignored);
    }

    #[test]
    fn test_binding_mode_display() {
        assert_eq!(BindingMode::NameBased.to_string(), "name-based");
        assert_eq!(BindingMode::PositionBased.to_string(), "position-based");
        assert_eq!(BindingMode::Unbound.to_string(), "unbound");
    }
}
