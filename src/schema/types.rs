//! Schema types

use crate::codec::Shape;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Record
// ============================================================================

/// A struct whose fields map to CSV columns.
///
/// Normally implemented through [`csv_record!`](crate::csv_record).
pub trait Record: Any + Sized {
    /// Every declared field, in declaration order
    fn raw_fields() -> Vec<RawField<Self>>;
}

/// One declared field as the record type describes it
pub struct RawField<R> {
    /// Field identifier
    pub ident: &'static str,
    /// Raw tag string, if any
    pub tag: Option<&'static str>,
    /// Whether the field is visible outside the record (`pub`)
    pub exported: bool,
    pub shape: Shape,
    pub get: fn(&R) -> &dyn Any,
    pub get_mut: fn(&mut R) -> &mut dyn Any,
}

// ============================================================================
// Field Descriptor
// ============================================================================

/// One field eligible for column mapping
pub struct FieldDescriptor<R> {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) format: Option<String>,
    pub(crate) shape: Shape,
    pub(crate) get: fn(&R) -> &dyn Any,
    pub(crate) get_mut: fn(&mut R) -> &mut dyn Any,
}

impl<R> FieldDescriptor<R> {
    /// Position in the declared layout, counting skipped fields
    pub fn index(&self) -> usize {
        self.index
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Format hint from the tag
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn value<'r>(&self, record: &'r R) -> &'r dyn Any {
        (self.get)(record)
    }

    pub fn value_mut<'r>(&self, record: &'r mut R) -> &'r mut dyn Any {
        (self.get_mut)(record)
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("format", &self.format)
            .field("type_name", &self.shape.type_name)
            .finish()
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Ordered field descriptors of one record type
pub struct Schema<R> {
    pub(crate) type_name: &'static str,
    pub(crate) fields: Vec<Arc<FieldDescriptor<R>>>,
}

impl<R> Schema<R> {
    /// Descriptors in declaration order
    pub fn fields(&self) -> &[Arc<FieldDescriptor<R>>] {
        &self.fields
    }

    /// Column names in declaration order
    pub fn header(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    /// First descriptor with the given column name
    pub fn find(&self, name: &str) -> Option<&Arc<FieldDescriptor<R>>> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Name of the record type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl<R> fmt::Debug for Schema<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .finish()
    }
}
