//! Record schema module
//!
//! Derives the ordered column layout of a record type from its field tags.
//!
//! # Tags
//!
//! ```text
//! <column-name>[,format=<layout>]
//! -                                  skip the field
//! (none)                             column named after the field
//! ```
//!
//! Private fields never map to a column. Schemas are extracted once per
//! record type and shared for the life of the process.

mod extractor;
mod types;

pub use extractor::{parse_tag, schema_for, FieldTag};
pub use types::{FieldDescriptor, RawField, Record, Schema};
