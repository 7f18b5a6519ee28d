//! Bound row plans
//!
//! A plan pairs every column position with a field descriptor and the
//! converter selected for its type. Plans are built once per session.

use crate::codec::{decoder_for, encoder_for, DecodeFn, EncodeFn};
use crate::error::{FieldContext, Result};
use crate::schema::{FieldDescriptor, Record, Schema};
use csv::StringRecord;
use std::sync::Arc;
use tracing::trace;

struct DecodeColumn<R> {
    field: Arc<FieldDescriptor<R>>,
    convert: DecodeFn,
}

struct EncodeColumn<R> {
    field: Arc<FieldDescriptor<R>>,
    convert: EncodeFn,
}

// ============================================================================
// Decode Plan
// ============================================================================

/// Column layout for reading rows into `R`
pub struct DecodePlan<R> {
    columns: Vec<Option<DecodeColumn<R>>>,
}

impl<R: Record> DecodePlan<R> {
    /// Plan from explicit column slots; `None` skips the column
    pub fn new(slots: impl IntoIterator<Item = Option<Arc<FieldDescriptor<R>>>>) -> Self {
        let columns = slots
            .into_iter()
            .map(|slot| {
                slot.map(|field| DecodeColumn {
                    convert: decoder_for(field.shape()),
                    field,
                })
            })
            .collect();
        Self { columns }
    }

    /// One column per field in declaration order
    pub fn positional(schema: &Schema<R>) -> Self {
        Self::new(schema.fields().iter().cloned().map(Some))
    }

    /// Plan following a header line.
    ///
    /// Each column takes the first field with the same name. Returns the
    /// plan and the number of matched columns.
    pub fn from_header(schema: &Schema<R>, header: &StringRecord) -> (Self, usize) {
        let slots: Vec<_> = header
            .iter()
            .map(|column| schema.find(column).cloned())
            .collect();
        let matched = slots.iter().filter(|slot| slot.is_some()).count();
        (Self::new(slots), matched)
    }

    /// Number of column positions, including skipped ones
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Fields in column order; `None` for skipped columns
    pub fn fields(&self) -> impl Iterator<Item = Option<&FieldDescriptor<R>>> + '_ {
        self.columns
            .iter()
            .map(|column| column.as_ref().map(|column| &*column.field))
    }

    /// Populate `record` from one row.
    ///
    /// Extra columns are ignored and missing ones leave their field
    /// untouched. Stops at the first failing field; fields decoded before it
    /// keep their new values.
    pub fn decode_row(&self, row: &StringRecord, record: &mut R) -> Result<()> {
        let line = row.position().map_or(0, csv::Position::line);

        for (index, (text, column)) in row.iter().zip(&self.columns).enumerate() {
            let Some(column) = column else {
                continue;
            };
            let field = &column.field;
            (column.convert)(field.value_mut(record), text, field.format()).map_err(|err| {
                err.in_field(FieldContext {
                    row: line,
                    column: index + 1,
                    field: field.name(),
                    value: text,
                })
            })?;
        }

        trace!(line, "decoded row");
        Ok(())
    }
}

// ============================================================================
// Encode Plan
// ============================================================================

/// Column layout for writing `R` as rows
pub struct EncodePlan<R> {
    columns: Vec<EncodeColumn<R>>,
}

impl<R: Record> EncodePlan<R> {
    pub fn new(schema: &Schema<R>) -> Self {
        let columns = schema
            .fields()
            .iter()
            .map(|field| EncodeColumn {
                convert: encoder_for(field.shape()),
                field: Arc::clone(field),
            })
            .collect();
        Self { columns }
    }

    /// Column names in output order
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.field.name()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Render one row into `out`.
    ///
    /// A missing record renders every column empty. `line` is the output
    /// line the row will occupy, used for error context. On failure `out`
    /// holds a partial row that must not be written.
    pub fn encode_row(&self, record: Option<&R>, line: u64, out: &mut Vec<String>) -> Result<()> {
        out.clear();
        let Some(record) = record else {
            out.resize(self.columns.len(), String::new());
            return Ok(());
        };

        for (index, column) in self.columns.iter().enumerate() {
            let field = &column.field;
            let text = (column.convert)(field.value(record), field.format()).map_err(|err| {
                err.in_field(FieldContext {
                    row: line,
                    column: index + 1,
                    field: field.name(),
                    value: "",
                })
            })?;
            out.push(text);
        }
        Ok(())
    }
}
