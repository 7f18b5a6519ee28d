//! Encode session

use super::binding::{bound_plan, Binding};
use super::target::{EncodeSource, RecordSlot};
use crate::config::CsvOptions;
use crate::error::{Error, Result};
use crate::row::EncodePlan;
use crate::schema::{schema_for, Record};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::debug;

/// Writes records as CSV output.
///
/// The header is written when the first record type is bound, before any
/// row, so an empty sequence still produces it.
pub struct Encoder<W: io::Write> {
    writer: csv::Writer<W>,
    header: bool,
    binding: Option<Binding>,
    /// Lines written so far, header included
    lines: u64,
    buffer: Vec<String>,
}

impl<W: io::Write> Encoder<W> {
    /// Create an encoder with default options
    pub fn new(writer: W) -> Result<Self> {
        Self::with_options(writer, &CsvOptions::default())
    }

    /// Create an encoder with the given options
    pub fn with_options(writer: W, options: &CsvOptions) -> Result<Self> {
        let writer = options.writer_builder()?.from_writer(writer);
        Ok(Self::from_csv(writer, options))
    }

    fn from_csv(writer: csv::Writer<W>, options: &CsvOptions) -> Self {
        Self {
            writer,
            header: options.header,
            binding: None,
            lines: 0,
            buffer: Vec::new(),
        }
    }

    /// Encode a record, a pointer to one, or a sequence of them.
    ///
    /// The writer is flushed whether or not encoding succeeded.
    pub fn encode<T: EncodeSource + ?Sized>(&mut self, source: &T) -> Result<()> {
        let result = self
            .bind::<<T::Slot as RecordSlot>::Record>()
            .and_then(|()| source.encode_into(self));
        self.finish(result)
    }

    /// Encode every slot an iterator yields
    pub fn encode_iter<S, I>(&mut self, slots: I) -> Result<()>
    where
        S: RecordSlot,
        I: IntoIterator<Item = S>,
    {
        let result = self.bind::<S::Record>().and_then(|()| {
            slots
                .into_iter()
                .try_for_each(|slot| self.write_row(&slot))
        });
        self.finish(result)
    }

    /// Write one row; an unset slot writes empty columns
    pub fn write_row<S: RecordSlot>(&mut self, slot: &S) -> Result<()> {
        self.bind::<S::Record>()?;
        let plan = bound_plan::<S::Record, EncodePlan<S::Record>>(self.binding.as_ref())?;
        plan.encode_row(slot.resolve(), self.lines + 1, &mut self.buffer)?;
        self.writer.write_record(&self.buffer)?;
        self.lines += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| Error::Io(err.into_error()))
    }

    fn finish(&mut self, result: Result<()>) -> Result<()> {
        let flushed = self.flush();
        result.and(flushed)
    }

    /// Resolve the plan for `R` on first use and write the header
    fn bind<R: Record>(&mut self) -> Result<()> {
        if let Some(binding) = &self.binding {
            return binding.check::<R>();
        }

        let schema = schema_for::<R>();
        let plan = EncodePlan::new(&schema);
        if self.header {
            self.writer.write_record(plan.header())?;
            self.lines += 1;
        }

        debug!(
            record = schema.type_name(),
            columns = plan.width(),
            header = self.header,
            "bound encode session"
        );
        self.binding = Some(Binding::new::<R, _>(plan));
        Ok(())
    }
}

impl Encoder<File> {
    /// Create or truncate a file for encoding
    pub fn to_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        let writer = options.writer_builder()?.from_path(path)?;
        Ok(Self::from_csv(writer, options))
    }
}
