//! Decode session

use super::binding::{bound_plan, Binding};
use super::target::{DecodeTarget, RecordSlot};
use crate::config::CsvOptions;
use crate::error::Result;
use crate::row::DecodePlan;
use crate::schema::{schema_for, Record, Schema};
use csv::StringRecord;
use std::fs::File;
use std::io;
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

/// Progress of a session through its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No record type bound yet
    Unstarted,
    /// Header handled; rows are being read
    Streaming,
    /// End of input reached. Terminal.
    Exhausted,
}

/// How the first line of the input was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderOutcome {
    /// The header named `columns` known fields and sets the column order
    Matched { columns: usize },
    /// No column matched; the line is decoded as the first data row
    Replayed,
    /// Headers are disabled; columns follow declaration order
    Suppressed,
}

/// Reads records from CSV input
pub struct Decoder<Rd> {
    reader: csv::Reader<Rd>,
    header: bool,
    state: SessionState,
    outcome: Option<HeaderOutcome>,
    binding: Option<Binding>,
    row: StringRecord,
    /// `row` holds a line that has not been decoded yet
    replay: bool,
}

impl<Rd: io::Read> Decoder<Rd> {
    /// Create a decoder with default options
    pub fn new(reader: Rd) -> Result<Self> {
        Self::with_options(reader, &CsvOptions::default())
    }

    /// Create a decoder with the given options
    pub fn with_options(reader: Rd, options: &CsvOptions) -> Result<Self> {
        let reader = options.reader_builder()?.from_reader(reader);
        Ok(Self::from_csv(reader, options))
    }

    fn from_csv(reader: csv::Reader<Rd>, options: &CsvOptions) -> Self {
        Self {
            reader,
            header: options.header,
            state: SessionState::Unstarted,
            outcome: None,
            binding: None,
            row: StringRecord::new(),
            replay: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// How the header was handled; `None` before binding or on empty input
    pub fn header_outcome(&self) -> Option<HeaderOutcome> {
        self.outcome
    }

    /// Decode into a record, a pointer to one, or a sequence of them
    pub fn decode<T: DecodeTarget + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        self.bind::<<T::Slot as RecordSlot>::Record>()?;
        target.decode_from(self)
    }

    /// Decode the next row into `slot`.
    ///
    /// Returns `false` at end of input, leaving `slot` untouched. Unset
    /// pointer levels are only allocated once a row was read.
    pub fn read_record<S: RecordSlot>(&mut self, slot: &mut S) -> Result<bool> {
        self.bind::<S::Record>()?;
        if !self.read_line()? {
            return Ok(false);
        }

        let record = slot.materialize()?;
        let plan = bound_plan::<S::Record, DecodePlan<S::Record>>(self.binding.as_ref())?;
        plan.decode_row(&self.row, record)?;
        Ok(true)
    }

    /// Decode the next row into a fresh slot
    pub fn next_record<S: RecordSlot>(&mut self) -> Result<Option<S>> {
        let mut slot = S::vacant();
        Ok(self.read_record(&mut slot)?.then_some(slot))
    }

    /// Iterate over the remaining rows.
    ///
    /// A failing row yields an error and iteration continues with the next
    /// one. An I/O failure of the underlying reader ends the iteration.
    pub fn records<S: RecordSlot>(&mut self) -> Records<'_, Rd, S> {
        Records {
            decoder: self,
            _slot: PhantomData,
        }
    }

    /// Resolve the plan for `R` on first use, reading the header if enabled
    fn bind<R: Record>(&mut self) -> Result<()> {
        if let Some(binding) = &self.binding {
            return binding.check::<R>();
        }

        let schema = schema_for::<R>();
        let plan = if !self.header {
            self.outcome = Some(HeaderOutcome::Suppressed);
            DecodePlan::positional(&schema)
        } else if !self.read_header::<R>(&schema)? {
            // empty input: nothing to decode
            self.state = SessionState::Exhausted;
            self.binding = Some(Binding::new::<R, _>(DecodePlan::positional(&schema)));
            debug!(record = schema.type_name(), "input is empty");
            return Ok(());
        } else {
            let (plan, matched) = DecodePlan::from_header(&schema, &self.row);
            if matched == 0 {
                self.replay = true;
                self.outcome = Some(HeaderOutcome::Replayed);
                DecodePlan::positional(&schema)
            } else {
                self.outcome = Some(HeaderOutcome::Matched { columns: matched });
                plan
            }
        };

        debug!(
            record = schema.type_name(),
            outcome = ?self.outcome,
            columns = plan.width(),
            "bound decode session"
        );
        self.binding = Some(Binding::new::<R, _>(plan));
        self.state = SessionState::Streaming;
        Ok(())
    }

    /// Load the header line into `row`; an unreadable source binds `R` and ends the session
    fn read_header<R: Record>(&mut self, schema: &Schema<R>) -> Result<bool> {
        match self.reader.read_record(&mut self.row) {
            Ok(read) => Ok(read),
            Err(err) => {
                if err.is_io_error() {
                    debug!(
                        record = schema.type_name(),
                        error = %err,
                        "input failed, ending session"
                    );
                    self.state = SessionState::Exhausted;
                    self.binding = Some(Binding::new::<R, _>(DecodePlan::positional(schema)));
                }
                Err(err.into())
            }
        }
    }

    /// Load the next line into `row`
    fn read_line(&mut self) -> Result<bool> {
        if self.state == SessionState::Exhausted {
            return Ok(false);
        }
        if self.replay {
            self.replay = false;
            return Ok(true);
        }
        match self.reader.read_record(&mut self.row) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.state = SessionState::Exhausted;
                Ok(false)
            }
            Err(err) => {
                // a failing source is not retried; malformed lines are skipped
                if err.is_io_error() {
                    debug!(error = %err, "input failed, ending session");
                    self.state = SessionState::Exhausted;
                }
                Err(err.into())
            }
        }
    }
}

impl Decoder<File> {
    /// Open a file for decoding
    pub fn from_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Self> {
        let reader = options.reader_builder()?.from_path(path)?;
        Ok(Self::from_csv(reader, options))
    }
}

/// Iterator over decoded records, see [`Decoder::records`]
pub struct Records<'d, Rd, S> {
    decoder: &'d mut Decoder<Rd>,
    _slot: PhantomData<fn() -> S>,
}

impl<Rd: io::Read, S: RecordSlot> Iterator for Records<'_, Rd, S> {
    type Item = Result<S>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_record::<S>().transpose()
    }
}
