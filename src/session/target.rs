//! Value shapes a session reads into or writes from
//!
//! A [`RecordSlot`] is a record behind zero or more pointer levels. The
//! [`DecodeTarget`] and [`EncodeSource`] impls unwrap sequences and channels
//! down to a slot, so a value that does not resolve to a record is rejected
//! at compile time.

use super::decoder::Decoder;
use super::encoder::Encoder;
use crate::error::{Error, Result};
use crate::schema::Record;
use std::any::type_name;
use std::io;
use std::sync::mpsc::{Receiver, Sender, SyncSender};
use std::sync::Arc;

// ============================================================================
// Record Slot
// ============================================================================

/// A record, possibly behind `Option`, `Box` or `Arc`
pub trait RecordSlot: Sized + 'static {
    type Record: Record;

    /// Fresh slot for the next decoded record
    fn vacant() -> Self;

    /// The record, or `None` when a pointer level is unset
    fn resolve(&self) -> Option<&Self::Record>;

    /// The record, allocating unset pointer levels
    fn materialize(&mut self) -> Result<&mut Self::Record>;
}

impl<S: RecordSlot> RecordSlot for Option<S> {
    type Record = S::Record;

    fn vacant() -> Self {
        None
    }

    fn resolve(&self) -> Option<&Self::Record> {
        self.as_ref()?.resolve()
    }

    fn materialize(&mut self) -> Result<&mut Self::Record> {
        self.get_or_insert_with(S::vacant).materialize()
    }
}

impl<S: RecordSlot> RecordSlot for Box<S> {
    type Record = S::Record;

    fn vacant() -> Self {
        Box::new(S::vacant())
    }

    fn resolve(&self) -> Option<&Self::Record> {
        (**self).resolve()
    }

    fn materialize(&mut self) -> Result<&mut Self::Record> {
        (**self).materialize()
    }
}

impl<S: RecordSlot> RecordSlot for Arc<S> {
    type Record = S::Record;

    fn vacant() -> Self {
        Arc::new(S::vacant())
    }

    fn resolve(&self) -> Option<&Self::Record> {
        (**self).resolve()
    }

    fn materialize(&mut self) -> Result<&mut Self::Record> {
        Arc::get_mut(self)
            .ok_or(Error::CannotMaterialize {
                type_name: type_name::<Self>(),
            })?
            .materialize()
    }
}

// ============================================================================
// Decode Targets
// ============================================================================

/// A value a [`Decoder`] can fill
pub trait DecodeTarget {
    type Slot: RecordSlot;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()>;
}

impl<S: RecordSlot> DecodeTarget for Option<S> {
    type Slot = Self;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        decoder.read_record(self).map(|_| ())
    }
}

impl<S: RecordSlot> DecodeTarget for Box<S> {
    type Slot = Self;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        decoder.read_record(self).map(|_| ())
    }
}

impl<S: RecordSlot> DecodeTarget for Arc<S> {
    type Slot = Self;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        decoder.read_record(self).map(|_| ())
    }
}

/// Fills existing elements in place, then appends until the input is exhausted
impl<S: RecordSlot> DecodeTarget for Vec<S> {
    type Slot = S;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        for slot in self.iter_mut() {
            if !decoder.read_record(slot)? {
                return Ok(());
            }
        }
        while let Some(slot) = decoder.next_record::<S>()? {
            self.push(slot);
        }
        Ok(())
    }
}

/// Fills existing elements in place and stops when full
impl<S: RecordSlot> DecodeTarget for [S] {
    type Slot = S;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        for slot in self.iter_mut() {
            if !decoder.read_record(slot)? {
                break;
            }
        }
        Ok(())
    }
}

impl<S: RecordSlot, const N: usize> DecodeTarget for [S; N] {
    type Slot = S;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        self.as_mut_slice().decode_from(decoder)
    }
}

/// Sends records in input order; fails once the receiver is gone
impl<S: RecordSlot> DecodeTarget for Sender<S> {
    type Slot = S;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        while let Some(slot) = decoder.next_record::<S>()? {
            self.send(slot).map_err(|_| Error::StreamClosed)?;
        }
        Ok(())
    }
}

impl<S: RecordSlot> DecodeTarget for SyncSender<S> {
    type Slot = S;

    fn decode_from<Rd: io::Read>(&mut self, decoder: &mut Decoder<Rd>) -> Result<()> {
        while let Some(slot) = decoder.next_record::<S>()? {
            self.send(slot).map_err(|_| Error::StreamClosed)?;
        }
        Ok(())
    }
}

// ============================================================================
// Encode Sources
// ============================================================================

/// A value an [`Encoder`] can write
pub trait EncodeSource {
    type Slot: RecordSlot;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()>;
}

impl<S: RecordSlot> EncodeSource for Option<S> {
    type Slot = Self;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_row(self)
    }
}

impl<S: RecordSlot> EncodeSource for Box<S> {
    type Slot = Self;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_row(self)
    }
}

impl<S: RecordSlot> EncodeSource for Arc<S> {
    type Slot = Self;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        encoder.write_row(self)
    }
}

impl<S: RecordSlot> EncodeSource for [S] {
    type Slot = S;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.iter().try_for_each(|slot| encoder.write_row(slot))
    }
}

impl<S: RecordSlot, const N: usize> EncodeSource for [S; N] {
    type Slot = S;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.as_slice().encode_into(encoder)
    }
}

impl<S: RecordSlot> EncodeSource for Vec<S> {
    type Slot = S;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.as_slice().encode_into(encoder)
    }
}

/// Writes received records until every sender is dropped
impl<S: RecordSlot> EncodeSource for Receiver<S> {
    type Slot = S;

    fn encode_into<W: io::Write>(&self, encoder: &mut Encoder<W>) -> Result<()> {
        self.iter().try_for_each(|slot| encoder.write_row(&slot))
    }
}
