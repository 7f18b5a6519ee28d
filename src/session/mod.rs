//! Session module
//!
//! A session binds one CSV reader or writer to the plan of one record type.
//!
//! # Overview
//!
//! - [`Decoder`]: reads the header once, reconciles it against the schema and
//!   decodes rows into records, pointers, arrays, vectors or channels.
//! - [`Encoder`]: writes the header once and one row per record.
//!
//! The functions in this module wrap a single session around an in-memory
//! buffer or a writer.

mod binding;
mod decoder;
mod encoder;
mod target;

pub use decoder::{Decoder, HeaderOutcome, Records, SessionState};
pub use encoder::Encoder;
pub use target::{DecodeTarget, EncodeSource, RecordSlot};

use crate::config::CsvOptions;
use crate::error::Result;
use std::io;

/// Decode CSV bytes into `target` with default options
pub fn decode<T: DecodeTarget + ?Sized>(data: &[u8], target: &mut T) -> Result<()> {
    decode_with(data, target, &CsvOptions::default())
}

/// Decode CSV bytes into `target`
pub fn decode_with<T: DecodeTarget + ?Sized>(
    data: &[u8],
    target: &mut T,
    options: &CsvOptions,
) -> Result<()> {
    Decoder::with_options(data, options)?.decode(target)
}

/// Encode `source` as CSV bytes with default options
pub fn encode<T: EncodeSource + ?Sized>(source: &T) -> Result<Vec<u8>> {
    encode_with(source, &CsvOptions::default())
}

/// Encode `source` as CSV bytes
pub fn encode_with<T: EncodeSource + ?Sized>(source: &T, options: &CsvOptions) -> Result<Vec<u8>> {
    let mut encoder = Encoder::with_options(Vec::new(), options)?;
    encoder.encode(source)?;
    encoder.into_inner()
}

/// Encode `source` as CSV into `writer`
pub fn encode_to_writer<T, W>(source: &T, writer: W, options: &CsvOptions) -> Result<()>
where
    T: EncodeSource + ?Sized,
    W: io::Write,
{
    Encoder::with_options(writer, options)?.encode(source)
}
