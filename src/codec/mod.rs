//! Field codec module
//!
//! Maps field types to text converters.
//!
//! # Overview
//!
//! Every field type describes itself as a [`Shape`]: one variant of the closed
//! [`Kind`] table plus optional custom hooks. The registry turns a shape into
//! a decode or encode converter and memoizes it per type, so each field type
//! pays the dispatch cost once per process.
//!
//! Decode order: [`UnmarshalCsv`], primitive kind, pointer, date/time,
//! [`FromStr`](std::str::FromStr), unsupported. Encode mirrors it with
//! [`MarshalCsv`] and [`Display`](std::fmt::Display).

mod registry;
mod shape;

pub use registry::{decoder_for, encoder_for, DecodeFn, EncodeFn};
pub use shape::{
    Access, DecodeHook, EncodeHook, FieldType, Hooks, Kind, MarshalCsv, PointerAccess, Shape,
    ShapeBuilder, TimeAccess, TimeValue, UnmarshalCsv,
};
