// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::type_complexity)]

//! # csvtag
//!
//! Tag-driven mapping between Rust records and CSV text.
//!
//! ## Features
//!
//! - **Declarative Records**: column names and format hints live next to the fields
//! - **Header Reconciliation**: columns are matched by name, in any order
//! - **Headerless Input**: falls back to positional mapping when no column matches
//! - **Pointers & Custom Types**: `Option`, `Box`, `Arc`, `FromStr`/`Display` and raw hooks
//! - **Date/Time**: chrono values with `strftime` layouts
//! - **Many Shapes**: single records, arrays, vectors and channels
//!
//! ## Quick Start
//!
//! ```rust
//! use csvtag::{csv_record, Result};
//!
//! csv_record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Person {
//!         pub name: String => "name",
//!         pub age: u32 => "age",
//!     }
//! }
//!
//! fn main() -> Result<()> {
//!     let mut people: Vec<Person> = Vec::new();
//!     csvtag::decode(b"age,name\n36,Ada\n", &mut people)?;
//!     assert_eq!(people[0].name, "Ada");
//!
//!     let out = csvtag::encode(&people)?;
//!     assert_eq!(out, b"name,age\nAda,36\n");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Session (Decoder / Encoder)                 │
//! │   header once · targets: record, array, Vec, channel        │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────────┬─────────────┴──────────┬────────────────────┐
//! │    Schema     │       Row Codec        │    Codec Registry  │
//! ├───────────────┼────────────────────────┼────────────────────┤
//! │ tags → fields │ plan per session       │ Shape → converter  │
//! │ cached by type│ one record per row     │ cached by type     │
//! └───────────────┴────────────────────────┴────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Session options
pub mod config;

/// Field type descriptors and converters
pub mod codec;

/// Record schemas from field tags
pub mod schema;

/// Per-row plans
pub mod row;

/// Decode and encode sessions
pub mod session;

mod macros;

// ============================================================================
// Re-exports
// ============================================================================

pub use codec::{FieldType, MarshalCsv, Shape, TimeValue, UnmarshalCsv};
pub use config::{CsvOptions, LineEnding};
pub use error::{BoxError, ConvertError, Error, Result};
pub use schema::{schema_for, FieldDescriptor, RawField, Record, Schema};
pub use session::{
    decode, decode_with, encode, encode_to_writer, encode_with, DecodeTarget, Decoder,
    EncodeSource, Encoder, HeaderOutcome, RecordSlot, SessionState,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
