//! Row codec module
//!
//! Applies a bound plan to one record at a time.

mod codec;

pub use codec::{DecodePlan, EncodePlan};
