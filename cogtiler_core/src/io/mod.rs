//! Protocol buffer primitives for the vector tile encoder.
//!
//! Protobuf is always little-endian, so unlike a general byte writer these types have no
//! byte-order parameter.

mod pbf_reader;
mod pbf_writer;

pub use pbf_reader::*;
pub use pbf_writer::*;

/// Wire type of varint fields.
pub const WIRE_VARINT: u8 = 0;
/// Wire type of 64-bit fixed fields (`double`).
pub const WIRE_FIXED64: u8 = 1;
/// Wire type of length-delimited fields (strings, bytes, messages, packed arrays).
pub const WIRE_LEN: u8 = 2;
/// Wire type of 32-bit fixed fields (`float`).
pub const WIRE_FIXED32: u8 = 5;
