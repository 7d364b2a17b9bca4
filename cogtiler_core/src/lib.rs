//! Shared building blocks for the cogtiler crates: tile grid, spatial references,
//! pixel blocks, band handling, errors and the protobuf value reader/writer.

pub mod concurrency;
pub mod error;
pub mod io;
pub mod types;

pub use concurrency::ConcurrencyLimits;
pub use error::*;
pub use types::*;
