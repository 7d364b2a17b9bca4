//! Turning raw sample values into displayable 8-bit pixels.

mod color_formula;
mod rescale;

pub use color_formula::{ColorOperation, apply_color_formula};
pub use rescale::{rescale, to_bytes};

use anyhow::Result;
use cogtiler_core::PixelBlock;

/// Rescales (or casts) `block` to bytes, then applies the color formula.
///
/// Without `ranges` values are clamped to `0..=255`. The mask is never changed.
pub fn postprocess(
	block: &PixelBlock,
	ranges: Option<&[[f64; 2]]>,
	operations: Option<&[ColorOperation]>,
) -> Result<PixelBlock<u8>> {
	let bytes = match ranges {
		Some(ranges) => rescale(block, ranges)?,
		None => to_bytes(block),
	};
	match operations {
		Some(operations) if !operations.is_empty() => apply_color_formula(&bytes, operations),
		_ => Ok(bytes),
	}
}
