//! Tile coordinates in the Web Mercator slippy-map pyramid.
//!
//! ```
//! use cogtiler_core::TileCoord;
//!
//! let coord = TileCoord::new(5, 6, 7).unwrap();
//! let bbox = coord.to_geo_bbox();
//! assert!(bbox.x_min < bbox.x_max);
//! ```

use crate::{GeoBBox, TileError, WORLD_SIZE};
use anyhow::Result;
use std::{
	f64::consts::PI,
	fmt::{self, Debug},
};

/// A tile address `(level, x, y)` with `x, y < 2^level`.
#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub level: u8,
	pub x: u32,
	pub y: u32,
}

impl TileCoord {
	/// Creates a validated tile coordinate.
	///
	/// # Errors
	/// Fails with `INVALID_GEOMETRY` if `level` > 31 or `x`/`y` exceed the grid at that level.
	pub fn new(level: u8, x: u32, y: u32) -> Result<TileCoord> {
		if level > 31 {
			return Err(TileError::InvalidGeometry(format!("level ({level}) must be <= 31")).into());
		}
		let max = 1u64 << level;
		if u64::from(x) >= max || u64::from(y) >= max {
			return Err(TileError::InvalidGeometry(format!("tile ({x}, {y}) out of bounds for level {level}")).into());
		}
		Ok(TileCoord { level, x, y })
	}

	/// Returns the north-west corner `[lon, lat]` of tile `(x, y)` at `level`.
	#[must_use]
	pub fn coord_to_geo(level: u8, x: u32, y: u32) -> [f64; 2] {
		let zoom = 2.0f64.powi(i32::from(level));
		[
			(f64::from(x) / zoom - 0.5) * 360.0,
			((PI * (1.0 - 2.0 * f64::from(y) / zoom)).exp().atan() / PI - 0.25) * 360.0,
		]
	}

	/// Geographic footprint of this tile.
	#[must_use]
	pub fn to_geo_bbox(&self) -> GeoBBox {
		let [x_min, y_max] = TileCoord::coord_to_geo(self.level, self.x, self.y);
		let [x_max, y_min] = TileCoord::coord_to_geo(self.level, self.x + 1, self.y + 1);
		GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		}
	}

	/// Footprint of this tile in Web Mercator meters, `[x_min, y_min, x_max, y_max]`.
	#[must_use]
	pub fn to_mercator_bbox(&self) -> [f64; 4] {
		let size = WORLD_SIZE / 2.0f64.powi(i32::from(self.level));
		let origin = WORLD_SIZE / 2.0;
		let x_min = f64::from(self.x) * size - origin;
		let y_max = origin - f64::from(self.y) * size;
		[x_min, y_max - size, x_min + size, y_max]
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "TileCoord({}, [{}, {}])", self.level, self.x, self.y)
	}
}

/// Edge length in pixels of a square tile, `base_size * scale`.
///
/// The usual `base_size` is [`TILE_BASE_SIZE`](crate::TILE_BASE_SIZE).
///
/// # Errors
/// Fails with `INVALID_PARAMETER` if `scale` is zero or the size overflows.
pub fn tile_size(base_size: u32, scale: u32) -> Result<u32> {
	if scale == 0 {
		return Err(TileError::InvalidParameter("scale must be >= 1".to_string()).into());
	}
	base_size
		.checked_mul(scale)
		.ok_or_else(|| TileError::InvalidParameter(format!("scale ({scale}) is too large")).into())
}
