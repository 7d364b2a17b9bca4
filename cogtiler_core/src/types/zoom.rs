//! Mapping between ground resolution and Web Mercator zoom levels.

use crate::{EARTH_RADIUS, MAX_ZOOM_SEARCH};
use serde::Serialize;
use std::f64::consts::PI;

/// Ground resolution in meters per pixel at `zoom` and `latitude` (degrees).
#[must_use]
pub fn meters_per_pixel(zoom: u8, latitude: f64, tile_size: u32) -> f64 {
	latitude.to_radians().cos() * 2.0 * PI * EARTH_RADIUS / (f64::from(tile_size) * 2.0f64.powi(i32::from(zoom)))
}

/// The highest zoom level whose resolution is not finer than `pixel_size` meters.
///
/// Searches zoom levels `0..MAX_ZOOM_SEARCH`; returns `MAX_ZOOM_SEARCH - 1` when even
/// the deepest level is still coarser than `pixel_size`.
#[must_use]
pub fn zoom_for_pixel_size(pixel_size: f64, tile_size: u32) -> u8 {
	for z in 0..MAX_ZOOM_SEARCH {
		if pixel_size > meters_per_pixel(z, 0.0, tile_size) {
			return z.saturating_sub(1);
		}
	}
	MAX_ZOOM_SEARCH - 1
}

/// Usable zoom levels of a source or mosaic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ZoomRange {
	pub min: u8,
	pub max: u8,
}

impl ZoomRange {
	/// Derives the zoom range from a source's native resolution (meters per pixel in
	/// Web Mercator) and its larger pixel dimension.
	///
	/// `max` is the zoom matching the native resolution; `min` is the zoom at which the
	/// whole source fits into a single tile.
	#[must_use]
	pub fn from_resolution(resolution: f64, max_dimension: usize, tile_size: u32) -> ZoomRange {
		let overview_resolution = resolution * max_dimension as f64 / f64::from(tile_size);
		ZoomRange {
			min: zoom_for_pixel_size(overview_resolution, tile_size),
			max: zoom_for_pixel_size(resolution, tile_size),
		}
	}

	/// Union: lowest minimum and highest maximum.
	#[must_use]
	pub fn union(&self, other: &ZoomRange) -> ZoomRange {
		ZoomRange {
			min: self.min.min(other.min),
			max: self.max.max(other.max),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use rstest::rstest;

	#[test]
	fn resolution_at_zoom_zero() {
		assert_relative_eq!(meters_per_pixel(0, 0.0, 256), 156_543.033_928_041, epsilon = 1e-6);
		assert_relative_eq!(meters_per_pixel(1, 0.0, 512), 39_135.758_482_010_25, epsilon = 1e-6);
		assert_relative_eq!(meters_per_pixel(0, 60.0, 256), 78_271.516_964_020_5, epsilon = 1e-6);
	}

	#[rstest]
	#[case(200_000.0, 0)]
	#[case(156_543.0, 0)]
	#[case(100_000.0, 0)]
	#[case(70_000.0, 1)]
	#[case(30.0, 12)]
	#[case(10.0, 13)]
	#[case(0.001, 23)]
	fn zoom_for_sizes(#[case] pixel_size: f64, #[case] expected: u8) {
		assert_eq!(zoom_for_pixel_size(pixel_size, 256), expected);
	}

	#[test]
	fn zoom_range_of_source() {
		// 30 m pixels, 10_000 px wide
		let range = ZoomRange::from_resolution(30.0, 10_000, 256);
		assert_eq!(range, ZoomRange { min: 7, max: 12 });
	}

	#[test]
	fn union() {
		let a = ZoomRange { min: 3, max: 9 };
		let b = ZoomRange { min: 5, max: 14 };
		assert_eq!(a.union(&b), ZoomRange { min: 3, max: 14 });
	}
}
