use anyhow::{Result, ensure};

/// Affine pixel-to-world transform in GDAL order:
/// `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.
///
/// For north-up rasters both rotations are zero and `pixel_height` is negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
	/// North-up transform mapping a `width x height` grid onto `[left, bottom, right, top]`.
	#[must_use]
	pub fn from_bounds(bounds: [f64; 4], width: usize, height: usize) -> GeoTransform {
		let [left, bottom, right, top] = bounds;
		GeoTransform([
			left,
			(right - left) / width as f64,
			0.0,
			top,
			0.0,
			(bottom - top) / height as f64,
		])
	}

	/// World coordinates of the pixel position `(col, row)`; pixel centres sit at `+0.5`.
	#[must_use]
	pub fn pixel_to_world(&self, col: f64, row: f64) -> [f64; 2] {
		let g = &self.0;
		[g[0] + col * g[1] + row * g[2], g[3] + col * g[4] + row * g[5]]
	}

	/// Fractional pixel position `(col, row)` of the world coordinate `(x, y)`.
	pub fn world_to_pixel(&self, x: f64, y: f64) -> Result<[f64; 2]> {
		let g = &self.0;
		let det = g[1] * g[5] - g[2] * g[4];
		ensure!(det.abs() > f64::EPSILON * 1e-6, "geotransform {:?} is not invertible", g);
		let dx = x - g[0];
		let dy = y - g[3];
		Ok([(dx * g[5] - dy * g[2]) / det, (dy * g[1] - dx * g[4]) / det])
	}

	/// Envelope `[left, bottom, right, top]` of a `width x height` grid.
	#[must_use]
	pub fn bounds(&self, width: usize, height: usize) -> [f64; 4] {
		let corners = [
			self.pixel_to_world(0.0, 0.0),
			self.pixel_to_world(width as f64, 0.0),
			self.pixel_to_world(0.0, height as f64),
			self.pixel_to_world(width as f64, height as f64),
		];
		let mut envelope = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
		for [x, y] in corners {
			envelope[0] = envelope[0].min(x);
			envelope[1] = envelope[1].min(y);
			envelope[2] = envelope[2].max(x);
			envelope[3] = envelope[3].max(y);
		}
		envelope
	}

	/// Pixel size `(x, y)` in world units, always positive.
	#[must_use]
	pub fn resolution(&self) -> [f64; 2] {
		let g = &self.0;
		[g[1].hypot(g[4]), g[2].hypot(g[5])]
	}
}
