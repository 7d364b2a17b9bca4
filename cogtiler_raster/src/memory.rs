use crate::{PixelWindow, RasterSource, SourceInfo};
use anyhow::{Result, ensure};
use cogtiler_core::{BandDescriptor, Crs, GeoTransform, Nodata, TileError};
use ndarray::{Array2, Array3, s};

/// A raster held in memory as `(bands, rows, cols)` values.
///
/// Used by embedders that already have pixels at hand, and throughout the tests.
#[derive(Clone, Debug)]
pub struct MemorySource {
	info: SourceInfo,
	data: Array3<f64>,
}

impl MemorySource {
	pub fn new(address: &str, crs: Crs, geo_transform: GeoTransform, data: Array3<f64>) -> MemorySource {
		let (bands, height, width) = data.dim();
		MemorySource {
			info: SourceInfo {
				address: address.to_string(),
				crs,
				width,
				height,
				geo_transform,
				nodata: None,
				bands: (1..=bands).map(|index| BandDescriptor::new(index, None)).collect(),
			},
			data,
		}
	}

	/// A north-up raster covering `bounds` (`[left, bottom, right, top]` in `crs`).
	pub fn from_bounds(address: &str, crs: Crs, bounds: [f64; 4], data: Array3<f64>) -> MemorySource {
		let (_, height, width) = data.dim();
		MemorySource::new(address, crs, GeoTransform::from_bounds(bounds, width, height), data)
	}

	/// A north-up raster of `(width, height)` pixels where band `i` is filled with `values[i]`.
	pub fn filled(address: &str, crs: Crs, bounds: [f64; 4], size: (usize, usize), values: &[f64]) -> MemorySource {
		let (width, height) = size;
		let data = Array3::from_shape_fn((values.len(), height, width), |(band, _, _)| values[band]);
		MemorySource::from_bounds(address, crs, bounds, data)
	}

	pub fn with_nodata(mut self, nodata: Nodata) -> MemorySource {
		self.info.nodata = Some(nodata);
		self
	}

	/// Names bands in order; empty names keep the `band{n}` default.
	pub fn with_band_names(mut self, names: &[&str]) -> MemorySource {
		for (band, name) in self.info.bands.iter_mut().zip(names) {
			*band = BandDescriptor {
				is_alpha: band.is_alpha,
				..BandDescriptor::new(band.index, Some(*name))
			};
		}
		self
	}

	/// Marks the 1-based band `index` as alpha channel.
	pub fn with_alpha_band(mut self, index: usize) -> Result<MemorySource> {
		ensure!(
			index >= 1 && index <= self.info.bands.len(),
			"alpha band {index} does not exist"
		);
		self.info.bands[index - 1].is_alpha = true;
		Ok(self)
	}
}

impl RasterSource for MemorySource {
	fn info(&self) -> &SourceInfo {
		&self.info
	}

	fn read_native(&self, band: usize, window: PixelWindow) -> Result<Array2<f64>> {
		if band == 0 || band > self.info.bands.len() {
			return Err(TileError::InvalidBand(format!(
				"band {band} requested, but the source has {} bands",
				self.info.bands.len()
			))
			.into());
		}
		window.check_inside(self.info.width, self.info.height)?;
		Ok(
			self
				.data
				.slice(s![
					band - 1,
					window.row..window.row + window.height,
					window.col..window.col + window.width
				])
				.to_owned(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::array;
	use pretty_assertions::assert_eq;

	#[test]
	fn reads_native_windows() -> Result<()> {
		let data = Array3::from_shape_vec((1, 3, 3), (0..9).map(f64::from).collect())?;
		let source = MemorySource::from_bounds("mem://grid", Crs::WebMercator, [0.0, 0.0, 3.0, 3.0], data);
		assert_eq!(
			source.read_native(1, PixelWindow::new(1, 1, 2, 2))?,
			array![[4.0, 5.0], [7.0, 8.0]]
		);
		assert!(source.read_native(2, PixelWindow::new(0, 0, 1, 1)).is_err());
		assert!(source.read_native(1, PixelWindow::new(2, 2, 2, 2)).is_err());
		Ok(())
	}

	#[test]
	fn describes_bands() -> Result<()> {
		let source = MemorySource::filled("mem://rgba", Crs::Wgs84, [0.0, 0.0, 1.0, 1.0], (1, 1), &[1.0, 2.0, 3.0, 255.0])
			.with_band_names(&["red", "", "blue"])
			.with_alpha_band(4)?
			.with_nodata(Nodata::Nan);
		let names: Vec<&str> = source.info().bands.iter().map(|b| b.name.as_str()).collect();
		assert_eq!(names, vec!["red", "band2", "blue", "band4"]);
		assert_eq!(source.info().alpha_band(), Some(4));
		assert!(source.info().nodata.is_some());
		assert!(source.clone().with_alpha_band(5).is_err());
		Ok(())
	}
}
