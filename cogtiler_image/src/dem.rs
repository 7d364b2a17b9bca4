//! Elevation encoded into RGB pixels.
//!
//! - Mapbox Terrain-RGB: `height = base + (r * 65536 + g * 256 + b) * interval`
//! - Mapzen Terrarium: `height = (r * 256 + g + b / 256) - 32768`

use anyhow::Result;
use cogtiler_core::{PixelBlock, TileError};
use ndarray::{Array2, Array3, ArrayView2};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DemEncoding {
	Mapbox,
	Mapzen,
}

impl FromStr for DemEncoding {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().to_ascii_lowercase().as_str() {
			"mapbox" => DemEncoding::Mapbox,
			"mapzen" => DemEncoding::Mapzen,
			_ => return Err(TileError::InvalidParameter(format!("invalid dem mode '{text}'")).into()),
		})
	}
}

impl fmt::Display for DemEncoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			DemEncoding::Mapbox => "mapbox",
			DemEncoding::Mapzen => "mapzen",
		})
	}
}

fn to_rgb(elevation: ArrayView2<'_, f64>, mask: &Array2<bool>, encode: impl Fn(f64) -> [u8; 3]) -> Result<PixelBlock<u8>> {
	let (height, width) = elevation.dim();
	let mut data = Array3::zeros((3, height, width));
	for ((row, col), &value) in elevation.indexed_iter() {
		if value.is_nan() {
			continue;
		}
		let rgb = encode(value);
		for channel in 0..3 {
			data[[channel, row, col]] = rgb[channel];
		}
	}
	PixelBlock::new(data, mask.clone())
}

fn check_bands(block: &PixelBlock) -> Result<()> {
	if block.bands() == 0 {
		return Err(TileError::InvalidBand("elevation needs at least one band".to_string()).into());
	}
	Ok(())
}

/// Mapbox Terrain-RGB with a custom `base` and `interval`, from the first band.
pub fn encode_terrain_rgb(block: &PixelBlock, base: f64, interval: f64) -> Result<PixelBlock<u8>> {
	check_bands(block)?;
	if !(interval.is_finite() && interval > 0.0 && base.is_finite()) {
		return Err(TileError::InvalidParameter(format!("invalid terrain-rgb base {base} / interval {interval}")).into());
	}
	to_rgb(block.band(0), block.mask(), |value| {
		let steps = ((value - base) / interval).round().clamp(0.0, 16_777_215.0) as u32;
		[(steps >> 16) as u8, (steps >> 8) as u8, steps as u8]
	})
}

fn terrarium(value: f64) -> [u8; 3] {
	let v = (value + 32768.0).clamp(0.0, 65535.0);
	[(v / 256.0) as u8, (v % 256.0) as u8, ((v * 256.0) % 256.0) as u8]
}

/// Encodes the first band of `block` as elevation RGB. The mask is kept.
pub fn encode_dem(block: &PixelBlock, encoding: DemEncoding) -> Result<PixelBlock<u8>> {
	check_bands(block)?;
	match encoding {
		DemEncoding::Mapbox => encode_terrain_rgb(block, -10000.0, 1.0),
		DemEncoding::Mapzen => to_rgb(block.band(0), block.mask(), terrarium),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::array;
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	fn decode_mapbox([r, g, b]: [u8; 3]) -> f64 {
		-10000.0 + (f64::from(r) * 65536.0 + f64::from(g) * 256.0 + f64::from(b)) * 0.1
	}

	fn pixel(block: &PixelBlock<u8>, col: usize) -> [u8; 3] {
		[block.data()[[0, 0, col]], block.data()[[1, 0, col]], block.data()[[2, 0, col]]]
	}

	#[rstest]
	#[case(0.0, [0, 39, 16])]
	#[case(-10000.0, [0, 0, 0])]
	#[case(1000.0, [0, 42, 248])]
	#[case(-20000.0, [0, 0, 0])]
	fn mapbox(#[case] elevation: f64, #[case] expected: [u8; 3]) -> Result<()> {
		let block = PixelBlock::new(array![[[elevation]]], array![[true]])?;
		assert_eq!(pixel(&encode_dem(&block, DemEncoding::Mapbox)?, 0), expected);
		Ok(())
	}

	#[test]
	fn terrain_rgb_with_custom_interval() -> Result<()> {
		let block = PixelBlock::new(array![[[123.4, 8848.8]]], Array2::from_elem((1, 2), true))?;
		let rgb = encode_terrain_rgb(&block, -10000.0, 0.1)?;
		for col in 0..2 {
			let decoded = decode_mapbox(pixel(&rgb, col));
			assert!((decoded - block.data()[[0, 0, col]]).abs() <= 0.05 + 1e-9);
		}
		assert!(encode_terrain_rgb(&block, 0.0, 0.0).is_err());
		Ok(())
	}

	#[rstest]
	#[case(0.0, [128, 0, 0])]
	#[case(-32768.0, [0, 0, 0])]
	#[case(1.5, [128, 1, 128])]
	#[case(-0.25, [127, 255, 192])]
	fn mapzen(#[case] elevation: f64, #[case] expected: [u8; 3]) -> Result<()> {
		let block = PixelBlock::new(array![[[elevation]]], array![[true]])?;
		assert_eq!(pixel(&encode_dem(&block, DemEncoding::Mapzen)?, 0), expected);
		Ok(())
	}

	#[test]
	fn parses_modes() {
		assert_eq!("Mapbox".parse::<DemEncoding>().unwrap(), DemEncoding::Mapbox);
		assert!("terrarium".parse::<DemEncoding>().is_err());
	}
}
