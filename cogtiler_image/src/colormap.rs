//! Named 256-entry color tables for single-band tiles.
//!
//! Each table is defined by a few color stops and linearly interpolated in between.

use anyhow::Result;
use cogtiler_core::{PixelBlock, TileError};
use ndarray::Array3;
use std::{fmt, str::FromStr};

/// `(index, [r, g, b])`, sorted by index, first at 0 and last at 255.
type Stops = &'static [(u8, [u8; 3])];

const CFASTIE: Stops = &[
	(0, [255, 255, 255]),
	(60, [60, 60, 60]),
	(61, [0, 0, 110]),
	(100, [0, 0, 255]),
	(120, [0, 170, 255]),
	(140, [0, 255, 110]),
	(160, [120, 255, 0]),
	(180, [255, 255, 0]),
	(200, [255, 150, 0]),
	(220, [255, 0, 0]),
	(240, [220, 0, 150]),
	(255, [255, 0, 255]),
];

const SCHWARZWALD: Stops = &[
	(0, [12, 102, 50]),
	(40, [26, 140, 52]),
	(80, [134, 184, 83]),
	(110, [232, 215, 125]),
	(140, [205, 160, 85]),
	(170, [161, 100, 40]),
	(200, [130, 70, 40]),
	(230, [170, 160, 160]),
	(255, [255, 255, 255]),
];

const VIRIDIS: Stops = &[
	(0, [68, 1, 84]),
	(32, [71, 45, 123]),
	(64, [59, 82, 139]),
	(96, [44, 114, 142]),
	(128, [33, 145, 140]),
	(159, [40, 174, 128]),
	(191, [94, 201, 98]),
	(223, [173, 220, 48]),
	(255, [253, 231, 37]),
];

const GREYS: Stops = &[(0, [0, 0, 0]), (255, [255, 255, 255])];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColormapName {
	Cfastie,
	Schwarzwald,
	Viridis,
	Greys,
}

impl ColormapName {
	pub fn as_str(&self) -> &'static str {
		match self {
			ColormapName::Cfastie => "cfastie",
			ColormapName::Schwarzwald => "schwarzwald",
			ColormapName::Viridis => "viridis",
			ColormapName::Greys => "greys",
		}
	}

	fn stops(&self) -> Stops {
		match self {
			ColormapName::Cfastie => CFASTIE,
			ColormapName::Schwarzwald => SCHWARZWALD,
			ColormapName::Viridis => VIRIDIS,
			ColormapName::Greys => GREYS,
		}
	}
}

impl FromStr for ColormapName {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().to_ascii_lowercase().as_str() {
			"cfastie" => ColormapName::Cfastie,
			"schwarzwald" => ColormapName::Schwarzwald,
			"viridis" => ColormapName::Viridis,
			"greys" | "grays" => ColormapName::Greys,
			_ => return Err(TileError::InvalidParameter(format!("unknown colormap '{text}'")).into()),
		})
	}
}

impl fmt::Display for ColormapName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A lookup table from byte values to RGB.
#[derive(Clone, PartialEq, Eq)]
pub struct Colormap {
	name: ColormapName,
	table: Vec<[u8; 3]>,
}

impl Colormap {
	pub fn new(name: ColormapName) -> Colormap {
		let stops = name.stops();
		let table = (0..=255u8)
			.map(|index| {
				let upper = stops.iter().position(|(at, _)| *at >= index).unwrap_or(stops.len() - 1);
				let (to, to_color) = stops[upper];
				if upper == 0 || to == index {
					return to_color;
				}
				let (from, from_color) = stops[upper - 1];
				let t = f64::from(index - from) / f64::from(to - from);
				let mut color = [0u8; 3];
				for channel in 0..3 {
					let a = f64::from(from_color[channel]);
					let b = f64::from(to_color[channel]);
					color[channel] = (a + (b - a) * t).round() as u8;
				}
				color
			})
			.collect();
		Colormap { name, table }
	}

	pub fn name(&self) -> ColormapName {
		self.name
	}

	pub fn color(&self, value: u8) -> [u8; 3] {
		self.table[usize::from(value)]
	}
}

impl FromStr for Colormap {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(Colormap::new(text.parse()?))
	}
}

impl fmt::Debug for Colormap {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Colormap({})", self.name)
	}
}

/// Expands a single-band block into RGB through `colormap`. The mask is kept.
pub fn apply_colormap(block: &PixelBlock<u8>, colormap: &Colormap) -> Result<PixelBlock<u8>> {
	if block.bands() != 1 {
		return Err(TileError::InvalidParameter(format!(
			"colormap '{}' needs a single band, got {}",
			colormap.name,
			block.bands()
		))
		.into());
	}
	let band = block.band(0);
	let data = Array3::from_shape_fn((3, block.height(), block.width()), |(channel, row, col)| {
		colormap.color(band[[row, col]])[channel]
	});
	PixelBlock::new(data, block.mask().clone())
}

#[cfg(test)]
mod tests {
	use super::*;
	use cogtiler_core::{ErrorKind, error_kind};
	use ndarray::array;
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	#[rstest]
	#[case(ColormapName::Cfastie)]
	#[case(ColormapName::Schwarzwald)]
	#[case(ColormapName::Viridis)]
	#[case(ColormapName::Greys)]
	fn tables_hit_their_stops(#[case] name: ColormapName) {
		let colormap = Colormap::new(name);
		assert_eq!(colormap.table.len(), 256);
		for (index, color) in name.stops() {
			assert_eq!(colormap.color(*index), *color);
		}
		assert_eq!(name.as_str().parse::<ColormapName>().unwrap(), name);
	}

	#[test]
	fn interpolates_between_stops() {
		let greys = Colormap::new(ColormapName::Greys);
		assert_eq!(greys.color(128), [128, 128, 128]);
		let viridis = Colormap::new(ColormapName::Viridis);
		assert_eq!(viridis.color(16), [70, 23, 104]);
	}

	#[test]
	fn unknown_names_are_rejected() {
		let error = "rainbow".parse::<Colormap>().unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter));
	}

	#[test]
	fn expands_single_bands() -> Result<()> {
		let block = PixelBlock::new(array![[[0u8, 255]]], array![[true, false]])?;
		let rgb = apply_colormap(&block, &Colormap::new(ColormapName::Greys))?;
		assert_eq!(rgb.data(), &array![[[0u8, 255]], [[0, 255]], [[0, 255]]]);
		assert_eq!(rgb.mask(), block.mask());

		let two_bands = PixelBlock::new(array![[[0u8]], [[1]]], array![[true]])?;
		assert!(apply_colormap(&two_bands, &Colormap::new(ColormapName::Greys)).is_err());
		Ok(())
	}
}
