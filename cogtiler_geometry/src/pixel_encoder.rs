//! Turns the valid pixels of a block into vector tile features.

use crate::vector_tile::{GeomType, GeometryWriter, TileValue, VectorTile, VectorTileLayer};
use anyhow::{Result, ensure};
use cogtiler_core::{BandDescriptor, Blob, PixelBlock, TileError};
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Tile-local coordinate range of the emitted features.
pub const EXTENT: u32 = 4096;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
	/// One point at every pixel centre.
	#[default]
	Point,
	/// One square per pixel.
	Polygon,
}

impl FromStr for FeatureType {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().to_ascii_lowercase().as_str() {
			"point" => FeatureType::Point,
			"polygon" => FeatureType::Polygon,
			_ => return Err(TileError::InvalidParameter(format!("unknown feature type '{text}'")).into()),
		})
	}
}

impl fmt::Display for FeatureType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			FeatureType::Point => "point",
			FeatureType::Polygon => "polygon",
		})
	}
}

/// Encodes every valid pixel of `block` as a feature of a single layer named `layer_name`.
///
/// Features are emitted row by row. Each carries one string property per band, keyed by
/// the band name in `bands`.
pub fn encode_vector_tile(
	block: &PixelBlock,
	bands: &[BandDescriptor],
	layer_name: &str,
	feature_type: FeatureType,
) -> Result<Blob> {
	ensure!(
		bands.len() == block.bands(),
		TileError::InvalidBand(format!(
			"{} band descriptors given for a block of {} bands",
			bands.len(),
			block.bands()
		))
	);

	let (height, width) = (block.height(), block.width());
	let scale_x = f64::from(EXTENT) / width as f64;
	let scale_y = f64::from(EXTENT) / height as f64;
	let to_x = |col: f64| (col * scale_x).round() as i64;
	let to_y = |row: f64| (row * scale_y).round() as i64;

	let mut layer = VectorTileLayer::new(layer_name, EXTENT);
	let data = block.data();
	for ((row, col), &valid) in block.mask().indexed_iter() {
		if !valid {
			continue;
		}
		let properties: Vec<(String, TileValue)> = bands
			.iter()
			.enumerate()
			.map(|(band, descriptor)| (descriptor.name.clone(), TileValue::String(data[[band, row, col]].to_string())))
			.collect();

		let mut geometry = GeometryWriter::new();
		let (x, y) = (col as f64, row as f64);
		let geom_type = match feature_type {
			FeatureType::Point => {
				geometry.move_to([to_x(x + 0.5), to_y(y + 0.5)]);
				GeomType::Point
			}
			FeatureType::Polygon => {
				let (x0, x1, y0, y1) = (to_x(x), to_x(x + 1.0), to_y(y), to_y(y + 1.0));
				geometry.ring(&[[x0, y0], [x1, y0], [x1, y1], [x0, y1]]);
				GeomType::Polygon
			}
		};
		layer.add_feature(geom_type, geometry.into_commands(), &properties);
	}

	log::trace!(
		"encoded {} {feature_type} features into layer '{layer_name}'",
		layer.features.len()
	);
	VectorTile::new(vec![layer]).to_blob()
}
