use super::layer::VectorTileLayer;
use anyhow::{Context, Result, bail};
use cogtiler_core::{
	Blob,
	io::{PbfReader, PbfWriter, WIRE_LEN},
};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTile {
	pub layers: Vec<VectorTileLayer>,
}

impl VectorTile {
	pub fn new(layers: Vec<VectorTileLayer>) -> VectorTile {
		VectorTile { layers }
	}

	pub fn from_blob(blob: &Blob) -> Result<VectorTile> {
		let mut reader = PbfReader::new(blob.as_slice());
		let mut tile = VectorTile::default();
		while reader.has_remaining() {
			match reader.read_key()? {
				(3, WIRE_LEN) => tile
					.layers
					.push(VectorTileLayer::read(&mut reader.read_message()?).context("Failed to read VectorTileLayer")?),
				(f, w) => bail!("Unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}
		Ok(tile)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = PbfWriter::new();
		for layer in &self.layers {
			writer
				.write_message_field(3, &layer.to_blob()?)
				.with_context(|| format!("Failed to write layer '{}'", layer.name))?;
		}
		Ok(writer.into_blob())
	}

	pub fn find_layer(&self, name: &str) -> Option<&VectorTileLayer> {
		self.layers.iter().find(|layer| layer.name == name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vector_tile::GeomType;

	#[test]
	fn from_to_blob() -> Result<()> {
		let mut layer = VectorTileLayer::new("cogeo", 4096);
		layer.add_feature(GeomType::Point, vec![9, 2, 2], &[]);
		let tile = VectorTile::new(vec![layer, VectorTileLayer::new("empty", 512)]);

		let read = VectorTile::from_blob(&tile.to_blob()?)?;
		assert_eq!(read, tile);
		assert!(read.find_layer("empty").is_some());
		assert!(read.find_layer("missing").is_none());
		Ok(())
	}

	#[test]
	fn rejects_garbage() {
		assert!(VectorTile::from_blob(&Blob::from(vec![0x08, 0x01])).is_err());
	}
}
