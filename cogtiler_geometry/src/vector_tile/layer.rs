//! A single vector tile layer.
//!
//! Wire fields: 1 `name`, 2 `features`, 3 `keys`, 4 `values`, 5 `extent` (default 4096),
//! 15 `version` (default 1).

use super::{
	feature::VectorTileFeature, geom_type::GeomType, property_table::PropertyTable, value::TileValue,
};
use anyhow::{Context, Result, anyhow, bail};
use cogtiler_core::{
	Blob,
	io::{PbfReader, PbfWriter, WIRE_LEN, WIRE_VARINT},
};

#[derive(Clone, Debug, PartialEq)]
pub struct VectorTileLayer {
	pub name: String,
	pub extent: u32,
	pub version: u32,
	pub features: Vec<VectorTileFeature>,
	pub properties: PropertyTable,
}

impl VectorTileLayer {
	pub fn new(name: &str, extent: u32) -> VectorTileLayer {
		VectorTileLayer {
			name: name.to_string(),
			extent,
			version: 2,
			features: Vec::new(),
			properties: PropertyTable::default(),
		}
	}

	/// Appends a feature, interning its properties into the layer tables.
	pub fn add_feature(&mut self, geom_type: GeomType, geometry: Vec<u32>, properties: &[(String, TileValue)]) {
		let tag_ids = self.properties.encode_tags(properties);
		self.features.push(VectorTileFeature {
			id: None,
			tag_ids,
			geom_type,
			geometry,
		});
	}

	pub fn feature_properties(&self, feature: &VectorTileFeature) -> Result<Vec<(String, TileValue)>> {
		self
			.properties
			.decode_tags(&feature.tag_ids)
			.with_context(|| format!("Failed to decode feature tags of layer '{}'", self.name))
	}

	pub fn read(reader: &mut PbfReader<'_>) -> Result<VectorTileLayer> {
		let mut name = None;
		let mut layer = VectorTileLayer::new("", 4096);
		layer.version = 1;

		while reader.has_remaining() {
			match reader.read_key()? {
				(1, WIRE_LEN) => name = Some(reader.read_string().context("Failed to read layer name")?),
				(2, WIRE_LEN) => layer.features.push(
					VectorTileFeature::read(&mut reader.read_message()?).context("Failed to read feature")?,
				),
				(3, WIRE_LEN) => layer.properties.keys.push(reader.read_string().context("Failed to read key")?),
				(4, WIRE_LEN) => layer
					.properties
					.values
					.push(TileValue::read(&mut reader.read_message()?).context("Failed to read value")?),
				(5, WIRE_VARINT) => layer.extent = u32::try_from(reader.read_varint()?)?,
				(15, WIRE_VARINT) => layer.version = u32::try_from(reader.read_varint()?)?,
				(f, w) => bail!("Unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}

		layer.name = name.ok_or_else(|| anyhow!("Layer name is required"))?;
		Ok(layer)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = PbfWriter::new();
		writer.write_key(15, WIRE_VARINT)?;
		writer.write_varint(u64::from(self.version))?;
		writer.write_string_field(1, &self.name)?;
		for feature in &self.features {
			writer.write_message_field(2, &feature.to_blob()?)?;
		}
		for key in self.properties.keys.iter() {
			writer.write_string_field(3, key)?;
		}
		for value in self.properties.values.iter() {
			writer.write_message_field(4, &value.to_blob()?)?;
		}
		writer.write_key(5, WIRE_VARINT)?;
		writer.write_varint(u64::from(self.extent))?;
		Ok(writer.into_blob())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn reads_back() -> Result<()> {
		let mut layer = VectorTileLayer::new("cogeo", 4096);
		layer.add_feature(GeomType::Point, vec![9, 2, 2], &[("band1".into(), "1.5".into())]);
		layer.add_feature(GeomType::Point, vec![9, 4, 2], &[("band1".into(), "1.5".into())]);

		let blob = layer.to_blob()?;
		let read = VectorTileLayer::read(&mut PbfReader::new(blob.as_slice()))?;
		assert_eq!(read, layer);
		assert_eq!(read.properties.values.len(), 1);
		assert_eq!(
			read.feature_properties(&read.features[1])?,
			vec![("band1".to_string(), TileValue::from("1.5"))]
		);
		Ok(())
	}

	#[test]
	fn name_is_required() {
		let mut writer = PbfWriter::new();
		writer.write_key(5, WIRE_VARINT).unwrap();
		writer.write_varint(512).unwrap();
		let blob = writer.into_blob();
		assert!(VectorTileLayer::read(&mut PbfReader::new(blob.as_slice())).is_err());
	}
}
