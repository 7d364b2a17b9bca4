use super::geom_type::GeomType;
use anyhow::{Context, Result, bail, ensure};
use cogtiler_core::{
	Blob,
	io::{PbfReader, PbfWriter, WIRE_LEN, WIRE_VARINT},
};

const MOVE_TO: u32 = 1;
const LINE_TO: u32 = 2;
const CLOSE_PATH: u32 = 7;

fn command(id: u32, count: u32) -> u32 {
	(id & 0x7) | (count << 3)
}

fn zigzag(value: i64) -> u32 {
	((value << 1) ^ (value >> 63)) as u32
}

fn unzigzag(value: u32) -> i64 {
	i64::from(value >> 1) ^ -i64::from(value & 1)
}

/// Builds the command integers of a feature geometry, tracking the cursor across paths.
#[derive(Debug, Default)]
pub struct GeometryWriter {
	commands: Vec<u32>,
	cursor: [i64; 2],
}

impl GeometryWriter {
	pub fn new() -> GeometryWriter {
		GeometryWriter::default()
	}

	fn push_points(&mut self, points: &[[i64; 2]]) {
		for point in points {
			self.commands.push(zigzag(point[0] - self.cursor[0]));
			self.commands.push(zigzag(point[1] - self.cursor[1]));
			self.cursor = *point;
		}
	}

	pub fn move_to(&mut self, point: [i64; 2]) {
		self.commands.push(command(MOVE_TO, 1));
		self.push_points(&[point]);
	}

	pub fn line_to(&mut self, points: &[[i64; 2]]) {
		if points.is_empty() {
			return;
		}
		self.commands.push(command(LINE_TO, points.len() as u32));
		self.push_points(points);
	}

	pub fn close_path(&mut self) {
		self.commands.push(command(CLOSE_PATH, 1));
	}

	/// A closed ring; the first point is not repeated at the end.
	pub fn ring(&mut self, points: &[[i64; 2]]) {
		if let Some((first, rest)) = points.split_first() {
			self.move_to(*first);
			self.line_to(rest);
			self.close_path();
		}
	}

	pub fn into_commands(self) -> Vec<u32> {
		self.commands
	}
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VectorTileFeature {
	pub id: Option<u64>,
	pub tag_ids: Vec<u32>,
	pub geom_type: GeomType,
	pub geometry: Vec<u32>,
}

impl VectorTileFeature {
	pub fn read(reader: &mut PbfReader<'_>) -> Result<VectorTileFeature> {
		let mut feature = VectorTileFeature::default();
		while reader.has_remaining() {
			match reader.read_key()? {
				(1, WIRE_VARINT) => feature.id = Some(reader.read_varint().context("Failed to read feature ID")?),
				(2, WIRE_LEN) => feature.tag_ids = reader.read_packed_uint32().context("Failed to read tag IDs")?,
				(3, WIRE_VARINT) => feature.geom_type = GeomType::from(reader.read_varint()?),
				(4, WIRE_LEN) => feature.geometry = reader.read_packed_uint32().context("Failed to read geometry")?,
				(f, w) => bail!("Unexpected combination of field number ({f}) and wire type ({w})"),
			}
		}
		Ok(feature)
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = PbfWriter::new();
		if let Some(id) = self.id {
			writer.write_key(1, WIRE_VARINT)?;
			writer.write_varint(id)?;
		}
		writer.write_packed_uint32_field(2, &self.tag_ids)?;
		writer.write_key(3, WIRE_VARINT)?;
		writer.write_varint(self.geom_type.as_u64())?;
		writer.write_packed_uint32_field(4, &self.geometry)?;
		Ok(writer.into_blob())
	}

	/// Decodes the command integers into absolute tile coordinates, one list per path.
	pub fn paths(&self) -> Result<Vec<Vec<[i64; 2]>>> {
		let mut paths: Vec<Vec<[i64; 2]>> = Vec::new();
		let mut cursor = [0i64; 2];
		let mut values = self.geometry.iter().copied();
		while let Some(value) = values.next() {
			let id = value & 0x7;
			let count = value >> 3;
			match id {
				MOVE_TO | LINE_TO => {
					for _ in 0..count {
						let (Some(dx), Some(dy)) = (values.next(), values.next()) else {
							bail!("geometry ends inside a command");
						};
						if id == MOVE_TO {
							paths.push(Vec::new());
						}
						cursor = [cursor[0] + unzigzag(dx), cursor[1] + unzigzag(dy)];
						let Some(path) = paths.last_mut() else {
							bail!("LineTo without a preceding MoveTo");
						};
						path.push(cursor);
					}
				}
				CLOSE_PATH => {
					ensure!(!paths.is_empty(), "ClosePath without a preceding MoveTo");
				}
				_ => bail!("unknown geometry command {id}"),
			}
		}
		Ok(paths)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn point_commands() {
		let mut writer = GeometryWriter::new();
		writer.move_to([25, 17]);
		assert_eq!(writer.into_commands(), vec![9, 50, 34]);
	}

	#[test]
	fn square_ring_commands() -> Result<()> {
		let mut writer = GeometryWriter::new();
		writer.ring(&[[16, 0], [32, 0], [32, 16], [16, 16]]);
		let feature = VectorTileFeature {
			geom_type: GeomType::Polygon,
			geometry: writer.into_commands(),
			..VectorTileFeature::default()
		};
		assert_eq!(feature.geometry, vec![9, 32, 0, 26, 32, 0, 0, 32, 31, 0, 15]);
		assert_eq!(feature.paths()?, vec![vec![[16, 0], [32, 0], [32, 16], [16, 16]]]);
		Ok(())
	}

	#[test]
	fn reads_back() -> Result<()> {
		let feature = VectorTileFeature {
			id: Some(3),
			tag_ids: vec![0, 1],
			geom_type: GeomType::Point,
			geometry: vec![9, 2, 2],
		};
		let blob = feature.to_blob()?;
		assert_eq!(VectorTileFeature::read(&mut PbfReader::new(blob.as_slice()))?, feature);
		Ok(())
	}

	#[test]
	fn truncated_geometry() {
		let feature = VectorTileFeature {
			geometry: vec![9, 2],
			..VectorTileFeature::default()
		};
		assert!(feature.paths().is_err());
	}
}
