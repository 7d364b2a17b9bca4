use super::{WIRE_FIXED32, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT};
use anyhow::{Context, Result, bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};

/// Reads protobuf-encoded values from a byte slice.
pub struct PbfReader<'a> {
	cursor: Cursor<&'a [u8]>,
}

impl<'a> PbfReader<'a> {
	pub fn new(slice: &'a [u8]) -> PbfReader<'a> {
		PbfReader {
			cursor: Cursor::new(slice),
		}
	}

	fn len(&self) -> u64 {
		self.cursor.get_ref().len() as u64
	}

	pub fn has_remaining(&self) -> bool {
		self.cursor.position() < self.len()
	}

	pub fn read_varint(&mut self) -> Result<u64> {
		let mut value = 0u64;
		let mut shift = 0;
		loop {
			let byte = self.cursor.read_u8().context("Unexpected end of varint")?;
			value |= u64::from(byte & 0x7F) << shift;
			if byte & 0x80 == 0 {
				return Ok(value);
			}
			shift += 7;
			if shift >= 70 {
				bail!("Varint too long");
			}
		}
	}

	pub fn read_svarint(&mut self) -> Result<i64> {
		let value = self.read_varint()?;
		Ok(((value >> 1) as i64) ^ -((value & 1) as i64))
	}

	pub fn read_f32(&mut self) -> Result<f32> {
		Ok(self.cursor.read_f32::<LittleEndian>()?)
	}

	pub fn read_f64(&mut self) -> Result<f64> {
		Ok(self.cursor.read_f64::<LittleEndian>()?)
	}

	/// Returns `(field_number, wire_type)`.
	pub fn read_key(&mut self) -> Result<(u32, u8)> {
		let key = self.read_varint().context("Failed to read PBF key")?;
		Ok(((key >> 3) as u32, (key & 0x07) as u8))
	}

	/// Reads a length-delimited field body.
	pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
		let length = self.read_varint()?;
		let start = self.cursor.position();
		ensure!(
			start + length <= self.len(),
			"PBF field of {length} bytes exceeds the remaining {} bytes",
			self.len() - start
		);
		let slice: &'a [u8] = *self.cursor.get_ref();
		let bytes = &slice[start as usize..(start + length) as usize];
		self.cursor.set_position(start + length);
		Ok(bytes)
	}

	/// Reads a length-delimited field and returns a reader over its content.
	pub fn read_message(&mut self) -> Result<PbfReader<'a>> {
		Ok(PbfReader::new(self.read_bytes()?))
	}

	pub fn read_string(&mut self) -> Result<String> {
		String::from_utf8(self.read_bytes()?.to_vec()).context("PBF string is not valid UTF-8")
	}

	pub fn read_packed_uint32(&mut self) -> Result<Vec<u32>> {
		let mut packed = self.read_message()?;
		let mut values = Vec::new();
		while packed.has_remaining() {
			values.push(u32::try_from(packed.read_varint()?).context("packed value exceeds u32")?);
		}
		Ok(values)
	}

	/// Skips the body of a field whose key has already been read.
	pub fn skip(&mut self, wire_type: u8) -> Result<()> {
		match wire_type {
			WIRE_VARINT => {
				self.read_varint()?;
			}
			WIRE_FIXED64 => {
				self.read_f64()?;
			}
			WIRE_LEN => {
				self.read_bytes()?;
			}
			WIRE_FIXED32 => {
				let mut buffer = [0u8; 4];
				self.cursor.read_exact(&mut buffer)?;
			}
			_ => bail!("Unsupported PBF wire type {wire_type}"),
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::PbfWriter;

	#[test]
	fn varints() -> Result<()> {
		let mut reader = PbfReader::new(&[0b1010_1100, 0b10, 149, 1]);
		assert_eq!(reader.read_varint()?, 300);
		assert_eq!(reader.read_svarint()?, -75);
		assert!(!reader.has_remaining());
		Ok(())
	}

	#[test]
	fn truncated_varint_fails() {
		assert!(PbfReader::new(&[0x80]).read_varint().is_err());
	}

	#[test]
	fn fields_written_by_writer() -> Result<()> {
		let mut writer = PbfWriter::new();
		writer.write_string_field(1, "elevation")?;
		writer.write_packed_uint32_field(2, &[1, 2, 300])?;
		writer.write_key(3, WIRE_FIXED64)?;
		writer.write_f64(2.5)?;
		writer.write_key(4, WIRE_VARINT)?;
		writer.write_varint(7)?;
		let blob = writer.into_blob();

		let mut reader = PbfReader::new(blob.as_slice());
		assert_eq!(reader.read_key()?, (1, WIRE_LEN));
		assert_eq!(reader.read_string()?, "elevation");
		assert_eq!(reader.read_key()?, (2, WIRE_LEN));
		assert_eq!(reader.read_packed_uint32()?, vec![1, 2, 300]);
		assert_eq!(reader.read_key()?, (3, WIRE_FIXED64));
		assert_eq!(reader.read_f64()?, 2.5);
		let (_, wire_type) = reader.read_key()?;
		reader.skip(wire_type)?;
		assert!(!reader.has_remaining());
		Ok(())
	}

	#[test]
	fn oversized_length_is_rejected() {
		let mut reader = PbfReader::new(&[0x05, 1, 2]);
		assert!(reader.read_bytes().is_err());
	}
}
