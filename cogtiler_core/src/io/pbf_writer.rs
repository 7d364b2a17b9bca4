use super::WIRE_LEN;
use crate::Blob;
use anyhow::{Context, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{Cursor, Write};

/// Appends protobuf-encoded values to an in-memory buffer.
///
/// ```
/// use cogtiler_core::io::PbfWriter;
///
/// let mut writer = PbfWriter::new();
/// writer.write_varint(300).unwrap();
/// assert_eq!(writer.into_blob().into_vec(), vec![0b1010_1100, 0b0000_0010]);
/// ```
#[derive(Default)]
pub struct PbfWriter {
	cursor: Cursor<Vec<u8>>,
}

impl PbfWriter {
	pub fn new() -> PbfWriter {
		PbfWriter::default()
	}

	pub fn is_empty(&self) -> bool {
		self.cursor.get_ref().is_empty()
	}

	pub fn into_blob(self) -> Blob {
		Blob::from(self.cursor.into_inner())
	}

	pub fn write_varint(&mut self, mut value: u64) -> Result<()> {
		while value >= 0x80 {
			self.cursor.write_u8(((value & 0x7F) as u8) | 0x80)?;
			value >>= 7;
		}
		self.cursor.write_u8(value as u8)?;
		Ok(())
	}

	/// Zigzag-encodes `value` so that small negative numbers stay short.
	pub fn write_svarint(&mut self, value: i64) -> Result<()> {
		self.write_varint(((value << 1) ^ (value >> 63)) as u64)
	}

	pub fn write_f32(&mut self, value: f32) -> Result<()> {
		Ok(self.cursor.write_f32::<LittleEndian>(value)?)
	}

	pub fn write_f64(&mut self, value: f64) -> Result<()> {
		Ok(self.cursor.write_f64::<LittleEndian>(value)?)
	}

	pub fn write_key(&mut self, field_number: u32, wire_type: u8) -> Result<()> {
		self
			.write_varint((u64::from(field_number) << 3) | u64::from(wire_type))
			.context("Failed to write PBF key")
	}

	/// Writes a length-delimited field, key included.
	pub fn write_bytes_field(&mut self, field_number: u32, bytes: &[u8]) -> Result<()> {
		self.write_key(field_number, WIRE_LEN)?;
		self.write_varint(bytes.len() as u64)?;
		self.cursor.write_all(bytes).context("Failed to write PBF bytes")
	}

	pub fn write_string_field(&mut self, field_number: u32, text: &str) -> Result<()> {
		self.write_bytes_field(field_number, text.as_bytes())
	}

	/// Writes an embedded message, prefixed by key and length.
	pub fn write_message_field(&mut self, field_number: u32, message: &Blob) -> Result<()> {
		self.write_bytes_field(field_number, message.as_slice())
	}

	/// Writes a packed repeated `uint32` field. Nothing is written for an empty slice.
	pub fn write_packed_uint32_field(&mut self, field_number: u32, values: &[u32]) -> Result<()> {
		if values.is_empty() {
			return Ok(());
		}
		let mut packed = PbfWriter::new();
		for &value in values {
			packed.write_varint(u64::from(value))?;
		}
		self
			.write_message_field(field_number, &packed.into_blob())
			.context("Failed to write packed uint32 field")
	}
}
