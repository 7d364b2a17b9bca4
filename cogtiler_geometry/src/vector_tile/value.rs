use anyhow::{Context, Result, anyhow, bail};
use cogtiler_core::{
	Blob,
	io::{PbfReader, PbfWriter, WIRE_FIXED32, WIRE_FIXED64, WIRE_LEN, WIRE_VARINT},
};
use std::{
	fmt,
	hash::{Hash, Hasher},
};

/// A typed property value of a vector tile layer.
#[derive(Clone, Debug)]
pub enum TileValue {
	String(String),
	Float(f32),
	Double(f64),
	Int(i64),
	UInt(u64),
	Bool(bool),
}

impl TileValue {
	pub fn read(reader: &mut PbfReader<'_>) -> Result<TileValue> {
		let mut value = None;
		while reader.has_remaining() {
			value = Some(match reader.read_key()? {
				(1, WIRE_LEN) => TileValue::String(reader.read_string().context("Failed to read string value")?),
				(2, WIRE_FIXED32) => TileValue::Float(reader.read_f32()?),
				(3, WIRE_FIXED64) => TileValue::Double(reader.read_f64()?),
				(4, WIRE_VARINT) => TileValue::Int(reader.read_varint()? as i64),
				(5, WIRE_VARINT) => TileValue::UInt(reader.read_varint()?),
				(6, WIRE_VARINT) => TileValue::Int(reader.read_svarint()?),
				(7, WIRE_VARINT) => TileValue::Bool(reader.read_varint()? != 0),
				(f, w) => bail!("Unexpected combination of field number ({f}) and wire type ({w})"),
			});
		}
		value.ok_or_else(|| anyhow!("Property value message is empty"))
	}

	pub fn to_blob(&self) -> Result<Blob> {
		let mut writer = PbfWriter::new();
		match self {
			TileValue::String(text) => writer.write_string_field(1, text)?,
			TileValue::Float(value) => {
				writer.write_key(2, WIRE_FIXED32)?;
				writer.write_f32(*value)?;
			}
			TileValue::Double(value) => {
				writer.write_key(3, WIRE_FIXED64)?;
				writer.write_f64(*value)?;
			}
			TileValue::UInt(value) => {
				writer.write_key(5, WIRE_VARINT)?;
				writer.write_varint(*value)?;
			}
			TileValue::Int(value) => {
				writer.write_key(6, WIRE_VARINT)?;
				writer.write_svarint(*value)?;
			}
			TileValue::Bool(value) => {
				writer.write_key(7, WIRE_VARINT)?;
				writer.write_varint(u64::from(*value))?;
			}
		}
		Ok(writer.into_blob())
	}
}

// Floats compare by bit pattern so that values can be deduplicated in a hash map.
impl PartialEq for TileValue {
	fn eq(&self, other: &Self) -> bool {
		use TileValue::*;
		match (self, other) {
			(String(a), String(b)) => a == b,
			(Float(a), Float(b)) => a.to_bits() == b.to_bits(),
			(Double(a), Double(b)) => a.to_bits() == b.to_bits(),
			(Int(a), Int(b)) => a == b,
			(UInt(a), UInt(b)) => a == b,
			(Bool(a), Bool(b)) => a == b,
			_ => false,
		}
	}
}

impl Eq for TileValue {}

impl Hash for TileValue {
	fn hash<H: Hasher>(&self, state: &mut H) {
		use TileValue::*;
		std::mem::discriminant(self).hash(state);
		match self {
			String(v) => v.hash(state),
			Float(v) => v.to_bits().hash(state),
			Double(v) => v.to_bits().hash(state),
			Int(v) => v.hash(state),
			UInt(v) => v.hash(state),
			Bool(v) => v.hash(state),
		}
	}
}

impl fmt::Display for TileValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TileValue::String(v) => f.write_str(v),
			TileValue::Float(v) => write!(f, "{v}"),
			TileValue::Double(v) => write!(f, "{v}"),
			TileValue::Int(v) => write!(f, "{v}"),
			TileValue::UInt(v) => write!(f, "{v}"),
			TileValue::Bool(v) => write!(f, "{v}"),
		}
	}
}

impl From<&str> for TileValue {
	fn from(value: &str) -> Self {
		TileValue::String(value.to_string())
	}
}

impl From<String> for TileValue {
	fn from(value: String) -> Self {
		TileValue::String(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	#[test]
	fn string_wire_format() -> Result<()> {
		let blob = TileValue::from("hello").to_blob()?;
		assert_eq!(blob.as_slice(), &[0x0A, 0x05, b'h', b'e', b'l', b'l', b'o']);
		Ok(())
	}

	#[test]
	fn negative_int_uses_zigzag() -> Result<()> {
		assert_eq!(TileValue::Int(-1).to_blob()?.as_slice(), &[0x30, 0x01]);
		Ok(())
	}

	#[rstest]
	#[case(TileValue::from("band1"))]
	#[case(TileValue::Float(1.5))]
	#[case(TileValue::Double(-0.25))]
	#[case(TileValue::Int(-42))]
	#[case(TileValue::UInt(42))]
	#[case(TileValue::Bool(true))]
	fn reads_back(#[case] value: TileValue) -> Result<()> {
		let blob = value.to_blob()?;
		assert_eq!(TileValue::read(&mut PbfReader::new(blob.as_slice()))?, value);
		Ok(())
	}

	#[test]
	fn empty_message_fails() {
		assert!(TileValue::read(&mut PbfReader::new(&[])).is_err());
	}
}
