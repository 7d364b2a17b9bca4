use crate::TileError;
use anyhow::Result;
use std::{fmt, str::FromStr};

/// A nodata sentinel. `NaN` is its own variant because it never compares equal to itself.
#[derive(Clone, Copy, PartialEq)]
pub enum Nodata {
	Value(f64),
	Nan,
}

impl Nodata {
	#[must_use]
	pub fn from_f64(value: f64) -> Nodata {
		if value.is_nan() { Nodata::Nan } else { Nodata::Value(value) }
	}

	/// `true` if `value` equals this sentinel.
	#[must_use]
	pub fn matches(&self, value: f64) -> bool {
		match self {
			Nodata::Value(nodata) => value == *nodata,
			Nodata::Nan => value.is_nan(),
		}
	}

	#[must_use]
	pub fn as_f64(&self) -> f64 {
		match self {
			Nodata::Value(value) => *value,
			Nodata::Nan => f64::NAN,
		}
	}

	/// An explicit override wins over the source's embedded value.
	#[must_use]
	pub fn resolve(overridden: Option<Nodata>, embedded: Option<Nodata>) -> Option<Nodata> {
		overridden.or(embedded)
	}
}

impl FromStr for Nodata {
	type Err = anyhow::Error;

	/// Parses `nan` (any case) or a decimal number.
	fn from_str(text: &str) -> Result<Self> {
		let text = text.trim();
		if text.eq_ignore_ascii_case("nan") {
			return Ok(Nodata::Nan);
		}
		text
			.parse::<f64>()
			.map(Nodata::from_f64)
			.map_err(|_| TileError::InvalidParameter(format!("invalid nodata value '{text}'")).into())
	}
}

impl fmt::Debug for Nodata {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Nodata::Value(value) => write!(f, "Nodata({value})"),
			Nodata::Nan => write!(f, "Nodata(nan)"),
		}
	}
}
