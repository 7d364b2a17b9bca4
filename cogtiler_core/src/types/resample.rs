//! Resampling algorithms used when warping a source onto a target grid.
//!
//! - `Nearest`: picks the closest source pixel (no smoothing, keeps classified values).
//! - `Bilinear`: interpolates a 2×2 neighbourhood.
//! - `Cubic`: cubic convolution over a 4×4 neighbourhood.
//! - `Average`: mean of all source samples falling into the target pixel.

use crate::TileError;
use anyhow::Result;
use serde::Deserialize;
use std::{fmt, str::FromStr};

/// Defaults to [`ResampleAlg::Nearest`], which is what tile reads use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleAlg {
	#[default]
	Nearest,
	Bilinear,
	Cubic,
	Average,
}

impl ResampleAlg {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			ResampleAlg::Nearest => "nearest",
			ResampleAlg::Bilinear => "bilinear",
			ResampleAlg::Cubic => "cubic",
			ResampleAlg::Average => "average",
		}
	}
}

impl FromStr for ResampleAlg {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().to_ascii_lowercase().as_str() {
			"nearest" | "near" => ResampleAlg::Nearest,
			"bilinear" => ResampleAlg::Bilinear,
			"cubic" => ResampleAlg::Cubic,
			"average" => ResampleAlg::Average,
			other => return Err(TileError::InvalidParameter(format!("unknown resampling method '{other}'")).into()),
		})
	}
}

impl fmt::Display for ResampleAlg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
