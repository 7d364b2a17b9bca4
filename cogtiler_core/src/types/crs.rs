//! Spatial reference systems with closed-form transforms.
//!
//! Geographic WGS84 (EPSG:4326) and spherical Web Mercator (EPSG:3857) are transformed
//! directly. Any other code can be carried around, but transforming it needs a source
//! implementation with its own projection engine.

use crate::{DENSIFY_POINTS, TileError, lonlat_to_mercator, mercator_to_lonlat};
use anyhow::Result;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Crs {
	/// EPSG:4326
	#[default]
	Wgs84,
	/// EPSG:3857 and its legacy aliases
	WebMercator,
	Epsg(u32),
}

impl Crs {
	#[must_use]
	pub fn from_epsg(code: u32) -> Crs {
		match code {
			4326 => Crs::Wgs84,
			3857 | 900_913 | 3785 | 102_100 | 102_113 => Crs::WebMercator,
			other => Crs::Epsg(other),
		}
	}

	#[must_use]
	pub fn epsg(&self) -> u32 {
		match self {
			Crs::Wgs84 => 4326,
			Crs::WebMercator => 3857,
			Crs::Epsg(code) => *code,
		}
	}

	#[must_use]
	pub fn is_supported(&self) -> bool {
		!matches!(self, Crs::Epsg(_))
	}

	/// Transforms one point from `self` into `to`.
	///
	/// # Errors
	/// Fails with `SOURCE_UNREADABLE` when either system has no closed-form transform.
	pub fn transform_point(&self, to: Crs, x: f64, y: f64) -> Result<[f64; 2]> {
		use Crs::*;
		match (self, to) {
			(a, b) if *a == b => Ok([x, y]),
			(Wgs84, WebMercator) => Ok(lonlat_to_mercator(x, y)),
			(WebMercator, Wgs84) => Ok(mercator_to_lonlat(x, y)),
			(a, b) => Err(
				TileError::SourceUnreadable(format!("no transform available from {a} to {b}")).into(),
			),
		}
	}

	/// Transforms `[left, bottom, right, top]` into `to`, sampling `DENSIFY_POINTS` points
	/// along every edge and returning the envelope of all transformed samples.
	pub fn transform_bounds(&self, to: Crs, bounds: [f64; 4]) -> Result<[f64; 4]> {
		if *self == to {
			return Ok(bounds);
		}
		let mut envelope = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
		for [x, y] in densify_edges(bounds) {
			let [tx, ty] = self.transform_point(to, x, y)?;
			envelope[0] = envelope[0].min(tx);
			envelope[1] = envelope[1].min(ty);
			envelope[2] = envelope[2].max(tx);
			envelope[3] = envelope[3].max(ty);
		}
		Ok(envelope)
	}
}

/// Samples the four edges of `[left, bottom, right, top]`, corners included.
#[must_use]
pub fn densify_edges(bounds: [f64; 4]) -> Vec<[f64; 2]> {
	let [left, bottom, right, top] = bounds;
	let steps = DENSIFY_POINTS + 1;
	let mut points = Vec::with_capacity(4 * steps);
	for i in 0..steps {
		let t = i as f64 / steps as f64;
		let x = left + (right - left) * t;
		let y = bottom + (top - bottom) * t;
		points.push([x, bottom]);
		points.push([right, y]);
		points.push([right - (right - left) * t, top]);
		points.push([left, top - (top - bottom) * t]);
	}
	points
}

impl fmt::Display for Crs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EPSG:{}", self.epsg())
	}
}

impl fmt::Debug for Crs {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Crs(EPSG:{})", self.epsg())
	}
}

impl FromStr for Crs {
	type Err = anyhow::Error;

	/// Accepts `EPSG:<code>` (case-insensitive) or a bare code.
	fn from_str(text: &str) -> Result<Self> {
		let trimmed = text.trim();
		let code = trimmed
			.get(..5)
			.filter(|prefix| prefix.eq_ignore_ascii_case("epsg:"))
			.map_or(trimmed, |_| &trimmed[5..]);
		code
			.parse::<u32>()
			.map(Crs::from_epsg)
			.map_err(|_| TileError::InvalidParameter(format!("unknown spatial reference '{text}'")).into())
	}
}
