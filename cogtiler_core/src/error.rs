//! Typed failures with a stable, machine-readable kind.
//!
//! Everything in cogtiler returns [`anyhow::Result`]. Failures that the request boundary
//! has to tell apart are raised as a [`TileError`], so that [`error_kind`] can recover the
//! kind no matter how much context was layered on top of it.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failures surfaced to callers of the tiling engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TileError {
	/// A source cannot be opened or its spatial reference cannot be determined.
	#[error("source unreadable: {0}")]
	SourceUnreadable(String),

	/// The requested window does not intersect the source.
	#[error("out of bounds: {0}")]
	OutOfBounds(String),

	/// A requested band index does not exist in the source.
	#[error("invalid band: {0}")]
	InvalidBand(String),

	/// A bbox or coordinate pair is malformed.
	#[error("invalid geometry: {0}")]
	InvalidGeometry(String),

	/// An option string (format, policy, colormap, color formula, ...) cannot be parsed.
	#[error("invalid parameter: {0}")]
	InvalidParameter(String),

	/// The computation produced no valid pixels.
	#[error("empty result: {0}")]
	EmptyResult(String),
}

impl TileError {
	#[must_use]
	pub fn kind(&self) -> ErrorKind {
		match self {
			TileError::SourceUnreadable(_) => ErrorKind::SourceUnreadable,
			TileError::OutOfBounds(_) => ErrorKind::OutOfBounds,
			TileError::InvalidBand(_) => ErrorKind::InvalidBand,
			TileError::InvalidGeometry(_) => ErrorKind::InvalidGeometry,
			TileError::InvalidParameter(_) => ErrorKind::InvalidParameter,
			TileError::EmptyResult(_) => ErrorKind::EmptyResult,
		}
	}
}

/// Stable error kinds, serialized in SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
	SourceUnreadable,
	OutOfBounds,
	InvalidBand,
	InvalidGeometry,
	InvalidParameter,
	EmptyResult,
}

impl ErrorKind {
	#[must_use]
	pub fn as_str(&self) -> &'static str {
		match self {
			ErrorKind::SourceUnreadable => "SOURCE_UNREADABLE",
			ErrorKind::OutOfBounds => "OUT_OF_BOUNDS",
			ErrorKind::InvalidBand => "INVALID_BAND",
			ErrorKind::InvalidGeometry => "INVALID_GEOMETRY",
			ErrorKind::InvalidParameter => "INVALID_PARAMETER",
			ErrorKind::EmptyResult => "EMPTY_RESULT",
		}
	}
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Finds the first [`TileError`] in the chain of `error` and returns its kind.
#[must_use]
pub fn error_kind(error: &anyhow::Error) -> Option<ErrorKind> {
	error
		.chain()
		.find_map(|cause| cause.downcast_ref::<TileError>())
		.map(TileError::kind)
}
