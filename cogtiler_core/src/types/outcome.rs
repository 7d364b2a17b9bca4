use crate::TileError;
use anyhow::Result;

/// The result of a computation that may legitimately produce no data.
///
/// Combined with [`anyhow::Result`] this gives the three-way
/// `Data | Empty | Error(kind)` outcome of tile, mosaic and area requests.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
	Data(T),
	Empty,
}

impl<T> Outcome<T> {
	pub fn is_empty(&self) -> bool {
		matches!(self, Outcome::Empty)
	}

	pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
		match self {
			Outcome::Data(value) => Outcome::Data(f(value)),
			Outcome::Empty => Outcome::Empty,
		}
	}

	/// Like [`map`](Self::map), but for fallible transformations.
	pub fn try_map<U, F: FnOnce(T) -> Result<U>>(self, f: F) -> Result<Outcome<U>> {
		Ok(match self {
			Outcome::Data(value) => Outcome::Data(f(value)?),
			Outcome::Empty => Outcome::Empty,
		})
	}

	pub fn into_option(self) -> Option<T> {
		match self {
			Outcome::Data(value) => Some(value),
			Outcome::Empty => None,
		}
	}

	/// Turns [`Outcome::Empty`] into an `EMPTY_RESULT` error carrying `message`.
	pub fn or_empty_error(self, message: &str) -> Result<T> {
		match self {
			Outcome::Data(value) => Ok(value),
			Outcome::Empty => Err(TileError::EmptyResult(message.to_string()).into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ErrorKind, error_kind};

	#[test]
	fn map_and_option() {
		assert_eq!(Outcome::Data(2).map(|v| v * 3), Outcome::Data(6));
		assert_eq!(Outcome::<i32>::Empty.map(|v| v * 3), Outcome::Empty);
		assert_eq!(Outcome::Data(1).into_option(), Some(1));
		assert!(Outcome::<u8>::Empty.is_empty());
	}

	#[test]
	fn empty_becomes_typed_error() {
		let error = Outcome::<u8>::Empty.or_empty_error("no pixels").unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::EmptyResult));
		assert_eq!(error.to_string(), "empty result: no pixels");
	}
}
