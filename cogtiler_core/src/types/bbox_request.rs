use crate::{Crs, TileError};
use anyhow::Result;

/// A bounding box `[left, bottom, right, top]` in an arbitrary reference system.
///
/// Only finiteness is checked. Degenerate or inverted boxes are accepted and simply read
/// no data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBoxRequest {
	pub bounds: [f64; 4],
	pub crs: Crs,
}

impl BBoxRequest {
	pub fn new(bounds: [f64; 4], crs: Crs) -> Result<BBoxRequest> {
		if let Some(value) = bounds.iter().find(|v| !v.is_finite()) {
			return Err(TileError::InvalidGeometry(format!("bbox value {value} is not finite")).into());
		}
		Ok(BBoxRequest { bounds, crs })
	}

	/// A request in geographic coordinates (EPSG:4326).
	pub fn wgs84(bounds: [f64; 4]) -> Result<BBoxRequest> {
		BBoxRequest::new(bounds, Crs::Wgs84)
	}

	pub fn is_degenerate(&self) -> bool {
		let [left, bottom, right, top] = self.bounds;
		left >= right || bottom >= top
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ErrorKind, error_kind};

	#[test]
	fn accepts_inverted_boxes() {
		let request = BBoxRequest::wgs84([10.0, 0.0, -10.0, 5.0]).unwrap();
		assert!(request.is_degenerate());
		assert_eq!(request.crs, Crs::Wgs84);
	}

	#[test]
	fn rejects_non_finite_values() {
		let error = BBoxRequest::new([0.0, f64::NAN, 1.0, 1.0], Crs::WebMercator).unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidGeometry));
	}
}
