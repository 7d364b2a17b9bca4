//! Parsing of the comma-separated strings a routing layer receives into typed values.
//!
//! Every string is parsed once, here, so the engine only ever sees typed options.

use anyhow::Result;
use cogtiler_core::{BandSelection, Nodata, TileError};

fn split_numbers(text: &str) -> Option<Vec<f64>> {
	text.split(',').map(|part| part.trim().parse::<f64>().ok()).collect()
}

/// `"1,2,3"` → 1-based band indexes.
pub fn parse_indexes(text: &str) -> Result<BandSelection> {
	let indexes: Option<Vec<usize>> = text.split(',').map(|part| part.trim().parse::<usize>().ok()).collect();
	match indexes {
		Some(indexes) if indexes.iter().all(|&index| index > 0) => Ok(BandSelection(indexes)),
		_ => Err(TileError::InvalidBand(format!("invalid band indexes '{text}'")).into()),
	}
}

/// `"nan"` or a number.
pub fn parse_nodata(text: &str) -> Result<Nodata> {
	text.parse()
}

/// `"min,max"`, e.g. a rescale range or a histogram range.
pub fn parse_range(text: &str) -> Result<[f64; 2]> {
	match split_numbers(text).as_deref() {
		Some(&[min, max]) if min.is_finite() && max.is_finite() => Ok([min, max]),
		_ => Err(TileError::InvalidParameter(format!("invalid range '{text}', expected 'min,max'")).into()),
	}
}

/// `"left,bottom,right,top"`.
pub fn parse_bbox(text: &str) -> Result<[f64; 4]> {
	match split_numbers(text).as_deref() {
		Some(&[left, bottom, right, top]) if [left, bottom, right, top].iter().all(|v| v.is_finite()) => {
			Ok([left, bottom, right, top])
		}
		_ => Err(TileError::InvalidGeometry(format!(
			"invalid bbox '{text}', expected four numbers 'left,bottom,right,top'"
		))
		.into()),
	}
}

/// `"lon,lat"`.
pub fn parse_coordinates(text: &str) -> Result<[f64; 2]> {
	match split_numbers(text).as_deref() {
		Some(&[lon, lat]) if lon.is_finite() && lat.is_finite() => Ok([lon, lat]),
		_ => Err(TileError::InvalidGeometry(format!("invalid coordinates '{text}', expected 'lon,lat'")).into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use cogtiler_core::{ErrorKind, error_kind};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	#[test]
	fn indexes() {
		assert_eq!(parse_indexes("1, 2,3").unwrap(), BandSelection(vec![1, 2, 3]));
		for text in ["", "0", "1,x", "-1"] {
			assert_eq!(
				error_kind(&parse_indexes(text).unwrap_err()),
				Some(ErrorKind::InvalidBand),
				"{text}"
			);
		}
	}

	#[test]
	fn nodata() {
		assert_eq!(parse_nodata("NaN").unwrap(), Nodata::Nan);
		assert_eq!(parse_nodata("-9999").unwrap(), Nodata::Value(-9999.0));
		assert!(parse_nodata("none").is_err());
	}

	#[rstest]
	#[case("0,1000", Some([0.0, 1000.0]))]
	#[case(" -1.5 , 2e3", Some([-1.5, 2000.0]))]
	#[case("0", None)]
	#[case("0,1,2", None)]
	#[case("0,inf", None)]
	fn ranges(#[case] text: &str, #[case] expected: Option<[f64; 2]>) {
		match expected {
			Some(range) => assert_eq!(parse_range(text).unwrap(), range),
			None => assert_eq!(
				error_kind(&parse_range(text).unwrap_err()),
				Some(ErrorKind::InvalidParameter)
			),
		}
	}

	#[rstest]
	#[case("1,2,3")]
	#[case("1,2,3,4,5")]
	#[case("a,b,c,d")]
	#[case("0,0,nan,1")]
	fn bad_bboxes(#[case] text: &str) {
		assert_eq!(
			error_kind(&parse_bbox(text).unwrap_err()),
			Some(ErrorKind::InvalidGeometry)
		);
	}

	#[test]
	fn bbox_and_coordinates() {
		assert_eq!(parse_bbox("-10,-5,10,5").unwrap(), [-10.0, -5.0, 10.0, 5.0]);
		assert_eq!(parse_coordinates("13.4,52.5").unwrap(), [13.4, 52.5]);
		assert_eq!(
			error_kind(&parse_coordinates("13.4").unwrap_err()),
			Some(ErrorKind::InvalidGeometry)
		);
	}
}
