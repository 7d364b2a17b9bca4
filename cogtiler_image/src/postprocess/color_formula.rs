//! rio-color style color formulas such as `gamma rgb 1.5, sigmoidal rgb 10 0.15, saturation 1.2`.
//!
//! Operations work on values scaled to `0.0..=1.0`. `gamma` and `sigmoidal` name the bands
//! they touch (`r`, `g`, `b` or `1`, `2`, `3`, in any mix); `saturation` always works on the
//! first three bands as RGB.

use anyhow::Result;
use cogtiler_core::{PixelBlock, TileError};
use ndarray::{Array3, Axis};
use std::{fmt, str::FromStr};

const EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq)]
pub enum ColorOperation {
	/// `value^(1/g)` on the given 0-based bands.
	Gamma { bands: Vec<usize>, g: f64 },
	/// Sigmoidal contrast around `bias` on the given 0-based bands.
	Sigmoidal { bands: Vec<usize>, contrast: f64, bias: f64 },
	/// Scales the chroma of RGB in the LCh color space.
	Saturation { proportion: f64 },
}

fn invalid(message: String) -> anyhow::Error {
	TileError::InvalidParameter(message).into()
}

fn parse_bands(text: &str) -> Result<Vec<usize>> {
	let mut bands = Vec::new();
	for c in text.chars() {
		let band = match c.to_ascii_lowercase() {
			'r' | '1' => 0,
			'g' | '2' => 1,
			'b' | '3' => 2,
			_ => return Err(invalid(format!("invalid band '{c}' in color formula"))),
		};
		if !bands.contains(&band) {
			bands.push(band);
		}
	}
	Ok(bands)
}

fn parse_args(name: &str, args: &[&str], expected: usize) -> Result<Vec<f64>> {
	if args.len() != expected {
		return Err(invalid(format!(
			"{name} takes {expected} numeric argument(s), got {}",
			args.len()
		)));
	}
	args
		.iter()
		.map(|arg| {
			arg
				.parse::<f64>()
				.ok()
				.filter(|v| v.is_finite())
				.ok_or_else(|| invalid(format!("invalid {name} argument '{arg}'")))
		})
		.collect()
}

impl ColorOperation {
	fn from_tokens(tokens: &[&str]) -> Result<ColorOperation> {
		let (name, rest) = tokens
			.split_first()
			.ok_or_else(|| invalid("empty color operation".to_string()))?;
		match *name {
			"gamma" | "sigmoidal" => {
				let (bands, args) = rest
					.split_first()
					.ok_or_else(|| invalid(format!("{name} needs a band list")))?;
				let bands = parse_bands(bands)?;
				if *name == "gamma" {
					let g = parse_args(name, args, 1)?[0];
					if g <= 0.0 {
						return Err(invalid("gamma must be greater than 0".to_string()));
					}
					Ok(ColorOperation::Gamma { bands, g })
				} else {
					let args = parse_args(name, args, 2)?;
					let (contrast, bias) = (args[0], args[1]);
					if !(-EPSILON..=1.0 + EPSILON).contains(&bias) {
						return Err(invalid("sigmoidal bias must be between 0 and 1".to_string()));
					}
					Ok(ColorOperation::Sigmoidal { bands, contrast, bias })
				}
			}
			"saturation" => {
				let proportion = parse_args(name, rest, 1)?[0];
				Ok(ColorOperation::Saturation { proportion })
			}
			other => Err(invalid(format!("'{other}' is not a valid color operation"))),
		}
	}

	/// Parses a whole formula into its operations, in order. Commas are optional.
	pub fn parse_formula(formula: &str) -> Result<Vec<ColorOperation>> {
		let lower = formula.to_ascii_lowercase().replace(',', " ");
		let mut groups: Vec<Vec<&str>> = Vec::new();
		for token in lower.split_whitespace() {
			match groups.last_mut() {
				Some(group) if !matches!(token, "gamma" | "sigmoidal" | "saturation") => group.push(token),
				_ => groups.push(vec![token]),
			}
		}
		groups.iter().map(|tokens| ColorOperation::from_tokens(tokens)).collect()
	}

	/// Applies the operation to `(bands, rows, cols)` values in `0.0..=1.0`.
	fn apply(&self, data: &mut Array3<f64>) -> Result<()> {
		let band_count = data.dim().0;
		let check = |bands: &[usize]| -> Result<()> {
			match bands.iter().find(|&&b| b >= band_count) {
				Some(b) => Err(TileError::InvalidBand(format!(
					"color formula uses band {} of a {band_count}-band tile",
					b + 1
				))
				.into()),
				None => Ok(()),
			}
		};
		match self {
			ColorOperation::Gamma { bands, g } => {
				check(bands)?;
				for &band in bands {
					data.index_axis_mut(Axis(0), band).mapv_inplace(|v| v.powf(1.0 / g));
				}
			}
			ColorOperation::Sigmoidal { bands, contrast, bias } => {
				check(bands)?;
				for &band in bands {
					data
						.index_axis_mut(Axis(0), band)
						.mapv_inplace(|v| sigmoidal(v, *contrast, *bias));
				}
			}
			ColorOperation::Saturation { proportion } => {
				check(&[0, 1, 2])?;
				let (_, rows, cols) = data.dim();
				for row in 0..rows {
					for col in 0..cols {
						let rgb = [data[[0, row, col]], data[[1, row, col]], data[[2, row, col]]];
						let [r, g, b] = saturate(rgb, *proportion);
						data[[0, row, col]] = r;
						data[[1, row, col]] = g;
						data[[2, row, col]] = b;
					}
				}
			}
		}
		Ok(())
	}
}

impl FromStr for ColorOperation {
	type Err = anyhow::Error;

	/// Parses exactly one operation.
	fn from_str(text: &str) -> Result<Self> {
		let mut operations = ColorOperation::parse_formula(text)?;
		match operations.len() {
			1 => Ok(operations.remove(0)),
			n => Err(invalid(format!("expected one color operation, got {n}"))),
		}
	}
}

impl fmt::Display for ColorOperation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let bands = |bands: &[usize]| bands.iter().map(|b| ['r', 'g', 'b'][*b]).collect::<String>();
		match self {
			ColorOperation::Gamma { bands: b, g } => write!(f, "gamma {} {g}", bands(b)),
			ColorOperation::Sigmoidal { bands: b, contrast, bias } => {
				write!(f, "sigmoidal {} {contrast} {bias}", bands(b))
			}
			ColorOperation::Saturation { proportion } => write!(f, "saturation {proportion}"),
		}
	}
}

/// Sigmoidal contrast stretch: `contrast` sets the slope, `bias` the midpoint.
fn sigmoidal(value: f64, contrast: f64, bias: f64) -> f64 {
	if contrast == 0.0 {
		return value;
	}
	let logistic = |x: f64| 1.0 / (1.0 + x.exp());
	if contrast > 0.0 {
		let numerator = logistic(contrast * (bias - value)) - logistic(contrast * bias);
		let denominator = logistic(contrast * (bias - 1.0)) - logistic(contrast * bias);
		numerator / denominator
	} else {
		let low = logistic(contrast * bias);
		let high = logistic(contrast * bias - contrast);
		let inner = value * high - value * low + low;
		(contrast * bias - (1.0 / inner - 1.0).ln()) / contrast
	}
}

// sRGB (D65) <-> CIE LCh conversions for the saturation operation.

const WHITE: [f64; 3] = [0.95047, 1.0, 1.08883];

fn srgb_to_linear(c: f64) -> f64 {
	if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
}

fn linear_to_srgb(c: f64) -> f64 {
	if c <= 0.0031308 {
		c * 12.92
	} else {
		1.055 * c.powf(1.0 / 2.4) - 0.055
	}
}

fn lab_f(t: f64) -> f64 {
	const DELTA: f64 = 6.0 / 29.0;
	if t > DELTA.powi(3) {
		t.cbrt()
	} else {
		t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
	}
}

fn lab_f_inv(t: f64) -> f64 {
	const DELTA: f64 = 6.0 / 29.0;
	if t > DELTA { t.powi(3) } else { 3.0 * DELTA * DELTA * (t - 4.0 / 29.0) }
}

fn rgb_to_lab(rgb: [f64; 3]) -> [f64; 3] {
	let [r, g, b] = rgb.map(srgb_to_linear);
	let x = 0.4124564 * r + 0.3575761 * g + 0.1804375 * b;
	let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
	let z = 0.0193339 * r + 0.1191920 * g + 0.9503041 * b;
	let [fx, fy, fz] = [x / WHITE[0], y / WHITE[1], z / WHITE[2]].map(lab_f);
	[116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn lab_to_rgb(lab: [f64; 3]) -> [f64; 3] {
	let [l, a, b] = lab;
	let fy = (l + 16.0) / 116.0;
	let x = WHITE[0] * lab_f_inv(fy + a / 500.0);
	let y = WHITE[1] * lab_f_inv(fy);
	let z = WHITE[2] * lab_f_inv(fy - b / 200.0);
	let r = 3.2404542 * x - 1.5371385 * y - 0.4985314 * z;
	let g = -0.9692660 * x + 1.8760108 * y + 0.0415560 * z;
	let b = 0.0556434 * x - 0.2040259 * y + 1.0572252 * z;
	[r, g, b].map(|c| linear_to_srgb(c.max(0.0)).clamp(0.0, 1.0))
}

/// Multiplies the chroma of an sRGB color by `proportion`, keeping lightness and hue.
fn saturate(rgb: [f64; 3], proportion: f64) -> [f64; 3] {
	let [l, a, b] = rgb_to_lab(rgb);
	let chroma = a.hypot(b) * proportion;
	let hue = b.atan2(a);
	lab_to_rgb([l, chroma * hue.cos(), chroma * hue.sin()])
}

/// Runs `operations` on an 8-bit block: values are scaled to `0..=1`, transformed in order and
/// scaled back, truncating fractions.
pub fn apply_color_formula(block: &PixelBlock<u8>, operations: &[ColorOperation]) -> Result<PixelBlock<u8>> {
	let mut data = block.data().mapv(|v| f64::from(v) / 255.0);
	for operation in operations {
		operation.apply(&mut data)?;
	}
	PixelBlock::new(
		data.mapv(|v| (v.clamp(0.0, 1.0) * 255.0) as u8),
		block.mask().clone(),
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_abs_diff_eq;
	use cogtiler_core::{ErrorKind, error_kind};
	use ndarray::{Array2, array};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	#[test]
	fn parses_formulas() -> Result<()> {
		let operations = ColorOperation::parse_formula("Gamma RGB 1.5, sigmoidal 13 10 0.15 saturation 1.2")?;
		assert_eq!(
			operations,
			vec![
				ColorOperation::Gamma {
					bands: vec![0, 1, 2],
					g: 1.5
				},
				ColorOperation::Sigmoidal {
					bands: vec![0, 2],
					contrast: 10.0,
					bias: 0.15
				},
				ColorOperation::Saturation { proportion: 1.2 },
			]
		);
		assert_eq!(operations[1].to_string(), "sigmoidal rb 10 0.15");
		assert!(ColorOperation::parse_formula("")?.is_empty());
		Ok(())
	}

	#[rstest]
	#[case("brighten rgb 2")]
	#[case("gamma rgx 2")]
	#[case("gamma rgb")]
	#[case("gamma rgb 0")]
	#[case("gamma rgb abc")]
	#[case("sigmoidal rgb 10 2")]
	#[case("saturation")]
	#[case("rgb 3")]
	fn rejects_bad_formulas(#[case] formula: &str) {
		let error = ColorOperation::parse_formula(formula).unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter), "{formula}");
	}

	#[test]
	fn gamma_brightens() -> Result<()> {
		let block = PixelBlock::new(array![[[0u8, 64, 255]]], Array2::from_elem((1, 3), true))?;
		let result = apply_color_formula(&block, &ColorOperation::parse_formula("gamma 1 2")?)?;
		// sqrt(64 / 255) * 255 = 127.75
		assert_eq!(result.band(0), array![[0, 127, 255]]);
		Ok(())
	}

	#[test]
	fn sigmoidal_keeps_the_endpoints() {
		for contrast in [-5.0, 5.0, 20.0] {
			assert_abs_diff_eq!(sigmoidal(0.0, contrast, 0.5), 0.0, epsilon = 1e-9);
			assert_abs_diff_eq!(sigmoidal(1.0, contrast, 0.5), 1.0, epsilon = 1e-9);
		}
		assert!(sigmoidal(0.25, 10.0, 0.5) < 0.25);
		assert!(sigmoidal(0.75, 10.0, 0.5) > 0.75);
		assert_eq!(sigmoidal(0.3, 0.0, 0.5), 0.3);
	}

	#[test]
	fn saturation_round_trips_and_desaturates() {
		let color = [0.8, 0.3, 0.1];
		let same = saturate(color, 1.0);
		for (a, b) in color.iter().zip(same) {
			assert_abs_diff_eq!(*a, b, epsilon = 1e-5);
		}
		let [r, g, b] = saturate(color, 0.0);
		assert_abs_diff_eq!(r, g, epsilon = 1e-3);
		assert_abs_diff_eq!(g, b, epsilon = 1e-3);
	}

	#[test]
	fn missing_bands_are_reported() -> Result<()> {
		let block = PixelBlock::new(array![[[10u8]]], array![[true]])?;
		let error = apply_color_formula(&block, &ColorOperation::parse_formula("gamma rgb 2")?).unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidBand));
		Ok(())
	}
}
