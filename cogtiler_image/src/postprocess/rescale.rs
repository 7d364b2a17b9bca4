use anyhow::{Result, ensure};
use cogtiler_core::{PixelBlock, TileError};
use ndarray::Zip;

/// Maps every band from its `[min, max]` input range onto `0..=255`.
///
/// `ranges` holds one range per band; a single range applies to all bands. Values outside the
/// range are clamped, fractions are truncated and masked pixels become 0. The mask is kept.
pub fn rescale(block: &PixelBlock, ranges: &[[f64; 2]]) -> Result<PixelBlock<u8>> {
	let bands = block.bands();
	if ranges.len() != 1 && ranges.len() != bands {
		return Err(TileError::InvalidParameter(format!(
			"{} rescale ranges given for {bands} bands",
			ranges.len()
		))
		.into());
	}
	for [min, max] in ranges {
		ensure!(
			min.is_finite() && max.is_finite(),
			TileError::InvalidParameter(format!("rescale range [{min}, {max}] is not finite"))
		);
	}

	let mut result = PixelBlock::new_invalid(bands, block.height(), block.width(), 0u8);
	*result.mask_mut() = block.mask().clone();
	for band in 0..bands {
		let [min, max] = ranges[if ranges.len() == 1 { 0 } else { band }];
		let span = max - min;
		Zip::from(result.data_mut().index_axis_mut(ndarray::Axis(0), band))
			.and(block.band(band))
			.and(block.mask())
			.for_each(|out, &value, &valid| {
				*out = if valid { scale_to_byte(value, min, span) } else { 0 };
			});
	}
	Ok(result)
}

fn scale_to_byte(value: f64, min: f64, span: f64) -> u8 {
	if value.is_nan() {
		return 0;
	}
	let scaled = if span == 0.0 {
		if value > min { 255.0 } else { 0.0 }
	} else {
		(value - min) / span * 255.0
	};
	scaled.clamp(0.0, 255.0) as u8
}

/// Casts values to bytes without rescaling: clamped to `0..=255`, fractions truncated.
pub fn to_bytes(block: &PixelBlock) -> PixelBlock<u8> {
	let mut result = block.map(|&value| if value.is_nan() { 0 } else { value.clamp(0.0, 255.0) as u8 });
	let (data, mask) = result.parts_mut();
	for ((_, row, col), value) in data.indexed_iter_mut() {
		if !mask[[row, col]] {
			*value = 0;
		}
	}
	result
}
