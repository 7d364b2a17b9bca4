//! Multi-band pixel arrays with a shared validity mask.

use anyhow::{Result, ensure};
use ndarray::{Array2, Array3, ArrayView2, Axis, s};
use std::fmt::Debug;

/// Sampled values of shape `(bands, height, width)` plus one `(height, width)` mask shared
/// by every band. `true` in the mask marks a valid pixel.
#[derive(Clone, PartialEq)]
pub struct PixelBlock<T = f64> {
	data: Array3<T>,
	mask: Array2<bool>,
}

impl<T: Clone> PixelBlock<T> {
	/// Combines `data` and `mask`, checking that the mask covers the last two axes of `data`.
	pub fn new(data: Array3<T>, mask: Array2<bool>) -> Result<PixelBlock<T>> {
		let (_, height, width) = data.dim();
		ensure!(
			mask.dim() == (height, width),
			"mask shape {:?} does not match pixel shape ({height}, {width})",
			mask.dim()
		);
		Ok(PixelBlock { data, mask })
	}

	/// A block of `fill` values in which every pixel is invalid.
	pub fn new_invalid(bands: usize, height: usize, width: usize, fill: T) -> PixelBlock<T> {
		PixelBlock {
			data: Array3::from_elem((bands, height, width), fill),
			mask: Array2::from_elem((height, width), false),
		}
	}

	pub fn data(&self) -> &Array3<T> {
		&self.data
	}

	pub fn data_mut(&mut self) -> &mut Array3<T> {
		&mut self.data
	}

	pub fn mask(&self) -> &Array2<bool> {
		&self.mask
	}

	pub fn mask_mut(&mut self) -> &mut Array2<bool> {
		&mut self.mask
	}

	/// Mutable access to values and mask at the same time.
	pub fn parts_mut(&mut self) -> (&mut Array3<T>, &mut Array2<bool>) {
		(&mut self.data, &mut self.mask)
	}

	pub fn into_parts(self) -> (Array3<T>, Array2<bool>) {
		(self.data, self.mask)
	}

	pub fn bands(&self) -> usize {
		self.data.dim().0
	}

	pub fn height(&self) -> usize {
		self.data.dim().1
	}

	pub fn width(&self) -> usize {
		self.data.dim().2
	}

	pub fn band(&self, band: usize) -> ArrayView2<'_, T> {
		self.data.index_axis(Axis(0), band)
	}

	pub fn valid_count(&self) -> usize {
		self.mask.iter().filter(|&&valid| valid).count()
	}

	pub fn has_valid(&self) -> bool {
		self.mask.iter().any(|&valid| valid)
	}

	pub fn is_fully_valid(&self) -> bool {
		self.mask.iter().all(|&valid| valid)
	}

	/// Values of one band at the valid pixels, in row-major order.
	pub fn valid_values(&self, band: usize) -> Vec<T> {
		self
			.data
			.slice(s![band, .., ..])
			.iter()
			.zip(self.mask.iter())
			.filter(|(_, valid)| **valid)
			.map(|(value, _)| value.clone())
			.collect()
	}

	/// Keeps only the given band indexes (0-based), in the given order.
	pub fn select_bands(&self, bands: &[usize]) -> Result<PixelBlock<T>> {
		for &band in bands {
			ensure!(band < self.bands(), "band {band} out of range, block has {} bands", self.bands());
		}
		Ok(PixelBlock {
			data: self.data.select(Axis(0), bands),
			mask: self.mask.clone(),
		})
	}

	/// Applies `f` to every value, keeping the mask.
	pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> PixelBlock<U> {
		PixelBlock {
			data: self.data.map(f),
			mask: self.mask.clone(),
		}
	}
}

impl<T: Debug> Debug for PixelBlock<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let (bands, height, width) = self.data.dim();
		let valid = self.mask.iter().filter(|&&v| v).count();
		write!(f, "PixelBlock({bands}x{height}x{width}, {valid} valid)")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ndarray::array;

	fn sample() -> PixelBlock {
		let data = Array3::from_shape_vec((2, 2, 2), vec![1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0]).unwrap();
		let mask = array![[true, false], [true, true]];
		PixelBlock::new(data, mask).unwrap()
	}

	#[test]
	fn shape_must_match() {
		let data = Array3::<f64>::zeros((1, 2, 3));
		let error = PixelBlock::new(data, Array2::from_elem((3, 2), true)).unwrap_err();
		assert_eq!(
			error.to_string(),
			"mask shape (3, 2) does not match pixel shape (2, 3)"
		);
	}

	#[test]
	fn dimensions_and_counts() {
		let block = sample();
		assert_eq!((block.bands(), block.height(), block.width()), (2, 2, 2));
		assert_eq!(block.valid_count(), 3);
		assert!(block.has_valid());
		assert!(!block.is_fully_valid());
		assert_eq!(format!("{block:?}"), "PixelBlock(2x2x2, 3 valid)");
	}

	#[test]
	fn invalid_block_has_no_valid_pixels() {
		let block = PixelBlock::new_invalid(3, 4, 5, 0u8);
		assert_eq!(block.data().dim(), (3, 4, 5));
		assert!(!block.has_valid());
	}

	#[test]
	fn valid_values_skip_masked_pixels() {
		let block = sample();
		assert_eq!(block.valid_values(0), vec![1.0, 3.0, 4.0]);
		assert_eq!(block.valid_values(1), vec![10.0, 30.0, 40.0]);
	}

	#[test]
	fn select_and_map() {
		let block = sample().select_bands(&[1]).unwrap();
		assert_eq!(block.bands(), 1);
		assert_eq!(block.band(0)[[1, 1]], 40.0);
		let halved = block.map(|v| (v / 2.0) as u8);
		assert_eq!(halved.band(0)[[0, 0]], 5);
		assert_eq!(halved.mask(), block.mask());
		assert!(sample().select_bands(&[2]).is_err());
	}
}
