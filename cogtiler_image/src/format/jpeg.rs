//! JPEG carries no alpha channel: only 8-bit Grey and RGB images are accepted.

use anyhow::{Result, anyhow, bail};
use cogtiler_core::Blob;
use image::{DynamicImage, ImageEncoder, ImageFormat, codecs::jpeg::JpegEncoder, load_from_memory_with_format};

/// Encodes with `quality` in `1..100`, 85 by default.
pub fn encode(image: &DynamicImage, quality: Option<u8>) -> Result<Blob> {
	let quality = quality.unwrap_or(85);
	if quality >= 100 {
		bail!("JPEG does not support lossless compression, use a quality < 100");
	}

	match image {
		DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => {}
		_ => bail!("JPEG only supports Grey or RGB images without alpha channel"),
	};

	let mut buffer: Vec<u8> = Vec::new();
	JpegEncoder::new_with_quality(&mut buffer, quality.max(1)).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		image.color().into(),
	)?;

	Ok(Blob::from(buffer))
}

pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	load_from_memory_with_format(blob.as_slice(), ImageFormat::Jpeg).map_err(|e| anyhow!("Failed to decode JPEG image: {e}"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{GrayImage, Luma, Rgb, RgbImage};
	use rstest::rstest;

	#[rstest]
	#[case::grey(DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 64, Luma([100]))))]
	#[case::rgb(DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([200, 100, 50]))))]
	fn flat_images_survive(#[case] image: DynamicImage) -> Result<()> {
		let decoded = decode(&encode(&image, None)?)?;
		assert_eq!(decoded.color(), image.color());
		for (a, b) in decoded.as_bytes().iter().zip(image.as_bytes()) {
			assert!(a.abs_diff(*b) <= 3, "{a} vs {b}");
		}
		Ok(())
	}

	#[rstest]
	#[case::greya(DynamicImage::new_luma_a8(4, 4))]
	#[case::rgba(DynamicImage::new_rgba8(4, 4))]
	fn rejects_alpha(#[case] image: DynamicImage) {
		assert_eq!(
			encode(&image, None).unwrap_err().to_string(),
			"JPEG only supports Grey or RGB images without alpha channel"
		);
	}

	#[test]
	fn rejects_lossless() {
		assert!(encode(&DynamicImage::new_rgb8(4, 4), Some(100)).is_err());
	}
}
