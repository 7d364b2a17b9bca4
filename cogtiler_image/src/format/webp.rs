//! WebP: lossy through libwebp, lossless through the `image` codec. Only RGB and RGBA.

use anyhow::{Result, anyhow, bail};
use cogtiler_core::Blob;
use image::{DynamicImage, ImageFormat, codecs::webp::WebPEncoder, load_from_memory_with_format};

fn check(image: &DynamicImage) -> Result<()> {
	match image {
		DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => Ok(()),
		_ => bail!("webp only supports RGB or RGBA images"),
	}
}

/// Lossy encoding with `quality` in `0..=100`, 80 by default.
pub fn encode(image: &DynamicImage, quality: Option<u8>) -> Result<Blob> {
	let encoder = match image {
		DynamicImage::ImageRgb8(rgb) => webp::Encoder::from_rgb(rgb.as_raw(), rgb.width(), rgb.height()),
		DynamicImage::ImageRgba8(rgba) => webp::Encoder::from_rgba(rgba.as_raw(), rgba.width(), rgba.height()),
		_ => bail!("webp only supports RGB or RGBA images"),
	};
	let memory = encoder
		.encode_simple(false, f32::from(quality.unwrap_or(80).min(100)))
		.map_err(|e| anyhow!("webp encoding failed: {e:?}"))?;
	Ok(Blob::from(memory.to_vec()))
}

pub fn encode_lossless(image: &DynamicImage) -> Result<Blob> {
	check(image)?;
	let mut buffer: Vec<u8> = Vec::new();
	WebPEncoder::new_lossless(&mut buffer).encode(image.as_bytes(), image.width(), image.height(), image.color().into())?;
	Ok(Blob::from(buffer))
}

pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	load_from_memory_with_format(blob.as_slice(), ImageFormat::WebP).map_err(|e| anyhow!("Failed to decode WebP image: {e}"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{Rgba, RgbaImage};
	use rstest::rstest;

	fn rgba() -> DynamicImage {
		DynamicImage::ImageRgba8(RgbaImage::from_fn(32, 32, |x, y| {
			Rgba([x as u8 * 8, y as u8 * 8, 128, if x < 16 { 255 } else { 0 }])
		}))
	}

	#[test]
	fn lossless_round_trip() -> Result<()> {
		let image = rgba();
		let decoded = decode(&encode_lossless(&image)?)?;
		assert_eq!(decoded.to_rgba8().as_raw(), image.to_rgba8().as_raw());
		Ok(())
	}

	#[test]
	fn lossy_keeps_size_and_alpha_layout() -> Result<()> {
		let image = rgba();
		let decoded = decode(&encode(&image, Some(90))?)?.to_rgba8();
		assert_eq!(decoded.dimensions(), (32, 32));
		assert_eq!(decoded.get_pixel(0, 0)[3], 255);
		assert_eq!(decoded.get_pixel(31, 31)[3], 0);
		Ok(())
	}

	#[rstest]
	#[case::grey(DynamicImage::new_luma8(4, 4))]
	#[case::greya(DynamicImage::new_luma_a8(4, 4))]
	fn rejects_grey(#[case] image: DynamicImage) {
		assert!(encode(&image, None).is_err());
		assert!(encode_lossless(&image).is_err());
	}
}
