use anyhow::{Result, anyhow, bail};
use cogtiler_core::Blob;
use image::{DynamicImage, ImageEncoder, ImageFormat, codecs::png, load_from_memory_with_format};

/// Encodes an 8-bit Grey, GreyA, RGB or RGBA image.
///
/// `speed` trades size for time: below 34 compresses hardest, from 67 on skips filtering.
pub fn encode(image: &DynamicImage, speed: Option<u8>) -> Result<Blob> {
	let color = image.color();
	if color.bytes_per_pixel() != color.channel_count() {
		bail!("png only supports 8-bit images");
	}

	let (compression, filter) = match speed {
		None => (png::CompressionType::Default, png::FilterType::Adaptive),
		Some(0..34) => (png::CompressionType::Best, png::FilterType::Adaptive),
		Some(34..67) => (png::CompressionType::Default, png::FilterType::Sub),
		Some(_) => (png::CompressionType::Fast, png::FilterType::NoFilter),
	};

	let mut bytes = Vec::new();
	png::PngEncoder::new_with_quality(&mut bytes, compression, filter).write_image(
		image.as_bytes(),
		image.width(),
		image.height(),
		color.into(),
	)?;
	Ok(Blob::from(bytes))
}

pub fn decode(blob: &Blob) -> Result<DynamicImage> {
	load_from_memory_with_format(blob.as_slice(), ImageFormat::Png).map_err(|e| anyhow!("invalid png: {e}"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use image::{GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
	use rstest::rstest;

	#[rstest]
	#[case::grey(DynamicImage::ImageLuma8(GrayImage::from_fn(64, 64, |x, _| Luma([x as u8]))))]
	#[case::greya(DynamicImage::ImageLumaA8(GrayAlphaImage::from_fn(64, 64, |x, y| LumaA([x as u8, y as u8]))))]
	#[case::rgb(DynamicImage::ImageRgb8(RgbImage::from_fn(64, 64, |x, y| Rgb([x as u8, 255 - x as u8, y as u8]))))]
	#[case::rgba(DynamicImage::ImageRgba8(RgbaImage::from_fn(64, 64, |x, y| {
		Rgba([x as u8, 255 - x as u8, y as u8, 255 - y as u8])
	})))]
	fn lossless(#[case] image: DynamicImage) -> Result<()> {
		for speed in [None, Some(0), Some(50), Some(100)] {
			let decoded = decode(&encode(&image, speed)?)?;
			assert_eq!(decoded.color(), image.color());
			assert_eq!(decoded.as_bytes(), image.as_bytes());
		}
		Ok(())
	}

	#[test]
	fn rejects_16_bit() {
		let image = DynamicImage::new_luma16(4, 4);
		assert_eq!(encode(&image, None).unwrap_err().to_string(), "png only supports 8-bit images");
	}
}
