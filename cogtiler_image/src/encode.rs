//! Encoding 8-bit pixel blocks into PNG, JPEG or WebP.
//!
//! PNG and WebP carry the validity mask as an alpha channel, JPEG drops it.

use crate::{
	colormap::{Colormap, apply_colormap},
	format,
};
use anyhow::{Context, Result, bail};
use cogtiler_core::{Blob, PixelBlock, TileError};
use image::{DynamicImage, GrayAlphaImage, GrayImage, Luma, LumaA, Rgb, RgbImage, Rgba, RgbaImage};
use ndarray::{Array2, Array3};
use serde::Deserialize;
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
	Png,
	#[serde(alias = "jpg")]
	Jpeg,
	Webp,
}

impl ImageFormat {
	pub fn extension(&self) -> &'static str {
		match self {
			ImageFormat::Png => "png",
			ImageFormat::Jpeg => "jpg",
			ImageFormat::Webp => "webp",
		}
	}

	pub fn mime_type(&self) -> &'static str {
		match self {
			ImageFormat::Png => "image/png",
			ImageFormat::Jpeg => "image/jpeg",
			ImageFormat::Webp => "image/webp",
		}
	}

	pub fn has_alpha(&self) -> bool {
		!matches!(self, ImageFormat::Jpeg)
	}
}

impl FromStr for ImageFormat {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
			"png" => ImageFormat::Png,
			"jpg" | "jpeg" => ImageFormat::Jpeg,
			"webp" => ImageFormat::Webp,
			_ => return Err(TileError::InvalidParameter(format!("unknown image format '{text}'")).into()),
		})
	}
}

impl fmt::Display for ImageFormat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

/// Per-format tuning.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodeOptions {
	pub jpeg_quality: u8,
	pub webp_quality: u8,
	pub webp_lossless: bool,
	/// 0 (smallest) to 100 (fastest); `None` uses the PNG default.
	pub png_speed: Option<u8>,
}

impl Default for EncodeOptions {
	fn default() -> Self {
		EncodeOptions {
			jpeg_quality: 85,
			webp_quality: 80,
			webp_lossless: false,
			png_speed: None,
		}
	}
}

/// Encodes `block` as `format`, expanding a single band through `colormap` first if one is given.
pub fn encode_image(
	block: &PixelBlock<u8>,
	format: ImageFormat,
	colormap: Option<&Colormap>,
	options: &EncodeOptions,
) -> Result<Blob> {
	let colored;
	let block = match colormap {
		Some(colormap) => {
			colored = apply_colormap(block, colormap)?;
			&colored
		}
		None => block,
	};

	let image = to_image(block, format)?;
	log::trace!(
		"encoding {}x{} {:?} pixels as {format}",
		image.width(),
		image.height(),
		image.color()
	);

	let blob = match format {
		ImageFormat::Png => format::png::encode(&image, options.png_speed),
		ImageFormat::Jpeg => format::jpeg::encode(&image, Some(options.jpeg_quality)),
		ImageFormat::Webp if options.webp_lossless => format::webp::encode_lossless(&image),
		ImageFormat::Webp => format::webp::encode(&image, Some(options.webp_quality)),
	};
	blob.with_context(|| format!("encoding {format} image"))
}

fn to_image(block: &PixelBlock<u8>, format: ImageFormat) -> Result<DynamicImage> {
	let width = u32::try_from(block.width())?;
	let height = u32::try_from(block.height())?;
	let data = block.data();
	let mask = block.mask();
	let alpha = |x: u32, y: u32| if mask[[y as usize, x as usize]] { 255 } else { 0 };
	let value = |band: usize, x: u32, y: u32| data[[band, y as usize, x as usize]];

	Ok(match (block.bands(), format) {
		(1, ImageFormat::Jpeg) => DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| Luma([value(0, x, y)]))),
		(1, ImageFormat::Png) => DynamicImage::ImageLumaA8(GrayAlphaImage::from_fn(width, height, |x, y| {
			LumaA([value(0, x, y), alpha(x, y)])
		})),
		(1, ImageFormat::Webp) => DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
			let v = value(0, x, y);
			Rgba([v, v, v, alpha(x, y)])
		})),
		(3, ImageFormat::Jpeg) => DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
			Rgb([value(0, x, y), value(1, x, y), value(2, x, y)])
		})),
		(3, _) => DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
			Rgba([value(0, x, y), value(1, x, y), value(2, x, y), alpha(x, y)])
		})),
		(bands, _) => {
			return Err(TileError::InvalidParameter(format!(
				"{format} images need 1 or 3 bands, got {bands}"
			))
			.into());
		}
	})
}

/// Decodes a PNG back into a block. A transparent pixel becomes an invalid one.
pub fn decode_png(blob: &Blob) -> Result<PixelBlock<u8>> {
	let image = format::png::decode(blob)?;
	let (width, height) = (image.width() as usize, image.height() as usize);
	let (bands, has_alpha) = match image {
		DynamicImage::ImageLuma8(_) => (1, false),
		DynamicImage::ImageLumaA8(_) => (1, true),
		DynamicImage::ImageRgb8(_) => (3, false),
		DynamicImage::ImageRgba8(_) => (3, true),
		_ => bail!("cannot decode {:?} png into a pixel block", image.color()),
	};

	let bytes = image.as_bytes();
	let channels = bands + usize::from(has_alpha);
	let data = Array3::from_shape_fn((bands, height, width), |(band, row, col)| {
		bytes[(row * width + col) * channels + band]
	});
	let mask = Array2::from_shape_fn((height, width), |(row, col)| {
		!has_alpha || bytes[(row * width + col) * channels + bands] > 0
	});
	PixelBlock::new(data, mask)
}
