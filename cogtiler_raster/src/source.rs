//! The capability set every raster collaborator has to provide.
//!
//! A [`RasterSource`] describes itself through [`SourceInfo`], hands out native pixels and
//! produces warped views of itself. Sources are opened per operation by a [`SourceOpener`]
//! and dropped as soon as the read is done.

use crate::warp::warp_source;
use anyhow::{Result, ensure};
use async_trait::async_trait;
use cogtiler_core::{BandDescriptor, Crs, GeoTransform, Nodata, ResampleAlg, TileError};
use ndarray::{Array2, Array3};
use std::{collections::HashMap, fmt::Debug, sync::Arc};

/// Everything known about a source after opening it.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
	/// URL or path the source was opened from.
	pub address: String,
	pub crs: Crs,
	pub width: usize,
	pub height: usize,
	pub geo_transform: GeoTransform,
	/// Nodata value embedded in the source.
	pub nodata: Option<Nodata>,
	pub bands: Vec<BandDescriptor>,
}

impl SourceInfo {
	/// Native bounds `[left, bottom, right, top]` in the source CRS.
	pub fn native_bounds(&self) -> [f64; 4] {
		self.geo_transform.bounds(self.width, self.height)
	}

	/// 1-based index of the alpha band, if the source has one.
	pub fn alpha_band(&self) -> Option<usize> {
		self.bands.iter().find(|band| band.is_alpha).map(|band| band.index)
	}

	pub fn band_count(&self) -> usize {
		self.bands.len()
	}
}

/// A rectangle of native pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelWindow {
	pub col: usize,
	pub row: usize,
	pub width: usize,
	pub height: usize,
}

impl PixelWindow {
	pub fn new(col: usize, row: usize, width: usize, height: usize) -> PixelWindow {
		PixelWindow {
			col,
			row,
			width,
			height,
		}
	}

	/// Fails unless the window lies inside a `width x height` raster and is not empty.
	pub fn check_inside(&self, width: usize, height: usize) -> Result<()> {
		ensure!(
			self.width > 0 && self.height > 0,
			"pixel window {self:?} is empty"
		);
		ensure!(
			self.col + self.width <= width && self.row + self.height <= height,
			"pixel window {self:?} exceeds raster size {width}x{height}"
		);
		Ok(())
	}
}

/// Where the validity of a warped pixel comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MaskSource {
	/// A pixel is valid where the alpha band (1-based index) is non-zero.
	Alpha(usize),
	/// A pixel is valid where the sampled value is not the nodata value.
	Nodata(Nodata),
	/// Every covered pixel is valid.
	None,
}

/// A virtual warped view: the source resampled onto a north-up grid.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpRequest {
	/// Reference system of the destination grid.
	pub crs: Crs,
	/// `[left, bottom, right, top]` of the destination grid in `crs`.
	pub bounds: [f64; 4],
	pub width: usize,
	pub height: usize,
	/// 1-based source bands, in output order.
	pub bands: Vec<usize>,
	pub resampling: ResampleAlg,
	pub mask: MaskSource,
}

/// The result of a warp: `(bands, height, width)` values and the validity of each pixel.
///
/// A pixel is valid only if it is covered by the source and passes the [`MaskSource`].
#[derive(Clone, Debug, PartialEq)]
pub struct WarpedBlock {
	pub data: Array3<f64>,
	pub valid: Array2<bool>,
}

/// A raster that can be read on the tiling engine's behalf.
pub trait RasterSource: Debug + Send + Sync {
	fn info(&self) -> &SourceInfo;

	/// Reads native pixels of one 1-based band, row-major.
	fn read_native(&self, band: usize, window: PixelWindow) -> Result<Array2<f64>>;

	/// Builds the virtual warped view described by `request`.
	///
	/// The default implementation inverse-maps every destination pixel centre into source
	/// pixel space and samples there.
	fn warp(&self, request: &WarpRequest) -> Result<WarpedBlock> {
		warp_source(self, request)
	}

	fn transform_point(&self, from: Crs, to: Crs, x: f64, y: f64) -> Result<[f64; 2]> {
		from.transform_point(to, x, y)
	}

	/// Transforms `bounds` with densified edges, returning the envelope.
	fn transform_bounds(&self, from: Crs, to: Crs, bounds: [f64; 4]) -> Result<[f64; 4]> {
		from.transform_bounds(to, bounds)
	}
}

/// Opens sources by address.
#[async_trait]
pub trait SourceOpener: Send + Sync {
	/// Opens `address`. Failures are `SOURCE_UNREADABLE`.
	async fn open(&self, address: &str) -> Result<Arc<dyn RasterSource>>;
}

/// A [`SourceOpener`] over a fixed set of already loaded sources, keyed by address.
#[derive(Default)]
pub struct MemoryCatalog {
	sources: HashMap<String, Arc<dyn RasterSource>>,
}

impl MemoryCatalog {
	pub fn new() -> MemoryCatalog {
		MemoryCatalog::default()
	}

	/// Registers `source` under its own address.
	pub fn add(&mut self, source: impl RasterSource + 'static) {
		let address = source.info().address.clone();
		self.sources.insert(address, Arc::new(source));
	}

	pub fn with(mut self, source: impl RasterSource + 'static) -> MemoryCatalog {
		self.add(source);
		self
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}
}

#[async_trait]
impl SourceOpener for MemoryCatalog {
	async fn open(&self, address: &str) -> Result<Arc<dyn RasterSource>> {
		match self.sources.get(address) {
			Some(source) => Ok(source.clone()),
			None => Err(TileError::SourceUnreadable(format!("no source registered for '{address}'")).into()),
		}
	}
}
