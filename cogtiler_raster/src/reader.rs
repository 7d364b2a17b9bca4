//! Windowed reads: tiles, arbitrary bounding boxes, full extents and single points.
//!
//! All read functions are blocking. Async callers go through [`run_blocking`], which moves
//! the read onto tokio's blocking pool and bounds it with an optional timeout.

use crate::{MaskSource, PixelWindow, RasterSource, SourceInfo, SourceOpener, WarpRequest};
use anyhow::{Context, Result};
use cogtiler_core::{
	BBoxRequest, BandDescriptor, BandSelection, Crs, Nodata, PixelBlock, ResampleAlg, TileCoord, TileError,
};
use serde::Serialize;
use std::{sync::Arc, time::Duration};

/// Per-read options shared by tile, window and extent reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOptions {
	/// Bands to read; all non-alpha bands when `None`.
	pub bands: Option<BandSelection>,
	/// Overrides the nodata value embedded in the source.
	pub nodata: Option<Nodata>,
	pub resampling: ResampleAlg,
}

impl ReadOptions {
	pub fn new(resampling: ResampleAlg) -> ReadOptions {
		ReadOptions {
			resampling,
			..ReadOptions::default()
		}
	}

	pub fn with_bands(mut self, bands: Option<BandSelection>) -> ReadOptions {
		self.bands = bands;
		self
	}

	pub fn with_nodata(mut self, nodata: Option<Nodata>) -> ReadOptions {
		self.nodata = nodata;
		self
	}
}

/// Pixels together with the descriptors of the bands they hold.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterBlock {
	pub pixels: PixelBlock,
	pub bands: Vec<BandDescriptor>,
}

impl RasterBlock {
	fn invalid(bands: Vec<BandDescriptor>, width: usize, height: usize, fill: f64) -> RasterBlock {
		RasterBlock {
			pixels: PixelBlock::new_invalid(bands.len(), height, width, fill),
			bands,
		}
	}
}

/// Validity comes from the alpha band if there is one, then from nodata, otherwise every
/// covered pixel is valid.
fn mask_source(info: &SourceInfo, nodata: Option<Nodata>) -> MaskSource {
	if let Some(alpha) = info.alpha_band() {
		MaskSource::Alpha(alpha)
	} else if let Some(nodata) = Nodata::resolve(nodata, info.nodata) {
		MaskSource::Nodata(nodata)
	} else {
		MaskSource::None
	}
}

fn fill_value(mask: MaskSource) -> f64 {
	match mask {
		MaskSource::Nodata(nodata) => nodata.as_f64(),
		_ => 0.0,
	}
}

fn strictly_intersect(a: [f64; 4], b: [f64; 4]) -> bool {
	a[0] < b[2] && b[0] < a[2] && a[1] < b[3] && b[1] < a[3]
}

fn warp_block(
	source: &dyn RasterSource,
	crs: Crs,
	bounds: [f64; 4],
	size: (usize, usize),
	bands: Vec<BandDescriptor>,
	mask: MaskSource,
	resampling: ResampleAlg,
) -> Result<RasterBlock> {
	let request = WarpRequest {
		crs,
		bounds,
		width: size.0,
		height: size.1,
		bands: bands.iter().map(|band| band.index).collect(),
		resampling,
		mask,
	};
	let warped = source
		.warp(&request)
		.with_context(|| format!("Failed to warp {}", source.info().address))?;
	Ok(RasterBlock {
		pixels: PixelBlock::new(warped.data, warped.valid)?,
		bands,
	})
}

/// Reads the square tile `coord` with `tile_size` pixels per side.
///
/// A tile that does not intersect the source yields an all-invalid block of the full size.
pub fn read_tile(source: &dyn RasterSource, coord: &TileCoord, tile_size: u32, options: &ReadOptions) -> Result<RasterBlock> {
	let info = source.info();
	let bands = BandSelection::resolve(options.bands.as_ref(), &info.bands)?;
	let mask = mask_source(info, options.nodata);
	let size = tile_size as usize;

	let tile_bounds = coord.to_mercator_bbox();
	let source_bounds = source
		.transform_bounds(info.crs, Crs::WebMercator, info.native_bounds())
		.with_context(|| format!("Failed to project the bounds of {}", info.address))?;
	if !strictly_intersect(tile_bounds, source_bounds) {
		log::debug!("{coord:?} is outside of {}", info.address);
		return Ok(RasterBlock::invalid(bands, size, size, fill_value(mask)));
	}

	log::trace!("reading {coord:?} from {} at {size}px", info.address);
	warp_block(
		source,
		Crs::WebMercator,
		tile_bounds,
		(size, size),
		bands,
		mask,
		options.resampling,
	)
}

/// Output size of one axis: the native pixel count rounded down, capped at `max_size`.
fn capped_size(native: f64, max_size: usize) -> usize {
	if native < max_size as f64 {
		(native.floor() as usize).max(1)
	} else {
		max_size.max(1)
	}
}

/// Reads the area of `bbox`, sized from the native resolution and capped at `max_size`
/// pixels per axis.
///
/// The read happens in the source CRS. Degenerate boxes and boxes outside the source yield
/// an all-invalid block.
pub fn read_window(source: &dyn RasterSource, bbox: &BBoxRequest, max_size: usize, options: &ReadOptions) -> Result<RasterBlock> {
	let info = source.info();
	let bands = BandSelection::resolve(options.bands.as_ref(), &info.bands)?;
	let mask = mask_source(info, options.nodata);
	if bbox.is_degenerate() {
		log::debug!("bbox {:?} is degenerate", bbox.bounds);
		return Ok(RasterBlock::invalid(bands, 1, 1, fill_value(mask)));
	}

	let bounds = source
		.transform_bounds(bbox.crs, info.crs, bbox.bounds)
		.with_context(|| format!("Failed to transform bbox {:?} into {}", bbox.bounds, info.crs))?;
	let [res_x, res_y] = info.geo_transform.resolution();
	let width = capped_size((bounds[2] - bounds[0]) / res_x, max_size);
	let height = capped_size((bounds[3] - bounds[1]) / res_y, max_size);

	if !strictly_intersect(bounds, info.native_bounds()) {
		log::debug!("bbox {:?} is outside of {}", bbox.bounds, info.address);
		return Ok(RasterBlock::invalid(bands, width, height, fill_value(mask)));
	}

	log::trace!("reading bbox {:?} from {} at {width}x{height}", bbox.bounds, info.address);
	warp_block(source, info.crs, bounds, (width, height), bands, mask, options.resampling)
}

/// Reads the full extent of the source at `width x height` pixels.
pub fn read_extent(source: &dyn RasterSource, width: usize, height: usize, options: &ReadOptions) -> Result<RasterBlock> {
	let info = source.info();
	let bands = BandSelection::resolve(options.bands.as_ref(), &info.bands)?;
	let mask = mask_source(info, options.nodata);
	log::trace!("reading the extent of {} at {width}x{height}", info.address);
	warp_block(
		source,
		info.crs,
		info.native_bounds(),
		(width.max(1), height.max(1)),
		bands,
		mask,
		options.resampling,
	)
}

/// One band's value at a point.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointValue {
	pub band: BandDescriptor,
	pub value: f64,
}

/// Values of the native pixel under the geographic coordinate `(lon, lat)`.
///
/// Fails with `OUT_OF_BOUNDS` when the point lies outside the source.
pub fn read_point(source: &dyn RasterSource, lon: f64, lat: f64, bands: Option<&BandSelection>) -> Result<Vec<PointValue>> {
	let info = source.info();
	let bands = BandSelection::resolve(bands, &info.bands)?;
	let [x, y] = source.transform_point(Crs::Wgs84, info.crs, lon, lat)?;
	let [col, row] = info.geo_transform.world_to_pixel(x, y)?;
	if !(col >= 0.0 && col < info.width as f64 && row >= 0.0 && row < info.height as f64) {
		return Err(TileError::OutOfBounds(format!("point ({lon}, {lat}) is outside of {}", info.address)).into());
	}

	let window = PixelWindow::new(col.floor() as usize, row.floor() as usize, 1, 1);
	bands
		.into_iter()
		.map(|band| {
			let value = source.read_native(band.index, window)?[[0, 0]];
			Ok(PointValue { band, value })
		})
		.collect()
}

/// Opens `address`, failing with `SOURCE_UNREADABLE` if that takes longer than `timeout`.
pub async fn open_source(opener: &dyn SourceOpener, address: &str, timeout: Option<Duration>) -> Result<Arc<dyn RasterSource>> {
	match timeout {
		Some(limit) => tokio::time::timeout(limit, opener.open(address))
			.await
			.map_err(|_| TileError::SourceUnreadable(format!("opening {address} timed out")))?,
		None => opener.open(address).await,
	}
}

/// Runs a blocking read of `address` on tokio's blocking pool.
///
/// When `timeout` elapses first, the read fails with `SOURCE_UNREADABLE`. The blocking
/// task itself is left to finish in the background.
pub async fn run_blocking<T, F>(address: &str, timeout: Option<Duration>, task: F) -> Result<T>
where
	T: Send + 'static,
	F: FnOnce() -> Result<T> + Send + 'static,
{
	let handle = tokio::task::spawn_blocking(task);
	let joined = match timeout {
		Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
			TileError::SourceUnreadable(format!(
				"reading {address} timed out after {:.1}s",
				limit.as_secs_f64()
			))
		})?,
		None => handle.await,
	};
	joined.with_context(|| format!("reading {address} was aborted"))?
}
