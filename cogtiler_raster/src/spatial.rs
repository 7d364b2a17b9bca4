//! Geographic bounds and usable zoom levels of sources.

use crate::{RasterSource, SourceOpener, open_source, run_blocking};
use anyhow::{Context, Result};
use cogtiler_core::{ConcurrencyLimits, Crs, GeoBBox, TileError, ZoomRange};
use futures::{StreamExt, TryStreamExt, stream};
use serde::Serialize;
use std::time::Duration;

/// Where a source (or a set of sources) lies and at which zoom levels it is worth reading.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SpatialInfo {
	/// `[west, south, east, north]` in EPSG:4326.
	pub bounds: [f64; 4],
	/// `[lon, lat]` in the middle of `bounds`.
	pub center: [f64; 2],
	pub minzoom: u8,
	pub maxzoom: u8,
}

impl SpatialInfo {
	fn new(bbox: GeoBBox, zoom: ZoomRange) -> SpatialInfo {
		SpatialInfo {
			bounds: bbox.as_array(),
			center: bbox.center(),
			minzoom: zoom.min,
			maxzoom: zoom.max,
		}
	}

	pub fn zoom(&self) -> ZoomRange {
		ZoomRange {
			min: self.minzoom,
			max: self.maxzoom,
		}
	}

	fn bbox(&self) -> Result<GeoBBox> {
		let [west, south, east, north] = self.bounds;
		GeoBBox::new(west, south, east, north)
	}

	/// Bounds union and zoom union of both.
	pub fn union(&self, other: &SpatialInfo) -> Result<SpatialInfo> {
		Ok(SpatialInfo::new(
			self.bbox()?.extended(&other.bbox()?),
			self.zoom().union(&other.zoom()),
		))
	}
}

/// Bounds and zoom range of one source.
///
/// The bounds are the source's extent in EPSG:4326 as transformed, not clipped to the Web
/// Mercator latitude limit. The native resolution is measured along the diagonal of the
/// source's Web Mercator footprint, so rotated or sheared sources are not overestimated.
pub fn spatial_info(source: &dyn RasterSource, tile_size: u32) -> Result<SpatialInfo> {
	let info = source.info();
	let native = info.native_bounds();

	let [west, south, east, north] = source.transform_bounds(info.crs, Crs::Wgs84, native)?;
	let bbox = GeoBBox::new_clamped(west, south, east, north)?;

	let [left, bottom, right, top] = source.transform_bounds(info.crs, Crs::WebMercator, native)?;
	let diagonal_m = (right - left).hypot(top - bottom);
	let diagonal_px = (info.width as f64).hypot(info.height as f64);
	let resolution = diagonal_m / diagonal_px;

	let zoom = ZoomRange::from_resolution(resolution, info.width.max(info.height), tile_size);
	log::trace!("{} spans {bbox:?}, zoom {}..={}", info.address, zoom.min, zoom.max);
	Ok(SpatialInfo::new(bbox, zoom))
}

/// The union of [`spatial_info`] over several sources.
///
/// Sources are opened concurrently, at most `limits.source_fanout` at a time. Opening and
/// inspecting each source is bounded by `timeout`. Any failing source fails the whole call.
pub async fn spatial_info_many(
	opener: &dyn SourceOpener,
	addresses: &[String],
	tile_size: u32,
	limits: &ConcurrencyLimits,
	timeout: Option<Duration>,
) -> Result<SpatialInfo> {
	let infos: Vec<SpatialInfo> = stream::iter(addresses)
		.map(|address| async move {
			let source = open_source(opener, address, timeout).await?;
			run_blocking(address, timeout, move || spatial_info(source.as_ref(), tile_size))
				.await
				.with_context(|| format!("Failed to inspect {address}"))
		})
		.buffered(limits.source_fanout)
		.try_collect()
		.await?;

	let mut iter = infos.into_iter();
	let Some(first) = iter.next() else {
		return Err(TileError::InvalidParameter("at least one source is needed".to_string()).into());
	};
	iter.try_fold(first, |union, info| union.union(&info))
}
