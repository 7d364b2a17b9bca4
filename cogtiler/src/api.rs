//! The operations a routing layer calls.
//!
//! A [`Tiler`] is cheap to clone and holds nothing but the read-only configuration and the
//! opener of sources. Every call opens the sources it needs and drops them when done.

use crate::{
	Config,
	options::{MetadataRequest, MosaicRequest, MvtOptions, RenderOptions, StatsRequest, TileRequest},
};
use anyhow::{Context, Result, ensure};
use cogtiler_core::{BBoxRequest, BandDescriptor, BandSelection, Blob, Outcome, TileError};
use cogtiler_geometry::encode_vector_tile;
use cogtiler_image::{encode_dem, encode_image, postprocess};
use cogtiler_raster::{
	BandStatistics, Metadata, MetadataOptions, PointValue, RasterBlock, RasterSource, ReadOptions, SourceOpener,
	SpatialInfo, composite_tile, compute_metadata, compute_stats, open_source, read_point, read_tile, read_window,
	run_blocking, spatial_info_many,
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};

/// Statistics of a bounding box together with the bands they describe.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AreaStats {
	pub statistics: BTreeMap<usize, BandStatistics>,
	pub bands: Vec<BandDescriptor>,
}

#[derive(Clone)]
pub struct Tiler {
	config: Arc<Config>,
	opener: Arc<dyn SourceOpener>,
}

impl Tiler {
	pub fn new(config: Config, opener: Arc<dyn SourceOpener>) -> Tiler {
		Tiler {
			config: Arc::new(config),
			opener,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	async fn open(&self, address: &str) -> Result<Arc<dyn RasterSource>> {
		open_source(self.opener.as_ref(), address, self.config.read_timeout()).await
	}

	/// Opens `address` and runs the blocking `task` on it.
	async fn with_source<T, F>(&self, address: &str, task: F) -> Result<T>
	where
		T: Send + 'static,
		F: FnOnce(&dyn RasterSource) -> Result<T> + Send + 'static,
	{
		let source = self.open(address).await?;
		run_blocking(address, self.config.read_timeout(), move || task(source.as_ref())).await
	}

	/// Reads one tile. A tile outside the source comes back with an all-invalid mask.
	pub async fn tile(&self, request: &TileRequest) -> Result<RasterBlock> {
		let tile_size = self.config.tile_size(request.scale)?;
		let options = ReadOptions::new(request.resampling.unwrap_or(self.config.tile_resampling))
			.with_bands(request.bands.clone())
			.with_nodata(request.nodata);
		let coord = request.coord;
		self
			.with_source(&request.address, move |source| {
				read_tile(source, &coord, tile_size, &options)
			})
			.await
			.with_context(|| format!("Failed to read {coord:?} from {}", request.address))
	}

	/// Composites one tile from several sources.
	pub async fn mosaic_tile(&self, request: &MosaicRequest) -> Result<Outcome<RasterBlock>> {
		let tile_size = self.config.tile_size(request.scale)?;
		let options = ReadOptions::new(request.resampling.unwrap_or(self.config.tile_resampling))
			.with_bands(request.bands.clone())
			.with_nodata(request.nodata);
		composite_tile(
			self.opener.as_ref(),
			&request.addresses,
			&request.coord,
			tile_size,
			request.selection,
			&options,
			self.config.read_timeout(),
		)
		.await
	}

	/// Statistics of the valid pixels inside a bounding box.
	///
	/// [`Outcome::Empty`] when the box holds no valid pixel, e.g. because it lies outside the
	/// source.
	pub async fn area_stats(&self, request: &StatsRequest) -> Result<Outcome<AreaStats>> {
		let bbox = BBoxRequest::new(request.bbox, request.bbox_crs)?;
		let max_size = request.max_size.unwrap_or(self.config.max_stats_size);
		let bins = request.histogram_bins.unwrap_or(self.config.histogram_bins);
		let range = request.histogram_range;
		let options = ReadOptions::new(request.resampling.unwrap_or(self.config.area_resampling))
			.with_bands(request.bands.clone())
			.with_nodata(request.nodata);

		self
			.with_source(&request.address, move |source| {
				let block = read_window(source, &bbox, max_size, &options)?;
				if !block.pixels.has_valid() {
					return Ok(Outcome::Empty);
				}
				let statistics = compute_stats(&block.pixels, &block.bands, bins, range)?;
				Ok(if statistics.is_empty() {
					Outcome::Empty
				} else {
					Outcome::Data(AreaStats {
						statistics,
						bands: block.bands,
					})
				})
			})
			.await
	}

	/// Bounds, zoom range, band names and statistics of a whole source.
	pub async fn metadata(&self, request: &MetadataRequest) -> Result<Metadata> {
		let tile_size = self.config.tile_base_size;
		let options = MetadataOptions {
			max_size: request.max_size.unwrap_or(self.config.metadata_max_size),
			overview_level: request.overview_level,
			histogram_bins: request.histogram_bins.unwrap_or(self.config.histogram_bins),
			histogram_range: request.histogram_range,
			read: ReadOptions::new(self.config.area_resampling)
				.with_bands(request.bands.clone())
				.with_nodata(request.nodata),
		};
		self
			.with_source(&request.address, move |source| {
				compute_metadata(source, tile_size, &options)
			})
			.await
	}

	/// Band values at a geographic coordinate. Fails with `OUT_OF_BOUNDS` outside the source.
	pub async fn point(&self, address: &str, lon: f64, lat: f64, bands: Option<BandSelection>) -> Result<Vec<PointValue>> {
		self
			.with_source(address, move |source| read_point(source, lon, lat, bands.as_ref()))
			.await
	}

	/// Bounds and zoom range of the union of `addresses`, opened concurrently.
	pub async fn spatial_info(&self, addresses: &[String]) -> Result<SpatialInfo> {
		spatial_info_many(
			self.opener.as_ref(),
			addresses,
			self.config.tile_base_size,
			&self.config.concurrency(),
			self.config.read_timeout(),
		)
		.await
	}

	pub async fn mvt(&self, request: &TileRequest, options: &MvtOptions) -> Result<Blob> {
		let block = self.tile(request).await?;
		encode_vector_tile(&block.pixels, &block.bands, &options.layer_name, options.feature_type)
	}

	pub async fn mosaic_mvt(&self, request: &MosaicRequest, options: &MvtOptions) -> Result<Outcome<Blob>> {
		self.mosaic_tile(request).await?.try_map(|block| {
			encode_vector_tile(&block.pixels, &block.bands, &options.layer_name, options.feature_type)
		})
	}

	pub async fn encoded_tile(&self, request: &TileRequest, options: &RenderOptions) -> Result<Blob> {
		let block = self.tile(request).await?;
		self.render(&block, options)
	}

	pub async fn encoded_mosaic_tile(&self, request: &MosaicRequest, options: &RenderOptions) -> Result<Outcome<Blob>> {
		self
			.mosaic_tile(request)
			.await?
			.try_map(|block| self.render(&block, options))
	}

	/// Post-processes and encodes a block.
	pub fn render(&self, block: &RasterBlock, options: &RenderOptions) -> Result<Blob> {
		let bytes = match options.dem {
			Some(encoding) => {
				ensure!(
					options.rescale.is_none() && options.color_formula.is_none() && options.colormap.is_none(),
					TileError::InvalidParameter(
						"dem cannot be combined with rescale, color_formula or colormap".to_string()
					)
				);
				encode_dem(&block.pixels, encoding)?
			}
			None => postprocess(
				&block.pixels,
				options.rescale.as_deref(),
				options.color_formula.as_deref(),
			)?,
		};
		let encoding = options.encoding.as_ref().unwrap_or(&self.config.encoding);
		encode_image(&bytes, options.format, options.colormap.as_ref(), encoding)
	}
}
