//! Explicit request options for every [`Tiler`](crate::Tiler) operation.
//!
//! Optional fields left at `None` fall back to the [`Config`](crate::Config) defaults.

use cogtiler_core::{BandSelection, Crs, Nodata, ResampleAlg, TileCoord};
use cogtiler_geometry::FeatureType;
use cogtiler_image::{ColorOperation, Colormap, DemEncoding, EncodeOptions, ImageFormat};
use cogtiler_raster::PixelSelection;

/// One tile of one source.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRequest {
	pub address: String,
	pub coord: TileCoord,
	/// Tile edge is `tile_base_size * scale`.
	pub scale: u32,
	pub bands: Option<BandSelection>,
	pub nodata: Option<Nodata>,
	pub resampling: Option<ResampleAlg>,
}

impl TileRequest {
	pub fn new(address: &str, coord: TileCoord) -> TileRequest {
		TileRequest {
			address: address.to_string(),
			coord,
			scale: 1,
			bands: None,
			nodata: None,
			resampling: None,
		}
	}

	pub fn with_bands(mut self, bands: BandSelection) -> TileRequest {
		self.bands = Some(bands);
		self
	}

	pub fn with_nodata(mut self, nodata: Nodata) -> TileRequest {
		self.nodata = Some(nodata);
		self
	}
}

/// One tile composited from an ordered list of sources.
#[derive(Clone, Debug, PartialEq)]
pub struct MosaicRequest {
	pub addresses: Vec<String>,
	pub coord: TileCoord,
	pub scale: u32,
	pub selection: PixelSelection,
	pub bands: Option<BandSelection>,
	pub nodata: Option<Nodata>,
	pub resampling: Option<ResampleAlg>,
}

impl MosaicRequest {
	pub fn new(addresses: &[&str], coord: TileCoord, selection: PixelSelection) -> MosaicRequest {
		MosaicRequest {
			addresses: addresses.iter().map(|a| (*a).to_string()).collect(),
			coord,
			scale: 1,
			selection,
			bands: None,
			nodata: None,
			resampling: None,
		}
	}
}

/// Statistics of a bounding box of one source.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsRequest {
	pub address: String,
	/// `[left, bottom, right, top]` in `bbox_crs`.
	pub bbox: [f64; 4],
	pub bbox_crs: Crs,
	/// Largest edge of the read; `max_stats_size` when unset.
	pub max_size: Option<usize>,
	pub bands: Option<BandSelection>,
	pub nodata: Option<Nodata>,
	pub resampling: Option<ResampleAlg>,
	pub histogram_bins: Option<usize>,
	pub histogram_range: Option<[f64; 2]>,
}

impl StatsRequest {
	pub fn new(address: &str, bbox: [f64; 4]) -> StatsRequest {
		StatsRequest {
			address: address.to_string(),
			bbox,
			bbox_crs: Crs::Wgs84,
			max_size: None,
			bands: None,
			nodata: None,
			resampling: None,
			histogram_bins: None,
			histogram_range: None,
		}
	}
}

/// Bounds, zoom range and statistics of a whole source.
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataRequest {
	pub address: String,
	/// Largest edge of the preview read; `metadata_max_size` when unset.
	pub max_size: Option<usize>,
	/// Reads at overview level `n` instead of `max_size`.
	pub overview_level: Option<u32>,
	pub histogram_bins: Option<usize>,
	pub histogram_range: Option<[f64; 2]>,
	pub bands: Option<BandSelection>,
	pub nodata: Option<Nodata>,
}

impl MetadataRequest {
	pub fn new(address: &str) -> MetadataRequest {
		MetadataRequest {
			address: address.to_string(),
			max_size: None,
			overview_level: None,
			histogram_bins: None,
			histogram_range: None,
			bands: None,
			nodata: None,
		}
	}
}

/// How a tile is turned into image bytes.
///
/// `dem` replaces rescaling and the color formula, so it cannot be combined with either.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
	pub format: ImageFormat,
	/// One `[min, max]` per band, or a single one for all bands.
	pub rescale: Option<Vec<[f64; 2]>>,
	pub color_formula: Option<Vec<ColorOperation>>,
	pub colormap: Option<Colormap>,
	pub dem: Option<DemEncoding>,
	/// Encoder settings; the configured `encoding` when unset.
	pub encoding: Option<EncodeOptions>,
}

impl RenderOptions {
	pub fn new(format: ImageFormat) -> RenderOptions {
		RenderOptions {
			format,
			rescale: None,
			color_formula: None,
			colormap: None,
			dem: None,
			encoding: None,
		}
	}
}

/// Vector tile output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MvtOptions {
	pub layer_name: String,
	pub feature_type: FeatureType,
}

impl Default for MvtOptions {
	fn default() -> Self {
		MvtOptions {
			layer_name: "cogeo".to_string(),
			feature_type: FeatureType::Point,
		}
	}
}
