//! Map tiles, mosaics, statistics and vector tiles from georeferenced rasters.
//!
//! [`Tiler`] is the entry point. It takes typed request options (see [`options`]) and
//! returns pixel blocks, [`Outcome`]s or encoded bytes. Routing layers parse their query
//! strings with [`params`] first.

pub mod api;
pub mod config;
pub mod options;
pub mod params;

pub use api::{AreaStats, Tiler};
pub use config::Config;
pub use options::*;

pub use cogtiler_core::{BandSelection, Blob, Crs, ErrorKind, Nodata, Outcome, ResampleAlg, TileCoord, TileError, error_kind};
pub use cogtiler_geometry::FeatureType;
pub use cogtiler_image::{ColorOperation, Colormap, DemEncoding, EncodeOptions, ImageFormat};
pub use cogtiler_raster::{MemoryCatalog, MemorySource, PixelSelection, RasterBlock, SourceOpener};
#[cfg(feature = "gdal")]
pub use cogtiler_raster::GdalOpener;
