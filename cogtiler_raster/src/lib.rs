//! Reading georeferenced rasters onto tile grids, compositing mosaics and computing statistics.
//!
//! Sources are reached through the [`RasterSource`] trait. [`MemorySource`] keeps a raster in
//! memory; with the `gdal` feature, [`GdalSource`] reads anything GDAL can open.

#[cfg(feature = "gdal")]
mod gdal_source;
mod memory;
pub mod mosaic;
pub mod reader;
mod source;
pub mod spatial;
pub mod stats;
mod warp;

#[cfg(feature = "gdal")]
pub use gdal_source::{GdalOpener, GdalSource};
pub use memory::*;
pub use mosaic::{PixelSelection, SelectionMethod, composite_tile};
pub use reader::*;
pub use source::*;
pub use spatial::{SpatialInfo, spatial_info, spatial_info_many};
pub use stats::{BandStatistics, BoundsRecord, Histogram, Metadata, MetadataOptions, compute_metadata, compute_stats};
pub use warp::warp_source;
