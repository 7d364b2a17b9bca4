//! Post-processing and raster encoders: rescaling, color formulas, colormaps,
//! elevation RGB encodings and PNG/JPEG/WebP output.

pub mod colormap;
pub mod dem;
pub mod encode;
pub mod format;
pub mod postprocess;

pub use colormap::{Colormap, ColormapName, apply_colormap};
pub use dem::{DemEncoding, encode_dem, encode_terrain_rgb};
pub use encode::{EncodeOptions, ImageFormat, decode_png, encode_image};
pub use postprocess::{ColorOperation, apply_color_formula, postprocess, rescale, to_bytes};
