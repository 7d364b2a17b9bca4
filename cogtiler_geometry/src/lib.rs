//! Vector tile output: the MVT protobuf model and the pixel-to-feature encoder.

pub mod pixel_encoder;
pub mod vector_tile;

pub use pixel_encoder::{EXTENT, FeatureType, encode_vector_tile};
pub use vector_tile::{VectorTile, VectorTileFeature, VectorTileLayer};
