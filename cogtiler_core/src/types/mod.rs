//! Contains types like coordinates, bounding boxes, spatial references, pixel blocks and more.

mod band;
pub use band::*;

mod bbox_request;
pub use bbox_request::*;

mod blob;
pub use blob::*;

mod constants;
pub use constants::*;

mod crs;
pub use crs::*;

mod geo_bbox;
pub use geo_bbox::*;

mod geo_transform;
pub use geo_transform::*;

mod nodata;
pub use nodata::*;

mod outcome;
pub use outcome::*;

mod pixel_block;
pub use pixel_block::*;

mod resample;
pub use resample::*;

mod tile_coord;
pub use tile_coord::*;

mod zoom;
pub use zoom::*;
