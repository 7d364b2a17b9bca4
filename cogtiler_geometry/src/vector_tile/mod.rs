//! Mapbox Vector Tile (MVT) wire model: tiles hold layers, layers hold features and the
//! key/value tables that feature tags point into.

mod feature;
mod geom_type;
mod layer;
mod property_table;
mod tile;
mod value;

pub use feature::{GeometryWriter, VectorTileFeature};
pub use geom_type::GeomType;
pub use layer::VectorTileLayer;
pub use property_table::{IndexedList, PropertyTable};
pub use tile::VectorTile;
pub use value::TileValue;
