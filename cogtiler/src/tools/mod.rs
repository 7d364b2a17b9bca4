pub mod info;
pub mod point;
pub mod stats;
pub mod tile;

use anyhow::{Context, Result};
use cogtiler::{BandSelection, Config, Nodata, SourceOpener, TileCoord, Tiler, TileError, params};
use serde::Serialize;
use std::{io::Write, path::Path, sync::Arc};

/// Builds the tiler from the optional config file.
pub fn tiler(config: Option<&Path>) -> Result<Tiler> {
	let config = match config {
		Some(path) => Config::from_path(path)?,
		None => Config::default(),
	};
	Ok(Tiler::new(config, opener()))
}

#[cfg(feature = "gdal")]
fn opener() -> Arc<dyn SourceOpener> {
	Arc::new(cogtiler::GdalOpener)
}

#[cfg(not(feature = "gdal"))]
fn opener() -> Arc<dyn SourceOpener> {
	log::warn!("built without the gdal feature, no raster file can be opened");
	Arc::new(cogtiler::MemoryCatalog::new())
}

/// Parses `z/x/y`.
pub fn parse_tile_coord(text: &str) -> Result<TileCoord> {
	let parts: Option<Vec<u32>> = text.split('/').map(|part| part.trim().parse().ok()).collect();
	match parts.as_deref() {
		Some(&[z, x, y]) => {
			let level = u8::try_from(z).map_err(|_| TileError::InvalidGeometry(format!("invalid zoom level {z}")))?;
			TileCoord::new(level, x, y)
		}
		_ => Err(TileError::InvalidGeometry(format!("invalid tile '{text}', expected 'z/x/y'")).into()),
	}
}

// The band and nodata arguments every read accepts.
#[derive(clap::Args, Debug)]
pub struct ReadArgs {
	/// 1-based band indexes, e.g. "1,2,3"
	#[arg(long, short, value_name = "list", display_order = 10)]
	indexes: Option<String>,

	/// overrides the nodata value of the source, a number or "nan"
	#[arg(long, value_name = "value", allow_hyphen_values = true, display_order = 10)]
	nodata: Option<String>,
}

impl ReadArgs {
	pub fn bands(&self) -> Result<Option<BandSelection>> {
		self.indexes.as_deref().map(params::parse_indexes).transpose()
	}

	pub fn nodata(&self) -> Result<Option<Nodata>> {
		self.nodata.as_deref().map(params::parse_nodata).transpose()
	}
}

/// Writes bytes to `output`, or to stdout without one.
pub fn write_output(bytes: &[u8], output: Option<&Path>) -> Result<()> {
	match output {
		Some(path) => std::fs::write(path, bytes).with_context(|| format!("Failed to write {path:?}")),
		None => {
			let mut stdout = std::io::stdout().lock();
			stdout.write_all(bytes)?;
			Ok(stdout.flush()?)
		}
	}
}

pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
	let mut json = serde_json::to_string_pretty(value)?;
	json.push('\n');
	write_output(json.as_bytes(), output)
}
