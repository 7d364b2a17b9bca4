//! Engine configuration, read once at start and shared read-only.
//!
//! ```yaml
//! tile_base_size: 256
//! tile_resampling: nearest
//! area_resampling: bilinear
//! max_threads: 8
//! read_timeout_seconds: 30
//! max_stats_size: 512
//! metadata_max_size: 1024
//! histogram_bins: 20
//! encoding:
//!   jpeg_quality: 85
//!   webp_quality: 80
//!   webp_lossless: false
//! ```

use anyhow::{Context, Result, ensure};
use cogtiler_core::{ConcurrencyLimits, ResampleAlg};
use cogtiler_image::EncodeOptions;
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
	time::Duration,
};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Edge length of a tile at scale 1.
	pub tile_base_size: u32,

	/// Resampling of tile and mosaic reads.
	pub tile_resampling: ResampleAlg,

	/// Resampling of bbox, statistics and metadata reads.
	pub area_resampling: ResampleAlg,

	/// Size of the fan-out pool; derived from the CPU count when unset.
	pub max_threads: Option<usize>,

	/// Per-source bound on opening and reading. Unbounded when unset.
	pub read_timeout_seconds: Option<f64>,

	/// Largest edge of a statistics read.
	pub max_stats_size: usize,

	/// Largest edge of the preview read behind metadata.
	pub metadata_max_size: usize,

	pub histogram_bins: usize,

	/// Encoder defaults.
	pub encoding: EncodeOptions,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			tile_base_size: 256,
			tile_resampling: ResampleAlg::Nearest,
			area_resampling: ResampleAlg::Bilinear,
			max_threads: None,
			read_timeout_seconds: None,
			max_stats_size: 512,
			metadata_max_size: 1024,
			histogram_bins: 20,
			encoding: EncodeOptions::default(),
		}
	}
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		let config: Config = serde_yaml_ng::from_reader(reader)?;
		config.check()?;
		Ok(config)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		if text.trim().is_empty() {
			return Ok(Config::default());
		}
		let config: Config = serde_yaml_ng::from_str(text)?;
		config.check()?;
		Ok(config)
	}

	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("Failed to open config file {path:?}"))?;
		Config::from_reader(BufReader::new(file)).with_context(|| format!("Failed to parse config file {path:?}"))
	}

	fn check(&self) -> Result<()> {
		ensure!(self.tile_base_size > 0, "tile_base_size must be positive");
		ensure!(self.histogram_bins > 0, "histogram_bins must be positive");
		ensure!(self.max_threads != Some(0), "max_threads must be positive");
		if let Some(seconds) = self.read_timeout_seconds {
			ensure!(
				seconds.is_finite() && seconds > 0.0,
				"read_timeout_seconds must be a positive number"
			);
		}
		Ok(())
	}

	pub fn read_timeout(&self) -> Option<Duration> {
		self.read_timeout_seconds.map(Duration::from_secs_f64)
	}

	pub fn concurrency(&self) -> ConcurrencyLimits {
		ConcurrencyLimits::with_max_threads(self.max_threads)
	}

	/// Edge length of a tile at `scale`.
	pub fn tile_size(&self, scale: u32) -> Result<u32> {
		cogtiler_core::tile_size(self.tile_base_size, scale)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;
	use std::io::Write;

	#[test]
	fn parse_empty_config() {
		assert_eq!(Config::from_string("").unwrap(), Config::default());
	}

	#[test]
	fn parse_full_config() -> Result<()> {
		let config = Config::from_string(
			"tile_base_size: 512\n\
			 tile_resampling: bilinear\n\
			 area_resampling: nearest\n\
			 max_threads: 3\n\
			 read_timeout_seconds: 2.5\n\
			 max_stats_size: 128\n\
			 metadata_max_size: 256\n\
			 histogram_bins: 10\n\
			 encoding:\n  jpeg_quality: 70\n  webp_lossless: true\n",
		)?;
		assert_eq!(config.tile_base_size, 512);
		assert_eq!(config.tile_resampling, ResampleAlg::Bilinear);
		assert_eq!(config.area_resampling, ResampleAlg::Nearest);
		assert_eq!(config.concurrency(), ConcurrencyLimits::new(3, 3));
		assert_eq!(config.read_timeout(), Some(Duration::from_millis(2500)));
		assert_eq!(config.max_stats_size, 128);
		assert_eq!(config.metadata_max_size, 256);
		assert_eq!(config.histogram_bins, 10);
		assert_eq!(config.encoding.jpeg_quality, 70);
		assert_eq!(config.encoding.webp_quality, 80);
		assert!(config.encoding.webp_lossless);
		assert_eq!(config.tile_size(2)?, 1024);
		Ok(())
	}

	#[test]
	fn parse_invalid_config() {
		assert!(Config::from_string("tile_size: 256").is_err());
		assert!(Config::from_string("tile_resampling: lanczos").is_err());
		assert!(Config::from_string("histogram_bins: 0").is_err());
		assert!(Config::from_string("read_timeout_seconds: -1").is_err());
		assert!(Config::from_string("encoding:\n  png_level: 3").is_err());
	}

	#[test]
	fn parse_from_path() -> Result<()> {
		let mut file = tempfile::NamedTempFile::new()?;
		writeln!(file, "max_stats_size: 64")?;
		let config = Config::from_path(file.path())?;
		assert_eq!(config.max_stats_size, 64);
		assert!(Config::from_path(Path::new("/does/not/exist.yml")).is_err());
		Ok(())
	}
}
