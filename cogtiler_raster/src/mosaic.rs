//! Compositing one tile from an ordered list of sources.
//!
//! Sources are read one after another in list order. Each [`PixelSelection`] policy has its own
//! [`SelectionMethod`] that receives every block read. Only `first` may stop early, and only
//! once every pixel of the tile is covered.

use crate::{RasterBlock, ReadOptions, SourceOpener, open_source, read_tile, run_blocking};
use anyhow::{Result, ensure};
use cogtiler_core::{BandDescriptor, ErrorKind, Outcome, PixelBlock, TileCoord, TileError, error_kind};
use ndarray::{Array2, Array3, Zip};
use serde::Deserialize;
use std::{fmt, str::FromStr, time::Duration};

/// How overlapping sources are resolved per pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelSelection {
	/// The first source with a valid pixel wins.
	#[default]
	First,
	/// Per band, the highest valid value wins.
	Highest,
	/// Per band, the lowest valid value wins.
	Lowest,
	/// Sample standard deviation of all valid values.
	Stdev,
}

impl PixelSelection {
	pub fn as_str(&self) -> &'static str {
		match self {
			PixelSelection::First => "first",
			PixelSelection::Highest => "highest",
			PixelSelection::Lowest => "lowest",
			PixelSelection::Stdev => "stdev",
		}
	}

	pub fn method(&self) -> Box<dyn SelectionMethod> {
		match self {
			PixelSelection::First => Box::new(FirstMethod::default()),
			PixelSelection::Highest => Box::new(ExtremeMethod::new(|new, old| new > old)),
			PixelSelection::Lowest => Box::new(ExtremeMethod::new(|new, old| new < old)),
			PixelSelection::Stdev => Box::new(StdevMethod::default()),
		}
	}
}

impl FromStr for PixelSelection {
	type Err = anyhow::Error;

	fn from_str(text: &str) -> Result<Self> {
		Ok(match text.trim().to_ascii_lowercase().as_str() {
			"first" => PixelSelection::First,
			"highest" => PixelSelection::Highest,
			"lowest" => PixelSelection::Lowest,
			"stdev" => PixelSelection::Stdev,
			_ => {
				return Err(TileError::InvalidParameter(format!("unknown pixel selection method '{text}'")).into());
			}
		})
	}
}

impl fmt::Display for PixelSelection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Accumulates the blocks of a mosaic into one result.
pub trait SelectionMethod: Send {
	/// Merges the next block. All blocks of a mosaic have the same shape.
	fn feed(&mut self, block: &PixelBlock) -> Result<()>;

	/// `true` once further blocks cannot change the result.
	fn is_done(&self) -> bool {
		false
	}

	/// The merged block, `None` if no block was fed.
	fn finish(self: Box<Self>) -> Option<PixelBlock>;
}

fn check_shape(accumulated: &PixelBlock, block: &PixelBlock) -> Result<()> {
	ensure!(
		accumulated.data().dim() == block.data().dim(),
		"mosaic block shape {:?} differs from {:?}",
		block.data().dim(),
		accumulated.data().dim()
	);
	Ok(())
}

/// Fills still-invalid pixels from later blocks.
#[derive(Default)]
struct FirstMethod {
	result: Option<PixelBlock>,
}

impl SelectionMethod for FirstMethod {
	fn feed(&mut self, block: &PixelBlock) -> Result<()> {
		let Some(result) = &mut self.result else {
			self.result = Some(block.clone());
			return Ok(());
		};
		check_shape(result, block)?;
		let (data, mask) = result.parts_mut();
		for ((row, col), &valid) in block.mask().indexed_iter() {
			if valid && !mask[[row, col]] {
				for band in 0..block.bands() {
					data[[band, row, col]] = block.data()[[band, row, col]];
				}
				mask[[row, col]] = true;
			}
		}
		Ok(())
	}

	fn is_done(&self) -> bool {
		self.result.as_ref().is_some_and(PixelBlock::is_fully_valid)
	}

	fn finish(self: Box<Self>) -> Option<PixelBlock> {
		self.result
	}
}

/// Keeps, per band and pixel, the valid value preferred by `prefer(new, old)`.
struct ExtremeMethod {
	result: Option<PixelBlock>,
	prefer: fn(f64, f64) -> bool,
}

impl ExtremeMethod {
	fn new(prefer: fn(f64, f64) -> bool) -> ExtremeMethod {
		ExtremeMethod { result: None, prefer }
	}
}

impl SelectionMethod for ExtremeMethod {
	fn feed(&mut self, block: &PixelBlock) -> Result<()> {
		let Some(result) = &mut self.result else {
			self.result = Some(block.clone());
			return Ok(());
		};
		check_shape(result, block)?;
		let (data, mask) = result.parts_mut();
		for ((row, col), &valid) in block.mask().indexed_iter() {
			if !valid {
				continue;
			}
			let seen = mask[[row, col]];
			for band in 0..block.bands() {
				let value = block.data()[[band, row, col]];
				if !seen || (self.prefer)(value, data[[band, row, col]]) {
					data[[band, row, col]] = value;
				}
			}
			mask[[row, col]] = true;
		}
		Ok(())
	}

	fn finish(self: Box<Self>) -> Option<PixelBlock> {
		self.result
	}
}

/// Running per-pixel mean and sum of squared deviations (Welford).
#[derive(Default)]
struct StdevMethod {
	state: Option<(Array2<u32>, Array3<f64>, Array3<f64>)>,
}

impl SelectionMethod for StdevMethod {
	fn feed(&mut self, block: &PixelBlock) -> Result<()> {
		let (bands, height, width) = block.data().dim();
		let (count, mean, m2) = self.state.get_or_insert_with(|| {
			(
				Array2::zeros((height, width)),
				Array3::zeros((bands, height, width)),
				Array3::zeros((bands, height, width)),
			)
		});
		ensure!(
			mean.dim() == (bands, height, width),
			"mosaic block shape {:?} differs from {:?}",
			(bands, height, width),
			mean.dim()
		);

		Zip::from(&mut *count).and(block.mask()).for_each(|n, &valid| {
			if valid {
				*n += 1;
			}
		});
		for ((band, row, col), &value) in block.data().indexed_iter() {
			if !block.mask()[[row, col]] {
				continue;
			}
			let n = f64::from(count[[row, col]]);
			let delta = value - mean[[band, row, col]];
			mean[[band, row, col]] += delta / n;
			m2[[band, row, col]] += delta * (value - mean[[band, row, col]]);
		}
		Ok(())
	}

	fn finish(self: Box<Self>) -> Option<PixelBlock> {
		let (count, _, m2) = self.state?;
		let mut data = m2;
		for ((_, row, col), value) in data.indexed_iter_mut() {
			let n = count[[row, col]];
			*value = if n > 1 { (*value / f64::from(n - 1)).sqrt() } else { 0.0 };
		}
		let mask = count.mapv(|n| n > 0);
		PixelBlock::new(data, mask).ok()
	}
}

/// Opens `address` and reads `coord` from it, both bounded by `timeout`.
async fn read_source(
	opener: &dyn SourceOpener,
	address: &str,
	coord: TileCoord,
	tile_size: u32,
	options: &ReadOptions,
	timeout: Option<Duration>,
) -> Result<RasterBlock> {
	let source = open_source(opener, address, timeout).await?;
	let options = options.clone();
	run_blocking(address, timeout, move || {
		read_tile(source.as_ref(), &coord, tile_size, &options)
	})
	.await
}

/// Composites the tile `coord` from `addresses`, in order, with the given policy.
///
/// A source that cannot be opened or read ([`ErrorKind::SourceUnreadable`]) is logged and
/// skipped, unless it is the only source. Any other failure, such as an invalid band, ends
/// the mosaic at once. If every source is unreadable, the last failure is returned. The band descriptors are those of
/// the first source that could be read. [`Outcome::Empty`] means no source had a single
/// valid pixel.
pub async fn composite_tile(
	opener: &dyn SourceOpener,
	addresses: &[String],
	coord: &TileCoord,
	tile_size: u32,
	selection: PixelSelection,
	options: &ReadOptions,
	timeout: Option<Duration>,
) -> Result<Outcome<RasterBlock>> {
	if addresses.is_empty() {
		return Err(TileError::InvalidParameter("a mosaic needs at least one source".to_string()).into());
	}

	let mut method = selection.method();
	let mut bands: Option<Vec<BandDescriptor>> = None;
	let mut last_error = None;

	for (index, address) in addresses.iter().enumerate() {
		match read_source(opener, address, *coord, tile_size, options, timeout).await {
			Ok(block) => {
				method.feed(&block.pixels)?;
				bands.get_or_insert(block.bands);
			}
			Err(error) if addresses.len() > 1 && error_kind(&error) == Some(ErrorKind::SourceUnreadable) => {
				log::warn!("skipping {address} while compositing {coord:?}: {error:#}");
				last_error = Some(error);
			}
			Err(error) => return Err(error),
		}
		if method.is_done() {
			log::debug!(
				"{coord:?} fully covered after {} of {} sources",
				index + 1,
				addresses.len()
			);
			break;
		}
	}

	let Some(bands) = bands else {
		let error = last_error.unwrap_or_else(|| TileError::SourceUnreadable("no source could be read".to_string()).into());
		return Err(error.context(format!("every source of the {selection} mosaic for {coord:?} failed")));
	};

	Ok(match method.finish() {
		Some(pixels) if pixels.has_valid() => Outcome::Data(RasterBlock { pixels, bands }),
		_ => Outcome::Empty,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MemoryCatalog, MemorySource, RasterSource};
	use approx::assert_abs_diff_eq;
	use async_trait::async_trait;
	use cogtiler_core::{BandSelection, Crs, Nodata, WORLD_SIZE};
	use ndarray::array;
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use std::sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	};

	fn world(address: &str, data: Array3<f64>) -> MemorySource {
		let half = WORLD_SIZE / 2.0;
		MemorySource::from_bounds(address, Crs::WebMercator, [-half, -half, half, half], data)
	}

	/// Counts how many sources were opened.
	struct CountingOpener {
		catalog: MemoryCatalog,
		opened: AtomicUsize,
	}

	#[async_trait]
	impl SourceOpener for CountingOpener {
		async fn open(&self, address: &str) -> Result<Arc<dyn RasterSource>> {
			self.opened.fetch_add(1, Ordering::SeqCst);
			self.catalog.open(address).await
		}
	}

	fn opener() -> CountingOpener {
		let catalog = MemoryCatalog::new()
			.with(world("left", array![[[1.0, -1.0], [1.0, -1.0]]]).with_nodata(Nodata::Value(-1.0)))
			.with(world("full", array![[[2.0, 2.0], [2.0, 2.0]]]))
			.with(world("diagonal", array![[[5.0, 0.0], [0.0, 5.0]]]))
			.with(world("void", array![[[-1.0, -1.0], [-1.0, -1.0]]]).with_nodata(Nodata::Value(-1.0)));
		CountingOpener {
			catalog,
			opened: AtomicUsize::new(0),
		}
	}

	async fn composite(opener: &CountingOpener, addresses: &[&str], selection: PixelSelection) -> Result<Outcome<RasterBlock>> {
		let addresses: Vec<String> = addresses.iter().map(|a| a.to_string()).collect();
		let coord = TileCoord::new(0, 0, 0)?;
		composite_tile(opener, &addresses, &coord, 2, selection, &ReadOptions::default(), None).await
	}

	fn values(outcome: Outcome<RasterBlock>) -> (Array2<f64>, Array2<bool>) {
		let block = outcome.into_option().unwrap();
		(block.pixels.band(0).to_owned(), block.pixels.mask().clone())
	}

	#[rstest]
	#[case("first", PixelSelection::First)]
	#[case("Highest", PixelSelection::Highest)]
	#[case(" lowest ", PixelSelection::Lowest)]
	#[case("stdev", PixelSelection::Stdev)]
	fn parses_policies(#[case] text: &str, #[case] expected: PixelSelection) {
		assert_eq!(text.parse::<PixelSelection>().unwrap(), expected);
	}

	#[test]
	fn unknown_policy_is_invalid_parameter() {
		let error = "median".parse::<PixelSelection>().unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter));
	}

	#[tokio::test]
	async fn first_fills_gaps_in_order() -> Result<()> {
		let opener = opener();
		let (data, mask) = values(composite(&opener, &["left", "full", "diagonal"], PixelSelection::First).await?);
		assert_eq!(data, array![[1.0, 2.0], [1.0, 2.0]]);
		assert!(mask.iter().all(|&v| v));
		assert_eq!(opener.opened.load(Ordering::SeqCst), 2);
		Ok(())
	}

	#[tokio::test]
	async fn first_stops_on_full_coverage() -> Result<()> {
		let opener = opener();
		let (data, _) = values(composite(&opener, &["full", "left", "diagonal"], PixelSelection::First).await?);
		assert_eq!(data, array![[2.0, 2.0], [2.0, 2.0]]);
		assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
		Ok(())
	}

	#[tokio::test]
	async fn highest_and_lowest_read_every_source() -> Result<()> {
		let opener = opener();
		let (data, mask) = values(composite(&opener, &["left", "diagonal"], PixelSelection::Highest).await?);
		assert_eq!(data, array![[5.0, 0.0], [1.0, 5.0]]);
		assert!(mask.iter().all(|&v| v));

		let (data, _) = values(composite(&opener, &["left", "diagonal"], PixelSelection::Lowest).await?);
		assert_eq!(data, array![[1.0, 0.0], [0.0, 5.0]]);
		assert_eq!(opener.opened.load(Ordering::SeqCst), 4);
		Ok(())
	}

	#[tokio::test]
	async fn stdev_is_the_sample_deviation() -> Result<()> {
		let opener = opener();
		let (data, _) = values(composite(&opener, &["full", "diagonal"], PixelSelection::Stdev).await?);
		assert_abs_diff_eq!(data[[0, 0]], 2.1213203435596424, epsilon = 1e-12);
		assert_abs_diff_eq!(data[[0, 1]], std::f64::consts::SQRT_2, epsilon = 1e-12);
		Ok(())
	}

	#[tokio::test]
	async fn single_source_stdev_is_zero() -> Result<()> {
		let opener = opener();
		let source = opener.catalog.open("left").await?;
		let tile = read_tile(source.as_ref(), &TileCoord::new(0, 0, 0)?, 2, &ReadOptions::default())?;
		let (data, mask) = values(composite(&opener, &["left"], PixelSelection::Stdev).await?);
		assert_eq!(&mask, tile.pixels.mask());
		assert_eq!(mask, array![[true, false], [true, false]]);
		assert_eq!(data[[0, 0]], 0.0);
		assert_eq!(data[[1, 0]], 0.0);
		Ok(())
	}

	#[tokio::test]
	async fn single_source_matches_plain_tile() -> Result<()> {
		let opener = opener();
		let source = opener.catalog.open("left").await?;
		let tile = read_tile(source.as_ref(), &TileCoord::new(0, 0, 0)?, 2, &ReadOptions::default())?;
		for selection in [PixelSelection::First, PixelSelection::Highest, PixelSelection::Lowest] {
			let block = composite(&opener, &["left"], selection).await?.into_option().unwrap();
			assert_eq!(block, tile);
		}
		Ok(())
	}

	#[tokio::test]
	async fn nothing_valid_is_empty() -> Result<()> {
		let opener = opener();
		assert!(composite(&opener, &["void", "void"], PixelSelection::Highest).await?.is_empty());
		Ok(())
	}

	#[tokio::test]
	async fn failing_sources_are_skipped() -> Result<()> {
		let opener = opener();
		let (data, _) = values(composite(&opener, &["missing", "full"], PixelSelection::First).await?);
		assert_eq!(data, array![[2.0, 2.0], [2.0, 2.0]]);

		let error = composite(&opener, &["missing"], PixelSelection::First).await.unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::SourceUnreadable));

		let error = composite(&opener, &["missing", "gone"], PixelSelection::First).await.unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::SourceUnreadable));

		let error = composite(&opener, &[], PixelSelection::First).await.unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter));
		Ok(())
	}

	#[tokio::test]
	async fn invalid_bands_fail_at_once() -> Result<()> {
		let opener = opener();
		let addresses: Vec<String> = ["full", "diagonal", "left"].iter().map(|a| a.to_string()).collect();
		let options = ReadOptions::default().with_bands(Some(BandSelection(vec![2])));
		let coord = TileCoord::new(0, 0, 0)?;
		let error = composite_tile(&opener, &addresses, &coord, 2, PixelSelection::First, &options, None)
			.await
			.unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidBand));
		assert_eq!(opener.opened.load(Ordering::SeqCst), 1);
		Ok(())
	}
}
