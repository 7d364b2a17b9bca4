//! Per-band summary statistics and histograms over the valid pixels of a block.

use crate::{ReadOptions, RasterSource, read_extent, spatial_info};
use anyhow::{Result, ensure};
use cogtiler_core::{BandDescriptor, PixelBlock, TileError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Equal-width bins and their `counts.len() + 1` edges.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
	pub counts: Vec<u64>,
	pub edges: Vec<f64>,
}

impl Histogram {
	/// Bins `values` into `bins` equal-width bins over `range`, or over the value range when
	/// none is given. The last bin includes its upper edge. Values outside `range` are not
	/// counted. A zero-width range is widened by 0.5 to both sides.
	fn new(values: &[f64], bins: usize, range: Option<[f64; 2]>) -> Histogram {
		let [mut low, mut high] = range.unwrap_or_else(|| {
			values
				.iter()
				.fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], &v| [lo.min(v), hi.max(v)])
		});
		if !low.is_finite() || !high.is_finite() {
			[low, high] = [0.0, 1.0];
		}
		if low == high {
			low -= 0.5;
			high += 0.5;
		}

		let width = (high - low) / bins as f64;
		let edges: Vec<f64> = (0..=bins).map(|i| low + (high - low) * i as f64 / bins as f64).collect();
		let mut counts = vec![0u64; bins];
		for &value in values {
			if value < low || value > high {
				continue;
			}
			let bin = ((value - low) / width) as usize;
			counts[bin.min(bins - 1)] += 1;
		}
		Histogram { counts, edges }
	}
}

/// Summary of one band.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BandStatistics {
	pub min: f64,
	pub max: f64,
	pub mean: f64,
	/// Population standard deviation.
	pub std: f64,
	/// The 2nd and 98th percentile, linearly interpolated.
	pub percentiles: [f64; 2],
	pub histogram: Histogram,
}

impl BandStatistics {
	/// `None` for an empty slice.
	fn from_values(mut values: Vec<f64>, bins: usize, range: Option<[f64; 2]>) -> Option<BandStatistics> {
		if values.is_empty() {
			return None;
		}
		values.sort_by(f64::total_cmp);

		let count = values.len() as f64;
		let mean = values.iter().sum::<f64>() / count;
		let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;

		Some(BandStatistics {
			min: values[0],
			max: values[values.len() - 1],
			mean,
			std: variance.sqrt(),
			percentiles: [percentile(&values, 2.0), percentile(&values, 98.0)],
			histogram: Histogram::new(&values, bins, range),
		})
	}
}

/// Percentile `p` (0..=100) of sorted, non-empty `values`, interpolating between ranks.
fn percentile(values: &[f64], p: f64) -> f64 {
	let rank = p / 100.0 * (values.len() - 1) as f64;
	let lower = rank.floor() as usize;
	let upper = rank.ceil() as usize;
	values[lower] + (values[upper] - values[lower]) * (rank - lower as f64)
}

fn check_histogram_params(bins: usize, range: Option<[f64; 2]>) -> Result<()> {
	if bins == 0 {
		return Err(TileError::InvalidParameter("histogram needs at least one bin".to_string()).into());
	}
	if let Some([low, high]) = range
		&& !(low.is_finite() && high.is_finite() && low <= high)
	{
		return Err(TileError::InvalidParameter(format!("invalid histogram range [{low}, {high}]")).into());
	}
	Ok(())
}

/// Statistics of every non-alpha band of `block`, keyed by the band's 1-based index.
///
/// Only valid, finite values contribute. A band without any is left out, so an all-masked
/// block gives an empty map.
pub fn compute_stats(
	block: &PixelBlock,
	bands: &[BandDescriptor],
	bins: usize,
	range: Option<[f64; 2]>,
) -> Result<BTreeMap<usize, BandStatistics>> {
	check_histogram_params(bins, range)?;
	ensure!(
		bands.len() == block.bands(),
		"{} band descriptors for a block of {} bands",
		bands.len(),
		block.bands()
	);

	let mut statistics = BTreeMap::new();
	if !block.has_valid() {
		return Ok(statistics);
	}
	for (position, band) in bands.iter().enumerate() {
		if band.is_alpha {
			continue;
		}
		let mut values = block.valid_values(position);
		values.retain(|v| v.is_finite());
		if let Some(stats) = BandStatistics::from_values(values, bins, range) {
			statistics.insert(band.index, stats);
		}
	}
	Ok(statistics)
}

/// Parameters of [`compute_metadata`].
#[derive(Clone, Debug, PartialEq)]
pub struct MetadataOptions {
	/// Largest edge length of the preview read.
	pub max_size: usize,
	/// Reads overview `n`, i.e. `1 / 2^(n+1)` of the native size, instead of `max_size`.
	pub overview_level: Option<u32>,
	pub histogram_bins: usize,
	pub histogram_range: Option<[f64; 2]>,
	pub read: ReadOptions,
}

impl Default for MetadataOptions {
	fn default() -> Self {
		MetadataOptions {
			max_size: 1024,
			overview_level: None,
			histogram_bins: 20,
			histogram_range: None,
			read: ReadOptions::default(),
		}
	}
}

impl MetadataOptions {
	/// Pixel size of the preview read for a `width x height` source.
	///
	/// With `max_size`, the longer edge is scaled down to `max_size` and the shorter one
	/// follows the aspect ratio, rounding up. Sources that already fit are read natively.
	fn preview_size(&self, width: usize, height: usize) -> (usize, usize) {
		if let Some(level) = self.overview_level {
			let factor = 2f64.powi(level as i32 + 1);
			let shrink = |n: usize| ((n as f64 / factor).floor() as usize).max(1);
			return (shrink(width), shrink(height));
		}
		let max_size = self.max_size.max(1);
		if width.max(height) <= max_size {
			return (width, height);
		}
		let ratio = height as f64 / width as f64;
		if ratio > 1.0 {
			(((max_size as f64 / ratio).ceil() as usize).max(1), max_size)
		} else {
			(max_size, ((max_size as f64 * ratio).ceil() as usize).max(1))
		}
	}
}

/// Bounds as reported in [`Metadata`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundsRecord {
	pub value: [f64; 4],
	pub crs: String,
}

/// Description and statistics of a whole source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metadata {
	pub address: String,
	pub bounds: BoundsRecord,
	pub minzoom: u8,
	pub maxzoom: u8,
	/// `(index, name)` of every selected band.
	pub band_descriptions: Vec<(usize, String)>,
	pub statistics: BTreeMap<usize, BandStatistics>,
}

/// Zoom range, bounds and statistics of a downsampled read of the full source extent.
pub fn compute_metadata(source: &dyn RasterSource, tile_size: u32, options: &MetadataOptions) -> Result<Metadata> {
	check_histogram_params(options.histogram_bins, options.histogram_range)?;
	let info = source.info();
	let spatial = spatial_info(source, tile_size)?;

	let (width, height) = options.preview_size(info.width, info.height);
	log::debug!(
		"metadata of {} from a {width}x{height} preview of {}x{}",
		info.address,
		info.width,
		info.height
	);
	let block = read_extent(source, width, height, &options.read)?;
	let statistics = compute_stats(
		&block.pixels,
		&block.bands,
		options.histogram_bins,
		options.histogram_range,
	)?;

	Ok(Metadata {
		address: info.address.clone(),
		bounds: BoundsRecord {
			value: spatial.bounds,
			crs: "EPSG:4326".to_string(),
		},
		minzoom: spatial.minzoom,
		maxzoom: spatial.maxzoom,
		band_descriptions: block.bands.iter().map(|band| (band.index, band.name.clone())).collect(),
		statistics,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::MemorySource;
	use approx::assert_abs_diff_eq;
	use cogtiler_core::{BandSelection, Crs, ErrorKind, Nodata, error_kind};
	use ndarray::{Array2, Array3, array};
	use pretty_assertions::assert_eq;
	use rstest::rstest;

	fn bands(count: usize) -> Vec<BandDescriptor> {
		(1..=count).map(|index| BandDescriptor::new(index, None)).collect()
	}

	fn one_band(values: Vec<f64>, mask: Vec<bool>) -> PixelBlock {
		let n = values.len();
		PixelBlock::new(
			Array3::from_shape_vec((1, 1, n), values).unwrap(),
			Array2::from_shape_vec((1, n), mask).unwrap(),
		)
		.unwrap()
	}

	#[test]
	fn constant_band() -> Result<()> {
		let block = PixelBlock::new(Array3::from_elem((1, 256, 256), 50.0), Array2::from_elem((256, 256), true))?;
		let stats = compute_stats(&block, &bands(1), 20, None)?;
		let band = &stats[&1];
		assert_eq!((band.min, band.max, band.mean, band.std), (50.0, 50.0, 50.0, 0.0));
		assert_eq!(band.histogram.counts.iter().sum::<u64>(), 65536);
		assert_eq!(band.histogram.edges.first(), Some(&49.5));
		assert_eq!(band.histogram.edges.last(), Some(&50.5));
		Ok(())
	}

	#[test]
	fn only_valid_pixels_count() -> Result<()> {
		let block = one_band(vec![1.0, 2.0, 3.0, 4.0, 100.0], vec![true, true, true, true, false]);
		let band = &compute_stats(&block, &bands(1), 3, None)?[&1];
		assert_eq!((band.min, band.max), (1.0, 4.0));
		assert_abs_diff_eq!(band.mean, 2.5);
		assert_abs_diff_eq!(band.std, 1.118033988749895, epsilon = 1e-12);
		assert_eq!(band.histogram.counts, vec![1, 1, 2]);
		assert_eq!(band.histogram.edges, vec![1.0, 2.0, 3.0, 4.0]);
		assert_abs_diff_eq!(band.percentiles[0], 1.06, epsilon = 1e-12);
		assert_abs_diff_eq!(band.percentiles[1], 3.94, epsilon = 1e-12);
		Ok(())
	}

	#[test]
	fn fixed_range_drops_outliers() -> Result<()> {
		let block = one_band(vec![0.0, 5.0, 10.0, 20.0], vec![true; 4]);
		let band = &compute_stats(&block, &bands(1), 2, Some([0.0, 10.0]))?[&1];
		assert_eq!(band.histogram.edges, vec![0.0, 5.0, 10.0]);
		assert_eq!(band.histogram.counts, vec![1, 2]);
		assert_eq!(band.max, 20.0);
		Ok(())
	}

	#[test]
	fn alpha_and_masked_blocks() -> Result<()> {
		let data = Array3::from_shape_vec((2, 1, 2), vec![1.0, 2.0, 255.0, 255.0])?;
		let block = PixelBlock::new(data.clone(), array![[true, true]])?;
		let mut descriptors = bands(2);
		descriptors[1].is_alpha = true;
		let stats = compute_stats(&block, &descriptors, 20, None)?;
		assert_eq!(stats.keys().copied().collect::<Vec<_>>(), vec![1]);

		let masked = PixelBlock::new(data, array![[false, false]])?;
		assert!(compute_stats(&masked, &descriptors, 20, None)?.is_empty());
		Ok(())
	}

	#[test]
	fn keys_are_source_band_indexes() -> Result<()> {
		let block = one_band(vec![1.0, 2.0], vec![true, true]);
		let stats = compute_stats(&block, &[BandDescriptor::new(3, None)], 20, None)?;
		assert!(stats.contains_key(&3));
		Ok(())
	}

	#[rstest]
	#[case(0, None)]
	#[case(10, Some([5.0, 1.0]))]
	#[case(10, Some([f64::NAN, 1.0]))]
	fn invalid_histogram_parameters(#[case] bins: usize, #[case] range: Option<[f64; 2]>) {
		let block = one_band(vec![1.0], vec![true]);
		let error = compute_stats(&block, &bands(1), bins, range).unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter));
	}

	#[rstest]
	#[case(None, 4000, 2000, (1024, 512))]
	#[case(None, 300, 1000, (308, 1024))]
	#[case(None, 500, 200, (500, 200))]
	#[case(Some(0), 4000, 2000, (2000, 1000))]
	#[case(Some(2), 4000, 3, (500, 1))]
	fn preview_sizes(
		#[case] overview_level: Option<u32>,
		#[case] width: usize,
		#[case] height: usize,
		#[case] expected: (usize, usize),
	) {
		let options = MetadataOptions {
			overview_level,
			..MetadataOptions::default()
		};
		assert_eq!(options.preview_size(width, height), expected);
	}

	#[test]
	fn metadata_of_a_source() -> Result<()> {
		let data = Array3::from_shape_fn((2, 8, 8), |(band, row, _)| match (band, row) {
			(_, 0) => 0.0,
			(0, _) => row as f64,
			_ => 7.0,
		});
		let source = MemorySource::from_bounds("mem://meta", Crs::Wgs84, [0.0, 0.0, 8.0, 8.0], data)
			.with_band_names(&["elevation", "quality"])
			.with_nodata(Nodata::Value(0.0));

		let metadata = compute_metadata(&source, 256, &MetadataOptions::default())?;
		assert_eq!(metadata.address, "mem://meta");
		assert_eq!(metadata.bounds.value, [0.0, 0.0, 8.0, 8.0]);
		assert_eq!(metadata.bounds.crs, "EPSG:4326");
		assert_eq!(
			metadata.band_descriptions,
			vec![(1, "elevation".to_string()), (2, "quality".to_string())]
		);
		let elevation = &metadata.statistics[&1];
		assert_eq!((elevation.min, elevation.max), (1.0, 7.0));
		assert!(metadata.minzoom <= metadata.maxzoom);

		let options = MetadataOptions {
			read: ReadOptions::default().with_bands(Some(BandSelection(vec![2]))),
			..MetadataOptions::default()
		};
		let metadata = compute_metadata(&source, 256, &options)?;
		assert_eq!(metadata.statistics.keys().copied().collect::<Vec<_>>(), vec![2]);
		Ok(())
	}

	#[test]
	fn statistics_serialize_by_band() -> Result<()> {
		let block = one_band(vec![1.0, 3.0], vec![true, true]);
		let stats = compute_stats(&block, &bands(1), 2, None)?;
		let json = serde_json::to_value(&stats)?;
		assert_eq!(json["1"]["histogram"]["counts"], serde_json::json!([1, 1]));
		assert_eq!(json["1"]["mean"], serde_json::json!(2.0));
		Ok(())
	}
}
