//! A warper that needs nothing but the [`RasterSource`] capability set.
//!
//! Every destination pixel centre is mapped into fractional source pixel space, the native
//! pixels around all mapped positions are read once per band, and each destination pixel is
//! sampled with the requested kernel. Nodata pixels never contribute to a kernel.

use crate::{MaskSource, PixelWindow, RasterSource, WarpRequest, WarpedBlock};
use anyhow::{Result, ensure};
use cogtiler_core::{GeoTransform, Nodata, ResampleAlg};
use ndarray::{Array2, Array3};
use std::{collections::BTreeMap, ops::Range};

/// Builds the warped view of `source` described by `request`.
pub fn warp_source<S: RasterSource + ?Sized>(source: &S, request: &WarpRequest) -> Result<WarpedBlock> {
	let info = source.info();
	let (width, height) = (request.width, request.height);
	ensure!(width > 0 && height > 0, "warp size {width}x{height} is empty");
	ensure!(!request.bands.is_empty(), "warp needs at least one band");

	let nodata = match request.mask {
		MaskSource::Nodata(nodata) => Some(nodata),
		_ => None,
	};
	let fill = nodata.map_or(0.0, |n| n.as_f64());
	let mut data = Array3::from_elem((request.bands.len(), height, width), fill);
	let mut valid = Array2::from_elem((height, width), false);

	let grid = SourceGrid::new(source, request)?;
	let Some(window) = grid.window(info.width, info.height, request.resampling) else {
		log::trace!("{} does not cover warp bounds {:?}", info.address, request.bounds);
		return Ok(WarpedBlock { data, valid });
	};
	log::trace!(
		"warping {} window {window:?} onto {width}x{height} ({})",
		info.address,
		request.resampling
	);

	let mut reads: BTreeMap<usize, Array2<f64>> = BTreeMap::new();
	let alpha = match request.mask {
		MaskSource::Alpha(band) => Some(band),
		_ => None,
	};
	for &band in request.bands.iter().chain(alpha.iter()) {
		if !reads.contains_key(&band) {
			reads.insert(band, source.read_native(band, window)?);
		}
	}
	let view = |band: usize, nodata: Option<Nodata>| BandView {
		values: &reads[&band],
		window,
		raster_width: info.width,
		raster_height: info.height,
		nodata,
	};
	let band_views: Vec<BandView> = request.bands.iter().map(|&band| view(band, nodata)).collect();
	let alpha_view = alpha.map(|band| view(band, None));

	for row in 0..height {
		for col in 0..width {
			let Some(position) = grid.centre(col, row) else {
				continue;
			};
			let footprint = grid.footprint(col, row);
			let samples: Vec<Option<f64>> = band_views
				.iter()
				.map(|band| band.sample(position, footprint.as_ref(), request.resampling))
				.collect();

			let pixel_valid = match &alpha_view {
				Some(alpha) => alpha.nearest(position).is_some_and(|a| a > 0.0),
				None => samples.iter().any(Option::is_some),
			};
			valid[[row, col]] = pixel_valid;
			for (band, sample) in samples.into_iter().enumerate() {
				if let Some(value) = sample {
					data[[band, row, col]] = value;
				}
			}
		}
	}

	Ok(WarpedBlock { data, valid })
}

/// Destination pixels mapped into fractional source pixel coordinates.
struct SourceGrid {
	width: usize,
	height: usize,
	raster_width: f64,
	raster_height: f64,
	centres: Vec<[f64; 2]>,
	/// Pixel corners, only collected for area-weighted resampling.
	corners: Option<Vec<[f64; 2]>>,
}

impl SourceGrid {
	fn new<S: RasterSource + ?Sized>(source: &S, request: &WarpRequest) -> Result<SourceGrid> {
		let info = source.info();
		let target = GeoTransform::from_bounds(request.bounds, request.width, request.height);
		let to_source = |col: f64, row: f64| -> Result<[f64; 2]> {
			let [x, y] = target.pixel_to_world(col, row);
			let [sx, sy] = source.transform_point(request.crs, info.crs, x, y)?;
			info.geo_transform.world_to_pixel(sx, sy)
		};

		let mut centres = Vec::with_capacity(request.width * request.height);
		for row in 0..request.height {
			for col in 0..request.width {
				centres.push(to_source(col as f64 + 0.5, row as f64 + 0.5)?);
			}
		}

		let corners = if request.resampling == ResampleAlg::Average {
			let mut corners = Vec::with_capacity((request.width + 1) * (request.height + 1));
			for row in 0..=request.height {
				for col in 0..=request.width {
					corners.push(to_source(col as f64, row as f64)?);
				}
			}
			Some(corners)
		} else {
			None
		};

		Ok(SourceGrid {
			width: request.width,
			height: request.height,
			raster_width: info.width as f64,
			raster_height: info.height as f64,
			centres,
			corners,
		})
	}

	/// Source position of a destination pixel centre, `None` if the source does not cover it.
	fn centre(&self, col: usize, row: usize) -> Option<[f64; 2]> {
		let [c, r] = self.centres[row * self.width + col];
		(c >= 0.0 && c < self.raster_width && r >= 0.0 && r < self.raster_height).then_some([c, r])
	}

	/// Source pixel ranges `(cols, rows)` under a destination pixel.
	fn footprint(&self, col: usize, row: usize) -> Option<(Range<isize>, Range<isize>)> {
		let corners = self.corners.as_ref()?;
		let stride = self.width + 1;
		let points = [
			corners[row * stride + col],
			corners[row * stride + col + 1],
			corners[(row + 1) * stride + col],
			corners[(row + 1) * stride + col + 1],
		];
		let span = |axis: usize| -> Range<isize> {
			let min = points.iter().map(|p| p[axis]).fold(f64::INFINITY, f64::min);
			let max = points.iter().map(|p| p[axis]).fold(f64::NEG_INFINITY, f64::max);
			let start = (min + 1e-9).floor() as isize;
			let end = ((max - 1e-9).ceil() as isize).max(start + 1);
			start..end
		};
		Some((span(0), span(1)))
	}

	/// The smallest native window holding every pixel any kernel will touch.
	fn window(&self, raster_width: usize, raster_height: usize, resampling: ResampleAlg) -> Option<PixelWindow> {
		let (before, after) = match resampling {
			ResampleAlg::Nearest | ResampleAlg::Average => (0, 0),
			ResampleAlg::Bilinear => (1, 1),
			ResampleAlg::Cubic => (2, 2),
		};
		let mut cols = (isize::MAX, isize::MIN);
		let mut rows = (isize::MAX, isize::MIN);
		for row in 0..self.height {
			for col in 0..self.width {
				let Some([c, r]) = self.centre(col, row) else {
					continue;
				};
				let (c, r) = (c.floor() as isize, r.floor() as isize);
				cols = (cols.0.min(c - before), cols.1.max(c + after));
				rows = (rows.0.min(r - before), rows.1.max(r + after));
				if let Some((fc, fr)) = self.footprint(col, row) {
					cols = (cols.0.min(fc.start), cols.1.max(fc.end - 1));
					rows = (rows.0.min(fr.start), rows.1.max(fr.end - 1));
				}
			}
		}
		if cols.0 > cols.1 {
			return None;
		}
		let clamp = |v: isize, size: usize| v.clamp(0, size as isize - 1) as usize;
		let (c0, c1) = (clamp(cols.0, raster_width), clamp(cols.1, raster_width));
		let (r0, r1) = (clamp(rows.0, raster_height), clamp(rows.1, raster_height));
		Some(PixelWindow::new(c0, r0, c1 - c0 + 1, r1 - r0 + 1))
	}
}

/// One band of the native window, addressed in raster pixel coordinates.
struct BandView<'a> {
	values: &'a Array2<f64>,
	window: PixelWindow,
	raster_width: usize,
	raster_height: usize,
	nodata: Option<Nodata>,
}

impl BandView<'_> {
	/// Value at a raster pixel, clamped to the raster edge. `None` for nodata.
	fn at(&self, col: isize, row: isize) -> Option<f64> {
		let col = col.clamp(0, self.raster_width as isize - 1) as usize;
		let row = row.clamp(0, self.raster_height as isize - 1) as usize;
		let value = self.values[[row - self.window.row, col - self.window.col]];
		match self.nodata {
			Some(nodata) if nodata.matches(value) => None,
			_ => Some(value),
		}
	}

	fn sample(&self, position: [f64; 2], footprint: Option<&(Range<isize>, Range<isize>)>, resampling: ResampleAlg) -> Option<f64> {
		match resampling {
			ResampleAlg::Nearest => self.nearest(position),
			ResampleAlg::Bilinear => {
				let (col, row, tx, ty) = kernel_origin(position);
				self.convolve(col, row, &[1.0 - tx, tx], &[1.0 - ty, ty])
			}
			ResampleAlg::Cubic => {
				let (col, row, tx, ty) = kernel_origin(position);
				self.convolve(col - 1, row - 1, &cubic_weights(tx), &cubic_weights(ty))
			}
			ResampleAlg::Average => match footprint {
				Some((cols, rows)) => self.average(cols.clone(), rows.clone()),
				None => self.nearest(position),
			},
		}
	}

	fn nearest(&self, [col, row]: [f64; 2]) -> Option<f64> {
		self.at(col.floor() as isize, row.floor() as isize)
	}

	/// Weighted sum over the kernel; weights of nodata pixels are dropped and the rest renormalised.
	fn convolve(&self, col: isize, row: isize, weights_x: &[f64], weights_y: &[f64]) -> Option<f64> {
		let mut sum = 0.0;
		let mut total = 0.0;
		for (j, wy) in weights_y.iter().enumerate() {
			for (i, wx) in weights_x.iter().enumerate() {
				let weight = wx * wy;
				if weight == 0.0 {
					continue;
				}
				if let Some(value) = self.at(col + i as isize, row + j as isize) {
					sum += weight * value;
					total += weight;
				}
			}
		}
		(total.abs() > 1e-12).then(|| sum / total)
	}

	fn average(&self, cols: Range<isize>, rows: Range<isize>) -> Option<f64> {
		let mut sum = 0.0;
		let mut count = 0usize;
		for row in rows.start.max(0)..rows.end.min(self.raster_height as isize) {
			for col in cols.start.max(0)..cols.end.min(self.raster_width as isize) {
				if let Some(value) = self.at(col, row) {
					sum += value;
					count += 1;
				}
			}
		}
		(count > 0).then(|| sum / count as f64)
	}
}

/// Top-left pixel of a 2x2 neighbourhood around `position` and the fractional offsets into it.
fn kernel_origin([col, row]: [f64; 2]) -> (isize, isize, f64, f64) {
	let (fx, fy) = (col - 0.5, row - 0.5);
	let (x0, y0) = (fx.floor(), fy.floor());
	(x0 as isize, y0 as isize, fx - x0, fy - y0)
}

/// Cubic convolution weights (a = -0.5) for the four pixels around offset `t`.
fn cubic_weights(t: f64) -> [f64; 4] {
	const A: f64 = -0.5;
	let kernel = |x: f64| {
		let x = x.abs();
		if x <= 1.0 {
			(A + 2.0) * x.powi(3) - (A + 3.0) * x.powi(2) + 1.0
		} else if x < 2.0 {
			A * x.powi(3) - 5.0 * A * x.powi(2) + 8.0 * A * x - 4.0 * A
		} else {
			0.0
		}
	};
	[kernel(1.0 + t), kernel(t), kernel(1.0 - t), kernel(2.0 - t)]
}
