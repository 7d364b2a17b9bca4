//! Sources read through GDAL: local files, `/vsicurl/` URLs and everything else GDAL opens.

use crate::{MaskSource, PixelWindow, RasterSource, SourceInfo, SourceOpener, WarpRequest, WarpedBlock};
use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use cogtiler_core::{BandDescriptor, Crs, GeoTransform, Nodata, ResampleAlg, TileError};
use gdal::{
	Dataset, DriverManager,
	raster::ColorInterpretation,
	spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef},
};
use ndarray::{Array2, Array3, Axis};
use std::{
	fmt::Debug,
	sync::{Arc, Mutex, MutexGuard},
};

fn spatial_ref(crs: Crs) -> Result<SpatialRef> {
	let mut srs = SpatialRef::from_epsg(crs.epsg()).with_context(|| format!("Failed to get spatial reference {crs}"))?;
	srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
	Ok(srs)
}

fn gdal_resample_alg(alg: ResampleAlg) -> u32 {
	use gdal_sys::GDALResampleAlg::*;
	match alg {
		ResampleAlg::Nearest => GRA_NearestNeighbour,
		ResampleAlg::Bilinear => GRA_Bilinear,
		ResampleAlg::Cubic => GRA_Cubic,
		ResampleAlg::Average => GRA_Average,
	}
}

/// A raster opened with GDAL.
///
/// GDAL datasets must not be used from two threads at once, so every access goes through a
/// mutex. Sources are cheap to open and live for a single operation.
pub struct GdalSource {
	info: SourceInfo,
	dataset: Mutex<Dataset>,
}

impl Debug for GdalSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GdalSource").field("info", &self.info).finish()
	}
}

impl GdalSource {
	/// Opens `address` with GDAL. Every failure is `SOURCE_UNREADABLE`.
	pub fn open(address: &str) -> Result<GdalSource> {
		log::debug!("opening {address} with GDAL");
		let dataset = Dataset::open(address).map_err(|e| TileError::SourceUnreadable(format!("{address}: {e}")))?;
		GdalSource::from_dataset(address, dataset)
	}

	/// Wraps an already opened dataset.
	pub fn from_dataset(address: &str, dataset: Dataset) -> Result<GdalSource> {
		let unreadable = |reason: String| TileError::SourceUnreadable(format!("{address}: {reason}"));

		let (width, height) = dataset.raster_size();
		let geo_transform = dataset
			.geo_transform()
			.map_err(|e| unreadable(format!("no geotransform ({e})")))?;
		let code = dataset
			.spatial_ref()
			.and_then(|srs| srs.auth_code())
			.map_err(|e| unreadable(format!("unknown spatial reference ({e})")))?;
		let crs = Crs::from_epsg(u32::try_from(code).map_err(|_| unreadable(format!("invalid EPSG code {code}")))?);

		let mut bands = Vec::with_capacity(dataset.raster_count());
		let mut nodata = None;
		for index in 1..=dataset.raster_count() {
			let band = dataset
				.rasterband(index)
				.with_context(|| format!("Failed to get band {index} of {address}"))?;
			if index == 1 {
				nodata = band.no_data_value().map(Nodata::from_f64);
			}
			let description = band.description().unwrap_or_default();
			let descriptor = BandDescriptor::new(index, Some(description.as_str()));
			bands.push(match band.color_interpretation() {
				ColorInterpretation::AlphaBand => descriptor.alpha(),
				_ => descriptor,
			});
		}
		ensure!(!bands.is_empty(), unreadable("no raster bands".to_string()));

		log::trace!("{address}: {width}x{height} px, {crs}, {} bands, nodata {nodata:?}", bands.len());
		Ok(GdalSource {
			info: SourceInfo {
				address: address.to_string(),
				crs,
				width,
				height,
				geo_transform: GeoTransform(geo_transform),
				nodata,
				bands,
			},
			dataset: Mutex::new(dataset),
		})
	}

	fn dataset(&self) -> Result<MutexGuard<'_, Dataset>> {
		self
			.dataset
			.lock()
			.map_err(|_| TileError::SourceUnreadable(format!("{}: dataset lock poisoned", self.info.address)).into())
	}

	/// Warps the selected bands into a MEM dataset with one extra alpha band that marks the
	/// pixels GDAL could fill.
	fn warp_to_mem(&self, request: &WarpRequest) -> Result<Dataset> {
		let band_count = request.bands.len();
		let driver = DriverManager::get_driver_by_name("MEM").context("Failed to get GDAL MEM driver")?;
		let mut dst = driver
			.create_with_band_type::<f64, _>("", request.width, request.height, band_count + 1)
			.context("Failed to create in-memory dataset")?;
		dst.set_spatial_ref(&spatial_ref(request.crs)?)?;
		dst.set_geo_transform(&GeoTransform::from_bounds(request.bounds, request.width, request.height).0)?;

		let source = self.dataset()?;
		let h_src_ds = source.c_dataset();
		let h_dst_ds = dst.c_dataset();
		let width = i32::try_from(request.width)?;
		let height = i32::try_from(request.height)?;
		let n = i32::try_from(band_count)?;

		unsafe {
			use gdal_sys::{
				CPLErr, CPLGetLastErrorMsg, CPLMalloc, CSLSetNameValue, GDALChunkAndWarpMulti,
				GDALCreateGenImgProjTransformer2, GDALCreateWarpOperation, GDALCreateWarpOptions,
				GDALDestroyGenImgProjTransformer, GDALDestroyWarpOperation, GDALDestroyWarpOptions,
				GDALGenImgProjTransform,
			};

			let options = GDALCreateWarpOptions();
			(*options).hSrcDS = h_src_ds;
			(*options).hDstDS = h_dst_ds;
			(*options).papszWarpOptions =
				CSLSetNameValue((*options).papszWarpOptions, c"INIT_DEST".as_ptr(), c"0".as_ptr());

			(*options).nBandCount = n;
			(*options).panSrcBands = CPLMalloc(band_count * size_of::<i32>()).cast::<i32>();
			(*options).panDstBands = CPLMalloc(band_count * size_of::<i32>()).cast::<i32>();
			for (i, &band) in request.bands.iter().enumerate() {
				(*options).panSrcBands.add(i).write(band as i32);
				(*options).panDstBands.add(i).write(i as i32 + 1);
			}
			(*options).nDstAlphaBand = n + 1;

			match request.mask {
				MaskSource::Alpha(band) => (*options).nSrcAlphaBand = band as i32,
				MaskSource::Nodata(nodata) => {
					(*options).padfSrcNoDataReal = CPLMalloc(band_count * size_of::<f64>()).cast::<f64>();
					for i in 0..band_count {
						(*options).padfSrcNoDataReal.add(i).write(nodata.as_f64());
					}
				}
				MaskSource::None => {}
			}

			(*options).eResampleAlg = gdal_resample_alg(request.resampling);
			(*options).dfWarpMemoryLimit = 512.0 * 1024.0 * 1024.0;
			(*options).pTransformerArg = GDALCreateGenImgProjTransformer2(h_src_ds, h_dst_ds, core::ptr::null_mut());
			(*options).pfnTransformer = Some(GDALGenImgProjTransform);

			let transformer = (*options).pTransformerArg;
			let result = if transformer.is_null() {
				CPLErr::CE_Failure
			} else {
				let operation = GDALCreateWarpOperation(options);
				let result = GDALChunkAndWarpMulti(operation, 0, 0, width, height);
				GDALDestroyWarpOperation(operation);
				GDALDestroyGenImgProjTransformer(transformer);
				result
			};
			(*options).pTransformerArg = core::ptr::null_mut();
			GDALDestroyWarpOptions(options);

			if result != CPLErr::CE_None {
				let message = std::ffi::CStr::from_ptr(CPLGetLastErrorMsg()).to_string_lossy();
				bail!("warping {} failed: {message}", self.info.address);
			}
		}
		drop(source);
		Ok(dst)
	}
}

impl RasterSource for GdalSource {
	fn info(&self) -> &SourceInfo {
		&self.info
	}

	fn read_native(&self, band: usize, window: PixelWindow) -> Result<Array2<f64>> {
		if band == 0 || band > self.info.bands.len() {
			return Err(TileError::InvalidBand(format!(
				"band {band} requested, but the source has {} bands",
				self.info.bands.len()
			))
			.into());
		}
		window.check_inside(self.info.width, self.info.height)?;

		let dataset = self.dataset()?;
		let size = (window.width, window.height);
		let buffer = dataset
			.rasterband(band)?
			.read_as::<f64>((window.col as isize, window.row as isize), size, size, None)
			.map_err(|e| TileError::SourceUnreadable(format!("{}: reading band {band} failed ({e})", self.info.address)))?;
		Ok(Array2::from_shape_vec((window.height, window.width), buffer.data().to_vec())?)
	}

	fn warp(&self, request: &WarpRequest) -> Result<WarpedBlock> {
		log::trace!(
			"GDAL warp of {} to {}x{} in {}",
			self.info.address,
			request.width,
			request.height,
			request.crs
		);
		let dst = self.warp_to_mem(request)?;
		let shape = (request.height, request.width);

		let alpha = dst.rasterband(request.bands.len() + 1)?.read_band_as::<f64>()?;
		let valid = Array2::from_shape_vec(shape, alpha.data().iter().map(|&a| a > 0.0).collect())?;

		let fill = match request.mask {
			MaskSource::Nodata(nodata) => nodata.as_f64(),
			_ => 0.0,
		};
		let mut data = Array3::from_elem((request.bands.len(), shape.0, shape.1), fill);
		for (i, mut plane) in data.axis_iter_mut(Axis(0)).enumerate() {
			let buffer = dst.rasterband(i + 1)?.read_band_as::<f64>()?;
			for ((value, &sample), &ok) in plane.iter_mut().zip(buffer.data()).zip(valid.iter()) {
				if ok {
					*value = sample;
				}
			}
		}
		Ok(WarpedBlock { data, valid })
	}

	fn transform_point(&self, from: Crs, to: Crs, x: f64, y: f64) -> Result<[f64; 2]> {
		if from.is_supported() && to.is_supported() {
			return from.transform_point(to, x, y);
		}
		let transform = CoordTransform::new(&spatial_ref(from)?, &spatial_ref(to)?)?;
		let (mut xs, mut ys, mut zs) = ([x], [y], [0.0]);
		transform
			.transform_coords(&mut xs, &mut ys, &mut zs)
			.with_context(|| format!("Failed to transform ({x}, {y}) from {from} to {to}"))?;
		Ok([xs[0], ys[0]])
	}

	fn transform_bounds(&self, from: Crs, to: Crs, bounds: [f64; 4]) -> Result<[f64; 4]> {
		if from.is_supported() && to.is_supported() {
			return from.transform_bounds(to, bounds);
		}
		let transform = CoordTransform::new(&spatial_ref(from)?, &spatial_ref(to)?)?;
		transform
			.transform_bounds(&bounds, 21)
			.with_context(|| format!("Failed to transform {bounds:?} from {from} to {to}"))
	}
}

/// Opens every address with [`GdalSource::open`] on the blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct GdalOpener;

#[async_trait]
impl SourceOpener for GdalOpener {
	async fn open(&self, address: &str) -> Result<Arc<dyn RasterSource>> {
		let address = address.to_string();
		let source = tokio::task::spawn_blocking(move || GdalSource::open(&address))
			.await
			.context("opening a GDAL source was aborted")??;
		Ok(Arc::new(source))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{ReadOptions, read_tile};
	use cogtiler_core::{ErrorKind, TileCoord, WORLD_SIZE, error_kind};
	use gdal::raster::Buffer;
	use pretty_assertions::assert_eq;

	fn mem_dataset(epsg: u32, bounds: [f64; 4], values: &[Vec<f64>], size: usize) -> Dataset {
		let driver = DriverManager::get_driver_by_name("MEM").unwrap();
		let mut dataset = driver
			.create_with_band_type::<f64, _>("", size, size, values.len())
			.unwrap();
		dataset.set_spatial_ref(&spatial_ref(Crs::from_epsg(epsg)).unwrap()).unwrap();
		dataset
			.set_geo_transform(&GeoTransform::from_bounds(bounds, size, size).0)
			.unwrap();
		for (i, band_values) in values.iter().enumerate() {
			let mut buffer = Buffer::new((size, size), band_values.clone());
			dataset
				.rasterband(i + 1)
				.unwrap()
				.write((0, 0), (size, size), &mut buffer)
				.unwrap();
		}
		dataset
	}

	#[test]
	fn describes_a_dataset() -> Result<()> {
		let dataset = mem_dataset(4326, [0.0, 0.0, 2.0, 2.0], &[vec![1.0, 2.0, 3.0, 4.0]], 2);
		let source = GdalSource::from_dataset("mem", dataset)?;
		let info = source.info();
		assert_eq!(info.crs, Crs::Wgs84);
		assert_eq!((info.width, info.height), (2, 2));
		assert_eq!(info.native_bounds(), [0.0, 0.0, 2.0, 2.0]);
		assert_eq!(info.bands, vec![BandDescriptor::new(1, None)]);
		assert_eq!(
			source.read_native(1, PixelWindow::new(1, 0, 1, 2))?,
			ndarray::array![[2.0], [4.0]]
		);
		Ok(())
	}

	#[test]
	fn warps_onto_a_tile() -> Result<()> {
		let half = WORLD_SIZE / 2.0;
		let dataset = mem_dataset(3857, [-half, -half, half, half], &[vec![1.0, 2.0, 3.0, 4.0]], 2);
		let source = GdalSource::from_dataset("mem", dataset)?;
		let block = read_tile(&source, &TileCoord::new(0, 0, 0)?, 2, &ReadOptions::default())?;
		assert_eq!(block.pixels.band(0), ndarray::array![[1.0, 2.0], [3.0, 4.0]]);
		assert!(block.pixels.is_fully_valid());
		Ok(())
	}

	#[tokio::test]
	async fn missing_files_are_unreadable() {
		let error = GdalOpener.open("/does/not/exist.tif").await.unwrap_err();
		assert_eq!(error_kind(&error), Some(ErrorKind::SourceUnreadable));
	}
}
