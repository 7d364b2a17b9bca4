use anyhow::Result;
use approx::assert_abs_diff_eq;
use cogtiler::{
	Config, Crs, ErrorKind, FeatureType, ImageFormat, MemoryCatalog, MemorySource, MetadataRequest, MosaicRequest,
	MvtOptions, Outcome, PixelSelection, RenderOptions, TileCoord, TileRequest, Tiler, error_kind,
};
use cogtiler_geometry::VectorTile;
use cogtiler_image::decode_png;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

fn tiler() -> Result<Tiler> {
	let catalog = MemoryCatalog::new()
		.with(MemorySource::filled("left", Crs::Wgs84, [-180.0, -85.0, 0.0, 85.0], (32, 32), &[10.0]))
		.with(MemorySource::filled("right", Crs::Wgs84, [-90.0, -85.0, 180.0, 85.0], (48, 32), &[20.0]))
		.with(MemorySource::filled("island", Crs::Wgs84, [10.0, 10.0, 20.0, 20.0], (8, 8), &[5.0]));
	let config = Config::from_string("tile_base_size: 8\nhistogram_bins: 4\n")?;
	Ok(Tiler::new(config, Arc::new(catalog)))
}

fn coord(z: u8, x: u32, y: u32) -> TileCoord {
	TileCoord::new(z, x, y).unwrap()
}

// In an 8 pixel world tile, column 1 is only covered by "left", column 3 by both, column 6 only by "right".
#[rstest]
#[case(PixelSelection::First, [10, 10, 20])]
#[case(PixelSelection::Highest, [10, 20, 20])]
#[case(PixelSelection::Lowest, [10, 10, 20])]
#[tokio::test]
async fn mosaic_png(#[case] selection: PixelSelection, #[case] expected: [u8; 3]) -> Result<()> {
	let request = MosaicRequest::new(&["left", "right"], coord(0, 0, 0), selection);
	let Outcome::Data(blob) = tiler()?
		.encoded_mosaic_tile(&request, &RenderOptions::new(ImageFormat::Png))
		.await?
	else {
		panic!("expected a tile");
	};
	let decoded = decode_png(&blob)?;
	let row = [1, 3, 6].map(|col| decoded.data()[[0, 4, col]]);
	assert_eq!(row, expected);
	Ok(())
}

#[tokio::test]
async fn mosaic_stdev() -> Result<()> {
	let request = MosaicRequest::new(&["left", "right"], coord(0, 0, 0), PixelSelection::Stdev);
	let Outcome::Data(block) = tiler()?.mosaic_tile(&request).await? else {
		panic!("expected a tile");
	};
	assert_abs_diff_eq!(block.pixels.data()[[0, 4, 1]], 0.0);
	assert_abs_diff_eq!(block.pixels.data()[[0, 4, 3]], 50f64.sqrt(), epsilon = 1e-9);
	Ok(())
}

#[tokio::test]
async fn mosaic_without_coverage_is_empty() -> Result<()> {
	let tiler = tiler()?;
	let request = MosaicRequest::new(&["island"], coord(2, 0, 0), PixelSelection::First);
	assert!(tiler.mosaic_tile(&request).await?.is_empty());

	let failing = MosaicRequest::new(&["nowhere", "island"], coord(2, 0, 0), PixelSelection::First);
	assert!(tiler.mosaic_tile(&failing).await?.is_empty());
	let error = tiler.mosaic_tile(&failing).await?.or_empty_error("no coverage").unwrap_err();
	assert_eq!(error_kind(&error), Some(ErrorKind::EmptyResult));

	let none = MosaicRequest::new(&[], coord(0, 0, 0), PixelSelection::First);
	let error = tiler.mosaic_tile(&none).await.unwrap_err();
	assert_eq!(error_kind(&error), Some(ErrorKind::InvalidParameter));
	Ok(())
}

#[rstest]
#[case(FeatureType::Point, 64)]
#[case(FeatureType::Polygon, 64)]
#[tokio::test]
async fn mvt_layer(#[case] feature_type: FeatureType, #[case] features: usize) -> Result<()> {
	let options = MvtOptions {
		feature_type,
		..MvtOptions::default()
	};
	let blob = tiler()?.mvt(&TileRequest::new("left", coord(2, 1, 1)), &options).await?;
	let tile = VectorTile::from_blob(&blob)?;
	let layer = tile.find_layer("cogeo").expect("layer");
	assert_eq!(layer.extent, 4096);
	assert_eq!(layer.features.len(), features);
	let properties = layer.feature_properties(&layer.features[0])?;
	assert_eq!(properties.len(), 1);
	assert_eq!(properties[0].0, "band1");
	assert_eq!(properties[0].1.to_string(), "10");
	Ok(())
}

#[tokio::test]
async fn spatial_info_of_many_sources() -> Result<()> {
	let info = tiler()?.spatial_info(&["left".to_string(), "right".to_string()]).await?;
	for (value, expected) in info.bounds.iter().zip([-180.0, -85.0, 180.0, 85.0]) {
		assert_abs_diff_eq!(*value, expected, epsilon = 1e-6);
	}
	assert!(info.minzoom <= info.maxzoom);
	Ok(())
}

#[tokio::test]
async fn point_values() -> Result<()> {
	let tiler = tiler()?;
	let values = tiler.point("right", 10.0, 20.0, None).await?;
	assert_eq!(values.len(), 1);
	assert_eq!(values[0].band.name, "band1");
	assert_eq!(values[0].value, 20.0);

	let error = tiler.point("island", 0.0, 0.0, None).await.unwrap_err();
	assert_eq!(error_kind(&error), Some(ErrorKind::OutOfBounds));
	Ok(())
}

#[tokio::test]
async fn metadata_uses_configured_bins() -> Result<()> {
	let metadata = tiler()?.metadata(&MetadataRequest::new("left")).await?;
	assert_eq!(metadata.address, "left");
	assert_eq!(metadata.bounds.crs, "EPSG:4326");
	assert_eq!(metadata.band_descriptions, vec![(1, "band1".to_string())]);
	let band = &metadata.statistics[&1];
	assert_eq!((band.min, band.max, band.mean), (10.0, 10.0, 10.0));
	assert_eq!(band.histogram.counts.len(), 4);
	Ok(())
}
