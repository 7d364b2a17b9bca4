use super::{ReadArgs, parse_tile_coord, write_output};
use anyhow::Result;
use cogtiler::{
	Blob, ColorOperation, Colormap, DemEncoding, FeatureType, ImageFormat, MosaicRequest, MvtOptions, Outcome,
	PixelSelection, RenderOptions, ResampleAlg, TileRequest, Tiler, params,
};
use std::path::PathBuf;

// Rendering arguments shared by `tile` and `mosaic`.
#[derive(clap::Args, Debug)]
pub struct RenderArgs {
	/// image format: png, jpg, jpeg or webp
	#[arg(long, short, default_value = "png", display_order = 1)]
	format: String,

	/// tile size is 256 * scale
	#[arg(long, default_value_t = 1, display_order = 1)]
	scale: u32,

	/// rescale range "min,max", once for all bands or once per band
	#[arg(long, value_name = "min,max", allow_hyphen_values = true, display_order = 2)]
	rescale: Vec<String>,

	/// color formula, e.g. "gamma rgb 1.3, sigmoidal rgb 22 0.1, saturation 1.5"
	#[arg(long, value_name = "formula", display_order = 2)]
	color_formula: Option<String>,

	/// colormap for single band tiles: cfastie, schwarzwald, viridis or greys
	#[arg(long, value_name = "name", display_order = 2)]
	colormap: Option<String>,

	/// encode elevation as RGB: mapbox or mapzen
	#[arg(long, value_name = "encoding", display_order = 2)]
	dem: Option<String>,

	/// resampling method: nearest, bilinear, cubic or average
	#[arg(long, value_name = "method", display_order = 3)]
	resampling: Option<String>,

	/// write a vector tile with one point or polygon per pixel instead of an image
	#[arg(long, value_name = "point|polygon", display_order = 3)]
	mvt: Option<String>,

	/// layer name of the vector tile
	#[arg(long, default_value = "cogeo", display_order = 3)]
	layer_name: String,

	#[command(flatten)]
	read: ReadArgs,

	/// output file, stdout if omitted
	#[arg(long, short, display_order = 20)]
	output: Option<PathBuf>,
}

impl RenderArgs {
	fn render_options(&self) -> Result<RenderOptions> {
		let mut options = RenderOptions::new(self.format.parse::<ImageFormat>()?);
		if !self.rescale.is_empty() {
			options.rescale = Some(
				self
					.rescale
					.iter()
					.map(|range| params::parse_range(range))
					.collect::<Result<Vec<_>>>()?,
			);
		}
		options.color_formula = self.color_formula.as_deref().map(ColorOperation::parse_formula).transpose()?;
		options.colormap = self.colormap.as_deref().map(str::parse::<Colormap>).transpose()?;
		options.dem = self.dem.as_deref().map(str::parse::<DemEncoding>).transpose()?;
		Ok(options)
	}

	fn mvt_options(&self) -> Result<Option<MvtOptions>> {
		let Some(feature_type) = self.mvt.as_deref() else {
			return Ok(None);
		};
		Ok(Some(MvtOptions {
			layer_name: self.layer_name.clone(),
			feature_type: feature_type.parse::<FeatureType>()?,
		}))
	}
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct TileSubcommand {
	/// raster file or URL
	#[arg()]
	source: String,

	/// tile coordinate "z/x/y"
	#[arg()]
	tile: String,

	#[command(flatten)]
	render: RenderArgs,
}

#[tokio::main]
pub async fn run_tile(arguments: &TileSubcommand, tiler: &Tiler) -> Result<()> {
	let render = &arguments.render;
	let mut request = TileRequest::new(&arguments.source, parse_tile_coord(&arguments.tile)?);
	request.scale = render.scale;
	request.bands = render.read.bands()?;
	request.nodata = render.read.nodata()?;
	request.resampling = render.resampling.as_deref().map(str::parse::<ResampleAlg>).transpose()?;
	log::info!("rendering {:?} of {}", request.coord, request.address);

	let blob = match render.mvt_options()? {
		Some(mvt) => tiler.mvt(&request, &mvt).await?,
		None => tiler.encoded_tile(&request, &render.render_options()?).await?,
	};
	write_output(blob.as_slice(), render.output.as_deref())
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct MosaicSubcommand {
	/// tile coordinate "z/x/y"
	#[arg()]
	tile: String,

	/// raster files or URLs, in priority order
	#[arg(required = true)]
	sources: Vec<String>,

	/// how overlapping pixels are chosen: first, highest, lowest or stdev
	#[arg(long, short = 'p', default_value = "first", display_order = 1)]
	pixel_selection: String,

	#[command(flatten)]
	render: RenderArgs,
}

#[tokio::main]
pub async fn run_mosaic(arguments: &MosaicSubcommand, tiler: &Tiler) -> Result<()> {
	let render = &arguments.render;
	let sources: Vec<&str> = arguments.sources.iter().map(String::as_str).collect();
	let selection = arguments.pixel_selection.parse::<PixelSelection>()?;
	let mut request = MosaicRequest::new(&sources, parse_tile_coord(&arguments.tile)?, selection);
	request.scale = render.scale;
	request.bands = render.read.bands()?;
	request.nodata = render.read.nodata()?;
	request.resampling = render.resampling.as_deref().map(str::parse::<ResampleAlg>).transpose()?;
	log::info!("compositing {:?} from {} sources", request.coord, sources.len());

	let outcome: Outcome<Blob> = match render.mvt_options()? {
		Some(mvt) => tiler.mosaic_mvt(&request, &mvt).await?,
		None => tiler.encoded_mosaic_tile(&request, &render.render_options()?).await?,
	};
	let blob = outcome.or_empty_error(&format!("no source has valid pixels in {:?}", request.coord))?;
	write_output(blob.as_slice(), render.output.as_deref())
}
