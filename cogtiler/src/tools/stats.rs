use super::{ReadArgs, write_json};
use anyhow::Result;
use cogtiler::{Crs, MetadataRequest, StatsRequest, Tiler, params};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct StatsSubcommand {
	/// raster file or URL
	#[arg()]
	source: String,

	/// area "left,bottom,right,top"
	#[arg(long, short, allow_hyphen_values = true, display_order = 1)]
	bbox: String,

	/// reference system of the bbox
	#[arg(long, default_value = "EPSG:4326", display_order = 1)]
	bbox_crs: String,

	/// largest edge of the read, in pixels
	#[arg(long, value_name = "int", display_order = 2)]
	max_size: Option<usize>,

	/// number of histogram bins
	#[arg(long, value_name = "int", display_order = 2)]
	bins: Option<usize>,

	/// histogram range "min,max"
	#[arg(long, value_name = "min,max", allow_hyphen_values = true, display_order = 2)]
	range: Option<String>,

	#[command(flatten)]
	read: ReadArgs,

	/// output file, stdout if omitted
	#[arg(long, short, display_order = 20)]
	output: Option<PathBuf>,
}

#[tokio::main]
pub async fn run_stats(arguments: &StatsSubcommand, tiler: &Tiler) -> Result<()> {
	let mut request = StatsRequest::new(&arguments.source, params::parse_bbox(&arguments.bbox)?);
	request.bbox_crs = arguments.bbox_crs.parse::<Crs>()?;
	request.max_size = arguments.max_size;
	request.histogram_bins = arguments.bins;
	request.histogram_range = arguments.range.as_deref().map(params::parse_range).transpose()?;
	request.bands = arguments.read.bands()?;
	request.nodata = arguments.read.nodata()?;

	let stats = tiler
		.area_stats(&request)
		.await?
		.or_empty_error(&format!("no valid pixels inside {:?}", request.bbox))?;
	write_json(&stats, arguments.output.as_deref())
}

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct MetadataSubcommand {
	/// raster file or URL
	#[arg()]
	source: String,

	/// largest edge of the preview read, in pixels
	#[arg(long, value_name = "int", display_order = 1)]
	max_size: Option<usize>,

	/// read overview level n instead, i.e. 1/2^(n+1) of the native size
	#[arg(long, value_name = "int", display_order = 1)]
	overview_level: Option<u32>,

	/// number of histogram bins
	#[arg(long, value_name = "int", display_order = 2)]
	bins: Option<usize>,

	/// histogram range "min,max"
	#[arg(long, value_name = "min,max", allow_hyphen_values = true, display_order = 2)]
	range: Option<String>,

	#[command(flatten)]
	read: ReadArgs,

	/// output file, stdout if omitted
	#[arg(long, short, display_order = 20)]
	output: Option<PathBuf>,
}

#[tokio::main]
pub async fn run_metadata(arguments: &MetadataSubcommand, tiler: &Tiler) -> Result<()> {
	let mut request = MetadataRequest::new(&arguments.source);
	request.max_size = arguments.max_size;
	request.overview_level = arguments.overview_level;
	request.histogram_bins = arguments.bins;
	request.histogram_range = arguments.range.as_deref().map(params::parse_range).transpose()?;
	request.bands = arguments.read.bands()?;
	request.nodata = arguments.read.nodata()?;

	write_json(&tiler.metadata(&request).await?, arguments.output.as_deref())
}
