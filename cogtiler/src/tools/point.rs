use super::write_json;
use anyhow::Result;
use cogtiler::{Tiler, params};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// raster file or URL
	#[arg()]
	source: String,

	/// position "lon,lat"
	#[arg(allow_hyphen_values = true)]
	coordinates: String,

	/// 1-based band indexes, e.g. "1,2,3"
	#[arg(long, short, value_name = "list")]
	indexes: Option<String>,

	/// output file, stdout if omitted
	#[arg(long, short)]
	output: Option<PathBuf>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, tiler: &Tiler) -> Result<()> {
	let [lon, lat] = params::parse_coordinates(&arguments.coordinates)?;
	let bands = arguments.indexes.as_deref().map(params::parse_indexes).transpose()?;
	let values = tiler.point(&arguments.source, lon, lat, bands).await?;
	write_json(&values, arguments.output.as_deref())
}
