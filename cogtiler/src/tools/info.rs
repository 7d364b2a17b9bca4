use super::write_json;
use anyhow::Result;
use cogtiler::Tiler;
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// raster files or URLs
	#[arg(required = true)]
	sources: Vec<String>,

	/// output file, stdout if omitted
	#[arg(long, short)]
	output: Option<PathBuf>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand, tiler: &Tiler) -> Result<()> {
	log::info!("inspecting {} sources", arguments.sources.len());
	let info = tiler.spatial_info(&arguments.sources).await?;
	write_json(&info, arguments.output.as_deref())
}
