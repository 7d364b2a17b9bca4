mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	/// YAML file with tiling defaults
	#[arg(long, short, global = true, value_name = "file")]
	config: Option<PathBuf>,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Render one map tile of a raster
	Tile(tools::tile::TileSubcommand),

	/// Composite one map tile from several rasters
	Mosaic(tools::tile::MosaicSubcommand),

	/// Compute band statistics inside a bounding box
	Stats(tools::stats::StatsSubcommand),

	/// Show bounds, zoom range and statistics of a raster
	Metadata(tools::stats::MetadataSubcommand),

	/// Read band values at a coordinate
	Point(tools::point::Subcommand),

	/// Show bounds and zoom range of one or more rasters
	Info(tools::info::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	let tiler = tools::tiler(cli.config.as_deref())?;
	match &cli.command {
		Commands::Tile(arguments) => tools::tile::run_tile(arguments, &tiler),
		Commands::Mosaic(arguments) => tools::tile::run_mosaic(arguments, &tiler),
		Commands::Stats(arguments) => tools::stats::run_stats(arguments, &tiler),
		Commands::Metadata(arguments) => tools::stats::run_metadata(arguments, &tiler),
		Commands::Point(arguments) => tools::point::run(arguments, &tiler),
		Commands::Info(arguments) => tools::info::run(arguments, &tiler),
	}
}
