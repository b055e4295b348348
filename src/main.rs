use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use geopin::domain::{Coordinate, ImageReference};
use geopin::pipeline::{GeotagPipeline, NoContentSource, SaveReport};
use geopin::store;

/// Geotag a photo with a decimal latitude/longitude pair
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Image to geotag (path or file:// URI)
    image: String,

    /// Latitude in decimal degrees (-90 to 90)
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in decimal degrees (-180 to 180)
    #[arg(long, allow_hyphen_values = true)]
    lng: f64,

    /// Directory to persist into (defaults to the Pictures folder)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let coordinate = Coordinate::new(args.lat, args.lng)?;
    let out_dir = args
        .out_dir
        .or_else(dirs::picture_dir)
        .context("no pictures directory on this system, pass --out-dir")?;

    let pipeline = GeotagPipeline::new(
        store::platform_store(&out_dir)?,
        Box::new(NoContentSource),
    );
    let result = pipeline.save(&ImageReference::parse(&args.image), coordinate);
    let report = SaveReport::from(&result);
    println!("{}", serde_json::to_string_pretty(&report)?);

    result.map(|_| ()).map_err(Into::into)
}
