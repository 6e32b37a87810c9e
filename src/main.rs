use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use terrapaint::BoundingBox;
use terrapaint::features::StaticSource;
use terrapaint::pipeline::Pipeline;
use terrapaint::schema::LayerSchema;

/// Generate per-category terrain texture masks from geographic vector data
#[derive(Parser)]
#[command(name = "terrapaint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Layer schema file (JSON array of layer records)
    #[arg(short, long)]
    schema: PathBuf,

    /// Feature data file (GeoJSON FeatureCollection)
    #[arg(short, long)]
    features: PathBuf,

    /// Map center latitude in degrees
    #[arg(long)]
    lat: f64,

    /// Map center longitude in degrees
    #[arg(long)]
    lon: f64,

    /// Map height in meters
    #[arg(long, default_value = "2048")]
    height: f64,

    /// Map width in meters
    #[arg(long, default_value = "2048")]
    width: f64,

    /// Extra metric margin added to every side
    #[arg(long, default_value = "0")]
    margin: f64,

    /// Output directory for the generated weight files
    #[arg(short, long, default_value = "masks")]
    output: PathBuf,

    /// Fixed seed for the dissolve pass
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let schema_text = fs::read_to_string(&cli.schema)
        .with_context(|| format!("cannot read schema {}", cli.schema.display()))?;
    let schema = LayerSchema::from_json(&schema_text).context("invalid layer schema")?;

    let source = StaticSource::from_geojson_path(&cli.features)
        .with_context(|| format!("cannot load features from {}", cli.features.display()))?;

    let bbox = BoundingBox::with_margin(cli.lat, cli.lon, cli.height, cli.width, cli.margin)
        .context("cannot build bounding box around the map center")?;

    let mut pipeline = Pipeline::new(&schema, &bbox, &source, &cli.output);
    if let Some(seed) = cli.seed {
        pipeline = pipeline.with_seed(seed);
    }

    let summary = pipeline.run()?;
    println!(
        "Generated masks for {} layers ({} pixels claimed) in {}",
        summary.layers,
        summary.claimed_pixels,
        cli.output.display()
    );
    if !summary.skipped_layers.is_empty() {
        println!("Skipped layers: {}", summary.skipped_layers.join(", "));
    }

    Ok(())
}
