/// Point cloud translation command line entry point
use anyhow::{Context, Result};
use clap::Parser;
use point_cloud_translate::executor;
use point_cloud_translate::{PointCloudTranslator, TranslateConfig};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "point-cloud-translate")]
#[command(about = "Convert point cloud files and virtual point clouds", long_about = None)]
struct Cli {
    /// Input point cloud file or .vpc virtual point cloud
    input: PathBuf,

    /// Output point cloud file, or a .vpc when the input is one
    #[arg(short, long)]
    output: PathBuf,

    /// Output format (las/laz)
    #[arg(long)]
    output_format: Option<String>,

    /// Assigns CRS to data (no reprojection)
    #[arg(long)]
    assign_crs: Option<String>,

    /// Transforms (reprojects) data to another CRS
    #[arg(long)]
    transform_crs: Option<String>,

    /// Keep only points matching an expression, e.g. "Classification == 2"
    #[arg(long)]
    filter: Option<String>,

    /// Number of worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Run every tile and report failures together instead of stopping
    /// at the first failed tile
    #[arg(long)]
    keep_going: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(default_level.into()))
        .init();

    executor::init_worker_pool(cli.threads).context("failed to initialise worker pool")?;

    let mut config = TranslateConfig::new(cli.input, cli.output);
    config.output_format = cli.output_format;
    config.assign_crs = cli.assign_crs;
    config.transform_crs = cli.transform_crs;
    config.filter = cli.filter;
    config.threads = cli.threads;
    config.keep_going = cli.keep_going;

    let summary = PointCloudTranslator::new(config).translate()?;
    println!("{summary}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_minimal() {
        let cli = Cli::try_parse_from(["point-cloud-translate", "in.las", "-o", "out.laz"]);
        assert!(cli.is_ok());
        let cli = cli.unwrap();
        assert_eq!(cli.input, PathBuf::from("in.las"));
        assert_eq!(cli.output, PathBuf::from("out.laz"));
        assert!(!cli.keep_going);
    }

    #[test]
    fn test_cli_parse_full_options() {
        let cli = Cli::try_parse_from([
            "point-cloud-translate",
            "set.vpc",
            "--output",
            "out.vpc",
            "--output-format",
            "laz",
            "--assign-crs",
            "EPSG:25832",
            "--transform-crs",
            "EPSG:4326",
            "--filter",
            "Classification == 2",
            "--threads",
            "4",
            "--keep-going",
        ])
        .unwrap();

        assert_eq!(cli.output_format.as_deref(), Some("laz"));
        assert_eq!(cli.assign_crs.as_deref(), Some("EPSG:25832"));
        assert_eq!(cli.transform_crs.as_deref(), Some("EPSG:4326"));
        assert_eq!(cli.threads, Some(4));
        assert!(cli.keep_going);
    }

    #[test]
    fn test_cli_requires_output() {
        let cli = Cli::try_parse_from(["point-cloud-translate", "in.las"]);
        assert!(cli.is_err());
    }
}
