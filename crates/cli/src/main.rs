//! GeoProc CLI - quantile discretization and feature pass-through

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geoproc_algorithms::classification::QuantileParams;
use geoproc_algorithms::processing::{
    discretize_raster, feature_passthrough, DiscretizeParams, PassThroughParams,
};
use geoproc_algorithms::registry::{build_registry, find_algorithm, run_algorithm, ParamValue, RunContext};
use geoproc_algorithms::statistics::{quartile_breakpoints, IntervalClosure};
use geoproc_core::io::{
    open_raster, read_layer, Compression, FormatRegistry, GeoTiffOptions, JsonLayerProvider,
};
use geoproc_core::vector::FeatureSource;
use geoproc_core::Feedback;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geoproc")]
#[command(author, version, about = "Quantile discretization and feature pass-through", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Copy every feature of a JSON layer file to a new JSON layer file
    CopyFeatures {
        /// Input layer (.json)
        input: PathBuf,
        /// Output layer (.json)
        output: PathBuf,
    },
    /// Discretize band 1 of a raster into quartile buckets (0-4)
    Discretize {
        /// Input raster file
        input: PathBuf,
        /// Output raster file; the extension selects the format
        output: PathBuf,
        /// Keep values equal to a breakpoint in the lower bucket
        #[arg(long)]
        right_closed: bool,
        /// Leave the band's declared nodata value out and write it as 255
        #[arg(long)]
        skip_nodata: bool,
        /// GeoTIFF compression: none, deflate or lzw
        #[arg(long, default_value = "none")]
        compress: String,
    },
    /// List raster formats that can be written
    Formats,
    /// List registered algorithms and their parameters
    Algorithms,
    /// Run a registered algorithm by id
    Run {
        /// Algorithm id (see `geoproc algorithms`)
        algorithm: String,
        /// Parameter as KEY=VALUE (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn percent_bar(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb.set_message(msg.to_string());
    pb
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("Invalid parameter '{}', expected KEY=VALUE", raw),
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn info_command(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let raster = open_raster(input).context("Failed to read raster")?;
    pb.finish_and_clear();

    let (rows, cols) = raster.shape();
    let bounds = raster.bounds();
    let stats = raster.statistics();

    println!("File: {}", input.display());
    println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
    println!("Cell size: {}", raster.cell_size());
    println!(
        "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.0, bounds.1, bounds.2, bounds.3
    );
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata() {
        println!("NoData: {}", nodata);
    }
    println!("\nStatistics:");
    if let Some(min) = stats.min {
        println!("  Min: {:.4}", min);
    }
    if let Some(max) = stats.max {
        println!("  Max: {:.4}", max);
    }
    if let Some(mean) = stats.mean {
        println!("  Mean: {:.4}", mean);
    }
    if !raster.is_empty() {
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len() as f64
        );
    }
    match quartile_breakpoints(raster.valid_values()) {
        Ok(bp) => println!("  Quartile breakpoints: {}", bp),
        Err(_) => println!("  Quartile breakpoints: n/a (no valid cells)"),
    }
    Ok(())
}

fn copy_features_command(input: &Path, output: &Path) -> Result<()> {
    let pb = spinner("Reading layer...");
    let layer = read_layer(input)
        .with_context(|| format!("Failed to read layer {}", input.display()))?;
    pb.finish_and_clear();
    info!("Input: {} features", layer.len());

    let bar = percent_bar("Copying features");
    let tick = bar.clone();
    let feedback = Feedback::new().with_progress(move |p| tick.set_position(p.round() as u64));

    let start = Instant::now();
    let result = feature_passthrough(
        PassThroughParams {
            input: &layer,
            output: output.display().to_string(),
        },
        &JsonLayerProvider,
        &feedback,
    )
    .context("Failed to copy features")?;
    bar.finish_and_clear();

    println!(
        "Copied {} of {} features ({})",
        result.written,
        layer.feature_count().unwrap_or(result.written),
        FeatureSource::schema(&layer).geometry_type
    );
    done("Layer", output, start.elapsed());
    Ok(())
}

fn discretize_command(
    input: &Path,
    output: &Path,
    right_closed: bool,
    skip_nodata: bool,
    compress: &str,
) -> Result<()> {
    let closure = if right_closed {
        IntervalClosure::Right
    } else {
        IntervalClosure::Left
    };
    let params = DiscretizeParams {
        quantile: QuantileParams { closure, skip_nodata },
        ..DiscretizeParams::new(input, output)
    };
    let compression: Compression = compress.parse()?;
    let formats = FormatRegistry::detect().with_geotiff_options(GeoTiffOptions { compression });

    let pb = spinner("Discretizing...");
    let start = Instant::now();
    let result = discretize_raster(params, &formats).context("Failed to discretize raster");
    pb.finish_and_clear();
    let result = result?;

    println!("Breakpoints: {}", result.breakpoints);
    done("Discretized raster", &result.output, start.elapsed());
    Ok(())
}

fn formats_command() {
    let formats = FormatRegistry::detect();
    println!("{:<12} {:<12} {}", "Name", "Extensions", "Description");
    for handler in formats.handlers().iter().filter(|h| h.can_write_raster()) {
        println!(
            "{:<12} {:<12} {}",
            handler.name,
            handler.extensions.join(","),
            handler.long_name
        );
    }
}

fn algorithms_command() {
    for entry in build_registry() {
        println!("{} ({}) - {}", entry.id, entry.category.name(), entry.description);
        for param in &entry.params {
            let optional = if param.optional { ", optional" } else { "" };
            println!("    {:<14} {} [{}{}]", param.name, param.label, param.kind.name(), optional);
        }
    }
}

fn run_command(algorithm: &str, raw_params: &[String]) -> Result<()> {
    let Some(entry) = find_algorithm(algorithm) else {
        bail!("Unknown algorithm '{}'. See `geoproc algorithms`.", algorithm);
    };

    let mut params = HashMap::new();
    for raw in raw_params {
        let (key, value) = parse_param(raw)?;
        let Some(def) = entry.param(&key) else {
            bail!("Algorithm '{}' has no parameter '{}'", entry.id, key);
        };
        let value: ParamValue = def.kind.parse(def.name, &value)?;
        params.insert(key, value);
    }

    let start = Instant::now();
    let outputs = run_algorithm(entry.id, &params, &RunContext::default())
        .with_context(|| format!("Failed to run {}", entry.id))?;

    let mut keys: Vec<_> = outputs.keys().collect();
    keys.sort();
    for key in keys {
        println!("{} = {}", key, outputs[key]);
    }
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => info_command(&input)?,
        Commands::CopyFeatures { input, output } => copy_features_command(&input, &output)?,
        Commands::Discretize {
            input,
            output,
            right_closed,
            skip_nodata,
            compress,
        } => discretize_command(&input, &output, right_closed, skip_nodata, &compress)?,
        Commands::Formats => formats_command(),
        Commands::Algorithms => algorithms_command(),
        Commands::Run { algorithm, params } => run_command(&algorithm, &params)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("INPUT=a=b.tif").unwrap(),
            ("INPUT".to_string(), "a=b.tif".to_string())
        );
        assert!(parse_param("INPUT").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn test_cli_parses_discretize() {
        let cli = Cli::try_parse_from(["geoproc", "-v", "discretize", "in.tif", "out.tif", "--right-closed"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Discretize { right_closed, skip_nodata, compress, .. } => {
                assert!(right_closed);
                assert!(!skip_nodata);
                assert_eq!(compress, "none");
            }
            _ => panic!("expected discretize command"),
        }

        let cli = Cli::try_parse_from([
            "geoproc", "discretize", "in.tif", "out.tif", "--skip-nodata", "--compress", "deflate",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Discretize { skip_nodata: true, ref compress, .. } if compress == "deflate"
        ));
    }

    #[test]
    fn test_discretize_rejects_unknown_compression() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.tif");
        let err = discretize_command(&dir.path().join("in.tif"), &output, false, false, "zstd").unwrap_err();
        assert!(err.to_string().contains("compression"));
        assert!(!output.exists());
    }

    #[test]
    fn test_cli_parses_run_params() {
        let cli = Cli::try_parse_from([
            "geoproc", "run", "discretize_raster", "-p", "INPUT=a.tif", "--param", "OUTPUT=b.tif",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { algorithm, params } => {
                assert_eq!(algorithm, "discretize_raster");
                assert_eq!(params, vec!["INPUT=a.tif", "OUTPUT=b.tif"]);
            }
            _ => panic!("expected run command"),
        }
    }
}
