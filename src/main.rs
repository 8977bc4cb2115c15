//! crop-telemetry - field sensor diagnostics from the command line
//!
//! Ingests JSON-lines readings, analyzes one device over a date range and
//! prints the analysis as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a device from a file
//! crop-telemetry --input readings.jsonl --device esp32-01
//!
//! # Pipe readings in, pick a crop and range, append the prompt summary
//! cat readings.jsonl | crop-telemetry --device esp32-01 --crop Arugula \
//!     --start 2024-05-01 --end 2024-05-31 --sensors temperature,humidity,soil_ph --summary
//!
//! # Print the effective configuration
//! crop-telemetry --print-config
//! ```
//!
//! # Environment Variables
//!
//! - `CROP_TELEMETRY_CONFIG`: Path to a TOML config file
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crop_telemetry::aggregation::{DateRange, SensorSelection};
use crop_telemetry::config::{self, EngineConfig};
use crop_telemetry::pipeline::{AnalysisRequest, JsonLinesSource, ReadingSource, TelemetryEngine};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "crop-telemetry")]
#[command(about = "Crop telemetry normalization and diagnostics")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides CROP_TELEMETRY_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSON-lines input file, or "-" for stdin
    #[arg(long, default_value = "-")]
    input: String,

    /// Device to analyze
    #[arg(long, required_unless_present = "print_config")]
    device: Option<String>,

    /// Crop profile name (default: the configured default crop)
    #[arg(long)]
    crop: Option<String>,

    /// First calendar day to include (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last calendar day to include (YYYY-MM-DD)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Comma-separated sensor keys to chart
    #[arg(long, default_value = "temperature,humidity")]
    sensors: SensorSelection,

    /// Append the plain-text telemetry summary after the JSON
    #[arg(long)]
    summary: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(p) => EngineConfig::load_from_file(p)
            .with_context(|| format!("loading config from {}", p.display())),
        None => Ok(EngineConfig::load()),
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    config::init(load_config(args.config.as_ref())?);
    let cfg = config::get();
    info!(
        crops = cfg.crops.len(),
        default_crop = %cfg.default_crop,
        window = cfg.aggregation.rolling_window,
        "Configuration ready"
    );

    if args.print_config {
        print!("{}", cfg.to_toml()?);
        return Ok(());
    }

    let device = args.device.context("--device is required")?;
    let engine = TelemetryEngine::new(cfg);

    let mut source: Box<dyn ReadingSource> = if args.input == "-" {
        Box::new(JsonLinesSource::stdin())
    } else {
        Box::new(JsonLinesSource::open(&args.input).await?)
    };
    let report = engine.ingest_from(source.as_mut()).await?;
    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        missing_fields = report.missing_fields,
        coercion_failures = report.coercion_failures,
        "Ingestion complete"
    );

    let request = AnalysisRequest {
        range: DateRange {
            start: args.start,
            end: args.end,
        },
        selection: args.sensors,
        crop: args.crop,
    };
    let analysis = engine.analyze(&device, &request)?;

    println!("{}", serde_json::to_string_pretty(&analysis)?);
    if args.summary {
        println!();
        println!("{}", engine.telemetry_summary(&device));
    }

    Ok(())
}
