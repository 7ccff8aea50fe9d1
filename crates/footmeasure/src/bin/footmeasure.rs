//! footmeasure CLI: measure feet in marker photos, serve requests from files.

use clap::{Args, Parser, Subcommand};
use footmeasure::aruco::{builtins, render_marker, ArucoError};
use footmeasure::{
    service, FootMeasurer, MeasureParams, MeasureReport, MeasureService, ServiceError,
};
use log::LevelFilter;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[cfg(feature = "tracing")]
use footmeasure::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use footmeasure::core::init_with_level;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "footmeasure")]
#[command(about = "Measure foot length and width from photos with two reference markers")]
#[command(version)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    /// Emit JSON log lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    tracing_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure a batch of image files and print the aggregate as JSON.
    Measure(MeasureArgs),

    /// Run a JSON request body through the measurement handler.
    Request {
        /// Pipeline configuration (JSON). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// File holding the request body, e.g. `{"images": ["<base64>"]}`.
        body: PathBuf,
    },

    /// Print the health endpoint response.
    Health,

    /// Render a printable marker as PNG.
    RenderMarker(RenderArgs),

    /// Write the default configuration as JSON.
    DefaultConfig {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Args)]
struct MeasureArgs {
    /// Pipeline configuration (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the per-image report (JSON).
    #[arg(long)]
    report: Option<PathBuf>,

    /// Input images.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// Marker id in the dictionary.
    #[arg(long)]
    id: u32,

    #[arg(long, default_value = "DICT_4X4_50")]
    dictionary: String,

    /// Side of one bit cell in pixels.
    #[arg(long, default_value = "20")]
    cell_px: u32,

    /// Width of the black frame in cells.
    #[arg(long, default_value = "1")]
    border_bits: u32,

    /// White margin around the marker in cells.
    #[arg(long, default_value = "1")]
    quiet_zone: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    init_with_level(cli.log_level)?;
    #[cfg(feature = "tracing")]
    init_tracing(cli.tracing_json, cli.log_level);

    match cli.command {
        Commands::Measure(args) => run_measure(&args),
        Commands::Request { config, body } => run_request(config.as_deref(), &body),
        Commands::Health => run_health(),
        Commands::RenderMarker(args) => run_render_marker(&args),
        Commands::DefaultConfig { out } => {
            MeasureParams::default().write_json(&out)?;
            log::info!("wrote {}", out.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_params(config: Option<&Path>) -> CliResult<MeasureParams> {
    let mut params = match config {
        Some(path) => {
            log::info!("loading config {}", path.display());
            MeasureParams::load_json(path)
                .map_err(|e| -> CliError { format!("{}: {}", path.display(), e).into() })?
        }
        None => MeasureParams::default(),
    };
    params.apply_env_overrides();
    Ok(params)
}

// ── measure ────────────────────────────────────────────────────────────

fn run_measure(args: &MeasureArgs) -> CliResult<ExitCode> {
    let params = load_params(args.config.as_deref())?;
    let measurer = FootMeasurer::new(params)?;

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = std::fs::read(path)
            .map_err(|e| -> CliError { format!("{}: {}", path.display(), e).into() })?;
        images.push(bytes);
    }

    let batch = measurer.measure_batch_bytes(&images);

    if let Some(out) = &args.report {
        let sources: Vec<String> = args.images.iter().map(|p| p.display().to_string()).collect();
        MeasureReport::from_batch(measurer.params(), &sources, &batch).write_json(out)?;
        log::info!("report written to {}", out.display());
    }

    match &batch.result {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let err = ServiceError::from(e.clone());
            println!("{}", json!({ "error": err.to_string() }));
            Ok(ExitCode::FAILURE)
        }
    }
}

// ── request ────────────────────────────────────────────────────────────

fn run_request(config: Option<&Path>, body: &Path) -> CliResult<ExitCode> {
    let params = load_params(config)?;
    let service = MeasureService::new(FootMeasurer::new(params)?);

    let raw = std::fs::read_to_string(body)
        .map_err(|e| -> CliError { format!("{}: {}", body.display(), e).into() })?;
    let resp = service.handle_measure(&raw);

    println!("{}", resp.status);
    println!("{}", resp.body);
    Ok(if resp.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ── health ─────────────────────────────────────────────────────────────

fn run_health() -> CliResult<ExitCode> {
    let resp = service::health();
    println!("{}", resp.body);
    Ok(if resp.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ── render-marker ──────────────────────────────────────────────────────

fn run_render_marker(args: &RenderArgs) -> CliResult<ExitCode> {
    let dict = builtins::builtin_dictionary(&args.dictionary)
        .ok_or_else(|| ArucoError::UnknownDictionary(args.dictionary.clone()))?;
    let img = render_marker(
        &dict,
        args.id,
        args.cell_px,
        args.border_bits,
        args.quiet_zone,
    )?;
    img.save(&args.out)?;
    log::info!(
        "marker {} of {} ({}x{} px) written to {}",
        args.id,
        dict.name,
        img.width(),
        img.height(),
        args.out.display()
    );
    Ok(ExitCode::SUCCESS)
}
