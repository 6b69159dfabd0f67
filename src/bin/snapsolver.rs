//! CLI binary for snapsolver.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `SolverConfig`, submits one run, and follows the status stream.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use snapsolver::{
    CropRect, ImageInput, JobStatus, PipelineKind, SnapSolver, SolverConfig,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Solve the full screenshot
  snapsolver screenshot.png

  # Crop a region first (pixel coordinates, top-left origin)
  snapsolver screenshot.png --x 120 --y 80 --width 640 --height 480

  # Two-phase pipeline: transcribe the region, then solve from the transcript
  snapsolver screenshot.png --two-phase

  # Use a specific model and shorter timeout
  snapsolver --model gpt-4o --api-timeout 30 screenshot.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY        Bearer credential for the inference endpoint
  SNAPSOLVER_API_BASE   Override the API base URL (default: https://api.openai.com/v1)
  SNAPSOLVER_MODEL      Override the model ID

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Solve:         snapsolver screenshot.png --x 100 --y 100 --width 800 --height 600
"#;

/// Crop a screenshot region and solve its contents with a vision LLM.
#[derive(Parser, Debug)]
#[command(
    name = "snapsolver",
    version,
    about = "Crop a screenshot region and solve its contents with a vision LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Screenshot file (PNG or JPEG).
    input: PathBuf,

    /// Crop origin X in pixels. Out-of-bounds values are clamped.
    #[arg(long, default_value_t = 0.0)]
    x: f64,

    /// Crop origin Y in pixels.
    #[arg(long, default_value_t = 0.0)]
    y: f64,

    /// Crop width in pixels. Defaults to the full image.
    #[arg(long)]
    width: Option<f64>,

    /// Crop height in pixels. Defaults to the full image.
    #[arg(long)]
    height: Option<f64>,

    /// Extract text first, then solve from the transcript.
    #[arg(long)]
    two_phase: bool,

    /// Model ID sent with every inference request.
    #[arg(long, env = "SNAPSOLVER_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Base URL of the OpenAI-compatible API.
    #[arg(
        long,
        env = "SNAPSOLVER_API_BASE",
        default_value = "https://api.openai.com/v1"
    )]
    api_base: String,

    /// Per-call inference timeout in seconds.
    #[arg(long, env = "SNAPSOLVER_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Max tokens the model may generate.
    #[arg(long, default_value_t = 1000)]
    max_tokens: u32,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the answer and errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = SolverConfig::builder()
        .model(&cli.model)
        .api_base(&cli.api_base)
        .api_timeout_secs(cli.api_timeout)
        .max_tokens(cli.max_tokens)
        .build()?;

    let solver = SnapSolver::new(config)?;

    let bytes = std::fs::read(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let rect = CropRect::new(
        cli.x,
        cli.y,
        cli.width.unwrap_or(f64::MAX),
        cli.height.unwrap_or(f64::MAX),
    );
    let kind = if cli.two_phase {
        PipelineKind::TwoPhase
    } else {
        PipelineKind::Direct
    };

    solver
        .submit(ImageInput::Bytes(bytes), rect, kind)
        .await
        .context("Submission rejected")?;

    let mut status = solver.subscribe();
    while let Some(snapshot) = status.next().await {
        if !cli.quiet {
            eprintln!("status: {:?}", snapshot.status);
        }
        match snapshot.status {
            JobStatus::Completed => {
                println!("{}", snapshot.result_text.unwrap_or_default());
                return Ok(());
            }
            JobStatus::Failed => {
                anyhow::bail!(
                    "run failed: {}",
                    snapshot
                        .error_message
                        .unwrap_or_else(|| "unknown error".to_string())
                );
            }
            _ => {}
        }
    }

    anyhow::bail!("status stream ended before the run finished")
}
