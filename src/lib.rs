//! # snapsolver
//!
//! Crop a screenshot region and solve its contents with a vision language
//! model.
//!
//! ## Why this crate?
//!
//! Screenshot-to-answer tools need three things done carefully: a crop
//! rectangle from an untrusted client must be reconciled with the real image
//! bounds without ever failing, the long inference call must not block
//! status reporting, and exactly one run may occupy the job slot at a time.
//! This crate is that core — the HTTP route layer around it is deliberately
//! out of scope and stays thin.
//!
//! ## Pipeline Overview
//!
//! ```text
//! screenshot + crop rectangle
//!  │
//!  ├─ 1. Decode   raw bytes or base64 data URI → bitmap
//!  ├─ 2. Clamp    pin the rectangle inside the image bounds (pure, total)
//!  ├─ 3. Crop     extract the region, re-encode as base64 PNG
//!  ├─ 4. Infer    one call (image → answer) or two (image → text → answer)
//!  └─ 5. Report   Completed/Failed snapshot, pulled or streamed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapsolver::{CropRect, ImageInput, PipelineKind, SnapSolver, SolverConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential auto-resolved from OPENAI_API_KEY
//!     let solver = SnapSolver::new(SolverConfig::default())?;
//!
//!     let bytes = std::fs::read("screenshot.png")?;
//!     solver
//!         .submit(
//!             ImageInput::Bytes(bytes),
//!             CropRect::new(120.0, 80.0, 640.0, 480.0),
//!             PipelineKind::Direct,
//!         )
//!         .await?;
//!
//!     let mut status = solver.subscribe();
//!     while let Some(snapshot) = status.next().await {
//!         println!("{:?}", snapshot.status);
//!         if snapshot.status.is_terminal() {
//!             println!("{}", snapshot.result_text.unwrap_or_default());
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `snapsolver` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod prompts;
pub mod solver;
pub mod status;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SolverConfig, SolverConfigBuilder};
pub use error::{ConfigError, InferenceError, SubmitError};
pub use job::{JobSnapshot, JobStatus};
pub use pipeline::decode::ImageInput;
pub use pipeline::geometry::{clamp, CropRect, Region};
pub use pipeline::infer::{InferenceMode, InferenceProvider, InferenceRequest};
pub use solver::{PipelineKind, SnapSolver};
pub use status::{StatusChannel, StatusStream};
