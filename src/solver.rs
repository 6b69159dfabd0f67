//! The pipeline orchestrator.
//!
//! [`SnapSolver`] composes the pipeline stages into one run: decode the
//! upload, clamp the crop rectangle, crop and re-encode the region, then
//! drive one or two inference calls depending on [`PipelineKind`], writing
//! every transition into the job slot. Submission returns as soon as the run
//! is accepted — the pipeline itself executes on a spawned task, and the
//! status paths never wait on it.
//!
//! ## Steps
//!
//! ```text
//! submit ─▶ decode (rejects InvalidImage) ─▶ claim slot (rejects Busy)
//!                                                │
//!   spawned: clamp ─▶ crop+encode ─▶ Processing ─▶ infer ×1/×2 ─▶ terminal
//! ```
//!
//! Both pipelines share this one code path; the only branch is which
//! prompts-and-calls sequence runs against the encoded region. In the
//! two-phase pipeline the second call is issued strictly after the first
//! succeeds — a phase-1 failure short-circuits to `Failed` without the
//! second call ever being built.

use crate::config::SolverConfig;
use crate::error::{ConfigError, InferenceError, SubmitError};
use crate::job::{JobSlot, JobSnapshot};
use crate::pipeline::decode::{self, ImageInput};
use crate::pipeline::encode;
use crate::pipeline::geometry::{self, CropRect};
use crate::pipeline::infer::{
    HttpInferenceClient, InferenceMode, InferenceProvider, InferenceRequest,
};
use crate::prompts;
use crate::status::{StatusChannel, StatusStream};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, info};

/// Which pipeline a submission runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineKind {
    /// One call: image → answer.
    Direct,
    /// Two calls: image → transcript, then transcript → answer.
    TwoPhase,
}

/// Orchestrates crop-and-solve runs over a single job slot.
///
/// Cheap to share behind an `Arc`; `submit`, `status`, and `subscribe` all
/// take `&self`.
pub struct SnapSolver {
    config: SolverConfig,
    provider: Arc<dyn InferenceProvider>,
    slot: Arc<JobSlot>,
    channel: StatusChannel,
}

impl SnapSolver {
    /// Build a solver backed by the HTTP inference client.
    ///
    /// Fails when no credential can be resolved or the HTTP client cannot
    /// be constructed.
    pub fn new(config: SolverConfig) -> Result<Self, ConfigError> {
        let provider = Arc::new(HttpInferenceClient::from_config(&config)?);
        Ok(Self::with_provider(config, provider))
    }

    /// Build a solver with a caller-supplied provider.
    ///
    /// The seam for tests and for callers that wrap the transport (caching,
    /// rate limiting, alternative services).
    pub fn with_provider(config: SolverConfig, provider: Arc<dyn InferenceProvider>) -> Self {
        let slot = Arc::new(JobSlot::new());
        let channel = StatusChannel::new(slot.watch(), config.heartbeat);
        Self {
            config,
            provider,
            slot,
            channel,
        }
    }

    /// Current job snapshot. Never blocks on the pipeline.
    pub fn status(&self) -> JobSnapshot {
        self.channel.snapshot()
    }

    /// Subscribe to status updates; see [`StatusChannel::subscribe`].
    pub fn subscribe(&self) -> StatusStream {
        self.channel.subscribe()
    }

    /// Accept a new run and start it asynchronously.
    ///
    /// Returns once the run is accepted (the slot is in `Uploading`) —
    /// never waits for the pipeline to finish. Rejections leave the slot
    /// untouched:
    ///
    /// * [`SubmitError::InvalidImage`] — the payload does not decode; the
    ///   previous run's snapshot stays visible.
    /// * [`SubmitError::Busy`] — a run is already in flight; the request is
    ///   rejected, not queued.
    pub async fn submit(
        &self,
        image: ImageInput,
        rect: CropRect,
        kind: PipelineKind,
    ) -> Result<(), SubmitError> {
        // Cheap early rejection; the claim below is the authoritative check.
        if !self.status().status.is_rest() {
            return Err(SubmitError::Busy);
        }

        // Decode off the async workers; a malformed image must be rejected
        // before the slot is touched.
        let img = task::spawn_blocking(move || decode::decode(image))
            .await
            .map_err(|e| SubmitError::InvalidImage {
                detail: format!("decode worker failed: {e}"),
            })??;

        if !self.slot.try_begin() {
            return Err(SubmitError::Busy);
        }

        info!(
            "accepted {:?} run on {}x{} image",
            kind,
            img.width(),
            img.height()
        );

        let slot = Arc::clone(&self.slot);
        let provider = Arc::clone(&self.provider);
        let config = self.config.clone();
        tokio::spawn(async move {
            run_pipeline(slot, provider, config, img, rect, kind).await;
        });

        Ok(())
    }
}

/// Execute one accepted run to its terminal state.
///
/// Every exit path writes `Completed` or `Failed`; the slot cannot be left
/// in a transient state.
async fn run_pipeline(
    slot: Arc<JobSlot>,
    provider: Arc<dyn InferenceProvider>,
    config: SolverConfig,
    img: image::DynamicImage,
    rect: CropRect,
    kind: PipelineKind,
) {
    let region = geometry::clamp(rect, img.width(), img.height());
    debug!("clamped {:?} to {:?}", rect, region);

    let encoded = task::spawn_blocking(move || encode::crop_to_data_uri(&img, region)).await;
    let data_uri = match encoded {
        Ok(Ok(uri)) => uri,
        Ok(Err(e)) => {
            slot.fail(e.to_string());
            return;
        }
        Err(e) => {
            slot.fail(format!("crop worker failed: {e}"));
            return;
        }
    };

    slot.set_processing();

    let outcome = match kind {
        PipelineKind::Direct => {
            let request = InferenceRequest {
                mode: InferenceMode::SolveFromImage,
                prompt: config
                    .solve_prompt
                    .clone()
                    .unwrap_or_else(|| prompts::DEFAULT_SOLVE_PROMPT.to_string()),
                image: Some(data_uri),
                prior_text: None,
            };
            bounded_infer(&provider, config.api_timeout, request).await
        }
        PipelineKind::TwoPhase => {
            let extract = InferenceRequest {
                mode: InferenceMode::ExtractText,
                prompt: config
                    .extract_prompt
                    .clone()
                    .unwrap_or_else(|| prompts::DEFAULT_EXTRACT_PROMPT.to_string()),
                image: Some(data_uri),
                prior_text: None,
            };
            match bounded_infer(&provider, config.api_timeout, extract).await {
                Ok(transcript) => {
                    debug!("extracted {} chars of text", transcript.len());
                    let solve = InferenceRequest {
                        mode: InferenceMode::SolveFromText,
                        prompt: config
                            .solve_from_text_prompt
                            .clone()
                            .unwrap_or_else(|| prompts::DEFAULT_SOLVE_FROM_TEXT_PROMPT.to_string()),
                        image: None,
                        prior_text: Some(transcript),
                    };
                    bounded_infer(&provider, config.api_timeout, solve).await
                }
                Err(e) => Err(e),
            }
        }
    };

    match outcome {
        Ok(answer) => slot.complete(answer),
        Err(e) => slot.fail(e.to_string()),
    }
}

/// One inference call, bounded by the configured timeout.
///
/// The bound lives here, not only in the HTTP client, so no provider
/// implementation can leave the slot stuck in `Processing`.
async fn bounded_infer(
    provider: &Arc<dyn InferenceProvider>,
    timeout: Duration,
    request: InferenceRequest,
) -> Result<String, InferenceError> {
    match tokio::time::timeout(timeout, provider.infer(&request)).await {
        Ok(result) => result,
        Err(_) => Err(InferenceError::Unavailable {
            reason: format!("inference call exceeded {}s timeout", timeout.as_secs()),
        }),
    }
}
