//! Integration tests for the crop-and-solve pipeline.
//!
//! These tests drive the real orchestrator, job slot, and status channel
//! with mock inference providers — no network, no API key. The mocks record
//! every request they receive so tests can assert exactly what was sent
//! downstream (call counts, modes, and the cropped image itself).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use snapsolver::{
    CropRect, ImageInput, InferenceError, InferenceMode, InferenceProvider, InferenceRequest,
    JobSnapshot, JobStatus, PipelineKind, SnapSolver, SolverConfig, StatusStream, SubmitError,
};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Replays a scripted sequence of responses and records every request.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, InferenceError>>>,
    calls: Mutex<Vec<InferenceRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<String, InferenceError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<InferenceRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceProvider for ScriptedProvider {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(InferenceError::Unavailable {
                    reason: "scripted responses exhausted".into(),
                })
            })
    }
}

/// Blocks inside `infer` until released, so tests can observe `Processing`.
struct GatedProvider {
    release: Notify,
    calls: Mutex<usize>,
}

impl GatedProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            release: Notify::new(),
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl InferenceProvider for GatedProvider {
    async fn infer(&self, _request: &InferenceRequest) -> Result<String, InferenceError> {
        *self.calls.lock().unwrap() += 1;
        self.release.notified().await;
        Ok("gated answer".into())
    }
}

/// Never returns within any realistic timeout.
struct StalledProvider;

#[async_trait]
impl InferenceProvider for StalledProvider {
    async fn infer(&self, _request: &InferenceRequest) -> Result<String, InferenceError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
    }
}

fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("png encode");
    buf
}

fn solid_image(w: u32, h: u32) -> Vec<u8> {
    png_bytes(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        w,
        h,
        Rgba([40, 40, 40, 255]),
    )))
}

/// Black 100x100 image with a white square covering x,y >= 90.
fn corner_marked_image() -> Vec<u8> {
    let mut base = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
    for y in 90..100 {
        for x in 90..100 {
            base.put_pixel(x, y, Rgba([255, 255, 255, 255]));
        }
    }
    png_bytes(&DynamicImage::ImageRgba8(base))
}

fn decode_data_uri(uri: &str) -> DynamicImage {
    let b64 = uri
        .strip_prefix("data:image/png;base64,")
        .expect("exact PNG data URI prefix");
    let bytes = STANDARD.decode(b64).expect("valid base64");
    image::load_from_memory(&bytes).expect("valid PNG")
}

async fn wait_for(stream: &mut StatusStream, target: JobStatus) -> JobSnapshot {
    while let Some(snapshot) = stream.next().await {
        if snapshot.status == target {
            return snapshot;
        }
    }
    panic!("status stream ended before reaching {target:?}");
}

fn solver_with(provider: Arc<dyn InferenceProvider>) -> SnapSolver {
    SnapSolver::with_provider(SolverConfig::default(), provider)
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn direct_pipeline_crops_and_completes() {
    let provider = ScriptedProvider::new(vec![Ok("42".into())]);
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(corner_marked_image()),
            CropRect::new(90.0, 90.0, 50.0, 50.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    let terminal = wait_for(&mut status, JobStatus::Completed).await;
    assert_eq!(terminal.result_text.as_deref(), Some("42"));
    assert!(terminal.error_message.is_none());

    // Exactly one call, in image mode, carrying the 10x10 corner region.
    let calls = provider.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, InferenceMode::SolveFromImage);
    let sent = decode_data_uri(calls[0].image.as_deref().expect("image attached"));
    assert_eq!(sent.dimensions(), (10, 10));
    assert!(
        sent.to_rgba8().pixels().all(|p| p.0 == [255, 255, 255, 255]),
        "cropped region must come from origin (90, 90)"
    );
}

#[tokio::test]
async fn data_uri_submission_matches_binary_submission() {
    let provider = ScriptedProvider::new(vec![Ok("ok".into())]);
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    let uri = format!(
        "data:image/png;base64,{}",
        STANDARD.encode(corner_marked_image())
    );
    solver
        .submit(
            ImageInput::DataUri(uri),
            CropRect::new(90.0, 90.0, 50.0, 50.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    wait_for(&mut status, JobStatus::Completed).await;
    let sent = decode_data_uri(provider.calls()[0].image.as_deref().unwrap());
    assert_eq!(sent.dimensions(), (10, 10));
}

// ── Two-phase pipeline ───────────────────────────────────────────────────────

#[tokio::test]
async fn two_phase_passes_transcript_to_second_call() {
    let provider = ScriptedProvider::new(vec![
        Ok("x + 1 = 3, solve for x".into()),
        Ok("x = 2".into()),
    ]);
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(64, 64)),
            CropRect::new(0.0, 0.0, 64.0, 64.0),
            PipelineKind::TwoPhase,
        )
        .await
        .expect("submission accepted");

    let terminal = wait_for(&mut status, JobStatus::Completed).await;
    assert_eq!(terminal.result_text.as_deref(), Some("x = 2"));

    let calls = provider.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].mode, InferenceMode::ExtractText);
    assert!(calls[0].image.is_some());
    assert_eq!(calls[1].mode, InferenceMode::SolveFromText);
    assert!(calls[1].image.is_none(), "phase 2 must not re-send the image");
    assert_eq!(
        calls[1].prior_text.as_deref(),
        Some("x + 1 = 3, solve for x")
    );
}

#[tokio::test]
async fn two_phase_failure_short_circuits_phase_two() {
    let provider = ScriptedProvider::new(vec![Err(InferenceError::Unavailable {
        reason: "HTTP 503".into(),
    })]);
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(32, 32)),
            CropRect::new(0.0, 0.0, 32.0, 32.0),
            PipelineKind::TwoPhase,
        )
        .await
        .expect("submission accepted");

    let terminal = wait_for(&mut status, JobStatus::Failed).await;
    assert!(terminal.error_message.unwrap().contains("HTTP 503"));
    assert_eq!(provider.calls().len(), 1, "phase 2 must never be invoked");
}

// ── Busy rejection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_while_processing_is_rejected_without_touching_state() {
    let provider = GatedProvider::new();
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(16, 16)),
            CropRect::new(0.0, 0.0, 16.0, 16.0),
            PipelineKind::Direct,
        )
        .await
        .expect("first submission accepted");

    wait_for(&mut status, JobStatus::Processing).await;

    let second = solver
        .submit(
            ImageInput::Bytes(solid_image(16, 16)),
            CropRect::new(0.0, 0.0, 16.0, 16.0),
            PipelineKind::Direct,
        )
        .await;
    assert_eq!(second, Err(SubmitError::Busy));
    assert_eq!(
        solver.status().status,
        JobStatus::Processing,
        "a rejected submission must leave the snapshot untouched"
    );

    provider.release.notify_one();
    let terminal = wait_for(&mut status, JobStatus::Completed).await;
    assert_eq!(terminal.result_text.as_deref(), Some("gated answer"));
    assert_eq!(*provider.calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn slot_is_reusable_after_a_terminal_state() {
    let provider = ScriptedProvider::new(vec![Ok("first".into()), Ok("second".into())]);
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    for expected in ["first", "second"] {
        solver
            .submit(
                ImageInput::Bytes(solid_image(8, 8)),
                CropRect::new(0.0, 0.0, 8.0, 8.0),
                PipelineKind::Direct,
            )
            .await
            .expect("submission accepted");
        let terminal = wait_for(&mut status, JobStatus::Completed).await;
        assert_eq!(terminal.result_text.as_deref(), Some(expected));
    }
}

// ── Input validation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn invalid_image_is_rejected_before_any_state_transition() {
    let provider = ScriptedProvider::new(vec![]);
    let solver = solver_with(provider.clone());

    let err = solver
        .submit(
            ImageInput::Bytes(vec![1, 2, 3, 4]),
            CropRect::new(0.0, 0.0, 10.0, 10.0),
            PipelineKind::Direct,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitError::InvalidImage { .. }));
    assert_eq!(solver.status().status, JobStatus::Idle);
    assert!(provider.calls().is_empty(), "no external call may be made");
}

// ── Failure modes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthorized_error_is_surfaced_verbatim() {
    let provider = ScriptedProvider::new(vec![Err(InferenceError::Unauthorized {
        detail: "HTTP 401 Unauthorized".into(),
    })]);
    let solver = solver_with(provider);
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(8, 8)),
            CropRect::new(0.0, 0.0, 8.0, 8.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    let terminal = wait_for(&mut status, JobStatus::Failed).await;
    assert!(terminal.error_message.unwrap().contains("HTTP 401"));
}

#[tokio::test(start_paused = true)]
async fn stalled_inference_times_out_into_failed() {
    let config = SolverConfig::builder()
        .api_timeout(Duration::from_secs(5))
        .build()
        .expect("valid config");
    let solver = SnapSolver::with_provider(config, Arc::new(StalledProvider));
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(8, 8)),
            CropRect::new(0.0, 0.0, 8.0, 8.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    let terminal = wait_for(&mut status, JobStatus::Failed).await;
    assert!(
        terminal.error_message.unwrap().contains("exceeded"),
        "timeout must surface as an unavailable-style failure"
    );
}

// ── Status delivery ──────────────────────────────────────────────────────────

#[tokio::test]
async fn subscribers_see_the_full_lifecycle_in_order() {
    let provider = ScriptedProvider::new(vec![Ok("done".into())]);
    let solver = solver_with(provider);
    let mut status = solver.subscribe();

    assert_eq!(status.next().await.unwrap().status, JobStatus::Idle);

    solver
        .submit(
            ImageInput::Bytes(solid_image(8, 8)),
            CropRect::new(0.0, 0.0, 8.0, 8.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    // Transitions arrive in order; the watch channel may coalesce fast
    // intermediate states, so collect until terminal and check ordering.
    let mut seen = Vec::new();
    loop {
        let snapshot = status.next().await.expect("stream alive");
        seen.push(snapshot.status);
        if snapshot.status.is_terminal() {
            break;
        }
    }
    assert_eq!(*seen.last().unwrap(), JobStatus::Completed);
    let positions: Vec<usize> = [JobStatus::Uploading, JobStatus::Processing]
        .iter()
        .filter_map(|s| seen.iter().position(|x| x == s))
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "observed transient states must appear in pipeline order: {seen:?}"
    );
}

#[tokio::test]
async fn pull_status_never_blocks_on_an_in_flight_run() {
    let provider = GatedProvider::new();
    let solver = solver_with(provider.clone());
    let mut status = solver.subscribe();

    solver
        .submit(
            ImageInput::Bytes(solid_image(8, 8)),
            CropRect::new(0.0, 0.0, 8.0, 8.0),
            PipelineKind::Direct,
        )
        .await
        .expect("submission accepted");

    wait_for(&mut status, JobStatus::Processing).await;

    // The provider is still blocked; pull reads must return immediately.
    for _ in 0..3 {
        assert_eq!(solver.status().status, JobStatus::Processing);
    }

    provider.release.notify_one();
    wait_for(&mut status, JobStatus::Completed).await;
}
