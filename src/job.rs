//! The single-slot job state machine.
//!
//! One [`JobSlot`] tracks the lifecycle of the currently (or most recently)
//! running pipeline:
//!
//! ```text
//! Idle ──▶ Uploading ──▶ Processing ──▶ Completed
//!   ▲          │                           │
//!   │          └──────────▶ Failed ◀───────┘ (inference error / timeout)
//!   └── (new run accepted from any rest state)
//! ```
//!
//! `Uploading` and `Processing` are transient; `Idle`, `Completed`, and
//! `Failed` are rest states a new run may start from. The slot is backed by
//! a `tokio::sync::watch` channel: writers publish snapshots, any number of
//! readers observe them without ever blocking the pipeline. [`JobSlot::try_begin`]
//! runs its check-and-transition inside `send_if_modified`, so two
//! submissions can never both observe a rest state and both claim the slot.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

/// Lifecycle phase of the job slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// No run has happened since the solver was created.
    Idle,
    /// A run was accepted; decode/clamp/crop are in progress.
    Uploading,
    /// The cropped image is with the inference service.
    Processing,
    /// The run finished; `result_text` holds the answer.
    Completed,
    /// The run failed; `error_message` says why.
    Failed,
}

impl JobStatus {
    /// Completed or Failed: the run is over and carries a final message.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// A new run may be accepted from any rest state.
    pub fn is_rest(&self) -> bool {
        matches!(self, JobStatus::Idle | JobStatus::Completed | JobStatus::Failed)
    }
}

/// An immutable snapshot of the job slot, safe to hand to any observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub status: JobStatus,
    /// The answer text; set only when `status == Completed`.
    pub result_text: Option<String>,
    /// Failure description; set only when `status == Failed`.
    pub error_message: Option<String>,
}

impl JobSnapshot {
    pub fn idle() -> Self {
        Self {
            status: JobStatus::Idle,
            result_text: None,
            error_message: None,
        }
    }

    fn transient(status: JobStatus) -> Self {
        Self {
            status,
            result_text: None,
            error_message: None,
        }
    }
}

/// Writer half of the job slot, owned by the orchestrator.
///
/// All transitions go through these methods; observers only ever hold
/// receivers obtained from [`JobSlot::watch`].
pub struct JobSlot {
    tx: watch::Sender<JobSnapshot>,
}

impl JobSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(JobSnapshot::idle());
        Self { tx }
    }

    /// Current snapshot, without registering as an observer.
    pub fn snapshot(&self) -> JobSnapshot {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn watch(&self) -> watch::Receiver<JobSnapshot> {
        self.tx.subscribe()
    }

    /// Claim the slot for a new run.
    ///
    /// Returns `true` and transitions to `Uploading` when the slot was at
    /// rest; returns `false` (leaving the snapshot untouched) when a run is
    /// already in flight. The check and the transition are one atomic step.
    pub fn try_begin(&self) -> bool {
        self.tx.send_if_modified(|snap| {
            if snap.status.is_rest() {
                *snap = JobSnapshot::transient(JobStatus::Uploading);
                true
            } else {
                false
            }
        })
    }

    /// Local image work is done; the inference call is about to go out.
    pub fn set_processing(&self) {
        self.tx
            .send_replace(JobSnapshot::transient(JobStatus::Processing));
    }

    /// Terminal success.
    pub fn complete(&self, answer: String) {
        info!("run completed ({} chars)", answer.len());
        self.tx.send_replace(JobSnapshot {
            status: JobStatus::Completed,
            result_text: Some(answer),
            error_message: None,
        });
    }

    /// Terminal failure.
    pub fn fail(&self, message: String) {
        info!("run failed: {message}");
        self.tx.send_replace(JobSnapshot {
            status: JobStatus::Failed,
            result_text: None,
            error_message: Some(message),
        });
    }
}

impl Default for JobSlot {
    fn default() -> Self {
        Self::new()
    }
}
