//! Error types for the snapsolver library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`ConfigError`] — the solver could not be constructed at all (builder
//!   validation failed, no API credential anywhere). Returned from
//!   [`crate::config::SolverConfigBuilder::build`] and [`crate::SnapSolver::new`].
//!
//! * [`SubmitError`] — a submission was rejected up front, before the job
//!   slot was touched: either the slot is busy or the image bytes do not
//!   decode. The rejected request never reaches the inference service.
//!
//! * [`InferenceError`] — a single outbound inference call failed. Stored in
//!   the job snapshot's `error_message` when it makes the run fail, so a
//!   status observer sees exactly what the provider reported.
//!
//! The separation keeps the caller's decision simple: configuration problems
//! are programmer errors to fix, submission rejections are client errors to
//! report immediately, and inference failures are terminal states of an
//! otherwise healthy run.

use thiserror::Error;

/// Errors raised while building a [`crate::config::SolverConfig`] or
/// constructing a [`crate::SnapSolver`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// No API key was configured and none was found in the environment.
    #[error("No inference credential configured.\nSet `api_key` on the config or export OPENAI_API_KEY.")]
    MissingCredential,

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A submission was rejected before any pipeline work started.
///
/// Neither variant mutates the job slot: a rejected submission leaves the
/// previous run's snapshot fully intact.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// A run is already in flight (`Uploading` or `Processing`).
    ///
    /// The request is rejected, not queued. Resubmit once the current run
    /// reaches `Completed` or `Failed`.
    #[error("A run is already in flight; resubmit after it reaches a terminal state")]
    Busy,

    /// The image payload did not decode to a usable bitmap.
    #[error("Invalid image: {detail}")]
    InvalidImage { detail: String },
}

/// A single outbound inference call failed.
///
/// The client never retries internally; whether (and how) to retry is the
/// caller's policy. `Unavailable` is the only variant where a retry could
/// plausibly succeed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// The credential was rejected (HTTP 401/403). Retrying will not help.
    #[error("Inference request unauthorized: {detail}\nCheck your API key.")]
    Unauthorized { detail: String },

    /// Network failure, timeout, or a 5xx/429 from the service.
    #[error("Inference service unavailable: {reason}")]
    Unavailable { reason: String },

    /// The response arrived but the expected answer field was missing.
    #[error("Malformed inference response: {detail}")]
    MalformedResponse { detail: String },
}
