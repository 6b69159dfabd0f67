//! Prompt text for the solve and extract inference calls.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the model is instructed
//!    requires editing exactly one place.
//! 2. **Testability** — unit tests can inspect prompts directly without a
//!    live inference call, so prompt regressions are easy to catch.
//!
//! Callers can override the solve and extract prompts via
//! [`crate::config::SolverConfig`]; the constants here are the defaults.

/// Default prompt for the direct image → answer call.
pub const DEFAULT_SOLVE_PROMPT: &str = "\
Solve the problem shown in the image. If it is a multiple-choice question, \
analyse each option carefully before stating the correct answer. Give the \
final answer clearly at the end.";

/// Default prompt for the two-phase extraction call.
///
/// The extraction call asks for a faithful transcript only — interpretation
/// happens in the second call, against the transcript, so a transcription
/// mistake is visible in the final answer's provenance.
pub const DEFAULT_EXTRACT_PROMPT: &str = "\
Transcribe all text visible in the image exactly as written, preserving line \
breaks, numbering, and mathematical notation. Output only the transcription, \
with no commentary.";

/// Default prompt for the second phase: answer from the transcript alone.
pub const DEFAULT_SOLVE_FROM_TEXT_PROMPT: &str = "\
Solve the problem in the transcript below. If it is a multiple-choice \
question, analyse each option carefully before stating the correct answer. \
Give the final answer clearly at the end.";

/// Wrap a phase-1 transcript for inclusion in the phase-2 request.
pub fn transcript_context(transcript: &str) -> String {
    format!("Transcript:\n\"\"\"\n{}\n\"\"\"", transcript)
}
