//! Pipeline stages for one crop-and-solve run.
//!
//! Each submodule implements exactly one transformation step, so every stage
//! is independently testable and replaceable without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! decode ──▶ geometry ──▶ encode ──▶ infer
//! (bytes /    (clamp to    (crop +    (1 or 2 calls
//!  data URI)   bounds)      base64)    to the VLM)
//! ```
//!
//! 1. [`decode`]   — normalise the client payload (raw bytes or data URI)
//!    into one `DynamicImage` representation
//! 2. [`geometry`] — reconcile the untrusted crop rectangle with the decoded
//!    image bounds; pure, never fails
//! 3. [`encode`]   — crop the validated region and re-encode it as a base64
//!    PNG data URI for the multimodal request body
//! 4. [`infer`]    — drive the external inference call; the only stage with
//!    network I/O

pub mod decode;
pub mod encode;
pub mod geometry;
pub mod infer;
