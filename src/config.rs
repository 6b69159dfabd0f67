//! Configuration for a [`crate::SnapSolver`].
//!
//! Every knob lives in one struct, built via [`SolverConfigBuilder`], so
//! configs are trivial to share across tasks, log, and diff between runs.
//! Callers set only what they care about and rely on documented defaults
//! for the rest.

use crate::error::ConfigError;
use std::time::Duration;

/// Configuration for the crop-and-solve pipeline.
///
/// # Example
/// ```rust
/// use snapsolver::SolverConfig;
///
/// let config = SolverConfig::builder()
///     .model("gpt-4o-mini")
///     .api_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Model identifier sent with every inference request. Default: `gpt-4o-mini`.
    pub model: String,

    /// Base URL of the OpenAI-compatible API. Default: `https://api.openai.com/v1`.
    pub api_base: String,

    /// Bearer credential. When `None`, `OPENAI_API_KEY` is read from the
    /// environment at solver construction.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what is actually in the
    /// cropped region; creativity only hurts transcription and answers.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 1000.
    pub max_tokens: u32,

    /// Bound on each inference call. Default: 60 s.
    ///
    /// Applied twice: as the HTTP client timeout and as a `tokio::time::timeout`
    /// around the provider call, so a stuck provider can never leave the job
    /// slot in `Processing`. Exceeding it surfaces as `Unavailable` and the
    /// run fails.
    pub api_timeout: Duration,

    /// Re-emit cadence for status subscribers while a run is non-terminal.
    /// Default: 1 s. Clamped to at most 1 s — the heartbeat is a liveness
    /// signal, not the primary delivery mechanism.
    pub heartbeat: Duration,

    /// Override for the direct solve prompt. `None` uses
    /// [`crate::prompts::DEFAULT_SOLVE_PROMPT`].
    pub solve_prompt: Option<String>,

    /// Override for the phase-1 extraction prompt.
    pub extract_prompt: Option<String>,

    /// Override for the phase-2 solve-from-transcript prompt.
    pub solve_from_text_prompt: Option<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            temperature: 0.1,
            max_tokens: 1000,
            api_timeout: Duration::from_secs(60),
            heartbeat: Duration::from_secs(1),
            solve_prompt: None,
            extract_prompt: None,
            solve_from_text_prompt: None,
        }
    }
}

impl SolverConfig {
    /// Create a new builder.
    pub fn builder() -> SolverConfigBuilder {
        SolverConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the bearer credential: explicit key first, then `OPENAI_API_KEY`.
    pub(crate) fn resolve_api_key(&self) -> Result<String, ConfigError> {
        if let Some(ref key) = self.api_key {
            if !key.trim().is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential),
        }
    }
}

/// Builder for [`SolverConfig`].
#[derive(Debug)]
pub struct SolverConfigBuilder {
    config: SolverConfig,
}

impl SolverConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn api_timeout(mut self, timeout: Duration) -> Self {
        self.config.api_timeout = timeout;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout = Duration::from_secs(secs);
        self
    }

    pub fn heartbeat(mut self, cadence: Duration) -> Self {
        self.config.heartbeat = cadence.min(Duration::from_secs(1));
        self
    }

    pub fn solve_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.solve_prompt = Some(prompt.into());
        self
    }

    pub fn extract_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.extract_prompt = Some(prompt.into());
        self
    }

    pub fn solve_from_text_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.solve_from_text_prompt = Some(prompt.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SolverConfig, ConfigError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if c.api_base.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base must not be empty".into()));
        }
        if c.api_timeout.is_zero() {
            return Err(ConfigError::Invalid("api_timeout must be > 0".into()));
        }
        if c.heartbeat.is_zero() {
            return Err(ConfigError::Invalid("heartbeat must be > 0".into()));
        }
        Ok(self.config)
    }
}
