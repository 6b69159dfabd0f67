//! Inference client: submit a prompt (plus optional inline image) to the
//! external vision/text service and return free text.
//!
//! This is the only stage with network I/O. It is intentionally thin — all
//! prompt wording lives in [`crate::prompts`], and retry policy (if the
//! caller wants one) lives outside the crate entirely: a failed call is
//! reported once, as one of the three [`InferenceError`] kinds, and the
//! orchestrator turns it into a terminal `Failed` state.
//!
//! The wire shape is the OpenAI-style chat-completions schema: a single user
//! message whose content is a text part plus, for vision calls, an
//! `image_url` part carrying the cropped region as a base64 data URI.

use crate::config::SolverConfig;
use crate::error::{ConfigError, InferenceError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

/// What the model is being asked to do with this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMode {
    /// Answer the question shown in the attached image directly.
    SolveFromImage,
    /// Transcribe the text visible in the attached image.
    ExtractText,
    /// Answer using previously extracted text; no image attached.
    SolveFromText,
}

/// One outbound inference call. Transient — built, sent, dropped.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub mode: InferenceMode,
    /// Instruction text for the model.
    pub prompt: String,
    /// Cropped region as a `data:image/png;base64,…` URI, for vision modes.
    pub image: Option<String>,
    /// Phase-1 transcript, for [`InferenceMode::SolveFromText`].
    pub prior_text: Option<String>,
}

/// The opaque external capability: submit a request, receive text, may fail.
///
/// Object-safe so the orchestrator can hold `Arc<dyn InferenceProvider>` and
/// tests can inject recording or failing mocks.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError>;
}

/// HTTP implementation over an OpenAI-compatible chat-completions endpoint.
pub struct HttpInferenceClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl HttpInferenceClient {
    /// Build a client from the solver configuration.
    ///
    /// The HTTP-level timeout matches the configured inference timeout, so a
    /// stalled connection surfaces as `Unavailable` rather than hanging.
    pub fn from_config(config: &SolverConfig) -> Result<Self, ConfigError> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::Client::builder()
            .timeout(config.api_timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn build_payload(&self, request: &InferenceRequest) -> Value {
        let mut content = vec![json!({
            "type": "text",
            "text": user_text(request),
        })];

        if let Some(ref uri) = request.image {
            content.push(json!({
                "type": "image_url",
                "image_url": { "url": uri },
            }));
        }

        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        })
    }
}

/// Compose the text part: the instruction, plus the phase-1 transcript when
/// one is being carried forward.
fn user_text(request: &InferenceRequest) -> String {
    match request.prior_text {
        Some(ref prior) => format!("{}\n\n{}", request.prompt, crate::prompts::transcript_context(prior)),
        None => request.prompt.clone(),
    }
}

/// Pull the answer text out of a chat-completions response body.
fn extract_answer(body: &Value) -> Result<String, InferenceError> {
    body.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| InferenceError::MalformedResponse {
            detail: "response missing choices[0].message.content".into(),
        })
}

#[async_trait]
impl InferenceProvider for HttpInferenceClient {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let start = Instant::now();
        let url = format!("{}/chat/completions", self.api_base);
        let payload = self.build_payload(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("inference request failed: {e}");
                InferenceError::Unavailable {
                    reason: if e.is_timeout() {
                        "request timed out".into()
                    } else {
                        e.to_string()
                    },
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(InferenceError::Unauthorized {
                detail: format!("HTTP {status}"),
            });
        }
        if !status.is_success() {
            return Err(InferenceError::Unavailable {
                reason: format!("HTTP {status}"),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| InferenceError::MalformedResponse {
                detail: format!("response body is not JSON: {e}"),
            })?;

        let answer = extract_answer(&body)?;
        debug!(
            "{:?} call returned {} chars in {:?}",
            request.mode,
            answer.len(),
            start.elapsed()
        );
        Ok(answer)
    }
}
