// Gemini API streaming client using reqwest-eventsource.
//
// Sends a single-turn prompt to `models/{model}:streamGenerateContent` with
// `alt=sse` and parses each Server-Sent Event's JSON chunk into `LlmEvent`
// variants forwarded over an mpsc channel. Gemini has no explicit stop event:
// the server closing the stream is what completes a generation.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use textlens_core::config::Config;

use crate::protocol::LlmEvent;

// ---------------------------------------------------------------------------
// TextGenerator
// ---------------------------------------------------------------------------

/// Anything that can turn a prompt into a stream of [`LlmEvent`]s.
///
/// Implementations send zero or more `Token`s followed by exactly one
/// `Complete` or `Error`, and return once the stream is done or the receiver
/// is dropped. The `Result` is reserved for failures that could not be
/// reported over `tx`.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn stream_generate(&self, prompt: &str, tx: mpsc::Sender<LlmEvent>)
        -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// GeminiClient
// ---------------------------------------------------------------------------

/// Low-level Gemini streaming client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    /// Create a new client against `api_base` (e.g.
    /// `https://generativelanguage.googleapis.com/v1beta`).
    pub fn new(api_key: String, model: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_base,
        }
    }

    /// Build a client from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.credentials.google_api_key.clone(),
            config.llm.model.clone(),
            config.llm.api_base.clone(),
        )
    }

    /// Streaming endpoint for the configured model. Accepts model names with
    /// or without the `models/` prefix.
    pub fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!(
            "{}/models/{model}:streamGenerateContent?alt=sse",
            self.api_base.trim_end_matches('/')
        )
    }

    fn open_stream(&self, prompt: &str) -> Result<EventSource, String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }]
        });

        self.http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .eventsource()
            .map_err(|e| format!("Failed to create event source: {e}"))
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn stream_generate(
        &self,
        prompt: &str,
        tx: mpsc::Sender<LlmEvent>,
    ) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "API key not configured".to_string(),
                })
                .await;
            return Ok(());
        }

        let mut es = match self.open_stream(prompt) {
            Ok(es) => es,
            Err(message) => {
                let _ = tx.send(LlmEvent::Error { message }).await;
                return Ok(());
            }
        };

        let mut received_text = false;
        let mut input_tokens: u32 = 0;
        let mut output_tokens: u32 = 0;

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!(model = %self.model, "SSE connection opened");
                }
                Ok(Event::Message(msg)) => {
                    let data = &msg.data;

                    if let Some(message) = parse_error(data) {
                        warn!(%message, "Gemini reported an error mid-stream");
                        let _ = tx.send(LlmEvent::Error { message }).await;
                        es.close();
                        return Ok(());
                    }

                    if let Some((prompt_tokens, candidate_tokens)) = parse_usage(data) {
                        input_tokens = prompt_tokens;
                        output_tokens = candidate_tokens;
                    }

                    match parse_chunk_text(data) {
                        Some(text) if !text.is_empty() => {
                            received_text = true;
                            if tx.send(LlmEvent::Token { text }).await.is_err() {
                                // Receiver dropped, abort stream.
                                es.close();
                                return Ok(());
                            }
                        }
                        _ => debug!("SSE chunk carried no text"),
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!(input_tokens, output_tokens, "stream ended");
                    break;
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    let message = describe_error(err).await;
                    let _ = tx.send(LlmEvent::Error { message }).await;
                    return Ok(());
                }
            }
        }
        es.close();

        if !received_text {
            let _ = tx
                .send(LlmEvent::Error {
                    message: "Stream ended unexpectedly without any content".to_string(),
                })
                .await;
        } else {
            let _ = tx
                .send(LlmEvent::Complete {
                    input_tokens,
                    output_tokens,
                })
                .await;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Concatenate `candidates[0].content.parts[*].text` from a stream chunk.
///
/// Expected shape:
/// `{ "candidates": [{ "content": { "parts": [{ "text": "..." }], "role": "model" } }] }`
pub(crate) fn parse_chunk_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    let parts = v
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if texts.is_empty() {
        None
    } else {
        Some(texts.concat())
    }
}

/// Extract `(promptTokenCount, candidatesTokenCount)` from `usageMetadata`.
/// Either count defaults to 0 when only the other is present.
pub(crate) fn parse_usage(data: &str) -> Option<(u32, u32)> {
    let v: Value = serde_json::from_str(data).ok()?;
    let usage = v.get("usageMetadata")?;
    let count = |key: &str| {
        usage
            .get(key)
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .unwrap_or(0)
    };
    Some((count("promptTokenCount"), count("candidatesTokenCount")))
}

/// Extract an error carried in a chunk: either an `error.message` object or
/// a `promptFeedback.blockReason` refusal.
pub(crate) fn parse_error(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    if let Some(err) = v.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Some(match err.get("status").and_then(Value::as_str) {
            Some(status) => format!("{status}: {message}"),
            None => message.to_string(),
        });
    }
    v.get("promptFeedback")?
        .get("blockReason")?
        .as_str()
        .map(|reason| format!("Prompt blocked by the model: {reason}"))
}

/// Extract a human-readable error message from an SSE error. Error responses
/// from Gemini carry a JSON body, so the body is read when there is one.
async fn describe_error(err: reqwest_eventsource::Error) -> String {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            match parse_error(&body) {
                Some(detail) => format!("API returned status {status}: {detail}"),
                None => format!("API returned status {status}"),
            }
        }
        reqwest_eventsource::Error::Transport(e) => {
            format!("Network error: {e}")
        }
        other => format!("Stream error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
