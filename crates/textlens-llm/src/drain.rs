// Eager stream draining: run a `TextGenerator` and flatten its events into a
// single string before returning.

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::TextGenerator;
use crate::protocol::LlmEvent;

/// Buffer between a generator and the drain loop.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The service (or the client talking to it) reported a failure.
    #[error("{0}")]
    Remote(String),

    /// The stream closed before a `Complete` event.
    #[error("generation ended without a response")]
    Incomplete,

    #[error(transparent)]
    Generator(#[from] anyhow::Error),
}

/// A fully drained generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutput {
    /// All `Token` fragments concatenated in arrival order.
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Run `generator` on `prompt` and collect its stream.
///
/// The generator and the drain loop run concurrently on the current task.
/// The first `Error` event wins even if tokens arrived before it. A stream
/// that closes before `Complete`, or a generator that returns `Err`, fails the
/// whole generation; there is no partial-result recovery.
pub async fn generate_text(
    generator: &dyn TextGenerator,
    prompt: &str,
) -> Result<GenerationOutput, LlmError> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let (produced, collected) =
        tokio::join!(generator.stream_generate(prompt, tx), drain_events(rx));

    // An event-level error is more specific than whatever the generator
    // returned after the receiver went away.
    match (collected, produced) {
        (Err(LlmError::Remote(message)), _) => Err(LlmError::Remote(message)),
        (_, Err(e)) => Err(LlmError::Generator(e)),
        (collected, Ok(())) => collected,
    }
}

/// Consume events until `Complete`, `Error`, or channel close. Takes the
/// receiver by value so it is dropped as soon as the outcome is known.
async fn drain_events(mut rx: mpsc::Receiver<LlmEvent>) -> Result<GenerationOutput, LlmError> {
    let mut text = String::new();

    while let Some(event) = rx.recv().await {
        match event {
            LlmEvent::Token { text: fragment } => text.push_str(&fragment),
            LlmEvent::Complete {
                input_tokens,
                output_tokens,
            } => {
                return Ok(GenerationOutput {
                    text,
                    input_tokens,
                    output_tokens,
                })
            }
            LlmEvent::Error { message } => return Err(LlmError::Remote(message)),
        }
    }

    if !text.is_empty() {
        debug!(chars = text.len(), "stream closed before completion, dropping partial text");
    }
    Err(LlmError::Incomplete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Replays a fixed event script.
    struct Scripted(Vec<LlmEvent>);

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn stream_generate(
            &self,
            _prompt: &str,
            tx: mpsc::Sender<LlmEvent>,
        ) -> anyhow::Result<()> {
            for event in &self.0 {
                if tx.send(event.clone()).await.is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextGenerator for Failing {
        async fn stream_generate(
            &self,
            _prompt: &str,
            _tx: mpsc::Sender<LlmEvent>,
        ) -> anyhow::Result<()> {
            anyhow::bail!("transport exploded")
        }
    }

    fn token(text: &str) -> LlmEvent {
        LlmEvent::Token { text: text.into() }
    }

    #[tokio::test]
    async fn tokens_concatenate_in_order() {
        let generator = Scripted(vec![
            token("The "),
            token("document "),
            token("is short."),
            LlmEvent::Complete {
                input_tokens: 12,
                output_tokens: 4,
            },
        ]);

        let out = generate_text(&generator, "p").await.unwrap();
        assert_eq!(
            out,
            GenerationOutput {
                text: "The document is short.".into(),
                input_tokens: 12,
                output_tokens: 4,
            }
        );
    }

    #[tokio::test]
    async fn error_event_discards_partial_text() {
        let generator = Scripted(vec![
            token("partial"),
            LlmEvent::Error {
                message: "quota exceeded".into(),
            },
        ]);

        let err = generate_text(&generator, "p").await.unwrap_err();
        assert!(matches!(err, LlmError::Remote(ref m) if m == "quota exceeded"));
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn events_after_terminal_event_are_ignored() {
        let generator = Scripted(vec![
            token("done"),
            LlmEvent::Complete {
                input_tokens: 0,
                output_tokens: 0,
            },
            token(" and more"),
        ]);

        let out = generate_text(&generator, "p").await.unwrap();
        assert_eq!(out.text, "done");
    }

    #[tokio::test]
    async fn long_script_does_not_deadlock() {
        let mut script: Vec<LlmEvent> = (0..EVENT_BUFFER * 4).map(|_| token("x")).collect();
        script.push(LlmEvent::Complete {
            input_tokens: 1,
            output_tokens: 2,
        });

        let out = generate_text(&Scripted(script), "p").await.unwrap();
        assert_eq!(out.text.len(), EVENT_BUFFER * 4);
    }

    /// Streams a token, then fails the way a dropped connection does.
    struct TokenThenFail;

    #[async_trait]
    impl TextGenerator for TokenThenFail {
        async fn stream_generate(
            &self,
            _prompt: &str,
            tx: mpsc::Sender<LlmEvent>,
        ) -> anyhow::Result<()> {
            let _ = tx.send(token("partial")).await;
            anyhow::bail!("connection reset mid-stream")
        }
    }

    #[tokio::test]
    async fn failure_after_tokens_is_not_a_result() {
        let err = generate_text(&TokenThenFail, "p").await.unwrap_err();
        assert!(matches!(err, LlmError::Generator(_)));
        assert_eq!(err.to_string(), "connection reset mid-stream");
    }

    #[tokio::test]
    async fn close_without_completion_is_incomplete() {
        let err = generate_text(&Scripted(vec![token("abc")]), "p")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Incomplete));
    }

    #[tokio::test]
    async fn close_without_anything_is_incomplete() {
        let err = generate_text(&Scripted(vec![]), "p").await.unwrap_err();
        assert!(matches!(err, LlmError::Incomplete));
    }

    #[tokio::test]
    async fn generator_failure_is_reported() {
        let err = generate_text(&Failing, "p").await.unwrap_err();
        assert!(matches!(err, LlmError::Generator(_)));
        assert_eq!(err.to_string(), "transport exploded");
    }
}
