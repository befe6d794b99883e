// Remote text generation: the Gemini streaming client, the `TextGenerator`
// seam it implements, the analysis prompt, and stream draining.

pub mod client;
pub mod drain;
pub mod prompt;
pub mod protocol;

pub use client::{GeminiClient, TextGenerator};
pub use drain::{generate_text, GenerationOutput, LlmError};
pub use protocol::LlmEvent;
