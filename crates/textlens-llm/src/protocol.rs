// Events emitted by a `TextGenerator` while a response streams in.

/// One step of a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmEvent {
    /// A text fragment, in arrival order.
    Token { text: String },
    /// The stream finished normally. Token counts are whatever the service
    /// reported (0 when it reported nothing).
    Complete { input_tokens: u32, output_tokens: u32 },
    /// The generation failed; no further events follow.
    Error { message: String },
}
