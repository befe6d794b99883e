// Request handlers behind the Analyze and Clear buttons.
//
// Each handler is an independent request/response function. All failures of
// the analyze path collapse into one textual error channel: the error string
// takes the place of the result and the word count is left blank.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use textlens_core::reader;
use textlens_llm::prompt::analysis_prompt;
use textlens_llm::{generate_text, LlmError, TextGenerator};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Input is cut to this many characters before it reaches the model.
pub const MAX_INPUT_CHARS: usize = 2000;

/// Prefix of every error shown in the result field.
pub const ERROR_PREFIX: &str = "\u{26a0} Error: ";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where file input comes from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// An uploaded file, already in memory.
    Upload { name: String, bytes: Vec<u8> },
}

impl FileSource {
    /// Short description for logs.
    fn describe(&self) -> String {
        match self {
            FileSource::Path(path) => format!("path {}", path.display()),
            FileSource::Upload { name, bytes } => format!("upload {name} ({} bytes)", bytes.len()),
        }
    }

    /// Decoded text content. Unreadable paths yield the reader's error string
    /// instead of failing.
    async fn read_text(self) -> Result<String, AnalysisError> {
        match self {
            FileSource::Path(path) => {
                tokio::task::spawn_blocking(move || reader::read_file_with_encoding(&path))
                    .await
                    .map_err(|e| AnalysisError::Task(e.to_string()))
            }
            FileSource::Upload { bytes, .. } => Ok(reader::decode_bytes(&bytes).text),
        }
    }
}

/// Fields submitted with the Analyze button.
#[derive(Debug, Clone, Default)]
pub struct AnalysisRequest {
    pub text: Option<String>,
    pub file: Option<FileSource>,
}

/// What the page shows after an analysis: the result text and the word-count
/// label. On failure `result` holds the error and `word_count` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisOutcome {
    pub result: String,
    pub word_count: String,
}

impl AnalysisOutcome {
    /// Error shown in place of the result, with a blank word count.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            result: format!("{ERROR_PREFIX}{message}"),
            word_count: String::new(),
        }
    }
}

/// The blank state every visible field is reset to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClearedFields {
    pub text: String,
    pub file: Option<String>,
    pub result: String,
    pub word_count: String,
    pub download: Option<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Please enter text or upload a file.")]
    EmptyInput,

    #[error("file read task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The first `max` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Number of whitespace-separated tokens.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn word_count_label(count: usize) -> String {
    format!("\u{1f4ca} Word Count: {count}")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Analyze the submitted text or file with `generator`.
///
/// A file, when present, supersedes the text box. Blank text with no file is
/// rejected before any remote call. The word count is taken over the
/// truncated input, not over the model's output.
pub async fn analyze_input(
    generator: &dyn TextGenerator,
    request: AnalysisRequest,
) -> AnalysisOutcome {
    match run_analysis(generator, request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "analysis failed");
            AnalysisOutcome::error(e)
        }
    }
}

async fn run_analysis(
    generator: &dyn TextGenerator,
    request: AnalysisRequest,
) -> Result<AnalysisOutcome, AnalysisError> {
    let (source, text) = match request.file {
        Some(file) => (file.describe(), file.read_text().await?),
        None => {
            let text = request.text.unwrap_or_default();
            if text.trim().is_empty() {
                return Err(AnalysisError::EmptyInput);
            }
            ("text box".to_string(), text)
        }
    };

    let input = truncate_chars(&text, MAX_INPUT_CHARS);
    let word_count = count_words(input);
    info!(
        %source,
        chars = input.chars().count(),
        truncated = input.len() < text.len(),
        word_count,
        "submitting analysis"
    );

    let output = generate_text(generator, &analysis_prompt(input)).await?;
    info!(
        input_tokens = output.input_tokens,
        output_tokens = output.output_tokens,
        result_chars = output.text.chars().count(),
        "analysis complete"
    );

    Ok(AnalysisOutcome {
        result: output.text,
        word_count: word_count_label(word_count),
    })
}

/// Reset every field: text, file, result, word count, download.
pub fn clear_inputs() -> ClearedFields {
    ClearedFields {
        text: String::new(),
        file: None,
        result: String::new(),
        word_count: String::new(),
        download: None,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
