// Prompt template for document analysis.

/// Instruction line placed ahead of the document text.
pub const ANALYSIS_INSTRUCTION: &str = "Analyze and summarize this document:";

/// Build the single-turn analysis prompt for `text`. Callers truncate first.
pub fn analysis_prompt(text: &str) -> String {
    format!("{ANALYSIS_INSTRUCTION}\n\n{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_text_after_blank_line() {
        assert_eq!(
            analysis_prompt("hello world"),
            "Analyze and summarize this document:\n\nhello world"
        );
    }

    #[test]
    fn prompt_keeps_text_verbatim() {
        let text = "  line one\n\tline two  ";
        assert!(analysis_prompt(text).ends_with(text));
    }
}
