//! Summary prompt construction

/// Fixed instruction template for one-shot article summarization.
const SUMMARY_INSTRUCTION: &str = "You are a Wikipedia editing assistant. \
Read the opening section of the article below and summarize the whole \
article accurately and concisely in 3-4 sentences.";

/// Build the summarization prompt, embedding `context` verbatim.
///
/// No escaping is applied: the `---` delimiters may legitimately appear
/// inside `context`, and the model tolerates that. Callers validate that
/// `context` is non-empty before reaching this.
pub fn build_summary_prompt(context: &str) -> String {
    format!("{}\n\n---\n{}\n---", SUMMARY_INSTRUCTION, context)
}
