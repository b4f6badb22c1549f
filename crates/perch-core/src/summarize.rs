//! Summarizer trait definition.

/// A text summarizer backed by an LLM.
///
/// Implementations live in perch-infra (e.g., AnthropicSummarizer). The
/// compactor feeds it a structured prompt and expects plain text back.
pub trait Summarizer: Send + Sync {
    /// Produce a summary for the given prompt. Errors are surfaced as a
    /// plain string since the caller only logs and aborts compaction.
    fn summarize(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, String>> + Send;
}
