//! LLM-backed services.

mod summarizer;

pub use summarizer::AnthropicSummarizer;
