//! AnthropicSummarizer -- `Summarizer` backed by the Anthropic Messages API.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use perch_core::summarize::Summarizer;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

/// Summaries are a single non-streaming completion.
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(120);

const MAX_TOKENS: u32 = 4096;

pub struct AnthropicSummarizer {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

impl AnthropicSummarizer {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    pub fn new(api_key: SecretString, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(SUMMARY_TIMEOUT)
            .build()
            .expect("failed to create reqwest client");

        Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }
}

impl Summarizer for AnthropicSummarizer {
    async fn summarize(&self, prompt: &str) -> Result<String, String> {
        let payload = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| format!("summarizer request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("summarizer HTTP {status}: {body}"));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| format!("summarizer response parse failed: {e}"))?;
        let text = parsed
            .content
            .first()
            .map(|block| block.text.clone())
            .unwrap_or_default();
        if text.is_empty() {
            return Err("summarizer returned no text".to_string());
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shape_parses() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[{"type":"text","text":"the summary"}],"model":"m"}"#,
        )
        .unwrap();
        assert_eq!(parsed.content[0].text, "the summary");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let sum = AnthropicSummarizer::new(
            SecretString::from("sk-test"),
            "https://api.anthropic.com/",
            "claude-sonnet-4-20250514",
        );
        assert_eq!(sum.base_url, "https://api.anthropic.com");
    }
}
