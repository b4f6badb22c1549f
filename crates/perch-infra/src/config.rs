//! Runtime configuration.
//!
//! The bridge binary parses environment variables via clap and hands the
//! values here; this module owns the derived pieces (database URL, compaction
//! settings, summarizer construction) so they stay testable without touching
//! the process environment.

use std::path::PathBuf;
use std::time::Duration;

use perch_core::pipeline::CompactionConfig;
use secrecy::SecretString;
use tracing::warn;

use crate::llm::AnthropicSummarizer;

pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_GATEWAY_URL: &str = "http://localhost:4242";
pub const DEFAULT_BRIDGE_ADDR: &str = "0.0.0.0:8081";
pub const DEFAULT_APP_NAME: &str = "perch";
pub const DEFAULT_ANTHROPIC_BASE: &str = "https://api.anthropic.com";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Fully resolved configuration for one bridge process.
pub struct PerchConfig {
    pub upstream_url: String,
    pub app_name: String,
    pub gateway_url: String,
    pub bot_name: String,
    pub bridge_addr: String,
    pub heartbeat_interval: Duration,
    pub data_dir: PathBuf,
    pub context_window_tokens: u64,
    pub compaction_threshold_percent: u8,
    pub anthropic_api_key: Option<SecretString>,
    pub anthropic_api_base: String,
    pub anthropic_model: String,
    /// Telegram bot token for typing indicators. Optional; without it the
    /// typing loop is a no-op.
    pub telegram_token: Option<SecretString>,
}

impl PerchConfig {
    /// SQLite URL for the memory database under the data directory.
    pub fn database_url(&self) -> String {
        format!(
            "sqlite://{}?mode=rwc",
            self.data_dir.join("perch.db").display()
        )
    }

    pub fn compaction(&self) -> CompactionConfig {
        CompactionConfig {
            context_window_tokens: self.context_window_tokens,
            threshold_percent: self.compaction_threshold_percent,
        }
    }

    /// Build the summarizer when credentials are present. Without a key,
    /// compaction stays off and everything else keeps working.
    pub fn summarizer(&self) -> Option<AnthropicSummarizer> {
        let Some(key) = &self.anthropic_api_key else {
            warn!("ANTHROPIC_API_KEY not set, compaction disabled");
            return None;
        };
        Some(AnthropicSummarizer::new(
            key.clone(),
            self.anthropic_api_base.clone(),
            self.anthropic_model.clone(),
        ))
    }
}
