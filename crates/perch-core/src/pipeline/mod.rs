//! The message pipeline: context enrichment, token estimation, compaction,
//! and the agent turn itself.

mod compactor;
mod estimator;
mod prompt;
mod turn;

pub use compactor::compact;
pub use estimator::estimate_tokens;
pub use prompt::{build_compaction_prompt, render_transcript};
pub use turn::{TurnService, HEARTBEAT_PREFIX};

/// Context-budget settings driving the compaction decision.
#[derive(Debug, Clone)]
pub struct CompactionConfig {
    /// The model's context window, in tokens.
    pub context_window_tokens: u64,
    /// Compact when the estimate exceeds this percentage of the window.
    pub threshold_percent: u8,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            context_window_tokens: 128_000,
            threshold_percent: 90,
        }
    }
}

impl CompactionConfig {
    /// The absolute token count above which compaction triggers.
    pub fn threshold_tokens(&self) -> u64 {
        self.context_window_tokens * u64::from(self.threshold_percent) / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_ninety_percent_of_128k() {
        assert_eq!(CompactionConfig::default().threshold_tokens(), 115_200);
    }
}
