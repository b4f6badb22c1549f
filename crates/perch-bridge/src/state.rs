//! Application state wiring all services together.
//!
//! The turn service is generic over the agent, session store, summarizer,
//! and memory store traits; AppState pins them to the concrete infra
//! implementations.

use std::sync::Arc;

use perch_core::memory::context::TaskListSource;
use perch_core::pipeline::TurnService;
use perch_core::session::InMemorySessionStore;
use perch_infra::config::PerchConfig;
use perch_infra::llm::AnthropicSummarizer;
use perch_infra::sqlite::{DatabasePool, SqliteMemoryStore};
use perch_infra::upstream::HttpAgentService;
use secrecy::SecretString;

/// Concrete type alias for the turn service pinned to infra implementations.
pub type ConcreteTurnService =
    TurnService<HttpAgentService, InMemorySessionStore, AnthropicSummarizer, SqliteMemoryStore>;

/// Shared state for the gateway connector, heartbeat, and HTTP bridge.
#[derive(Clone)]
pub struct AppState {
    pub turns: Arc<ConcreteTurnService>,
    pub agent: Arc<HttpAgentService>,
    pub upstream_url: String,
    pub gateway_url: String,
    pub app_name: String,
    pub bot_name: String,
    pub telegram_token: Option<SecretString>,
}

impl AppState {
    /// Initialize the application state: create the data directory, open the
    /// memory database, and wire the pipeline.
    pub async fn init(config: PerchConfig) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let pool = DatabasePool::new(&config.database_url()).await?;
        let memory = SqliteMemoryStore::new(pool);

        let agent = Arc::new(HttpAgentService::new(
            config.upstream_url.clone(),
            config.app_name.clone(),
        ));

        // Heartbeat ticks carry the operator-maintained task list when the
        // file exists.
        let tasks_path = config.data_dir.join("TASKS.md");
        let tasks: TaskListSource = Arc::new(move || {
            std::fs::read_to_string(&tasks_path)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        });

        let turns = Arc::new(TurnService::new(
            Arc::clone(&agent),
            InMemorySessionStore::new(),
            config.summarizer(),
            memory,
            config.compaction(),
            Some(tasks),
        ));

        Ok(Self {
            turns,
            agent,
            upstream_url: config.upstream_url,
            gateway_url: config.gateway_url,
            app_name: config.app_name,
            bot_name: config.bot_name,
            telegram_token: config.telegram_token,
        })
    }
}
