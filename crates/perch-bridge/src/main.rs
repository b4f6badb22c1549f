//! Perch bridge entry point.
//!
//! Binary name: `perch`
//!
//! Parses configuration from flags and environment, initializes the memory
//! database and upstream client, then runs three loops until shutdown: the
//! gateway connector, the heartbeat scheduler, and the HTTP bridge.

mod classify;
mod gateway;
mod http;
mod state;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use perch_core::heartbeat::{run_heartbeat, HeartbeatConfig};
use perch_infra::config::{
    PerchConfig, DEFAULT_ANTHROPIC_BASE, DEFAULT_ANTHROPIC_MODEL, DEFAULT_APP_NAME,
    DEFAULT_BRIDGE_ADDR, DEFAULT_GATEWAY_URL, DEFAULT_UPSTREAM_URL,
};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use state::AppState;

#[derive(Parser)]
#[command(name = "perch", about = "Session middleware bridge between chat gateways and an agent engine")]
struct Args {
    /// Base URL of the upstream agent engine.
    #[arg(long, env = "PERCH_UPSTREAM_URL", default_value = DEFAULT_UPSTREAM_URL)]
    upstream_url: String,

    /// Agent app name registered with the engine.
    #[arg(long, env = "PERCH_APP_NAME", default_value = DEFAULT_APP_NAME)]
    app_name: String,

    /// Base URL of the chat gateway.
    #[arg(long, env = "PERCH_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    gateway_url: String,

    /// Username this bridge posts under (its own messages are skipped).
    #[arg(long, env = "PERCH_BOT_NAME", default_value = "perch")]
    bot_name: String,

    /// Listen address for the HTTP bridge.
    #[arg(long, env = "PERCH_BRIDGE_ADDR", default_value = DEFAULT_BRIDGE_ADDR)]
    bridge_addr: String,

    /// Heartbeat interval (e.g. 15m, 1h30m). 0 disables.
    #[arg(long, env = "PERCH_HEARTBEAT_INTERVAL", default_value = "15m")]
    heartbeat_interval: String,

    /// Data directory for the memory database. Defaults to ~/.perch.
    #[arg(long, env = "PERCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Model context window used for the compaction threshold.
    #[arg(long, env = "PERCH_CONTEXT_WINDOW_TOKENS", default_value_t = 128_000)]
    context_window_tokens: u64,

    /// Compact when the token estimate exceeds this percent of the window.
    #[arg(long, env = "PERCH_COMPACTION_THRESHOLD_PERCENT", default_value_t = 90)]
    compaction_threshold_percent: u8,

    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    anthropic_api_key: Option<String>,

    #[arg(long, env = "ANTHROPIC_API_BASE", default_value = DEFAULT_ANTHROPIC_BASE)]
    anthropic_api_base: String,

    #[arg(long, env = "ANTHROPIC_MODEL", default_value = DEFAULT_ANTHROPIC_MODEL)]
    anthropic_model: String,

    /// Telegram bot token used for typing indicators.
    #[arg(long, env = "TELEGRAM_BOT", hide_env_values = true)]
    telegram_token: Option<String>,

    /// Export spans via OpenTelemetry in addition to structured logs.
    #[arg(long)]
    otel: bool,
}

/// Fallback when the configured heartbeat interval does not parse.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15 * 60);

impl Args {
    fn into_config(self) -> PerchConfig {
        let heartbeat_interval = match parse_interval(&self.heartbeat_interval) {
            Some(interval) => interval,
            None => {
                warn!(
                    value = %self.heartbeat_interval,
                    "invalid heartbeat interval, using 15m"
                );
                DEFAULT_HEARTBEAT_INTERVAL
            }
        };
        let data_dir = match self.data_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .map(|home| home.join(".perch"))
                .unwrap_or_else(|| PathBuf::from(".perch")),
        };
        PerchConfig {
            upstream_url: self.upstream_url,
            app_name: self.app_name,
            gateway_url: self.gateway_url,
            bot_name: self.bot_name,
            bridge_addr: self.bridge_addr,
            heartbeat_interval,
            data_dir,
            context_window_tokens: self.context_window_tokens,
            compaction_threshold_percent: self.compaction_threshold_percent,
            anthropic_api_key: self.anthropic_api_key.map(SecretString::from),
            anthropic_api_base: self.anthropic_api_base,
            anthropic_model: self.anthropic_model,
            telegram_token: self.telegram_token.map(SecretString::from),
        }
    }
}

/// Parse an operator-supplied interval. `0` (with or without a unit)
/// disables the heartbeat; other values are taken as-is, unclamped.
fn parse_interval(text: &str) -> Option<Duration> {
    if text == "0" {
        return Some(Duration::ZERO);
    }
    perch_core::heartbeat::directive::parse_duration(text)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    perch_observe::tracing_setup::init_tracing(args.otel)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let config = args.into_config();
    let bridge_addr = config.bridge_addr.clone();
    let heartbeat = HeartbeatConfig {
        interval: config.heartbeat_interval,
    };

    let state = AppState::init(config).await?;
    info!(
        upstream = %state.upstream_url,
        gateway = %state.gateway_url,
        bot = %state.bot_name,
        "perch bridge starting"
    );

    let cancel = CancellationToken::new();

    let gateway_task = tokio::spawn(gateway::run(state.clone(), cancel.clone()));
    let heartbeat_task = tokio::spawn(run_heartbeat(
        state.turns.clone(),
        state.agent.clone(),
        heartbeat,
        gateway::GatewayPoster::from_state(&state),
        cancel.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&bridge_addr)
        .await
        .with_context(|| format!("failed to bind {bridge_addr}"))?;
    info!(addr = %bridge_addr, "http bridge listening");

    let shutdown = cancel.clone();
    let server = axum::serve(listener, http::build_router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await });

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                error!(error = %err, "http bridge failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    cancel.cancel();
    let _ = gateway_task.await;
    let _ = heartbeat_task.await;
    perch_observe::tracing_setup::shutdown_tracing();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interval_zero_disables() {
        assert_eq!(parse_interval("0"), Some(Duration::ZERO));
        assert_eq!(parse_interval("0s"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_interval_forms() {
        assert_eq!(parse_interval("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_interval("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_interval("soon"), None);
    }

    #[test]
    fn test_invalid_interval_falls_back_to_default() {
        let args = Args::parse_from(["perch", "--heartbeat-interval", "whenever"]);
        let config = args.into_config();
        assert_eq!(config.heartbeat_interval, DEFAULT_HEARTBEAT_INTERVAL);
    }
}
