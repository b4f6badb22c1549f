//! Gateway connector: consumes the chat relay's NDJSON stream and posts
//! replies back.
//!
//! The relay multiplexes every chat protocol behind two endpoints:
//! `GET /api/stream` emits one JSON message per line for as long as the
//! connection holds, and `POST /api/message` delivers an outbound message.
//! The connector reconnects forever; a dead relay only costs us the
//! messages sent while it was down.

use std::time::Duration;

use futures_util::StreamExt;
use perch_core::heartbeat::OutboundSink;
use perch_types::transport::{GatewayMessage, GatewayPost};
use secrecy::ExposeSecret;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::classify;
use crate::state::AppState;

/// Delay before re-dialing after a failed connection attempt.
const CONNECT_RETRY: Duration = Duration::from_secs(5);
/// Delay before re-dialing after the stream ends cleanly.
const STREAM_RETRY: Duration = Duration::from_secs(2);
/// Telegram drops the typing indicator after ~5s, so refresh it under that.
const TYPING_INTERVAL: Duration = Duration::from_secs(4);

/// Relay housekeeping event emitted on connect, never a user message.
const EVENT_API_CONNECTED: &str = "api_connected";

/// Posts outbound messages to the relay. Shared by the connector and the
/// heartbeat loop.
#[derive(Clone)]
pub struct GatewayPoster {
    http: reqwest::Client,
    url: String,
    bot_name: String,
    gateway: String,
}

impl GatewayPoster {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/api/message", state.gateway_url),
            bot_name: state.bot_name.clone(),
            gateway: state.app_name.clone(),
        }
    }

    /// Post one message to the relay under the bot's name.
    pub async fn post(&self, text: &str) -> Result<(), String> {
        let body = GatewayPost {
            text: text.to_string(),
            username: self.bot_name.clone(),
            gateway: self.gateway.clone(),
        };
        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("gateway post failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("gateway post returned {}", resp.status()));
        }
        Ok(())
    }
}

impl OutboundSink for GatewayPoster {
    async fn deliver(&self, text: &str) -> Result<(), String> {
        self.post(text).await
    }
}

/// Run the connector until cancelled: dial the relay's stream, process
/// messages, and reconnect on any failure.
pub async fn run(state: AppState, cancel: CancellationToken) {
    let http = reqwest::Client::new();
    let stream_url = format!("{}/api/stream", state.gateway_url);
    let poster = GatewayPoster::from_state(&state);

    loop {
        if cancel.is_cancelled() {
            return;
        }

        let resp = tokio::select! {
            () = cancel.cancelled() => return,
            r = http.get(&stream_url).send() => r,
        };

        match resp {
            Ok(resp) if resp.status().is_success() => {
                info!(url = %stream_url, "connected to gateway stream");
                read_stream(&state, &poster, resp, &cancel).await;
                if cancel.is_cancelled() {
                    return;
                }
                warn!("gateway stream ended, reconnecting");
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(STREAM_RETRY) => {}
                }
            }
            Ok(resp) => {
                warn!(status = %resp.status(), "gateway stream rejected, retrying");
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(CONNECT_RETRY) => {}
                }
            }
            Err(err) => {
                warn!(error = %err, "gateway unreachable, retrying");
                tokio::select! {
                    () = cancel.cancelled() => return,
                    () = tokio::time::sleep(CONNECT_RETRY) => {}
                }
            }
        }
    }
}

/// Consume one open stream connection line by line until it closes or the
/// connector is cancelled.
async fn read_stream(
    state: &AppState,
    poster: &GatewayPoster,
    resp: reqwest::Response,
    cancel: &CancellationToken,
) {
    let mut body = resp.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    loop {
        let chunk = tokio::select! {
            () = cancel.cancelled() => return,
            c = body.next() => c,
        };
        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(err)) => {
                warn!(error = %err, "gateway stream read failed");
                return;
            }
            None => return,
        };

        buf.extend_from_slice(&chunk);
        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buf.drain(..=pos).collect();
            handle_line(state, poster, &line[..line.len() - 1], cancel);
        }
    }
}

fn handle_line(state: &AppState, poster: &GatewayPoster, line: &[u8], cancel: &CancellationToken) {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return;
    }
    let msg: GatewayMessage = match serde_json::from_slice(line) {
        Ok(msg) => msg,
        Err(err) => {
            debug!(error = %err, "skipping malformed gateway line");
            return;
        }
    };

    if msg.event == EVENT_API_CONNECTED {
        info!("gateway reports api connected");
        return;
    }
    // Our own posts echo back through the stream.
    if msg.username == state.bot_name {
        return;
    }
    if msg.text.trim().is_empty() {
        return;
    }

    let state = state.clone();
    let poster = poster.clone();
    let cancel = cancel.clone();
    tokio::spawn(async move {
        handle_message(state, poster, msg, cancel).await;
    });
}

/// Run one inbound message through the turn pipeline and post the reply.
async fn handle_message(
    state: AppState,
    poster: GatewayPoster,
    msg: GatewayMessage,
    cancel: CancellationToken,
) {
    let principal = msg.principal_id().to_string();
    info!(
        principal,
        protocol = %msg.protocol,
        len = msg.text.len(),
        "gateway message received"
    );

    let typing = spawn_typing(&state, &msg, &cancel);

    let result = state.turns.handle(&principal, &msg.text).await;

    if let Some(typing) = typing {
        typing.cancel();
    }

    match result {
        Ok(result) => {
            if result.text.trim().is_empty() {
                debug!(principal, "agent produced no reply text");
                return;
            }
            if let Err(err) = poster.post(&result.text).await {
                error!(principal, error = %err, "failed to post reply");
            }
        }
        Err(err) => {
            let raw = err.to_string();
            match classify::friendly_error(&raw) {
                Some(friendly) => {
                    info!(principal, error = %raw, "turn failed, posting friendly error");
                    if let Err(err) = poster.post(&friendly).await {
                        error!(principal, error = %err, "failed to post friendly error");
                    }
                }
                None => error!(principal, error = %raw, "turn failed"),
            }
        }
    }
}

/// Keep a Telegram typing indicator alive while the turn runs. Returns the
/// token that stops the loop, or `None` when typing does not apply.
fn spawn_typing(
    state: &AppState,
    msg: &GatewayMessage,
    cancel: &CancellationToken,
) -> Option<CancellationToken> {
    let token = state.telegram_token.as_ref()?;
    if msg.protocol != "telegram" || msg.channel.is_empty() {
        return None;
    }

    let url = format!(
        "https://api.telegram.org/bot{}/sendChatAction",
        token.expose_secret()
    );
    let chat_id = msg.channel.clone();
    let http = reqwest::Client::new();
    let typing = cancel.child_token();
    let guard = typing.clone();

    tokio::spawn(async move {
        loop {
            // Indicator delivery is best effort.
            let _ = http
                .post(&url)
                .json(&serde_json::json!({ "chat_id": chat_id, "action": "typing" }))
                .send()
                .await;
            tokio::select! {
                () = guard.cancelled() => return,
                () = tokio::time::sleep(TYPING_INTERVAL) => {}
            }
        }
    });

    Some(typing)
}

// ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_message_parses_relay_line() {
        let line = br#"{"text":"hello","username":"sam","userid":"u1","channel":"42","protocol":"telegram","gateway":"perch"}"#;
        let msg: GatewayMessage = serde_json::from_slice(line).unwrap();
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.principal_id(), "u1");
    }

    #[test]
    fn test_api_connected_event_has_no_text() {
        let line = br#"{"event":"api_connected","gateway":"perch"}"#;
        let msg: GatewayMessage = serde_json::from_slice(line).unwrap();
        assert_eq!(msg.event, EVENT_API_CONNECTED);
        assert!(msg.text.is_empty());
    }
}
