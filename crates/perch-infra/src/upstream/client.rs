//! reqwest-based implementation of `AgentService`.

use std::time::Duration;

use perch_core::upstream::{AgentService, AgentTurn, EventSink};
use perch_types::error::UpstreamError;
use perch_types::event::EventEnvelope;
use perch_types::session::Session;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::stream::collect_turn;

/// Agent runs can stream for minutes on tool-heavy turns.
const RUN_TIMEOUT: Duration = Duration::from_secs(300);

/// Health probes must answer fast or not at all.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for the upstream agent engine's session and run APIs.
pub struct HttpAgentService {
    http: reqwest::Client,
    base_url: String,
    app_name: String,
}

#[derive(Deserialize)]
struct SessionDetail {
    #[serde(default)]
    events: Vec<EventEnvelope>,
}

impl HttpAgentService {
    pub fn new(base_url: impl Into<String>, app_name: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(RUN_TIMEOUT)
                .build()
                .expect("failed to create reqwest client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_name: app_name.into(),
        }
    }

    fn sessions_url(&self, principal_id: &str) -> String {
        format!(
            "{}/api/apps/{}/users/{}/sessions",
            self.base_url, self.app_name, principal_id
        )
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(UpstreamError::NotFound);
        }
        let body = response.text().await.unwrap_or_default();
        Err(UpstreamError::Http {
            status: status.as_u16(),
            body,
        })
    }
}

impl AgentService for HttpAgentService {
    async fn list_sessions(&self, principal_id: &str) -> Result<Vec<Session>, UpstreamError> {
        let response = self
            .http
            .get(self.sessions_url(principal_id))
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))
    }

    async fn create_session(&self, principal_id: &str) -> Result<Session, UpstreamError> {
        let response = self
            .http
            .post(self.sessions_url(principal_id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body("{}")
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))
    }

    async fn delete_session(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> Result<(), UpstreamError> {
        let url = format!("{}/{}", self.sessions_url(principal_id), session_id);
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        match Self::check(response).await {
            // Already gone is as deleted as it gets.
            Ok(_) | Err(UpstreamError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn session_events(
        &self,
        principal_id: &str,
        session_id: &str,
    ) -> Result<Vec<EventEnvelope>, UpstreamError> {
        let url = format!("{}/{}", self.sessions_url(principal_id), session_id);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let detail: SessionDetail = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(detail.events)
    }

    async fn run(
        &self,
        principal_id: &str,
        session_id: &str,
        text: &str,
        on_event: Option<EventSink>,
    ) -> Result<AgentTurn, UpstreamError> {
        let payload = json!({
            "appName": self.app_name,
            "userId": principal_id,
            "sessionId": session_id,
            "newMessage": {
                "role": "user",
                "parts": [{ "text": text }],
            },
        });

        let response = self
            .http
            .post(format!("{}/api/run_sse", self.base_url))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&payload)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        let response = Self::check(response).await?;

        collect_turn(response.bytes_stream(), on_event).await
    }

    async fn healthy(&self) -> bool {
        let probe = self
            .http
            .get(format!("{}/api/list-apps", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await;
        match probe {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(error = %err, "engine health probe failed");
                false
            }
        }
    }
}
