//! Message shapes for the gateway transport and the HTTP bridge.

use serde::{Deserialize, Serialize};

use crate::event::AgentEvent;

/// An inbound message from the gateway's newline-delimited JSON stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayMessage {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub userid: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub gateway: String,
}

impl GatewayMessage {
    /// The principal this message belongs to: userid, falling back to username.
    pub fn principal_id(&self) -> &str {
        if self.userid.is_empty() {
            &self.username
        } else {
            &self.userid
        }
    }
}

/// An outbound post to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPost {
    pub text: String,
    pub username: String,
    pub gateway: String,
}

/// Request body for `POST /message` on the HTTP bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub protocol: String,
}

impl BridgeRequest {
    /// Resolve the principal: user_id, then username, then "anonymous".
    pub fn principal_id(&self) -> &str {
        if !self.user_id.is_empty() {
            &self.user_id
        } else if !self.username.is_empty() {
            &self.username
        } else {
            "anonymous"
        }
    }
}

/// Response body from the HTTP bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<AgentEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
