//! Agent event types and the upstream wire envelope.
//!
//! The upstream execution service streams `data: {json}` lines whose payload
//! is an [`EventEnvelope`]: an author plus a list of content parts. Each part
//! is one of a text chunk, a function call, or a function response. The
//! stream parser maps parts onto [`AgentEvent`]s, the flat tagged union that
//! transport adapters and the bridge API expose downstream.
//!
//! Parts decode as an explicit sum type rather than free-form JSON walking:
//! a shape the decoder does not recognize lands in [`Part::Other`] and is
//! warn-logged, so schema drift shows up in logs and tests instead of being
//! silently skipped.

use serde::{Deserialize, Serialize};

/// A structured event parsed from the upstream stream.
///
/// Serialized with a `type` tag of `text`, `tool_call`, or `tool_result`,
/// matching the contract the platform UI consumes from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A text chunk emitted by the agent.
    Text { author: String, text: String },

    /// The agent invoked a tool.
    ToolCall {
        author: String,
        tool_name: String,
        tool_id: String,
        tool_args: serde_json::Value,
    },

    /// A tool returned a result to the agent.
    ToolResult {
        author: String,
        tool_name: String,
        tool_id: String,
        result: serde_json::Value,
    },
}

impl AgentEvent {
    /// The author of this event.
    pub fn author(&self) -> &str {
        match self {
            AgentEvent::Text { author, .. } => author,
            AgentEvent::ToolCall { author, .. } => author,
            AgentEvent::ToolResult { author, .. } => author,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire envelope
// ---------------------------------------------------------------------------

/// One event payload from the upstream stream or a stored session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Which agent produced the event. Empty for some system events.
    #[serde(default)]
    pub author: String,
    /// The structured content of the event.
    #[serde(default)]
    pub content: Option<EventContent>,
}

/// The content block of an event envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContent {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part within an event.
///
/// Decoded untagged: the upstream distinguishes parts by which field is
/// present, not by a discriminator. Order matters -- more specific shapes
/// are tried first, and anything unrecognized falls through to `Other`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    FunctionCall {
        #[serde(rename = "functionCall")]
        function_call: FunctionCall,
    },
    FunctionResponse {
        #[serde(rename = "functionResponse")]
        function_response: FunctionResponse,
    },
    Text { text: String },
    Other(serde_json::Value),
}

/// A tool invocation embedded in an event part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// A tool result embedded in an event part.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub response: serde_json::Value,
}

impl Part {
    /// The text of this part, if it is a text part.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Character weight of this part for token estimation.
    ///
    /// Text parts count their characters; everything else counts the size
    /// of its JSON serialization, mirroring how the upstream stores them.
    pub fn estimation_chars(&self) -> usize {
        match self {
            Part::Text { text } => text.chars().count(),
            other => serde_json::to_string(other).map(|s| s.len()).unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_event_serde_tags() {
        let event = AgentEvent::Text {
            author: "perch".to_string(),
            text: "hello".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "text");

        let event = AgentEvent::ToolCall {
            author: "perch".to_string(),
            tool_name: "search".to_string(),
            tool_id: "call_1".to_string(),
            tool_args: serde_json::json!({"q": "rust"}),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_call");
        assert_eq!(json["tool_name"], "search");

        let event = AgentEvent::ToolResult {
            author: "perch".to_string(),
            tool_name: "search".to_string(),
            tool_id: "call_1".to_string(),
            result: serde_json::json!("hit"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "tool_result");
    }

    #[test]
    fn test_part_decodes_text() {
        let part: Part = serde_json::from_str(r#"{"text":"hello world"}"#).unwrap();
        assert_eq!(part.as_text(), Some("hello world"));
    }

    #[test]
    fn test_part_decodes_function_call() {
        let part: Part = serde_json::from_str(
            r#"{"functionCall":{"id":"c1","name":"search","args":{"q":"bch"}}}"#,
        )
        .unwrap();
        match part {
            Part::FunctionCall { function_call } => {
                assert_eq!(function_call.name, "search");
                assert_eq!(function_call.args["q"], "bch");
            }
            other => panic!("expected FunctionCall, got {other:?}"),
        }
    }

    #[test]
    fn test_part_decodes_function_response() {
        let part: Part = serde_json::from_str(
            r#"{"functionResponse":{"id":"c1","name":"search","response":{"ok":true}}}"#,
        )
        .unwrap();
        match part {
            Part::FunctionResponse { function_response } => {
                assert_eq!(function_response.name, "search");
            }
            other => panic!("expected FunctionResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_part_shape_is_not_silently_dropped() {
        // Unknown shapes must decode to Other so the parser can surface them.
        let part: Part = serde_json::from_str(r#"{"inlineData":{"mimeType":"image/png"}}"#).unwrap();
        assert!(matches!(part, Part::Other(_)));
    }

    #[test]
    fn test_estimation_chars_text_vs_other() {
        let text: Part = serde_json::from_str(r#"{"text":"abcd"}"#).unwrap();
        assert_eq!(text.estimation_chars(), 4);

        let call: Part = serde_json::from_str(
            r#"{"functionCall":{"id":"c1","name":"search","args":{}}}"#,
        )
        .unwrap();
        // Non-text parts count their serialized size, which is never zero.
        assert!(call.estimation_chars() > 10);
    }

    #[test]
    fn test_envelope_tolerates_missing_content() {
        let envelope: EventEnvelope = serde_json::from_str(r#"{"author":"perch"}"#).unwrap();
        assert!(envelope.content.is_none());
    }
}
