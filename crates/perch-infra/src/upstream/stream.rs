//! Event-stream parsing for agent runs.
//!
//! The engine answers `/api/run_sse` with server-sent `data:` lines, but the
//! stream is not pure SSE: a fatal failure surfaces as a bare
//! `Error while running agent:` line in the middle of the body. Lines are
//! framed by hand over the raw byte stream so that line is seen, and so a
//! single multi-megabyte `data:` payload survives intact.

use futures_util::{Stream, StreamExt};
use perch_core::upstream::{AgentTurn, EventSink};
use perch_types::error::UpstreamError;
use perch_types::event::{AgentEvent, EventEnvelope, Part};

const DATA_PREFIX: &str = "data: ";
const FATAL_PREFIX: &str = "Error while running agent:";

/// Accumulates an agent turn from stream lines. The last non-empty text
/// part wins as the final reply.
#[derive(Default)]
pub(crate) struct TurnCollector {
    last_text: String,
    events: Vec<AgentEvent>,
}

impl TurnCollector {
    /// Consume one line of the response body.
    pub(crate) fn push_line(
        &mut self,
        line: &str,
        sink: &mut Option<EventSink>,
    ) -> Result<(), UpstreamError> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.starts_with(FATAL_PREFIX) {
            return Err(UpstreamError::Fatal(line.to_string()));
        }
        let Some(data) = line.strip_prefix(DATA_PREFIX) else {
            return Ok(());
        };
        // Malformed frames are skipped, not fatal.
        let Ok(envelope) = serde_json::from_str::<EventEnvelope>(data) else {
            return Ok(());
        };

        for event in envelope_events(&envelope) {
            if let AgentEvent::Text { text, .. } = &event
                && !text.is_empty()
            {
                self.last_text = text.clone();
            }
            if let Some(sink) = sink {
                sink(&event);
            }
            self.events.push(event);
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> AgentTurn {
        AgentTurn {
            text: self.last_text,
            events: self.events,
        }
    }

    fn has_text(&self) -> bool {
        !self.last_text.is_empty()
    }
}

/// Flatten a wire envelope into structured events.
fn envelope_events(envelope: &EventEnvelope) -> Vec<AgentEvent> {
    let Some(content) = &envelope.content else {
        return vec![];
    };
    let author = &envelope.author;
    content
        .parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } => Some(AgentEvent::Text {
                author: author.clone(),
                text: text.clone(),
            }),
            Part::FunctionCall { function_call } => Some(AgentEvent::ToolCall {
                author: author.clone(),
                tool_name: function_call.name.clone(),
                tool_id: function_call.id.clone(),
                tool_args: function_call.args.clone(),
            }),
            Part::FunctionResponse { function_response } => Some(AgentEvent::ToolResult {
                author: author.clone(),
                tool_name: function_response.name.clone(),
                tool_id: function_response.id.clone(),
                result: function_response.response.clone(),
            }),
            Part::Other(value) => {
                tracing::warn!(part = %value, "unrecognized event part shape, skipping");
                None
            }
        })
        .collect()
}

/// Drive a [`TurnCollector`] over a chunked byte stream.
///
/// A transport error after some text has arrived yields the partial turn;
/// the engine sometimes drops the connection right after the final frame.
pub(crate) async fn collect_turn<S, B, E>(
    body: S,
    mut sink: Option<EventSink>,
) -> Result<AgentTurn, UpstreamError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut collector = TurnCollector::default();
    let mut buffer = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(err) if collector.has_text() => {
                tracing::warn!(error = %err, "stream ended early, keeping partial turn");
                return Ok(collector.finish());
            }
            Err(err) => return Err(UpstreamError::Stream(err.to_string())),
        };
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            collector.push_line(&line, &mut sink)?;
        }
    }

    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).into_owned();
        collector.push_line(&line, &mut sink)?;
    }
    Ok(collector.finish())
}
