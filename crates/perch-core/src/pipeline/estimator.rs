//! Token estimation over a session's event history.

use perch_types::event::EventEnvelope;

/// Approximate the token count of a transcript using the chars/4 heuristic.
///
/// Text parts contribute their character count; non-text parts contribute
/// the size of their serialized JSON, so tool-heavy sessions are not
/// undercounted.
pub fn estimate_tokens(events: &[EventEnvelope]) -> u64 {
    let chars: usize = events
        .iter()
        .filter_map(|event| event.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .map(|part| part.estimation_chars())
        .sum();
    (chars / 4) as u64
}

#[cfg(test)]
mod tests {
    use perch_types::event::{EventContent, Part};

    use super::*;

    fn text_event(text: &str) -> EventEnvelope {
        EventEnvelope {
            author: "agent".to_string(),
            content: Some(EventContent {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }),
        }
    }

    #[test]
    fn test_chars_over_four() {
        let events = vec![text_event(&"a".repeat(400)), text_event(&"b".repeat(100))];
        assert_eq!(estimate_tokens(&events), 125);
    }

    #[test]
    fn test_empty_and_contentless_events_count_zero() {
        assert_eq!(estimate_tokens(&[]), 0);
        let events = vec![EventEnvelope {
            author: "agent".to_string(),
            content: None,
        }];
        assert_eq!(estimate_tokens(&events), 0);
    }

    #[test]
    fn test_non_text_parts_count_json_size() {
        let envelope: EventEnvelope = serde_json::from_str(
            r#"{"author":"agent","content":{"parts":[{"functionCall":{"id":"c1","name":"search","args":{"q":"rust"}}}]}}"#,
        )
        .unwrap();
        assert!(estimate_tokens(&[envelope]) > 0);
    }
}
