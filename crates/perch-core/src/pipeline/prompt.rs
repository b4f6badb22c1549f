//! Transcript rendering and the compaction prompt.

use perch_types::event::EventEnvelope;

/// Transcripts longer than this are clipped to their most recent tail
/// before being sent to the summarizer.
const MAX_TRANSCRIPT_CHARS: usize = 100_000;

const COMPACTION_PROMPT_HEADER: &str = r#"You are a session compaction agent. Your job is to analyze a conversation transcript and extract a structured summary that preserves critical context for the agent's continued operation.

Analyze the following conversation transcript and produce a structured summary with these sections:

## CONVERSATION SUMMARY
A 2-3 paragraph summary of what happened in this conversation — the main topics, decisions made, and current state.

## KEY_MEMORIES
Bullet list of important facts, decisions, and context the agent needs to remember. Be specific — include names, IDs, URLs, and concrete details.

## FAILED_TOOLS
Bullet list of any tools or actions that failed, with the error and any workarounds found.

## PATTERNS
Bullet list of recurring patterns, preferences, or workflows observed.

## NEXT_ACTIONS
Bullet list of any pending tasks, commitments, or things the agent was about to do.

TRANSCRIPT:
"#;

const COMPACTION_PROMPT_FOOTER: &str = "\n\nProduce the structured summary now. Be thorough but concise — this summary replaces the entire conversation history.";

/// Render a session's events as a plain `[author]: text` transcript.
/// Events without text content are skipped.
pub fn render_transcript(events: &[EventEnvelope]) -> String {
    let mut out = String::new();
    for event in events {
        let Some(content) = &event.content else {
            continue;
        };
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|part| part.as_text())
            .filter(|text| !text.is_empty())
            .collect();
        if texts.is_empty() {
            continue;
        }
        let author = if event.author.is_empty() {
            "unknown"
        } else {
            &event.author
        };
        out.push_str(&format!("[{}]: {}\n\n", author, texts.join("\n")));
    }
    out
}

/// Build the full summarization prompt, keeping only the most recent
/// [`MAX_TRANSCRIPT_CHARS`] characters of an oversized transcript.
pub fn build_compaction_prompt(transcript: &str) -> String {
    let tail = transcript_tail(transcript, MAX_TRANSCRIPT_CHARS);
    format!("{COMPACTION_PROMPT_HEADER}{tail}{COMPACTION_PROMPT_FOOTER}")
}

/// The last `max` characters of a transcript, cut on a char boundary.
fn transcript_tail(transcript: &str, max: usize) -> &str {
    let total = transcript.chars().count();
    if total <= max {
        return transcript;
    }
    let skip = total - max;
    match transcript.char_indices().nth(skip) {
        Some((idx, _)) => &transcript[idx..],
        None => transcript,
    }
}

#[cfg(test)]
mod tests {
    use perch_types::event::{EventContent, Part};

    use super::*;

    fn event(author: &str, text: &str) -> EventEnvelope {
        EventEnvelope {
            author: author.to_string(),
            content: Some(EventContent {
                parts: vec![Part::Text {
                    text: text.to_string(),
                }],
            }),
        }
    }

    #[test]
    fn test_render_transcript_formats_authors() {
        let events = vec![event("user", "hello"), event("agent", "hi there")];
        assert_eq!(
            render_transcript(&events),
            "[user]: hello\n\n[agent]: hi there\n\n"
        );
    }

    #[test]
    fn test_render_transcript_skips_empty_and_defaults_author() {
        let events = vec![
            event("", "anonymous line"),
            EventEnvelope {
                author: "agent".to_string(),
                content: None,
            },
        ];
        assert_eq!(render_transcript(&events), "[unknown]: anonymous line\n\n");
    }

    #[test]
    fn test_prompt_contains_five_sections() {
        let prompt = build_compaction_prompt("[user]: hi\n\n");
        for section in [
            "## CONVERSATION SUMMARY",
            "## KEY_MEMORIES",
            "## FAILED_TOOLS",
            "## PATTERNS",
            "## NEXT_ACTIONS",
        ] {
            assert!(prompt.contains(section), "missing {section}");
        }
        assert!(prompt.contains("[user]: hi"));
    }

    #[test]
    fn test_transcript_tail_keeps_recent_end() {
        let long = format!("{}{}", "a".repeat(150_000), "THE END");
        let prompt = build_compaction_prompt(&long);
        assert!(prompt.contains("THE END"));
        // The transcript itself is clipped to the cap; the prompt adds only
        // the fixed header and footer on top.
        let overhead = COMPACTION_PROMPT_HEADER.len() + COMPACTION_PROMPT_FOOTER.len();
        assert!(prompt.len() <= MAX_TRANSCRIPT_CHARS + overhead);
        assert!(prompt.len() > MAX_TRANSCRIPT_CHARS);
    }

    #[test]
    fn test_transcript_tail_char_boundary_safe() {
        let tail = transcript_tail("ééééé", 2);
        assert_eq!(tail, "éé");
    }
}
