//! Long-term memory: storage trait, associative recall, heartbeat context.

pub mod context;
pub mod recall;
mod store;

pub use store::MemoryStore;

/// Truncate to at most `max` characters, appending an ellipsis when cut.
/// Operates on char boundaries, never byte offsets.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
