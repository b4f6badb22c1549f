//! Associative recall: keyword extraction and recall-block injection.
//!
//! Every inbound message is scanned for meaningful terms, which are matched
//! against the memory store's full-text index. Hits are prepended to the
//! message so the agent sees relevant history without being asked. The whole
//! pass is best-effort: any failure leaves the message untouched.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::debug;

use crate::memory::{truncate_chars, MemoryStore};

/// Maximum keywords fed into a single search query.
const MAX_KEYWORDS: usize = 8;

/// Maximum recalled memories injected per message.
const MAX_RECALLED: i64 = 3;

/// Recalled content is clipped to this many characters.
const RECALL_CONTENT_CHARS: usize = 300;

/// Common English words excluded from search queries.
static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "can", "had", "her", "was", "one",
        "our", "out", "has", "have", "been", "will", "would", "could", "should", "may", "might",
        "shall", "this", "that", "with", "from", "they", "them", "then", "than", "these", "those",
        "which", "what", "when", "where", "who", "whom", "how", "why", "each", "she", "his", "him",
        "its", "let", "say", "said", "also", "into", "just", "your", "some", "any", "only", "very",
        "here", "there", "their", "about", "more", "most", "other", "over", "such", "after",
        "before", "between", "under", "above", "being", "does", "did", "doing", "done", "get",
        "got", "going", "gone", "come", "came", "make", "made", "take", "took", "give", "gave",
        "know", "knew", "think", "thought", "tell", "told", "see", "seen", "want", "use", "used",
        "find", "found", "back", "like", "look", "well", "still", "even", "much", "many",
        "really", "already", "through", "because", "while", "since", "another", "same",
        "different", "thing", "things", "right", "good", "new", "now", "way", "time", "day",
        "need", "too", "yes", "yeah", "okay", "sure", "please", "thanks", "thank", "hello", "hey",
        "don't", "doesn't", "didn't", "won't", "wouldn't", "couldn't", "shouldn't", "isn't",
        "aren't", "wasn't", "weren't", "haven't", "hasn't", "hadn't", "can't",
    ]
    .into_iter()
    .collect()
});

/// Split text into meaningful search terms.
///
/// Lowercases, trims surrounding punctuation, drops short words and stop
/// words, deduplicates, and keeps the longest terms first, capped at
/// [`MAX_KEYWORDS`].
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut keywords: Vec<String> = Vec::new();

    for word in text.to_lowercase().split_whitespace() {
        let word = word.trim_matches(|c: char| {
            matches!(
                c,
                '.' | ','
                    | '!'
                    | '?'
                    | ';'
                    | ':'
                    | '"'
                    | '\''
                    | '`'
                    | '('
                    | ')'
                    | '['
                    | ']'
                    | '{'
                    | '}'
                    | '\u{2014}'
                    | '\u{2013}'
                    | '-'
                    | '/'
                    | '\\'
                    | '<'
                    | '>'
                    | '@'
                    | '#'
                    | '$'
                    | '%'
                    | '^'
                    | '&'
                    | '*'
                    | '~'
            )
        });
        if word.chars().count() < 3 {
            continue;
        }
        if STOP_WORDS.contains(word) {
            continue;
        }
        if !seen.insert(word.to_string()) {
            continue;
        }
        keywords.push(word.to_string());
    }

    // Longer terms are rarer and make better search anchors.
    keywords.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

/// Prepend an associative-recall block to the message when the store has
/// related memories. Returns the text unchanged on empty keywords, no hits,
/// or any store error.
pub async fn inject_recall<M: MemoryStore>(store: &M, text: &str) -> String {
    let keywords = extract_keywords(text);
    if keywords.is_empty() {
        return text.to_string();
    }

    let recalled = match store.search(&keywords, MAX_RECALLED).await {
        Ok(recalled) => recalled,
        Err(err) => {
            debug!(error = %err, "associative recall query failed");
            return text.to_string();
        }
    };
    if recalled.is_empty() {
        return text.to_string();
    }

    debug!(
        keywords = keywords.len(),
        memories = recalled.len(),
        "associative recall injected"
    );

    let mut out = String::from("--- ASSOCIATIVE RECALL ---\n");
    out.push_str("These memories surfaced based on your current conversation:\n");
    for memory in &recalled {
        let content = truncate_chars(&memory.entry.content, RECALL_CONTENT_CHARS);
        out.push_str(&format!("- {} ({})\n", content, memory.age_label()));
    }
    out.push_str("---\n\n");
    out.push_str(text);
    out
}
