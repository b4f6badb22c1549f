//! Maps raw upstream failures to operator-friendly chat replies.
//!
//! The engine surfaces provider errors as opaque strings. A handful of
//! well-known failure families get a readable message posted back to the
//! channel instead of a stack of transport noise; everything else stays an
//! error for the caller to log.

/// Translate a known failure into a friendly reply, or `None` when the
/// error is not one we recognize.
pub fn friendly_error(msg: &str) -> Option<String> {
    if msg.contains("429") || msg.contains("Limit Exhausted") || msg.contains("rate_limit") {
        if let Some(reset) = extract_reset_time(msg) {
            return Some(format!(
                "I'm temporarily out of API credits. My limit resets at {reset}. Try again after that!"
            ));
        }
        return Some(
            "I'm temporarily out of API credits and waiting for the limit to reset. \
             Try again in a bit!"
                .to_string(),
        );
    }
    if msg.contains("connection refused") || msg.contains("no such host") {
        return Some(
            "My language model backend is unreachable right now. Give it a minute and try again."
                .to_string(),
        );
    }
    if msg.contains("timeout") || msg.contains("deadline exceeded") {
        return Some(
            "That one took too long and timed out. Try again, maybe with a shorter message."
                .to_string(),
        );
    }
    if msg.contains("500") || msg.contains("502") || msg.contains("503") {
        return Some(
            "My backend hit an internal error. It usually clears up quickly, try again shortly."
                .to_string(),
        );
    }
    None
}

/// Pull the reset timestamp out of a provider rate-limit payload. Providers
/// embed it as free text after "reset at ", terminated by a quote or brace.
fn extract_reset_time(msg: &str) -> Option<String> {
    let idx = msg.find("reset at ")?;
    let rest = &msg[idx + "reset at ".len()..];
    let end = rest.find(['"', '}']).unwrap_or(rest.len());
    let time = rest[..end].trim();
    if time.is_empty() {
        None
    } else {
        Some(time.to_string())
    }
}

// ---
