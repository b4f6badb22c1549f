//! Heartbeat reply handling: reschedule directives and suppression.
//!
//! The agent steers its own wake-up cadence by emitting a
//! `NEXT_HEARTBEAT: <duration>` line in a heartbeat reply. The line is
//! stripped before the reply is relayed anywhere, and the requested
//! interval is clamped so the agent can neither spin nor go silent.

use std::time::Duration;

const MIN_INTERVAL: Duration = Duration::from_secs(60);
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const DIRECTIVE_PREFIX: &str = "NEXT_HEARTBEAT:";

/// Scan a heartbeat reply for a reschedule directive.
///
/// Returns the clamped requested interval and the reply with every
/// directive line removed. Malformed durations are ignored.
pub fn parse_next_heartbeat(response: &str) -> Option<(Duration, String)> {
    let mut requested = None;
    for line in response.lines() {
        let Some(rest) = line.strip_prefix(DIRECTIVE_PREFIX) else {
            continue;
        };
        let token = rest.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            continue;
        }
        if requested.is_none()
            && let Some(duration) = parse_duration(token)
        {
            requested = Some(clamp_interval(duration));
        }
    }

    let requested = requested?;
    let stripped = response
        .lines()
        .filter(|line| !is_directive_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    Some((requested, stripped))
}

fn is_directive_line(line: &str) -> bool {
    line.strip_prefix(DIRECTIVE_PREFIX)
        .map(str::trim)
        .is_some_and(|token| !token.is_empty() && !token.contains(char::is_whitespace))
}

/// Clamp a requested interval to [1 minute, 24 hours].
pub fn clamp_interval(duration: Duration) -> Duration {
    duration.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

/// Parse suffixed durations such as `45s`, `15m`, `2h`, or `1h30m`.
pub fn parse_duration(text: &str) -> Option<Duration> {
    if text.is_empty() {
        return None;
    }
    let mut total = Duration::ZERO;
    let mut digits = String::new();
    let mut saw_segment = false;

    for c in text.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let value: u64 = digits.parse().ok()?;
        digits.clear();
        let unit_secs = match c {
            's' => 1,
            'm' => 60,
            'h' => 3600,
            _ => return None,
        };
        total += Duration::from_secs(value.checked_mul(unit_secs)?);
        saw_segment = true;
    }

    // Trailing digits without a unit make the whole string invalid.
    if !digits.is_empty() || !saw_segment {
        return None;
    }
    Some(total)
}

/// Whether a heartbeat reply should be suppressed instead of relayed:
/// an all-clear marker (alone or after analysis text) or nothing at all.
pub fn is_suppressed(response: &str) -> bool {
    let trimmed = response.trim();
    trimmed.is_empty() || trimmed == "HEARTBEAT_OK" || trimmed.ends_with("HEARTBEAT_OK")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(parse_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_duration("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("90"), None);
        assert_eq!(parse_duration("soon"), None);
        assert_eq!(parse_duration("5d"), None);
        assert_eq!(parse_duration("1h30"), None);
    }

    #[test]
    fn test_directive_is_clamped_and_stripped() {
        let (interval, stripped) =
            parse_next_heartbeat("All quiet.\nNEXT_HEARTBEAT: 45s").unwrap();
        assert_eq!(interval, Duration::from_secs(60));
        assert_eq!(stripped, "All quiet.");

        let (interval, _) = parse_next_heartbeat("NEXT_HEARTBEAT: 48h").unwrap();
        assert_eq!(interval, Duration::from_secs(24 * 60 * 60));

        let (interval, stripped) =
            parse_next_heartbeat("Checking back later.\nNEXT_HEARTBEAT: 2h\n").unwrap();
        assert_eq!(interval, Duration::from_secs(7200));
        assert_eq!(stripped, "Checking back later.");
    }

    #[test]
    fn test_no_directive_or_malformed_returns_none() {
        assert!(parse_next_heartbeat("nothing to see").is_none());
        assert!(parse_next_heartbeat("NEXT_HEARTBEAT: whenever").is_none());
        assert!(parse_next_heartbeat("NEXT_HEARTBEAT: 5 minutes").is_none());
    }

    #[test]
    fn test_directive_must_start_the_line() {
        assert!(parse_next_heartbeat("note: NEXT_HEARTBEAT: 5m is the plan").is_none());
    }

    #[test]
    fn test_suppression() {
        assert!(is_suppressed("HEARTBEAT_OK"));
        assert!(is_suppressed("  HEARTBEAT_OK\n"));
        assert!(is_suppressed("All tasks idle, nothing pending. HEARTBEAT_OK"));
        assert!(is_suppressed(""));
        assert!(is_suppressed("   \n  "));
        assert!(!is_suppressed("The deploy finished, want details?"));
    }
}
