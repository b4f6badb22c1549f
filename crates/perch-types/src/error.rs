use thiserror::Error;

/// Errors from the upstream agent engine.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("session not found")]
    NotFound,

    #[error("upstream returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("agent run failed: {0}")]
    Fatal(String),
}

impl UpstreamError {
    /// Whether the error indicates the session no longer exists upstream.
    ///
    /// Matches either a typed 404 or an error body mentioning "not found",
    /// since the engine reports missing sessions both ways.
    pub fn is_session_not_found(&self) -> bool {
        match self {
            UpstreamError::NotFound => true,
            UpstreamError::Http { status: 404, .. } => true,
            UpstreamError::Http { body, .. } => body.to_lowercase().contains("not found"),
            UpstreamError::Fatal(msg) => msg.to_lowercase().contains("not found"),
            _ => false,
        }
    }
}

/// Errors from repository operations (used by trait definitions in perch-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,
}

/// Errors from the compaction pass.
#[derive(Debug, Error)]
pub enum CompactionError {
    #[error("nothing to compact: transcript is empty")]
    EmptyTranscript,

    #[error("failed to read transcript: {0}")]
    Transcript(String),

    #[error("summarizer error: {0}")]
    Summarizer(String),

    #[error("failed to create replacement session: {0}")]
    SessionCreate(String),

    #[error("compaction is disabled")]
    Disabled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_error_display() {
        let err = UpstreamError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "upstream returned 502: bad gateway");

        let err = UpstreamError::Fatal("tool exploded".to_string());
        assert_eq!(err.to_string(), "agent run failed: tool exploded");
    }

    #[test]
    fn test_session_not_found_detection() {
        assert!(UpstreamError::NotFound.is_session_not_found());
        assert!(
            UpstreamError::Http {
                status: 404,
                body: String::new()
            }
            .is_session_not_found()
        );
        assert!(
            UpstreamError::Http {
                status: 500,
                body: "Session not found".to_string()
            }
            .is_session_not_found()
        );
        assert!(
            !UpstreamError::Transport("connection refused".to_string()).is_session_not_found()
        );
    }

    #[test]
    fn test_compaction_error_display() {
        assert_eq!(
            CompactionError::EmptyTranscript.to_string(),
            "nothing to compact: transcript is empty"
        );
        assert_eq!(
            CompactionError::Summarizer("timeout".to_string()).to_string(),
            "summarizer error: timeout"
        );
    }
}
