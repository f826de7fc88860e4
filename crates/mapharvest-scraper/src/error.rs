use thiserror::Error;

/// Fatal, session-ending failures.
///
/// Both variants stop the session and surface exactly one `error` event to
/// the host; neither is ever auto-restarted. Per-listing faults are NOT
/// errors at this level: they are logged, counted as processed, and the
/// traversal continues (see `engine`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("results feed {selector} not found after {timeout_ms}ms")]
    FeedTimeout { selector: String, timeout_ms: u64 },

    #[error(
        "no business listings found after {attempts} attempts; ensure search results are visible"
    )]
    NoListings { attempts: u32 },
}
