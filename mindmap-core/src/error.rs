use thiserror::Error;

/// Errors produced by the ingestion adapter and session layer.
///
/// The builder itself is infallible: it only ever sees a valid (possibly
/// empty) extraction state, so every failure is absorbed at the ingestion
/// boundary and surfaced through this taxonomy.
#[derive(Debug, Error)]
pub enum MindMapError {
    /// The summarization exchange failed or was rejected upstream.
    #[error("upstream summarization failed: {0}")]
    UpstreamFailure(String),

    /// A final snapshot failed schema validation.
    #[error("extraction validation failed: {0}")]
    ValidationFailure(String),

    /// User-side input rejected before any network exchange.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// No session with the given id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A snapshot arrived with a sequence number at or below the last
    /// accepted one.
    #[error("stale snapshot: last accepted seq {last}, got {got}")]
    StaleSnapshot { last: u64, got: u64 },
}

pub type Result<T> = std::result::Result<T, MindMapError>;
