use thiserror::Error;

/// Failures that end a submitted query.
#[derive(Debug, Error)]
pub enum AskError {
    /// No session, or a session without a usable bearer token.
    #[error("no access token found for the current session")]
    AuthTokenMissing,

    /// Network or HTTP failure before or during streaming.
    #[error("{0}")]
    Transport(String),

    #[error("invalid API url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// A single event payload that could not be decoded. Contained per event.
#[derive(Debug, Error)]
#[error("malformed stream event: {source}")]
pub struct EventParseError {
    pub payload: String,
    #[source]
    pub source: serde_json::Error,
}
