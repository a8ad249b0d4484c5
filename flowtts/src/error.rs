//! Error types for the FlowTTS client.

use thiserror::Error;

/// Result type alias for FlowTTS operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for FlowTTS operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration. Raised before any network attempt.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// WebSocket transport error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Session-scoped fatal error reported by the server.
    ///
    /// Sentence-scoped errors are not `Error` values; they arrive as
    /// [`SessionEvent::SentenceError`](crate::SessionEvent::SentenceError)
    /// and do not terminate the session.
    #[error("session error: {code}: {message}")]
    Session { code: String, message: String },

    /// Operation not permitted in the current session state.
    #[error("invalid session state: {0}")]
    InvalidState(String),

    /// Connection closed before the session completed.
    #[error("connection closed")]
    Closed,

    /// Timed out waiting for a protocol event.
    #[error("timeout: {0}")]
    Timeout(String),
}

impl Error {
    /// Returns true if this is a session-scoped fatal error from the server.
    pub fn is_session_error(&self) -> bool {
        matches!(self, Error::Session { .. })
    }

    /// Returns true if the error originates in the transport layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Error::WebSocket(_) | Error::Io(_) | Error::Closed)
    }
}
