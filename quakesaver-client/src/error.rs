use std::time::Duration;

/// Errors that can occur during QuakeSaver client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Socket or filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket transport error (handshake failure, reset, bad frame).
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Wire protocol error (malformed envelope or frame).
    #[error("protocol error: {0}")]
    Protocol(#[from] quakesaver_rs_protocol::ProtocolError),

    /// HTTP transport error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout duration.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Peer closed the connection.
    #[error("disconnected")]
    Disconnected,

    /// Host string failed validation (empty, scheme, or path present).
    #[error("invalid host {0:?}")]
    InvalidHost(String),

    /// Query arguments failed validation before any request was made.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Method called in wrong session state (e.g., `next_frame` before `start`).
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        /// The state(s) required for the operation.
        expected: &'static str,
        /// The current session state.
        actual: &'static str,
    },

    /// Backend rejected the request for lack of permissions.
    #[error("insufficient permissions")]
    InsufficientPermission,

    /// Backend session token expired.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Backend rejected the authentication details.
    #[error("wrong authentication details")]
    WrongAuthentication,

    /// Response data was incomplete or undeserializable.
    #[error("corrupted response data: {0}")]
    CorruptedData(String),

    /// Backend answered with an unexpected HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

impl ClientError {
    /// Whether the reconnect supervisor should treat this error as a
    /// transient stream failure and retry.
    ///
    /// Transport failures, timeouts, and malformed frames all fail only
    /// the current connection attempt. Validation and state-machine
    /// misuse errors surface synchronously to the caller instead.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::WebSocket(_)
                | Self::Protocol(_)
                | Self::Timeout(_)
                | Self::Disconnected
        )
    }
}

/// Convenience alias for `Result<T, ClientError>`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_transient() {
        assert!(ClientError::Disconnected.is_transient());
        assert!(ClientError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(
            ClientError::Protocol(quakesaver_rs_protocol::ProtocolError::InvalidEnvelope(
                "bad".into()
            ))
            .is_transient()
        );
    }

    #[test]
    fn caller_errors_are_not_transient() {
        assert!(!ClientError::InvalidHost("".into()).is_transient());
        assert!(
            !ClientError::InvalidState {
                expected: "Streaming",
                actual: "Disconnected",
            }
            .is_transient()
        );
        assert!(!ClientError::InvalidQuery("limit".into()).is_transient());
    }
}
