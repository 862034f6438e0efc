use std::time::Duration;

/// Stream session state machine.
///
/// Transitions: `Disconnected` → `Connecting` → `Streaming` →
/// `Stopping` → `Disconnected`, with `Failed` reached from `Connecting`
/// or `Streaming` on error. `Failed` is terminal for one connection
/// attempt only; the [`StreamSupervisor`](crate::StreamSupervisor)
/// observes it and drives a fresh attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No connection open; `start()` may be called.
    Disconnected,
    /// Socket connect and start command in flight.
    Connecting,
    /// Live frames are being received.
    Streaming,
    /// Stop command in flight, socket being released.
    Stopping,
    /// The current connection attempt failed.
    Failed,
}

impl SessionState {
    /// Returns the state name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Streaming => "Streaming",
            Self::Stopping => "Stopping",
            Self::Failed => "Failed",
        }
    }
}

/// Configuration for [`StreamSession`](crate::StreamSession) connections.
///
/// There is deliberately no read timeout: a streaming session suspends
/// indefinitely awaiting the next frame and relies on transport-level
/// disconnect detection to unblock.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Timeout for opening the WebSocket connection. Default: 10 seconds.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
        }
    }
}
