use futures_core::Stream;
use quakesaver_rs_protocol::{Envelope, StreamCommand, WaveformFrame};
use tracing::{debug, info, trace};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::state::{SessionConfig, SessionState};

/// One logical streaming connection to a sensor's `/ws` endpoint.
///
/// Implements the session state machine
/// `Disconnected` → `Connecting` → `Streaming` → `Stopping` → `Disconnected`,
/// with `Failed` marking a dead connection attempt. The session itself
/// never retries; wrap it in a [`StreamSupervisor`](crate::StreamSupervisor)
/// for a stream that survives disconnects.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> quakesaver_rs_client::Result<()> {
/// use quakesaver_rs_client::StreamSession;
///
/// let mut session = StreamSession::new("qssensor.local")?;
/// session.start().await?;
/// while let Some(frame) = session.next_frame().await? {
///     println!("uid={}, channels={}", frame.uid, frame.data.len());
/// }
/// session.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct StreamSession {
    host: String,
    config: SessionConfig,
    state: SessionState,
    connection: Option<Connection>,
    ever_connected: bool,
}

impl StreamSession {
    /// Create a session for a sensor host with default configuration.
    ///
    /// `host` is the bare `host[:port]` the sensor listens on, without
    /// scheme or path. Validation failure is the only synchronous error.
    pub fn new(host: &str) -> Result<Self> {
        Self::with_config(host, SessionConfig::default())
    }

    /// Create a session with custom [`SessionConfig`].
    pub fn with_config(host: &str, config: SessionConfig) -> Result<Self> {
        validate_host(host)?;
        Ok(Self {
            host: host.to_owned(),
            config,
            state: SessionState::Disconnected,
            connection: None,
            ever_connected: false,
        })
    }

    // -- Accessors --

    /// Returns the sensor host this session targets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns the configuration used for this session.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // -- Lifecycle --

    /// Open the socket and command the sensor to start streaming.
    ///
    /// Requires state `Disconnected` or `Failed`. Transitions through
    /// `Connecting` to `Streaming`; a connect error leaves the session
    /// `Failed` (a transient-failure signal for the supervisor).
    pub async fn start(&mut self) -> Result<()> {
        self.require_state(
            &[SessionState::Disconnected, SessionState::Failed],
            "start",
        )?;

        self.state = SessionState::Connecting;
        match self.open_and_start().await {
            Ok(connection) => {
                self.connection = Some(connection);
                self.ever_connected = true;
                self.state = SessionState::Streaming;
                info!(host = %self.host, "streaming started");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    async fn open_and_start(&self) -> Result<Connection> {
        let mut connection = Connection::open(&self.host, self.config.connect_timeout).await?;
        connection.send_command(StreamCommand::Start).await?;
        Ok(connection)
    }

    /// Receive the next decoded waveform frame.
    ///
    /// Suspends until a data envelope arrives; envelopes without
    /// waveform data are skipped silently. Returns `Ok(None)` when the
    /// sensor closes the connection and `Err` on transport or
    /// malformed-frame errors; either way the session is `Failed` and
    /// this attempt is over. Requires state `Streaming`.
    pub async fn next_frame(&mut self) -> Result<Option<WaveformFrame>> {
        self.require_state(&[SessionState::Streaming], "next_frame")?;

        loop {
            let Some(connection) = self.connection.as_mut() else {
                self.state = SessionState::Failed;
                return Err(ClientError::Disconnected);
            };

            let text = match connection.next_text().await {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!(host = %self.host, "sensor closed the stream");
                    self.fail();
                    return Ok(None);
                }
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            };

            match frame_from_text(&text) {
                Ok(Some(frame)) => {
                    trace!(uid = %frame.uid, channels = frame.data.len(), "frame received");
                    return Ok(Some(frame));
                }
                Ok(None) => {
                    trace!("skipping envelope without waveform data");
                }
                Err(e) => {
                    self.fail();
                    return Err(e.into());
                }
            }
        }
    }

    /// Command the sensor to halt streaming and release the socket.
    ///
    /// If no connection was ever opened this is a logged no-op. The
    /// stop command travels over a fresh control connection, so it works
    /// whether or not the streaming connection is still open. Closing
    /// errors are swallowed; the session always ends `Disconnected`.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.ever_connected {
            info!(host = %self.host, "stop requested but no stream was ever started");
            return Ok(());
        }

        self.state = SessionState::Stopping;
        // Dropping the live connection closes its socket.
        self.connection = None;

        let result = self.send_stop().await;
        self.state = SessionState::Disconnected;
        result
    }

    async fn send_stop(&self) -> Result<()> {
        let mut control = Connection::open(&self.host, self.config.connect_timeout).await?;
        control.send_command(StreamCommand::Stop).await?;
        control.close().await;
        Ok(())
    }

    /// Consume this session and return a [`Stream`] of frames.
    ///
    /// The session must be in `Streaming` state (i.e., after
    /// [`start()`](Self::start)). Dropping the stream closes the socket.
    pub fn into_stream(self) -> impl Stream<Item = Result<WaveformFrame>> {
        crate::stream::frame_stream(self)
    }

    // -- Private helpers --

    fn fail(&mut self) {
        self.connection = None;
        self.state = SessionState::Failed;
    }

    fn require_state(&self, allowed: &[SessionState], _method: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            let expected_static: &'static str = match allowed {
                [SessionState::Disconnected, SessionState::Failed] => "Disconnected|Failed",
                [SessionState::Streaming] => "Streaming",
                _ => "valid state",
            };
            Err(ClientError::InvalidState {
                expected: expected_static,
                actual: self.state.as_str(),
            })
        }
    }
}

fn frame_from_text(text: &str) -> quakesaver_rs_protocol::Result<Option<WaveformFrame>> {
    let envelope = Envelope::parse(text)?;
    match envelope.into_waveform_frame()? {
        Some(frame) => Ok(Some(frame.into_decoded()?)),
        None => Ok(None),
    }
}

pub(crate) fn validate_host(host: &str) -> Result<()> {
    if host.is_empty()
        || host.contains("://")
        || host.contains('/')
        || host.contains(char::is_whitespace)
    {
        return Err(ClientError::InvalidHost(host.to_owned()));
    }
    Ok(())
}
