use std::time::Duration;

use futures_core::Stream;
use quakesaver_rs_protocol::WaveformFrame;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::{StreamSession, validate_host};
use crate::state::SessionConfig;

/// Configuration for the reconnect supervisor.
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Fixed delay between reconnect attempts. Default: 1 second.
    pub retry_backoff: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// Wraps [`StreamSession`] to present one continuous stream of frames
/// that survives transient disconnects.
///
/// Sensors are embedded devices on potentially flaky local networks;
/// consumers should see a stream that just keeps going rather than
/// carrying their own retry logic. The supervisor therefore never gives
/// up: every failure of a connection attempt is logged and retried
/// after a fixed backoff, and the only way the stream ends is the
/// caller ceasing to pull from it. This is a policy decision, not an
/// oversight.
///
/// Frames are forwarded strictly in receipt order within one connection
/// attempt. The protocol carries no sequence numbers, so a reconnect is
/// a fresh live subscription: frames in flight during a disconnect are
/// lost and never replayed.
pub struct StreamSupervisor {
    host: String,
    session_config: SessionConfig,
    config: SupervisorConfig,
    session: Option<StreamSession>,
}

impl StreamSupervisor {
    /// Create a supervisor for a sensor host with default configuration.
    pub fn new(host: &str) -> Result<Self> {
        Self::with_config(host, SessionConfig::default(), SupervisorConfig::default())
    }

    /// Create a supervisor with custom session and retry configuration.
    pub fn with_config(
        host: &str,
        session_config: SessionConfig,
        config: SupervisorConfig,
    ) -> Result<Self> {
        validate_host(host)?;
        Ok(Self {
            host: host.to_owned(),
            session_config,
            config,
            session: None,
        })
    }

    /// Returns the sensor host this supervisor targets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Receive the next frame of the continuous stream.
    ///
    /// Suspends until a frame arrives, re-establishing the underlying
    /// session as needed. Never fails and never ends; cancel by
    /// dropping the future (or the supervisor).
    pub async fn next_frame(&mut self) -> WaveformFrame {
        loop {
            if self.session.is_none() {
                match self.connect().await {
                    Ok(session) => {
                        self.session = Some(session);
                    }
                    Err(e) => {
                        warn!(host = %self.host, error = %e, "connect failed, retrying");
                        self.backoff().await;
                        continue;
                    }
                }
            }

            let Some(session) = self.session.as_mut() else {
                continue;
            };

            match session.next_frame().await {
                Ok(Some(frame)) => return frame,
                Ok(None) => {
                    debug!(host = %self.host, "sensor closed the stream, reconnecting");
                    self.session = None;
                    self.backoff().await;
                }
                Err(e) if e.is_transient() => {
                    warn!(host = %self.host, error = %e, "transient stream failure, reconnecting");
                    self.session = None;
                    self.backoff().await;
                }
                Err(e) => {
                    // The caller-facing stream must keep going; treat
                    // even unclassified errors as transient.
                    warn!(host = %self.host, error = %e, "unexpected stream error, reconnecting");
                    self.session = None;
                    self.backoff().await;
                }
            }
        }
    }

    /// Command the sensor to halt streaming and drop the live session.
    pub async fn stop(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.stop().await,
            None => {
                StreamSession::with_config(&self.host, self.session_config.clone())?
                    .stop()
                    .await
            }
        }
    }

    /// Consume this supervisor and return an endless [`Stream`] of
    /// frames with automatic reconnect.
    ///
    /// The stream has no error item and no natural end; dropping it is
    /// the cancellation primitive and synchronously closes the socket.
    pub fn into_stream(self) -> impl Stream<Item = WaveformFrame> {
        async_stream::stream! {
            let mut this = self;
            loop {
                yield this.next_frame().await;
            }
        }
    }

    // -- Private helpers --

    async fn connect(&self) -> Result<StreamSession> {
        let mut session = StreamSession::with_config(&self.host, self.session_config.clone())?;
        session.start().await?;
        info!(host = %self.host, "stream (re)established");
        Ok(session)
    }

    async fn backoff(&self) {
        tokio::time::sleep(self.config.retry_backoff).await;
    }
}
