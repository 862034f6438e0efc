use futures_core::Stream;
use quakesaver_rs_protocol::WaveformFrame;

use crate::StreamSession;
use crate::error::ClientError;

/// Convert a streaming [`StreamSession`] into a [`Stream`] of frames.
///
/// The session must be in the `Streaming` state (i.e., after calling
/// [`start()`](StreamSession::start)).
///
/// The stream yields `Ok(WaveformFrame)` per data envelope and ends
/// with `None` when the sensor closes the connection. Dropping the
/// stream drops the session and thereby closes the socket.
pub fn frame_stream(
    mut session: StreamSession,
) -> impl Stream<Item = Result<WaveformFrame, ClientError>> {
    async_stream::try_stream! {
        while let Some(frame) = session.next_frame().await? {
            yield frame;
        }
    }
}
