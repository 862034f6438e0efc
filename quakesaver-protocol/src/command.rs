use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Outbound control message commanding a sensor to start or stop its
/// live waveform stream.
///
/// Serialized as a JSON envelope of the form
/// `{"action": "startWaveformStream"}`. Stateless, constructed once per
/// directional transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum StreamCommand {
    #[serde(rename = "startWaveformStream")]
    Start,
    #[serde(rename = "stopWaveformStream")]
    Stop,
}

impl StreamCommand {
    /// Returns the wire action string for this command.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "startWaveformStream",
            Self::Stop => "stopWaveformStream",
        }
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(self) -> String {
        serde_json::json!({ "action": self.as_str() }).to_string()
    }

    /// Parse a command from received JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidCommand(e.to_string()))
    }
}
