use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::frame::WaveformFrame;

fn default_version() -> i64 {
    1
}

fn default_class_name() -> String {
    "none".to_owned()
}

/// Inbound wire message wrapping a waveform frame or a non-data
/// notification (acknowledgement, state mutation, ...).
///
/// Only envelopes whose `payload` object carries a `"data"` key
/// represent waveform frames; everything else is skipped by the stream
/// session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default = "default_version")]
    pub version: i64,
    pub mutation: String,
    #[serde(default = "default_class_name")]
    pub class_name: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Parse an envelope from received JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))
    }

    /// Returns true if the payload carries waveform channel data.
    pub fn has_waveform_data(&self) -> bool {
        self.payload.get("data").is_some()
    }

    /// Extract the embedded waveform frame, if any.
    ///
    /// Returns `Ok(None)` for non-data envelopes. For data envelopes the
    /// payload is parsed strictly and its invariants checked; a payload
    /// with a `"data"` key that does not form a valid frame is a
    /// malformed-frame error.
    pub fn into_waveform_frame(self) -> Result<Option<WaveformFrame>> {
        if !self.has_waveform_data() {
            return Ok(None);
        }
        let frame: WaveformFrame = serde_json::from_value(self.payload)
            .map_err(|e| ProtocolError::InvalidFrame(e.to_string()))?;
        frame.validate()?;
        Ok(Some(frame))
    }
}
