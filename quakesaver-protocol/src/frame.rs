use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};
use crate::unit::DataUnit;

/// Sample data for one channel of a waveform frame.
///
/// Channels arrive as base64 text (optionally gzip-compressed before
/// encoding) and decode into numeric arrays. Replay and test inputs may
/// carry pre-populated arrays, which deserialize directly into the
/// numeric variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelSamples {
    /// Base64-encoded bytes as received from the sensor.
    Encoded(String),
    /// Decoded raw ADC counts.
    Counts(Vec<i32>),
    /// Decoded physical samples (m/s or m/s²).
    Samples(Vec<f64>),
}

impl ChannelSamples {
    /// Returns true if this channel still holds undecoded wire data.
    pub fn is_encoded(&self) -> bool {
        matches!(self, Self::Encoded(_))
    }

    /// Number of decoded samples, or `None` while still encoded.
    pub fn num_samples(&self) -> Option<usize> {
        match self {
            Self::Encoded(_) => None,
            Self::Counts(samples) => Some(samples.len()),
            Self::Samples(samples) => Some(samples.len()),
        }
    }
}

/// One unit of multi-channel waveform samples plus timing metadata.
///
/// Constructed fresh per incoming wire message by
/// [`Envelope::into_waveform_frame`](crate::Envelope::into_waveform_frame)
/// and decoded exactly once via [`into_decoded`](Self::into_decoded).
/// Unknown payload fields are tolerated and preserved in `extra`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveformFrame {
    /// Identifier of the originating sensor.
    pub uid: String,
    /// Time between samples in seconds. Always > 0.
    pub delta_t: f64,
    /// Time of the last sample in the frame.
    pub endtime: DateTime<Utc>,
    /// Unit of the samples; selects the decode element type.
    pub data_unit: DataUnit,
    /// Whether channel bytes are gzip-compressed before base64 encoding.
    /// Fixed at `false` on the frame returned by [`into_decoded`](Self::into_decoded).
    #[serde(default)]
    pub compressed: bool,
    /// Ordered mapping of channel name to sample data.
    pub data: BTreeMap<String, ChannelSamples>,
    /// Payload fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WaveformFrame {
    /// Decode every encoded channel and return the decoded frame.
    ///
    /// Consumes the received frame; the result carries numeric arrays in
    /// every channel and `compressed == false`. Channels that already
    /// hold numeric arrays pass through untouched, so decoding is
    /// idempotent by construction.
    pub fn into_decoded(mut self) -> Result<Self> {
        let compressed = self.compressed;
        let unit = self.data_unit;
        for (channel, samples) in &mut self.data {
            let decoded = match &*samples {
                ChannelSamples::Encoded(text) => decode_channel(channel, text, compressed, unit)?,
                _ => continue,
            };
            *samples = decoded;
        }
        self.compressed = false;
        Ok(self)
    }

    /// Returns true once every channel holds a numeric sample array.
    pub fn is_decoded(&self) -> bool {
        self.data.values().all(|samples| !samples.is_encoded())
    }

    /// Checks the invariants of a freshly parsed frame.
    pub fn validate(&self) -> Result<()> {
        if self.delta_t <= 0.0 {
            return Err(ProtocolError::InvalidFrame(format!(
                "delta_t must be > 0, got {}",
                self.delta_t
            )));
        }
        Ok(())
    }
}

fn decode_channel(
    channel: &str,
    text: &str,
    compressed: bool,
    unit: DataUnit,
) -> Result<ChannelSamples> {
    let mut bytes = BASE64.decode(text).map_err(|source| ProtocolError::Base64 {
        channel: channel.to_owned(),
        source,
    })?;

    if compressed {
        let mut decompressed = Vec::new();
        GzDecoder::new(bytes.as_slice())
            .read_to_end(&mut decompressed)
            .map_err(|source| ProtocolError::Gzip {
                channel: channel.to_owned(),
                source,
            })?;
        bytes = decompressed;
    }

    let width = unit.sample_width();
    if bytes.len() % width != 0 {
        return Err(ProtocolError::SampleLengthMismatch {
            channel: channel.to_owned(),
            len: bytes.len(),
            width,
            unit,
        });
    }

    // Sample buffers are little-endian on the wire.
    Ok(match unit {
        DataUnit::Counts => ChannelSamples::Counts(
            bytes
                .chunks_exact(4)
                .map(|chunk| {
                    let mut raw = [0u8; 4];
                    raw.copy_from_slice(chunk);
                    i32::from_le_bytes(raw)
                })
                .collect(),
        ),
        DataUnit::MetersPerSecond | DataUnit::MetersPerSecondSquared => ChannelSamples::Samples(
            bytes
                .chunks_exact(8)
                .map(|chunk| {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(chunk);
                    f64::from_le_bytes(raw)
                })
                .collect(),
        ),
    })
}

/// Encode raw count samples as a sensor would put them on the wire.
pub fn encode_counts(samples: &[i32], compress: bool) -> Result<String> {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|sample| sample.to_le_bytes())
        .collect();
    encode_bytes(&bytes, compress)
}

/// Encode physical samples as a sensor would put them on the wire.
pub fn encode_samples(samples: &[f64], compress: bool) -> Result<String> {
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|sample| sample.to_le_bytes())
        .collect();
    encode_bytes(&bytes, compress)
}

fn encode_bytes(bytes: &[u8], compress: bool) -> Result<String> {
    if !compress {
        return Ok(BASE64.encode(bytes));
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).map_err(ProtocolError::Compress)?;
    let compressed = encoder.finish().map_err(ProtocolError::Compress)?;
    Ok(BASE64.encode(compressed))
}
