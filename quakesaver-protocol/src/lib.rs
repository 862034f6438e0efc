//! QuakeSaver wire protocol types and the waveform frame codec.
//!
//! This crate provides the shared protocol layer for QuakeSaver sensors,
//! used by the client crate: outbound stream commands, inbound JSON
//! envelopes, and the decoding of base64/gzip-encoded channel data into
//! numeric sample arrays.

pub mod command;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod unit;

pub use command::StreamCommand;
pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use frame::{ChannelSamples, WaveformFrame, encode_counts, encode_samples};
pub use unit::DataUnit;
