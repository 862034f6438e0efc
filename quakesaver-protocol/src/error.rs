use crate::unit::DataUnit;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("invalid frame payload: {0}")]
    InvalidFrame(String),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("channel {channel:?}: invalid base64: {source}")]
    Base64 {
        channel: String,
        source: base64::DecodeError,
    },

    #[error("channel {channel:?}: gzip decompression failed: {source}")]
    Gzip {
        channel: String,
        source: std::io::Error,
    },

    #[error("gzip compression failed: {0}")]
    Compress(std::io::Error),

    #[error(
        "channel {channel:?}: {len} bytes is not a whole number of {width}-byte {unit:?} samples"
    )]
    SampleLengthMismatch {
        channel: String,
        len: usize,
        width: usize,
        unit: DataUnit,
    },
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
