// Error handling for the .dat codec

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IbaError>;

#[derive(Error, Debug)]
pub enum IbaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes: expected {expected:02X?}, got {got:02X?}")]
    InvalidMagic { expected: Vec<u8>, got: Vec<u8> },

    #[error("Recording has no channels")]
    EmptyRecording,

    #[error("Channel has no samples: {0}")]
    EmptyChannel(String),

    #[error("Channel {channel} mixes digital and analog samples (first mismatch at sample {index})")]
    MixedSampleTypes { channel: String, index: usize },

    #[error("Duplicate channel name: {0}")]
    DuplicateChannel(String),

    #[error("Invalid channel name: {0:?}")]
    InvalidChannelName(String),

    #[error("Offset {0:#x} does not fit the file addressing scheme")]
    OffsetOutOfRange(u64),

    #[error("Missing trailer field: {0}")]
    MissingField(&'static str),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Invalid codec options: {0}")]
    InvalidOptions(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
