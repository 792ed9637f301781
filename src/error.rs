//! Error types for the RESP codec and key extraction.

use thiserror::Error;

/// Errors produced while decoding, encoding, or extracting keys.
///
/// Any decode error aborts the in-progress message. Stream position after a
/// framing error is undefined, so the owning connection must be torn down
/// rather than reused.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("stream ended before a complete line arrived")]
    TruncatedLine,

    #[error("invalid redis packet: {0}")]
    Protocol(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("not a command: {0}")]
    InvalidCommand(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
