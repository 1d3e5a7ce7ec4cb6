//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or term handling.
///
/// All of these are session-fatal: the protocol carries no correlation ids
/// or resynchronization markers, so a malformed frame or undecodable
/// payload leaves the stream position suspect and the session must end.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame length {0} too short: must exceed the 2 byte type tag")]
    FrameTooShort(u16),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    #[error("encoded term too large: {size} bytes (max {max})")]
    TermTooLarge { size: usize, max: usize },

    #[error("truncated frame: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    #[error("frame payload too short to carry a command tag")]
    MissingCommand,

    #[error("term codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
