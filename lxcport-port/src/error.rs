//! Port runtime error types.

use lxcport_protocol::ProtocolError;
use thiserror::Error;

/// Errors raised by the port runtime.
///
/// None of these are recoverable within a session: command-level failures
/// are reported to the peer as structured error replies instead and never
/// surface here.
#[derive(Debug, Error)]
pub enum PortError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("dispatch of command {command} produced no reply: {reason}")]
    Dispatch { command: u16, reason: String },
}
