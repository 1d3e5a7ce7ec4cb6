//! # lxcport-protocol
//!
//! Wire protocol for lxcport.
//!
//! This crate provides:
//! - Length-prefixed binary framing with a message type tag
//! - The structured term codec (JSON) used for frame payloads
//! - Encoder runtime statistics for diagnostics
//! - Protocol error types

pub mod error;
pub mod frame;
pub mod term;

pub use error::ProtocolError;
pub use frame::{Frame, InboundPayload};
pub use term::{Codec, CodecStats, Term};

/// Message type tag for a synchronous reply frame.
pub const MSG_SYNC: u16 = 0;

/// Message type tag for an asynchronous event frame.
pub const MSG_ASYNC: u16 = 1;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Size of the message type field in bytes.
pub const FRAME_TYPE_SIZE: usize = 2;

/// Maximum value of the length prefix, i.e. the largest type + payload
/// byte count a frame can carry.
pub const MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Maximum size of an encoded term in an outbound frame. Leaves room for
/// the length prefix and type tag within one u16-addressable buffer.
pub const MAX_TERM_SIZE: usize = u16::MAX as usize - 4;
