//! Binary frame format for the port channel.
//!
//! Frame layout (2 byte length prefix + 2 byte type tag + payload):
//!
//! ```text
//! +----------+----------+--------------------+
//! | length   | type     | payload            |
//! | 2 bytes  | 2 bytes  | length - 2 bytes   |
//! +----------+----------+--------------------+
//! ```
//!
//! All integers are big-endian. `length` counts the type tag plus the
//! payload, so a valid frame always declares a length strictly greater
//! than 2. Inbound payloads start with a 2 byte command tag followed by
//! the term-encoded argument; outbound payloads are a bare encoded term.

use crate::error::ProtocolError;
use crate::{FRAME_TYPE_SIZE, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE, MSG_ASYNC, MSG_SYNC};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// A parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type tag: [`MSG_SYNC`] for replies, [`MSG_ASYNC`] for events.
    pub frame_type: u16,
    /// Frame payload.
    pub payload: Bytes,
}

impl Frame {
    pub fn new(frame_type: u16, payload: Bytes) -> Self {
        Self {
            frame_type,
            payload,
        }
    }

    /// Creates a synchronous reply frame.
    pub fn sync(payload: Bytes) -> Self {
        Self::new(MSG_SYNC, payload)
    }

    /// Creates an asynchronous event frame.
    pub fn event(payload: Bytes) -> Self {
        Self::new(MSG_ASYNC, payload)
    }

    /// Validates a declared frame length read off the wire.
    ///
    /// The length must leave room for at least one payload byte beyond the
    /// type tag; the upper bound is structural since the prefix is a u16.
    pub fn validate_length(len: u16) -> Result<usize, ProtocolError> {
        if len as usize <= FRAME_TYPE_SIZE {
            return Err(ProtocolError::FrameTooShort(len));
        }
        Ok(len as usize)
    }

    /// Encodes the frame into a single contiguous buffer.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let body_len = FRAME_TYPE_SIZE + self.payload.len();
        if body_len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: body_len,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + body_len);
        buf.put_u16(body_len as u16);
        buf.put_u16(self.frame_type);
        buf.put_slice(&self.payload);
        Ok(buf)
    }

    /// Decodes a frame from a buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let declared = u16::from_be_bytes([buf[0], buf[1]]);
        let body_len = Self::validate_length(declared)?;

        if buf.len() < LENGTH_PREFIX_SIZE + body_len {
            return Ok(None);
        }

        buf.advance(LENGTH_PREFIX_SIZE);
        let frame_type = buf.get_u16();
        let payload = buf.split_to(body_len - FRAME_TYPE_SIZE).freeze();

        Ok(Some(Self {
            frame_type,
            payload,
        }))
    }
}

/// The decoded payload of an inbound request frame: a command tag followed
/// by the term-encoded argument bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPayload {
    pub command: u16,
    pub body: Bytes,
}

impl InboundPayload {
    /// Splits the command tag off a request frame payload.
    pub fn parse(mut payload: Bytes) -> Result<Self, ProtocolError> {
        if payload.len() < FRAME_TYPE_SIZE {
            return Err(ProtocolError::MissingCommand);
        }
        let command = payload.get_u16();
        Ok(Self {
            command,
            body: payload,
        })
    }

    /// Joins a command tag and argument bytes back into a frame payload.
    pub fn encode(command: u16, body: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(FRAME_TYPE_SIZE + body.len());
        buf.put_u16(command);
        buf.put_slice(body);
        buf.freeze()
    }
}
