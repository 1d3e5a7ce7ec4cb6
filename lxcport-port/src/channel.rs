//! Framed channel over blocking byte streams.
//!
//! The reader and writer halves are separate types so a command handler
//! can push asynchronous event frames through the writer while the session
//! loop owns the reader. Both halves run on the same thread of control, so
//! frames are never interleaved mid-write.

use crate::error::PortError;
use bytes::Bytes;
use lxcport_protocol::{Frame, InboundPayload, ProtocolError, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};
use std::io::{self, Read, Write};

/// Reads exactly `buf.len()` bytes, retrying partial reads.
///
/// Returns the number of bytes actually read: the full length, or less if
/// the stream ended first. The caller decides whether a short count is a
/// clean end of stream (at a frame boundary) or a truncation fault.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match reader.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(got)
}

/// Reads length-prefixed request frames from the inbound stream.
///
/// Owns a reusable frame buffer sized to the protocol maximum, so one
/// allocation bounds memory use for the life of the session.
pub struct FrameReader<R> {
    inner: R,
    buf: Box<[u8]>,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: vec![0u8; MAX_FRAME_SIZE].into_boxed_slice(),
        }
    }

    /// Reads the next request frame.
    ///
    /// Returns `Ok(None)` when the peer closed the stream at a frame
    /// boundary. A short read anywhere else, or a declared length that
    /// leaves no room for a command tag, is a protocol fault.
    pub fn read_frame(&mut self) -> Result<Option<InboundPayload>, PortError> {
        let mut len_prefix = [0u8; LENGTH_PREFIX_SIZE];
        let got = read_full(&mut self.inner, &mut len_prefix)?;
        if got == 0 {
            return Ok(None);
        }
        if got < LENGTH_PREFIX_SIZE {
            return Err(ProtocolError::TruncatedFrame {
                expected: LENGTH_PREFIX_SIZE,
                got,
            }
            .into());
        }

        let declared = u16::from_be_bytes(len_prefix);
        let body_len = Frame::validate_length(declared)?;

        let body = &mut self.buf[..body_len];
        let got = read_full(&mut self.inner, body)?;
        if got < body_len {
            return Err(ProtocolError::TruncatedFrame {
                expected: body_len,
                got,
            }
            .into());
        }

        let payload = Bytes::copy_from_slice(body);
        Ok(Some(InboundPayload::parse(payload)?))
    }

    /// Consumes the reader, returning the underlying stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Writes length-prefixed frames to the outbound stream.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes one frame as a single contiguous buffer and flushes.
    ///
    /// Assembling length, type and payload up front means a failed write
    /// never leaves a partial frame boundary on the stream.
    pub fn write_frame(&mut self, frame_type: u16, payload: Bytes) -> Result<(), PortError> {
        let buf = Frame::new(frame_type, payload).encode()?;
        self.inner.write_all(&buf)?;
        self.inner.flush()?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
