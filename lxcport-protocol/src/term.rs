//! Structured term codec.
//!
//! Frame payloads carry a self-describing structured value encoded as
//! JSON. The codec tracks how many payload bytes it has allocated for
//! decoded arguments and encoded replies, and how many of those the
//! session has released again, so the port can report encoder statistics
//! at high verbosity.

use crate::error::ProtocolError;
use crate::MAX_TERM_SIZE;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};

/// A decoded structured value.
pub type Term = serde_json::Value;

/// Snapshot of the codec's runtime counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecStats {
    /// Payload bytes allocated for encoding or decoding terms.
    pub allocated: u64,
    /// Payload bytes released after their frame was handled.
    pub freed: u64,
}

/// Term encoder/decoder with runtime statistics.
#[derive(Debug, Default)]
pub struct Codec {
    allocated: AtomicU64,
    freed: AtomicU64,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a term, enforcing the outbound size cap.
    pub fn encode(&self, term: &Term) -> Result<Bytes, ProtocolError> {
        let encoded = serde_json::to_vec(term)?;
        if encoded.len() > MAX_TERM_SIZE {
            return Err(ProtocolError::TermTooLarge {
                size: encoded.len(),
                max: MAX_TERM_SIZE,
            });
        }
        self.allocated
            .fetch_add(encoded.len() as u64, Ordering::Relaxed);
        Ok(Bytes::from(encoded))
    }

    /// Decodes a term from raw payload bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<Term, ProtocolError> {
        let term = serde_json::from_slice(bytes)?;
        self.allocated
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(term)
    }

    /// Records that `n` previously allocated payload bytes were released.
    pub fn record_release(&self, n: usize) {
        self.freed.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Returns the current counters without resetting them.
    pub fn stats(&self) -> CodecStats {
        CodecStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            freed: self.freed.load(Ordering::Relaxed),
        }
    }

    /// Returns the current counters and resets them to zero.
    pub fn take_stats(&self) -> CodecStats {
        CodecStats {
            allocated: self.allocated.swap(0, Ordering::Relaxed),
            freed: self.freed.swap(0, Ordering::Relaxed),
        }
    }
}
