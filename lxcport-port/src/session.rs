//! Session loop.
//!
//! Drives the framed channel and dispatcher in a strict request/reply
//! cycle: one blocking read, decode, dispatch, one synchronous reply.
//! Asynchronous events pushed by handlers go out through the same writer
//! mid-dispatch and therefore always precede the pending reply.

use crate::channel::{FrameReader, FrameWriter};
use crate::config::Config;
use crate::container::{Container, ContainerState};
use crate::dispatch::{Dispatcher, EventSink};
use crate::error::PortError;
use lxcport_protocol::{Codec, Term, MSG_ASYNC, MSG_SYNC};
use std::io::{Read, Write};

/// How the session ended.
///
/// Both variants go through normal termination: the exit-time lifecycle
/// policy still applies. Hard faults (decode, dispatch, write) surface as
/// `Err` from [`Port::run`] instead and skip the policy.
#[derive(Debug)]
pub enum Shutdown {
    /// Peer closed the channel at a frame boundary.
    PeerClosed,
    /// A malformed frame or failed read ended the session.
    Fault(PortError),
}

impl Shutdown {
    pub fn is_graceful(&self) -> bool {
        matches!(self, Shutdown::PeerClosed)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Shutdown::PeerClosed => 0,
            Shutdown::Fault(_) => 1,
        }
    }
}

/// Event sink writing async frames through the session's writer.
struct ChannelEventSink<'a, W: Write> {
    writer: &'a mut FrameWriter<W>,
    codec: &'a Codec,
}

impl<W: Write> EventSink for ChannelEventSink<'_, W> {
    fn push(&mut self, event: &Term) -> Result<(), PortError> {
        let encoded = self.codec.encode(event)?;
        let len = encoded.len();
        self.writer.write_frame(MSG_ASYNC, encoded)?;
        self.codec.record_release(len);
        Ok(())
    }
}

/// The port session: owns the channel halves, the codec, the dispatcher
/// and the container handle for the life of the process.
pub struct Port<R, W, C> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    codec: Codec,
    dispatcher: Dispatcher,
    container: C,
    config: Config,
}

impl<R: Read, W: Write, C: Container> Port<R, W, C> {
    pub fn new(reader: R, writer: W, dispatcher: Dispatcher, container: C, config: Config) -> Self {
        Self {
            reader: FrameReader::new(reader),
            writer: FrameWriter::new(writer),
            codec: Codec::new(),
            dispatcher,
            container,
            config,
        }
    }

    /// Runs the request/reply loop until the session terminates.
    ///
    /// Read-side problems (peer gone, malformed frame) end the session via
    /// `Ok(Shutdown)`. Everything after a successful frame read is fatal
    /// on failure: an undecodable argument, a handler that cannot produce
    /// a reply, or a failed write means the stream position is suspect and
    /// continuing would misinterpret subsequent frames.
    pub fn run(&mut self) -> Result<Shutdown, PortError> {
        loop {
            let inbound = match self.reader.read_frame() {
                Ok(Some(inbound)) => inbound,
                Ok(None) => {
                    tracing::info!("peer closed the channel");
                    return Ok(Shutdown::PeerClosed);
                }
                Err(e) => {
                    tracing::error!(error = %e, "inbound frame fault");
                    return Ok(Shutdown::Fault(e));
                }
            };

            let arg = self.codec.decode(&inbound.body)?;
            let arg_len = inbound.body.len();

            tracing::debug!(command = inbound.command, "dispatching");
            let reply = {
                let mut sink = ChannelEventSink {
                    writer: &mut self.writer,
                    codec: &self.codec,
                };
                self.dispatcher
                    .dispatch(inbound.command, &arg, &mut self.container, &mut sink)?
            };

            let encoded = self.codec.encode(&reply)?;
            let reply_len = encoded.len();
            self.writer.write_frame(MSG_SYNC, encoded)?;
            self.codec.record_release(arg_len + reply_len);

            if self.config.verbose > 1 {
                let stats = self.codec.take_stats();
                tracing::info!(
                    allocated = stats.allocated,
                    freed = stats.freed,
                    "codec stats"
                );
            }
        }
    }

    /// Applies the exit-time lifecycle policy.
    ///
    /// Best effort: failures are logged and never change the exit code.
    pub fn apply_exit_policy(&mut self) {
        if self.config.policy.stop_on_exit() {
            tracing::info!(container = %self.container.name(), "stopping container");
            if let Err(e) = self.container.stop() {
                tracing::warn!(error = %e, "container stop failed");
            }
            if let Err(e) = self.container.wait_state(ContainerState::Stopped, None) {
                tracing::warn!(error = %e, "wait for stopped state failed");
            }
        }

        if self.config.policy.destroy_on_exit() {
            tracing::info!(container = %self.container.name(), "destroying container");
            if let Err(e) = self.container.destroy() {
                tracing::warn!(error = %e, "container destroy failed");
            }
        }
    }
}
