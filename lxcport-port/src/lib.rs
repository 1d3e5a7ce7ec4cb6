//! # lxcport-port
//!
//! Port process runtime for lxcport.
//!
//! This crate provides:
//! - A framed channel over blocking byte streams
//! - Command dispatch against a container resource handle
//! - The session loop with exit-time lifecycle policy
//! - Asynchronous event push from inside handlers

pub mod channel;
pub mod config;
pub mod container;
pub mod dispatch;
pub mod error;
pub mod session;

pub use channel::{FrameReader, FrameWriter};
pub use config::{Config, LifecyclePolicy};
pub use container::{Container, ContainerError, ContainerState, LxcContainer};
pub use dispatch::{Dispatcher, EventSink};
pub use error::PortError;
pub use session::{Port, Shutdown};
