//! Port process options.
//!
//! Options are parsed once at startup, frozen into a [`Config`] value, and
//! passed by reference into the session loop and exit-policy code. They
//! govern exit-time behavior and the diagnostics side channel, never the
//! per-message protocol.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What happens to the managed container when the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePolicy {
    /// Leave the container alone on exit.
    Permanent,
    /// Stop the container on exit but keep it defined.
    Transient,
    /// Stop and destroy the container on exit.
    #[default]
    Temporary,
}

impl LifecyclePolicy {
    pub fn stop_on_exit(self) -> bool {
        !matches!(self, LifecyclePolicy::Permanent)
    }

    pub fn destroy_on_exit(self) -> bool {
        matches!(self, LifecyclePolicy::Temporary)
    }
}

impl fmt::Display for LifecyclePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePolicy::Permanent => write!(f, "permanent"),
            LifecyclePolicy::Transient => write!(f, "transient"),
            LifecyclePolicy::Temporary => write!(f, "temporary"),
        }
    }
}

impl FromStr for LifecyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "permanent" => Ok(LifecyclePolicy::Permanent),
            "transient" => Ok(LifecyclePolicy::Transient),
            "temporary" => Ok(LifecyclePolicy::Temporary),
            other => Err(format!(
                "unknown lifecycle policy '{other}' (expected permanent, transient or temporary)"
            )),
        }
    }
}

/// Immutable process-wide options, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the managed container.
    pub name: String,
    /// Container storage path override.
    pub path: Option<PathBuf>,
    /// Error log redirection target.
    pub errlog: Option<PathBuf>,
    /// Exit-time lifecycle policy.
    pub policy: LifecyclePolicy,
    /// Start containers daemonized.
    pub daemonize: bool,
    /// Close inherited file descriptors when starting containers.
    pub close_fds: bool,
    /// Verbosity counter.
    pub verbose: u8,
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            errlog: None,
            policy: LifecyclePolicy::default(),
            daemonize: true,
            close_fds: true,
            verbose: 0,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_policy(mut self, policy: LifecyclePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }
}
