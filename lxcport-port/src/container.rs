//! Container resource handle.
//!
//! The session loop and dispatcher operate on the [`Container`] trait so
//! the lifecycle backend stays swappable (real lxc tools in production, a
//! recording fake in tests). Exactly one handle exists per process run and
//! the session loop owns it exclusively.

use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Container runtime states, matching the lxc state names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Aborting,
    Freezing,
    Frozen,
    Thawed,
}

impl ContainerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerState::Stopped => "STOPPED",
            ContainerState::Starting => "STARTING",
            ContainerState::Running => "RUNNING",
            ContainerState::Stopping => "STOPPING",
            ContainerState::Aborting => "ABORTING",
            ContainerState::Freezing => "FREEZING",
            ContainerState::Frozen => "FROZEN",
            ContainerState::Thawed => "THAWED",
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerState {
    type Err = ContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STOPPED" => Ok(ContainerState::Stopped),
            "STARTING" => Ok(ContainerState::Starting),
            "RUNNING" => Ok(ContainerState::Running),
            "STOPPING" => Ok(ContainerState::Stopping),
            "ABORTING" => Ok(ContainerState::Aborting),
            "FREEZING" => Ok(ContainerState::Freezing),
            "FROZEN" => Ok(ContainerState::Frozen),
            "THAWED" => Ok(ContainerState::Thawed),
            other => Err(ContainerError::UnknownState(other.to_string())),
        }
    }
}

/// Errors from container lifecycle operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed ({status}): {stderr}")]
    CommandFailed {
        tool: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("unknown container state: {0}")]
    UnknownState(String),
}

/// The managed container lifecycle handle.
///
/// Mutated only from inside a single command's execution or the exit
/// policy; never aliased or stored elsewhere.
pub trait Container {
    /// Name of the managed container.
    fn name(&self) -> &str;

    /// Current runtime state.
    fn state(&mut self) -> Result<ContainerState, ContainerError>;

    /// Starts the container.
    fn start(&mut self) -> Result<(), ContainerError>;

    /// Stops the container.
    fn stop(&mut self) -> Result<(), ContainerError>;

    /// Destroys the container definition.
    fn destroy(&mut self) -> Result<(), ContainerError>;

    /// Blocks until the container reaches `target`. `None` waits
    /// indefinitely.
    fn wait_state(
        &mut self,
        target: ContainerState,
        timeout: Option<Duration>,
    ) -> Result<(), ContainerError>;

    fn is_running(&mut self) -> Result<bool, ContainerError> {
        Ok(self.state()? == ContainerState::Running)
    }
}

/// Container handle backed by the lxc command-line tools.
#[derive(Debug, Clone)]
pub struct LxcContainer {
    name: String,
    path: Option<PathBuf>,
    daemonize: bool,
    close_fds: bool,
}

impl LxcContainer {
    /// Opens a handle to an existing container.
    ///
    /// Fails when the container is not defined on this host, so a bad name
    /// is caught at startup rather than on the first command.
    pub fn new(name: impl Into<String>, path: Option<PathBuf>) -> Result<Self, ContainerError> {
        let container = Self {
            name: name.into(),
            path,
            daemonize: true,
            close_fds: true,
        };

        if container.run("lxc-info", &["-s"]).is_err() {
            return Err(ContainerError::NotFound(container.name));
        }
        Ok(container)
    }

    pub fn with_daemonize(mut self, daemonize: bool) -> Self {
        self.daemonize = daemonize;
        self
    }

    pub fn with_close_fds(mut self, close_fds: bool) -> Self {
        self.close_fds = close_fds;
        self
    }

    fn run(&self, tool: &'static str, args: &[&str]) -> Result<String, ContainerError> {
        let mut cmd = Command::new(tool);
        cmd.arg("-n").arg(&self.name);
        if let Some(ref path) = self.path {
            cmd.arg("-P").arg(path);
        }
        cmd.args(args);

        let output = cmd
            .output()
            .map_err(|source| ContainerError::Spawn { tool, source })?;

        if !output.status.success() {
            return Err(ContainerError::CommandFailed {
                tool,
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Container for LxcContainer {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&mut self) -> Result<ContainerState, ContainerError> {
        let out = self.run("lxc-info", &["-s", "-H"])?;
        out.trim().parse()
    }

    fn start(&mut self) -> Result<(), ContainerError> {
        let mut args: Vec<&str> = Vec::new();
        if self.daemonize {
            args.push("-d");
        }
        if self.close_fds {
            args.push("-C");
        }
        self.run("lxc-start", &args)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ContainerError> {
        self.run("lxc-stop", &["-k"])?;
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), ContainerError> {
        self.run("lxc-destroy", &[])?;
        Ok(())
    }

    fn wait_state(
        &mut self,
        target: ContainerState,
        timeout: Option<Duration>,
    ) -> Result<(), ContainerError> {
        let state = target.as_str();
        match timeout {
            Some(t) => {
                let secs = t.as_secs().max(1).to_string();
                self.run("lxc-wait", &["-s", state, "-t", &secs])?;
            }
            None => {
                self.run("lxc-wait", &["-s", state])?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parse_roundtrip() {
        for state in [
            ContainerState::Stopped,
            ContainerState::Starting,
            ContainerState::Running,
            ContainerState::Stopping,
            ContainerState::Aborting,
            ContainerState::Freezing,
            ContainerState::Frozen,
            ContainerState::Thawed,
        ] {
            assert_eq!(state.as_str().parse::<ContainerState>().unwrap(), state);
        }
    }

    #[test]
    fn test_state_parse_rejects_unknown() {
        let err = "LIMBO".parse::<ContainerState>().unwrap_err();
        assert!(matches!(err, ContainerError::UnknownState(s) if s == "LIMBO"));
    }

    #[test]
    fn test_missing_container_is_rejected_at_open() {
        // lxc-info on a name that cannot exist fails regardless of whether
        // the lxc tools are installed.
        let result = LxcContainer::new("lxcport-test-no-such-container", None);
        assert!(matches!(result, Err(ContainerError::NotFound(_))));
    }
}
