//! Command dispatch.
//!
//! A dispatcher maps a numeric command tag plus a decoded argument term to
//! a handler operating on the container handle. Command-level failures,
//! including an unknown tag, become structured error replies; only an I/O
//! failure while pushing an event escalates out of a handler.

use crate::container::{Container, ContainerState};
use crate::error::PortError;
use lxcport_protocol::Term;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

/// Command tags understood by the stock dispatcher.
pub mod command {
    pub const NAME: u16 = 1;
    pub const STATE: u16 = 2;
    pub const START: u16 = 3;
    pub const STOP: u16 = 4;
    pub const DESTROY: u16 = 5;
    pub const RUNNING: u16 = 6;
    pub const WAIT: u16 = 7;
}

/// Reply term constructors shared by all handlers.
pub mod reply {
    use super::*;

    pub fn ok(value: Term) -> Term {
        json!({ "ok": value })
    }

    pub fn error(reason: impl Into<String>) -> Term {
        json!({ "error": reason.into() })
    }
}

/// Sink for asynchronous event frames pushed mid-dispatch.
///
/// Events go out through the same single-writer channel as replies, so
/// everything pushed during a dispatch is on the stream before that
/// dispatch's synchronous reply.
pub trait EventSink {
    fn push(&mut self, event: &Term) -> Result<(), PortError>;
}

/// A command handler. Returns the reply term; an `Err` means no reply
/// could be produced at all and the session must end.
pub type Handler = fn(&mut dyn Container, &Term, &mut dyn EventSink) -> Result<Term, PortError>;

/// Registry of command handlers.
pub struct Dispatcher {
    handlers: HashMap<u16, Handler>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Creates a dispatcher with the container lifecycle command set.
    pub fn with_container_commands() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(command::NAME, handle_name);
        dispatcher.register(command::STATE, handle_state);
        dispatcher.register(command::START, handle_start);
        dispatcher.register(command::STOP, handle_stop);
        dispatcher.register(command::DESTROY, handle_destroy);
        dispatcher.register(command::RUNNING, handle_running);
        dispatcher.register(command::WAIT, handle_wait);
        dispatcher
    }

    pub fn register(&mut self, tag: u16, handler: Handler) {
        self.handlers.insert(tag, handler);
    }

    /// Dispatches one command against the container handle.
    ///
    /// An unknown tag is a handled case: the peer gets a well-formed error
    /// reply and the session continues.
    pub fn dispatch(
        &self,
        tag: u16,
        arg: &Term,
        container: &mut dyn Container,
        events: &mut dyn EventSink,
    ) -> Result<Term, PortError> {
        match self.handlers.get(&tag) {
            Some(handler) => handler(container, arg, events),
            None => {
                tracing::debug!(command = tag, "unsupported command");
                Ok(reply::error("unsupported_command"))
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn handle_name(
    container: &mut dyn Container,
    _arg: &Term,
    _events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    Ok(reply::ok(json!(container.name())))
}

fn handle_state(
    container: &mut dyn Container,
    _arg: &Term,
    _events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    match container.state() {
        Ok(state) => Ok(reply::ok(json!(state.as_str()))),
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

fn handle_start(
    container: &mut dyn Container,
    _arg: &Term,
    events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    match container.start() {
        Ok(()) => {
            events.push(&json!({ "event": "start", "name": container.name() }))?;
            Ok(reply::ok(json!(true)))
        }
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

fn handle_stop(
    container: &mut dyn Container,
    _arg: &Term,
    events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    match container.stop() {
        Ok(()) => {
            events.push(&json!({ "event": "stop", "name": container.name() }))?;
            Ok(reply::ok(json!(true)))
        }
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

fn handle_destroy(
    container: &mut dyn Container,
    _arg: &Term,
    _events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    match container.destroy() {
        Ok(()) => Ok(reply::ok(json!(true))),
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

fn handle_running(
    container: &mut dyn Container,
    _arg: &Term,
    _events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    match container.is_running() {
        Ok(running) => Ok(reply::ok(json!(running))),
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

fn handle_wait(
    container: &mut dyn Container,
    arg: &Term,
    _events: &mut dyn EventSink,
) -> Result<Term, PortError> {
    // Accepts "STOPPED" or {"state": "STOPPED", "timeout": secs}.
    let (state_str, timeout) = match arg {
        Term::String(s) => (s.as_str(), None),
        Term::Object(map) => {
            let Some(state) = map.get("state").and_then(Term::as_str) else {
                return Ok(reply::error("badarg"));
            };
            let timeout = map
                .get("timeout")
                .and_then(Term::as_u64)
                .map(Duration::from_secs);
            (state, timeout)
        }
        _ => return Ok(reply::error("badarg")),
    };

    let target: ContainerState = match state_str.parse() {
        Ok(s) => s,
        Err(e) => return Ok(reply::error(e.to_string())),
    };

    match container.wait_state(target, timeout) {
        Ok(()) => Ok(reply::ok(json!(target.as_str()))),
        Err(e) => Ok(reply::error(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerError;

    /// In-memory container recording every lifecycle call.
    struct FakeContainer {
        name: String,
        state: ContainerState,
        calls: Vec<String>,
        fail_next: bool,
    }

    impl FakeContainer {
        fn new() -> Self {
            Self {
                name: "vm1".to_string(),
                state: ContainerState::Stopped,
                calls: Vec::new(),
                fail_next: false,
            }
        }

        fn failure(&mut self) -> ContainerError {
            ContainerError::Spawn {
                tool: "lxc-start",
                source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            }
        }
    }

    impl Container for FakeContainer {
        fn name(&self) -> &str {
            &self.name
        }

        fn state(&mut self) -> Result<ContainerState, ContainerError> {
            self.calls.push("state".to_string());
            Ok(self.state)
        }

        fn start(&mut self) -> Result<(), ContainerError> {
            self.calls.push("start".to_string());
            if self.fail_next {
                return Err(self.failure());
            }
            self.state = ContainerState::Running;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ContainerError> {
            self.calls.push("stop".to_string());
            self.state = ContainerState::Stopped;
            Ok(())
        }

        fn destroy(&mut self) -> Result<(), ContainerError> {
            self.calls.push("destroy".to_string());
            Ok(())
        }

        fn wait_state(
            &mut self,
            target: ContainerState,
            _timeout: Option<Duration>,
        ) -> Result<(), ContainerError> {
            self.calls.push(format!("wait:{target}"));
            Ok(())
        }
    }

    struct CollectSink(Vec<Term>);

    impl EventSink for CollectSink {
        fn push(&mut self, event: &Term) -> Result<(), PortError> {
            self.0.push(event.clone());
            Ok(())
        }
    }

    fn dispatch_one(tag: u16, arg: Term, container: &mut FakeContainer) -> (Term, Vec<Term>) {
        let dispatcher = Dispatcher::with_container_commands();
        let mut sink = CollectSink(Vec::new());
        let reply = dispatcher
            .dispatch(tag, &arg, container, &mut sink)
            .unwrap();
        (reply, sink.0)
    }

    #[test]
    fn test_name_command() {
        let mut container = FakeContainer::new();
        let (reply, _) = dispatch_one(command::NAME, Term::Null, &mut container);
        assert_eq!(reply, json!({"ok": "vm1"}));
    }

    #[test]
    fn test_state_command() {
        let mut container = FakeContainer::new();
        let (reply, _) = dispatch_one(command::STATE, Term::Null, &mut container);
        assert_eq!(reply, json!({"ok": "STOPPED"}));
    }

    #[test]
    fn test_start_pushes_event_before_reply() {
        let mut container = FakeContainer::new();
        let (reply, events) = dispatch_one(command::START, Term::Null, &mut container);
        assert_eq!(reply, json!({"ok": true}));
        assert_eq!(events, vec![json!({"event": "start", "name": "vm1"})]);
        assert_eq!(container.state, ContainerState::Running);
    }

    #[test]
    fn test_start_failure_is_error_reply_not_fault() {
        let mut container = FakeContainer::new();
        container.fail_next = true;
        let (reply, events) = dispatch_one(command::START, Term::Null, &mut container);
        assert!(reply.get("error").is_some());
        assert!(events.is_empty());
    }

    #[test]
    fn test_running_command() {
        let mut container = FakeContainer::new();
        let (reply, _) = dispatch_one(command::RUNNING, Term::Null, &mut container);
        assert_eq!(reply, json!({"ok": false}));

        container.state = ContainerState::Running;
        let (reply, _) = dispatch_one(command::RUNNING, Term::Null, &mut container);
        assert_eq!(reply, json!({"ok": true}));
    }

    #[test]
    fn test_wait_command_forms() {
        let mut container = FakeContainer::new();

        let (reply, _) = dispatch_one(command::WAIT, json!("STOPPED"), &mut container);
        assert_eq!(reply, json!({"ok": "STOPPED"}));

        let (reply, _) = dispatch_one(
            command::WAIT,
            json!({"state": "RUNNING", "timeout": 5}),
            &mut container,
        );
        assert_eq!(reply, json!({"ok": "RUNNING"}));

        let (reply, _) = dispatch_one(command::WAIT, json!(42), &mut container);
        assert_eq!(reply, json!({"error": "badarg"}));

        let (reply, _) = dispatch_one(command::WAIT, json!({"state": "LIMBO"}), &mut container);
        assert!(reply.get("error").is_some());
    }

    #[test]
    fn test_default_dispatcher_is_empty() {
        // Default mirrors new(): no handlers registered, so even a
        // container command tag comes back unsupported.
        let dispatcher = Dispatcher::default();
        let mut container = FakeContainer::new();
        let mut sink = CollectSink(Vec::new());
        let reply = dispatcher
            .dispatch(command::NAME, &Term::Null, &mut container, &mut sink)
            .unwrap();
        assert_eq!(reply, json!({"error": "unsupported_command"}));
        assert!(container.calls.is_empty());
    }

    #[test]
    fn test_unknown_command_is_error_reply() {
        let mut container = FakeContainer::new();
        let (reply, _) = dispatch_one(0xBEEF, Term::Null, &mut container);
        assert_eq!(reply, json!({"error": "unsupported_command"}));
        assert!(container.calls.is_empty());
    }
}
