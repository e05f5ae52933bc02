//! Consumption abstraction and lifecycle tracking.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::ConsumedEventContext;
use crate::error::{HandlerError, MessagingError, Result};

/// Handler invoked once per normalized consumed event.
///
/// Live consumption and replay share this exact signature, so decode/apply
/// logic is written once and redelivery safety rests entirely on the
/// handler's idempotency.
#[async_trait]
pub trait ConsumedEventHandler: Send + Sync {
    async fn handle(
        &self,
        context: ConsumedEventContext,
    ) -> std::result::Result<(), HandlerError>;
}

/// Long-running receive loop over one transport.
///
/// The at-least-once contract lives here: durable progress (checkpoint or
/// offset commit) advances only after the handler completes, so a crash in
/// between causes redelivery rather than loss. Handler failures are not
/// swallowed — they are logged with partition/offset context and terminate
/// the loop, surfacing poison messages to an operator instead of silently
/// spinning past them.
#[async_trait]
pub trait EventConsumer: Send + Sync {
    /// Runs until the token is cancelled or the handler fails.
    ///
    /// In-flight handler work is drained before the loop exits; no new
    /// message is pulled after cancellation is observed. A consumer instance
    /// runs once: `Stopped` is terminal.
    async fn run(
        &self,
        handler: std::sync::Arc<dyn ConsumedEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// Consumption loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    NotStarted,
    Running,
    Draining,
    Stopped,
}

/// Shared lifecycle guard used by both transport adapters.
///
/// Enforces the `NotStarted → Running → Draining → Stopped` progression and
/// rejects a second start.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<ConsumerState>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConsumerState::NotStarted),
        }
    }

    /// Transitions into `Running`; fails unless currently `NotStarted`.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock().expect("lifecycle lock poisoned");
        if *state != ConsumerState::NotStarted {
            return Err(MessagingError::AlreadyStarted);
        }
        *state = ConsumerState::Running;
        Ok(())
    }

    /// Marks the loop as draining after a stop request was observed.
    pub fn draining(&self) {
        let mut state = self.state.lock().expect("lifecycle lock poisoned");
        if *state == ConsumerState::Running {
            *state = ConsumerState::Draining;
        }
    }

    /// Marks the loop as terminally stopped.
    pub fn stopped(&self) {
        *self.state.lock().expect("lifecycle lock poisoned") = ConsumerState::Stopped;
    }

    /// Returns the current state.
    pub fn state(&self) -> ConsumerState {
        *self.state.lock().expect("lifecycle lock poisoned")
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_state_machine() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), ConsumerState::NotStarted);

        lifecycle.start().unwrap();
        assert_eq!(lifecycle.state(), ConsumerState::Running);

        lifecycle.draining();
        assert_eq!(lifecycle.state(), ConsumerState::Draining);

        lifecycle.stopped();
        assert_eq!(lifecycle.state(), ConsumerState::Stopped);
    }

    #[test]
    fn second_start_is_rejected() {
        let lifecycle = Lifecycle::new();
        lifecycle.start().unwrap();
        assert!(matches!(
            lifecycle.start(),
            Err(MessagingError::AlreadyStarted)
        ));
    }

    #[test]
    fn stopped_is_terminal() {
        let lifecycle = Lifecycle::new();
        lifecycle.start().unwrap();
        lifecycle.stopped();
        assert!(matches!(
            lifecycle.start(),
            Err(MessagingError::AlreadyStarted)
        ));
        assert_eq!(lifecycle.state(), ConsumerState::Stopped);
    }

    #[test]
    fn draining_only_applies_to_a_running_loop() {
        let lifecycle = Lifecycle::new();
        lifecycle.draining();
        assert_eq!(lifecycle.state(), ConsumerState::NotStarted);
    }
}
