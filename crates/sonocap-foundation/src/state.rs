use crate::error::StateError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Lifecycle of one capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Running,
    Stopping,
    Stopped,
}

/// Shared, validated session state. Transitions outside the allowed set are
/// rejected rather than silently applied; every accepted transition is
/// broadcast to subscribers.
pub struct SessionStateCell {
    state: Arc<RwLock<SessionState>>,
    state_tx: Sender<SessionState>,
    state_rx: Receiver<SessionState>,
}

impl Default for SessionStateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateCell {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(SessionState::Uninitialized)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: SessionState) -> Result<(), StateError> {
        let mut current = self.state.write();

        let valid = matches!(
            (*current, new_state),
            (SessionState::Uninitialized, SessionState::Initialized)
                | (SessionState::Initialized, SessionState::Running)
                | (SessionState::Initialized, SessionState::Stopped)
                | (SessionState::Running, SessionState::Stopping)
                | (SessionState::Running, SessionState::Stopped)
                | (SessionState::Stopping, SessionState::Stopped)
        );

        if !valid {
            return Err(StateError::InvalidTransition {
                from: *current,
                to: new_state,
            });
        }

        tracing::info!("Session state: {:?} -> {:?}", *current, new_state);
        *current = new_state;
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        *self.state.read()
    }

    pub fn subscribe(&self) -> Receiver<SessionState> {
        self.state_rx.clone()
    }
}
