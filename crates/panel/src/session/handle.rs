//! Session handle for communicating with a session actor.
//!
//! `SessionHandle` is a thin wrapper around the actor's activation queue and
//! its state watch. It is cheap to clone.

use panel_protocol::{ActivationData, UserRef};
use tokio::sync::{mpsc, watch};

use super::types::{SessionError, SessionState, StopReason};

/// Handle for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    owner: UserRef,
    tx: mpsc::Sender<ActivationData>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: String,
        owner: UserRef,
        tx: mpsc::Sender<ActivationData>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self {
            id,
            owner,
            tx,
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The only user allowed to drive this session.
    pub fn owner(&self) -> &UserRef {
        &self.owner
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Queue an activation without waiting for it to be processed.
    ///
    /// Activations are processed strictly in delivery order.
    pub fn deliver(&self, activation: ActivationData) -> Result<(), SessionError> {
        self.tx.try_send(activation).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SessionError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SessionError::SessionExpired,
        })
    }

    /// Wait until the session stops and return why.
    pub async fn stopped(&self) -> StopReason {
        let mut state = self.state.clone();
        loop {
            if let SessionState::Stopped(reason) = *state.borrow_and_update() {
                return reason;
            }
            if state.changed().await.is_err() {
                // Actor went away without reporting a terminal state
                return match *state.borrow() {
                    SessionState::Stopped(reason) => reason,
                    _ => StopReason::Error,
                };
            }
        }
    }
}
