//! Session state, configuration and error types.

use std::time::Duration;

use panel_protocol::TransportError;
use thiserror::Error;

/// Prefix for session ids.
pub const SESSION_ID_PREFIX: &str = "ses_";

/// Capacity of each session's activation queue.
pub const CHANNEL_CAPACITY: usize = 32;

/// Default inactivity timeout for a session.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(240);

/// Default upper bound on a modal wait.
pub const DEFAULT_MODAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Terminal text used when a session times out.
pub const TIMED_OUT_NOTICE: &str = "Timed out!";

/// Terminal text used when a session stops on a fault.
pub const ERROR_NOTICE: &str = "Something went wrong!";

/// Private reply sent to anyone but the session owner.
pub const DEFAULT_UNAUTHORIZED_NOTICE: &str = "You can't use these buttons!";

// ============================================================================
// State
// ============================================================================

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A handler asked to stop, or the host shut down.
    Explicit,
    /// The deadline passed without activity.
    Timeout,
    /// A handler or transport call failed.
    Error,
}

/// Observable lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    /// A handler is waiting on a modal submission.
    AwaitingModal,
    Stopped(StopReason),
}

impl SessionState {
    pub fn is_stopped(&self) -> bool {
        matches!(self, SessionState::Stopped(_))
    }
}

/// What the session should do after a handler returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

// ============================================================================
// Configuration
// ============================================================================

/// Per-session timing.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Inactivity timeout; each authorized activation pushes the deadline out.
    pub timeout: Duration,
    /// Upper bound on a single modal wait (also capped by the deadline).
    pub modal_timeout: Duration,
}

impl SessionConfig {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            modal_timeout: DEFAULT_MODAL_TIMEOUT,
        }
    }

    pub fn with_modal_timeout(mut self, modal_timeout: Duration) -> Self {
        self.modal_timeout = modal_timeout;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while building or running a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Someone other than the owner activated a control.
    #[error("{0}")]
    AuthorizationDenied(String),

    /// The handler's target is missing or malformed; the text is shown to the user.
    #[error("{0}")]
    InvalidTarget(String),

    /// The session has already stopped.
    #[error("session has expired")]
    SessionExpired,

    /// The session's activation queue is full.
    #[error("session is busy")]
    QueueFull,

    /// Two controls share a key.
    #[error("duplicate control key: {0}")]
    DuplicateControl(String),

    /// A modal was launched after the activation had been answered.
    #[error("modal launched after the activation was answered")]
    ModalAfterResponse,

    /// An outbound platform call failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Recoverable errors are reported privately and the session continues.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::AuthorizationDenied(_) | SessionError::InvalidTarget(_)
        )
    }
}
