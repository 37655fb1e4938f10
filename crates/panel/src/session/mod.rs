//! Interactive sessions bound to one message and one owner.
//!
//! # Architecture
//!
//! ```text
//!  ┌─────────────────┐        ┌───────────────┐
//!  │ SessionRegistry │──owns──▶ SessionActor  │  (one per session, runs in a tokio task)
//!  │  (ID → Handle)  │        │  owns the     │
//!  └────────┬────────┘        │  SessionKind  │
//!           │                 │  state        │
//!           │ clone           └───────▲───────┘
//!           ▼                         │ activations (mpsc)
//!  ┌─────────────────┐                │
//!  │  SessionHandle  │────────────────┘  (cheap cloneable sender)
//!  └─────────────────┘
//! ```
//!
//! - **SessionActor**: owns the session's domain state; processes activations
//!   sequentially and races them against the inactivity deadline.
//! - **SessionHandle**: cloneable reference used by the host to route
//!   activations and observe the session's state.
//! - **SessionRegistry**: maps session ids to handles for as long as the
//!   actor runs.

mod actor;
mod context;
mod handle;
mod kind;
mod registry;
mod types;

pub use actor::Session;
pub use context::ActivationContext;
pub use handle::SessionHandle;
pub use kind::SessionKind;
pub use registry::SessionRegistry;
pub use types::{
    CHANNEL_CAPACITY, DEFAULT_MODAL_TIMEOUT, DEFAULT_SESSION_TIMEOUT,
    DEFAULT_UNAUTHORIZED_NOTICE, ERROR_NOTICE, Flow, SESSION_ID_PREFIX, SessionConfig,
    SessionError, SessionState, StopReason, TIMED_OUT_NOTICE,
};
