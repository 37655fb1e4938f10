//! Interactive component sessions for chat bots.
//!
//! A session is a message with buttons that only its owner can drive. Each
//! session runs as its own actor task, handles one activation at a time, can
//! open modal forms and wait on them, and retires itself with a single
//! terminal edit when it stops or times out.

pub mod apps;
pub mod config;
pub mod context;
pub mod control;
pub mod host;
pub mod modal;
pub mod session;

pub use context::AppContext;
pub use host::{SessionFactory, SessionHost, SessionLauncher};
