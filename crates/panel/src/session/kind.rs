//! The trait a session type implements.

use std::fmt;

use async_trait::async_trait;

use super::context::ActivationContext;
use super::types::{
    DEFAULT_UNAUTHORIZED_NOTICE, ERROR_NOTICE, Flow, SessionError, StopReason, TIMED_OUT_NOTICE,
};
use crate::control::Control;

/// Behavior of one kind of interactive session.
///
/// The implementing value is the session's domain state. The session actor
/// owns it exclusively and calls [`handle`](SessionKind::handle) for one
/// activation at a time.
#[async_trait]
pub trait SessionKind: Send + 'static {
    /// Action bound to each control.
    type Action: Copy + fmt::Debug + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Controls shown on the session message. Keys must be unique.
    fn controls(&self) -> Vec<Control<Self::Action>>;

    /// Text posted alongside the controls.
    fn initial_content(&self) -> Option<String> {
        None
    }

    /// Private reply for users other than the owner.
    fn unauthorized_notice(&self) -> &str {
        DEFAULT_UNAUTHORIZED_NOTICE
    }

    /// Run the handler for `action` on behalf of the owner.
    async fn handle(
        &mut self,
        action: Self::Action,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Flow, SessionError>;

    /// Text for the terminal edit, called exactly once when the session
    /// stops. `None` keeps the message text; controls are always removed.
    fn on_stop(&self, reason: StopReason) -> Option<String> {
        match reason {
            StopReason::Explicit => None,
            StopReason::Timeout => Some(TIMED_OUT_NOTICE.to_string()),
            StopReason::Error => Some(ERROR_NOTICE.to_string()),
        }
    }
}
