//! Per-session actor that serializes control activations.
//!
//! Each session gets a dedicated actor task that:
//! - Processes activations one at a time, in arrival order
//! - Owns the session's domain state (no locks)
//! - Races the next activation against the inactivity deadline
//! - Performs exactly one terminal edit when it stops

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use panel_protocol::{
    ActivationData, InteractionResponse, MessagePayload, MessageRef, Transport, UserRef,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use super::context::ActivationContext;
use super::handle::SessionHandle;
use super::kind::SessionKind;
use super::types::{
    CHANNEL_CAPACITY, Flow, SESSION_ID_PREFIX, SessionConfig, SessionError, SessionState,
    StopReason,
};
use crate::context::AppContext;
use crate::control::{ControlRegistry, parse_custom_id};
use crate::modal::ModalRouter;

// ============================================================================
// Session
// ============================================================================

/// A session that has been built but not yet started.
pub struct Session<K: SessionKind> {
    id: String,
    owner: UserRef,
    kind: K,
    controls: ControlRegistry<K::Action>,
    config: SessionConfig,
}

impl<K: SessionKind> Session<K> {
    /// Build a session for `owner`. Fails if two controls share a key.
    pub fn new(kind: K, owner: UserRef, config: SessionConfig) -> Result<Self, SessionError> {
        let controls = ControlRegistry::new(kind.controls())?;
        Ok(Self {
            id: format!("{}{}", SESSION_ID_PREFIX, Ulid::new()),
            owner,
            kind,
            controls,
            config,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> &UserRef {
        &self.owner
    }

    /// The message that carries this session's controls.
    pub fn render(&self) -> MessagePayload {
        let payload = match self.kind.initial_content() {
            Some(content) => MessagePayload::text(content),
            None => MessagePayload::default(),
        };
        payload.with_components(self.controls.render(&self.id))
    }

    /// Post the session message to `channel_id` and start the session.
    pub async fn open(
        self,
        channel_id: &str,
        app: &AppContext,
    ) -> Result<SessionHandle, SessionError> {
        let message = app
            .transport
            .send_message(channel_id, self.render())
            .await?;
        Ok(self.start(message, app).await)
    }

    /// Start the session bound to an already posted `message`.
    ///
    /// The deadline starts counting from this call.
    pub async fn start(self, message: MessageRef, app: &AppContext) -> SessionHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Active);
        let handle = SessionHandle::new(self.id.clone(), self.owner.clone(), tx, state_rx);

        let actor = SessionActor {
            deadline: Instant::now() + self.config.timeout,
            id: self.id,
            owner: self.owner,
            kind: self.kind,
            controls: self.controls,
            config: self.config,
            message,
            transport: app.transport.clone(),
            modals: app.modals.clone(),
            activation_rx: rx,
            state_tx,
        };

        app.sessions.spawn(handle.clone(), actor.run()).await;
        handle
    }
}

// ============================================================================
// Session Actor
// ============================================================================

struct SessionActor<K: SessionKind> {
    // Identity
    id: String,
    owner: UserRef,

    // State
    kind: K,
    controls: ControlRegistry<K::Action>,
    config: SessionConfig,
    message: MessageRef,
    deadline: Instant,

    // Collaborators
    transport: Arc<dyn Transport>,
    modals: ModalRouter,

    // Communication
    activation_rx: mpsc::Receiver<ActivationData>,
    state_tx: watch::Sender<SessionState>,
}

impl<K: SessionKind> SessionActor<K> {
    async fn run(mut self) -> StopReason {
        info!(
            session_id = %self.id,
            kind = self.kind.name(),
            owner = %self.owner.id,
            timeout_secs = self.config.timeout.as_secs(),
            "Session started"
        );

        let reason = self.event_loop().await;
        self.finish(reason).await;

        info!(session_id = %self.id, reason = ?reason, "Session stopped");
        reason
    }

    /// Process activations until a handler stops the session, the deadline
    /// passes, or every sender is gone.
    async fn event_loop(&mut self) -> StopReason {
        loop {
            let activation = tokio::select! {
                biased;

                _ = sleep_until(self.deadline) => {
                    debug!(session_id = %self.id, "Session deadline reached");
                    return StopReason::Timeout;
                }

                activation = self.activation_rx.recv() => match activation {
                    Some(activation) => activation,
                    None => {
                        debug!(session_id = %self.id, "Activation channel closed");
                        return StopReason::Explicit;
                    }
                },
            };

            if let Some(reason) = self.process(activation).await {
                return reason;
            }
        }
    }

    /// Handle one activation. Returns a stop reason when the session ends.
    async fn process(&mut self, activation: ActivationData) -> Option<StopReason> {
        if !activation.user.same_user(&self.owner) {
            let denied =
                SessionError::AuthorizationDenied(self.kind.unauthorized_notice().to_string());
            debug!(
                session_id = %self.id,
                user = %activation.user.id,
                "Rejecting activation from non-owner"
            );
            let notice = MessagePayload::text(denied.to_string());
            if let Err(e) = self
                .transport
                .respond(&activation.interaction, InteractionResponse::Message(notice))
                .await
            {
                warn!(session_id = %self.id, error = %e, "Failed to send unauthorized notice");
            }
            return None;
        }

        let action = parse_custom_id(&activation.custom_id)
            .and_then(|(_, key)| self.controls.action(key));
        let Some(action) = action else {
            warn!(
                session_id = %self.id,
                custom_id = %activation.custom_id,
                "Activation for unknown control"
            );
            acknowledge(self.transport.as_ref(), &self.id, &activation).await;
            return None;
        };

        self.deadline = Instant::now() + self.config.timeout;
        debug!(session_id = %self.id, action = ?action, "Handling activation");

        let mut ctx = ActivationContext::new(
            &self.id,
            &activation,
            self.transport.as_ref(),
            &self.modals,
            &self.state_tx,
            self.deadline,
            self.config.modal_timeout,
        );

        let result = AssertUnwindSafe(self.kind.handle(action, &mut ctx))
            .catch_unwind()
            .await;

        let flow = match result {
            Ok(Ok(flow)) => Ok(flow),
            Ok(Err(e)) if e.is_recoverable() => {
                debug!(session_id = %self.id, error = %e, "Handler reported a user error");
                ctx.respond_privately(e.to_string())
                    .await
                    .map(|_| Flow::Continue)
            }
            Ok(Err(e)) => Err(e),
            Err(panic) => {
                error!(
                    session_id = %self.id,
                    panic = panic_message(panic.as_ref()),
                    "Handler panicked"
                );
                let _ = ctx.acknowledge().await;
                return Some(StopReason::Error);
            }
        };

        let flow = match flow {
            Ok(flow) => ctx.acknowledge().await.map(|_| flow),
            Err(e) => Err(e),
        };

        match flow {
            Ok(Flow::Continue) => None,
            Ok(Flow::Stop) => Some(StopReason::Explicit),
            Err(e) => {
                error!(session_id = %self.id, error = %e, "Handler failed");
                let _ = ctx.acknowledge().await;
                Some(StopReason::Error)
            }
        }
    }

    /// Terminal edit, then answer anything still queued.
    async fn finish(&mut self, reason: StopReason) {
        let payload = MessagePayload {
            content: self.kind.on_stop(reason),
            ..MessagePayload::default()
        }
        .without_components();

        if let Err(e) = self.transport.edit_message(&self.message, payload).await {
            warn!(session_id = %self.id, error = %e, "Failed to apply terminal edit");
        }

        self.activation_rx.close();
        let mut drained = 0usize;
        while let Ok(activation) = self.activation_rx.try_recv() {
            acknowledge(self.transport.as_ref(), &self.id, &activation).await;
            drained += 1;
        }
        if drained > 0 {
            debug!(session_id = %self.id, count = drained, "Acknowledged queued activations");
        }

        self.state_tx.send_replace(SessionState::Stopped(reason));
    }
}

/// Answer an activation without visible output, logging any failure.
async fn acknowledge(transport: &dyn Transport, session_id: &str, activation: &ActivationData) {
    if let Err(e) = transport
        .respond(&activation.interaction, InteractionResponse::Acknowledge)
        .await
    {
        warn!(session_id = %session_id, error = %e, "Failed to acknowledge activation");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
