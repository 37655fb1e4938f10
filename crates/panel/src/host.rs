//! Session host: turns inbound platform events into sessions.
//!
//! The host provides:
//! - Trigger matching on inbound messages and session launch
//! - Routing of control activations to the owning session
//! - Routing of modal submissions to the waiting flow
//! - Gateway lifecycle logging and graceful shutdown

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use panel_protocol::{
    ActivationData, InboundEvent, InteractionRef, InteractionResponse, MessageCreatedData,
    ModalSubmitData, UserRef,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::control::parse_custom_id;
use crate::modal::ModalValues;
use crate::session::{Session, SessionConfig, SessionError, SessionHandle, SessionKind};

// ============================================================================
// Session Factory
// ============================================================================

/// Something that can open a session when its trigger is seen.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Exact message content that opens a session.
    fn trigger(&self) -> &str;

    /// Build, post and start a session for the author of `message`.
    async fn open(
        &self,
        app: &AppContext,
        message: &MessageCreatedData,
    ) -> Result<SessionHandle, SessionError>;
}

/// Factory that builds a fresh `K` for every trigger message.
pub struct SessionLauncher<K, F> {
    trigger: String,
    config: SessionConfig,
    build: F,
    _kind: PhantomData<fn() -> K>,
}

impl<K, F> SessionLauncher<K, F>
where
    K: SessionKind,
    F: Fn(&UserRef) -> K + Send + Sync + 'static,
{
    pub fn new(trigger: impl Into<String>, config: SessionConfig, build: F) -> Self {
        Self {
            trigger: trigger.into(),
            config,
            build,
            _kind: PhantomData,
        }
    }
}

#[async_trait]
impl<K, F> SessionFactory for SessionLauncher<K, F>
where
    K: SessionKind,
    F: Fn(&UserRef) -> K + Send + Sync + 'static,
{
    fn trigger(&self) -> &str {
        &self.trigger
    }

    async fn open(
        &self,
        app: &AppContext,
        message: &MessageCreatedData,
    ) -> Result<SessionHandle, SessionError> {
        let kind = (self.build)(&message.author);
        let session = Session::new(kind, message.author.clone(), self.config)?;
        session.open(&message.channel_id, app).await
    }
}

// ============================================================================
// Session Host
// ============================================================================

/// Listens to inbound events and drives sessions.
#[derive(Clone)]
pub struct SessionHost {
    app: AppContext,
    factories: Vec<Arc<dyn SessionFactory>>,
}

impl SessionHost {
    pub fn new(app: AppContext) -> Self {
        Self {
            app,
            factories: Vec::new(),
        }
    }

    /// Register a factory. The first factory whose trigger matches wins.
    pub fn register(&mut self, factory: Arc<dyn SessionFactory>) {
        info!(trigger = %factory.trigger(), "Session trigger registered");
        self.factories.push(factory);
    }

    pub fn with_factory(mut self, factory: impl SessionFactory + 'static) -> Self {
        self.register(Arc::new(factory));
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.app
    }

    /// Process events until the adapter shuts down or its channel closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<InboundEvent>) {
        let mut inflight = JoinSet::new();

        while let Some(event) = rx.recv().await {
            // Reap completed tasks
            while inflight.try_join_next().is_some() {}

            if !self.handle_event(event, &mut inflight) {
                break;
            }
        }

        while inflight.join_next().await.is_some() {}
        debug!("Session host event loop finished");
    }

    /// Drop every session queue and wait for the actors to stop.
    pub async fn shutdown(&self) {
        self.app.sessions.shutdown().await;
    }

    /// Returns false when the event loop should end.
    fn handle_event(&self, event: InboundEvent, inflight: &mut JoinSet<()>) -> bool {
        match event {
            InboundEvent::Ready { platform, version } => {
                info!(platform = %platform, version = %version, "Gateway ready");
            }

            InboundEvent::MessageCreated(data) => self.on_message(*data, inflight),

            InboundEvent::ControlActivated(data) => self.on_activation(*data, inflight),

            InboundEvent::ModalSubmitted(data) => self.on_modal_submit(*data, inflight),

            InboundEvent::Error {
                code,
                message,
                fatal,
            } => {
                if fatal {
                    error!(code = %code, message = %message, "Fatal gateway error");
                    return false;
                }
                warn!(code = %code, message = %message, "Gateway error");
            }

            InboundEvent::Shutdown { reason } => {
                info!(reason = %reason, "Gateway shutdown");
                return false;
            }
        }
        true
    }

    fn on_message(&self, data: MessageCreatedData, inflight: &mut JoinSet<()>) {
        if !data.is_human || data.content.is_empty() {
            return;
        }

        let Some(factory) = self
            .factories
            .iter()
            .find(|f| f.trigger() == data.content)
            .cloned()
        else {
            return;
        };

        debug!(
            trigger = %factory.trigger(),
            channel_id = %data.channel_id,
            user_id = %data.author.id,
            "Trigger matched"
        );

        let app = self.app.clone();
        inflight.spawn(async move {
            if let Err(e) = factory.open(&app, &data).await {
                error!(
                    trigger = %factory.trigger(),
                    channel_id = %data.channel_id,
                    error = %e,
                    "Failed to open session"
                );
            }
        });
    }

    fn on_activation(&self, data: ActivationData, inflight: &mut JoinSet<()>) {
        let handle = parse_custom_id(&data.custom_id)
            .and_then(|(session_id, _)| self.app.sessions.get(session_id));

        let Some(handle) = handle else {
            debug!(custom_id = %data.custom_id, "Activation for unknown session");
            self.acknowledge(data.interaction, inflight);
            return;
        };

        let interaction = data.interaction.clone();
        match handle.deliver(data) {
            Ok(()) => {}
            Err(SessionError::SessionExpired) => {
                debug!(session_id = %handle.id(), "Activation for ended session");
                self.acknowledge(interaction, inflight);
            }
            Err(e) => {
                warn!(session_id = %handle.id(), error = %e, "Dropping activation");
                self.acknowledge(interaction, inflight);
            }
        }
    }

    fn on_modal_submit(&self, data: ModalSubmitData, inflight: &mut JoinSet<()>) {
        let values = ModalValues::new(data.fields);
        if self.app.modals.resolve(&data.custom_id, values) {
            debug!(flow_id = %data.custom_id, user_id = %data.user.id, "Modal submitted");
        } else {
            debug!(flow_id = %data.custom_id, "Ignoring submission for unknown modal");
        }
        self.acknowledge(data.interaction, inflight);
    }

    fn acknowledge(&self, interaction: InteractionRef, inflight: &mut JoinSet<()>) {
        let transport = self.app.transport.clone();
        inflight.spawn(async move {
            if let Err(e) = transport
                .respond(&interaction, InteractionResponse::Acknowledge)
                .await
            {
                warn!(error = %e, "Failed to acknowledge interaction");
            }
        });
    }
}
