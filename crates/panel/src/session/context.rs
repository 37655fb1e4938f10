//! Per-activation context handed to control handlers.

use std::cmp;
use std::time::Duration;

use panel_protocol::{
    ActivationData, InteractionResponse, MessagePayload, MessageRef, Transport, WebhookPayload,
};
use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

use super::types::{SessionError, SessionState};
use crate::modal::{ModalFlow, ModalOutcome, ModalRouter};

/// What a handler can do while processing one activation.
///
/// Tracks whether the activation has been answered: the first reply is the
/// interaction response, later replies are private follow-ups, and a modal
/// can only be the first reply.
pub struct ActivationContext<'a> {
    session_id: &'a str,
    activation: &'a ActivationData,
    transport: &'a dyn Transport,
    modals: &'a ModalRouter,
    state: &'a watch::Sender<SessionState>,
    deadline: Instant,
    modal_timeout: Duration,
    responded: bool,
}

impl<'a> ActivationContext<'a> {
    pub(crate) fn new(
        session_id: &'a str,
        activation: &'a ActivationData,
        transport: &'a dyn Transport,
        modals: &'a ModalRouter,
        state: &'a watch::Sender<SessionState>,
        deadline: Instant,
        modal_timeout: Duration,
    ) -> Self {
        Self {
            session_id,
            activation,
            transport,
            modals,
            state,
            deadline,
            modal_timeout,
            responded: false,
        }
    }

    /// Reply with text only the acting user can see.
    pub async fn respond_privately(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.respond_privately_with(MessagePayload::text(text)).await
    }

    /// Reply with a payload only the acting user can see.
    pub async fn respond_privately_with(
        &mut self,
        payload: MessagePayload,
    ) -> Result<(), SessionError> {
        if self.responded {
            self.transport
                .follow_up(&self.activation.interaction, payload)
                .await?;
        } else {
            self.transport
                .respond(
                    &self.activation.interaction,
                    InteractionResponse::Message(payload),
                )
                .await?;
            self.responded = true;
        }
        Ok(())
    }

    /// Answer the activation without visible output, unless already answered.
    pub async fn acknowledge(&mut self) -> Result<(), SessionError> {
        if !self.responded {
            self.transport
                .respond(&self.activation.interaction, InteractionResponse::Acknowledge)
                .await?;
            self.responded = true;
        }
        Ok(())
    }

    /// Open `flow` and wait for it to resolve.
    ///
    /// The wait ends at the earlier of the modal timeout and the session
    /// deadline; either way it resolves as [`ModalOutcome::Abandoned`].
    pub async fn launch_modal<T>(
        &mut self,
        flow: &ModalFlow<T>,
    ) -> Result<ModalOutcome, SessionError> {
        if self.responded {
            return Err(SessionError::ModalAfterResponse);
        }

        let mut pending = self.modals.register();
        self.transport
            .respond(
                &self.activation.interaction,
                InteractionResponse::Modal(flow.payload(pending.id())),
            )
            .await?;
        self.responded = true;

        let limit = cmp::min(Instant::now() + self.modal_timeout, self.deadline);
        self.state.send_replace(SessionState::AwaitingModal);
        debug!(
            session_id = %self.session_id,
            flow_id = %pending.id(),
            title = %flow.title(),
            "Waiting for modal submission"
        );

        let outcome = tokio::select! {
            values = pending.submission() => match values {
                Some(values) => ModalOutcome::Submitted(values),
                None => ModalOutcome::Abandoned,
            },
            _ = sleep_until(limit) => ModalOutcome::Abandoned,
        };

        self.state.send_replace(SessionState::Active);
        debug!(
            session_id = %self.session_id,
            flow_id = %pending.id(),
            submitted = matches!(outcome, ModalOutcome::Submitted(_)),
            "Modal resolved"
        );
        Ok(outcome)
    }

    /// Execute a webhook and return the message it posted.
    pub async fn execute_webhook(
        &self,
        payload: WebhookPayload,
    ) -> Result<MessageRef, SessionError> {
        Ok(self.transport.execute_webhook(payload).await?)
    }
}
