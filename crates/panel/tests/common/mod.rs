//! Common test utilities: a recording transport and a probe session kind.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use panel::control::{Control, custom_id};
use panel::modal::{ModalFlow, ModalOutcome};
use panel::session::{ActivationContext, Flow, SessionError, SessionKind};
use panel::AppContext;
use panel_protocol::{
    ActivationData, InteractionRef, InteractionResponse, MessagePayload, MessageRef, Transport,
    TransportError, UserRef, WebhookPayload,
};
use tokio::sync::mpsc;

// ============================================================================
// Recording Transport
// ============================================================================

/// One outbound call seen by the transport.
#[derive(Debug, Clone)]
pub enum Call {
    Send {
        channel_id: String,
        payload: MessagePayload,
    },
    Edit {
        message: MessageRef,
        payload: MessagePayload,
    },
    Respond {
        interaction_id: String,
        response: InteractionResponse,
    },
    FollowUp {
        interaction_id: String,
        payload: MessagePayload,
    },
    Webhook(WebhookPayload),
}

/// Transport that records every call and reports it on a channel.
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    notify: mpsc::UnboundedSender<Call>,
    fail_private_replies: AtomicBool,
    fail_webhooks: AtomicBool,
    next_id: AtomicU64,
}

impl RecordingTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Call>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            notify,
            fail_private_replies: AtomicBool::new(false),
            fail_webhooks: AtomicBool::new(false),
            next_id: AtomicU64::new(1000),
        });
        (transport, rx)
    }

    /// Make private replies (responses with a message, follow-ups) fail.
    pub fn fail_private_replies(&self) {
        self.fail_private_replies.store(true, Ordering::SeqCst);
    }

    /// Make webhook executions fail.
    pub fn fail_webhooks(&self) {
        self.fail_webhooks.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Payloads of every message edit.
    pub fn edits(&self) -> Vec<MessagePayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Edit { payload, .. } => Some(payload),
                _ => None,
            })
            .collect()
    }

    /// Responses sent for one interaction.
    pub fn responses_to(&self, interaction_id: &str) -> Vec<InteractionResponse> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Respond {
                    interaction_id: id,
                    response,
                } if id == interaction_id => Some(response),
                _ => None,
            })
            .collect()
    }

    pub fn webhooks(&self) -> Vec<WebhookPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Webhook(payload) => Some(payload),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call.clone());
        let _ = self.notify.send(call);
    }

    fn next_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(
        &self,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<MessageRef, TransportError> {
        self.record(Call::Send {
            channel_id: channel_id.to_string(),
            payload,
        });
        Ok(MessageRef {
            channel_id: channel_id.to_string(),
            message_id: self.next_id(),
        })
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError> {
        self.record(Call::Edit {
            message: message.clone(),
            payload,
        });
        Ok(())
    }

    async fn respond(
        &self,
        interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), TransportError> {
        let is_message = matches!(response, InteractionResponse::Message(_));
        self.record(Call::Respond {
            interaction_id: interaction.id.clone(),
            response,
        });
        if is_message && self.fail_private_replies.load(Ordering::SeqCst) {
            return Err(TransportError::Platform("reply rejected".to_string()));
        }
        Ok(())
    }

    async fn follow_up(
        &self,
        interaction: &InteractionRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError> {
        self.record(Call::FollowUp {
            interaction_id: interaction.id.clone(),
            payload,
        });
        if self.fail_private_replies.load(Ordering::SeqCst) {
            return Err(TransportError::Platform("reply rejected".to_string()));
        }
        Ok(())
    }

    async fn execute_webhook(&self, payload: WebhookPayload) -> Result<MessageRef, TransportError> {
        self.record(Call::Webhook(payload));
        if self.fail_webhooks.load(Ordering::SeqCst) {
            return Err(TransportError::Platform("webhook rejected".to_string()));
        }
        Ok(MessageRef {
            channel_id: "777".to_string(),
            message_id: self.next_id(),
        })
    }
}

/// App context over a fresh recording transport.
pub fn test_app() -> (AppContext, Arc<RecordingTransport>, mpsc::UnboundedReceiver<Call>) {
    let (transport, rx) = RecordingTransport::new();
    (AppContext::new(transport.clone()), transport, rx)
}

/// Wait for the next call matching `pred`, skipping others.
pub async fn wait_for(
    rx: &mut mpsc::UnboundedReceiver<Call>,
    pred: impl Fn(&Call) -> bool,
) -> Call {
    loop {
        let call = rx.recv().await.expect("transport dropped");
        if pred(&call) {
            return call;
        }
    }
}

/// Wait until `interaction_id` receives a response.
pub async fn wait_for_response(
    rx: &mut mpsc::UnboundedReceiver<Call>,
    interaction_id: &str,
) -> InteractionResponse {
    match wait_for(rx, |c| {
        matches!(c, Call::Respond { interaction_id: id, .. } if id == interaction_id)
    })
    .await
    {
        Call::Respond { response, .. } => response,
        _ => unreachable!(),
    }
}

// ============================================================================
// Fixtures
// ============================================================================

pub fn owner() -> UserRef {
    UserRef::new("100")
}

pub fn stranger() -> UserRef {
    UserRef::new("200")
}

pub fn session_message() -> MessageRef {
    MessageRef {
        channel_id: "42".to_string(),
        message_id: "1".to_string(),
    }
}

/// An activation of `key` on `session_id` by `user`.
pub fn activation(
    session_id: &str,
    key: &str,
    user: UserRef,
    interaction_id: &str,
) -> ActivationData {
    ActivationData {
        interaction: InteractionRef {
            id: interaction_id.to_string(),
            token: format!("token-{interaction_id}"),
        },
        channel_id: "42".to_string(),
        message_id: "1".to_string(),
        custom_id: custom_id(session_id, key),
        user,
    }
}

// ============================================================================
// Probe Session Kind
// ============================================================================

pub type Log = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAction {
    /// Records "bump" and answers nothing.
    Bump,
    /// Opens a one-field modal and records the outcome.
    Ask,
    /// Replies privately with "pong".
    Reply,
    /// Replies privately, then tries to open a modal.
    ReplyThenAsk,
    /// Fails with a user-facing error.
    Reject,
    /// Fails with a transport error.
    Fail,
    Panic,
    Stop,
}

/// Session kind that records what its handlers did.
pub struct Probe {
    log: Log,
    name: Option<String>,
}

impl Probe {
    pub fn new() -> (Self, Log) {
        let log = Log::default();
        (
            Self {
                log: log.clone(),
                name: None,
            },
            log,
        )
    }

    fn record(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn name_form(&self) -> ModalFlow<Probe> {
        ModalFlow::<Probe>::new("Name").field("name", "Name", self.name.as_deref(), |p, v| {
            p.name = Some(v)
        })
    }
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[async_trait]
impl SessionKind for Probe {
    type Action = ProbeAction;

    fn name(&self) -> &'static str {
        "probe"
    }

    fn controls(&self) -> Vec<Control<ProbeAction>> {
        vec![
            Control::new("bump", ProbeAction::Bump).label("Bump"),
            Control::new("ask", ProbeAction::Ask).label("Ask"),
            Control::new("reply", ProbeAction::Reply).label("Reply"),
            Control::new("reply_then_ask", ProbeAction::ReplyThenAsk),
            Control::new("reject", ProbeAction::Reject),
            Control::new("fail", ProbeAction::Fail),
            Control::new("panic", ProbeAction::Panic),
            Control::new("stop", ProbeAction::Stop).label("Stop"),
        ]
    }

    fn initial_content(&self) -> Option<String> {
        Some("Probe".to_string())
    }

    async fn handle(
        &mut self,
        action: ProbeAction,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Flow, SessionError> {
        match action {
            ProbeAction::Bump => self.record("bump"),
            ProbeAction::Ask => {
                self.record("ask:start");
                let form = self.name_form();
                match ctx.launch_modal(&form).await? {
                    ModalOutcome::Submitted(values) => {
                        form.apply(self, &values);
                        let name = self.name.clone().unwrap_or_default();
                        self.record(format!("ask:submitted:{name}"));
                    }
                    ModalOutcome::Abandoned => self.record("ask:abandoned"),
                }
            }
            ProbeAction::Reply => {
                ctx.respond_privately("pong").await?;
                self.record("reply");
            }
            ProbeAction::ReplyThenAsk => {
                ctx.respond_privately("pong").await?;
                let form = self.name_form();
                ctx.launch_modal(&form).await?;
            }
            ProbeAction::Reject => {
                return Err(SessionError::InvalidTarget("nope".to_string()));
            }
            ProbeAction::Fail => {
                return Err(TransportError::Platform("boom".to_string()).into());
            }
            ProbeAction::Panic => panic!("probe panicked"),
            ProbeAction::Stop => {
                self.record("stop");
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }
}
