//! Protocol types shared between Panel and its platform adapters.
//!
//! This crate defines what flows across the platform boundary:
//!
//! - **Events** (platform → Panel): messages, control activations, modal submissions
//! - **Payloads** (Panel → platform): messages, modals, webhook executions
//! - [`Transport`]: the outbound calls a platform adapter must implement
//!
//! Events are plain serde types so an adapter can live in-process (Rust
//! channels) or be logged/replayed as JSON Lines.
//!
//! # Example: feeding an event
//!
//! ```ignore
//! use panel_protocol::{InboundEvent, MessageCreatedData, UserRef};
//!
//! let event = InboundEvent::MessageCreated(Box::new(MessageCreatedData {
//!     message_id: "1".to_string(),
//!     channel_id: "42".to_string(),
//!     author: UserRef::new("7"),
//!     is_human: true,
//!     content: "rps".to_string(),
//!     timestamp: None,
//! }));
//! event_tx.send(event).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Events (platform → Panel)
// ============================================================================

/// Events delivered by a platform adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Adapter is connected and delivering events.
    Ready { platform: String, version: String },

    /// A message was posted in a channel the bot can see.
    MessageCreated(Box<MessageCreatedData>),

    /// A user clicked a control rendered by Panel.
    ControlActivated(Box<ActivationData>),

    /// A user submitted a modal form opened by Panel.
    ModalSubmitted(Box<ModalSubmitData>),

    /// Adapter-level error (not tied to a specific call).
    Error {
        code: String,
        message: String,
        /// Whether the adapter has stopped delivering events.
        #[serde(default)]
        fatal: bool,
    },

    /// Adapter is shutting down.
    Shutdown { reason: String },
}

/// Data for a message creation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreatedData {
    pub message_id: String,
    pub channel_id: String,
    pub author: UserRef,
    /// False for bots, webhooks and system messages.
    pub is_human: bool,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Data for a control activation (button click).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationData {
    pub interaction: InteractionRef,
    pub channel_id: String,
    /// Message the clicked control is attached to.
    pub message_id: String,
    /// Custom id of the clicked control, as rendered by Panel.
    pub custom_id: String,
    /// User who clicked.
    pub user: UserRef,
}

/// Data for a modal submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalSubmitData {
    pub interaction: InteractionRef,
    /// Custom id of the modal, as rendered by Panel.
    pub custom_id: String,
    pub user: UserRef,
    /// Submitted inputs in display order.
    #[serde(default)]
    pub fields: Vec<SubmittedField>,
}

/// One submitted modal input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedField {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

impl SubmittedField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A platform user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl UserRef {
    /// Create a user reference with no display name.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// Whether both references point at the same platform user.
    pub fn same_user(&self, other: &UserRef) -> bool {
        self.id == other.id
    }
}

/// Handle for answering an interaction (activation or modal submission).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRef {
    pub id: String,
    pub token: String,
}

/// Reference to a posted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

// ============================================================================
// Payloads (Panel → platform)
// ============================================================================

/// Visual style of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    #[default]
    Secondary,
    Success,
    Danger,
}

/// A clickable button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub custom_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    #[serde(default)]
    pub style: ButtonStyle,
}

/// A rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// Content of a message to send, edit, or answer privately with.
///
/// `components: None` leaves existing controls untouched on edit;
/// `Some(vec![])` removes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ButtonSpec>>,
}

impl MessagePayload {
    /// A text-only payload.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// A payload carrying a single embed.
    pub fn embed(embed: EmbedPayload) -> Self {
        Self {
            embeds: vec![embed],
            ..Self::default()
        }
    }

    /// Replace the controls attached to this payload.
    pub fn with_components(mut self, components: Vec<ButtonSpec>) -> Self {
        self.components = Some(components);
        self
    }

    /// Mark this payload as removing all controls.
    pub fn without_components(self) -> Self {
        self.with_components(Vec::new())
    }
}

/// A single text input in a modal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextInputSpec {
    pub custom_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Paragraph input instead of a single line.
    #[serde(default)]
    pub multiline: bool,
}

/// A modal form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalPayload {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInputSpec>,
}

/// Initial response to an interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionResponse {
    /// Private reply visible only to the acting user.
    Message(MessagePayload),
    /// Open a modal form.
    Modal(ModalPayload),
    /// Acknowledge without visible output.
    Acknowledge,
}

/// A webhook execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub webhook_id: u64,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<EmbedPayload>,
}

// ============================================================================
// Transport
// ============================================================================

/// Errors from outbound platform calls.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An id could not be converted to the platform's format.
    #[error("invalid {kind} id: {value}")]
    InvalidId { kind: &'static str, value: String },

    /// The platform rejected or failed the call.
    #[error("platform error: {0}")]
    Platform(String),

    /// The platform accepted the call but returned no message.
    #[error("platform returned no message")]
    MissingMessage,
}

/// Outbound calls into the chat platform.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Post a message to a channel.
    async fn send_message(
        &self,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<MessageRef, TransportError>;

    /// Edit a previously posted message.
    async fn edit_message(
        &self,
        message: &MessageRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError>;

    /// Send the initial response to an interaction.
    async fn respond(
        &self,
        interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), TransportError>;

    /// Send a private follow-up after the initial response.
    async fn follow_up(
        &self,
        interaction: &InteractionRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError>;

    /// Execute a webhook and return the message it posted.
    async fn execute_webhook(&self, payload: WebhookPayload)
    -> Result<MessageRef, TransportError>;
}
