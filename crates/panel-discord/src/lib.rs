//! Discord adapter for Panel using serenity.
//!
//! Two halves, usable independently:
//! - [`DiscordGateway`]: connects to the Discord gateway and forwards messages,
//!   button clicks and modal submissions as [`InboundEvent`]s.
//! - [`DiscordTransport`]: implements [`Transport`] over the Discord REST API.
//!
//! Interactions are not acknowledged here. Panel answers each one itself,
//! because opening a modal is only possible as the first response.

use std::sync::Arc;

use async_trait::async_trait;
use panel_protocol::{
    ActivationData, ButtonSpec, ButtonStyle, EmbedPayload, InboundEvent, InteractionRef,
    InteractionResponse, MessageCreatedData, MessagePayload, MessageRef, ModalPayload,
    ModalSubmitData, SubmittedField, Transport, TransportError, UserRef, WebhookPayload,
};
use serenity::all::{
    ActionRowComponent, ChannelId, ComponentInteraction, CreateActionRow, CreateButton,
    CreateEmbed, CreateInputText, CreateInteractionResponse, CreateInteractionResponseFollowup,
    CreateInteractionResponseMessage, CreateMessage, CreateModal, EditMessage, ExecuteWebhook,
    GatewayIntents, InputTextStyle, InteractionId, MessageId, ModalInteraction, ReactionType,
    Webhook, WebhookId,
};
use serenity::builder::Builder;
use serenity::http::Http;
use serenity::model::application::{ButtonStyle as DiscordButtonStyle, Interaction};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::user::User;
use serenity::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Discord allows at most five buttons per action row.
const MAX_BUTTONS_PER_ROW: usize = 5;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the Discord adapter.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    /// Discord bot token.
    pub bot_token: String,
}

impl DiscordConfig {
    /// Create a new config with the given bot token.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
        }
    }
}

// ============================================================================
// Discord Gateway
// ============================================================================

/// Gateway connection that feeds Discord events into Panel.
pub struct DiscordGateway {
    config: DiscordConfig,
}

impl DiscordGateway {
    /// Create a new Discord gateway.
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }

    /// Connect and forward events until the client stops.
    ///
    /// Sends `Ready` once the client is built, `Error { fatal: true }` if it
    /// cannot be built, and `Shutdown` when the client exits.
    pub async fn start(self, event_tx: mpsc::Sender<InboundEvent>) {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let handler = Handler {
            event_tx: event_tx.clone(),
        };

        let mut client = match Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
        {
            Ok(client) => client,
            Err(e) => {
                error!(error = %e, "Failed to create Discord client");
                let _ = event_tx
                    .send(InboundEvent::Error {
                        code: "client_error".to_string(),
                        message: e.to_string(),
                        fatal: true,
                    })
                    .await;
                return;
            }
        };

        let ready_event = InboundEvent::Ready {
            platform: "discord".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };
        if event_tx.send(ready_event).await.is_err() {
            error!("failed to send ready event");
            return;
        }

        // Blocks until the shard manager shuts down
        let reason = match client.start().await {
            Ok(()) => "client stopped".to_string(),
            Err(e) => {
                error!(error = %e, "Discord client error");
                e.to_string()
            }
        };

        let _ = event_tx.send(InboundEvent::Shutdown { reason }).await;
        info!("Discord gateway stopped");
    }
}

// ============================================================================
// Event Handler
// ============================================================================

struct Handler {
    event_tx: mpsc::Sender<InboundEvent>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, msg: Message) {
        let event = InboundEvent::MessageCreated(Box::new(MessageCreatedData {
            message_id: msg.id.to_string(),
            channel_id: msg.channel_id.to_string(),
            author: user_ref(&msg.author),
            is_human: is_human(&msg),
            content: msg.content.clone(),
            timestamp: chrono::DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0),
        }));

        if let Err(e) = self.event_tx.send(event).await {
            warn!(error = %e, "Failed to send message event");
        }
    }

    async fn interaction_create(&self, _ctx: Context, interaction: Interaction) {
        let event = match interaction {
            Interaction::Component(component) => component_event(&component),
            Interaction::Modal(modal) => modal_event(&modal),
            _ => return,
        };

        if let Err(e) = self.event_tx.send(event).await {
            warn!(error = %e, "Failed to send interaction event");
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            user = %ready.user.name,
            user_id = %ready.user.id,
            "Discord bot connected"
        );
    }
}

fn component_event(component: &ComponentInteraction) -> InboundEvent {
    InboundEvent::ControlActivated(Box::new(ActivationData {
        interaction: InteractionRef {
            id: component.id.to_string(),
            token: component.token.clone(),
        },
        channel_id: component.channel_id.to_string(),
        message_id: component.message.id.to_string(),
        custom_id: component.data.custom_id.clone(),
        user: user_ref(&component.user),
    }))
}

fn modal_event(modal: &ModalInteraction) -> InboundEvent {
    let fields = modal
        .data
        .components
        .iter()
        .flat_map(|row| row.components.iter())
        .filter_map(|component| match component {
            ActionRowComponent::InputText(input) => Some(SubmittedField::new(
                input.custom_id.clone(),
                input.value.clone().unwrap_or_default(),
            )),
            _ => None,
        })
        .collect();

    InboundEvent::ModalSubmitted(Box::new(ModalSubmitData {
        interaction: InteractionRef {
            id: modal.id.to_string(),
            token: modal.token.clone(),
        },
        custom_id: modal.data.custom_id.clone(),
        user: user_ref(&modal.user),
        fields,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id.to_string(),
        name: Some(user.name.clone()),
    }
}

/// Human authors are neither bots, system users, nor webhooks.
fn is_human(msg: &Message) -> bool {
    !msg.author.bot && !msg.author.system && msg.webhook_id.is_none()
}

fn parse_snowflake(kind: &'static str, raw: &str) -> Result<u64, TransportError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .ok_or_else(|| TransportError::InvalidId {
            kind,
            value: raw.to_string(),
        })
}

fn platform_error(e: serenity::Error) -> TransportError {
    TransportError::Platform(e.to_string())
}

fn convert_style(style: ButtonStyle) -> DiscordButtonStyle {
    match style {
        ButtonStyle::Primary => DiscordButtonStyle::Primary,
        ButtonStyle::Secondary => DiscordButtonStyle::Secondary,
        ButtonStyle::Success => DiscordButtonStyle::Success,
        ButtonStyle::Danger => DiscordButtonStyle::Danger,
    }
}

fn convert_buttons(buttons: &[ButtonSpec]) -> Vec<CreateActionRow> {
    buttons
        .chunks(MAX_BUTTONS_PER_ROW)
        .map(|row| {
            let buttons = row
                .iter()
                .map(|spec| {
                    let mut button =
                        CreateButton::new(&spec.custom_id).style(convert_style(spec.style));
                    if let Some(label) = &spec.label {
                        button = button.label(label);
                    }
                    if let Some(emoji) = &spec.emoji {
                        button = button.emoji(ReactionType::Unicode(emoji.clone()));
                    }
                    button
                })
                .collect();
            CreateActionRow::Buttons(buttons)
        })
        .collect()
}

fn convert_embed(embed: &EmbedPayload) -> CreateEmbed {
    let mut builder = CreateEmbed::new();
    if let Some(title) = &embed.title {
        builder = builder.title(title);
    }
    if let Some(description) = &embed.description {
        builder = builder.description(description);
    }
    if let Some(url) = embed.thumbnail_url.as_deref().filter(|u| !u.is_empty()) {
        builder = builder.thumbnail(url);
    }
    builder
}

fn convert_modal(modal: &ModalPayload) -> CreateModal {
    let rows = modal
        .inputs
        .iter()
        .map(|input| {
            let style = if input.multiline {
                InputTextStyle::Paragraph
            } else {
                InputTextStyle::Short
            };
            let mut text = CreateInputText::new(style, &input.label, &input.custom_id)
                .required(false);
            if let Some(value) = input.value.as_deref().filter(|v| !v.is_empty()) {
                text = text.value(value);
            }
            CreateActionRow::InputText(text)
        })
        .collect();

    CreateModal::new(&modal.custom_id, &modal.title).components(rows)
}

fn private_message(payload: &MessagePayload) -> CreateInteractionResponseMessage {
    let mut builder = CreateInteractionResponseMessage::new()
        .ephemeral(true)
        .embeds(payload.embeds.iter().map(convert_embed).collect());
    if let Some(content) = &payload.content {
        builder = builder.content(content);
    }
    builder
}

// ============================================================================
// Transport
// ============================================================================

/// REST-backed [`Transport`] for Discord.
#[derive(Clone)]
pub struct DiscordTransport {
    http: Arc<Http>,
}

impl DiscordTransport {
    /// Create a transport authenticated with the given bot token.
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(bot_token)),
        }
    }
}

#[async_trait]
impl Transport for DiscordTransport {
    async fn send_message(
        &self,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<MessageRef, TransportError> {
        let channel = ChannelId::new(parse_snowflake("channel", channel_id)?);

        let mut builder =
            CreateMessage::new().embeds(payload.embeds.iter().map(convert_embed).collect());
        if let Some(content) = &payload.content {
            builder = builder.content(content);
        }
        if let Some(components) = &payload.components {
            builder = builder.components(convert_buttons(components));
        }

        let msg = channel
            .send_message(&self.http, builder)
            .await
            .map_err(platform_error)?;

        Ok(MessageRef {
            channel_id: msg.channel_id.to_string(),
            message_id: msg.id.to_string(),
        })
    }

    async fn edit_message(
        &self,
        message: &MessageRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError> {
        let channel = ChannelId::new(parse_snowflake("channel", &message.channel_id)?);
        let message_id = MessageId::new(parse_snowflake("message", &message.message_id)?);

        let mut builder = EditMessage::new();
        if let Some(content) = &payload.content {
            builder = builder.content(content);
        }
        if !payload.embeds.is_empty() {
            builder = builder.embeds(payload.embeds.iter().map(convert_embed).collect());
        }
        if let Some(components) = &payload.components {
            builder = builder.components(convert_buttons(components));
        }

        channel
            .edit_message(&self.http, message_id, builder)
            .await
            .map_err(platform_error)?;

        Ok(())
    }

    async fn respond(
        &self,
        interaction: &InteractionRef,
        response: InteractionResponse,
    ) -> Result<(), TransportError> {
        let interaction_id = InteractionId::new(parse_snowflake("interaction", &interaction.id)?);

        let builder = match &response {
            InteractionResponse::Message(payload) => {
                CreateInteractionResponse::Message(private_message(payload))
            }
            InteractionResponse::Modal(modal) => {
                CreateInteractionResponse::Modal(convert_modal(modal))
            }
            InteractionResponse::Acknowledge => CreateInteractionResponse::Acknowledge,
        };

        debug!(interaction_id = %interaction.id, "Responding to interaction");
        builder
            .execute(&self.http, (interaction_id, interaction.token.as_str()))
            .await
            .map_err(platform_error)
    }

    async fn follow_up(
        &self,
        interaction: &InteractionRef,
        payload: MessagePayload,
    ) -> Result<(), TransportError> {
        let mut builder = CreateInteractionResponseFollowup::new()
            .ephemeral(true)
            .embeds(payload.embeds.iter().map(convert_embed).collect());
        if let Some(content) = &payload.content {
            builder = builder.content(content);
        }

        builder
            .execute(&self.http, (None, interaction.token.as_str()))
            .await
            .map_err(platform_error)?;

        Ok(())
    }

    async fn execute_webhook(
        &self,
        payload: WebhookPayload,
    ) -> Result<MessageRef, TransportError> {
        if payload.webhook_id == 0 {
            return Err(TransportError::InvalidId {
                kind: "webhook",
                value: payload.webhook_id.to_string(),
            });
        }

        let webhook_id = WebhookId::new(payload.webhook_id);
        let webhook = Webhook::from_id_with_token(&self.http, webhook_id, &payload.token)
            .await
            .map_err(platform_error)?;

        let mut builder =
            ExecuteWebhook::new().embeds(payload.embeds.iter().map(convert_embed).collect());
        if let Some(username) = &payload.username {
            builder = builder.username(username);
        }
        if let Some(avatar_url) = &payload.avatar_url {
            builder = builder.avatar_url(avatar_url);
        }

        let msg = webhook
            .execute(&self.http, true, builder)
            .await
            .map_err(platform_error)?
            .ok_or(TransportError::MissingMessage)?;

        Ok(MessageRef {
            channel_id: msg.channel_id.to_string(),
            message_id: msg.id.to_string(),
        })
    }
}
