//! Embed composer: draft an embed and post it through a webhook.

use async_trait::async_trait;
use panel_protocol::{ButtonStyle, EmbedPayload, MessagePayload, WebhookPayload};

use crate::control::Control;
use crate::modal::{ModalFlow, ModalOutcome};
use crate::session::{
    ActivationContext, ERROR_NOTICE, Flow, SessionError, SessionKind, StopReason,
    TIMED_OUT_NOTICE,
};

/// Reply when Post Webhook is pressed without a usable webhook URL.
pub const INVALID_WEBHOOK_NOTICE: &str = "Please supply a valid webhook URL!";

/// Reply when there is nothing to preview or post yet.
pub const EMPTY_EMBED_NOTICE: &str = "The embed is empty! Use Edit Embed first.";

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Embed Draft
// ============================================================================

/// The embed being composed. Blank submissions are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbedDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl EmbedDraft {
    pub fn is_empty(&self) -> bool {
        non_empty(&self.title).is_none()
            && non_empty(&self.description).is_none()
            && non_empty(&self.thumbnail_url).is_none()
    }

    pub fn to_embed(&self) -> EmbedPayload {
        EmbedPayload {
            title: non_empty(&self.title).map(str::to_string),
            description: non_empty(&self.description).map(str::to_string),
            thumbnail_url: non_empty(&self.thumbnail_url).map(str::to_string),
        }
    }

    /// Form pre-filled with the current draft.
    pub fn editor(&self) -> ModalFlow<EmbedDraft> {
        ModalFlow::<EmbedDraft>::new("Embed Editor")
            .field("title", "Title", self.title.as_deref(), |d, v| {
                d.title = Some(v)
            })
            .paragraph(
                "description",
                "Description",
                self.description.as_deref(),
                |d, v| d.description = Some(v),
            )
            .field(
                "thumbnail_url",
                "Thumbnail URL",
                self.thumbnail_url.as_deref(),
                |d, v| d.thumbnail_url = Some(v),
            )
    }
}

// ============================================================================
// Webhook Target
// ============================================================================

/// Where the embed gets posted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookTarget {
    pub url: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
}

impl WebhookTarget {
    /// Numeric id between `webhooks/` and the next `/`.
    pub fn id(&self) -> Option<u64> {
        let url = non_empty(&self.url)?;
        let (_, rest) = url.split_once("webhooks/")?;
        rest.split('/').next()?.parse().ok()
    }

    /// Last `/`-separated segment of the url.
    pub fn token(&self) -> Option<&str> {
        let url = non_empty(&self.url)?;
        url.rsplit('/').next().filter(|token| !token.is_empty())
    }

    /// Both id and token, if the url yields them.
    pub fn credentials(&self) -> Option<(u64, &str)> {
        Some((self.id()?, self.token()?))
    }

    pub fn editor(&self) -> ModalFlow<WebhookTarget> {
        ModalFlow::<WebhookTarget>::new("Webhook Editor")
            .field("url", "Webhook URL", self.url.as_deref(), |w, v| {
                w.url = Some(v)
            })
            .field("username", "Username", self.username.as_deref(), |w, v| {
                w.username = Some(v)
            })
            .field("avatar_url", "Avatar URL", self.avatar_url.as_deref(), |w, v| {
                w.avatar_url = Some(v)
            })
    }
}

// ============================================================================
// Composer Session
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerAction {
    EditEmbed,
    EditWebhook,
    PreviewEmbed,
    PostWebhook,
}

/// Session state for one composer.
#[derive(Debug, Default)]
pub struct Composer {
    embed: EmbedDraft,
    webhook: WebhookTarget,
    /// Channel the embed was posted to.
    posted_to: Option<String>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn embed(&self) -> &EmbedDraft {
        &self.embed
    }

    pub fn webhook(&self) -> &WebhookTarget {
        &self.webhook
    }

    fn webhook_payload(&self) -> Result<WebhookPayload, SessionError> {
        let Some((webhook_id, token)) = self.webhook.credentials() else {
            return Err(SessionError::InvalidTarget(
                INVALID_WEBHOOK_NOTICE.to_string(),
            ));
        };
        if self.embed.is_empty() {
            return Err(SessionError::InvalidTarget(EMPTY_EMBED_NOTICE.to_string()));
        }

        Ok(WebhookPayload {
            webhook_id,
            token: token.to_string(),
            username: non_empty(&self.webhook.username).map(str::to_string),
            avatar_url: non_empty(&self.webhook.avatar_url).map(str::to_string),
            embeds: vec![self.embed.to_embed()],
        })
    }
}

#[async_trait]
impl SessionKind for Composer {
    type Action = ComposerAction;

    fn name(&self) -> &'static str {
        "composer"
    }

    fn controls(&self) -> Vec<Control<ComposerAction>> {
        vec![
            Control::new("edit_embed", ComposerAction::EditEmbed).label("Edit Embed"),
            Control::new("edit_webhook", ComposerAction::EditWebhook).label("Edit Webhook"),
            Control::new("preview_embed", ComposerAction::PreviewEmbed)
                .label("Preview Embed")
                .style(ButtonStyle::Primary),
            Control::new("post_webhook", ComposerAction::PostWebhook)
                .label("Post Webhook")
                .style(ButtonStyle::Success),
        ]
    }

    async fn handle(
        &mut self,
        action: ComposerAction,
        ctx: &mut ActivationContext<'_>,
    ) -> Result<Flow, SessionError> {
        match action {
            ComposerAction::EditEmbed => {
                let editor = self.embed.editor();
                if let ModalOutcome::Submitted(values) = ctx.launch_modal(&editor).await? {
                    editor.apply(&mut self.embed, &values);
                }
                Ok(Flow::Continue)
            }
            ComposerAction::EditWebhook => {
                let editor = self.webhook.editor();
                if let ModalOutcome::Submitted(values) = ctx.launch_modal(&editor).await? {
                    editor.apply(&mut self.webhook, &values);
                }
                Ok(Flow::Continue)
            }
            ComposerAction::PreviewEmbed => {
                if self.embed.is_empty() {
                    return Err(SessionError::InvalidTarget(EMPTY_EMBED_NOTICE.to_string()));
                }
                ctx.respond_privately_with(MessagePayload::embed(self.embed.to_embed()))
                    .await?;
                Ok(Flow::Continue)
            }
            ComposerAction::PostWebhook => {
                let payload = self.webhook_payload()?;
                let posted = ctx.execute_webhook(payload).await?;
                self.posted_to = Some(posted.channel_id);
                Ok(Flow::Stop)
            }
        }
    }

    fn on_stop(&self, reason: StopReason) -> Option<String> {
        match reason {
            StopReason::Explicit => self
                .posted_to
                .as_ref()
                .map(|channel_id| format!("Posted to <#{channel_id}>!")),
            StopReason::Timeout => Some(TIMED_OUT_NOTICE.to_string()),
            StopReason::Error => Some(ERROR_NOTICE.to_string()),
        }
    }
}
