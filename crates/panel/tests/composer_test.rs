//! End-to-end tests for the built-in apps over a recording transport.

mod common;

use std::time::Duration;

use panel::apps::composer::INVALID_WEBHOOK_NOTICE;
use panel::apps::{Choice, Composer, RockPaperScissors};
use panel::modal::ModalValues;
use panel::session::{Session, SessionConfig, SessionHandle, StopReason};
use panel::AppContext;
use panel_protocol::{EmbedPayload, InteractionResponse, MessagePayload};
use tokio::sync::mpsc;

use common::{Call, activation, owner, session_message, stranger, test_app, wait_for_response};

async fn submit_modal(
    app: &AppContext,
    rx: &mut mpsc::UnboundedReceiver<Call>,
    interaction_id: &str,
    values: &[(&str, &str)],
) {
    let flow_id = match wait_for_response(rx, interaction_id).await {
        InteractionResponse::Modal(modal) => modal.custom_id,
        other => panic!("expected a modal, got {other:?}"),
    };
    let values: ModalValues = values.iter().copied().collect();
    assert!(app.modals.resolve(&flow_id, values));
}

async fn private_reply(
    rx: &mut mpsc::UnboundedReceiver<Call>,
    interaction_id: &str,
) -> MessagePayload {
    match wait_for_response(rx, interaction_id).await {
        InteractionResponse::Message(payload) => payload,
        other => panic!("expected a private reply, got {other:?}"),
    }
}

async fn start_composer(app: &AppContext) -> SessionHandle {
    Session::new(Composer::new(), owner(), SessionConfig::default())
        .unwrap()
        .start(session_message(), app)
        .await
}

#[tokio::test(start_paused = true)]
async fn composer_edits_previews_and_posts() {
    let (app, transport, mut rx) = test_app();
    let handle = start_composer(&app).await;
    let id = handle.id().to_string();

    handle
        .deliver(activation(&id, "edit_embed", owner(), "a1"))
        .unwrap();
    submit_modal(
        &app,
        &mut rx,
        "a1",
        &[("title", "T"), ("description", "D"), ("thumbnail_url", "")],
    )
    .await;

    handle
        .deliver(activation(&id, "preview_embed", owner(), "a2"))
        .unwrap();
    let preview = private_reply(&mut rx, "a2").await;
    assert_eq!(
        preview.embeds,
        vec![EmbedPayload {
            title: Some("T".to_string()),
            description: Some("D".to_string()),
            thumbnail_url: None,
        }]
    );

    handle
        .deliver(activation(&id, "edit_webhook", owner(), "a3"))
        .unwrap();
    submit_modal(
        &app,
        &mut rx,
        "a3",
        &[
            ("url", "https://discord.com/api/webhooks/123456/abcDEF"),
            ("username", "Captain Hook"),
            ("avatar_url", ""),
        ],
    )
    .await;

    handle
        .deliver(activation(&id, "post_webhook", owner(), "a4"))
        .unwrap();
    assert_eq!(handle.stopped().await, StopReason::Explicit);

    let webhooks = transport.webhooks();
    assert_eq!(webhooks.len(), 1);
    assert_eq!(webhooks[0].webhook_id, 123456);
    assert_eq!(webhooks[0].token, "abcDEF");
    assert_eq!(webhooks[0].username.as_deref(), Some("Captain Hook"));
    assert_eq!(webhooks[0].avatar_url, None);
    assert_eq!(webhooks[0].embeds[0].title.as_deref(), Some("T"));

    let edits = transport.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].content.as_deref(), Some("Posted to <#777>!"));
    assert_eq!(edits[0].components.as_ref().map(Vec::len), Some(0));
}

#[tokio::test(start_paused = true)]
async fn composer_rejects_posting_without_webhook() {
    let (app, transport, mut rx) = test_app();
    let handle = start_composer(&app).await;
    let id = handle.id().to_string();

    handle
        .deliver(activation(&id, "post_webhook", owner(), "a1"))
        .unwrap();
    let reply = private_reply(&mut rx, "a1").await;
    assert_eq!(reply.content.as_deref(), Some(INVALID_WEBHOOK_NOTICE));

    // A blank url is just as unusable
    handle
        .deliver(activation(&id, "edit_webhook", owner(), "a2"))
        .unwrap();
    submit_modal(&app, &mut rx, "a2", &[("url", "")]).await;
    handle
        .deliver(activation(&id, "post_webhook", owner(), "a3"))
        .unwrap();
    let reply = private_reply(&mut rx, "a3").await;
    assert_eq!(reply.content.as_deref(), Some(INVALID_WEBHOOK_NOTICE));

    assert!(transport.webhooks().is_empty());
    assert!(transport.edits().is_empty());
}

#[tokio::test(start_paused = true)]
async fn composer_webhook_failure_stops_with_generic_text() {
    let (app, transport, mut rx) = test_app();
    transport.fail_webhooks();
    let handle = start_composer(&app).await;
    let id = handle.id().to_string();

    handle
        .deliver(activation(&id, "edit_embed", owner(), "a1"))
        .unwrap();
    submit_modal(&app, &mut rx, "a1", &[("title", "T")]).await;

    handle
        .deliver(activation(&id, "edit_webhook", owner(), "a2"))
        .unwrap();
    submit_modal(
        &app,
        &mut rx,
        "a2",
        &[("url", "https://discord.com/api/webhooks/123456/abcDEF")],
    )
    .await;

    handle
        .deliver(activation(&id, "post_webhook", owner(), "a3"))
        .unwrap();
    assert_eq!(handle.stopped().await, StopReason::Error);

    assert_eq!(transport.webhooks().len(), 1);
    let edits = transport.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].content.as_deref(), Some("Something went wrong!"));
    assert_eq!(edits[0].components.as_ref().map(Vec::len), Some(0));

    // The platform error never reaches the user
    let responses = transport.responses_to("a3");
    assert_eq!(responses.len(), 1);
    assert!(matches!(responses[0], InteractionResponse::Acknowledge));
}

#[tokio::test(start_paused = true)]
async fn composer_prefills_the_editor_with_the_draft() {
    let (app, _transport, mut rx) = test_app();
    let handle = start_composer(&app).await;
    let id = handle.id().to_string();

    handle
        .deliver(activation(&id, "edit_embed", owner(), "a1"))
        .unwrap();
    submit_modal(&app, &mut rx, "a1", &[("title", "First")]).await;

    handle
        .deliver(activation(&id, "edit_embed", owner(), "a2"))
        .unwrap();
    match wait_for_response(&mut rx, "a2").await {
        InteractionResponse::Modal(modal) => {
            assert_eq!(modal.title, "Embed Editor");
            let keys: Vec<_> = modal.inputs.iter().map(|i| i.custom_id.as_str()).collect();
            assert_eq!(keys, vec!["title", "description", "thumbnail_url"]);
            assert_eq!(modal.inputs[0].value.as_deref(), Some("First"));
            assert_eq!(modal.inputs[1].value, None);
        }
        other => panic!("expected a modal, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn composer_stranger_cannot_open_editor() {
    let (app, transport, mut rx) = test_app();
    let handle = start_composer(&app).await;
    let id = handle.id().to_string();

    handle
        .deliver(activation(&id, "edit_embed", stranger(), "a1"))
        .unwrap();
    let reply = private_reply(&mut rx, "a1").await;
    assert_eq!(reply.content.as_deref(), Some("You can't use these buttons!"));
    assert!(app.modals.is_empty());
    assert_eq!(transport.responses_to("a1").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rps_counts_wins_until_the_game_ends() {
    let (app, transport, mut rx) = test_app();
    let game = RockPaperScissors::with_opponent(Box::new(|| Choice::Scissors));
    let handle = Session::new(game, owner(), SessionConfig::new(Duration::from_secs(30)))
        .unwrap()
        .start(session_message(), &app)
        .await;
    let id = handle.id().to_string();

    handle.deliver(activation(&id, "r", owner(), "a1")).unwrap();
    let reply = private_reply(&mut rx, "a1").await;
    assert_eq!(reply.content.as_deref(), Some("🪨 vs ✂️ - You win!"));

    handle
        .deliver(activation(&id, "r", stranger(), "a2"))
        .unwrap();
    let reply = private_reply(&mut rx, "a2").await;
    assert_eq!(reply.content.as_deref(), Some("This isn't your game!"));

    handle.deliver(activation(&id, "p", owner(), "a3")).unwrap();
    let reply = private_reply(&mut rx, "a3").await;
    assert_eq!(reply.content.as_deref(), Some("📄 vs ✂️ - You lose!"));

    handle
        .deliver(activation(&id, "end", owner(), "a4"))
        .unwrap();
    assert_eq!(handle.stopped().await, StopReason::Explicit);

    let edits = transport.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].content.as_deref(), Some("You won 1 times!"));
}

#[tokio::test(start_paused = true)]
async fn rps_timeout_reports_the_score() {
    let (app, transport, mut rx) = test_app();
    let game = RockPaperScissors::with_opponent(Box::new(|| Choice::Paper));
    let handle = Session::new(game, owner(), SessionConfig::new(Duration::from_secs(30)))
        .unwrap()
        .start(session_message(), &app)
        .await;
    let id = handle.id().to_string();

    handle.deliver(activation(&id, "s", owner(), "a1")).unwrap();
    private_reply(&mut rx, "a1").await;

    assert_eq!(handle.stopped().await, StopReason::Timeout);
    let edits = transport.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(
        edits[0].content.as_deref(),
        Some("Timed out! You won 1 times!")
    );
}
