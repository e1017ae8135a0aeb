// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline tests: scripted transport -> decoder -> controller
//! -> reducer -> timeline, driven through `ChatClient`.

use std::sync::Arc;
use std::time::Duration;

use rivulet_chat::{ChatClient, StreamOutcome, TimelineUpdate};
use rivulet_config::RivuletConfig;
use rivulet_core::{Role, RivuletError, SessionId, TurnState};
use rivulet_test_utils::{token_line, Script, ScriptedTransport};
use tokio::sync::broadcast;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn client_with(scripts: Vec<Script>) -> (ChatClient, ScriptedTransport) {
    let transport = ScriptedTransport::with_scripts(scripts);
    let client = ChatClient::new(Arc::new(transport.clone()), &RivuletConfig::default());
    (client, transport)
}

/// Waits until an update for `session` carries assistant text `text`.
async fn wait_for_text(
    updates: &mut broadcast::Receiver<TimelineUpdate>,
    session: &SessionId,
    text: &str,
) {
    timeout(WAIT, async {
        loop {
            match updates.recv().await {
                Ok(TimelineUpdate::TurnUpdated { session_id, turn })
                    if &session_id == session && turn.text == text =>
                {
                    return;
                }
                Ok(_) => {}
                Err(e) => panic!("update channel failed: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for update");
}

#[tokio::test]
async fn tokens_and_terminal_frame_complete_the_turn() {
    let (client, _) = client_with(vec![Script::reply(&["He", "llo"], "m1", 5)]);

    let handle = client.submit("Hello", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    let outcome = timeout(WAIT, handle.wait()).await.unwrap();

    assert_eq!(
        outcome,
        StreamOutcome::Completed {
            model: Some("m1".into()),
            total_tokens: Some(5),
        }
    );
    let turns = client.turns(&session).await.unwrap();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, Role::User);
    assert_eq!(turns[0].text, "Hello");
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].text, "Hello");
    assert_eq!(turns[1].state, TurnState::Complete);
    assert_eq!(turns[1].model.as_deref(), Some("m1"));
    assert!(!client.is_streaming(&session).await);
}

#[tokio::test]
async fn stream_ending_early_leaves_turn_in_error() {
    let (client, _) = client_with(vec![Script::Chunks(vec![token_line("Hi")])]);

    let handle = client.submit("Hey", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    let outcome = timeout(WAIT, handle.wait()).await.unwrap();

    assert!(matches!(outcome, StreamOutcome::Failed { .. }));
    let turns = client.turns(&session).await.unwrap();
    assert_eq!(turns[1].state, TurnState::Error);
    assert!(!turns[1].text.is_empty());
    assert!(turns[1].text.starts_with("Error:"));
}

#[tokio::test]
async fn open_failure_shows_reason_on_the_turn() {
    let (client, _) = client_with(vec![Script::OpenFailure {
        status: Some(400),
        message: "ANTHROPIC_API_KEY not configured".into(),
    }]);

    let handle = client.submit("Hey", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    timeout(WAIT, handle.wait()).await.unwrap();

    let turns = client.turns(&session).await.unwrap();
    assert_eq!(turns[1].state, TurnState::Error);
    assert!(turns[1].text.contains("ANTHROPIC_API_KEY not configured"));
}

#[tokio::test]
async fn second_submit_while_streaming_is_rejected() {
    let (client, _) = client_with(vec![Script::ChunksThenHang(vec![token_line("a")])]);

    let handle = client.submit("one", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    let before = client.turns(&session).await.unwrap();

    let err = client.submit("two", Vec::new()).await.unwrap_err();
    assert!(matches!(err, RivuletError::AlreadyStreaming { .. }));

    let after = client.turns(&session).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].text, before[0].text);
    assert!(!handle.is_finished());
    assert!(!handle.is_cancelled());

    assert!(client.stop(&session).await);
    assert!(handle.is_cancelled());
    assert_eq!(timeout(WAIT, handle.wait()).await.unwrap(), StreamOutcome::Cancelled);
}

#[tokio::test]
async fn stop_marks_turn_cancelled_and_ignores_late_tokens() {
    let (script, feed) = Script::live();
    let (client, _) = client_with(vec![script, Script::reply(&["ok"], "m1", 1)]);
    let mut updates = client.subscribe();

    let handle = client.submit("q", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    feed.token("a");
    wait_for_text(&mut updates, &session, "a").await;

    assert!(client.stop(&session).await);
    feed.token("late");
    assert_eq!(timeout(WAIT, handle.wait()).await.unwrap(), StreamOutcome::Cancelled);

    let turns = client.turns(&session).await.unwrap();
    assert_eq!(turns[1].state, TurnState::Error);
    assert_eq!(turns[1].text, "Error: cancelled");
    assert!(!client.stop(&session).await);

    // The timeline accepts new work again.
    let next = client.submit("again", Vec::new()).await.unwrap();
    assert!(matches!(
        timeout(WAIT, next.wait()).await.unwrap(),
        StreamOutcome::Completed { .. }
    ));
}

#[tokio::test]
async fn clear_drops_events_of_the_cancelled_stream() {
    let (script, feed) = Script::live();
    let (client, _) = client_with(vec![script]);
    let mut updates = client.subscribe();

    let handle = client.submit("q", Vec::new()).await.unwrap();
    let session = handle.session_id().clone();
    feed.token("a");
    wait_for_text(&mut updates, &session, "a").await;

    client.clear_session(&session).await.unwrap();
    feed.token("b");
    feed.done(Some("m1"), None);

    assert_eq!(timeout(WAIT, handle.wait()).await.unwrap(), StreamOutcome::Cancelled);
    assert!(client.turns(&session).await.unwrap().is_empty());
    assert!(!client.is_streaming(&session).await);
}

#[tokio::test]
async fn deleting_a_streaming_session_cancels_it() {
    let (client, _) = client_with(vec![
        Script::reply(&["x"], "m1", 1),
        Script::ChunksThenHang(vec![]),
    ]);
    let first = client.create_session().await;
    client
        .submit_to(&first, "warm up", Vec::new())
        .await
        .unwrap()
        .wait()
        .await;

    let second = client.create_session().await;
    let handle = client.submit_to(&second, "q", Vec::new()).await.unwrap();

    assert!(client.delete_session(&second).await);
    assert_eq!(timeout(WAIT, handle.wait()).await.unwrap(), StreamOutcome::Cancelled);
    assert_eq!(client.active_session().await, Some(first));
    assert_eq!(client.list_sessions().await.len(), 1);
}

#[tokio::test]
async fn sessions_stream_independently() {
    let (live_a, feed_a) = Script::live();
    let (live_b, feed_b) = Script::live();
    let (client, _) = client_with(vec![live_a, live_b]);
    let mut updates = client.subscribe();

    let a = client.create_session().await;
    let b = client.create_session().await;
    let handle_a = client.submit_to(&a, "to a", Vec::new()).await.unwrap();
    feed_a.token("ay");
    wait_for_text(&mut updates, &a, "ay").await;

    let handle_b = client.submit_to(&b, "to b", Vec::new()).await.unwrap();
    feed_b.token("bee");
    wait_for_text(&mut updates, &b, "bee").await;
    assert!(client.is_streaming(&a).await);

    feed_b.done(None, None);
    feed_a.done(None, None);

    assert!(matches!(handle_a.wait().await, StreamOutcome::Completed { .. }));
    assert!(matches!(handle_b.wait().await, StreamOutcome::Completed { .. }));
    assert_eq!(client.turns(&a).await.unwrap()[1].text, "ay");
    assert_eq!(client.turns(&b).await.unwrap()[1].text, "bee");
}

#[tokio::test]
async fn updates_are_broadcast_in_order() {
    let (client, _) = client_with(vec![Script::reply(&["a", "b"], "m1", 2)]);
    let session = client.create_session().await;
    let mut updates = client.subscribe();

    let handle = client.submit_to(&session, "q", Vec::new()).await.unwrap();
    timeout(WAIT, handle.wait()).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(update) = updates.try_recv() {
        match update {
            TimelineUpdate::TurnAppended { turn, .. } => seen.push(format!("+{}", turn.role)),
            TimelineUpdate::TurnUpdated { turn, .. } => {
                seen.push(format!("{}:{}", turn.state, turn.text))
            }
            other => panic!("unexpected update {other:?}"),
        }
    }
    assert_eq!(
        seen,
        vec![
            "+user",
            "+assistant",
            "streaming:a",
            "streaming:ab",
            "complete:ab"
        ]
    );
}

#[tokio::test]
async fn session_model_override_is_sent() {
    let (client, transport) = client_with(vec![]);
    let session = client.create_session().await;
    assert_eq!(client.model_for(&session).await, "claude-sonnet-4-5-20250929");

    assert!(client.set_model(&session, Some("claude-haiku-4-5-20251001".into())).await);
    let handle = client.submit("q", Vec::new()).await.unwrap();
    let outcome = timeout(WAIT, handle.wait()).await.unwrap();

    assert!(matches!(outcome, StreamOutcome::Completed { .. }));
    let requests = transport.requests().await;
    assert_eq!(requests[0].model, "claude-haiku-4-5-20251001");
    assert_eq!(requests[0].max_tokens, 4096);
}

#[tokio::test]
async fn history_is_sent_with_follow_up_questions() {
    let (client, transport) = client_with(vec![
        Script::reply(&["four"], "m1", 1),
        Script::reply(&["eight"], "m1", 1),
    ]);

    client.submit("2+2?", Vec::new()).await.unwrap().wait().await;
    client.submit("doubled?", Vec::new()).await.unwrap().wait().await;

    let requests = transport.requests().await;
    let contents: Vec<&str> = requests[1]
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents, vec!["2+2?", "four", "doubled?"]);
}

#[tokio::test]
async fn rename_and_select_follow_registry_rules() {
    let (client, _) = client_with(vec![]);
    let a = client.create_session().await;
    let b = client.create_session().await;

    assert!(!client.rename_session(&a, "   ").await);
    assert!(client.rename_session(&a, " Groceries ").await);
    assert!(!client.select_session(&SessionId::from("missing")).await);
    assert_eq!(client.active_session().await, Some(b.clone()));
    assert!(client.select_session(&a).await);

    let listed = client.list_sessions().await;
    let renamed = listed.iter().find(|s| s.id == a).unwrap();
    assert_eq!(renamed.title, "Groceries");
    assert!(renamed.active);
}
