/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{RecordingSender, TestFixture};
use patchwork_engine::error::EngineError;
use patchwork_engine::fanout::FanoutReport;
use patchwork_engine::store::Store;
use patchwork_models::models::{EventAction, NewNotificationChannel, NewPatchRun, PatchRunEvent};
use std::time::Duration;
use uuid::Uuid;

const OPS_HOOK: &str = "https://chat.example.com/hooks/ops";

/// Waits for the event dispatcher to deliver `expected` messages.
async fn wait_for_messages(sender: &RecordingSender, expected: usize) {
    for _ in 0..200 {
        if sender.count() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} messages, got {}",
        expected,
        sender.count()
    );
}

#[tokio::test]
async fn test_publish_skips_disabled_and_survives_failures() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    fixture.channel(&run, "muted", false);
    fixture.channel(&run, "broken", true);
    fixture
        .sender
        .failing
        .lock()
        .unwrap()
        .insert("https://chat.example.com/hooks/broken".to_string());

    let report = engine
        .fanout()
        .publish(&run, PatchRunEvent::new(EventAction::PatchRunUpdated))
        .await;

    assert_eq!(
        report,
        FanoutReport {
            delivered: 1,
            failed: 1,
            skipped: 1,
        }
    );
    let messages = fixture.sender.messages_to(OPS_HOOK);
    assert_eq!(
        messages,
        vec![format!(
            "⏫ Patch Run Updated 🦖\n**Name:** [Run week1](https://patchwork.example.com/patchRun/{})\n",
            run.id
        )]
    );
    assert!(fixture
        .sender
        .messages_to("https://chat.example.com/hooks/muted")
        .is_empty());
}

#[tokio::test]
async fn test_publish_only_reaches_linked_channels() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    let other = fixture.patch_run("week2");
    fixture.channel(&other, "other", true);

    let report = engine
        .fanout()
        .publish(&run, PatchRunEvent::new(EventAction::PatchRunUpdated))
        .await;

    assert_eq!(report, FanoutReport::default());
    assert_eq!(fixture.sender.count(), 0);
}

#[tokio::test]
async fn test_lifecycle_events_reach_channels() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();

    let run = engine
        .create_patch_run(
            &NewPatchRun::new(Some("March".to_string()), None, "week1".to_string(), None, None)
                .unwrap(),
        )
        .expect("Failed to create patch run");
    // linked before the dispatcher gets to run
    let channel = fixture
        .store
        .create_channel(&NewNotificationChannel::new("ops".to_string(), OPS_HOOK.to_string()).unwrap())
        .unwrap();
    fixture.store.link_channel(run.id, channel.id).unwrap();
    wait_for_messages(&fixture.sender, 1).await;

    let mut changed = run.clone();
    changed.description = Some("Quarterly kernels".to_string());
    engine.update_patch_run(&changed).await.unwrap();
    wait_for_messages(&fixture.sender, 2).await;

    let messages = fixture.sender.messages_to(OPS_HOOK);
    assert!(messages[0].starts_with("❇️ Patch Run Created 🦖\n**Name:** [March]"));
    assert!(messages[1].starts_with("⏫ Patch Run Updated 🦖\n"));
    assert!(messages[1].contains("**Description:** `Quarterly kernels`"));
}

#[tokio::test]
async fn test_delete_announces_before_removal() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);

    engine
        .delete_patch_run(run.id)
        .await
        .expect("Failed to delete patch run");

    assert_eq!(
        fixture.sender.messages_to(OPS_HOOK),
        vec!["❌ **Patch Run Deleted:** `Run week1`\n".to_string()]
    );
    assert!(fixture.store.get_patch_run(run.id).unwrap().is_none());
    assert!(fixture.store.channels_for_patch_run(run.id).unwrap().is_empty());

    let again = engine.delete_patch_run(run.id).await;
    assert!(matches!(again, Err(EngineError::NotFound { .. })));
    assert_eq!(fixture.sender.count(), 1);
}

#[tokio::test]
async fn test_test_message_ignores_enabled_flag() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    let muted = fixture.channel(&run, "muted", false);

    engine
        .test_channel(muted.id)
        .await
        .expect("Failed to send test message");

    assert_eq!(
        fixture.sender.messages_to("https://chat.example.com/hooks/muted"),
        vec!["🧪 Test Message from Patching Automation 🧪".to_string()]
    );

    let missing = engine.test_channel(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(EngineError::NotFound { .. })));
}

#[tokio::test]
async fn test_failed_test_message_is_reported() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    let broken = fixture.channel(&run, "broken", true);
    fixture
        .sender
        .failing
        .lock()
        .unwrap()
        .insert(broken.webhook_url.clone());

    let result = engine.test_channel(broken.id).await;

    assert!(matches!(result, Err(EngineError::Backend { .. })));
}

#[tokio::test]
async fn test_message_prefix() {
    let mut fixture = TestFixture::new();
    fixture.settings.engine.message_prefix = Some("[staging] ".to_string());
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);

    engine
        .fanout()
        .publish(&run, PatchRunEvent::new(EventAction::PatchRunDeleted))
        .await;

    assert_eq!(
        fixture.sender.messages_to(OPS_HOOK),
        vec!["[staging] ❌ **Patch Run Deleted:** `Run week1`\n".to_string()]
    );
}
