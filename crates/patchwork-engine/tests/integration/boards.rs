/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{FakeBoardService, TestFixture};
use patchwork_engine::boards::{BoardRequest, Boards, PopulateReport};
use patchwork_engine::engine::Engine;
use patchwork_engine::error::EngineError;
use patchwork_engine::store::Store;
use patchwork_models::models::trello_boards::BACKGROUNDS;
use patchwork_models::models::{Component, NewComponent, NewEnvironment, NewServer, PatchRun};
use std::sync::atomic::Ordering;
use std::sync::Arc;

const OPS_HOOK: &str = "https://chat.example.com/hooks/ops";

fn engine_with_boards(fixture: &TestFixture) -> (Engine, Arc<FakeBoardService>) {
    let service = Arc::new(FakeBoardService::default());
    let engine = fixture.engine().with_board_service(service.clone());
    (engine, service)
}

fn server(fixture: &TestFixture, component: &Component, name: &str, updates: i32) {
    let mut new_server = NewServer::new(component.id, name.to_string()).unwrap();
    new_server.ip_address = "10.0.0.5".to_string();
    new_server.vm_name = format!("vm-{}", name);
    new_server.package_updates = Some(updates);
    fixture.store.upsert_server(&new_server).unwrap();
}

/// `shop [prod]` with an `api` component, plus a second environment.
fn hierarchy(fixture: &TestFixture, run: &PatchRun) {
    let api = fixture.component(run, "api", None);
    server(fixture, &api, "web01", 4);
    server(fixture, &api, "web02", 0);

    let app = &fixture.store.list_applications(run.id).unwrap()[0];
    let staging = fixture
        .store
        .get_or_create_environment(&NewEnvironment::new(app.id, "staging".to_string()).unwrap())
        .unwrap();
    let worker = fixture
        .store
        .get_or_create_component(&NewComponent::new(staging.id, "worker".to_string()).unwrap())
        .unwrap();
    server(fixture, &worker, "stage-cliqa-01", 2);
}

async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_create_board_fills_in_run_hierarchy() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    hierarchy(&fixture, &run);

    let board = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await
        .expect("Failed to create board");

    assert!(board.name.starts_with("Patching: "));
    assert!(BACKGROUNDS.contains(&board.background.as_str()));
    assert!(board
        .description
        .contains(&format!("https://patchwork.example.com/patchRun/{}", run.id)));
    assert_eq!(board.remote_id.as_deref(), Some("board-1"));
    assert_eq!(board.url.as_deref(), Some("https://trello.example.com/b/board-1"));
    assert_eq!(engine.boards().list(run.id).unwrap().len(), 1);

    let cards: Vec<String> = service.cards.lock().unwrap().iter().map(|c| c.name.clone()).collect();
    assert_eq!(cards, vec!["shop [prod]", "shop [staging]"]);
    let checklists: Vec<String> = service
        .checklists
        .lock()
        .unwrap()
        .iter()
        .map(|(_, name)| name.clone())
        .collect();
    assert_eq!(checklists, vec!["api", "worker"]);

    let items = service.items.lock().unwrap().clone();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].1.name, "web01 (10.0.0.5) - Updates: 4\nssh://web01");
    assert!(!items[0].1.checked);
    assert!(items[1].1.checked);
    assert!(items[2].1.name.ends_with("[VMName: vm-stage-cliqa-01]"));

    let messages = fixture.sender.messages_to(OPS_HOOK);
    assert_eq!(
        messages,
        vec![format!(
            "🎯 New Trello Board Created: [{}](https://trello.example.com/b/board-1)",
            board.name
        )]
    );
}

#[tokio::test]
async fn test_create_board_keeps_requested_values() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");

    let request = BoardRequest {
        name: Some("March kernels".to_string()),
        description: Some("Second wave".to_string()),
        background: Some("lime".to_string()),
    };
    let board = engine.boards().create(run.id, request, true).await.unwrap();

    assert_eq!(board.name, "March kernels");
    assert_eq!(board.description, "Second wave");
    assert_eq!(board.background, "lime");
    assert_eq!(service.boards.lock().unwrap()[0].background, "lime");
}

#[tokio::test]
async fn test_unknown_background_is_rejected_before_trello() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");

    let request = BoardRequest {
        background: Some("teal".to_string()),
        ..BoardRequest::default()
    };
    let result = engine.boards().create(run.id, request, true).await;

    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(service.boards.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_boards_need_trello_credentials() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");

    assert!(!engine.boards().enabled());
    let result = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await;

    assert!(matches!(result, Err(EngineError::Validation(_))));
    assert!(fixture.store.list_boards(run.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_remote_create_records_nothing() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    service.fail_create.store(true, Ordering::SeqCst);

    let result = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await;

    assert!(matches!(result, Err(EngineError::Backend { .. })));
    assert!(fixture.store.list_boards(run.id).unwrap().is_empty());
    assert!(fixture.sender.messages_to(OPS_HOOK).is_empty());
}

#[tokio::test]
async fn test_board_populates_in_background() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    hierarchy(&fixture, &run);

    engine
        .boards()
        .create(run.id, BoardRequest::default(), false)
        .await
        .unwrap();
    settle().await;

    assert_eq!(service.cards.lock().unwrap().len(), 2);
    assert_eq!(service.items.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_population_continues_past_failed_card() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    hierarchy(&fixture, &run);
    service
        .failing_cards
        .lock()
        .unwrap()
        .insert("shop [prod]".to_string());

    let board = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await
        .unwrap();
    service.cards.lock().unwrap().clear();
    service.items.lock().unwrap().clear();

    let report = Boards::populate(
        fixture.store.clone(),
        service.clone(),
        "https://patchwork.example.com",
        &board,
    )
    .await;

    assert_eq!(
        report,
        PopulateReport {
            cards: 1,
            checklists: 1,
            items: 1,
            failed: 1,
        }
    );
    assert!(service.item_names()[0].starts_with("stage-cliqa-01"));
    let card = &service.cards.lock().unwrap()[0];
    assert!(card
        .description
        .contains("Patching Automation Tool: https://patchwork.example.com/environment/"));
}

#[tokio::test]
async fn test_delete_board_gone_upstream_still_removes_record() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    let board = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await
        .unwrap();
    service.missing.lock().unwrap().insert("board-1".to_string());

    let deleted = engine.boards().delete(board.id).await.expect("delete board");

    assert_eq!(deleted.id, board.id);
    assert!(service.deleted.lock().unwrap().is_empty());
    assert!(fixture.store.get_board(board.id).unwrap().is_none());
    let messages = fixture.sender.messages_to(OPS_HOOK);
    assert_eq!(
        messages.last().map(String::as_str),
        Some(format!("❌ **Trello Board Deleted:** `{}`\n", board.name).as_str())
    );
}

#[tokio::test]
async fn test_delete_board_upstream_failure_keeps_record() {
    let fixture = TestFixture::new();
    let (engine, service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    let board = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await
        .unwrap();
    service.fail_delete.store(true, Ordering::SeqCst);

    let result = engine.boards().delete(board.id).await;

    assert!(matches!(result, Err(EngineError::Backend { .. })));
    assert!(fixture.store.get_board(board.id).unwrap().is_some());
}

#[tokio::test]
async fn test_deleting_run_removes_its_boards() {
    let fixture = TestFixture::new();
    let (engine, _service) = engine_with_boards(&fixture);
    let run = fixture.patch_run("week1");
    let board = engine
        .boards()
        .create(run.id, BoardRequest::default(), true)
        .await
        .unwrap();

    engine.delete_patch_run(run.id).await.unwrap();

    assert!(matches!(
        engine.boards().get(board.id),
        Err(EngineError::NotFound { .. })
    ));
}
