/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! PostgreSQL store tests.
//!
//! These need a database: set `DATABASE_URL` and run with `--ignored`. Each
//! test migrates its own schema.

use patchwork_engine::dal::DAL;
use patchwork_engine::db::create_shared_connection_pool;
use patchwork_engine::store::{Store, StoreError};
use patchwork_models::models::{
    Initiator, JobParent, NewApplication, NewBackend, NewComponent, NewDefinition,
    NewDefinitionParam, NewEnvironment, NewJob, NewNotificationChannel, NewPatchRun, NewServer,
    NewTrelloBoard, PatchRun,
};
use serial_test::serial;
use uuid::Uuid;

fn dal() -> DAL {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let schema = format!("test_{}", Uuid::new_v4().simple());
    let pool = create_shared_connection_pool(&url, 2, Some(&schema))
        .expect("Failed to create connection pool");
    pool.run_migrations().expect("Failed to run migrations");
    DAL::new(pool)
}

fn patch_run(dal: &DAL, window: &str) -> PatchRun {
    dal.create_patch_run(
        &NewPatchRun::new(Some(format!("Run {}", window)), None, window.to_string(), None, None)
            .unwrap(),
    )
    .expect("Failed to create patch run")
}

#[test]
#[ignore]
#[serial]
fn test_hierarchy_upserts_and_cascades() {
    let dal = dal();
    let run = patch_run(&dal, "week1");

    let app = dal
        .get_or_create_application(&NewApplication::new(run.id, "shop".to_string(), "").unwrap())
        .unwrap();
    let again = dal
        .get_or_create_application(&NewApplication::new(run.id, "shop".to_string(), "").unwrap())
        .unwrap();
    assert_eq!(app.id, again.id);

    let env = dal
        .get_or_create_environment(&NewEnvironment::new(app.id, "prod".to_string()).unwrap())
        .unwrap();
    let component = dal
        .get_or_create_component(&NewComponent::new(env.id, "web".to_string()).unwrap())
        .unwrap();

    let mut observed = NewServer::new(component.id, "web01".to_string()).unwrap();
    observed.package_updates = Some(4);
    let first = dal.upsert_server(&observed).unwrap();
    observed.package_updates = None;
    observed.ip_address = "10.0.0.2".to_string();
    let second = dal.upsert_server(&observed).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.package_updates, None);
    assert_eq!(second.ip_address, "10.0.0.2");

    let checked = dal
        .set_component_health_check(component.id, "/opt/check.sh")
        .unwrap();
    assert!(checked.has_health_check());

    dal.delete_patch_run(run.id).unwrap();
    assert!(dal.get_application(app.id).unwrap().is_none());
    assert!(dal.get_server(first.id).unwrap().is_none());
}

#[test]
#[ignore]
#[serial]
fn test_latest_run_for_window() {
    let dal = dal();
    patch_run(&dal, "week1");
    let newer = patch_run(&dal, "week1");
    patch_run(&dal, "week2");

    let latest = dal.latest_patch_run_for_window("week1").unwrap().unwrap();
    assert_eq!(latest.id, newer.id);
    assert!(dal.latest_patch_run_for_window("month1").unwrap().is_none());
}

#[test]
#[ignore]
#[serial]
fn test_resolve_job_only_writes_pending_jobs() {
    let dal = dal();
    let run = patch_run(&dal, "week1");
    let backend = dal
        .create_backend(
            &NewBackend::new("ci".to_string(), "build_server", "ci.example.com".to_string())
                .unwrap(),
        )
        .unwrap();
    let mut new_job = NewJob::new(
        "ops/notify".to_string(),
        "build",
        Initiator::PatchRun(run.id),
        JobParent::Builtin,
        backend.id,
        Some(run.id),
    )
    .unwrap();
    new_job.queue_id = Some(701);
    let mut job = dal.create_job(&new_job).unwrap();

    job.status = Some("SUCCESS".to_string());
    job.tracking_outcome = Some("resolved".to_string());
    let resolved = dal.resolve_job(&job).unwrap();
    assert_eq!(resolved.status.as_deref(), Some("SUCCESS"));

    job.status = Some("FAILURE".to_string());
    assert!(matches!(dal.resolve_job(&job), Err(StoreError::Conflict(_))));
    assert_eq!(
        dal.get_job(job.id).unwrap().unwrap().status.as_deref(),
        Some("SUCCESS")
    );

    let listed = dal.list_jobs_for_initiator(Initiator::PatchRun(run.id)).unwrap();
    assert_eq!(listed.len(), 1);
}

#[test]
#[ignore]
#[serial]
fn test_definition_param_upsert_keeps_template() {
    let dal = dal();
    let backend = dal
        .create_backend(
            &NewBackend::new("pe".to_string(), "orchestrator", "pe.example.com".to_string())
                .unwrap(),
        )
        .unwrap();
    let definition = dal
        .create_definition(&NewDefinition::new(backend.id, "task", "ops::restart").unwrap())
        .unwrap();

    let mut param =
        NewDefinitionParam::new(definition.id, "host".to_string(), "String".to_string()).unwrap();
    param.template_value = Some("{{ name }}".to_string());
    let created = dal.upsert_definition_param(&param).unwrap();

    let mut stale = created.clone();
    stale.is_stale = true;
    dal.update_definition_param(&stale).unwrap();

    let mut refreshed =
        NewDefinitionParam::new(definition.id, "host".to_string(), "String".to_string()).unwrap();
    refreshed.default_value = Some("localhost".to_string());
    let updated = dal.upsert_definition_param(&refreshed).unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.template_value.as_deref(), Some("{{ name }}"));
    assert_eq!(updated.default_value.as_deref(), Some("localhost"));
    assert!(!updated.is_stale);
}

#[test]
#[ignore]
#[serial]
fn test_channel_links() {
    let dal = dal();
    let run = patch_run(&dal, "week1");
    let channel = dal
        .create_channel(
            &NewNotificationChannel::new(
                "ops".to_string(),
                "https://chat.example.com/hooks/ops".to_string(),
            )
            .unwrap(),
        )
        .unwrap();

    dal.link_channel(run.id, channel.id).unwrap();
    dal.link_channel(run.id, channel.id).unwrap();
    assert_eq!(dal.channels_for_patch_run(run.id).unwrap().len(), 1);

    dal.unlink_channel(run.id, channel.id).unwrap();
    assert!(dal.channels_for_patch_run(run.id).unwrap().is_empty());
}

#[test]
#[ignore]
#[serial]
fn test_boards_cascade_with_run() {
    let dal = dal();
    let run = patch_run(&dal, "week1");
    let mut board = dal
        .create_board(
            &NewTrelloBoard::new(
                run.id,
                "Patching: 2024-03-09".to_string(),
                String::new(),
                "lime".to_string(),
            )
            .unwrap(),
        )
        .unwrap();
    assert!(board.remote_id.is_none());

    board.remote_id = Some("5f1".to_string());
    board.url = Some("https://trello.com/b/AbC123".to_string());
    let board = dal.update_board(&board).unwrap();
    assert_eq!(dal.list_boards(run.id).unwrap()[0].remote_id.as_deref(), Some("5f1"));

    dal.delete_patch_run(run.id).unwrap();
    assert!(dal.get_board(board.id).unwrap().is_none());
    assert!(matches!(dal.delete_board(board.id), Err(StoreError::NotFound(_))));
}
