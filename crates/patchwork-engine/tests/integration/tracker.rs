/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{FakeBuildRunner, TestFixture};
use patchwork_engine::backends::BackendRegistry;
use patchwork_engine::error::EngineError;
use patchwork_engine::fanout::Fanout;
use patchwork_engine::store::{MemoryStore, Store};
use patchwork_engine::tracker::{Tracker, TrackingPool};
use patchwork_models::models::{
    Backend, Initiator, Job, JobParent, NewJob, PatchRun, TrackingOutcome,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use uuid::Uuid;

fn queued_build(fixture: &TestFixture, backend: &Backend, run: &PatchRun) -> Job {
    let mut new_job = NewJob::new(
        "ops/notify".to_string(),
        "build",
        Initiator::PatchRun(run.id),
        JobParent::Build(Uuid::new_v4()),
        backend.id,
        Some(run.id),
    )
    .expect("Failed to create NewJob");
    new_job.queue_id = Some(701);
    fixture.store.create_job(&new_job).expect("Failed to create job")
}

fn submitted_task(fixture: &TestFixture, backend: &Backend, run: &PatchRun, upstream: &str) -> Job {
    let mut new_job = NewJob::new(
        "ops::restart".to_string(),
        "task",
        Initiator::PatchRun(run.id),
        JobParent::Builtin,
        backend.id,
        Some(run.id),
    )
    .expect("Failed to create NewJob");
    new_job.api_job_id = Some(upstream.to_string());
    fixture.store.create_job(&new_job).expect("Failed to create job")
}

#[tokio::test]
async fn test_resolved_build_is_announced() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::starting_after(2));
    *builds.result.lock().unwrap() = Some("SUCCESS".to_string());
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    let job = queued_build(&fixture, &ci, &run);

    let tracked = engine.tracker().track(job.id).await.expect("Failed to track job");

    assert_eq!(builds.polls.load(Ordering::SeqCst), 3);
    assert_eq!(tracked.outcome(), Some(TrackingOutcome::Resolved));
    assert_eq!(tracked.status.as_deref(), Some("SUCCESS"));
    assert_eq!(tracked.api_job_id.as_deref(), Some("42"));
    assert_eq!(
        tracked.api_job_url.as_deref(),
        Some("https://ci.example.com/job/ops/job/notify/42/")
    );

    let stored = fixture.store.get_job(job.id).unwrap().unwrap();
    assert_eq!(stored.outcome(), Some(TrackingOutcome::Resolved));

    let messages = fixture.sender.messages_to("https://chat.example.com/hooks/ops");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("(https://ci.example.com/job/ops/job/notify/42/)"));
}

#[tokio::test]
async fn test_timed_out_build_stays_pending() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::never_starting());
    let run = fixture.patch_run("week1");
    fixture.channel(&run, "ops", true);
    let job = queued_build(&fixture, &ci, &run);

    let tracked = engine.tracker().track(job.id).await.expect("Timeout is not an error");

    assert_eq!(builds.polls.load(Ordering::SeqCst), 3);
    assert_eq!(tracked.outcome(), Some(TrackingOutcome::TimedOut));
    assert!(tracked.status.is_none());
    assert!(tracked.api_job_id.is_none());
    assert_eq!(fixture.sender.count(), 0);
}

#[tokio::test]
async fn test_resolved_build_refreshes_result() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::starting_after(0));
    let run = fixture.patch_run("week1");
    let job = queued_build(&fixture, &ci, &run);

    let running = engine.tracker().track(job.id).await.unwrap();
    assert!(running.status.is_none());
    assert_eq!(running.outcome(), Some(TrackingOutcome::Resolved));

    *builds.result.lock().unwrap() = Some("FAILURE".to_string());
    let finished = engine.tracker().track(job.id).await.unwrap();

    assert_eq!(finished.status.as_deref(), Some("FAILURE"));
    // the queue is not polled again once the build number is known
    assert_eq!(builds.polls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_terminal_build_result_is_not_stored() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::starting_after(0));
    *builds.result.lock().unwrap() = Some("IN_PROGRESS".to_string());
    let run = fixture.patch_run("week1");
    let job = queued_build(&fixture, &ci, &run);

    let tracked = engine.tracker().track(job.id).await.unwrap();
    assert_eq!(tracked.outcome(), Some(TrackingOutcome::Resolved));
    assert!(tracked.status.is_none());

    let refreshed = engine.tracker().track(job.id).await.unwrap();
    assert!(refreshed.status.is_none());

    *builds.result.lock().unwrap() = Some("UNSTABLE".to_string());
    let finished = engine.tracker().track(job.id).await.unwrap();
    assert_eq!(finished.status.as_deref(), Some("UNSTABLE"));
}

#[tokio::test]
async fn test_terminal_job_is_untouched() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::starting_after(0));
    let run = fixture.patch_run("week1");
    let mut job = queued_build(&fixture, &ci, &run);
    job.status = Some("ABORTED".to_string());
    let job = fixture.store.resolve_job(&job).unwrap();

    let tracked = engine.tracker().track(job.id).await.unwrap();

    assert_eq!(tracked.status.as_deref(), Some("ABORTED"));
    assert!(tracked.tracking_outcome.is_none());
    assert_eq!(builds.polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_queue_failure_is_an_error() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (ci, builds) = fixture.build_server("ci", FakeBuildRunner::starting_after(0));
    builds.fail_queue.store(true, Ordering::SeqCst);
    let run = fixture.patch_run("week1");
    let job = queued_build(&fixture, &ci, &run);

    let result = engine.tracker().track(job.id).await;

    assert!(matches!(result, Err(EngineError::Backend { .. })));
    let stored = fixture.store.get_job(job.id).unwrap().unwrap();
    assert!(stored.tracking_outcome.is_none());
}

#[tokio::test]
async fn test_task_status_only_written_when_terminal() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (backend, _, runner) = fixture.orchestrator("pe-prod");
    let run = fixture.patch_run("week1");
    let job = submitted_task(&fixture, &backend, &run, "17");

    runner
        .states
        .lock()
        .unwrap()
        .insert("17".to_string(), "running".to_string());
    let running = engine.tracker().track(job.id).await.unwrap();
    assert!(running.status.is_none());

    runner
        .states
        .lock()
        .unwrap()
        .insert("17".to_string(), "finished".to_string());
    let finished = engine.tracker().track(job.id).await.unwrap();
    assert_eq!(finished.status.as_deref(), Some("finished"));

    // a later state is never written over a terminal one
    runner
        .states
        .lock()
        .unwrap()
        .insert("17".to_string(), "failed".to_string());
    let again = engine.tracker().track(job.id).await.unwrap();
    assert_eq!(again.status.as_deref(), Some("finished"));
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();

    let result = engine.tracker().track(Uuid::new_v4()).await;

    assert!(matches!(result, Err(EngineError::NotFound { entity: "job", .. })));
}

#[tokio::test]
async fn test_full_pool_rejects_jobs() {
    let fixture = TestFixture::new();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let registry = Arc::new(BackendRegistry::new(store.clone(), fixture.factory.clone()));
    let fanout = Arc::new(Fanout::new(
        store.clone(),
        fixture.sender.clone(),
        "https://patchwork.example.com",
        None,
    ));
    let tracker = Arc::new(Tracker::new(
        store,
        registry,
        fanout,
        &fixture.settings.tracking,
    ));

    // The current-thread test runtime does not run the worker between submits.
    let pool = TrackingPool::start(tracker, 1, 1);
    pool.submit(Uuid::new_v4()).expect("First job fits");
    let result = pool.submit(Uuid::new_v4());

    assert!(matches!(result, Err(EngineError::Queue(_))));
}
