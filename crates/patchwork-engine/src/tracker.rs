/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Job Tracker
//!
//! Follows dispatched jobs until their upstream identity is known.
//!
//! A queued build has no number until the build server starts it, so
//! [`Tracker::track`] polls the queue item, copies the build record onto the
//! job once it appears, and announces the build on the run's channels. Task
//! and plan jobs only get a single state refresh.
//!
//! Detached tracking goes through [`TrackingPool`], a bounded queue served by
//! a fixed set of workers.

use crate::backends::{BackendRegistry, BuildRunner, OrchestratorJobKind};
use crate::error::EngineError;
use crate::fanout::Fanout;
use crate::metrics;
use crate::store::{Store, StoreError};
use patchwork_models::models::jobs::{is_terminal_state, KIND_BUILD, KIND_PLAN};
use patchwork_models::models::{Backend, EventAction, Job, PatchRunEvent, TrackingOutcome};
use patchwork_utils::config::Tracking;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub struct Tracker {
    store: Arc<dyn Store>,
    registry: Arc<BackendRegistry>,
    fanout: Arc<Fanout>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl Tracker {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<BackendRegistry>,
        fanout: Arc<Fanout>,
        settings: &Tracking,
    ) -> Self {
        Self {
            store,
            registry,
            fanout,
            poll_interval: settings.poll_interval(),
            max_attempts: settings.max_attempts.max(1),
        }
    }

    /// Brings a job up to date with its backend.
    ///
    /// Jobs that already have a terminal status are returned unchanged. A
    /// build that never leaves the queue is recorded as timed out and stays
    /// pending; that is not an error.
    pub async fn track(&self, job_id: Uuid) -> Result<Job, EngineError> {
        let job = self
            .store
            .get_job(job_id)?
            .ok_or_else(|| EngineError::not_found("job", job_id))?;
        if job.is_terminal() {
            debug!("Job {} is already {:?}, nothing to track", job.id, job.status);
            return Ok(job);
        }

        let backend = self
            .store
            .get_backend(job.backend_id)?
            .ok_or_else(|| EngineError::not_found("backend", job.backend_id))?;

        let result = if job.is_build() {
            self.track_build(job, &backend).await
        } else {
            self.refresh_orchestrator_job(job, &backend).await
        };

        if let Err(e) = &result {
            metrics::TRACKING_OUTCOMES_TOTAL
                .with_label_values(&["failed"])
                .inc();
            error!("Tracking job {} on '{}' failed: {}", job_id, backend.name, e);
        }
        result
    }

    async fn track_build(&self, mut job: Job, backend: &Backend) -> Result<Job, EngineError> {
        let builds = self.registry.connection_for(backend)?.builds()?;

        // Already resolved: only the result can still change.
        if job.outcome() == Some(TrackingOutcome::Resolved) {
            return self.refresh_build_result(job, builds.as_ref(), backend).await;
        }

        let queue_id = job.queue_id.ok_or_else(|| {
            EngineError::Validation(format!("Build job {} has no queue id", job.id))
        })?;

        let mut executable = None;
        for attempt in 1..=self.max_attempts {
            let item = builds
                .queue_item(queue_id)
                .await
                .map_err(|e| EngineError::backend(&backend.name, e))?;
            if let Some(found) = item.executable {
                debug!(
                    "Queue item {} resolved to build #{} after {} polls",
                    queue_id, found.number, attempt
                );
                executable = Some(found);
                break;
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        let Some(executable) = executable else {
            job.tracking_outcome = Some(TrackingOutcome::TimedOut.as_str().to_string());
            let job = self.persist(&job)?;
            metrics::TRACKING_OUTCOMES_TOTAL
                .with_label_values(&[TrackingOutcome::TimedOut.as_str()])
                .inc();
            warn!(
                "Queue item {} of job {} did not start after {} polls, leaving it pending",
                queue_id, job.id, self.max_attempts
            );
            return Ok(job);
        };

        let record = builds
            .build(&job.name, executable.number)
            .await
            .map_err(|e| EngineError::backend(&backend.name, e))?;

        job.name = record.name;
        job.api_job_id = Some(record.number.to_string());
        job.api_job_url = Some(record.url.clone());
        job.console_url = Some(record.url);
        job.status = terminal_result(record.result);
        job.tracking_outcome = Some(TrackingOutcome::Resolved.as_str().to_string());
        let job = self.persist(&job)?;

        metrics::TRACKING_OUTCOMES_TOTAL
            .with_label_values(&[TrackingOutcome::Resolved.as_str()])
            .inc();
        info!(
            "Job {} resolved to build '{}' #{}",
            job.id,
            job.name,
            job.api_job_id.as_deref().unwrap_or_default()
        );

        self.announce(&job).await;
        Ok(job)
    }

    async fn refresh_build_result(
        &self,
        mut job: Job,
        builds: &dyn BuildRunner,
        backend: &Backend,
    ) -> Result<Job, EngineError> {
        let (Some(number), Some(job_path)) = (
            job.api_job_id.as_deref().and_then(|n| n.parse::<i64>().ok()),
            job.api_job_url.as_deref().and_then(job_path_from_url),
        ) else {
            return Ok(job);
        };

        let record = builds
            .build(&job_path, number)
            .await
            .map_err(|e| EngineError::backend(&backend.name, e))?;
        match terminal_result(record.result) {
            Some(result) => {
                job.status = Some(result);
                self.persist(&job)
            }
            None => Ok(job),
        }
    }

    async fn refresh_orchestrator_job(
        &self,
        mut job: Job,
        backend: &Backend,
    ) -> Result<Job, EngineError> {
        let Some(upstream_id) = job.api_job_id.clone() else {
            return Ok(job);
        };
        let kind = if job.kind == KIND_PLAN {
            OrchestratorJobKind::Plan
        } else {
            OrchestratorJobKind::Task
        };

        let state = self
            .registry
            .connection_for(backend)?
            .tasks()?
            .job_state(kind, &upstream_id)
            .await
            .map_err(|e| EngineError::backend(&backend.name, e))?;

        match state {
            Some(state) if is_terminal_state(&job.kind, &state) => {
                info!("Job {} ({} {}) is {}", job.id, job.kind, upstream_id, state);
                job.status = Some(state);
                self.persist(&job)
            }
            other => {
                debug!("Job {} still running ({:?})", job.id, other);
                Ok(job)
            }
        }
    }

    /// Writes tracking results, keeping whatever another writer finalized first.
    fn persist(&self, job: &Job) -> Result<Job, EngineError> {
        match self.store.resolve_job(job) {
            Ok(job) => Ok(job),
            Err(StoreError::Conflict(message)) => {
                debug!("Job {} was finalized concurrently: {}", job.id, message);
                self.store
                    .get_job(job.id)?
                    .ok_or_else(|| EngineError::not_found("job", job.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn announce(&self, job: &Job) {
        let Some(patch_run_id) = job.patch_run_id else {
            return;
        };
        match self.store.get_patch_run(patch_run_id) {
            Ok(Some(run)) => {
                let event = PatchRunEvent::new(EventAction::JobBuildCreated).with_job(job.clone());
                self.fanout.publish(&run, event).await;
            }
            Ok(None) => warn!(
                "Patch run {} of job {} is gone, build not announced",
                patch_run_id, job.id
            ),
            Err(e) => error!(
                "Failed to load patch run {} to announce job {}: {}",
                patch_run_id, job.id, e
            ),
        }
    }
}

/// Recovers the job path from a build URL such as `https://ci/job/a/job/b/12/`.
fn job_path_from_url(url: &str) -> Option<String> {
    let path = url::Url::parse(url).ok()?.path().to_string();
    let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();
    let mut parts = Vec::new();
    while let Some(segment) = segments.next() {
        if segment == "job" {
            parts.push(segments.next()?.to_string());
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Bounded queue of jobs awaiting detached tracking.
#[derive(Clone)]
pub struct TrackingPool {
    sender: mpsc::Sender<Uuid>,
}

impl TrackingPool {
    /// Starts `workers` tracking tasks sharing one queue of `capacity` jobs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(tracker: Arc<Tracker>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = workers.max(1);

        for worker in 0..workers {
            let tracker = tracker.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(job_id) = next else {
                        break;
                    };
                    match tracker.track(job_id).await {
                        Ok(job) => debug!(
                            "Tracking worker {} finished job {} ({:?})",
                            worker, job.id, job.tracking_outcome
                        ),
                        Err(e) => error!("Tracking worker {} failed on job {}: {}", worker, job_id, e),
                    }
                }
                debug!("Tracking worker {} stopped", worker);
            });
        }

        info!(
            "Tracking pool started with {} workers and capacity {}",
            workers, capacity
        );
        Self { sender }
    }

    /// Queues a job for tracking without waiting.
    pub fn submit(&self, job_id: Uuid) -> Result<(), EngineError> {
        self.sender.try_send(job_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(id) => {
                warn!("Tracking queue is full, job {} stays pending", id);
                EngineError::Queue(format!("tracking queue is full, job {} stays pending", id))
            }
            mpsc::error::TrySendError::Closed(id) => {
                EngineError::Queue(format!("tracking pool is stopped, job {} stays pending", id))
            }
        })
    }
}

/// A build result, kept only when the build has finished.
fn terminal_result(result: Option<String>) -> Option<String> {
    result.filter(|result| {
        let terminal = is_terminal_state(KIND_BUILD, result);
        if !terminal {
            debug!("Ignoring non-terminal build result '{}'", result);
        }
        terminal
    })
}
