/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Jobs Module
//!
//! A job records one unit of work submitted to an automation backend.
//!
//! ## Status
//!
//! `status` is `None` while the job is pending. Only terminal backend states
//! are ever written, and a job with a status is never rewritten.
//!
//! ## Initiator and parent
//!
//! The entity a job was started from and the definition it instantiates are
//! stored as `<kind>_kind` + `<kind>_id` column pairs and exposed as the
//! [`Initiator`] and [`JobParent`] enums.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Constants
// =============================================================================

pub const KIND_TASK: &str = "task";
pub const KIND_PLAN: &str = "plan";
pub const KIND_BUILD: &str = "build";

pub const VALID_KINDS: &[&str] = &[KIND_TASK, KIND_PLAN, KIND_BUILD];

/// Terminal orchestrator job states
pub const ORCHESTRATOR_TERMINAL_STATES: &[&str] = &["finished", "failed", "stopped"];

/// Terminal build results
pub const BUILD_TERMINAL_RESULTS: &[&str] =
    &["SUCCESS", "FAILURE", "UNSTABLE", "ABORTED", "NOT_BUILT"];

/// Returns true when a backend reported state is final for a job of `kind`.
pub fn is_terminal_state(kind: &str, state: &str) -> bool {
    if kind == KIND_BUILD {
        BUILD_TERMINAL_RESULTS.contains(&state)
    } else {
        ORCHESTRATOR_TERMINAL_STATES.contains(&state)
    }
}

// =============================================================================
// Tagged References
// =============================================================================

/// The hierarchy entity a job was dispatched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Initiator {
    PatchRun(Uuid),
    Application(Uuid),
    Component(Uuid),
    Server(Uuid),
}

impl Initiator {
    pub fn kind(&self) -> &'static str {
        match self {
            Initiator::PatchRun(_) => "patch_run",
            Initiator::Application(_) => "application",
            Initiator::Component(_) => "component",
            Initiator::Server(_) => "server",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Initiator::PatchRun(id)
            | Initiator::Application(id)
            | Initiator::Component(id)
            | Initiator::Server(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Result<Self, String> {
        match kind {
            "patch_run" => Ok(Initiator::PatchRun(id)),
            "application" => Ok(Initiator::Application(id)),
            "component" => Ok(Initiator::Component(id)),
            "server" => Ok(Initiator::Server(id)),
            other => Err(format!("Unknown initiator kind '{}'", other)),
        }
    }
}

/// The definition a job instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum JobParent {
    Task(Uuid),
    Plan(Uuid),
    Build(Uuid),
    /// Built-in operations with no stored definition, such as the cluster patch plan.
    Builtin,
}

impl JobParent {
    pub fn kind(&self) -> &'static str {
        match self {
            JobParent::Task(_) => "task",
            JobParent::Plan(_) => "plan",
            JobParent::Build(_) => "build",
            JobParent::Builtin => "builtin",
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        match self {
            JobParent::Task(id) | JobParent::Plan(id) | JobParent::Build(id) => Some(*id),
            JobParent::Builtin => None,
        }
    }

    pub fn from_parts(kind: &str, id: Option<Uuid>) -> Result<Self, String> {
        match (kind, id) {
            ("task", Some(id)) => Ok(JobParent::Task(id)),
            ("plan", Some(id)) => Ok(JobParent::Plan(id)),
            ("build", Some(id)) => Ok(JobParent::Build(id)),
            ("builtin", _) => Ok(JobParent::Builtin),
            (other, None) => Err(format!("Parent kind '{}' requires an id", other)),
            (other, Some(_)) => Err(format!("Unknown parent kind '{}'", other)),
        }
    }
}

/// How tracking of a build's queue entry ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingOutcome {
    /// The queue entry produced a build number and the build was fetched.
    Resolved,
    /// Polling gave up before a build number appeared. The build may still run.
    TimedOut,
}

impl TrackingOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackingOutcome::Resolved => "resolved",
            TrackingOutcome::TimedOut => "timed_out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "resolved" => Some(TrackingOutcome::Resolved),
            "timed_out" => Some(TrackingOutcome::TimedOut),
            _ => None,
        }
    }
}

impl fmt::Display for TrackingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Job Models
// =============================================================================

/// Represents a job in the database.
#[derive(Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct Job {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    /// `task`, `plan` or `build`
    pub kind: String,
    /// Terminal backend state, `None` while pending
    pub status: Option<String>,
    /// Backend identifier: orchestrator job name or build number
    pub api_job_id: Option<String>,
    pub api_job_url: Option<String>,
    pub console_url: Option<String>,
    /// Build queue item, for builds
    pub queue_id: Option<i64>,
    pub initiator_kind: String,
    pub initiator_id: Uuid,
    pub parent_kind: String,
    pub parent_id: Option<Uuid>,
    pub backend_id: Uuid,
    pub patch_run_id: Option<Uuid>,
    pub tracking_outcome: Option<String>,
}

impl Job {
    pub fn is_terminal(&self) -> bool {
        self.status.is_some()
    }

    pub fn is_build(&self) -> bool {
        self.kind == KIND_BUILD
    }

    pub fn initiator(&self) -> Result<Initiator, String> {
        Initiator::from_parts(&self.initiator_kind, self.initiator_id)
    }

    pub fn parent(&self) -> Result<JobParent, String> {
        JobParent::from_parts(&self.parent_kind, self.parent_id)
    }

    pub fn outcome(&self) -> Option<TrackingOutcome> {
        self.tracking_outcome.as_deref().and_then(TrackingOutcome::parse)
    }
}

/// Represents a new job to be inserted into the database.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::jobs)]
pub struct NewJob {
    pub name: String,
    pub kind: String,
    pub status: Option<String>,
    pub api_job_id: Option<String>,
    pub api_job_url: Option<String>,
    pub console_url: Option<String>,
    pub queue_id: Option<i64>,
    pub initiator_kind: String,
    pub initiator_id: Uuid,
    pub parent_kind: String,
    pub parent_id: Option<Uuid>,
    pub backend_id: Uuid,
    pub patch_run_id: Option<Uuid>,
    pub tracking_outcome: Option<String>,
}

impl NewJob {
    /// Creates a new pending job.
    ///
    /// # Returns
    ///
    /// An error when the name is empty, the kind is unknown, or the parent
    /// kind does not match the job kind.
    pub fn new(
        name: String,
        kind: &str,
        initiator: Initiator,
        parent: JobParent,
        backend_id: Uuid,
        patch_run_id: Option<Uuid>,
    ) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Job name cannot be empty".to_string());
        }
        if !VALID_KINDS.contains(&kind) {
            return Err(format!(
                "Invalid job kind '{}'. Must be one of: {:?}",
                kind, VALID_KINDS
            ));
        }
        if parent != JobParent::Builtin && parent.kind() != kind {
            return Err(format!(
                "Parent kind '{}' does not match job kind '{}'",
                parent.kind(),
                kind
            ));
        }

        Ok(NewJob {
            name,
            kind: kind.to_string(),
            status: None,
            api_job_id: None,
            api_job_url: None,
            console_url: None,
            queue_id: None,
            initiator_kind: initiator.kind().to_string(),
            initiator_id: initiator.id(),
            parent_kind: parent.kind().to_string(),
            parent_id: parent.id(),
            backend_id,
            patch_run_id,
            tracking_outcome: None,
        })
    }
}
