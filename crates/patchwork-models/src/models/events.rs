/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Patch run lifecycle events. These are not persisted; they exist only long
//! enough to be rendered and delivered to notification channels.

use super::jobs::Job;
use super::patch_runs::PatchRun;
use super::trello_boards::TrelloBoard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventAction {
    TestMessage,
    PatchRunCreated,
    PatchRunUpdated,
    PatchRunDeleted,
    JobBuildCreated,
    TrelloBoardCreated,
    TrelloBoardDeleted,
    /// Free-form event rendered from its raw message.
    Message,
}

impl EventAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventAction::TestMessage => "TEST_MESSAGE",
            EventAction::PatchRunCreated => "PATCH_RUN_CREATED",
            EventAction::PatchRunUpdated => "PATCH_RUN_UPDATED",
            EventAction::PatchRunDeleted => "PATCH_RUN_DELETED",
            EventAction::JobBuildCreated => "JOB_BUILD_CREATED",
            EventAction::TrelloBoardCreated => "TRELLO_BOARD_CREATED",
            EventAction::TrelloBoardDeleted => "TRELLO_BOARD_DELETED",
            EventAction::Message => "MESSAGE",
        }
    }
}

/// An event about a patch run, stamped by the fanout before delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchRunEvent {
    /// Unique identifier for this event.
    pub id: Uuid,
    pub action: EventAction,
    /// Snapshot of the run at publish time.
    pub patch_run: Option<PatchRun>,
    /// Job the event is about, if any.
    pub job: Option<Job>,
    /// Board the event is about, if any.
    pub board: Option<TrelloBoard>,
    /// Groups related messages into one chat thread.
    pub correlation_key: Option<String>,
    /// Link back to the run in the presentation layer.
    pub origin_url: Option<String>,
    /// Raw text used for actions without dedicated rendering.
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl PatchRunEvent {
    pub fn new(action: EventAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            action,
            patch_run: None,
            job: None,
            board: None,
            correlation_key: None,
            origin_url: None,
            message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_job(mut self, job: Job) -> Self {
        self.job = Some(job);
        self
    }

    pub fn with_board(mut self, board: TrelloBoard) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
