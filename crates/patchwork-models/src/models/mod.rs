/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data models for the patch-run hierarchy, automation backends and notifications.
pub mod applications;
pub mod backends;
pub mod components;
pub mod definitions;
pub mod environments;
pub mod events;
pub mod jobs;
pub mod notification_channels;
pub mod patch_runs;
pub mod servers;
pub mod trello_boards;

pub use applications::{Application, NewApplication};
pub use backends::{Backend, NewBackend};
pub use components::{Component, HealthCheckUpdate, NewComponent};
pub use definitions::{Definition, DefinitionParam, NewDefinition, NewDefinitionParam, ScopeLevel};
pub use environments::{Environment, NewEnvironment};
pub use events::{EventAction, PatchRunEvent};
pub use jobs::{Initiator, Job, JobParent, NewJob, TrackingOutcome};
pub use notification_channels::{NewNotificationChannel, NotificationChannel, PatchRunChannel};
pub use patch_runs::{NewPatchRun, PatchRun};
pub use servers::{NewServer, Server};
pub use trello_boards::{NewTrelloBoard, TrelloBoard};
