/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Event Fanout
//!
//! Turns patch run lifecycle events into chat notifications.
//!
//! [`Fanout::publish`] stamps the event with the run snapshot, a
//! correlation key and an origin link, renders one message, and sends it to
//! every enabled channel linked to the run. Delivery failures are logged and
//! counted but never stop delivery to the remaining channels, and never
//! surface to the caller.

use crate::error::EngineError;
use crate::metrics;
use crate::store::Store;
use patchwork_models::models::{EventAction, PatchRun, PatchRunEvent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub mod channel;
pub mod render;

pub use channel::{ChannelSender, WebhookSender};
pub use render::render_message;

/// Delivery counts for one published event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failed: usize,
    /// Linked channels that are disabled.
    pub skipped: usize,
}

/// Publishes patch run events to notification channels.
pub struct Fanout {
    store: Arc<dyn Store>,
    sender: Arc<dyn ChannelSender>,
    base_url: String,
    message_prefix: Option<String>,
}

impl Fanout {
    pub fn new(
        store: Arc<dyn Store>,
        sender: Arc<dyn ChannelSender>,
        base_url: &str,
        message_prefix: Option<String>,
    ) -> Self {
        Self {
            store,
            sender,
            base_url: base_url.trim_end_matches('/').to_string(),
            message_prefix: message_prefix.filter(|p| !p.trim().is_empty()),
        }
    }

    /// Link back to a run in the presentation layer.
    pub fn origin_url(&self, patch_run_id: Uuid) -> String {
        format!("{}/patchRun/{}", self.base_url, patch_run_id)
    }

    /// Attaches the run snapshot, correlation key and origin link.
    pub fn stamp(&self, run: &PatchRun, mut event: PatchRunEvent) -> PatchRunEvent {
        event.patch_run = Some(run.clone());
        event.correlation_key = Some(run.id.to_string());
        event.origin_url = Some(self.origin_url(run.id));
        event
    }

    /// Sends `event` to every enabled channel linked to `run`.
    pub async fn publish(&self, run: &PatchRun, event: PatchRunEvent) -> FanoutReport {
        let event = self.stamp(run, event);
        let mut report = FanoutReport::default();

        let channels = match self.store.channels_for_patch_run(run.id) {
            Ok(channels) => channels,
            Err(e) => {
                error!(
                    "Failed to load channels for patch run {} ({}): {}",
                    run.id,
                    event.action.as_str(),
                    e
                );
                return report;
            }
        };

        if channels.is_empty() {
            debug!(
                "No channels linked to patch run {} for {}",
                run.id,
                event.action.as_str()
            );
            return report;
        }

        let text = render_message(&event, self.message_prefix.as_deref());
        if text.is_empty() {
            debug!("Nothing to send for {} (id: {})", event.action.as_str(), event.id);
            return report;
        }

        for channel in channels {
            if !channel.enabled {
                report.skipped += 1;
                continue;
            }
            match self.sender.send(&channel.webhook_url, &text).await {
                Ok(()) => {
                    report.delivered += 1;
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["sent"])
                        .inc();
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::NOTIFICATIONS_TOTAL
                        .with_label_values(&["failed"])
                        .inc();
                    warn!(
                        "Failed to notify channel '{}' of {} for patch run {}: {}",
                        channel.name,
                        event.action.as_str(),
                        run.id,
                        e
                    );
                }
            }
        }

        info!(
            "Published {} for patch run {}: {} delivered, {} failed, {} skipped",
            event.action.as_str(),
            run.id,
            report.delivered,
            report.failed,
            report.skipped
        );
        report
    }

    /// Sends the test message to one channel, enabled or not.
    pub async fn send_test(&self, channel_id: Uuid) -> Result<(), EngineError> {
        let channel = self
            .store
            .get_channel(channel_id)?
            .ok_or_else(|| EngineError::not_found("notification channel", channel_id))?;

        let text = render_message(
            &PatchRunEvent::new(EventAction::TestMessage),
            self.message_prefix.as_deref(),
        );
        self.sender
            .send(&channel.webhook_url, &text)
            .await
            .map_err(|e| EngineError::backend(&channel.name, e))
    }
}
