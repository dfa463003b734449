/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Markdown rendering of patch run events for chat channels.

use chrono::{DateTime, Utc};
use patchwork_models::models::{EventAction, PatchRun, PatchRunEvent};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders `[text](url)`, or `<url>` when there is no text.
pub fn link(text: &str, url: &str) -> String {
    match (text.is_empty(), url.is_empty()) {
        (_, true) => text.to_string(),
        (true, false) => format!("<{}>", url),
        (false, false) => format!("[{}]({})", text, url),
    }
}

fn time(value: &DateTime<Utc>) -> String {
    value.format(TIME_FORMAT).to_string()
}

fn details(run: &PatchRun, origin_url: &str) -> String {
    let mut text = format!("**Name:** {}\n", link(&run.name, origin_url));
    if let Some(description) = run.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("**Description:** `{}`\n", description));
    }
    if let Some(start) = &run.start_time {
        text.push_str(&format!("**Start Time:** `{}`\n", time(start)));
    }
    if let Some(end) = &run.end_time {
        text.push_str(&format!("**End Time:** `{}`\n", time(end)));
    }
    text
}

/// Renders the chat message for a stamped event.
pub fn render_message(event: &PatchRunEvent, prefix: Option<&str>) -> String {
    let origin_url = event.origin_url.as_deref().unwrap_or_default();
    let body = match (&event.action, &event.patch_run) {
        (EventAction::TestMessage, _) => {
            "🧪 Test Message from Patching Automation 🧪".to_string()
        }
        (EventAction::PatchRunCreated, Some(run)) => {
            format!("❇️ Patch Run Created 🦖\n{}", details(run, origin_url))
        }
        (EventAction::PatchRunUpdated, Some(run)) => {
            format!("⏫ Patch Run Updated 🦖\n{}", details(run, origin_url))
        }
        (EventAction::PatchRunDeleted, Some(run)) => {
            format!("❌ **Patch Run Deleted:** `{}`\n", run.name)
        }
        (EventAction::JobBuildCreated, _) if event.job.is_some() => {
            let job = event.job.as_ref().map(|job| {
                let title = format!(
                    "{} #{}",
                    job.name,
                    job.api_job_id.as_deref().unwrap_or_default()
                );
                link(&title, job.api_job_url.as_deref().unwrap_or_default())
            });
            format!("🏗 Jenkins Build Created: {}", job.unwrap_or_default())
        }
        (EventAction::TrelloBoardCreated, _) if event.board.is_some() => {
            let board = event.board.as_ref().map(|board| {
                link(&board.name, board.url.as_deref().unwrap_or_default())
            });
            format!("🎯 New Trello Board Created: {}", board.unwrap_or_default())
        }
        (EventAction::TrelloBoardDeleted, _) if event.board.is_some() => {
            let name = event.board.as_ref().map(|b| b.name.as_str()).unwrap_or_default();
            format!("❌ **Trello Board Deleted:** `{}`\n", name)
        }
        _ => event.message.clone().unwrap_or_default(),
    };

    match prefix {
        Some(prefix) => format!("{}{}", prefix, body),
        None => body,
    }
}
