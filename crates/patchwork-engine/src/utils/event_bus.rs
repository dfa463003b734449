/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Event Bus for patch run lifecycle notifications.
//!
//! This module provides an in-process event bus using tokio mpsc channels.
//! Lifecycle call sites emit events without waiting for delivery; a
//! dispatcher task reloads the run and hands the event to the [`Fanout`].

use crate::fanout::Fanout;
use crate::store::Store;
use once_cell::sync::OnceCell;
use patchwork_models::models::PatchRunEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default channel buffer size for events.
const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Global event bus storage.
static EVENT_BUS: OnceCell<Arc<EventBus>> = OnceCell::new();

/// An event addressed to one patch run.
#[derive(Debug, Clone)]
pub struct LifecycleEvent {
    pub patch_run_id: Uuid,
    pub event: PatchRunEvent,
}

/// The event bus feeding the fanout.
#[derive(Clone)]
pub struct EventBus {
    /// Sender for emitting events.
    sender: mpsc::Sender<LifecycleEvent>,
}

impl EventBus {
    /// Creates a new event bus and starts the dispatcher.
    pub fn new(store: Arc<dyn Store>, fanout: Arc<Fanout>) -> Self {
        Self::with_capacity(store, fanout, DEFAULT_CHANNEL_SIZE)
    }

    /// Creates a new event bus with a custom channel capacity.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_capacity(store: Arc<dyn Store>, fanout: Arc<Fanout>, capacity: usize) -> Self {
        let (bus, receiver) = Self::channel(capacity);

        start_event_dispatcher(store, fanout, receiver);

        info!("Event bus started with capacity {}", capacity);

        bus
    }

    fn channel(capacity: usize) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Emits an event to the bus without waiting.
    ///
    /// Events are queued in emission order. When the channel is full or
    /// closed the event is dropped with a warning and `false` is returned.
    pub fn emit(&self, patch_run_id: Uuid, event: PatchRunEvent) -> bool {
        let action = event.action.as_str();
        let event_id = event.id;

        match self.sender.try_send(LifecycleEvent { patch_run_id, event }) {
            Ok(()) => {
                debug!("Event emitted: {} (id: {})", action, event_id);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(
                    "Event bus is full, event dropped: {} (id: {}) for patch run {}",
                    action, event_id, patch_run_id
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(
                    "Event bus is closed, event dropped: {} (id: {})",
                    action, event_id
                );
                false
            }
        }
    }
}

/// Initializes the global event bus.
///
/// # Returns
/// Ok(()) if initialization succeeded, Err if already initialized.
pub fn init_event_bus(bus: Arc<EventBus>) -> Result<(), String> {
    EVENT_BUS
        .set(bus)
        .map_err(|_| "Event bus already initialized".to_string())
}

/// Gets the global event bus, if initialized.
pub fn get_event_bus() -> Option<Arc<EventBus>> {
    EVENT_BUS.get().cloned()
}

/// Emits an event to the global event bus.
pub fn emit(patch_run_id: Uuid, event: PatchRunEvent) -> bool {
    if let Some(bus) = get_event_bus() {
        bus.emit(patch_run_id, event)
    } else {
        warn!(
            "Event bus not initialized, event dropped: {}",
            event.action.as_str()
        );
        false
    }
}

/// Starts the event dispatcher background task.
fn start_event_dispatcher(
    store: Arc<dyn Store>,
    fanout: Arc<Fanout>,
    mut receiver: mpsc::Receiver<LifecycleEvent>,
) {
    tokio::spawn(async move {
        info!("Event dispatcher started");

        while let Some(message) = receiver.recv().await {
            dispatch_event(store.as_ref(), &fanout, message).await;
        }

        warn!("Event dispatcher stopped - channel closed");
    });
}

/// Publishes one event against the current state of its run.
///
/// A run that no longer exists falls back to the snapshot carried by the
/// event.
async fn dispatch_event(store: &dyn Store, fanout: &Fanout, message: LifecycleEvent) {
    let LifecycleEvent { patch_run_id, event } = message;

    let run = match store.get_patch_run(patch_run_id) {
        Ok(Some(run)) => run,
        Ok(None) => match event.patch_run.clone() {
            Some(snapshot) => snapshot,
            None => {
                warn!(
                    "Patch run {} not found, event dropped: {}",
                    patch_run_id,
                    event.action.as_str()
                );
                return;
            }
        },
        Err(e) => {
            error!(
                "Failed to load patch run {} for event {}: {}",
                patch_run_id,
                event.action.as_str(),
                e
            );
            return;
        }
    };

    fanout.publish(&run, event).await;
}
