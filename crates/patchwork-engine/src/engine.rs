/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Process-wide wiring of the store, backend registry and the engine parts.
//!
//! Patch run lifecycle calls go through [`Engine`] so that every change is
//! announced on the run's notification channels.

use crate::backends::{BackendRegistry, ConnectionFactory, HttpConnectionFactory};
use crate::boards::{BoardService, Boards, TrelloClient};
use crate::dal::DAL;
use crate::db::create_shared_connection_pool;
use crate::dispatcher::{DefinitionSync, DispatchSettings, Dispatcher};
use crate::error::EngineError;
use crate::fanout::{ChannelSender, Fanout, WebhookSender};
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::store::Store;
use crate::tracker::{Tracker, TrackingPool};
use crate::utils::event_bus::{self, EventBus};
use patchwork_models::models::{EventAction, NewPatchRun, PatchRun, PatchRunEvent};
use patchwork_utils::config::Settings;
use patchwork_utils::logging::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

/// Database connections kept by the pool.
const POOL_SIZE: u32 = 10;

pub struct Engine {
    store: Arc<dyn Store>,
    registry: Arc<BackendRegistry>,
    fanout: Arc<Fanout>,
    events: Arc<EventBus>,
    tracker: Arc<Tracker>,
    reconciler: Reconciler,
    dispatcher: Dispatcher,
    definitions: DefinitionSync,
    boards: Boards,
}

impl Engine {
    /// Wires an engine over the given store, client factory and channel sender.
    ///
    /// Starts the event dispatcher and the tracking workers, so it must be
    /// called from within a tokio runtime.
    pub fn new(
        store: Arc<dyn Store>,
        factory: Arc<dyn ConnectionFactory>,
        sender: Arc<dyn ChannelSender>,
        settings: &Settings,
    ) -> Self {
        let registry = Arc::new(BackendRegistry::new(store.clone(), factory));
        let fanout = Arc::new(Fanout::new(
            store.clone(),
            sender,
            &settings.engine.base_url,
            settings.engine.message_prefix().map(str::to_string),
        ));
        let events = Arc::new(EventBus::with_capacity(
            store.clone(),
            fanout.clone(),
            settings.notifications.event_capacity,
        ));
        let tracker = Arc::new(Tracker::new(
            store.clone(),
            registry.clone(),
            fanout.clone(),
            &settings.tracking,
        ));
        let pool = TrackingPool::start(
            tracker.clone(),
            settings.tracking.workers,
            settings.tracking.queue_capacity,
        );

        Self {
            reconciler: Reconciler::new(store.clone(), registry.clone()),
            dispatcher: Dispatcher::new(
                store.clone(),
                registry.clone(),
                tracker.clone(),
                pool,
                DispatchSettings::from(&settings.engine),
            ),
            definitions: DefinitionSync::new(store.clone(), registry.clone()),
            boards: Boards::new(store.clone(), fanout.clone(), None, &settings.engine.base_url),
            store,
            registry,
            fanout,
            events,
            tracker,
        }
    }

    /// Builds the production engine: PostgreSQL store, HTTP clients and
    /// webhook delivery. Also registers the global event bus.
    pub fn from_settings(settings: &Settings) -> Result<Self, EngineError> {
        let pool = create_shared_connection_pool(
            &settings.database.url,
            POOL_SIZE,
            settings.database.schema.as_deref(),
        )?;
        let store: Arc<dyn Store> = Arc::new(DAL::new(pool));

        let factory = Arc::new(HttpConnectionFactory {
            inventory_timeout: settings.engine.inventory_timeout(),
            backend_timeout: settings.engine.backend_timeout(),
        });
        let sender = Arc::new(
            WebhookSender::new(settings.notifications.timeout())
                .map_err(|e| EngineError::backend("webhook", e))?,
        );

        let mut engine = Self::new(store, factory, sender, settings);
        if let Some((app_key, token)) = settings.trello.credentials() {
            let client = TrelloClient::new(
                &settings.trello.api_url,
                app_key,
                token,
                settings.trello.timeout(),
            )
            .map_err(|e| EngineError::backend("trello", e))?;
            engine = engine.with_board_service(Arc::new(client));
        } else {
            info!("Trello credentials not set, boards are disabled");
        }
        if let Err(e) = event_bus::init_event_bus(engine.events.clone()) {
            warn!("{}", e);
        }
        info!("Engine ready (base url {})", settings.engine.base_url);
        Ok(engine)
    }

    /// Enables Trello boards over the given service.
    pub fn with_board_service(mut self, service: Arc<dyn BoardService>) -> Self {
        self.boards = self.boards.with_service(service);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn fanout(&self) -> &Arc<Fanout> {
        &self.fanout
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn definitions(&self) -> &DefinitionSync {
        &self.definitions
    }

    pub fn boards(&self) -> &Boards {
        &self.boards
    }

    pub fn create_patch_run(&self, new_run: &NewPatchRun) -> Result<PatchRun, EngineError> {
        let run = self.store.create_patch_run(new_run)?;
        info!("Created patch run '{}' ({})", run.name, run.id);
        self.events
            .emit(run.id, PatchRunEvent::new(EventAction::PatchRunCreated));
        Ok(run)
    }

    /// Saves a run. A changed patch window rebuilds the run's hierarchy from
    /// inventory before the update is announced; the report is returned.
    pub async fn update_patch_run(
        &self,
        run: &PatchRun,
    ) -> Result<(PatchRun, Option<ReconcileReport>), EngineError> {
        let previous = self
            .store
            .get_patch_run(run.id)?
            .ok_or_else(|| EngineError::not_found("patch run", run.id))?;
        let run = self.store.update_patch_run(run)?;
        info!("Updated patch run '{}' ({})", run.name, run.id);

        let report = if run.patch_window != previous.patch_window {
            info!(
                "Patch window of '{}' changed from '{}' to '{}', reconciling",
                run.name, previous.patch_window, run.patch_window
            );
            Some(self.reconciler.reconcile(&run).await?)
        } else {
            None
        };

        self.events
            .emit(run.id, PatchRunEvent::new(EventAction::PatchRunUpdated));
        Ok((run, report))
    }

    /// Deletes a run and everything below it.
    ///
    /// The deletion notice is published before the delete, while the run's
    /// channel links still exist.
    pub async fn delete_patch_run(&self, id: Uuid) -> Result<(), EngineError> {
        let run = self
            .store
            .get_patch_run(id)?
            .ok_or_else(|| EngineError::not_found("patch run", id))?;
        self.fanout
            .publish(&run, PatchRunEvent::new(EventAction::PatchRunDeleted))
            .await;
        self.store.delete_patch_run(id)?;
        info!("Deleted patch run '{}' ({})", run.name, id);
        Ok(())
    }

    pub async fn test_channel(&self, channel_id: Uuid) -> Result<(), EngineError> {
        self.fanout.send_test(channel_id).await
    }

    /// Drops all cached backend connections.
    pub fn shutdown(&self) {
        self.registry.shutdown();
        info!("Engine shut down");
    }
}
