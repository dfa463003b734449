/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Trello Boards
//!
//! A board is a checklist view of a patch run, built from the run's stored
//! hierarchy:
//!
//! | Trello      | Patch run                          |
//! |-------------|------------------------------------|
//! | card        | application environment            |
//! | checklist   | component                          |
//! | check item  | server, checked when up to date    |
//!
//! [`Boards::create`] creates the remote board and records it before
//! filling it in, either inline or on a background task. Population keeps
//! going past individual failures and reports what it managed to add.

use crate::error::{ClientError, EngineError};
use crate::fanout::Fanout;
use crate::inventory::facts::CLIQR_CERTNAME_MARKER;
use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use patchwork_models::models::trello_boards::{default_name_for, BACKGROUNDS};
use patchwork_models::models::{
    Application, EventAction, NewTrelloBoard, PatchRunEvent, Server, TrelloBoard,
};
use patchwork_utils::logging::prelude::*;
use rand::seq::SliceRandom;
use std::sync::Arc;
use uuid::Uuid;

pub mod trello;

pub use trello::TrelloClient;

/// Board attributes sent on creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSpec {
    pub name: String,
    pub description: String,
    pub background: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBoard {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCard {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSpec {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItemSpec {
    pub name: String,
    pub checked: bool,
}

/// One component of an environment card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecklistLayout {
    pub name: String,
    pub items: Vec<CheckItemSpec>,
}

/// One environment of a patch run, as it appears on the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLayout {
    pub card: CardSpec,
    pub checklists: Vec<ChecklistLayout>,
}

/// Remote board operations.
#[async_trait]
pub trait BoardService: Send + Sync {
    async fn create_board(&self, spec: &BoardSpec) -> Result<RemoteBoard, ClientError>;
    /// First list of a board, where cards are added.
    async fn first_list(&self, board_id: &str) -> Result<String, ClientError>;
    async fn add_card(&self, list_id: &str, card: &CardSpec) -> Result<RemoteCard, ClientError>;
    /// Returns the checklist id.
    async fn add_checklist(&self, card_id: &str, name: &str) -> Result<String, ClientError>;
    /// Returns the check item id.
    async fn add_check_item(
        &self,
        checklist_id: &str,
        item: &CheckItemSpec,
    ) -> Result<String, ClientError>;
    /// Deletes a board. `Ok(false)` means the board was already gone.
    async fn delete_board(&self, board_id: &str) -> Result<bool, ClientError>;
}

/// Optional attributes of a new board. Missing values get defaults.
#[derive(Debug, Clone, Default)]
pub struct BoardRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    /// A Trello color, or `random`.
    pub background: Option<String>,
}

/// What population added to a board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub cards: usize,
    pub checklists: usize,
    pub items: usize,
    pub failed: usize,
}

fn card_for(app: &Application, environment: &str, tool_url: &str) -> CardSpec {
    CardSpec {
        name: format!("{} [{}]", app.name, environment),
        description: format!(
            "Application: `{}`\n\
             Environment: `{}`\n\
             Patching Procedure: {}\n\
             Patching Automation Tool: {}",
            app.name,
            environment,
            app.patching_procedure.as_deref().unwrap_or_default(),
            tool_url
        ),
    }
}

fn check_item_for(server: &Server) -> CheckItemSpec {
    let updates = server.package_updates.unwrap_or(0);
    let mut name = format!(
        "{} ({}) - Updates: {}\nssh://{}",
        server.name, server.ip_address, updates, server.name
    );
    if server.name.contains(CLIQR_CERTNAME_MARKER) {
        name.push_str(&format!(" [VMName: {}]", server.vm_name));
    }
    CheckItemSpec {
        name,
        checked: updates == 0,
    }
}

/// Lays out the stored hierarchy of a run as board cards.
pub fn layout(
    store: &dyn Store,
    patch_run_id: Uuid,
    base_url: &str,
) -> Result<Vec<CardLayout>, EngineError> {
    let base_url = base_url.trim_end_matches('/');
    let mut cards = Vec::new();
    for app in store.list_applications(patch_run_id)? {
        for env in store.list_environments(app.id)? {
            let tool_url = format!("{}/environment/{}/components", base_url, env.id);
            let mut checklists = Vec::new();
            for component in store.list_components(env.id)? {
                let items = store
                    .list_servers(component.id)?
                    .iter()
                    .map(check_item_for)
                    .collect();
                checklists.push(ChecklistLayout {
                    name: component.name,
                    items,
                });
            }
            cards.push(CardLayout {
                card: card_for(&app, &env.name, &tool_url),
                checklists,
            });
        }
    }
    Ok(cards)
}

/// Resolves a requested background, picking a color for blank or `random`.
pub fn resolve_background(requested: Option<&str>) -> String {
    match requested.map(str::trim).filter(|b| !b.is_empty()) {
        Some(background) if background != "random" => background.to_string(),
        _ => BACKGROUNDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("blue")
            .to_string(),
    }
}

/// Creates, fills and deletes the Trello boards of patch runs.
pub struct Boards {
    store: Arc<dyn Store>,
    fanout: Arc<Fanout>,
    service: Option<Arc<dyn BoardService>>,
    base_url: String,
}

impl Boards {
    pub fn new(
        store: Arc<dyn Store>,
        fanout: Arc<Fanout>,
        service: Option<Arc<dyn BoardService>>,
        base_url: &str,
    ) -> Self {
        Self {
            store,
            fanout,
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Replaces the remote board service.
    pub fn with_service(mut self, service: Arc<dyn BoardService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn enabled(&self) -> bool {
        self.service.is_some()
    }

    fn service(&self) -> Result<Arc<dyn BoardService>, EngineError> {
        self.service
            .clone()
            .ok_or_else(|| EngineError::Validation("Trello is not configured".to_string()))
    }

    pub fn get(&self, id: Uuid) -> Result<TrelloBoard, EngineError> {
        self.store
            .get_board(id)?
            .ok_or_else(|| EngineError::not_found("trello board", id))
    }

    pub fn list(&self, patch_run_id: Uuid) -> Result<Vec<TrelloBoard>, EngineError> {
        Ok(self.store.list_boards(patch_run_id)?)
    }

    /// Creates a board for a run and announces it.
    ///
    /// With `wait`, the board is filled in before returning. Otherwise
    /// population runs on a spawned task and its outcome is only logged.
    pub async fn create(
        &self,
        patch_run_id: Uuid,
        request: BoardRequest,
        wait: bool,
    ) -> Result<TrelloBoard, EngineError> {
        let run = self
            .store
            .get_patch_run(patch_run_id)?
            .ok_or_else(|| EngineError::not_found("patch run", patch_run_id))?;
        let service = self.service()?;

        let now = Utc::now();
        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| default_name_for(now.date_naive()));
        let description = request
            .description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "# Patching Automation\n\
                     * Generated: `{}`\n\
                     * Patching Automation Tool: {}",
                    now.format("%a %b %e %H:%M:%S UTC %Y"),
                    self.fanout.origin_url(run.id)
                )
            });
        let background = resolve_background(request.background.as_deref());
        let new_board = NewTrelloBoard::new(run.id, name, description, background)
            .map_err(EngineError::Validation)?;

        let remote = service
            .create_board(&BoardSpec {
                name: new_board.name.clone(),
                description: new_board.description.clone(),
                background: new_board.background.clone(),
            })
            .await
            .map_err(|e| EngineError::backend("trello", e))?;
        info!("Trello board '{}' <{}>", new_board.name, remote.url);

        let mut board = self.store.create_board(&new_board)?;
        board.remote_id = Some(remote.id.clone());
        board.url = Some(remote.url);
        let board = self.store.update_board(&board)?;

        if wait {
            Self::populate(self.store.clone(), service, &self.base_url, &board).await;
        } else {
            let store = self.store.clone();
            let base_url = self.base_url.clone();
            let spawned = board.clone();
            tokio::spawn(async move {
                Self::populate(store, service, &base_url, &spawned).await;
            });
        }

        self.fanout
            .publish(
                &run,
                PatchRunEvent::new(EventAction::TrelloBoardCreated).with_board(board.clone()),
            )
            .await;
        Ok(board)
    }

    /// Fills a created board with one card per environment of its run.
    pub async fn populate(
        store: Arc<dyn Store>,
        service: Arc<dyn BoardService>,
        base_url: &str,
        board: &TrelloBoard,
    ) -> PopulateReport {
        let mut report = PopulateReport::default();
        let Some(remote_id) = board.remote_id.as_deref() else {
            warn!("Trello board {} has no remote board to populate", board.id);
            return report;
        };

        let cards = match layout(store.as_ref(), board.patch_run_id, base_url) {
            Ok(cards) => cards,
            Err(e) => {
                error!("Failed to lay out Trello board {}: {}", board.id, e);
                report.failed += 1;
                return report;
            }
        };
        let list_id = match service.first_list(remote_id).await {
            Ok(list_id) => list_id,
            Err(e) => {
                error!("Failed to read lists of Trello board {}: {}", board.id, e);
                report.failed += 1;
                return report;
            }
        };

        for entry in cards {
            let card = match service.add_card(&list_id, &entry.card).await {
                Ok(card) => card,
                Err(e) => {
                    warn!("Failed to add card '{}': {}", entry.card.name, e);
                    report.failed += 1;
                    continue;
                }
            };
            report.cards += 1;

            for checklist in entry.checklists {
                let checklist_id = match service.add_checklist(&card.id, &checklist.name).await {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("Failed to add checklist '{}': {}", checklist.name, e);
                        report.failed += 1;
                        continue;
                    }
                };
                report.checklists += 1;

                for item in &checklist.items {
                    match service.add_check_item(&checklist_id, item).await {
                        Ok(_) => report.items += 1,
                        Err(e) => {
                            warn!("Failed to add check item to '{}': {}", checklist.name, e);
                            report.failed += 1;
                        }
                    }
                }
            }
        }

        info!(
            "Trello board '{}' complete: {} cards, {} checklists, {} items, {} failed",
            board.name, report.cards, report.checklists, report.items, report.failed
        );
        report
    }

    /// Deletes a board remotely and locally, then announces it.
    ///
    /// A board Trello no longer knows is still removed locally.
    pub async fn delete(&self, id: Uuid) -> Result<TrelloBoard, EngineError> {
        let board = self.get(id)?;
        let run = self
            .store
            .get_patch_run(board.patch_run_id)?
            .ok_or_else(|| EngineError::not_found("patch run", board.patch_run_id))?;

        if let Some(remote_id) = board.remote_id.as_deref() {
            let deleted = self
                .service()?
                .delete_board(remote_id)
                .await
                .map_err(|e| EngineError::backend("trello", e))?;
            if !deleted {
                info!("Trello board {} was already gone upstream", remote_id);
            }
        }
        self.store.delete_board(id)?;
        info!("Deleted Trello board '{}' ({})", board.name, id);

        self.fanout
            .publish(
                &run,
                PatchRunEvent::new(EventAction::TrelloBoardDeleted).with_board(board.clone()),
            )
            .await;
        Ok(board)
    }
}
