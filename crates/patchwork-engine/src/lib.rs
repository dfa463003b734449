/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Patchwork Engine
//!
//! Orchestrates patch runs: a named patching campaign for the servers that
//! share a patch window.
//!
//! - [`reconciler`] rebuilds a run's Application → Environment → Component →
//!   Server hierarchy from inventory.
//! - [`dispatcher`] submits tasks, plans and builds against that hierarchy.
//! - [`tracker`] follows queued builds until their build number is known.
//! - [`fanout`] announces run lifecycle events on chat channels.
//! - [`boards`] mirrors a run onto a Trello checklist board.
//!
//! [`engine::Engine`] wires these over a [`store::Store`] and a
//! [`backends::BackendRegistry`].

pub mod backends;
pub mod boards;
pub mod cli;
pub mod dal;
pub mod db;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod fanout;
pub mod inventory;
pub mod metrics;
pub mod reconciler;
pub mod store;
pub mod tracker;
pub mod utils;
pub mod views;
