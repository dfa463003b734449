/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Patchwork CLI
///
/// Reconciles patch runs against inventory, dispatches patching jobs and
/// follows them to completion.
pub struct Cli {
    /// Configuration file overriding the defaults
    #[arg(long, env = "PATCHWORK_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Rebuild a patch run's hierarchy from inventory
    Reconcile(ReconcileArgs),

    /// List patch windows known to the inventory
    PatchWindows,

    /// Definition import and refresh
    Definition(DefinitionCommands),

    /// Run a task, plan, build or built-in operation
    Dispatch(DispatchArgs),

    /// Bring a job up to date with its backend
    Track {
        #[arg(long)]
        job: Uuid,
    },

    /// Write a patch run's servers as CSV
    ExportCsv {
        #[arg(long)]
        patch_run: Uuid,
        /// Output file, stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Send the test message to a notification channel
    TestChannel {
        #[arg(long)]
        channel: Uuid,
    },

    /// Trello boards of patch runs
    Board(BoardCommands),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ReconcileArgs {
    /// Reconcile the newest run for this window, creating it if needed
    #[arg(long)]
    pub window: Option<String>,

    /// Reconcile an existing run
    #[arg(long)]
    pub patch_run: Option<Uuid>,
}

#[derive(Args)]
pub struct DefinitionCommands {
    #[command(subcommand)]
    pub command: DefinitionSubcommands,
}

#[derive(Subcommand)]
pub enum DefinitionSubcommands {
    /// Import a task, plan or build job from a backend
    Import {
        #[arg(long)]
        backend: Uuid,
        /// `task`, `plan` or `build`
        #[arg(long)]
        kind: String,
        /// `module::name`, or a job path for builds
        #[arg(long)]
        name: String,
    },

    /// Refresh a definition's parameters
    Sync {
        #[arg(long)]
        definition: Uuid,
    },
}

#[derive(Args)]
pub struct BoardCommands {
    #[command(subcommand)]
    pub command: BoardSubcommands,
}

#[derive(Subcommand)]
pub enum BoardSubcommands {
    /// Create and fill a board for a patch run
    Create {
        #[arg(long)]
        patch_run: Uuid,
        /// Defaults to `Patching: <today>`
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// A Trello color, or `random`
        #[arg(long)]
        background: Option<String>,
    },

    /// List the boards of a patch run
    List {
        #[arg(long)]
        patch_run: Uuid,
    },

    /// Delete a board from Trello and from the store
    Delete {
        #[arg(long)]
        board: Uuid,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum TargetKind {
    Component,
    Server,
    PatchRun,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OperationKind {
    Task,
    Plan,
    Build,
    ClusterPatch,
    PatchServer,
}

#[derive(Args)]
pub struct DispatchArgs {
    #[arg(long, value_enum)]
    pub target: TargetKind,

    /// Id of the component, server or patch run
    #[arg(long)]
    pub id: Uuid,

    /// Only servers inventoried from this backend (component targets)
    #[arg(long)]
    pub backend: Option<Uuid>,

    #[arg(long, value_enum)]
    pub operation: OperationKind,

    /// Definition to run (task, plan and build operations)
    #[arg(long)]
    pub definition: Option<Uuid>,

    /// Track a build until it leaves the queue before returning
    #[arg(long)]
    pub wait: bool,

    /// Only clean the package cache instead of patching
    #[arg(long)]
    pub test_mode: bool,

    /// Parameter override as `name=value`, repeatable
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Link embedded in the job description
    #[arg(long)]
    pub origin_url: Option<String>,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{}'", raw)),
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
