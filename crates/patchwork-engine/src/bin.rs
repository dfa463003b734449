/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Patchwork CLI application
//!
//! Loads configuration, initializes logging and tracing, and runs one engine
//! command.

use patchwork_engine::boards::BoardRequest;
use patchwork_engine::cli::{self, commands, BoardSubcommands, Commands, DefinitionSubcommands};
use patchwork_engine::engine::Engine;
use patchwork_utils::config::Settings;
use patchwork_utils::logging::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = cli::parse_cli();

    // Load configuration
    let config = Settings::new(cli.config.clone()).expect("Failed to load configuration");

    // Initialize logger
    patchwork_utils::logging::init_with_format(&config.log.level, &config.log.format)
        .expect("Failed to initialize logger");

    if let Err(e) =
        patchwork_utils::telemetry::init(&config.telemetry, &config.log.level, &config.log.format)
    {
        warn!("Tracing subscriber not fully installed: {}", e);
    }

    let result = run(cli.command, &config).await;

    patchwork_utils::telemetry::shutdown();
    if let Err(e) = &result {
        error!("Command failed: {}", e);
    }
    result
}

async fn run(command: Commands, config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Migrate = command {
        return commands::migrate(config);
    }

    let engine = Engine::from_settings(config)?;
    let result = match command {
        Commands::Migrate => unreachable!("handled before the engine is built"),
        Commands::Reconcile(args) => commands::reconcile(&engine, &args).await,
        Commands::PatchWindows => commands::patch_windows(&engine).await,
        Commands::Definition(definition) => match definition.command {
            DefinitionSubcommands::Import {
                backend,
                kind,
                name,
            } => commands::import_definition(&engine, backend, &kind, &name).await,
            DefinitionSubcommands::Sync { definition } => {
                commands::sync_definition(&engine, definition).await
            }
        },
        Commands::Dispatch(args) => commands::dispatch(&engine, &args).await,
        Commands::Track { job } => commands::track(&engine, job).await,
        Commands::ExportCsv { patch_run, output } => {
            commands::export_csv(&engine, patch_run, output.as_deref())
        }
        Commands::TestChannel { channel } => commands::test_channel(&engine, channel).await,
        Commands::Board(board) => match board.command {
            BoardSubcommands::Create {
                patch_run,
                name,
                description,
                background,
            } => {
                let request = BoardRequest {
                    name,
                    description,
                    background,
                };
                commands::create_board(&engine, patch_run, request).await
            }
            BoardSubcommands::List { patch_run } => commands::list_boards(&engine, patch_run),
            BoardSubcommands::Delete { board } => commands::delete_board(&engine, board).await,
        },
    };
    engine.shutdown();
    result
}
