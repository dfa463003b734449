/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::boards::BoardRequest;
use crate::cli::{DispatchArgs, OperationKind, ReconcileArgs, TargetKind};
use crate::db::create_shared_connection_pool;
use crate::dispatcher::{DispatchRequest, Operation, Target};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::reconciler::ReconcileReport;
use crate::views;
use patchwork_models::models::{Job, TrelloBoard};
use patchwork_utils::config::Settings;
use patchwork_utils::logging::prelude::*;
use std::path::Path;
use uuid::Uuid;

pub fn migrate(config: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    info!("Running pending database migrations");

    let pool = create_shared_connection_pool(
        &config.database.url,
        1,
        config.database.schema.as_deref(),
    )?;
    let applied = pool.run_migrations()?;

    info!("Database migrations completed, {} applied", applied);
    println!("Applied {} migrations", applied);
    Ok(())
}

pub async fn reconcile(
    engine: &Engine,
    args: &ReconcileArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let reconciler = engine.reconciler();
    let (run, report) = match (&args.window, args.patch_run) {
        (Some(window), _) => reconciler.reconcile_window(window).await?,
        (None, Some(id)) => {
            let run = engine
                .store()
                .get_patch_run(id)?
                .ok_or_else(|| EngineError::not_found("patch run", id))?;
            let report = reconciler.reconcile(&run).await?;
            (run, report)
        }
        (None, None) => return Err("either --window or --patch-run is required".into()),
    };

    println!("Patch run: {} ({})", run.name, run.id);
    print_report(&report);
    Ok(())
}

fn print_report(report: &ReconcileReport) {
    println!("Backends queried: {}", report.backends_queried);
    println!("Backends skipped: {}", report.backends_skipped);
    println!("Nodes seen: {}", report.nodes_seen);
    println!("Servers written: {}", report.servers_written);
    for error in &report.errors {
        println!("Error: {}", error);
    }
}

pub async fn patch_windows(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let (windows, errors) = engine.reconciler().patch_windows().await?;
    for (window, count) in &windows {
        println!("{}\t{}", window, count);
    }
    for error in &errors {
        eprintln!("Error: {}", error);
    }
    Ok(())
}

pub async fn import_definition(
    engine: &Engine,
    backend: Uuid,
    kind: &str,
    name: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (definition, summary) = engine.definitions().import(backend, kind, name).await?;
    println!("Definition imported successfully:");
    println!("ID: {}", definition.id);
    println!("Name: {}", definition.name);
    println!("Parameters: {}", summary.upserted);
    Ok(())
}

pub async fn sync_definition(
    engine: &Engine,
    definition: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let (definition, summary) = engine.definitions().sync(definition).await?;
    println!(
        "Synced '{}': {} current, {} deleted, {} stale",
        definition.name, summary.upserted, summary.deleted, summary.stale
    );
    Ok(())
}

pub fn dispatch_request(args: &DispatchArgs) -> Result<(Target, DispatchRequest), EngineError> {
    let target = match args.target {
        TargetKind::Component => Target::Component {
            id: args.id,
            backend: args.backend,
        },
        TargetKind::Server => Target::Server(args.id),
        TargetKind::PatchRun => Target::PatchRun(args.id),
    };

    let definition = || {
        args.definition.ok_or_else(|| {
            EngineError::Validation("--definition is required for this operation".to_string())
        })
    };
    let operation = match args.operation {
        OperationKind::Task => Operation::Task(definition()?),
        OperationKind::Plan => Operation::Plan(definition()?),
        OperationKind::Build => Operation::Build {
            definition_id: definition()?,
            wait_for_completion: args.wait,
        },
        OperationKind::ClusterPatch => Operation::ClusterPatch,
        OperationKind::PatchServer => Operation::PatchServer {
            test_mode: args.test_mode,
        },
    };

    let mut request = DispatchRequest::new(operation);
    for (name, value) in &args.params {
        request = request.with_override(name.clone(), value.clone());
    }
    if let Some(url) = &args.origin_url {
        request = request.with_origin_url(url.clone());
    }
    Ok((target, request))
}

pub async fn dispatch(engine: &Engine, args: &DispatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (target, request) = dispatch_request(args)?;
    match engine.dispatcher().dispatch(target, &request).await {
        Ok(jobs) => {
            print_jobs(&jobs);
            Ok(())
        }
        Err(EngineError::PartialDispatch {
            submitted,
            failures,
        }) => {
            print_jobs(&submitted);
            Err(EngineError::PartialDispatch {
                submitted,
                failures,
            }
            .into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_jobs(jobs: &[Job]) {
    for job in jobs {
        println!(
            "{}\t{}\t{}\t{}",
            job.id,
            job.kind,
            job.name,
            job.console_url.as_deref().unwrap_or("-")
        );
    }
}

pub async fn track(engine: &Engine, job: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let job = engine.tracker().track(job).await?;
    println!("Job: {} ({})", job.name, job.id);
    println!("Status: {}", job.status.as_deref().unwrap_or("pending"));
    if let Some(outcome) = &job.tracking_outcome {
        println!("Tracking: {}", outcome);
    }
    if let Some(url) = &job.console_url {
        println!("Console: {}", url);
    }
    Ok(())
}

pub fn export_csv(
    engine: &Engine,
    patch_run: Uuid,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let csv = views::servers_csv(engine.store().as_ref(), patch_run)?;
    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            info!("Wrote servers of patch run {} to {}", patch_run, path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

pub async fn test_channel(engine: &Engine, channel: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    engine.test_channel(channel).await?;
    println!("Test message sent");
    Ok(())
}

fn print_board(board: &TrelloBoard) {
    println!(
        "{}\t{}\t{}",
        board.id,
        board.name,
        board.url.as_deref().unwrap_or("-")
    );
}

pub async fn create_board(
    engine: &Engine,
    patch_run: Uuid,
    request: BoardRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    // the process exits after the command, so population cannot be left running
    let board = engine.boards().create(patch_run, request, true).await?;
    print_board(&board);
    Ok(())
}

pub fn list_boards(engine: &Engine, patch_run: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    for board in engine.boards().list(patch_run)? {
        print_board(&board);
    }
    Ok(())
}

pub async fn delete_board(engine: &Engine, board: Uuid) -> Result<(), Box<dyn std::error::Error>> {
    let board = engine.boards().delete(board).await?;
    println!("Deleted board '{}'", board.name);
    Ok(())
}
