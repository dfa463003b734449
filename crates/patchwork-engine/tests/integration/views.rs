/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{node, TestFixture};
use patchwork_engine::cli::commands;
use patchwork_engine::error::EngineError;
use patchwork_engine::views::{application_overview, server_rows, servers_csv, CSV_HEADER};
use uuid::Uuid;

#[tokio::test]
async fn test_servers_csv_after_reconcile() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web02", "week1", "shop", "prod", "web", None));
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    inventory.add_node(node("api01", "week1", "billing", "prod", "api", None));
    let run = fixture.patch_run("week1");
    engine.reconciler().reconcile(&run).await.unwrap();

    let csv = servers_csv(fixture.store.as_ref(), run.id).expect("Failed to export CSV");
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], CSV_HEADER.join(","));
    assert_eq!(
        lines[1],
        "api01,10.0.0.10,billing,prod,api,RedHat,8.9,4,1,week1,vm-api01"
    );
    assert!(lines[2].starts_with("web01,"));
    assert!(lines[3].starts_with("web02,"));
}

#[tokio::test]
async fn test_server_rows_carry_ancestry() {
    let fixture = TestFixture::new();
    let run = fixture.patch_run("week1");
    let component = fixture.component(&run, "web", None);
    let server = fixture.server(&component, "web01", None);

    let rows = server_rows(fixture.store.as_ref(), run.id).unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].server_id, server.id);
    assert_eq!(rows[0].application, "shop");
    assert_eq!(rows[0].environment, "prod");
    assert_eq!(rows[0].component, "web");
    assert_eq!(rows[0].package_updates, None);
}

#[tokio::test]
async fn test_empty_run_exports_header_only() {
    let fixture = TestFixture::new();
    let run = fixture.patch_run("week1");

    let csv = servers_csv(fixture.store.as_ref(), run.id).unwrap();

    assert_eq!(csv.lines().count(), 1);
}

#[tokio::test]
async fn test_application_overview() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    inventory.add_node(node("web02", "week1", "shop", "staging", "web", None));
    inventory.add_node(node("api01", "week1", "billing", "prod", "api", None));
    let run = fixture.patch_run("week1");
    engine.reconciler().reconcile(&run).await.unwrap();

    let overview = application_overview(fixture.store.as_ref(), run.id).unwrap();

    let names: Vec<_> = overview.iter().map(|o| o.application.name.as_str()).collect();
    assert_eq!(names, vec!["billing", "shop"]);
    let environments: Vec<_> = overview[1]
        .environments
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(environments, vec!["prod", "staging"]);
}

#[tokio::test]
async fn test_unknown_run_is_not_found() {
    let fixture = TestFixture::new();

    let result = servers_csv(fixture.store.as_ref(), Uuid::new_v4());

    assert!(matches!(result, Err(EngineError::NotFound { .. })));
}

#[tokio::test]
async fn test_export_csv_command_writes_file() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let run = fixture.patch_run("week1");
    let component = fixture.component(&run, "web", None);
    fixture.server(&component, "web01", None);
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("servers.csv");

    commands::export_csv(&engine, run.id, Some(&path)).expect("Failed to export");

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, servers_csv(fixture.store.as_ref(), run.id).unwrap());
    assert_eq!(written.lines().count(), 2);
}
