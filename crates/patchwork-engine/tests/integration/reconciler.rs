/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::fixtures::{node, TestFixture};
use patchwork_engine::store::Store;
use patchwork_models::models::components::UNSET;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_reconcile_builds_hierarchy() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (backend, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", Some("/opt/check.sh")));
    inventory.add_node(node("web02", "week1", "shop", "prod", "web", Some("/opt/check.sh")));
    inventory.add_node(node("db01", "week1", "shop", "prod", "db", None));
    let run = fixture.patch_run("week1");

    let report = engine
        .reconciler()
        .reconcile(&run)
        .await
        .expect("Failed to reconcile");

    assert!(report.is_clean());
    assert_eq!(report.backends_queried, 1);
    assert_eq!(report.nodes_seen, 3);
    assert_eq!(report.servers_written, 3);

    let apps = fixture.store.list_applications(run.id).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "shop");
    let envs = fixture.store.list_environments(apps[0].id).unwrap();
    assert_eq!(envs.len(), 1);
    let components = fixture.store.list_components(envs[0].id).unwrap();
    let names: Vec<_> = components.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["db", "web"]);

    let web = components.iter().find(|c| c.name == "web").unwrap();
    assert_eq!(web.health_check.as_deref(), Some("/opt/check.sh"));
    let servers = fixture.store.list_servers(web.id).unwrap();
    assert_eq!(servers.len(), 2);
    assert_eq!(servers[0].name, "web01");
    assert_eq!(servers[0].backend_id, Some(backend.id));
    assert_eq!(servers[0].patch_window, "week1");
    assert_eq!(servers[0].package_updates, Some(4));
    assert_eq!(servers[0].pinned_packages, vec!["kernel".to_string()]);

    let db = components.iter().find(|c| c.name == "db").unwrap();
    assert!(!db.has_health_check());

    let queries = inventory.queries.lock().unwrap();
    assert_eq!(queries[0].fact_path, "facts.pe_patch.patch_group");
    assert_eq!(queries[0].pattern, "week1");
}

#[tokio::test]
async fn test_unset_health_check_is_not_a_health_check() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("api01", "2024-03", "billing", "prod", "api", Some(UNSET)));
    let run = fixture.patch_run("2024-03");

    let report = engine.reconciler().reconcile(&run).await.unwrap();

    assert!(report.is_clean());
    let apps = fixture.store.list_applications(run.id).unwrap();
    assert_eq!(apps[0].name, "billing");
    let envs = fixture.store.list_environments(apps[0].id).unwrap();
    assert_eq!(envs[0].name, "prod");
    let components = fixture.store.list_components(envs[0].id).unwrap();
    assert_eq!(components[0].name, "api");
    assert!(!components[0].has_health_check());
}

#[tokio::test]
async fn test_reconcile_replaces_previous_hierarchy() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    inventory.add_node(node("web02", "week1", "crm", "prod", "web", None));
    let run = fixture.patch_run("week1");

    engine.reconciler().reconcile(&run).await.unwrap();
    assert_eq!(fixture.store.list_applications(run.id).unwrap().len(), 2);

    inventory.nodes.lock().unwrap().retain(|n| n.certname == "web01");
    engine.reconciler().reconcile(&run).await.unwrap();

    let apps = fixture.store.list_applications(run.id).unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].name, "shop");
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    let run = fixture.patch_run("week1");

    let first = engine.reconciler().reconcile(&run).await.unwrap();
    let second = engine.reconciler().reconcile(&run).await.unwrap();

    assert_eq!(first.servers_written, second.servers_written);
    let rows = patchwork_engine::views::server_rows(fixture.store.as_ref(), run.id).unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_reconcile_collects_backend_failures() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, healthy, _) = fixture.orchestrator("pe-a");
    let (_, broken, _) = fixture.orchestrator("pe-b");
    healthy.add_node(node("web01", "week1", "shop", "prod", "web", None));
    broken.fail.store(true, Ordering::SeqCst);
    let run = fixture.patch_run("week1");

    let report = engine.reconciler().reconcile(&run).await.unwrap();

    assert_eq!(report.backends_queried, 2);
    assert_eq!(report.servers_written, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].backend, "pe-b");
    assert!(report.errors[0].node.is_none());
}

#[tokio::test]
async fn test_reconcile_skips_disabled_backends() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (mut backend, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    backend.enabled = false;
    fixture.store.update_backend(&backend).unwrap();
    let run = fixture.patch_run("week1");

    let report = engine.reconciler().reconcile(&run).await.unwrap();

    assert_eq!(report.backends_skipped, 1);
    assert_eq!(report.backends_queried, 0);
    assert!(inventory.queries.lock().unwrap().is_empty());
    assert!(fixture.store.list_applications(run.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_first_health_check_wins() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", Some("/opt/first.sh")));
    inventory.add_node(node("web02", "week1", "shop", "prod", "web", Some("/opt/second.sh")));
    let run = fixture.patch_run("week1");

    let report = engine.reconciler().reconcile(&run).await.unwrap();
    assert!(report.is_clean());

    let app = &fixture.store.list_applications(run.id).unwrap()[0];
    let env = &fixture.store.list_environments(app.id).unwrap()[0];
    let component = &fixture.store.list_components(env.id).unwrap()[0];
    assert_eq!(component.health_check.as_deref(), Some("/opt/first.sh"));
    assert_eq!(fixture.store.list_servers(component.id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_missing_facts_group_under_unset() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    let mut bare = node("orphan01", "week1", "x", "x", "x", None);
    bare.facts = serde_json::json!({ "pe_patch": { "patch_group": "week1" } });
    inventory.add_node(bare);
    let run = fixture.patch_run("week1");

    engine.reconciler().reconcile(&run).await.unwrap();

    let apps = fixture.store.list_applications(run.id).unwrap();
    assert_eq!(apps[0].name, UNSET);
    let env = &fixture.store.list_environments(apps[0].id).unwrap()[0];
    assert_eq!(env.name, UNSET);
}

#[tokio::test]
async fn test_procedure_url_recorded_from_later_node() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    let mut documented = node("web02", "week1", "shop", "prod", "web", None);
    documented.facts["patching-automation"]["patching_procedure_url"] =
        serde_json::json!("https://wiki.example.com/shop");
    inventory.add_node(documented);
    let run = fixture.patch_run("week1");

    engine.reconciler().reconcile(&run).await.unwrap();

    let app = &fixture.store.list_applications(run.id).unwrap()[0];
    assert_eq!(
        app.patching_procedure.as_deref(),
        Some("https://wiki.example.com/shop")
    );
}

#[tokio::test]
async fn test_last_procedure_url_wins() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    for (name, url) in [
        ("web01", "https://wiki.example.com/old"),
        ("web02", "not-a-link"),
        ("web03", "https://wiki.example.com/new"),
    ] {
        let mut documented = node(name, "week1", "shop", "prod", "web", None);
        documented.facts["patching-automation"]["patching_procedure_url"] =
            serde_json::json!(url);
        inventory.add_node(documented);
    }
    let run = fixture.patch_run("week1");

    engine.reconciler().reconcile(&run).await.unwrap();

    let app = &fixture.store.list_applications(run.id).unwrap()[0];
    assert_eq!(
        app.patching_procedure.as_deref(),
        Some("https://wiki.example.com/new")
    );
}

#[tokio::test]
async fn test_reconcile_window_creates_then_reuses_run() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week2", "shop", "prod", "web", None));

    let (created, report) = engine
        .reconciler()
        .reconcile_window("week2")
        .await
        .expect("Failed to reconcile window");
    assert_eq!(created.patch_window, "week2");
    assert!(created.name.starts_with("Patching: "));
    assert_eq!(report.servers_written, 1);

    let (reused, _) = engine.reconciler().reconcile_window("week2").await.unwrap();
    assert_eq!(reused.id, created.id);
    assert_eq!(fixture.store.list_patch_runs().unwrap().len(), 1);
}

#[tokio::test]
async fn test_patch_windows_merge_across_backends() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, first, _) = fixture.orchestrator("pe-a");
    let (_, second, _) = fixture.orchestrator("pe-b");
    first.set_windows(&[("week1", 3), ("week2", 1), ("", 5)]);
    second.set_windows(&[("week1", 2), ("month1", 4)]);

    let (windows, errors) = engine.reconciler().patch_windows().await.unwrap();

    assert!(errors.is_empty());
    assert_eq!(windows.len(), 3);
    assert_eq!(windows["week1"], 5);
    assert_eq!(windows["week2"], 1);
    assert_eq!(windows["month1"], 4);
}

#[tokio::test]
async fn test_window_change_on_update_reconciles_run() {
    let fixture = TestFixture::new();
    let engine = fixture.engine();
    let (_, inventory, _) = fixture.orchestrator("pe-prod");
    inventory.add_node(node("web01", "week1", "shop", "prod", "web", None));
    let run = fixture.patch_run("week1");
    engine.reconciler().reconcile(&run).await.unwrap();

    let mut renamed = run.clone();
    renamed.description = Some("Kernel updates".to_string());
    let (_, report) = engine.update_patch_run(&renamed).await.unwrap();
    assert!(report.is_none());
    assert_eq!(inventory.queries.lock().unwrap().len(), 1);

    *inventory.nodes.lock().unwrap() =
        vec![node("api01", "week2", "billing", "prod", "api", None)];
    let mut moved = renamed.clone();
    moved.patch_window = "week2".to_string();
    let (updated, report) = engine
        .update_patch_run(&moved)
        .await
        .expect("Failed to update patch run");

    assert_eq!(updated.patch_window, "week2");
    assert_eq!(report.expect("window change reconciles").servers_written, 1);
    assert_eq!(inventory.queries.lock().unwrap()[1].pattern, "week2");
    let apps = fixture.store.list_applications(run.id).unwrap();
    let names: Vec<_> = apps.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["billing"]);
}
