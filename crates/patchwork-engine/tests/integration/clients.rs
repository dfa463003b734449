/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! HTTP clients against local stub servers.

use axum::extract::{Form, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use patchwork_engine::backends::jenkins::JenkinsClient;
use patchwork_engine::backends::orchestrator::OrchestratorClient;
use patchwork_engine::backends::{BuildRunner, OrchestratorJobKind, PlanRequest, TaskRequest, TaskRunner};
use patchwork_engine::boards::{BoardService, BoardSpec, CardSpec, CheckItemSpec, TrelloClient};
use patchwork_engine::error::ClientError;
use patchwork_engine::fanout::{ChannelSender, WebhookSender};
use patchwork_engine::inventory::puppetdb::PuppetDbClient;
use patchwork_engine::inventory::{InventorySource, NodeQuery};
use patchwork_models::models::Backend;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Requests seen by a stub server.
#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorded {
    fn auth_header(&self, headers: &HeaderMap, name: header::HeaderName) {
        self.auth.lock().unwrap().push(
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string),
        );
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    addr
}

fn backend(kind: &str, addr: SocketAddr) -> Backend {
    Backend {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        name: "stub".to_string(),
        kind: kind.to_string(),
        hostname: addr.ip().to_string(),
        inventory_port: addr.port() as i32,
        api_port: addr.port() as i32,
        username: None,
        token: Some("secret-token".to_string()),
        ssl: false,
        ssl_skip_verify: false,
        ca_cert: None,
        enabled: true,
        fact_name: "pe_patch.patch_group".to_string(),
    }
}

// =============================================================================
// PuppetDB
// =============================================================================

async fn inventory(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.auth_header(&headers, header::HeaderName::from_static("x-authentication"));
    recorded.queries.lock().unwrap().push(query);
    Json(json!([
        {
            "certname": "web01.example.com",
            "environment": "production",
            "facts": {"application": "shop", "pe_patch": {"patch_group": "week1"}}
        }
    ]))
}

async fn fact_contents(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    assert!(query["query"].contains("\"patch_group\""));
    Json(json!([
        {"value": "week1", "count": 3},
        {"value": null, "count": 2},
        {"value": 7, "count": 1}
    ]))
}

#[tokio::test]
async fn test_puppetdb_inventory_query() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/pdb/query/v4/inventory", get(inventory))
        .route("/pdb/query/v4/fact-contents", get(fact_contents))
        .with_state(recorded.clone());
    let addr = serve(app).await;
    let client = PuppetDbClient::new(&backend("orchestrator", addr), TIMEOUT).unwrap();

    let nodes = client
        .query_nodes(&NodeQuery::patch_window("pe_patch.patch_group", "week1"))
        .await
        .expect("Failed to query inventory");

    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].certname, "web01.example.com");
    assert_eq!(nodes[0].fact_string("application"), "shop");
    let queries = recorded.queries.lock().unwrap();
    assert_eq!(queries[0]["query"], r#"["~","facts.pe_patch.patch_group","week1"]"#);
    assert!(queries[0]["order_by"].contains("certname"));
    assert_eq!(
        recorded.auth.lock().unwrap()[0].as_deref(),
        Some("secret-token")
    );

    let values = client.fact_values("pe_patch.patch_group").await.unwrap();
    let values: Vec<_> = values.iter().map(|v| (v.value.as_str(), v.count)).collect();
    assert_eq!(values, vec![("week1", 3), ("7", 1)]);
}

#[tokio::test]
async fn test_puppetdb_error_status() {
    let app = Router::new().route(
        "/pdb/query/v4/inventory",
        get(|| async { (StatusCode::FORBIDDEN, "bad token") }),
    );
    let addr = serve(app).await;
    let client = PuppetDbClient::new(&backend("orchestrator", addr), TIMEOUT).unwrap();

    let result = client
        .query_nodes(&NodeQuery::patch_window("pe_patch.patch_group", "week1"))
        .await;

    match result {
        Err(ClientError::Status { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "bad token");
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

async fn submit_task(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded.bodies.lock().unwrap().push(body);
    Json(json!({
        "job": {"id": "https://pe.example.com:8143/orchestrator/v1/jobs/81", "name": "81"}
    }))
}

async fn submit_plan(State(recorded): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    recorded.bodies.lock().unwrap().push(body);
    Json(json!({"name": "12"}))
}

async fn plan_job(Path(id): Path<String>) -> Json<Value> {
    assert_eq!(id, "12");
    Json(json!({"state": "success"}))
}

async fn task_job(Path(id): Path<String>) -> Json<Value> {
    assert_eq!(id, "81");
    Json(json!({"state": "running"}))
}

async fn task_metadata(
    Path((module, name)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    assert_eq!((module.as_str(), name.as_str()), ("pe_patch", "patch_server"));
    assert_eq!(query["environment"], "production");
    Json(json!({
        "metadata": {
            "description": "Patch a server",
            "parameters": {
                "reboot": {"type": "Enum[always, never, smart]"},
                "timeout": {"type": "Optional[Integer]", "description": "Seconds"}
            }
        }
    }))
}

#[tokio::test]
async fn test_orchestrator_task_and_plan() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/orchestrator/v1/command/task", post(submit_task))
        .route("/orchestrator/v1/command/plan_run", post(submit_plan))
        .route("/orchestrator/v1/jobs/:id", get(task_job))
        .route("/orchestrator/v1/plan_jobs/:id", get(plan_job))
        .route("/orchestrator/v1/tasks/:module/:name", get(task_metadata))
        .with_state(recorded.clone());
    let addr = serve(app).await;
    let client = OrchestratorClient::new(&backend("orchestrator", addr), TIMEOUT).unwrap();

    let mut params = Map::new();
    params.insert("reboot".to_string(), json!("smart"));
    let task = client
        .submit_task(&TaskRequest {
            task: "pe_patch::patch_server".to_string(),
            params: params.clone(),
            environment: "production".to_string(),
            description: "Started from: https://patchwork.example.com/patchRun/1".to_string(),
            nodes: vec!["web01".to_string(), "web02".to_string()],
        })
        .await
        .expect("Failed to submit task");

    assert_eq!(task.id, "81");
    assert_eq!(
        task.url.as_deref(),
        Some("https://pe.example.com:8143/orchestrator/v1/jobs/81")
    );
    assert!(task.console_url.ends_with("/#/orchestration/tasks/task/81"));

    let plan = client
        .submit_plan(&PlanRequest {
            plan: "patchy::cluster_patching".to_string(),
            params,
            environment: "production".to_string(),
            description: "Started from: here".to_string(),
        })
        .await
        .expect("Failed to submit plan");
    assert_eq!(plan.id, "12");
    assert!(plan.url.is_none());

    let bodies = recorded.bodies.lock().unwrap();
    assert_eq!(bodies[0]["task"], "pe_patch::patch_server");
    assert_eq!(bodies[0]["scope"], json!({"nodes": ["web01", "web02"]}));
    assert_eq!(bodies[0]["params"]["reboot"], "smart");
    assert_eq!(bodies[1]["plan_name"], "patchy::cluster_patching");
    drop(bodies);

    let state = client.job_state(OrchestratorJobKind::Plan, "12").await.unwrap();
    assert_eq!(state.as_deref(), Some("finished"));
    let state = client.job_state(OrchestratorJobKind::Task, "81").await.unwrap();
    assert_eq!(state.as_deref(), Some("running"));

    let metadata = client
        .task_metadata("production", "pe_patch", "patch_server")
        .await
        .unwrap();
    assert_eq!(metadata.description.as_deref(), Some("Patch a server"));
    let names: Vec<_> = metadata.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["reboot", "timeout"]);
    assert_eq!(metadata.params[1].param_type, "Optional[Integer]");
}

// =============================================================================
// Jenkins
// =============================================================================

async fn build_with_parameters(
    State(recorded): State<Recorded>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    recorded.auth_header(&headers, header::AUTHORIZATION);
    recorded.forms.lock().unwrap().push(form);
    (
        StatusCode::CREATED,
        [(header::LOCATION, "http://ci.example.com/queue/item/55/")],
    )
}

async fn build_without_location() -> StatusCode {
    StatusCode::CREATED
}

async fn queue_item(Path(id): Path<i64>) -> Json<Value> {
    assert_eq!(id, 55);
    Json(json!({
        "id": 55,
        "executable": {"number": 42, "url": "https://ci.example.com/job/ops/job/notify/42/"}
    }))
}

async fn build_record() -> Json<Value> {
    Json(json!({
        "fullDisplayName": "ops » notify #42",
        "number": 42,
        "url": "https://ci.example.com/job/ops/job/notify/42/",
        "result": null
    }))
}

async fn job_definition() -> Json<Value> {
    Json(json!({
        "description": "Post a chat notice",
        "property": [
            {"_class": "hudson.model.ParametersDefinitionProperty", "parameterDefinitions": [
                {
                    "name": "message",
                    "type": "StringParameterDefinition",
                    "description": "",
                    "defaultParameterValue": {"value": "hello"}
                },
                {
                    "name": "dry_run",
                    "type": "BooleanParameterDefinition",
                    "defaultParameterValue": {"value": true}
                },
                {
                    "name": "secret",
                    "type": "PasswordParameterDefinition",
                    "defaultParameterValue": {"value": "x"}
                }
            ]},
            {"_class": "jenkins.model.BuildDiscarderProperty"}
        ]
    }))
}

#[tokio::test]
async fn test_jenkins_build_lifecycle() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/job/ops/job/notify/buildWithParameters", post(build_with_parameters))
        .route("/job/ops/job/notify/build", post(build_without_location))
        .route("/queue/item/:id/api/json", get(queue_item))
        .route("/job/ops/job/notify/42/api/json", get(build_record))
        .route("/job/ops/job/notify/api/json", get(job_definition))
        .with_state(recorded.clone());
    let addr = serve(app).await;
    let mut ci = backend("build_server", addr);
    ci.username = Some("svc".to_string());
    let client = JenkinsClient::new(&ci, TIMEOUT).unwrap();

    let mut params = BTreeMap::new();
    params.insert("message".to_string(), "Patching week1".to_string());
    let queue_id = client
        .submit_build("/ops/notify/", &params)
        .await
        .expect("Failed to submit build");
    assert_eq!(queue_id, 55);
    assert_eq!(recorded.forms.lock().unwrap()[0]["message"], "Patching week1");
    let auth = recorded.auth.lock().unwrap()[0].clone().unwrap_or_default();
    assert!(auth.starts_with("Basic "));

    // no parameters goes to /build, which here answers without a location
    let missing = client.submit_build("ops/notify", &BTreeMap::new()).await;
    assert!(matches!(missing, Err(ClientError::Decode(_))));

    let item = client.queue_item(55).await.unwrap();
    let executable = item.executable.expect("build started");
    assert_eq!(executable.number, 42);

    let record = client.build("ops/notify", 42).await.unwrap();
    assert_eq!(record.name, "ops » notify #42");
    assert!(record.result.is_none());

    let metadata = client.job_parameters("ops/notify").await.unwrap();
    assert_eq!(metadata.description.as_deref(), Some("Post a chat notice"));
    assert_eq!(metadata.params.len(), 3);
    assert_eq!(metadata.params[0].default_value.as_deref(), Some("hello"));
    assert!(metadata.params[0].description.is_none());
    assert_eq!(metadata.params[1].default_value.as_deref(), Some("true"));
    assert!(metadata.params[2].default_value.is_none());
}

// =============================================================================
// Webhooks
// =============================================================================

async fn webhook(State(recorded): State<Recorded>, Json(body): Json<Value>) -> StatusCode {
    recorded.bodies.lock().unwrap().push(body);
    StatusCode::OK
}

#[tokio::test]
async fn test_webhook_sender() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/hooks/ops", post(webhook))
        .route(
            "/hooks/broken",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .with_state(recorded.clone());
    let addr = serve(app).await;
    let sender = WebhookSender::new(TIMEOUT).unwrap();

    sender
        .send(&format!("http://{}/hooks/ops?key=abc", addr), "**hello**")
        .await
        .expect("Failed to send webhook");
    assert_eq!(
        recorded.bodies.lock().unwrap()[0],
        json!({"markdown": "**hello**"})
    );

    let failed = sender
        .send(&format!("http://{}/hooks/broken?key=abc", addr), "hello")
        .await;
    match failed {
        Err(e @ ClientError::Status { status: 500, .. }) => {
            assert!(!e.to_string().contains("key=abc"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}

// =============================================================================
// Trello
// =============================================================================

async fn trello_member(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.queries.lock().unwrap().push(query);
    Json(json!({"fullName": "Patch Bot", "idOrganizations": ["org-1", "org-2"]}))
}

async fn trello_create_board(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.queries.lock().unwrap().push(query);
    Json(json!({"id": "b-1", "shortUrl": "https://trello.com/b/AbC123"}))
}

async fn trello_lists(Path(id): Path<String>) -> Json<Value> {
    assert_eq!(id, "b-1");
    Json(json!([{"id": "todo"}, {"id": "doing"}]))
}

async fn trello_create(
    State(recorded): State<Recorded>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    recorded.queries.lock().unwrap().push(query);
    Json(json!({"id": "x-1", "shortUrl": "https://trello.com/c/XyZ"}))
}

async fn trello_delete_board(Path(id): Path<String>) -> StatusCode {
    if id == "gone" {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

#[tokio::test]
async fn test_trello_board_lifecycle() {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/1/members/me", get(trello_member))
        .route("/1/boards/", post(trello_create_board))
        .route("/1/boards/:id/lists", get(trello_lists))
        .route("/1/boards/:id", delete(trello_delete_board))
        .route("/1/cards", post(trello_create))
        .route("/1/checklists", post(trello_create))
        .route("/1/checklists/:id/checkItems", post(trello_create))
        .with_state(recorded.clone());
    let addr = serve(app).await;
    let client = TrelloClient::new(&format!("http://{}", addr), "app-key", "s3cret", TIMEOUT)
        .unwrap();

    let board = client
        .create_board(&BoardSpec {
            name: "Patching: 2024-03-09".to_string(),
            description: "# Patching Automation".to_string(),
            background: "lime".to_string(),
        })
        .await
        .expect("Failed to create board");
    assert_eq!(board.id, "b-1");
    assert_eq!(board.url, "https://trello.com/b/AbC123");

    assert_eq!(client.first_list("b-1").await.unwrap(), "todo");
    let card = client
        .add_card(
            "todo",
            &CardSpec {
                name: "shop [prod]".to_string(),
                description: "Application: `shop`".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(card.url, "https://trello.com/c/XyZ");
    client.add_checklist(&card.id, "api").await.unwrap();
    client
        .add_check_item(
            "x-1",
            &CheckItemSpec {
                name: "web01 (10.0.0.5) - Updates: 0\nssh://web01".to_string(),
                checked: true,
            },
        )
        .await
        .unwrap();

    let queries = recorded.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 5);
    assert!(queries
        .iter()
        .all(|q| q["key"] == "app-key" && q["token"] == "s3cret"));
    assert_eq!(queries[1]["name"], "Patching: 2024-03-09");
    assert_eq!(queries[1]["prefs_background"], "lime");
    assert_eq!(queries[1]["idOrganization"], "org-1");
    assert_eq!(queries[1]["prefs_permissionLevel"], "org");
    assert_eq!(queries[2]["idList"], "todo");
    assert_eq!(queries[3]["idCard"], "x-1");
    assert_eq!(queries[4]["checked"], "true");
    assert_eq!(queries[4]["pos"], "bottom");

    assert!(client.delete_board("b-1").await.unwrap());
    assert!(!client.delete_board("gone").await.unwrap());
}

#[tokio::test]
async fn test_trello_errors_hide_credentials() {
    let app = Router::new().route(
        "/1/members/me",
        get(|| async { (StatusCode::UNAUTHORIZED, "invalid token") }),
    );
    let addr = serve(app).await;
    let client = TrelloClient::new(&format!("http://{}", addr), "app-key", "s3cret", TIMEOUT)
        .unwrap();

    let result = client
        .create_board(&BoardSpec {
            name: "March".to_string(),
            description: String::new(),
            background: "blue".to_string(),
        })
        .await;
    match result {
        Err(e @ ClientError::Status { status: 401, .. }) => {
            assert!(!e.to_string().contains("s3cret"));
        }
        other => panic!("expected a status error, got {:?}", other),
    }
}
