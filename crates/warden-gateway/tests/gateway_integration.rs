#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use warden_channels::MemoryNotifier;
use warden_gateway::GatewayServer;
use warden_orchestrator::{Orchestrator, ScriptedExecutor};

/// Helper: serve the gateway on a random port, returning its base URL.
async fn start_test_server(executor: ScriptedExecutor) -> String {
    let feed = Arc::new(MemoryNotifier::new(100));
    let orchestrator = Arc::new(Orchestrator::with_executor(
        Arc::new(executor),
        feed.clone(),
    ));
    let app = GatewayServer::build(orchestrator, feed.clone(), feed);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Small yield to let the server task start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{}", addr.port())
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> reqwest::Response {
    client.post(url).json(&body).send().await.unwrap()
}

async fn create(client: &reqwest::Client, base: &str, path: &str, name: &str) -> String {
    let resp = post(client, format!("{base}{path}"), json!({"name": name})).await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

/// Poll `GET url` until `field` leaves the given values.
async fn poll_until_not(
    client: &reqwest::Client,
    url: &str,
    field: &str,
    busy: &[&str],
) -> Value {
    for _ in 0..200 {
        let body: Value = client.get(url).send().await.unwrap().json().await.unwrap();
        let status = body[field].as_str().unwrap_or_default().to_string();
        if !busy.contains(&status.as_str()) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{url} stayed in {busy:?}");
}

#[tokio::test]
async fn test_health_endpoint() {
    let base = start_test_server(ScriptedExecutor::new()).await;
    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "warden");
}

#[tokio::test]
async fn test_task_assignment_round_trip() {
    let base = start_test_server(ScriptedExecutor::new()).await;
    let client = reqwest::Client::new();
    let agent = create(&client, &base, "/agents", "Security Agent 1").await;
    let task = create(&client, &base, "/tasks", "Block attacking IP").await;

    let resp = post(
        &client,
        format!("{base}/tasks/{task}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 202);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["agent_id"], agent.as_str());
    assert_eq!(body["work"]["kind"], "task");
    assert_eq!(body["work"]["id"], task.as_str());

    let task_body = poll_until_not(
        &client,
        &format!("{base}/tasks/{task}"),
        "status",
        &["pending", "in-progress"],
    )
    .await;
    assert_eq!(task_body["status"], "done");
    assert_eq!(task_body["assigned_agent_id"], agent.as_str());

    let agent_body =
        poll_until_not(&client, &format!("{base}/agents/{agent}"), "status", &["running"]).await;
    assert_eq!(agent_body["status"], "idle");

    let feed: Vec<Value> = client
        .get(format!("{base}/notifications?limit=1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(
        feed[0]["text"],
        "Agent Security Agent 1 completed task Block attacking IP"
    );
}

#[tokio::test]
async fn test_playbook_failure_over_http() {
    let base = start_test_server(ScriptedExecutor::new().fail_named("Pull endpoint logs")).await;
    let client = reqwest::Client::new();
    let agent = create(&client, &base, "/agents", "Security Agent 2").await;

    let resp = post(
        &client,
        format!("{base}/playbooks"),
        json!({
            "name": "Contain Malware Infection",
            "steps": [
                {"name": "Isolate infected endpoint", "description": "Isolate it."},
                {"name": "Pull endpoint logs"},
                {"name": "Trigger antivirus scan"}
            ]
        }),
    )
    .await;
    assert_eq!(resp.status(), 201);
    let playbook: Value = resp.json().await.unwrap();
    let id = playbook["id"].as_str().unwrap().to_string();
    assert_eq!(playbook["status"]["state"], "pending");
    assert_eq!(playbook["steps"].as_array().unwrap().len(), 3);

    let resp = post(
        &client,
        format!("{base}/playbooks/{id}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 202);

    let url = format!("{base}/playbooks/{id}");
    let mut detail = Value::Null;
    for _ in 0..200 {
        detail = client.get(&url).send().await.unwrap().json().await.unwrap();
        if matches!(detail["status"]["state"].as_str(), Some("completed" | "failed")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(detail["status"]["state"], "failed");
    assert_eq!(detail["status"]["failed_step"], 1);
    assert!(detail["error"].as_str().unwrap().contains("Pull endpoint logs"));
    let steps = detail["step_tasks"].as_array().unwrap();
    assert_eq!(steps[0]["status"], "done");
    assert_eq!(steps[0]["description"], "Isolate it.");
    assert_eq!(steps[1]["status"], "failed");
    assert_eq!(steps[2]["status"], "pending");

    let agent_body =
        poll_until_not(&client, &format!("{base}/agents/{agent}"), "status", &["running"]).await;
    assert_eq!(agent_body["status"], "error");

    // Busy-or-broken agents are a conflict, reset clears it.
    let task = create(&client, &base, "/tasks", "Report findings").await;
    let resp = post(
        &client,
        format!("{base}/tasks/{task}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 409);

    let resp = post(&client, format!("{base}/agents/{agent}/reset"), json!({})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "idle");

    let stats: Value = client
        .get(format!("{base}/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["playbooks"]["failed"], 1);
    assert_eq!(stats["tasks"]["pending"], 2);
}

#[tokio::test]
async fn test_error_mapping() {
    let base =
        start_test_server(ScriptedExecutor::new().with_delay(Duration::from_millis(300))).await;
    let client = reqwest::Client::new();
    let agent = create(&client, &base, "/agents", "A1").await;
    let t1 = create(&client, &base, "/tasks", "T1").await;
    let t2 = create(&client, &base, "/tasks", "T2").await;

    // Unknown task: 404, agent untouched.
    let missing = uuid::Uuid::new_v4();
    let resp = post(
        &client,
        format!("{base}/tasks/{missing}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("task"));

    // Second assignment while running: 409.
    let resp = post(
        &client,
        format!("{base}/tasks/{t1}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 202);
    let resp = post(
        &client,
        format!("{base}/tasks/{t2}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().starts_with("Agent busy"));

    let resp = client.get(format!("{base}/playbooks/{missing}")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_cancel_endpoint() {
    let base =
        start_test_server(ScriptedExecutor::new().with_delay(Duration::from_secs(30))).await;
    let client = reqwest::Client::new();
    let agent = create(&client, &base, "/agents", "A1").await;
    let task = create(&client, &base, "/tasks", "Slow").await;

    let resp = post(&client, format!("{base}/agents/{agent}/cancel"), json!({})).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cancelled"], false);

    post(
        &client,
        format!("{base}/tasks/{task}/assign"),
        json!({"agent_id": agent}),
    )
    .await;
    let resp = post(&client, format!("{base}/agents/{agent}/cancel"), json!({})).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["cancelled"], true);

    let task_body = poll_until_not(
        &client,
        &format!("{base}/tasks/{task}"),
        "status",
        &["pending", "in-progress"],
    )
    .await;
    assert_eq!(task_body["status"], "failed");
    assert_eq!(task_body["error"], "Task cancelled");

    let missing = uuid::Uuid::new_v4();
    let resp = post(&client, format!("{base}/agents/{missing}/cancel"), json!({})).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_manual_alert_lands_in_feed() {
    let base = start_test_server(ScriptedExecutor::new()).await;
    let client = reqwest::Client::new();
    let resp = post(
        &client,
        format!("{base}/notifications"),
        json!({"text": "Phishing wave reported", "severity": "warning"}),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["delivered"], true);

    let feed: Vec<Value> = client
        .get(format!("{base}/notifications"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed[0]["text"], "Phishing wave reported");
    assert_eq!(feed[0]["kind"], "manual");
    assert_eq!(feed[0]["severity"], "warning");
    assert!(feed[0]["sent_at"].is_string());
}
