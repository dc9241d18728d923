use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use warden_channels::{Alert, AlertKind, RecordedAlert, Severity};
use warden_core::{EntityKind, WardenError};
use warden_orchestrator::{Agent, Playbook, StoreStats, Task, WorkRef};

type ApiResult<T> = Result<T, ApiError>;

// --- Request and response bodies ---

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlaybookRequest {
    pub name: String,
    pub steps: Vec<CreateEntityRequest>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub agent_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssignResponse {
    pub agent_id: Uuid,
    pub work: WorkRef,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub agent_id: Uuid,
    pub cancelled: bool,
}

/// A playbook with its step tasks resolved.
#[derive(Debug, Serialize)]
pub struct PlaybookDetail {
    #[serde(flatten)]
    pub playbook: Playbook,
    pub step_tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
pub struct ManualAlertRequest {
    pub text: String,
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

fn default_severity() -> Severity {
    Severity::Info
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<usize>,
}

// --- Health ---

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok", "service": "warden"}))
}

// --- Agents ---

pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Vec<Agent>> {
    Json(state.orchestrator.list_agents().await)
}

pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEntityRequest>,
) -> (StatusCode, Json<Agent>) {
    let agent = state
        .orchestrator
        .create_agent(&req.name, &req.description)
        .await;
    (StatusCode::CREATED, Json(agent))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Agent>> {
    state
        .orchestrator
        .get_agent(id)
        .await
        .map(Json)
        .ok_or_else(|| WardenError::not_found(EntityKind::Agent, id).into())
}

pub async fn reset_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Agent>> {
    Ok(Json(state.orchestrator.reset_agent(id).await?))
}

pub async fn cancel_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    if state.orchestrator.get_agent(id).await.is_none() {
        return Err(WardenError::not_found(EntityKind::Agent, id).into());
    }
    let cancelled = state.orchestrator.cancel(id);
    Ok(Json(CancelResponse {
        agent_id: id,
        cancelled,
    }))
}

// --- Tasks ---

pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<Task>> {
    Json(state.orchestrator.list_tasks().await)
}

pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEntityRequest>,
) -> (StatusCode, Json<Task>) {
    let task = state
        .orchestrator
        .create_task(&req.name, &req.description)
        .await;
    (StatusCode::CREATED, Json(task))
}

pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    state
        .orchestrator
        .get_task(id)
        .await
        .map(Json)
        .ok_or_else(|| WardenError::not_found(EntityKind::Task, id).into())
}

/// `POST /tasks/{id}/assign`. Answers as soon as the task is bound; the
/// outcome is observed by polling the task.
pub async fn assign_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<(StatusCode, Json<AssignResponse>)> {
    let assignment = state.orchestrator.assign_task(id, req.agent_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AssignResponse {
            agent_id: assignment.agent_id,
            work: assignment.work,
        }),
    ))
}

// --- Playbooks ---

pub async fn list_playbooks(State(state): State<Arc<AppState>>) -> Json<Vec<Playbook>> {
    Json(state.orchestrator.list_playbooks().await)
}

pub async fn create_playbook(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePlaybookRequest>,
) -> ApiResult<(StatusCode, Json<Playbook>)> {
    let steps = req
        .steps
        .into_iter()
        .map(|s| (s.name, s.description))
        .collect();
    let playbook = state
        .orchestrator
        .create_playbook_from(&req.name, steps)
        .await?;
    Ok((StatusCode::CREATED, Json(playbook)))
}

pub async fn get_playbook(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlaybookDetail>> {
    let playbook = state
        .orchestrator
        .get_playbook(id)
        .await
        .ok_or_else(|| WardenError::not_found(EntityKind::Playbook, id))?;
    let step_tasks = state
        .orchestrator
        .playbook_steps(id)
        .await
        .unwrap_or_default();
    Ok(Json(PlaybookDetail {
        playbook,
        step_tasks,
    }))
}

pub async fn assign_playbook(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<(StatusCode, Json<AssignResponse>)> {
    let assignment = state.orchestrator.assign_playbook(id, req.agent_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AssignResponse {
            agent_id: assignment.agent_id,
            work: assignment.work,
        }),
    ))
}

// --- Reporting ---

pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StoreStats> {
    Json(state.orchestrator.stats().await)
}

/// Recent alerts, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Json<Vec<RecordedAlert>> {
    let mut alerts = state.feed.recent();
    alerts.reverse();
    if let Some(limit) = query.limit {
        alerts.truncate(limit);
    }
    Json(alerts)
}

/// Send an operator alert through every configured notifier.
pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ManualAlertRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let alert = Alert::new(req.text, AlertKind::Manual, req.severity);
    let delivered = state.notifier.notify(&alert).await?;
    info!(severity = %alert.severity, delivered, "Manual alert sent");
    Ok(Json(serde_json::json!({ "delivered": delivered })))
}
