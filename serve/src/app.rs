//! Route table: agent/session/run CRUD plus the SSE run stream, all backed by
//! a single `Arc<AgentService>` (component_design §4.11).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use loom::{Agent, AgentService, Persona, Run, Session};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::sse::run_event_stream;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AgentService>,
}

pub fn router(service: Arc<AgentService>) -> Router {
    Router::new()
        .route("/agents", post(create_agent).get(list_agents))
        .route("/agents/:id", get(get_agent).patch(update_agent).delete(delete_agent))
        .route("/agents/:id/sessions", post(create_session).get(list_sessions))
        .route("/agents/:id/runs", post(start_run))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/runs", get(list_runs))
        .route("/runs/:id", get(get_run))
        .route("/runs/:id/cancel", post(cancel_run))
        .with_state(AppState { service })
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub persona: Persona,
    pub system_prompt: String,
    pub primary_model: String,
    #[serde(default)]
    pub fallback_models: Vec<String>,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub allowed_mcp_servers: Vec<String>,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

fn default_max_turns() -> u32 {
    10
}

fn default_temperature() -> f32 {
    0.7
}

async fn create_agent(State(state): State<AppState>, Json(req): Json<AgentRequest>) -> Result<Json<Agent>, ApiError> {
    let now = Utc::now();
    let agent = Agent {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        description: req.description,
        persona: req.persona,
        system_prompt: req.system_prompt,
        primary_model: req.primary_model,
        fallback_models: req.fallback_models,
        allowed_tools: req.allowed_tools,
        allowed_mcp_servers: req.allowed_mcp_servers,
        max_turns: req.max_turns,
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        created_at: now,
        updated_at: now,
    };
    Ok(Json(state.service.create_agent(agent).await?))
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<Agent>> {
    Json(state.service.list_agents().await)
}

async fn get_agent(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Agent>, ApiError> {
    Ok(Json(state.service.get_agent(&id).await?))
}

async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AgentRequest>,
) -> Result<Json<Agent>, ApiError> {
    let existing = state.service.get_agent(&id).await?;
    let agent = Agent {
        id: existing.id,
        name: req.name,
        description: req.description,
        persona: req.persona,
        system_prompt: req.system_prompt,
        primary_model: req.primary_model,
        fallback_models: req.fallback_models,
        allowed_tools: req.allowed_tools,
        allowed_mcp_servers: req.allowed_mcp_servers,
        max_turns: req.max_turns,
        temperature: req.temperature,
        max_tokens: req.max_tokens,
        created_at: existing.created_at,
        updated_at: existing.updated_at,
    };
    Ok(Json(state.service.update_agent(agent).await?))
}

async fn delete_agent(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ApiError> {
    state.service.delete_agent(&id).await?;
    Ok(())
}

async fn create_session(State(state): State<AppState>, Path(agent_id): Path<String>) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.service.create_session(&agent_id).await?))
}

async fn list_sessions(State(state): State<AppState>, Path(agent_id): Path<String>) -> Json<Vec<Session>> {
    Json(state.service.list_sessions(&agent_id).await)
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.service.get_session(&id).await?))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<(), ApiError> {
    state.service.delete_session(&id).await?;
    Ok(())
}

async fn get_run(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Run>, ApiError> {
    Ok(Json(state.service.get_run(&id).await?))
}

async fn list_runs(State(state): State<AppState>, Path(session_id): Path<String>) -> Json<Vec<Run>> {
    Json(state.service.list_runs(&session_id).await)
}

async fn cancel_run(State(state): State<AppState>, Path(id): Path<String>) {
    state.service.cancel_run(&id).await;
}

#[derive(Debug, Deserialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub input: String,
}

async fn start_run(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Json(req): Json<StartRunRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError> {
    let (run, rx) = state.service.start_run(&agent_id, req.session_id, req.input).await?;
    Ok(run_event_stream(run.session_id.clone(), run.id.clone(), rx))
}
