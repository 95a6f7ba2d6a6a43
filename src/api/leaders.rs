//! Leader API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    CreateLeaderRequest, Leader, LeaderDirectoryEntry, LeaderTab, UpdateLeaderStatusRequest,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    #[serde(default)]
    pub tab: LeaderTab,
}

#[derive(Debug, Deserialize)]
pub struct ActiveLeadersQuery {
    #[serde(default)]
    pub exclude: Option<String>,
}

/// GET /api/leaders?tab=active|pending - Leader directory with contact counts.
pub async fn list_leader_directory(
    State(state): State<AppState>,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Vec<LeaderDirectoryEntry>> {
    let entries = state.repo.list_directory(query.tab).await?;
    success(entries)
}

/// GET /api/leaders/active?exclude={id} - Active leaders eligible to receive contacts.
pub async fn list_active_leaders(
    State(state): State<AppState>,
    Query(query): Query<ActiveLeadersQuery>,
) -> ApiResult<Vec<Leader>> {
    let leaders = state
        .repo
        .list_active_leaders(query.exclude.as_deref())
        .await?;
    success(leaders)
}

/// GET /api/leaders/:id - Get a single leader.
pub async fn get_leader(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Leader> {
    match state.repo.get_leader(&id).await? {
        Some(leader) => success(leader),
        None => Err(AppError::NotFound(format!("Leader {} not found", id))),
    }
}

/// POST /api/leaders - Create a leader.
pub async fn create_leader(
    State(state): State<AppState>,
    Json(request): Json<CreateLeaderRequest>,
) -> ApiResult<Leader> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "A valid email is required".to_string(),
        ));
    }

    let leader = state.repo.create_leader(&request).await?;
    tracing::info!(leader = %leader.id, status = leader.status.as_str(), "Created leader");
    success(leader)
}

/// PATCH /api/leaders/:id/status - Change a leader's status.
pub async fn update_leader_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLeaderStatusRequest>,
) -> ApiResult<Leader> {
    let leader = state.repo.update_leader_status(&id, request.status).await?;
    tracing::info!(leader = %leader.id, status = leader.status.as_str(), "Updated leader status");
    success(leader)
}
