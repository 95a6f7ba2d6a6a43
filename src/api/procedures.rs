//! Bulk procedure endpoints.
//!
//! Refusals come back as `200 {ok: false, error}`; only infrastructure
//! failures use the error envelope.

use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::{
    DelegatePeopleRequest, DelegatePeopleResponse, RemoveLeaderRequest, RemoveLeaderResponse,
};
use crate::AppState;

/// POST /api/rpc/delegate_people
pub async fn delegate_people(
    State(state): State<AppState>,
    Json(request): Json<DelegatePeopleRequest>,
) -> Result<Json<DelegatePeopleResponse>, AppError> {
    if request.from_leader.trim().is_empty() || request.to_leader.trim().is_empty() {
        return Ok(Json(DelegatePeopleResponse::failed(
            "from_leader and to_leader are required",
        )));
    }

    Ok(Json(state.repo.delegate_people(&request).await?))
}

/// POST /api/rpc/remove_leader
pub async fn remove_leader(
    State(state): State<AppState>,
    Json(request): Json<RemoveLeaderRequest>,
) -> Result<Json<RemoveLeaderResponse>, AppError> {
    if request.p_leader_id.trim().is_empty() {
        return Ok(Json(RemoveLeaderResponse::failed("p_leader_id is required")));
    }

    Ok(Json(state.repo.remove_leader(&request).await?))
}
