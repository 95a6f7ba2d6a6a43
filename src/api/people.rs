//! Contact API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{CreatePersonRequest, OwnerQuery, PeopleCount, Person};
use crate::AppState;

/// GET /api/people?owner_id= - Contacts owned by a leader.
pub async fn list_people(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<Vec<Person>> {
    success(state.repo.list_people(&query.owner_id).await?)
}

/// GET /api/people/count?owner_id= - Number of contacts owned by a leader.
pub async fn count_people(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> ApiResult<PeopleCount> {
    let count = state.repo.count_people(&query.owner_id).await?;
    success(PeopleCount { count })
}

/// POST /api/people - Create a contact.
pub async fn create_person(
    State(state): State<AppState>,
    Json(request): Json<CreatePersonRequest>,
) -> ApiResult<Person> {
    if request.full_name.trim().is_empty() {
        return Err(AppError::Validation("Full name is required".to_string()));
    }
    if request.owner_id.trim().is_empty() {
        return Err(AppError::Validation("Owner leader is required".to_string()));
    }

    success(state.repo.create_person(&request).await?)
}
