use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::CreateSubjectRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_subject_name;
use crate::types::Subject;

pub async fn create_subject(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSubjectRequest>,
) -> impl IntoResponse {
    validate_subject_name(&req.name)?;

    let subject = Subject {
        id: Uuid::new_v4().to_string(),
        user_id: auth.user.id.clone(),
        name: req.name,
        created_at: Utc::now(),
    };

    match state.store.create_subject(&subject) {
        Ok(()) => Ok((StatusCode::CREATED, Json(ApiResponse::success(subject)))),
        Err(Error::AlreadyExists) => Err(ApiError::conflict("Subject already exists")),
        Err(_) => Err(ApiError::internal("Failed to create subject")),
    }
}

pub async fn list_subjects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let subjects = state
        .store
        .list_subjects(&auth.user.id)
        .api_err("Failed to list subjects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(subjects)))
}

pub async fn delete_subject(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_subject(&auth.user.id, &id)
        .api_err("Failed to delete subject")?;

    if !deleted {
        return Err(ApiError::not_found("Subject not found"));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
