use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireAdmin, TokenGenerator};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateTokenResponse, CreateUserRequest, CreateUserTokenRequest, PaginationParams,
};
use crate::server::response::{
    ApiError, ApiResponse, DEFAULT_PAGE_SIZE, PaginatedResponse, paginate,
};
use crate::server::validation::validate_email;
use crate::types::{Token, User};

pub async fn create_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    validate_email(&req.email)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email,
        created_at: now,
        updated_at: now,
    };

    match state.store.create_user(&user) {
        Ok(()) => Ok((StatusCode::CREATED, Json(ApiResponse::success(user)))),
        Err(Error::AlreadyExists) => Err(ApiError::conflict(
            "A user with this email already exists",
        )),
        Err(_) => Err(ApiError::internal("Failed to create user")),
    }
}

pub async fn list_users(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> impl IntoResponse {
    let cursor = params.cursor.as_deref().unwrap_or("");

    let users = state
        .store
        .list_users(cursor, DEFAULT_PAGE_SIZE + 1)
        .map_err(|_| ApiError::internal("Failed to list users"))?;

    let (users, next_cursor, has_more) =
        paginate(users, DEFAULT_PAGE_SIZE as usize, |u| u.id.clone());

    Ok::<_, ApiError>(Json(PaginatedResponse::new(users, next_cursor, has_more)))
}

pub async fn get_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .map_err(|_| ApiError::internal("Failed to get user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(user)))
}

/// Deletes a user and cascades away everything they own.
pub async fn delete_user(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .map_err(|_| ApiError::internal("Failed to get user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    state
        .store
        .delete_user(&user.id)
        .map_err(|_| ApiError::internal("Failed to delete user"))?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_user_tokens(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .map_err(|_| ApiError::internal("Failed to get user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let tokens = state
        .store
        .list_user_tokens(&user.id)
        .map_err(|_| ApiError::internal("Failed to list user tokens"))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(tokens)))
}

pub async fn create_user_token(
    _admin: RequireAdmin,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserTokenRequest>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user(&id)
        .map_err(|_| ApiError::internal("Failed to get user"))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if let Some(days) = req.expires_in_days {
        if days < 0 {
            return Err(ApiError::bad_request("expires_in_days cannot be negative"));
        }
    }

    let expires_at = req.expires_in_days.map(|d| Utc::now() + Duration::days(d));

    let generator = TokenGenerator::new();

    const MAX_RETRIES: u32 = 3;
    for _ in 0..MAX_RETRIES {
        let (raw_token, lookup, hash) = generator
            .generate()
            .map_err(|_| ApiError::internal("Failed to generate token"))?;

        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: hash,
            token_lookup: lookup,
            is_admin: false,
            user_id: Some(user.id.clone()),
            created_at: Utc::now(),
            expires_at,
            last_used_at: None,
        };

        match state.store.create_token(&token) {
            Ok(()) => {
                return Ok((
                    StatusCode::CREATED,
                    Json(ApiResponse::success(CreateTokenResponse {
                        token: raw_token,
                        metadata: token,
                    })),
                ));
            }
            Err(Error::TokenLookupCollision) => continue,
            Err(_) => return Err(ApiError::internal("Failed to create token")),
        }
    }

    Err(ApiError::internal("Failed to create token after retries"))
}
