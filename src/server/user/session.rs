use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::RequireAuth;
use crate::server::AppState;
use crate::server::dto::SessionResponse;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

pub async fn get_session(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let token = auth.0;

    let (user_id, email) = match &token.user_id {
        Some(id) => {
            let user = state
                .store
                .get_user(id)
                .api_err("Failed to load user")?
                .map(|u| (Some(u.id), Some(u.email)));
            user.unwrap_or((None, None))
        }
        None => (None, None),
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(SessionResponse {
        token_id: token.id,
        token_lookup: token.token_lookup,
        is_admin: token.is_admin,
        user_id,
        email,
    })))
}

/// Revokes the token presented on this request.
pub async fn sign_out(auth: RequireAuth, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state
        .store
        .delete_token(&auth.0.id)
        .api_err("Failed to revoke token")?;

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}
