use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;

use crate::auth::RequireUser;
use crate::server::AppState;
use crate::server::dto::UpdateProfileRequest;
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};
use crate::server::validation::validate_display_name;
use crate::types::{Profile, User};

/// Display name defaults to the local part of the account email.
fn default_profile(user: &User) -> Profile {
    let display_name = user
        .email
        .split('@')
        .next()
        .unwrap_or(&user.email)
        .to_string();

    Profile {
        user_id: user.id.clone(),
        display_name,
        avatar_url: None,
        updated_at: Utc::now(),
    }
}

pub async fn get_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let profile = match store
        .get_profile(&auth.user.id)
        .api_err("Failed to load profile")?
    {
        Some(profile) => profile,
        None => {
            let profile = default_profile(&auth.user);
            store
                .upsert_profile(&profile)
                .api_err("Failed to create profile")?;
            profile
        }
    };

    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}

pub async fn update_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    let store = state.store.as_ref();

    let mut profile = store
        .get_profile(&auth.user.id)
        .api_err("Failed to load profile")?
        .unwrap_or_else(|| default_profile(&auth.user));

    if let Some(display_name) = req.display_name {
        validate_display_name(&display_name)?;
        profile.display_name = display_name;
    }
    if let Some(avatar_url) = req.avatar_url {
        // An empty string clears the avatar.
        profile.avatar_url = if avatar_url.is_empty() {
            None
        } else {
            Some(avatar_url)
        };
    }
    profile.updated_at = Utc::now();

    store
        .upsert_profile(&profile)
        .api_err("Failed to update profile")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(profile)))
}
