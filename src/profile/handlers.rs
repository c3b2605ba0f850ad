use axum::{extract::State, routing::get, Json, Router};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{ProfileData, ProfileRequest},
    services::{load_profile, save_profile},
};
use crate::{
    auth::{extractors::AuthUser, repo_types::User},
    error::AppError,
    extract::ApiJson,
    response::ApiResponse,
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).post(upsert_profile))
}

async fn current_user(state: &AppState, auth: &AuthUser) -> Result<User, AppError> {
    state
        .storage
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// POST /profile
#[instrument(skip(state, payload), fields(user_id = %auth.id, email = %auth.email))]
pub async fn upsert_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<ProfileRequest>,
) -> Result<Json<ApiResponse<ProfileData>>, AppError> {
    let user = current_user(&state, &auth).await?;
    let now = OffsetDateTime::now_utc();
    let data = save_profile(state.storage.as_ref(), &user, payload, now).await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully with auto-budget calculation",
        data,
    )))
}

/// GET /profile
#[instrument(skip(state), fields(user_id = %auth.id, email = %auth.email))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<ProfileData>>, AppError> {
    let user = current_user(&state, &auth).await?;
    let data = load_profile(state.storage.as_ref(), &user).await?;
    Ok(Json(ApiResponse::ok(data)))
}
