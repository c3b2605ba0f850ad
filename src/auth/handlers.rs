use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthData, LoginRequest, MeData, PublicUser, RefreshRequest, SignupRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        password::verify_password,
        services::{issue_tokens, normalize_email},
    },
    error::{AppError, DUPLICATE_EMAIL_MESSAGE},
    extract::ApiJson,
    profile::services::{prepare_profile, register_with_profile},
    response::ApiResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), AppError> {
    let (new_user, profile) = payload.into_new_user()?;

    // Bad financials are rejected before anything is written.
    let prepared = profile
        .map(|p| prepare_profile(new_user.id, p, OffsetDateTime::now_utc()))
        .transpose()?;

    if state.storage.find_user_by_email(&new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::Conflict(DUPLICATE_EMAIL_MESSAGE.into()));
    }

    // A concurrent signup for the same email still ends in 409 through the
    // unique constraint.
    let user = register_with_profile(state.storage.as_ref(), new_user, prepared.as_ref()).await?;

    let data = issue_tokens(&JwtKeys::from_ref(&state), &user)?;
    info!(user_id = %user.id, email = %user.email, role = ?user.role, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User created successfully", data)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, AppError> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation("Email and password are required".into()));
    }

    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let Some(user) = state.storage.find_user_by_email(&email).await? else {
        warn!(%email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    let data = issue_tokens(&JwtKeys::from_ref(&state), &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok(Json(ApiResponse::with_message("Login successful", data)))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<ApiResponse<AuthData>>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    // Reload so the new pair carries the current role.
    let user = state
        .storage
        .find_user_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(ApiResponse::ok(issue_tokens(&keys, &user)?)))
}

#[instrument(skip(state), fields(user_id = %auth.id, email = %auth.email))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ApiResponse<MeData>>, AppError> {
    let user = state
        .storage
        .find_user_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let profile = state.storage.find_profile(user.id).await?;
    let active_budgets = state
        .storage
        .list_budgets(user.id)
        .await?
        .into_iter()
        .filter(|b| b.is_active)
        .collect();

    Ok(Json(ApiResponse::ok(MeData {
        user: PublicUser::from(&user),
        profile,
        active_budgets,
    })))
}
