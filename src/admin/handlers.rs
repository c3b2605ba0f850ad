use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{DashboardData, StudentData, StudentDetail, StudentList, StudentSummary};
use crate::{
    auth::{
        dto::PublicUser,
        extractors::RequireAdmin,
        repo_types::{Role, User},
    },
    error::AppError,
    extract::ApiJson,
    profile::{
        dto::{ProfileData, ProfileRequest},
        services::save_profile,
    },
    response::ApiResponse,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/students", get(list_students))
        .route("/admin/students/:student_id", get(get_student))
        .route("/admin/students/:student_id/profile", put(update_student_profile))
}

async fn find_student(state: &AppState, id: Uuid) -> Result<User, AppError> {
    state
        .storage
        .find_user_by_id(id)
        .await?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| AppError::NotFound("Student not found".into()))
}

#[instrument(skip(state, _admin))]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<ApiResponse<DashboardData>>, AppError> {
    let stats = state.storage.dashboard_stats().await?;
    Ok(Json(ApiResponse::ok(DashboardData { stats })))
}

#[instrument(skip(state, _admin))]
pub async fn list_students(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<ApiResponse<StudentList>>, AppError> {
    let users = state.storage.list_users_by_role(Role::Student).await?;

    let mut students = Vec::with_capacity(users.len());
    for user in &users {
        let profile = state.storage.find_profile(user.id).await?;
        let budgets = state.storage.list_budgets(user.id).await?;
        let budget_count = budgets.len();
        students.push(StudentSummary {
            user: PublicUser::from(user),
            profile,
            active_budgets: budgets.into_iter().filter(|b| b.is_active).collect(),
            budget_count,
        });
    }

    let total = students.len();
    Ok(Json(ApiResponse::ok(StudentList { students, total })))
}

#[instrument(skip(state, _admin))]
pub async fn get_student(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(student_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StudentData>>, AppError> {
    let user = find_student(&state, student_id).await?;
    let profile = state.storage.find_profile(user.id).await?;
    let budgets = state.storage.list_budgets(user.id).await?;

    Ok(Json(ApiResponse::ok(StudentData {
        student: StudentDetail {
            user: PublicUser::from(&user),
            profile,
            budgets,
        },
    })))
}

/// PUT /admin/students/{id}/profile
/// Unset fields keep their stored values; the result goes through the same
/// derivation as a student's own profile write.
#[instrument(skip(state, admin, payload), fields(admin_id = %admin.0.id))]
pub async fn update_student_profile(
    State(state): State<AppState>,
    admin: RequireAdmin,
    Path(student_id): Path<Uuid>,
    ApiJson(payload): ApiJson<ProfileRequest>,
) -> Result<Json<ApiResponse<ProfileData>>, AppError> {
    let user = find_student(&state, student_id).await?;
    let existing = state.storage.find_profile(user.id).await?;
    let merged = payload.merged_over(existing.as_ref());

    let now = OffsetDateTime::now_utc();
    let data = save_profile(state.storage.as_ref(), &user, merged, now).await?;
    info!(%student_id, "student profile updated by admin");
    Ok(Json(ApiResponse::with_message(
        "Student profile updated successfully",
        data,
    )))
}
