use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Stored financial profile; at most one per user.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: Uuid,
    pub university: Option<String>,
    pub city: Option<String>,
    pub currency: String,
    pub stipend_amount: f64,
    pub disbursement_frequency: String,
    pub savings_goal_pct: f64,
    pub locked_savings: f64,
    pub weeks: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// One persisted weekly allocation.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_number: i32,
    pub total_budget: f64,
    pub spent_amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Values written by a profile upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRecord {
    pub user_id: Uuid,
    pub university: Option<String>,
    pub city: Option<String>,
    pub currency: String,
    pub stipend_amount: f64,
    pub disbursement_frequency: String,
    pub savings_goal_pct: f64,
    pub locked_savings: f64,
    pub weeks: i32,
}

/// Aggregates shown on the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_students: i64,
    pub total_profiles: i64,
    pub total_budgets: i64,
    pub active_budgets: i64,
    pub total_spending: f64,
    pub total_locked_savings: f64,
}
