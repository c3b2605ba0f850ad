use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::{Budget, DashboardStats, Profile, ProfileRecord};
use crate::budget::Allocation;

const PROFILE_COLUMNS: &str = "user_id, university, city, currency, stipend_amount, \
     disbursement_frequency, savings_goal_pct, locked_savings, weeks, created_at, updated_at";

const BUDGET_COLUMNS: &str = "id, user_id, week_number, total_budget, spent_amount, \
     start_date, end_date, is_active, created_at";

pub async fn find_profile(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
    let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1");
    let row = sqlx::query_as::<_, Profile>(&sql)
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find profile")?;
    Ok(row)
}

/// Insert or update the profile row within a transaction. Runs first in the
/// replacement so the row lock serializes concurrent writers for one owner.
pub async fn upsert_profile_tx(
    tx: &mut Transaction<'_, Postgres>,
    record: &ProfileRecord,
) -> anyhow::Result<Profile> {
    let sql = format!(
        r#"
        INSERT INTO profiles (user_id, university, city, currency, stipend_amount,
                              disbursement_frequency, savings_goal_pct, locked_savings, weeks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (user_id) DO UPDATE SET
            university = EXCLUDED.university,
            city = EXCLUDED.city,
            currency = EXCLUDED.currency,
            stipend_amount = EXCLUDED.stipend_amount,
            disbursement_frequency = EXCLUDED.disbursement_frequency,
            savings_goal_pct = EXCLUDED.savings_goal_pct,
            locked_savings = EXCLUDED.locked_savings,
            weeks = EXCLUDED.weeks,
            updated_at = now()
        RETURNING {PROFILE_COLUMNS}
        "#
    );
    let profile = sqlx::query_as::<_, Profile>(&sql)
        .bind(record.user_id)
        .bind(&record.university)
        .bind(&record.city)
        .bind(&record.currency)
        .bind(record.stipend_amount)
        .bind(&record.disbursement_frequency)
        .bind(record.savings_goal_pct)
        .bind(record.locked_savings)
        .bind(record.weeks)
        .fetch_one(&mut **tx)
        .await
        .context("upsert profile")?;
    Ok(profile)
}

pub async fn delete_budgets_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<u64> {
    let res = sqlx::query("DELETE FROM budgets WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .context("delete budgets")?;
    Ok(res.rows_affected())
}

pub async fn insert_budget_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    allocation: &Allocation,
) -> anyhow::Result<Budget> {
    let sql = format!(
        r#"
        INSERT INTO budgets (id, user_id, week_number, total_budget, spent_amount,
                             start_date, end_date, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {BUDGET_COLUMNS}
        "#
    );
    let week_number =
        i32::try_from(allocation.week_number).context("week number out of range")?;
    let budget = sqlx::query_as::<_, Budget>(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(week_number)
        .bind(allocation.total_budget)
        .bind(allocation.spent_amount)
        .bind(allocation.start_date)
        .bind(allocation.end_date)
        .bind(allocation.is_active)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("insert budget week {}", allocation.week_number))?;
    Ok(budget)
}

/// Budgets for a user, ordered by week number.
pub async fn list_budgets(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
    let sql = format!(
        "SELECT {BUDGET_COLUMNS} FROM budgets WHERE user_id = $1 ORDER BY week_number ASC"
    );
    let rows = sqlx::query_as::<_, Budget>(&sql)
        .bind(user_id)
        .fetch_all(db)
        .await
        .context("list budgets")?;
    Ok(rows)
}

pub async fn dashboard_stats(db: &PgPool) -> anyhow::Result<DashboardStats> {
    let stats = sqlx::query_as::<_, DashboardStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE role = 'STUDENT') AS total_students,
            (SELECT COUNT(*) FROM profiles) AS total_profiles,
            (SELECT COUNT(*) FROM budgets) AS total_budgets,
            (SELECT COUNT(*) FROM budgets WHERE is_active) AS active_budgets,
            (SELECT COALESCE(SUM(spent_amount), 0)::float8 FROM budgets) AS total_spending,
            (SELECT COALESCE(SUM(locked_savings), 0)::float8 FROM profiles) AS total_locked_savings
        "#,
    )
    .fetch_one(db)
    .await
    .context("dashboard stats")?;
    Ok(stats)
}
