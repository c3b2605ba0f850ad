use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::Storage;
use crate::{
    auth::repo_types::{NewUser, Role, User},
    budget::Allocation,
    profile::{
        repo,
        repo_types::{Budget, DashboardStats, Profile, ProfileRecord},
    },
};

#[derive(Clone)]
pub struct PgStorage {
    db: PgPool,
}

impl PgStorage {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Upsert, then delete and insert the allocations on an open transaction.
async fn write_profile_budgets(
    tx: &mut Transaction<'_, Postgres>,
    record: &ProfileRecord,
    allocations: &[Allocation],
) -> anyhow::Result<(Profile, Vec<Budget>)> {
    let profile = repo::upsert_profile_tx(tx, record).await?;
    let removed = repo::delete_budgets_tx(tx, record.user_id).await?;

    let mut budgets = Vec::with_capacity(allocations.len());
    for allocation in allocations {
        budgets.push(repo::insert_budget_tx(tx, record.user_id, allocation).await?);
    }
    debug!(user_id = %record.user_id, removed, inserted = budgets.len(), "budgets written");
    Ok((profile, budgets))
}

#[async_trait]
impl Storage for PgStorage {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        User::find_by_email(&self.db, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        User::find_by_id(&self.db, id).await
    }

    async fn create_user(
        &self,
        new: NewUser,
        profile: Option<(&ProfileRecord, &[Allocation])>,
    ) -> anyhow::Result<User> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        let user = User::create_tx(&mut tx, &new).await?;
        if let Some((record, allocations)) = profile {
            anyhow::ensure!(record.user_id == user.id, "profile owner does not match new user");
            write_profile_budgets(&mut tx, record, allocations).await?;
        }
        tx.commit().await.context("commit tx")?;
        Ok(user)
    }

    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        User::list_by_role(&self.db, role).await
    }

    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        repo::find_profile(&self.db, user_id).await
    }

    async fn replace_profile_budgets(
        &self,
        record: &ProfileRecord,
        allocations: &[Allocation],
    ) -> anyhow::Result<(Profile, Vec<Budget>)> {
        // Dropping the transaction on any `?` below rolls it back.
        let mut tx = self.db.begin().await.context("begin tx")?;
        let written = write_profile_budgets(&mut tx, record, allocations).await?;
        tx.commit().await.context("commit tx")?;
        Ok(written)
    }

    async fn list_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
        repo::list_budgets(&self.db, user_id).await
    }

    async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats> {
        repo::dashboard_stats(&self.db).await
    }
}
