//! Persistence seam. Handlers and services only see [`Storage`]; Postgres
//! backs it in production and an in-memory map backs it in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, Role, User},
    budget::Allocation,
    profile::repo_types::{Budget, DashboardStats, Profile, ProfileRecord},
};

#[cfg(test)]
pub mod memory;
mod postgres;

pub use postgres::PgStorage;

/// The email is already registered.
#[derive(Debug, thiserror::Error)]
#[error("email already registered")]
pub struct DuplicateEmail;

#[async_trait]
pub trait Storage: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Inserts the user and, when given, its profile and allocations as one
    /// unit. A taken email fails with [`DuplicateEmail`] and writes nothing.
    async fn create_user(
        &self,
        new: NewUser,
        profile: Option<(&ProfileRecord, &[Allocation])>,
    ) -> anyhow::Result<User>;

    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>>;

    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>>;

    /// Upserts the profile and replaces the owner's whole allocation set as
    /// one unit. On error nothing changes.
    async fn replace_profile_budgets(
        &self,
        record: &ProfileRecord,
        allocations: &[Allocation],
    ) -> anyhow::Result<(Profile, Vec<Budget>)>;

    /// Ordered by week number.
    async fn list_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>>;

    async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats>;
}
