use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{DuplicateEmail, Storage};
use crate::{
    auth::repo_types::{NewUser, Role, User},
    budget::Allocation,
    profile::repo_types::{Budget, DashboardStats, Profile, ProfileRecord},
};

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    profiles: HashMap<Uuid, Profile>,
    budgets: HashMap<Uuid, Vec<Budget>>,
}

/// Map-backed [`Storage`]; every write happens under one lock.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    fail_replace: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next profile/allocation write fail before touching data.
    pub fn fail_next_replace(&self) {
        self.fail_replace.store(true, Ordering::SeqCst);
    }

    fn check_replace(&self) -> anyhow::Result<()> {
        if self.fail_replace.swap(false, Ordering::SeqCst) {
            anyhow::bail!("simulated storage failure");
        }
        Ok(())
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory storage poisoned"))
    }
}

fn build_profile_budgets(
    inner: &Inner,
    record: &ProfileRecord,
    allocations: &[Allocation],
    now: OffsetDateTime,
) -> anyhow::Result<(Profile, Vec<Budget>)> {
    let created_at = inner
        .profiles
        .get(&record.user_id)
        .map(|p| p.created_at)
        .unwrap_or(now);

    let profile = Profile {
        user_id: record.user_id,
        university: record.university.clone(),
        city: record.city.clone(),
        currency: record.currency.clone(),
        stipend_amount: record.stipend_amount,
        disbursement_frequency: record.disbursement_frequency.clone(),
        savings_goal_pct: record.savings_goal_pct,
        locked_savings: record.locked_savings,
        weeks: record.weeks,
        created_at,
        updated_at: now,
    };

    let budgets = allocations
        .iter()
        .map(|a| {
            Ok(Budget {
                id: Uuid::new_v4(),
                user_id: record.user_id,
                week_number: i32::try_from(a.week_number)?,
                total_budget: a.total_budget,
                spent_amount: a.spent_amount,
                start_date: a.start_date,
                end_date: a.end_date,
                is_active: a.is_active,
                created_at: now,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok((profile, budgets))
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(
        &self,
        new: NewUser,
        profile: Option<(&ProfileRecord, &[Allocation])>,
    ) -> anyhow::Result<User> {
        let mut inner = self.lock()?;
        if inner.users.iter().any(|u| u.email == new.email) {
            return Err(DuplicateEmail.into());
        }

        let now = OffsetDateTime::now_utc();
        let written = match profile {
            Some((record, allocations)) => {
                anyhow::ensure!(record.user_id == new.id, "profile owner does not match new user");
                self.check_replace()?;
                Some(build_profile_budgets(&inner, record, allocations, now)?)
            }
            None => None,
        };

        let user = User {
            id: new.id,
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
        };
        inner.users.push(user.clone());
        if let Some((profile, budgets)) = written {
            inner.budgets.insert(user.id, budgets);
            inner.profiles.insert(user.id, profile);
        }
        Ok(user)
    }

    async fn list_users_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let inner = self.lock()?;
        let mut users: Vec<User> = inner
            .users
            .iter()
            .rev()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn find_profile(&self, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }

    async fn replace_profile_budgets(
        &self,
        record: &ProfileRecord,
        allocations: &[Allocation],
    ) -> anyhow::Result<(Profile, Vec<Budget>)> {
        self.check_replace()?;
        let mut inner = self.lock()?;
        let (profile, budgets) =
            build_profile_budgets(&inner, record, allocations, OffsetDateTime::now_utc())?;
        inner.profiles.insert(record.user_id, profile.clone());
        inner.budgets.insert(record.user_id, budgets.clone());
        Ok((profile, budgets))
    }

    async fn list_budgets(&self, user_id: Uuid) -> anyhow::Result<Vec<Budget>> {
        let mut budgets = self
            .lock()?
            .budgets
            .get(&user_id)
            .cloned()
            .unwrap_or_default();
        budgets.sort_by_key(|b| b.week_number);
        Ok(budgets)
    }

    async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats> {
        let inner = self.lock()?;
        let budgets: Vec<&Budget> = inner.budgets.values().flatten().collect();
        Ok(DashboardStats {
            total_students: inner.users.iter().filter(|u| u.role == Role::Student).count() as i64,
            total_profiles: inner.profiles.len() as i64,
            total_budgets: budgets.len() as i64,
            active_budgets: budgets.iter().filter(|b| b.is_active).count() as i64,
            total_spending: budgets.iter().map(|b| b.spent_amount).sum(),
            total_locked_savings: inner.profiles.values().map(|p| p.locked_savings).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{derive, Financials};

    fn record(user_id: Uuid, weeks: i32) -> ProfileRecord {
        ProfileRecord {
            user_id,
            university: None,
            city: None,
            currency: "USD".into(),
            stipend_amount: 1000.0,
            disbursement_frequency: "monthly".into(),
            savings_goal_pct: 0.0,
            locked_savings: 0.0,
            weeks,
        }
    }

    fn allocations(weeks: i64) -> Vec<Allocation> {
        let f = Financials::new(Some(1000.0), Some(0.0), Some(weeks)).unwrap();
        derive(&f, OffsetDateTime::now_utc()).allocations
    }

    #[tokio::test]
    async fn replace_swaps_whole_set() {
        let store = MemoryStorage::new();
        let owner = Uuid::new_v4();
        store
            .replace_profile_budgets(&record(owner, 5), &allocations(5))
            .await
            .unwrap();
        store
            .replace_profile_budgets(&record(owner, 2), &allocations(2))
            .await
            .unwrap();

        let weeks: Vec<i32> = store
            .list_budgets(owner)
            .await
            .unwrap()
            .iter()
            .map(|b| b.week_number)
            .collect();
        assert_eq!(weeks, vec![1, 2]);
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_set() {
        let store = MemoryStorage::new();
        let owner = Uuid::new_v4();
        store
            .replace_profile_budgets(&record(owner, 3), &allocations(3))
            .await
            .unwrap();

        store.fail_next_replace();
        assert!(store
            .replace_profile_budgets(&record(owner, 6), &allocations(6))
            .await
            .is_err());

        assert_eq!(store.list_budgets(owner).await.unwrap().len(), 3);
        assert_eq!(store.find_profile(owner).await.unwrap().unwrap().weeks, 3);
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            id: Uuid::new_v4(),
            email: email.into(),
            first_name: "A".into(),
            last_name: "B".into(),
            password_hash: "x".into(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn duplicate_emails_are_refused() {
        let store = MemoryStorage::new();
        store.create_user(new_user("dup@uni.edu"), None).await.unwrap();
        let err = store
            .create_user(new_user("dup@uni.edu"), None)
            .await
            .unwrap_err();
        assert!(err.is::<DuplicateEmail>());
    }

    #[tokio::test]
    async fn user_created_with_profile_and_budgets() {
        let store = MemoryStorage::new();
        let new = new_user("p@uni.edu");
        let rec = record(new.id, 4);
        let allocs = allocations(4);
        let user = store
            .create_user(new, Some((&rec, allocs.as_slice())))
            .await
            .unwrap();

        assert_eq!(store.find_profile(user.id).await.unwrap().unwrap().weeks, 4);
        assert_eq!(store.list_budgets(user.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failed_profile_write_leaves_no_user() {
        let store = MemoryStorage::new();
        let new = new_user("half@uni.edu");
        let rec = record(new.id, 4);
        let allocs = allocations(4);

        store.fail_next_replace();
        assert!(store
            .create_user(new, Some((&rec, allocs.as_slice())))
            .await
            .is_err());

        assert!(store.find_user_by_email("half@uni.edu").await.unwrap().is_none());
        assert!(store.find_profile(rec.user_id).await.unwrap().is_none());
    }
}
