use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ProfileData, ProfileRequest, ProfileView},
    repo_types::{Profile, ProfileRecord},
};
use crate::{
    auth::{
        dto::PublicUser,
        repo_types::{NewUser, User},
    },
    budget::{self, Allocation, Calculations, Derivation, Financials},
    error::AppError,
    storage::Storage,
};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_DISBURSEMENT_FREQUENCY: &str = "monthly";

impl ProfileRequest {
    /// Fills every field the request leaves unset from `existing`.
    pub fn merged_over(self, existing: Option<&Profile>) -> Self {
        let Some(p) = existing else {
            return self;
        };
        Self {
            university: self.university.or_else(|| p.university.clone()),
            city: self.city.or_else(|| p.city.clone()),
            currency: self.currency.or_else(|| Some(p.currency.clone())),
            stipend_amount: self.stipend_amount.or(Some(p.stipend_amount)),
            disbursement_frequency: self
                .disbursement_frequency
                .or_else(|| Some(p.disbursement_frequency.clone())),
            savings_goal_pct: self.savings_goal_pct.or(Some(p.savings_goal_pct)),
            weeks: self.weeks.or(Some(i64::from(p.weeks))),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A validated profile row and the allocations derived from it, not yet
/// written.
#[derive(Debug)]
pub struct PreparedProfile {
    financials: Financials,
    derivation: Derivation,
    record: ProfileRecord,
}

impl PreparedProfile {
    pub fn record(&self) -> &ProfileRecord {
        &self.record
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.derivation.allocations
    }

    fn log_saved(&self, weeks: usize) {
        let user_id = self.record.user_id;
        if !self.derivation.verification.is_valid {
            warn!(
                %user_id,
                verification = ?self.derivation.verification,
                "allocations do not reconstruct stipend"
            );
        }
        info!(
            %user_id,
            weeks,
            weekly_budget = self.derivation.weekly_budget,
            "profile saved with derived budgets"
        );
    }
}

/// Validates the request and derives the weekly allocations for `user_id`.
/// Nothing is written.
pub fn prepare_profile(
    user_id: Uuid,
    req: ProfileRequest,
    now: OffsetDateTime,
) -> Result<PreparedProfile, AppError> {
    let financials = Financials::new(req.stipend_amount, req.savings_goal_pct, req.weeks)
        .map_err(|e| {
            warn!(%user_id, error = %e, "rejected profile financials");
            e
        })?;
    let derivation = budget::derive(&financials, now);

    let record = ProfileRecord {
        user_id,
        university: non_blank(req.university),
        city: non_blank(req.city),
        currency: non_blank(req.currency).unwrap_or_else(|| DEFAULT_CURRENCY.into()),
        stipend_amount: financials.stipend_amount(),
        disbursement_frequency: non_blank(req.disbursement_frequency)
            .unwrap_or_else(|| DEFAULT_DISBURSEMENT_FREQUENCY.into()),
        savings_goal_pct: financials.savings_goal_pct(),
        locked_savings: derivation.locked_savings,
        weeks: i32::try_from(financials.weeks()).map_err(anyhow::Error::from)?,
    };

    Ok(PreparedProfile {
        financials,
        derivation,
        record,
    })
}

/// Signup path: the account, its profile and allocations land together or
/// not at all.
pub async fn register_with_profile(
    storage: &dyn Storage,
    new_user: NewUser,
    prepared: Option<&PreparedProfile>,
) -> Result<User, AppError> {
    let user = storage
        .create_user(new_user, prepared.map(|p| (p.record(), p.allocations())))
        .await?;
    if let Some(p) = prepared {
        p.log_saved(p.allocations().len());
    }
    Ok(user)
}

/// Validates, derives the weekly allocations and stores profile plus
/// allocations as one replacement.
pub async fn save_profile(
    storage: &dyn Storage,
    user: &User,
    req: ProfileRequest,
    now: OffsetDateTime,
) -> Result<ProfileData, AppError> {
    let prepared = prepare_profile(user.id, req, now)?;
    let (profile, budgets) = storage
        .replace_profile_budgets(prepared.record(), prepared.allocations())
        .await?;
    prepared.log_saved(budgets.len());

    Ok(ProfileData {
        profile: ProfileView {
            profile,
            user: PublicUser::from(user),
        },
        budgets,
        calculations: Calculations::from_derivation(&prepared.financials, &prepared.derivation),
    })
}

/// Current profile with figures recomputed from the stored allocations.
pub async fn load_profile(storage: &dyn Storage, user: &User) -> Result<ProfileData, AppError> {
    let profile = storage
        .find_profile(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;
    let budgets = storage.list_budgets(user.id).await?;

    let weekly_totals: Vec<f64> = budgets.iter().map(|b| b.total_budget).collect();
    let calculations = Calculations::from_persisted(
        profile.stipend_amount,
        profile.locked_savings,
        &weekly_totals,
    );

    Ok(ProfileData {
        profile: ProfileView {
            profile,
            user: PublicUser::from(user),
        },
        budgets,
        calculations,
    })
}
