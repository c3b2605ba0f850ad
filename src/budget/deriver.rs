use serde::Serialize;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const DEFAULT_WEEKS: u32 = 4;
pub const MAX_WEEKS: u32 = 520;

/// Allowed drift between the allocations plus locked savings and the stipend.
pub const VERIFICATION_TOLERANCE: f64 = 0.01;

/// Rejections raised while validating financial inputs. The deriver itself
/// never fails once it holds a [`Financials`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BudgetError {
    #[error("Stipend amount and savings goal percentage are required")]
    MissingInputs,
    #[error("Stipend amount must be a non-negative number")]
    InvalidStipend,
    #[error("Savings goal percentage must be between 0 and 100")]
    SavingsGoalOutOfRange,
    #[error("Weeks must be between 1 and {}", MAX_WEEKS)]
    InvalidWeeks,
}

/// Validated inputs for a derivation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Financials {
    stipend_amount: f64,
    savings_goal_pct: f64,
    weeks: u32,
}

impl Financials {
    /// Presence decides defaulting: `Some(0.0)` is a real value, only `None`
    /// for `weeks` falls back to [`DEFAULT_WEEKS`].
    pub fn new(
        stipend_amount: Option<f64>,
        savings_goal_pct: Option<f64>,
        weeks: Option<i64>,
    ) -> Result<Self, BudgetError> {
        let (Some(stipend_amount), Some(savings_goal_pct)) = (stipend_amount, savings_goal_pct)
        else {
            return Err(BudgetError::MissingInputs);
        };

        if !stipend_amount.is_finite() || stipend_amount < 0.0 {
            return Err(BudgetError::InvalidStipend);
        }
        if !savings_goal_pct.is_finite() || !(0.0..=100.0).contains(&savings_goal_pct) {
            return Err(BudgetError::SavingsGoalOutOfRange);
        }

        let weeks = match weeks {
            None => DEFAULT_WEEKS,
            Some(w) => u32::try_from(w)
                .ok()
                .filter(|w| (1..=MAX_WEEKS).contains(w))
                .ok_or(BudgetError::InvalidWeeks)?,
        };

        Ok(Self {
            stipend_amount,
            savings_goal_pct,
            weeks,
        })
    }

    pub fn stipend_amount(&self) -> f64 {
        self.stipend_amount
    }

    pub fn savings_goal_pct(&self) -> f64 {
        self.savings_goal_pct
    }

    pub fn weeks(&self) -> u32 {
        self.weeks
    }
}

/// One week of spending money, before it is persisted for an owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub week_number: u32,
    pub total_budget: f64,
    pub spent_amount: f64,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verification {
    pub total_budgets: f64,
    pub plus_locked_savings: f64,
    pub equals_stipend: f64,
    pub is_valid: bool,
}

impl Verification {
    pub fn check(total_budgets: f64, locked_savings: f64, stipend_amount: f64) -> Self {
        Self {
            total_budgets,
            plus_locked_savings: locked_savings,
            equals_stipend: stipend_amount,
            is_valid: (total_budgets + locked_savings - stipend_amount).abs()
                < VERIFICATION_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub locked_savings: f64,
    pub remaining: f64,
    pub weekly_budget: f64,
    pub allocations: Vec<Allocation>,
    pub verification: Verification,
}

/// Splits a stipend into locked savings and equal weekly allocations.
///
/// Week `n` starts `(n - 1) * 7` days after `now` and ends six days later;
/// only week 1 is active.
pub fn derive(financials: &Financials, now: OffsetDateTime) -> Derivation {
    let stipend = financials.stipend_amount;
    let weeks = financials.weeks;

    let locked_savings = stipend * (financials.savings_goal_pct / 100.0);
    let remaining = stipend - locked_savings;
    let weekly_budget = remaining / f64::from(weeks);

    let allocations = (1..=weeks)
        .map(|week_number| {
            let start_date = now + Duration::days(i64::from(week_number - 1) * 7);
            Allocation {
                week_number,
                total_budget: weekly_budget,
                spent_amount: 0.0,
                start_date,
                end_date: start_date + Duration::days(6),
                is_active: week_number == 1,
            }
        })
        .collect();

    let total_budgets = weekly_budget * f64::from(weeks);
    let verification = Verification::check(total_budgets, locked_savings, stipend);

    Derivation {
        locked_savings,
        remaining,
        weekly_budget,
        allocations,
        verification,
    }
}

/// Figures reported next to a profile, either fresh from a derivation or
/// recomputed from what is currently stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calculations {
    pub total_stipend: f64,
    pub locked_savings: f64,
    pub remaining_for_budgets: f64,
    pub weekly_budget: f64,
    pub total_weekly_budgets: f64,
    pub verification: Verification,
}

impl Calculations {
    pub fn from_derivation(financials: &Financials, derivation: &Derivation) -> Self {
        let total_weekly_budgets = derivation.weekly_budget * f64::from(financials.weeks);
        Self {
            total_stipend: financials.stipend_amount,
            locked_savings: derivation.locked_savings,
            remaining_for_budgets: derivation.remaining,
            weekly_budget: derivation.weekly_budget,
            total_weekly_budgets,
            verification: derivation.verification,
        }
    }

    /// `weekly_totals` must be ordered by week number.
    pub fn from_persisted(stipend_amount: f64, locked_savings: f64, weekly_totals: &[f64]) -> Self {
        let total_weekly_budgets: f64 = weekly_totals.iter().sum();
        Self {
            total_stipend: stipend_amount,
            locked_savings,
            remaining_for_budgets: stipend_amount - locked_savings,
            weekly_budget: weekly_totals.first().copied().unwrap_or(0.0),
            total_weekly_budgets,
            verification: Verification::check(total_weekly_budgets, locked_savings, stipend_amount),
        }
    }
}
