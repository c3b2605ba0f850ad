use serde::{Deserialize, Serialize};

use super::repo_types::{Budget, Profile};
use crate::{auth::dto::PublicUser, budget::Calculations};

/// Body of `POST /profile` and `PUT /admin/students/{id}/profile`.
/// Absent and `null` fields are both `None`; zero is a real value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub university: Option<String>,
    pub city: Option<String>,
    pub currency: Option<String>,
    pub stipend_amount: Option<f64>,
    pub disbursement_frequency: Option<String>,
    pub savings_goal_pct: Option<f64>,
    pub weeks: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct ProfileData {
    pub profile: ProfileView,
    pub budgets: Vec<Budget>,
    pub calculations: Calculations,
}
