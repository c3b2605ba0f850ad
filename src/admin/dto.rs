use serde::Serialize;

use crate::{
    auth::dto::PublicUser,
    profile::repo_types::{Budget, DashboardStats, Profile},
};

#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub stats: DashboardStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    #[serde(flatten)]
    pub user: PublicUser,
    pub profile: Option<Profile>,
    pub active_budgets: Vec<Budget>,
    pub budget_count: usize,
}

#[derive(Debug, Serialize)]
pub struct StudentList {
    pub students: Vec<StudentSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StudentDetail {
    #[serde(flatten)]
    pub user: PublicUser,
    pub profile: Option<Profile>,
    pub budgets: Vec<Budget>,
}

#[derive(Debug, Serialize)]
pub struct StudentData {
    pub student: StudentDetail,
}
