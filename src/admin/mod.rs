//! Admin-only views over students and their budgets.

use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}
