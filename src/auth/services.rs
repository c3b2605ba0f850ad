use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthData, PublicUser, SignupRequest},
    jwt::JwtKeys,
    password::{hash_password, MIN_PASSWORD_LEN},
    repo_types::{NewUser, Role, User},
};
use crate::{error::AppError, profile::dto::ProfileRequest};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Default savings goal applied when signup carries a stipend without one.
pub const SIGNUP_DEFAULT_SAVINGS_GOAL_PCT: f64 = 20.0;

impl SignupRequest {
    /// Checks identity fields and builds the user to insert. The password is
    /// hashed here so nothing downstream sees it in plain text.
    pub fn into_new_user(self) -> Result<(NewUser, Option<ProfileRequest>), AppError> {
        let email = normalize_email(&self.email);
        let first_name = self.first_name.trim().to_string();
        let last_name = self.last_name.trim().to_string();

        if email.is_empty()
            || self.password.is_empty()
            || first_name.is_empty()
            || last_name.is_empty()
        {
            return Err(AppError::Validation(
                "Email, password, firstName, and lastName are required".into(),
            ));
        }
        if !is_valid_email(&email) {
            warn!(%email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let role = match self.role.as_deref() {
            None => Role::Student,
            Some(raw) => Role::parse(raw).ok_or_else(|| {
                AppError::Validation("Invalid role. Must be STUDENT or ADMIN".into())
            })?,
        };

        let profile = self.stipend_amount.map(|stipend| ProfileRequest {
            university: self.university,
            city: self.city,
            currency: self.currency,
            stipend_amount: Some(stipend),
            disbursement_frequency: self.disbursement_frequency,
            savings_goal_pct: Some(
                self.savings_goal_pct.unwrap_or(SIGNUP_DEFAULT_SAVINGS_GOAL_PCT),
            ),
            weeks: self.weeks,
        });

        let password_hash = hash_password(&self.password)?;
        Ok((
            NewUser {
                id: Uuid::new_v4(),
                email,
                first_name,
                last_name,
                password_hash,
                role,
            },
            profile,
        ))
    }
}

/// Signs a fresh access/refresh pair for `user`.
pub fn issue_tokens(keys: &JwtKeys, user: &User) -> Result<AuthData, AppError> {
    let token = keys.sign_access(user)?;
    let refresh_token = keys.sign_refresh(user)?;
    info!(user_id = %user.id, role = ?user.role, "tokens issued");
    Ok(AuthData {
        user: PublicUser::from(user),
        token,
        refresh_token,
    })
}
