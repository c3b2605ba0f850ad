use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{claims::TokenKind, jwt::JwtKeys, repo_types::Role};
use crate::error::AppError;

/// Caller identity resolved from a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized("Invalid or expired token".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        Ok(AuthUser {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

pub fn require_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&user.role) {
        return Ok(());
    }
    warn!(user_id = %user.id, role = ?user.role, "role check failed");
    Err(AppError::Forbidden {
        required: allowed.to_vec(),
        current: user.role,
    })
}

/// An authenticated caller holding the ADMIN role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        require_role(&user, &[Role::Admin])?;
        Ok(RequireAdmin(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::jwt::tests::sample_user, state::AppState};
    use axum::http::{Request, StatusCode};

    fn bearer(token: &str) -> Parts {
        parts_with(Some(format!("Bearer {token}")))
    }

    fn parts_with(header: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/admin/dashboard");
        if let Some(h) = header {
            builder = builder.header("Authorization", h);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let err = AuthUser::from_request_parts(&mut parts_with(None), &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_cannot_authenticate() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_refresh(&sample_user(Role::Student)).unwrap();
        let err = AuthUser::from_request_parts(&mut bearer(&token), &state)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_extractor_rejects_students() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_access(&sample_user(Role::Student)).unwrap();
        let err = RequireAdmin::from_request_parts(&mut bearer(&token), &state)
            .await
            .unwrap_err();
        match err {
            AppError::Forbidden { required, current } => {
                assert_eq!(required, vec![Role::Admin]);
                assert_eq!(current, Role::Student);
            }
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn admin_extractor_accepts_admins() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let admin = sample_user(Role::Admin);
        let token = keys.sign_access(&admin).unwrap();
        let RequireAdmin(user) = RequireAdmin::from_request_parts(&mut bearer(&token), &state)
            .await
            .expect("admin accepted");
        assert_eq!(user.id, admin.id);
    }

    #[test]
    fn require_role_allows_any_listed_role() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.co".into(),
            role: Role::Student,
        };
        assert!(require_role(&user, &[Role::Student, Role::Admin]).is_ok());
        assert!(require_role(&user, &[Role::Admin]).is_err());
    }
}
