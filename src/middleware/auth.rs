use std::future::Future;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Role,
    state::AppState,
};

/// Identity proven by a verified bearer credential.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
}

/// What an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Role(Role),
    /// The caller must be the owner of the resource.
    Owner(Uuid),
}

pub fn authorize(user: &AuthUser, requirement: Requirement) -> AppResult<()> {
    if user.user_id.is_nil() {
        return Err(AppError::Unauthenticated);
    }
    match requirement {
        Requirement::Role(role) if user.role != role => Err(AppError::Forbidden),
        // Not-owned reads as absent so existence is never revealed.
        Requirement::Owner(owner) if user.user_id != owner => Err(AppError::NotFound),
        _ => Ok(()),
    }
}

pub fn ensure_admin(user: &AuthUser) -> AppResult<()> {
    authorize(user, Requirement::Role(Role::Admin))
}

/// Token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> AppResult<&str> {
    let auth_str = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthenticated)?
        .to_str()
        .map_err(|_| AppError::Unauthenticated)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthenticated)?;
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let verified = bearer_token(&parts.headers).and_then(|token| state.tokens.verify(token));
        async move {
            let claims = verified?;
            Ok(AuthUser {
                user_id: claims.user_id,
                username: claims.username,
                role: claims.role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use chrono::Duration;
    use sea_orm::Database;

    use crate::services::token_service::TokenKeys;

    fn user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            username: "ann".into(),
            role,
        }
    }

    #[test]
    fn role_requirement() {
        assert!(authorize(&user(Role::Admin), Requirement::Role(Role::Admin)).is_ok());
        assert!(matches!(
            authorize(&user(Role::User), Requirement::Role(Role::Admin)),
            Err(AppError::Forbidden)
        ));
        assert!(ensure_admin(&user(Role::Admin)).is_ok());
    }

    #[test]
    fn owner_mismatch_reads_as_not_found() {
        let caller = user(Role::User);
        assert!(authorize(&caller, Requirement::Owner(caller.user_id)).is_ok());
        assert!(matches!(
            authorize(&caller, Requirement::Owner(Uuid::new_v4())),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn nil_identity_is_unauthenticated() {
        let mut caller = user(Role::Admin);
        caller.user_id = Uuid::nil();
        assert!(matches!(
            authorize(&caller, Requirement::Role(Role::Admin)),
            Err(AppError::Unauthenticated)
        ));
    }

    async fn state() -> AppState {
        let orm = Database::connect("sqlite::memory:").await.unwrap();
        AppState::new(
            orm,
            TokenKeys::new("secret", Duration::minutes(10)),
            std::time::Duration::from_secs(2),
        )
    }

    async fn extract(state: &AppState, header: Option<&str>) -> AppResult<AuthUser> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn extractor_accepts_valid_bearer() {
        let state = state().await;
        let id = Uuid::new_v4();
        let issued = state.tokens.issue(id, "ann", Role::User).unwrap();

        let auth = extract(&state, Some(&format!("Bearer {}", issued.token)))
            .await
            .unwrap();
        assert_eq!(auth.user_id, id);
        assert_eq!(auth.role, Role::User);
    }

    #[tokio::test]
    async fn extractor_rejects_missing_or_malformed_header() {
        let state = state().await;
        let issued = state.tokens.issue(Uuid::new_v4(), "ann", Role::User).unwrap();

        assert!(matches!(extract(&state, None).await, Err(AppError::Unauthenticated)));
        assert!(matches!(
            extract(&state, Some(&issued.token)).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            extract(&state, Some("Bearer ")).await,
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            extract(&state, Some("Bearer garbage")).await,
            Err(AppError::Unauthenticated)
        ));
    }
}
