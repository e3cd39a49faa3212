use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{LoginRequest, RegisterRequest, TokenResponse},
    entity::{Users, users},
    error::{AppError, AppResult},
    models::{Role, User},
    services::token_service::IssuedToken,
    state::AppState,
};

pub const MIN_USERNAME_CHARS: usize = 2;
pub const MIN_PASSWORD_CHARS: usize = 6;

pub fn validate_username(username: &str) -> AppResult<String> {
    let username = username.trim();
    if username.chars().count() < MIN_USERNAME_CHARS {
        return Err(AppError::InvalidArgument(format!(
            "username must be at least {MIN_USERNAME_CHARS} characters"
        )));
    }
    Ok(username.to_owned())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::InvalidArgument(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn token_response(issued: IssuedToken) -> TokenResponse {
    TokenResponse {
        token: issued.token,
        token_type: "Bearer".into(),
        role: issued.role,
        expires_at: issued.expires_at,
    }
}

pub async fn register_user(state: &AppState, payload: RegisterRequest) -> AppResult<User> {
    let RegisterRequest { username, password } = payload;
    let username = validate_username(&username)?;
    validate_password(&password)?;

    let exist = Users::find()
        .filter(users::Column::Username.eq(username.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("username is already taken".into()));
    }

    let password_hash = hash_password(&password)?;

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        password_hash: Set(password_hash),
        role: Set(Role::User),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        &state.orm,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(User::from(user))
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<TokenResponse> {
    let LoginRequest { username, password } = payload;
    let user = Users::find()
        .filter(users::Column::Username.eq(username.trim()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthenticated);
    }

    let issued = state.tokens.issue(user.id, &user.username, user.role)?;

    audit::record(
        &state.orm,
        user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(token_response(issued))
}

pub fn refresh_token(state: &AppState, token: &str) -> AppResult<TokenResponse> {
    state.tokens.refresh(token).map(token_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_and_password_lengths() {
        assert!(validate_username("a").is_err());
        assert!(validate_username("  a  ").is_err());
        assert_eq!(validate_username(" ab ").unwrap(), "ab");
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    #[test]
    fn password_hash_verifies_only_original() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }
}
