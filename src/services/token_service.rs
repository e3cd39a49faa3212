use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::{AppError, AppResult},
    models::Role,
};

/// A credential may only be refreshed during its final two minutes.
pub const REFRESH_WINDOW_SECS: i64 = 120;

/// Signing material and lifetime for bearer credentials (HS256).
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct VerifiedClaims {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, username: &str, role: Role) -> AppResult<IssuedToken> {
        let exp = Utc::now()
            .checked_add_signed(self.ttl)
            .and_then(|expires_at| u64::try_from(expires_at.timestamp()).ok())
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_owned(),
            role,
            exp,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

        Ok(IssuedToken {
            token,
            role,
            expires_at: expiry_from_claim(exp)?,
        })
    }

    /// Validate signature and expiry (no leeway) and extract the identity.
    pub fn verify(&self, token: &str) -> AppResult<VerifiedClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let decoded = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            tracing::debug!(error = %err, "credential rejected");
            AppError::Unauthenticated
        })?;
        let claims = decoded.claims;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated)?;
        if user_id.is_nil() {
            return Err(AppError::Unauthenticated);
        }

        Ok(VerifiedClaims {
            user_id,
            username: claims.username,
            role: claims.role,
            expires_at: expiry_from_claim(claims.exp)?,
        })
    }

    /// Re-issue a still-valid credential that is inside its refresh window.
    pub fn refresh(&self, token: &str) -> AppResult<IssuedToken> {
        let claims = self.verify(token)?;
        if claims.expires_at - Utc::now() > Duration::seconds(REFRESH_WINDOW_SECS) {
            return Err(AppError::RefreshNotYetEligible);
        }
        self.issue(claims.user_id, &claims.username, claims.role)
    }
}

fn expiry_from_claim(exp: u64) -> AppResult<DateTime<Utc>> {
    i64::try_from(exp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(AppError::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_verifies_with_same_identity() {
        let keys = TokenKeys::new(SECRET, Duration::minutes(10));
        let user_id = Uuid::new_v4();
        let issued = keys.issue(user_id, "ann", Role::User).unwrap();

        let claims = keys.verify(&issued.token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "ann");
        assert_eq!(claims.role, Role::User);
        assert_eq!(claims.expires_at, issued.expires_at);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = TokenKeys::new(SECRET, Duration::seconds(-30));
        let issued = keys.issue(Uuid::new_v4(), "ann", Role::User).unwrap();
        assert!(matches!(
            keys.verify(&issued.token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let forger = TokenKeys::new("someone-else", Duration::minutes(10));
        let keys = TokenKeys::new(SECRET, Duration::minutes(10));
        let forged = forger.issue(Uuid::new_v4(), "mallory", Role::Admin).unwrap();
        assert!(matches!(
            keys.verify(&forged.token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn malformed_token_is_rejected() {
        let keys = TokenKeys::new(SECRET, Duration::minutes(10));
        assert!(matches!(
            keys.verify("not-a-jwt"),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(keys.verify(""), Err(AppError::Unauthenticated)));
    }

    #[test]
    fn nil_subject_is_rejected() {
        let keys = TokenKeys::new(SECRET, Duration::minutes(10));
        let issued = keys.issue(Uuid::nil(), "ghost", Role::User).unwrap();
        assert!(matches!(
            keys.verify(&issued.token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn refresh_is_refused_far_from_expiry() {
        let keys = TokenKeys::new(SECRET, Duration::minutes(10));
        let issued = keys.issue(Uuid::new_v4(), "ann", Role::User).unwrap();
        assert!(matches!(
            keys.refresh(&issued.token),
            Err(AppError::RefreshNotYetEligible)
        ));
    }

    #[test]
    fn refresh_near_expiry_keeps_identity() {
        let keys = TokenKeys::new(SECRET, Duration::seconds(60));
        let user_id = Uuid::new_v4();
        let issued = keys.issue(user_id, "ann", Role::Admin).unwrap();

        let refreshed = keys.refresh(&issued.token).unwrap();
        assert!(refreshed.expires_at >= issued.expires_at);

        let claims = keys.verify(&refreshed.token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.username, "ann");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn refresh_of_expired_token_is_unauthenticated() {
        let keys = TokenKeys::new(SECRET, Duration::seconds(-5));
        let issued = keys.issue(Uuid::new_v4(), "ann", Role::User).unwrap();
        assert!(matches!(
            keys.refresh(&issued.token),
            Err(AppError::Unauthenticated)
        ));
    }

    #[test]
    fn lifetime_past_the_calendar_is_an_internal_error() {
        let keys = TokenKeys::new(SECRET, Duration::MAX);
        assert!(matches!(
            keys.issue(Uuid::new_v4(), "ann", Role::User),
            Err(AppError::Internal(_))
        ));
    }
}
