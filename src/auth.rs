use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Profile, Role};
use crate::state::AppState;
use crate::utils::error::AppError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// The authenticated actor for a request, extracted from the bearer token.
/// Role checks are made against the profiles table, not the token, so a
/// role change applies without waiting for tokens to expire.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: Uuid,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthenticated("No token provided".to_string()))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))?;

        Ok(CurrentUser {
            id: decoded.claims.sub,
        })
    }
}

pub fn issue_token(
    user_id: Uuid,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = chrono::Utc::now() + chrono::Duration::hours(ttl_hours);
    let claims = Claims {
        sub: user_id,
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub async fn load_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>, AppError> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(profile)
}

pub async fn require_staff(pool: &PgPool, actor: &CurrentUser) -> Result<Profile, AppError> {
    let profile = load_profile(pool, actor.id)
        .await?
        .ok_or_else(|| AppError::PermissionDenied("No profile for this account".to_string()))?;
    if profile.role != Role::Staff {
        return Err(AppError::PermissionDenied(
            "Staff role required".to_string(),
        ));
    }
    Ok(profile)
}

pub async fn is_staff(pool: &PgPool, actor: &CurrentUser) -> Result<bool, AppError> {
    Ok(load_profile(pool, actor.id)
        .await?
        .map(|p| p.role == Role::Staff)
        .unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_round_trip_the_subject() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "test-secret", 1).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let token = issue_token(Uuid::new_v4(), "test-secret", 1).unwrap();
        let result = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::default(),
        );
        assert!(result.is_err());
    }
}
