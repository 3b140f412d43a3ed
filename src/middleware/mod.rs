use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::AppError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// Payload of the access token issued at login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: String,
}

impl AuthUser {
    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| {
        debug!("rejected access token: {}", e);
        AppError::Unauthorized
    })?;
    Ok(data.claims)
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let claims = decode_token(token.trim(), &state.config.jwt.secret)?;

        Ok(AuthUser {
            user_id: claims.id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(secret: &str, exp: usize) -> String {
        let claims = Claims { id: 7, role: ROLE_USER.to_string(), exp };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    fn far_future() -> usize {
        (chrono::Utc::now().timestamp() + 3600) as usize
    }

    #[test]
    fn decodes_token_signed_with_same_secret() {
        let claims = decode_token(&token("s3cret", far_future()), "s3cret").unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.role, ROLE_USER);
    }

    #[test]
    fn rejects_foreign_signature() {
        let result = decode_token(&token("other", far_future()), "s3cret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_expired_token() {
        let expired = (chrono::Utc::now().timestamp() - 3600) as usize;
        let result = decode_token(&token("s3cret", expired), "s3cret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn role_check() {
        let user = AuthUser { user_id: 1, role: ROLE_USER.to_string() };
        assert!(user.require_role(ROLE_USER).is_ok());
        assert!(matches!(user.require_role(ROLE_ADMIN), Err(AppError::Forbidden)));
    }
}
