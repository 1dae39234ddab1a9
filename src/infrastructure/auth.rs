//! Bearer token verification.
//!
//! Accounts live with the external identity provider; this service only
//! verifies the tokens it issues. The `sub` claim is the user id.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::{FromRequestParts, Json},
    http::{StatusCode, request::Parts},
};
use serde_json::json;

use crate::services::profile_service::fallback_username;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    /// Username used when the profile is provisioned on first sight
    pub fn default_username(&self) -> String {
        match &self.username {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => fallback_username(&self.sub),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Not authenticated. Please sign in to continue" })),
            ))?;

        let Some(token) = auth_header.strip_prefix("Bearer ") else {
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid Authorization header format" })),
            ));
        };

        decode_jwt(token).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid or expired token" })),
            )
        })
    }
}

fn get_jwt_secret() -> Result<String, String> {
    match env::var("JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => Ok(secret),
        _ if cfg!(debug_assertions) => Ok("secret".to_string()),
        _ => Err("JWT_SECRET environment variable must be set in production".to_string()),
    }
}

/// Startup check: fails when no secret is available for this build
pub fn ensure_secret_configured() -> Result<(), String> {
    get_jwt_secret().map(|_| ())
}

/// Issue a token for `user_id`. Used by the demo seed and by tests; real
/// tokens come from the identity provider.
pub fn create_jwt(user_id: &str, username: Option<&str>) -> Result<String, String> {
    let secret = get_jwt_secret()?;
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| "Token expiry out of range".to_string())?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        username: username.map(str::to_owned),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| e.to_string())
}

pub fn decode_jwt(token: &str) -> Result<Claims, String> {
    let secret = get_jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_to_same_subject() {
        let token = create_jwt("0b7c-user", Some("ada")).unwrap();
        let claims = decode_jwt(&token).unwrap();
        assert_eq!(claims.user_id(), "0b7c-user");
        assert_eq!(claims.default_username(), "ada");
    }

    #[test]
    fn default_username_falls_back_to_subject() {
        let claims = Claims {
            sub: "5f2a-91c3-d1e0".to_string(),
            username: None,
            exp: 0,
        };
        assert_eq!(claims.default_username(), "user_5f2a91c3");
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(decode_jwt("not-a-token").is_err());
    }
}
