//! Request identity.
//!
//! Identity comes from an optional `Bearer` JWT (HS256, `sub` = user id).
//! Token issuance is an external concern; only verification happens here, and
//! an absent or invalid token degrades the request to anonymous rather than
//! rejecting it. Endpoints that need an account use [`RequireUser`].

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use obscura_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;

pub use obscura_core::models::Owner;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
}

/// Resolve the requesting identity from the Authorization header.
pub fn resolve_owner(headers: &HeaderMap, jwt_secret: &str) -> Owner {
    let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    else {
        return Owner::Anonymous;
    };

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    ) {
        Ok(data) => Owner::User(data.claims.sub),
        Err(e) => {
            tracing::debug!(error = %e, "Invalid bearer token, treating request as anonymous");
            Owner::Anonymous
        }
    }
}

/// Optional identity: `Owner::Anonymous` when no valid token is present.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Owner);

impl FromRequestParts<AppState> for Identity {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Identity(resolve_owner(
            &parts.headers,
            &state.config.jwt_secret,
        )))
    }
}

/// Mandatory identity: rejects anonymous requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Uuid);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_owner(&parts.headers, &state.config.jwt_secret) {
            Owner::User(id) => Ok(RequireUser(id)),
            Owner::Anonymous => Err(HttpAppError(AppError::Unauthorized(
                "Authentication required".into(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        );
        headers
    }

    fn token_for(sub: Uuid, exp_offset_secs: i64, secret: &str) -> String {
        let claims = Claims {
            sub,
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_resolves_user() {
        let user_id = Uuid::new_v4();
        let headers = bearer(&token_for(user_id, 600, SECRET));
        assert_eq!(resolve_owner(&headers, SECRET), Owner::User(user_id));
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert!(resolve_owner(&HeaderMap::new(), SECRET).is_anonymous());
    }

    #[test]
    fn test_bad_signature_is_anonymous() {
        let headers = bearer(&token_for(Uuid::new_v4(), 600, "other-secret"));
        assert!(resolve_owner(&headers, SECRET).is_anonymous());
    }

    #[test]
    fn test_expired_token_is_anonymous() {
        let headers = bearer(&token_for(Uuid::new_v4(), -600, SECRET));
        assert!(resolve_owner(&headers, SECRET).is_anonymous());
    }
}
