//! Connect-time authentication seam. Token issuance lives in the external
//! account service; this side only verifies the bearer credential and turns
//! it into a user identity.

use axum::extract::FromRequestParts;
use axum::http::{StatusCode, header, request::Parts};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::protocol::WireError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Verify a bearer token and return the user email it names.
pub fn verify_token(token: &str, secret: &str) -> Result<String, WireError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .map_err(|_| WireError::Unauthorized)
}

/// Extractor for REST handlers: the authenticated user's email, taken from
/// the `Authorization: Bearer` header.
pub struct AuthUser(pub String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));

        match token.and_then(|t| verify_token(t, &state.settings.secret_key).ok()) {
            Some(email) => Ok(AuthUser(email)),
            None => Err((StatusCode::UNAUTHORIZED, "missing or invalid bearer token")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn issue(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_owned(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_round_trips_the_identity() {
        let token = issue("a@x.io", "sekrit");
        assert_eq!(verify_token(&token, "sekrit").unwrap(), "a@x.io");
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue("a@x.io", "sekrit");
        assert!(matches!(
            verify_token(&token, "other"),
            Err(WireError::Unauthorized)
        ));
        assert!(matches!(
            verify_token("not-a-token", "sekrit"),
            Err(WireError::Unauthorized)
        ));
    }
}
