//! HS256 tokens: bearer access tokens and single-purpose password-reset tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::domain::AuthUser;
use super::errors::AuthError;

const ACCESS: &str = "access";
const RESET: &str = "reset";

/// Claims of a bearer token; `sub` is the username.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessClaims {
    pub sub: String,
    pub uid: Uuid,
    pub typ: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResetClaims {
    uid: Uuid,
    typ: String,
    /// Password-change stamp (microseconds) at issue time.
    pwd: i64,
    exp: i64,
}

fn validation() -> Validation {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.leeway = 0;
    v
}

pub fn issue_access_token(secret: &str, user: &AuthUser, ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = AccessClaims {
        sub: user.username.clone(),
        uid: user.id,
        typ: ACCESS.into(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Decode and check signature, expiry and token type.
pub fn verify_access_token(secret: &str, token: &str) -> Result<AccessClaims, AuthError> {
    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation())
        .map_err(|_| AuthError::Unauthorized)?;
    if data.claims.typ != ACCESS {
        return Err(AuthError::Unauthorized);
    }
    Ok(data.claims)
}

pub fn issue_reset_token(secret: &str, user_id: Uuid, password_changed_at: DateTime<Utc>, ttl: Duration) -> Result<String, AuthError> {
    let claims = ResetClaims {
        uid: user_id,
        typ: RESET.into(),
        pwd: password_changed_at.timestamp_micros(),
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Valid only for `user_id` and only while the password is unchanged.
pub fn verify_reset_token(secret: &str, token: &str, user_id: Uuid, password_changed_at: DateTime<Utc>) -> bool {
    match decode::<ResetClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation()) {
        Ok(data) => {
            data.claims.typ == RESET
                && data.claims.uid == user_id
                && data.claims.pwd == password_changed_at.timestamp_micros()
        }
        Err(_) => false,
    }
}

pub fn encode_uid(id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

pub fn decode_uid(uidb64: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64.trim_end_matches('=')).ok()?;
    let s = String::from_utf8(bytes).ok()?;
    Uuid::parse_str(&s).ok()
}
