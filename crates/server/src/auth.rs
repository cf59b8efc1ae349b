use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum::async_trait;
use axum_extra::extract::cookie::CookieJar;
use service::accounts;
use service::auth::token::verify_access_token;

use crate::errors::ApiError;
use crate::state::ServerState;

pub const AUTH_COOKIE: &str = "auth_token";

/// Username of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("No se han proporcionado credenciales de autenticación"))
    }
}

/// Username of the caller when a valid token came with the request.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Viewer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<CurrentUser>().map(|u| u.0.clone())))
    }
}

impl Viewer {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[derive(Debug, PartialEq)]
enum TokenSource {
    Missing,
    Malformed,
    Found(String),
}

/// `Authorization: Bearer <token>`, falling back to the `auth_token` cookie.
fn token_from_headers(headers: &HeaderMap) -> TokenSource {
    if let Some(h) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => TokenSource::Found(t.trim().to_string()),
            _ => TokenSource::Malformed,
        };
    }
    match CookieJar::from_headers(headers).get(AUTH_COOKIE) {
        Some(c) if !c.value().is_empty() => TokenSource::Found(c.value().to_string()),
        _ => TokenSource::Missing,
    }
}

/// Reject requests without a valid access token; the username is stored
/// for the [`CurrentUser`] extractor.
pub async fn require_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();
    let token = match token_from_headers(req.headers()) {
        TokenSource::Found(t) => t,
        TokenSource::Malformed => {
            tracing::warn!(%path, "invalid Authorization format (expect Bearer)");
            return Err(ApiError::unauthorized("Formato de Authorization inválido"));
        }
        TokenSource::Missing => {
            tracing::warn!(%path, "missing Authorization header and auth_token cookie");
            return Err(ApiError::unauthorized("No se han proporcionado credenciales de autenticación"));
        }
    };
    let claims = match verify_access_token(state.jwt_secret(), &token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!(%path, err = %e, "token validation failed");
            return Err(ApiError::unauthorized("Token inválido o expirado"));
        }
    };
    if !accounts::session_is_live(&state.db, claims.uid, &claims.sub).await? {
        tracing::warn!(%path, user = %claims.sub, "token belongs to a deleted account");
        return Err(ApiError::unauthorized("Token inválido o expirado"));
    }
    req.extensions_mut().insert(CurrentUser(claims.sub));
    Ok(next.run(req).await)
}

/// Like [`require_auth`] but lets anonymous callers through.
pub async fn optional_auth(State(state): State<ServerState>, mut req: Request, next: Next) -> Response {
    if let TokenSource::Found(token) = token_from_headers(req.headers()) {
        if let Ok(claims) = verify_access_token(state.jwt_secret(), &token) {
            if matches!(accounts::session_is_live(&state.db, claims.uid, &claims.sub).await, Ok(true)) {
                req.extensions_mut().insert(CurrentUser(claims.sub));
            }
        }
    }
    next.run(req).await
}
