use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use service::accounts::send_password_reset_email;
use service::auth::domain::{AuthSession, LoginInput, RegisterInput};
use uuid::Uuid;

use common::types::MessageBody;

use crate::auth::AUTH_COOKIE;
use crate::errors::{ApiError, ApiResult};
use crate::state::ServerState;

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TokenOutput {
    pub message: String,
    pub token: String,
}

fn session_cookie(jar: CookieJar, session: &AuthSession) -> CookieJar {
    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    jar.add(cookie)
}

#[utoipa::path(post, path = "/api/register", tag = "auth", request_body = crate::openapi::RegisterRequest,
    responses((status = 201, description = "Registered", body = TokenOutput), (status = 400, description = "Bad Request")))]
pub async fn register(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<RegisterInput>,
) -> ApiResult<(StatusCode, CookieJar, Json<TokenOutput>)> {
    let session = state.auth.register(input).await?;
    let jar = session_cookie(jar, &session);
    Ok((StatusCode::CREATED, jar, Json(TokenOutput { message: "Registro completado".into(), token: session.token })))
}

#[utoipa::path(post, path = "/api/login", tag = "auth", request_body = crate::openapi::LoginRequest,
    responses((status = 200, description = "Logged in", body = TokenOutput), (status = 400, description = "Bad credentials")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> ApiResult<(CookieJar, Json<TokenOutput>)> {
    let session = state.auth.login(input).await?;
    let jar = session_cookie(jar, &session);
    Ok((jar, Json(TokenOutput { message: "Login exitoso".into(), token: session.token })))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(AUTH_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GoogleInput {
    pub id_token: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct GoogleOutput {
    pub token: String,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub created: bool,
}

#[utoipa::path(post, path = "/api/auth/google", tag = "auth", request_body = GoogleInput,
    responses((status = 200, description = "Signed in", body = GoogleOutput), (status = 401, description = "Invalid ID token")))]
pub async fn google(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<GoogleInput>,
) -> ApiResult<(CookieJar, Json<GoogleOutput>)> {
    let id_token = input
        .id_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No se proporcionó el token de Google"))?;
    let identity = state.verifier.verify(&id_token).await?;
    let signed = state.auth.google_sign_in(identity).await?;
    let jar = session_cookie(jar, &signed.session);
    let user = signed.session.user;
    Ok((
        jar,
        Json(GoogleOutput {
            token: signed.session.token,
            user_id: user.id,
            username: user.username,
            email: user.email,
            created: signed.created,
        }),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ResetEmailInput {
    pub email: Option<String>,
}

pub async fn send_reset_email(
    State(state): State<ServerState>,
    Json(input): Json<ResetEmailInput>,
) -> ApiResult<Json<MessageBody>> {
    send_password_reset_email(
        state.auth.as_ref(),
        state.mailer.as_ref(),
        &state.cfg.mail.from,
        input.email.as_deref(),
        &state.cfg.auth.frontend_base_url,
    )
    .await?;
    Ok(Json(MessageBody::new("Se ha enviado un correo con el enlace para restablecer la contraseña")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordInput {
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: String,
}

pub async fn reset_password(
    State(state): State<ServerState>,
    Path((uidb64, token)): Path<(String, String)>,
    Json(input): Json<ResetPasswordInput>,
) -> ApiResult<Json<MessageBody>> {
    state
        .auth
        .reset_password(&uidb64, &token, &input.new_password, &input.confirm_password)
        .await?;
    Ok(Json(MessageBody::new("Contraseña restablecida correctamente")))
}
