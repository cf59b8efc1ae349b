use axum::extract::{Multipart, Path, State};
use axum::Json;
use common::types::MessageBody;
use serde::Deserialize;
use service::accounts::{self, ProfileUpdate, ProfileView, UserListItem};

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiResult};
use crate::state::ServerState;

pub async fn users(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<Vec<UserListItem>>> {
    Ok(Json(accounts::list_users(&state.db, &me).await?))
}

pub async fn my_profile(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<ProfileView>> {
    Ok(Json(accounts::my_profile(&state.db, &me).await?))
}

pub async fn user_profile(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(username): Path<String>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(accounts::user_profile(&state.db, &me, &username).await?))
}

pub async fn edit_profile(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<ProfileView>> {
    Ok(Json(accounts::edit_profile(&state.db, &me, update).await?))
}

/// Multipart upload; the file goes in the `profile_photo` field.
pub async fn upload_photo(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<Json<ProfileView>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Formulario inválido: {e}")))?
    {
        if field.name() != Some("profile_photo") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("foto.jpg").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Formulario inválido: {e}")))?;
        if bytes.is_empty() {
            break;
        }
        let view = accounts::store_profile_photo(&state.db, &state.cfg.media.dir, &me, &file_name, &bytes).await?;
        return Ok(Json(view));
    }
    Err(ApiError::bad_request("No se ha enviado ninguna foto (campo profile_photo)"))
}

pub async fn delete_account(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<MessageBody>> {
    Ok(Json(MessageBody::new(accounts::delete_account(&state.db, &me).await?)))
}

#[derive(Debug, Deserialize)]
pub struct FcmTokenInput {
    pub token: Option<String>,
}

pub async fn save_fcm_token(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<FcmTokenInput>,
) -> ApiResult<Json<MessageBody>> {
    accounts::save_fcm_token(&state.db, &me, input.token.as_deref()).await?;
    Ok(Json(MessageBody::new("Token FCM guardado correctamente.")))
}
