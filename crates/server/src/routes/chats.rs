use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use service::chats::event::{self as event_chat, EventMessages, JoinedEventChat, MyEventChats};
use service::chats::private::{self, ChatListItem, CreatedChat, UserChatItem};
use service::chats::MessageView;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::{ApiError, ApiResult};
use crate::extract::lenient_id;
use crate::state::ServerState;

pub async fn list(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<Vec<ChatListItem>>> {
    Ok(Json(private::list_chats(&state.db, &me).await?))
}

pub async fn messages(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(chat_id): Path<i32>,
) -> ApiResult<Json<Vec<MessageView>>> {
    Ok(Json(private::chat_messages(&state.db, &me, chat_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SendInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub chat_id: Option<i32>,
    pub message: Option<String>,
    pub is_foreground: Option<Value>,
}

pub async fn send(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<SendInput>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let foreground = input.is_foreground.as_ref().and_then(common::types::flag).unwrap_or(false);
    let view = private::send_message(
        &state.db,
        state.notifier.as_ref(),
        &me,
        input.chat_id,
        input.message.as_deref(),
        foreground,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub to_user_id: Option<String>,
}

pub async fn create(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<CreateInput>,
) -> ApiResult<(StatusCode, Json<CreatedChat>)> {
    let to = match input.to_user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| ApiError::bad_request("to_user_id inválido"))?),
        None => None,
    };
    let created = private::create_chat(&state.db, &me, to).await?;
    let status = if created.exists { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(created)))
}

pub async fn users_by_chats(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<Vec<UserChatItem>>> {
    Ok(Json(private::users_by_chats(&state.db, &me, Utc::now()).await?))
}

#[derive(Debug, Deserialize)]
pub struct JoinEventInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub event_id: Option<i32>,
}

pub async fn join_event(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<JoinEventInput>,
) -> ApiResult<Json<JoinedEventChat>> {
    Ok(Json(event_chat::join(&state.db, &me, input.event_id).await?))
}

pub async fn event_messages(State(state): State<ServerState>, Path(chat_id): Path<i32>) -> ApiResult<Json<EventMessages>> {
    Ok(Json(event_chat::messages(&state.db, chat_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct EventSendInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub chat_id: Option<i32>,
    pub message: Option<String>,
}

pub async fn send_event(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<EventSendInput>,
) -> ApiResult<(StatusCode, Json<MessageView>)> {
    let view = event_chat::send(&state.db, &me, input.chat_id, input.message.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn my_event_chats(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<MyEventChats>> {
    Ok(Json(event_chat::my_chats(&state.db, &me).await?))
}
