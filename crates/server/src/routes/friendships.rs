use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::types::MessageBody;
use serde::Deserialize;
use service::friendships::{self, FriendList, RequestList, StatusView};

use crate::auth::CurrentUser;
use crate::errors::ApiResult;
use crate::extract::{lenient_id, lenient_string};
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct UsernameInput {
    pub username: Option<String>,
}

pub async fn send_request(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<UsernameInput>,
) -> ApiResult<(StatusCode, Json<MessageBody>)> {
    let outcome = friendships::send_request(&state.db, &me, input.username.as_deref()).await?;
    let status = if outcome.created() { StatusCode::CREATED } else { StatusCode::OK };
    let target = input.username.unwrap_or_default();
    Ok((status, Json(MessageBody::new(outcome.message(target.trim())))))
}

pub async fn received(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<RequestList>> {
    Ok(Json(friendships::received_requests(&state.db, &me).await?))
}

pub async fn sent(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<RequestList>> {
    Ok(Json(friendships::sent_requests(&state.db, &me).await?))
}

#[derive(Debug, Deserialize)]
pub struct RespondInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub request: Option<i32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,
}

pub async fn respond(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<RespondInput>,
) -> ApiResult<Json<MessageBody>> {
    let msg = friendships::respond_request(&state.db, &me, input.request, input.action.as_deref()).await?;
    Ok(Json(MessageBody::new(msg)))
}

pub async fn friends(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<FriendList>> {
    Ok(Json(friendships::list_friends(&state.db, &me).await?))
}

pub async fn remove(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<UsernameInput>,
) -> ApiResult<Json<MessageBody>> {
    Ok(Json(MessageBody::new(friendships::remove_friend(&state.db, &me, input.username.as_deref()).await?)))
}

pub async fn block(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<UsernameInput>,
) -> ApiResult<Json<MessageBody>> {
    Ok(Json(MessageBody::new(friendships::block_user(&state.db, &me, input.username.as_deref()).await?)))
}

pub async fn unblock(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<UsernameInput>,
) -> ApiResult<Json<MessageBody>> {
    Ok(Json(MessageBody::new(friendships::unblock_user(&state.db, &me, input.username.as_deref()).await?)))
}

pub async fn status(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Query(q): Query<UsernameInput>,
) -> ApiResult<Json<StatusView>> {
    Ok(Json(friendships::relation_status(&state.db, &me, q.username.as_deref()).await?))
}
