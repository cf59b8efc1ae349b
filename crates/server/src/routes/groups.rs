use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use common::types::MessageBody;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::groups::{
    self, CreatedGroup, GroupMessageSent, GroupMessages, GroupReply, GroupRequests, GroupSearch, JoinOutcome,
    MyGroups, MyInvitations,
};

use crate::auth::CurrentUser;
use crate::errors::ApiResult;
use crate::extract::{lenient_id, lenient_string};
use crate::state::ServerState;

fn status_for(created: bool) -> StatusCode {
    if created { StatusCode::CREATED } else { StatusCode::OK }
}

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub name: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateOutput {
    pub message: String,
    pub group: CreatedGroup,
}

pub async fn create(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<CreateInput>,
) -> ApiResult<(StatusCode, Json<CreateOutput>)> {
    let group = groups::create_group(&state.db, &me, input.name.as_deref(), input.photo).await?;
    let message = format!("Grupo \"{}\" creado con éxito", group.name);
    Ok((StatusCode::CREATED, Json(CreateOutput { message, group })))
}

#[derive(Debug, Deserialize)]
pub struct GroupIdInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub group_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct JoinOutput {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i32>,
}

impl From<&JoinOutcome> for JoinOutput {
    fn from(o: &JoinOutcome) -> Self {
        let (group_id, chat_id) = match o {
            JoinOutcome::Joined { group_id, chat_id, .. } => (Some(*group_id), Some(*chat_id)),
            JoinOutcome::Requested { group_id, .. } => (Some(*group_id), None),
            _ => (None, None),
        };
        Self { message: o.message(), group_id, chat_id }
    }
}

pub async fn join(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<GroupIdInput>,
) -> ApiResult<(StatusCode, Json<JoinOutput>)> {
    let outcome = groups::join_group(&state.db, &me, input.group_id).await?;
    Ok((status_for(outcome.created()), Json(JoinOutput::from(&outcome))))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

pub async fn search(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Query(q): Query<SearchParams>,
) -> ApiResult<Json<GroupSearch>> {
    Ok(Json(groups::search_groups(&state.db, &me, q.query.as_deref()).await?))
}

pub async fn messages(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(group_id): Path<i32>,
) -> ApiResult<Json<GroupMessages>> {
    Ok(Json(groups::group_messages(&state.db, &me, group_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SendInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub group_id: Option<i32>,
    pub message: Option<String>,
    pub is_foreground: Option<Value>,
}

pub async fn send(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<SendInput>,
) -> ApiResult<(StatusCode, Json<GroupMessageSent>)> {
    let foreground = input.is_foreground.as_ref().and_then(common::types::flag).unwrap_or(false);
    let sent = groups::send_group_message(
        &state.db,
        state.notifier.as_ref(),
        &me,
        input.group_id,
        input.message.as_deref(),
        foreground,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(sent)))
}

pub async fn mine(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<MyGroups>> {
    Ok(Json(groups::my_groups(&state.db, &me).await?))
}

pub async fn requests(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(group_id): Path<i32>,
) -> ApiResult<Json<GroupRequests>> {
    Ok(Json(groups::group_requests(&state.db, &me, group_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct HandleInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub request_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,
}

pub async fn handle_request(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<HandleInput>,
) -> ApiResult<Json<GroupReply>> {
    Ok(Json(groups::handle_request(&state.db, &me, input.request_id, input.action.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct InviteInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub group_id: Option<i32>,
    pub username: Option<String>,
}

pub async fn invite(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<InviteInput>,
) -> ApiResult<(StatusCode, Json<GroupReply>)> {
    let (reply, created) =
        groups::invite(&state.db, state.notifier.as_ref(), &me, input.group_id, input.username.as_deref()).await?;
    Ok((status_for(created), Json(reply)))
}

pub async fn invitations(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<MyInvitations>> {
    Ok(Json(groups::my_invitations(&state.db, &me).await?))
}

#[derive(Debug, Deserialize)]
pub struct RespondInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub invitation_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub action: Option<String>,
}

pub async fn respond_invitation(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<RespondInput>,
) -> ApiResult<Json<GroupReply>> {
    Ok(Json(groups::respond_invitation(&state.db, &me, input.invitation_id, input.action.as_deref()).await?))
}

pub async fn leave(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<GroupIdInput>,
) -> ApiResult<Json<MessageBody>> {
    Ok(Json(MessageBody::new(groups::leave_group(&state.db, &me, input.group_id).await?)))
}
