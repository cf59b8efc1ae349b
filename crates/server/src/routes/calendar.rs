use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use service::calendar::{self, CalendarAdd, CalendarEvents, CalendarRemove};

use crate::auth::CurrentUser;
use crate::errors::ApiResult;
use crate::extract::lenient_id;
use crate::state::ServerState;

#[derive(Debug, Deserialize)]
pub struct AddInput {
    #[serde(default, deserialize_with = "lenient_id")]
    pub event_id: Option<i32>,
}

pub async fn add(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Json(input): Json<AddInput>,
) -> ApiResult<(StatusCode, Json<CalendarAdd>)> {
    let added = calendar::add_event(&state.db, &me, input.event_id).await?;
    let status = if added.added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(added)))
}

pub async fn remove(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<CalendarRemove>> {
    Ok(Json(calendar::remove_event(&state.db, &me, event_id).await?))
}

pub async fn events(State(state): State<ServerState>, CurrentUser(me): CurrentUser) -> ApiResult<Json<CalendarEvents>> {
    Ok(Json(calendar::list_events(&state.db, &me).await?))
}
