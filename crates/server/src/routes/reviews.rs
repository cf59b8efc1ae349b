use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service::reviews::{self, ReactionSummary, ReviewListing, ReviewView};

use crate::auth::{CurrentUser, Viewer};
use crate::errors::ApiResult;
use crate::state::ServerState;

/// Review endpoints answer with `mensaje` rather than `message`.
#[derive(Debug, Serialize)]
pub struct Mensaje {
    pub mensaje: String,
}

pub async fn list(State(state): State<ServerState>, viewer: Viewer, Path(event_id): Path<i32>) -> ApiResult<Json<ReviewListing>> {
    Ok(Json(reviews::list_reviews(&state.db, event_id, viewer.as_deref()).await?))
}

pub async fn sorted(State(state): State<ServerState>, viewer: Viewer, Path(event_id): Path<i32>) -> ApiResult<Json<ReviewListing>> {
    Ok(Json(reviews::sorted_reviews(&state.db, event_id, viewer.as_deref()).await?))
}

pub async fn by_user(State(state): State<ServerState>, viewer: Viewer, Path(username): Path<String>) -> ApiResult<Json<ReviewListing>> {
    Ok(Json(reviews::user_sorted_reviews(&state.db, &username, viewer.as_deref()).await?))
}

pub async fn single(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path((event_id, username)): Path<(i32, String)>,
) -> ApiResult<Json<ReviewView>> {
    Ok(Json(reviews::single_review(&state.db, event_id, &username, viewer.as_deref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateInput {
    pub rating: Option<Value>,
    pub text: Option<String>,
}

pub async fn create(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(event_id): Path<i32>,
    Json(input): Json<CreateInput>,
) -> ApiResult<(StatusCode, Json<ReviewView>)> {
    let view = reviews::create_review(&state.db, &me, event_id, input.rating.as_ref(), input.text).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn delete(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<Mensaje>> {
    let mensaje = reviews::delete_review(&state.db, &me, event_id).await?;
    Ok(Json(Mensaje { mensaje }))
}

#[derive(Debug, Deserialize)]
pub struct ReactInput {
    pub is_like: Option<Value>,
}

pub async fn react(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path((event_id, author)): Path<(i32, String)>,
    Json(input): Json<ReactInput>,
) -> ApiResult<Json<ReactionSummary>> {
    let summary =
        reviews::react(&state.db, state.notifier.as_ref(), &me, event_id, &author, input.is_like.as_ref()).await?;
    Ok(Json(summary))
}

pub async fn unreact(
    State(state): State<ServerState>,
    CurrentUser(me): CurrentUser,
    Path((event_id, author)): Path<(i32, String)>,
) -> ApiResult<Json<ReactionSummary>> {
    Ok(Json(reviews::remove_reaction(&state.db, &me, event_id, &author).await?))
}
