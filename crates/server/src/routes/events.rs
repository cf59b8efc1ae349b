use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use service::events::{
    self, EventDetail, EventSummary, RatedEvent, SearchHit, SearchPage, SearchQuery, ServiceEvent, ServiceSearchQuery,
};
use service::pagination::PageQuery;
use service::route_planner::RouteRequest;

use crate::errors::ApiResult;
use crate::state::ServerState;

#[derive(Debug, Serialize)]
pub struct EventList<T> {
    pub events: Vec<T>,
}

#[utoipa::path(get, path = "/events", tag = "events",
    params(("page" = Option<u32>, Query, description = "1-based page"), ("per_page" = Option<u32>, Query, description = "page size, at most 200")),
    responses((status = 200, description = "Events with their place")))]
pub async fn list(State(state): State<ServerState>, Query(page): Query<PageQuery>) -> ApiResult<Json<EventList<EventSummary>>> {
    let events = events::list_events(&state.db, page.pagination()).await?;
    Ok(Json(EventList { events }))
}

#[utoipa::path(get, path = "/events/{id}", tag = "events",
    params(("id" = i32, Path, description = "event id")),
    responses((status = 200, description = "Full event record"), (status = 404, description = "Event does not exist")))]
pub async fn detail(State(state): State<ServerState>, Path(id): Path<i32>) -> ApiResult<Json<EventDetail>> {
    Ok(Json(events::event_detail(&state.db, id).await?))
}

pub async fn rated(State(state): State<ServerState>) -> ApiResult<Json<Vec<RatedEvent>>> {
    Ok(Json(events::events_by_rating(&state.db).await?))
}

#[utoipa::path(get, path = "/events/search", tag = "events",
    params(
        ("latitude" = Option<f64>, Query, description = "origin latitude"),
        ("longitude" = Option<f64>, Query, description = "origin longitude"),
        ("query" = Option<String>, Query, description = "case-insensitive name substring"),
        ("max_distance" = Option<f64>, Query, description = "kilometres from the origin"),
        ("category" = Option<String>, Query, description = "comma separated categories"),
        ("start_date" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "YYYY-MM-DD"),
        ("exact_date" = Option<String>, Query, description = "YYYY-MM-DD"),
    ),
    responses((status = 200, description = "Matching events"), (status = 400, description = "Invalid filters")))]
pub async fn search(State(state): State<ServerState>, Query(q): Query<SearchQuery>) -> ApiResult<Json<SearchPage<SearchHit>>> {
    let filter = q.parse()?;
    Ok(Json(events::search_events(&state.db, &filter).await?.into()))
}

pub async fn service_all(State(state): State<ServerState>) -> ApiResult<Json<EventList<ServiceEvent>>> {
    let events = events::events_all_service(&state.db).await?;
    Ok(Json(EventList { events }))
}

pub async fn service_search(
    State(state): State<ServerState>,
    Query(q): Query<ServiceSearchQuery>,
) -> ApiResult<Json<SearchPage<ServiceEvent>>> {
    Ok(Json(events::search_events_service(&state.db, &q).await?.into()))
}

pub async fn route(State(state): State<ServerState>, Json(req): Json<RouteRequest>) -> ApiResult<Json<Value>> {
    req.validate()?;
    Ok(Json(state.routes.plan(&req).await?))
}
