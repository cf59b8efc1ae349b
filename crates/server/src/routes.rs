pub mod accounts;
pub mod auth;
pub mod calendar;
pub mod chats;
pub mod events;
pub mod friendships;
pub mod groups;
pub mod reviews;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use common::types::Health;

use crate::auth::{optional_auth, require_auth};
use crate::metrics;
use crate::openapi::ApiDoc;
use crate::state::ServerState;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

fn public_routes() -> Router<ServerState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/auth/google", post(auth::google))
        .route("/api/send-password-reset-email", post(auth::send_reset_email))
        .route("/api/reset-password/:uidb64/:token", post(auth::reset_password))
        .route("/events", get(events::list))
        .route("/events/rated", get(events::rated))
        .route("/events/search", get(events::search))
        .route("/events/:id", get(events::detail))
        .route("/service/events-all", get(events::service_all))
        .route("/service/events-search", get(events::service_search))
        .route("/api/calcular-ruta", post(events::route))
}

/// Readable anonymously; a valid token adds the caller's own reaction.
fn review_read_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/api/reviews/:event_id", get(reviews::list))
        .route("/api/reviews/:event_id/sorted", get(reviews::sorted))
        .route("/api/reviews/user-sorted/:username", get(reviews::by_user))
        .route("/api/reviews/:event_id/:username", get(reviews::single))
        .route_layer(middleware::from_fn_with_state(state.clone(), optional_auth))
}

fn protected_routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        // accounts
        .route("/api/users", get(accounts::users))
        .route("/api/ver-perfil", get(accounts::my_profile))
        .route("/api/ver-perfil/:username", get(accounts::user_profile))
        .route("/api/editar-perfil", put(accounts::edit_profile).patch(accounts::edit_profile))
        .route("/api/editar-perfil/foto", post(accounts::upload_photo))
        .route("/api/eliminar-cuenta", delete(accounts::delete_account))
        .route("/api/save-fcm-token", post(accounts::save_fcm_token))
        // friendships
        .route("/api/friendships/send-request", post(friendships::send_request))
        .route("/api/friendships/my-requests", get(friendships::received))
        .route("/api/friendships/my-sent-requests", get(friendships::sent))
        .route("/api/friendships/respond-request", post(friendships::respond))
        .route("/api/friendships/my-friends", get(friendships::friends))
        .route("/api/friendships/remove-friend", post(friendships::remove))
        .route("/api/friendships/block-user", post(friendships::block))
        .route("/api/friendships/unblock-user", post(friendships::unblock))
        .route("/api/friendships/status", get(friendships::status))
        // private chats
        .route("/api/chat/list", get(chats::list))
        .route("/api/chat/:id/messages", get(chats::messages))
        .route("/api/chat/send", post(chats::send))
        .route("/api/chat/create", post(chats::create))
        .route("/api/users/by-chats", get(chats::users_by_chats))
        // event chats
        .route("/api/event-chat/join", post(chats::join_event))
        .route("/api/event-chat/:chat_id/messages", get(chats::event_messages))
        .route("/api/event-chat/send", post(chats::send_event))
        .route("/api/event-chat/my-chats", get(chats::my_event_chats))
        // groups
        .route("/groups/create", post(groups::create))
        .route("/groups/join", post(groups::join))
        .route("/groups/search", get(groups::search))
        .route("/groups/:id/messages", get(groups::messages))
        .route("/groups/send", post(groups::send))
        .route("/groups/my-groups", get(groups::mine))
        .route("/groups/:id/requests", get(groups::requests))
        .route("/groups/handle-request", post(groups::handle_request))
        .route("/groups/invite", post(groups::invite))
        .route("/groups/my-invitations", get(groups::invitations))
        .route("/groups/respond-invitation", post(groups::respond_invitation))
        .route("/groups/leave", post(groups::leave))
        // reviews
        .route("/api/reviews/:event_id/crear", post(reviews::create))
        .route("/api/reviews/:event_id/borrar", delete(reviews::delete))
        .route("/api/reviews/:event_id/:username/like", post(reviews::react).delete(reviews::unreact))
        // calendar
        .route("/api/calendar/add-event", post(calendar::add))
        .route("/api/calendar/remove-event/:event_id", delete(calendar::remove))
        .route("/api/calendar/events", get(calendar::events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Build the full application router: public, optionally authenticated and
/// protected routes, plus docs, uploaded media and metrics.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let media = ServeDir::new(&state.cfg.media.dir);
    public_routes()
        .merge(review_read_routes(&state))
        .merge(protected_routes(&state))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest_service("/media", media)
        .route_layer(middleware::from_fn_with_state(state.clone(), metrics::track))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
