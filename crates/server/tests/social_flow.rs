use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use migration::MigratorTrait;
use models::kinds::ChatKind;
use models::{chat, event, place};
use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};
use serde_json::{json, Value};
use service::notifications::MockNotifier;
use tower::ServiceExt;
use uuid::Uuid;

use server::routes;
use server::state::ServerState;

struct TestApp {
    router: Router,
    db: DatabaseConnection,
    notifier: Arc<MockNotifier>,
}

async fn build_app() -> anyhow::Result<TestApp> {
    let db = models::db::connect().await?;
    if let Err(e) = migration::Migrator::up(&db, None).await {
        let msg = e.to_string();
        if !(msg.contains("already exists") || msg.contains("duplicate key")) {
            return Err(e.into());
        }
    }
    let mut cfg = configs::AppConfig::default();
    cfg.auth.jwt_secret = "test-secret-at-least-16".into();
    let notifier = Arc::new(MockNotifier::default());
    let state = ServerState::builder(db.clone(), cfg).notifier(notifier.clone()).build()?;
    let router = routes::build_router(state, tower_http::cors::CorsLayer::very_permissive());
    Ok(TestApp { router, db, notifier })
}

impl TestApp {
    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> anyhow::Result<(StatusCode, Value)> {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req.header("content-type", "application/json").body(Body::from(serde_json::to_vec(&b)?))?,
            None => req.body(Body::empty())?,
        };
        let resp = self.router.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
    }

    /// Register a fresh user; returns (username, token).
    async fn user(&self, prefix: &str) -> anyhow::Result<(String, String)> {
        let username = format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..10]);
        let (status, body) = self
            .call(Method::POST, "/api/register", None, Some(json!({
                "username": username, "email": format!("{username}@example.com"),
                "password": "Passw0rd!", "confirm_password": "Passw0rd!"
            })))
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        Ok((username, body["token"].as_str().unwrap_or_default().to_string()))
    }

    async fn event(&self, name: &str, day: NaiveDate) -> anyhow::Result<event::Model> {
        let p = place::create(&self.db, &format!("{name} street"), 41.3874, 2.1686, Some("08002".into())).await?;
        let c = chat::create(&self.db, ChatKind::EventChat).await?;
        let am = event::ActiveModel {
            id: NotSet,
            ini_date: Set(day),
            end_date: Set(day),
            name: Set(name.to_string()),
            description: Set(Some("Concert a la plaça".into())),
            tickets: Set(None),
            schedule: Set(None),
            link: Set(None),
            email: Set(None),
            telefon: Set(None),
            place_id: Set(p.id),
            chat_id: Set(Some(c.id)),
            image_path: Set(None),
            code_event: Set((Uuid::new_v4().as_u128() % 1_000_000_000_000) as i64),
        };
        Ok(am.insert(&self.db).await?)
    }
}

#[tokio::test]
async fn test_friendship_then_private_chat() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;
    let (anna, anna_tok) = app.user("anna").await?;
    let (pau, pau_tok) = app.user("pau").await?;
    // device token so the private message push has a target
    let (status, _) = app.call(Method::POST, "/api/save-fcm-token", Some(&pau_tok), Some(json!({"token": "pau-device"}))).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::POST, "/api/friendships/send-request", Some(&anna_tok), Some(json!({"username": pau})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (_, received) = app.call(Method::GET, "/api/friendships/my-requests", Some(&pau_tok), None).await?;
    let request_id = received["requests"][0]["id"].clone();
    assert_eq!(received["requests"][0]["username"], anna.as_str());

    let (status, _) = app
        .call(Method::POST, "/api/friendships/respond-request", Some(&pau_tok), Some(json!({"request": request_id, "action": "dance"})))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .call(Method::POST, "/api/friendships/respond-request", Some(&pau_tok), Some(json!({"request": request_id, "action": "accept"})))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, st) = app.call(Method::GET, &format!("/api/friendships/status?username={pau}"), Some(&anna_tok), None).await?;
    assert_eq!(st["status"], "friends");

    // a friend without a chat yet is listed with a null id
    let (_, chats) = app.call(Method::GET, "/api/chat/list", Some(&anna_tok), None).await?;
    assert_eq!(chats[0]["username"], pau.as_str());
    assert!(chats[0]["id"].is_null());

    let (_, profile) = app.call(Method::GET, "/api/users", Some(&anna_tok), None).await?;
    let pau_id = profile
        .as_array()
        .and_then(|us| us.iter().find(|u| u["username"] == pau.as_str()))
        .map(|u| u["id"].clone())
        .unwrap_or(Value::Null);

    let (status, created) = app.call(Method::POST, "/api/chat/create", Some(&anna_tok), Some(json!({"to_user_id": pau_id}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let chat_id = created["chat_id"].clone();
    let (status, again) = app.call(Method::POST, "/api/chat/create", Some(&anna_tok), Some(json!({"to_user_id": pau_id}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["exists"], true);

    let (status, _) = app
        .call(Method::POST, "/api/chat/send", Some(&anna_tok), Some(json!({"chat_id": chat_id, "message": "Hola!"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let pushes = app.notifier.sent_of_type("new_message");
    assert!(pushes.iter().any(|p| p.token == "pau-device" && p.title.is_some()));

    let (status, msgs) = app.call(Method::GET, &format!("/api/chat/{chat_id}/messages"), Some(&pau_tok), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(msgs[0]["senderUsername"], anna.as_str());
    assert_eq!(msgs[0]["message"], "Hola!");

    // blocking removes the friendship and hides the chat partner's profile
    let (status, _) = app.call(Method::POST, "/api/friendships/block-user", Some(&pau_tok), Some(json!({"username": anna}))).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::GET, &format!("/api/ver-perfil/{pau}"), Some(&anna_tok), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .call(Method::POST, "/api/friendships/send-request", Some(&anna_tok), Some(json!({"username": pau})))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn test_group_join_request_is_handled_by_creator() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;
    let (_, owner_tok) = app.user("marta").await?;
    let (joiner, joiner_tok) = app.user("joan").await?;

    let (status, created) = app.call(Method::POST, "/groups/create", Some(&owner_tok), Some(json!({"name": "Club de lectura"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["group"]["id"].clone();

    let (status, _) = app.call(Method::POST, "/groups/join", Some(&joiner_tok), Some(json!({"group_id": group_id}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app.call(Method::POST, "/groups/join", Some(&joiner_tok), Some(json!({"group_id": group_id}))).await?;
    assert_eq!(status, StatusCode::OK);

    // only managers see the queue
    let (status, _) = app.call(Method::GET, &format!("/groups/{group_id}/requests"), Some(&joiner_tok), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, queue) = app.call(Method::GET, &format!("/groups/{group_id}/requests"), Some(&owner_tok), None).await?;
    assert_eq!(queue["requests"][0]["username"], joiner.as_str());
    let request_id = queue["requests"][0]["id"].clone();

    let (status, _) = app
        .call(Method::POST, "/groups/handle-request", Some(&owner_tok), Some(json!({"request_id": request_id, "action": "accept"})))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::POST, "/groups/send", Some(&joiner_tok), Some(json!({"group_id": group_id, "message": "Bon dia"})))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (_, msgs) = app.call(Method::GET, &format!("/groups/{group_id}/messages"), Some(&owner_tok), None).await?;
    assert_eq!(msgs["messages"][0]["message"], "Bon dia");

    let (_, mine) = app.call(Method::GET, "/groups/my-groups", Some(&joiner_tok), None).await?;
    assert_eq!(mine["groups"][0]["name"], "Club de lectura");
    Ok(())
}

#[tokio::test]
async fn test_reviews_and_calendar() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;
    let (author, author_tok) = app.user("critic").await?;
    let (_, fan_tok) = app.user("fan").await?;
    let day = NaiveDate::from_ymd_opt(2026, 5, 12).unwrap_or_default();
    let ev = app.event("Primavera Sound", day).await?;

    let (_, empty) = app.call(Method::GET, &format!("/api/reviews/{}", ev.id), None, None).await?;
    assert_eq!(empty["mensaje"], "No hay reseñas para este evento");

    let crear = format!("/api/reviews/{}/crear", ev.id);
    let (status, _) = app.call(Method::POST, &crear, Some(&author_tok), Some(json!({"rating": 9}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call(Method::POST, &crear, Some(&author_tok), Some(json!({"rating": 4, "text": "Molt bé"}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, dup) = app.call(Method::POST, &crear, Some(&author_tok), Some(json!({"rating": 5}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(dup["error"], "Ya has publicado una review en este evento.");

    let like = format!("/api/reviews/{}/{}/like", ev.id, author);
    let (status, summary) = app.call(Method::POST, &like, Some(&fan_tok), Some(json!({"is_like": "true"}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["likes_count"], 1);

    // an anonymous reader sees the tally, the fan also sees their own reaction
    let single = format!("/api/reviews/{}/{}", ev.id, author);
    let (_, anon) = app.call(Method::GET, &single, None, None).await?;
    assert!(anon["user_liked"].is_null());
    let (_, seen) = app.call(Method::GET, &single, Some(&fan_tok), None).await?;
    assert_eq!(seen["user_liked"], true);

    let (status, _) = app.call(Method::DELETE, &like, Some(&fan_tok), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call(Method::DELETE, &like, Some(&fan_tok), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = app.call(Method::GET, &format!("/events/{}", ev.id), None, None).await?;
    assert_eq!(detail["average_rate"], 4.0);

    // calendar
    let (status, _) = app.call(Method::GET, "/api/calendar/events", Some(&fan_tok), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, added) = app.call(Method::POST, "/api/calendar/add-event", Some(&fan_tok), Some(json!({"event_id": ev.id}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["calendar_created"], true);
    let (status, _) = app.call(Method::POST, "/api/calendar/add-event", Some(&fan_tok), Some(json!({"event_id": ev.id.to_string()}))).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, listed) = app.call(Method::GET, "/api/calendar/events", Some(&fan_tok), None).await?;
    assert_eq!(listed["events"][0]["id"], ev.id);
    let (status, _) = app
        .call(Method::DELETE, &format!("/api/calendar/remove-event/{}", ev.id), Some(&fan_tok), None)
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_event_search_validation() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app().await?;
    let (status, _) = app.call(Method::GET, "/events/search", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call(Method::GET, "/events/search?latitude=41.38", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.call(Method::GET, "/events/search?latitude=95&longitude=2.1", None, None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.call(Method::GET, "/events/search?query=zzzz-no-such-event-zzzz", None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    let (status, _) = app.call(Method::POST, "/api/calcular-ruta", None, Some(json!({"originLat": 41.3}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
