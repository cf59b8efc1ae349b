use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use migration::MigratorTrait;
use serde_json::{json, Value};
use service::auth::google::mock::MockVerifier;
use service::mail::MemoryMailer;
use tower::ServiceExt;
use uuid::Uuid;

use server::routes;
use server::state::ServerState;

fn cors() -> tower_http::cors::CorsLayer { tower_http::cors::CorsLayer::very_permissive() }

fn test_config() -> configs::AppConfig {
    let mut cfg = configs::AppConfig::default();
    cfg.auth.jwt_secret = "test-secret-at-least-16".into();
    cfg.auth.frontend_base_url = "http://front.test".into();
    cfg.media.dir = std::env::temp_dir().join("cultucat-test-media").to_string_lossy().to_string();
    cfg
}

async fn build_app(mailer: Arc<MemoryMailer>, verifier: MockVerifier) -> anyhow::Result<Router> {
    let db = models::db::connect().await?;
    // concurrent test binaries may race on the first migration run
    if let Err(e) = migration::Migrator::up(&db, None).await {
        let msg = e.to_string();
        if !(msg.contains("already exists") || msg.contains("duplicate key")) {
            return Err(e.into());
        }
    }
    let state = ServerState::builder(db, test_config())
        .mailer(mailer)
        .verifier(Arc::new(verifier))
        .build()?;
    Ok(routes::build_router(state, cors()))
}

async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    Ok((status, body))
}

fn post_json(uri: &str, body: Value) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body)?))?)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}{}", &Uuid::new_v4().simple().to_string()[..10])
}

#[tokio::test]
async fn test_register_login_and_profile() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app(Arc::new(MemoryMailer::default()), MockVerifier::default()).await?;
    let username = unique("anna");
    let email = format!("{username}@example.com");

    let (status, body) = send(&app, post_json("/api/register", json!({
        "username": username, "email": email, "password": "S3curePass!", "confirm_password": "S3curePass!"
    }))?).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registro completado");

    // duplicate username
    let (status, _) = send(&app, post_json("/api/register", json!({
        "username": username, "email": "other@example.com", "password": "x", "confirm_password": "x"
    }))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let resp = app.clone().oneshot(post_json("/api/login", json!({"username": username, "password": "S3curePass!"}))?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get("set-cookie").is_some());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["message"], "Login exitoso");
    let token = body["token"].as_str().unwrap_or_default().to_string();

    let req = Request::builder()
        .uri("/api/ver-perfil")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())?;
    let (status, profile) = send(&app, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], username.as_str());
    assert_eq!(profile["email"], email.as_str());
    assert_eq!(profile["language"], "Català");

    // the cookie works too
    let req = Request::builder()
        .uri("/api/ver-perfil")
        .header("cookie", format!("auth_token={token}"))
        .body(Body::empty())?;
    assert_eq!(send(&app, req).await?.0, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_login_wrong_password() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app(Arc::new(MemoryMailer::default()), MockVerifier::default()).await?;
    let username = unique("bernat");
    send(&app, post_json("/api/register", json!({
        "username": username, "email": format!("{username}@example.com"),
        "password": "StrongPass123", "confirm_password": "StrongPass123"
    }))?).await?;

    let (status, body) = send(&app, post_json("/api/login", json!({"username": username, "password": "wrong"}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username o password incorrectos");
    Ok(())
}

#[tokio::test]
async fn test_protected_routes_require_token() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app(Arc::new(MemoryMailer::default()), MockVerifier::default()).await?;

    let req = Request::builder().uri("/api/friendships/my-friends").body(Body::empty())?;
    assert_eq!(send(&app, req).await?.0, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/friendships/my-friends")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())?;
    assert_eq!(send(&app, req).await?.0, StatusCode::UNAUTHORIZED);

    let req = Request::builder().uri("/health").body(Body::empty())?;
    let (status, body) = send(&app, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn test_google_sign_in_creates_then_reuses_account() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let local = unique("gmail");
    let email = format!("{local}@gmail.com");
    let verifier = MockVerifier::default().with_token("good-token", "uid-1", Some(&email));
    let app = build_app(Arc::new(MemoryMailer::default()), verifier).await?;

    let (status, first) = send(&app, post_json("/api/auth/google", json!({"id_token": "good-token"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["created"], true);
    assert_eq!(first["username"], local.as_str());

    let (_, second) = send(&app, post_json("/api/auth/google", json!({"id_token": "good-token"}))?).await?;
    assert_eq!(second["created"], false);
    assert_eq!(second["user_id"], first["user_id"]);

    let (status, _) = send(&app, post_json("/api/auth/google", json!({"id_token": "forged"}))?).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, post_json("/api/auth/google", json!({}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_password_reset_link_works_once() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let mailer = Arc::new(MemoryMailer::default());
    let app = build_app(Arc::clone(&mailer), MockVerifier::default()).await?;
    let username = unique("carla");
    let email = format!("{username}@example.com");
    send(&app, post_json("/api/register", json!({
        "username": username, "email": email, "password": "OldPass123", "confirm_password": "OldPass123"
    }))?).await?;

    let (status, _) = send(&app, post_json("/api/send-password-reset-email", json!({"email": "nobody@example.com"}))?).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, post_json("/api/send-password-reset-email", json!({"email": email}))?).await?;
    assert_eq!(status, StatusCode::OK);

    let mail = mailer.outbox().into_iter().find(|m| m.to == email).expect("reset mail");
    let link = mail.text.split_whitespace().last().unwrap_or_default().to_string();
    let path = link.strip_prefix("http://front.test").expect("frontend link").to_string();
    let api_path = format!("/api{path}");

    let (status, _) = send(&app, post_json(&api_path, json!({"new_password": "a", "confirm_password": "b"}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, post_json(&api_path, json!({"new_password": "NewPass123", "confirm_password": "NewPass123"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    // the password changed, so the same link is dead
    let (status, _) = send(&app, post_json(&api_path, json!({"new_password": "Again123", "confirm_password": "Again123"}))?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, post_json("/api/login", json!({"username": username, "password": "NewPass123"}))?).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_token_of_deleted_account_is_rejected() -> anyhow::Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
    let app = build_app(Arc::new(MemoryMailer::default()), MockVerifier::default()).await?;
    let username = unique("victor");
    let register = |email: String| {
        post_json("/api/register", json!({
            "username": username, "email": email, "password": "Passw0rd!", "confirm_password": "Passw0rd!"
        }))
    };
    assert_eq!(send(&app, register(format!("{username}@example.com"))?).await?.0, StatusCode::CREATED);
    let (_, body) = send(&app, post_json("/api/login", json!({"username": username, "password": "Passw0rd!"}))?).await?;
    let old_token = body["token"].as_str().unwrap_or_default().to_string();
    assert!(!old_token.is_empty());

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/eliminar-cuenta")
        .header("authorization", format!("Bearer {old_token}"))
        .body(Body::empty())?;
    assert_eq!(send(&app, req).await?.0, StatusCode::OK);

    let profile = |token: &str| {
        Request::builder()
            .uri("/api/ver-perfil")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
    };
    assert_eq!(send(&app, profile(&old_token)?).await?.0, StatusCode::UNAUTHORIZED);

    // someone else takes the username; the old token must not reach their account
    assert_eq!(send(&app, register(format!("{username}@other.example.com"))?).await?.0, StatusCode::CREATED);
    assert_eq!(send(&app, profile(&old_token)?).await?.0, StatusCode::UNAUTHORIZED);

    // anonymous-friendly routes treat the stale token as no token
    let req = Request::builder()
        .uri("/events?page=1&per_page=1")
        .header("authorization", format!("Bearer {old_token}"))
        .body(Body::empty())?;
    assert_eq!(send(&app, req).await?.0, StatusCode::OK);
    Ok(())
}
