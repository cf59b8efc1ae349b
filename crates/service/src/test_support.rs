#![cfg(test)]
use chrono::NaiveDate;
use migration::MigratorTrait;
use models::kinds::ChatKind;
use models::{chat, event, place};
use sea_orm::{ActiveModelTrait, DatabaseConnection, NotSet, Set};
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

fn test_config() -> configs::DatabaseConfig {
    let mut cfg = configs::DatabaseConfig::default();
    cfg.normalize_from_env();
    cfg.max_connections = cfg.max_connections.max(10);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg.acquire_timeout_secs = 10;
    cfg
}

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    // Run migrations exactly once, with a throwaway connection
    MIGRATED
        .get_or_try_init(|| async {
            let db = models::db::connect_with_config(&test_config()).await?;
            migration::Migrator::up(&db, None).await?;
            drop(db);
            Ok::<(), anyhow::Error>(())
        })
        .await?;

    // Return a fresh connection for the current test's runtime
    models::db::connect_with_config(&test_config()).await
}

/// Create a user with a unique name derived from `prefix`; returns the username.
pub async fn make_user(db: &DatabaseConnection, prefix: &str) -> anyhow::Result<String> {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let username = format!("{prefix}_{}", &tag[..10]);
    models::user::create(db, &username, &format!("{username}@test.cultucat.cat")).await?;
    Ok(username)
}

/// Insert an event at the given coordinates starting and ending on `ini`/`end`.
pub async fn make_event(
    db: &DatabaseConnection,
    name: &str,
    lat: f64,
    lon: f64,
    ini: NaiveDate,
    end: NaiveDate,
) -> anyhow::Result<event::Model> {
    let p = place::create(db, &format!("{name} street"), lat, lon, Some("08001".into())).await?;
    let c = chat::create(db, ChatKind::EventChat).await?;
    let code = (uuid::Uuid::new_v4().as_u128() % 1_000_000_000_000) as i64;
    let am = event::ActiveModel {
        id: NotSet,
        ini_date: Set(ini),
        end_date: Set(end),
        name: Set(name.to_string()),
        description: Set(None),
        tickets: Set(None),
        schedule: Set(None),
        link: Set(None),
        email: Set(None),
        telefon: Set(None),
        place_id: Set(p.id),
        chat_id: Set(Some(c.id)),
        image_path: Set(None),
        code_event: Set(code),
    };
    Ok(am.insert(db).await?)
}
