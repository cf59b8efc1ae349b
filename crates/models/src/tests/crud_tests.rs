use super::{setup_test_db, unique_name};
use crate::kinds::{ChatKind, RequestStatus};
use crate::{calendar, chat, event, event_category, friendship, friendship_request, message, place, private_chat, review, user};
use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, EntityTrait, NotSet, Set};

/// Test user create / lookup / delete
#[tokio::test]
async fn test_user_crud() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let name = unique_name("crud_user");
    let created = user::create(&db, &name, &format!("{name}@example.com")).await?;
    assert_eq!(created.language, user::DEFAULT_LANGUAGE);

    let found = user::find_by_username(&db, &name).await?.expect("user exists");
    assert_eq!(found.id, created.id);
    assert!(user::find_by_email(&db, &format!("{name}@example.com")).await?.is_some());

    // duplicate username rejected by the unique key
    assert!(user::create(&db, &name, &format!("other_{name}@example.com")).await.is_err());

    user::Entity::delete_by_id(created.id).exec(&db).await?;
    assert!(user::find_by_username(&db, &name).await?.is_none());
    Ok(())
}

/// Event with place, chat and category links
#[tokio::test]
async fn test_event_with_links() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let p = place::create(&db, "Plaça Catalunya", 41.387, 2.170, Some("08002".into())).await?;
    let c = chat::create(&db, ChatKind::EventChat).await?;
    let code = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let e = event::ActiveModel {
        id: NotSet,
        ini_date: Set(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
        end_date: Set(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()),
        name: Set("Concert de prova".into()),
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
    }
    .insert(&db)
    .await?;

    event_category::link(&db, e.id, "agenda:categories/concerts").await?;
    event_category::link(&db, e.id, "agenda:categories/concerts").await?;
    let cats = event_category::names_for_event(&db, e.id).await?;
    assert_eq!(cats, vec!["agenda:categories/concerts".to_string()]);

    assert_eq!(event::find_by_code(&db, code).await?.map(|x| x.id), Some(e.id));
    assert!(chat::find_of_kind(&db, c.id, ChatKind::GroupChat).await?.is_none());

    event::Entity::delete_by_id(e.id).exec(&db).await?;
    chat::Entity::delete_by_id(c.id).exec(&db).await?;
    place::Entity::delete_by_id(p.id).exec(&db).await?;
    Ok(())
}

/// Friendship request lifecycle and block rows
#[tokio::test]
async fn test_friendship_request_lifecycle() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let a = user::create(&db, &unique_name("fa"), &format!("{}@example.com", unique_name("fa"))).await?;
    let b = user::create(&db, &unique_name("fb"), &format!("{}@example.com", unique_name("fb"))).await?;

    let req = friendship_request::create_pending(&db, &a.username, &b.username).await?;
    assert_eq!(req.status, RequestStatus::Pendiente);
    assert!(req.responded_at.is_none());

    let accepted = friendship_request::resolve(&db, req, RequestStatus::Aceptado).await?;
    assert!(accepted.responded_at.is_some());
    // answering twice is refused
    assert!(friendship_request::resolve(&db, accepted.clone(), RequestStatus::Rechazado).await.is_err());

    let f = friendship::create(&db, &a.username, &b.username, true, Some(accepted.id)).await?;
    assert_eq!(friendship::find_friendship(&db, &b.username, &a.username).await?.map(|x| x.id), Some(f.id));
    // (user1, user2) is unique
    assert!(friendship::create(&db, &a.username, &b.username, false, None).await.is_err());

    user::Entity::delete_by_id(a.id).exec(&db).await?;
    user::Entity::delete_by_id(b.id).exec(&db).await?;
    // cascades removed the dependent rows
    assert!(friendship::Entity::find_by_id(f.id).one(&db).await?.is_none());
    Ok(())
}

/// Messages, private chats and reviews honour their row checks
#[tokio::test]
async fn test_row_checks() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let a = user::create(&db, &unique_name("ma"), &format!("{}@example.com", unique_name("ma"))).await?;
    let b = user::create(&db, &unique_name("mb"), &format!("{}@example.com", unique_name("mb"))).await?;
    let c = chat::create(&db, ChatKind::PrivateChat).await?;
    private_chat::create(&db, c.id, &a.username, &b.username).await?;
    assert!(private_chat::find_between(&db, &b.username, &a.username).await?.is_some());

    assert!(message::create(&db, c.id, &a.username, None, None).await.is_err());
    let m = message::create(&db, c.id, &a.username, Some("hola".into()), None).await?;
    assert_eq!(m.preview(), "hola");

    assert!(review::validate(None, None).is_err());

    let cal = calendar::create(&db).await?;
    assert!(cal.id > 0);

    chat::Entity::delete_by_id(c.id).exec(&db).await?;
    calendar::Entity::delete_by_id(cal.id).exec(&db).await?;
    user::Entity::delete_by_id(a.id).exec(&db).await?;
    user::Entity::delete_by_id(b.id).exec(&db).await?;
    Ok(())
}
