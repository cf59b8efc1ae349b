use super::{setup_test_db, unique_name};
use crate::kinds::ChatKind;
use crate::{chat, group, participant, user};
use crate::kinds::ParticipantRole;
use anyhow::Result;
use sea_orm::{EntityTrait, TransactionTrait};

/// Group creation spans three tables and commits atomically
#[tokio::test]
async fn test_transaction_commit() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;
    let owner = user::create(&db, &unique_name("tx"), &format!("{}@example.com", unique_name("tx"))).await?;

    let txn = db.begin().await?;
    let c = chat::create(&txn, ChatKind::GroupChat).await?;
    let g = group::create(&txn, "Colla castellera", None, c.id).await?;
    participant::create(&txn, g.id, &owner.username, ParticipantRole::Creador).await?;
    txn.commit().await?;

    let member = participant::find(&db, g.id, &owner.username).await?.expect("member");
    assert_eq!(member.role, ParticipantRole::Creador);

    // deleting the chat cascades to the group and its members
    chat::Entity::delete_by_id(c.id).exec(&db).await?;
    assert!(group::Entity::find_by_id(g.id).one(&db).await?.is_none());
    user::Entity::delete_by_id(owner.id).exec(&db).await?;
    Ok(())
}

/// Rolled back rows are never visible
#[tokio::test]
async fn test_transaction_rollback() -> Result<()> {
    if std::env::var("SKIP_DB_TESTS").is_ok() {
        return Ok(());
    }
    let db = setup_test_db().await?;

    let txn = db.begin().await?;
    let c = chat::create(&txn, ChatKind::GroupChat).await?;
    let g = group::create(&txn, "Rollback", None, c.id).await?;
    txn.rollback().await?;

    assert!(group::Entity::find_by_id(g.id).one(&db).await?.is_none());
    assert!(chat::Entity::find_by_id(c.id).one(&db).await?.is_none());
    Ok(())
}
