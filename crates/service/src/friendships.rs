//! Friend requests, friendships and blocks.
//!
//! `friendship_request.status` moves `Pendiente -> Aceptado | Rechazado`.
//! A `friendship` row with `is_friend = true` exists exactly for accepted
//! pairs; `is_friend = false` is a block placed by `user1` on `user2`.

use models::kinds::RequestStatus;
use models::{friendship, friendship_request, user};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::accounts::require_user;
use crate::errors::{ServiceError, ServiceResult};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn required(username: Option<&str>) -> ServiceResult<&str> {
    username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ServiceError::Validation("El nombre de usuario es obligatorio".into()))
}

/// Pending requests between `a` and `b` in either direction.
fn pending_between(a: &str, b: &str) -> Condition {
    Condition::all()
        .add(friendship_request::Column::Status.eq(RequestStatus::Pendiente))
        .add(
            Condition::any()
                .add(
                    Condition::all()
                        .add(friendship_request::Column::Orderer.eq(a))
                        .add(friendship_request::Column::Ordered.eq(b)),
                )
                .add(
                    Condition::all()
                        .add(friendship_request::Column::Orderer.eq(b))
                        .add(friendship_request::Column::Ordered.eq(a)),
                ),
        )
}

/// True when either user has blocked the other.
pub async fn blocked_either_way<C: ConnectionTrait>(db: &C, a: &str, b: &str) -> ServiceResult<bool> {
    let found = friendship::Entity::find()
        .filter(friendship::between(a, b))
        .filter(friendship::Column::IsFriend.eq(false))
        .one(db)
        .await?;
    Ok(found.is_some())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendRequestOutcome {
    AlreadyFriends,
    /// My own pending request was withdrawn.
    Cancelled,
    /// The other user had already asked; we are friends now.
    AutoAccepted,
    Sent,
}

impl SendRequestOutcome {
    pub fn created(&self) -> bool {
        matches!(self, Self::AutoAccepted | Self::Sent)
    }

    pub fn message(&self, username: &str) -> String {
        match self {
            Self::AlreadyFriends => format!("Ya eres amigo de {username}"),
            Self::Cancelled => format!("Has cancelado tu solicitud de amistad a {username}"),
            Self::AutoAccepted => format!("Has aceptado la solicitud de amistad de {username} y ahora son amigos"),
            Self::Sent => format!("Solicitud de amistad enviada a {username}"),
        }
    }
}

#[instrument(skip(db))]
pub async fn send_request<C>(db: &C, me: &str, target: Option<&str>) -> ServiceResult<SendRequestOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let target = required(target)?;
    let other = require_user(db, target).await?;
    if other.username == me {
        return Err(ServiceError::Validation("No puedes enviarte una solicitud de amistad a ti mismo".into()));
    }
    if blocked_either_way(db, me, &other.username).await? {
        return Err(ServiceError::Forbidden("No puedes enviar una solicitud de amistad a este usuario".into()));
    }
    if friendship::find_friendship(db, me, &other.username).await?.is_some() {
        return Ok(SendRequestOutcome::AlreadyFriends);
    }
    if let Some(mine) = friendship_request::find_pending(db, me, &other.username).await? {
        friendship_request::Entity::delete_by_id(mine.id).exec(db).await?;
        info!(%me, to = %other.username, "friend_request_cancelled");
        return Ok(SendRequestOutcome::Cancelled);
    }
    if let Some(theirs) = friendship_request::find_pending(db, &other.username, me).await? {
        let txn = db.begin().await?;
        let accepted = friendship_request::resolve(&txn, theirs, RequestStatus::Aceptado).await?;
        friendship::create(&txn, &accepted.orderer, &accepted.ordered, true, Some(accepted.id)).await?;
        txn.commit().await?;
        info!(%me, with = %other.username, "friend_request_auto_accepted");
        return Ok(SendRequestOutcome::AutoAccepted);
    }
    friendship_request::create_pending(db, me, &other.username).await?;
    info!(%me, to = %other.username, "friend_request_sent");
    Ok(SendRequestOutcome::Sent)
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub id: i32,
    pub username: String,
    pub request_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestList {
    pub message: String,
    pub requests: Vec<RequestView>,
}

/// Pending requests I received.
pub async fn received_requests<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<RequestList> {
    let rows = friendship_request::Entity::find()
        .filter(friendship_request::Column::Ordered.eq(me))
        .filter(friendship_request::Column::Status.eq(RequestStatus::Pendiente))
        .order_by_desc(friendship_request::Column::RequestedAt)
        .all(db)
        .await?;
    let requests: Vec<RequestView> = rows
        .into_iter()
        .map(|r| RequestView { id: r.id, username: r.orderer, request_date: r.requested_at.format(TS_FORMAT).to_string() })
        .collect();
    Ok(RequestList { message: format!("Tienes {} solicitudes pendientes", requests.len()), requests })
}

/// Pending requests I sent.
pub async fn sent_requests<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<RequestList> {
    let rows = friendship_request::Entity::find()
        .filter(friendship_request::Column::Orderer.eq(me))
        .filter(friendship_request::Column::Status.eq(RequestStatus::Pendiente))
        .order_by_desc(friendship_request::Column::RequestedAt)
        .all(db)
        .await?;
    let requests: Vec<RequestView> = rows
        .into_iter()
        .map(|r| RequestView { id: r.id, username: r.ordered, request_date: r.requested_at.format(TS_FORMAT).to_string() })
        .collect();
    Ok(RequestList { message: format!("Has enviado {} solicitudes pendientes", requests.len()), requests })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAction {
    Accept,
    Reject,
}

impl RequestAction {
    pub fn parse(raw: Option<&str>) -> ServiceResult<Self> {
        match raw.map(str::trim) {
            Some("accept") => Ok(Self::Accept),
            Some("reject") => Ok(Self::Reject),
            _ => Err(ServiceError::Validation("La acción debe ser \"accept\" o \"reject\"".into())),
        }
    }
}

/// Accept or reject a pending request addressed to me.
#[instrument(skip(db))]
pub async fn respond_request<C>(db: &C, me: &str, request_id: Option<i32>, action: Option<&str>) -> ServiceResult<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let (Some(request_id), Some(_)) = (request_id, action) else {
        return Err(ServiceError::Validation("El ID de la solicitud y la acción son obligatorios".into()));
    };
    let action = RequestAction::parse(action)?;
    let req = friendship_request::Entity::find_by_id(request_id)
        .filter(friendship_request::Column::Ordered.eq(me))
        .filter(friendship_request::Column::Status.eq(RequestStatus::Pendiente))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Solicitud no encontrada o ya procesada".into()))?;
    let from = req.orderer.clone();
    match action {
        RequestAction::Accept => {
            let txn = db.begin().await?;
            let accepted = friendship_request::resolve(&txn, req, RequestStatus::Aceptado).await?;
            friendship::create(&txn, &accepted.orderer, &accepted.ordered, true, Some(accepted.id)).await?;
            txn.commit().await?;
            info!(%me, %from, "friend_request_accepted");
            Ok(format!("Has aceptado la solicitud de amistad de {from}"))
        }
        RequestAction::Reject => {
            friendship_request::resolve(db, req, RequestStatus::Rechazado).await?;
            info!(%me, %from, "friend_request_rejected");
            Ok(format!("Has rechazado la solicitud de amistad de {from}"))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendView {
    pub username: String,
    pub user_id: uuid::Uuid,
    pub since: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendList {
    pub message: String,
    pub friends: Vec<FriendView>,
}

/// Usernames of my accepted friends.
pub async fn friend_usernames<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<Vec<String>> {
    let rows = friendship::Entity::find().filter(friendship::friends_of(me)).all(db).await?;
    Ok(rows.iter().map(|f| f.other(me).to_string()).collect())
}

pub async fn list_friends<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<FriendList> {
    let rows = friendship::Entity::find()
        .filter(friendship::friends_of(me))
        .order_by_asc(friendship::Column::CreatedAt)
        .all(db)
        .await?;
    let names: Vec<String> = rows.iter().map(|f| f.other(me).to_string()).collect();
    let users = user::Entity::find().filter(user::Column::Username.is_in(names)).all(db).await?;
    let friends: Vec<FriendView> = rows
        .iter()
        .filter_map(|f| {
            let other = f.other(me);
            users.iter().find(|u| u.username == other).map(|u| FriendView {
                username: u.username.clone(),
                user_id: u.id,
                since: f.created_at.format(TS_FORMAT).to_string(),
            })
        })
        .collect();
    Ok(FriendList { message: format!("Tienes {} amigos", friends.len()), friends })
}

#[instrument(skip(db))]
pub async fn remove_friend<C: ConnectionTrait>(db: &C, me: &str, target: Option<&str>) -> ServiceResult<String> {
    let target = required(target)?;
    let other = require_user(db, target).await?;
    let f = friendship::find_friendship(db, me, &other.username)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No eres amigo de {}", other.username)))?;
    friendship::Entity::delete_by_id(f.id).exec(db).await?;
    info!(%me, removed = %other.username, "friend_removed");
    Ok(format!("Has eliminado a {} de tu lista de amigos", other.username))
}

/// Replace any relation with a block by me; pending requests either way are dropped.
#[instrument(skip(db))]
pub async fn block_user<C>(db: &C, me: &str, target: Option<&str>) -> ServiceResult<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let target = required(target)?;
    let other = require_user(db, target).await?;
    if other.username == me {
        return Err(ServiceError::Validation("No puedes bloquearte a ti mismo".into()));
    }
    let txn = db.begin().await?;
    friendship::Entity::delete_many()
        .filter(friendship::between(me, &other.username))
        .exec(&txn)
        .await?;
    friendship_request::Entity::delete_many()
        .filter(pending_between(me, &other.username))
        .exec(&txn)
        .await?;
    friendship::create(&txn, me, &other.username, false, None).await?;
    txn.commit().await?;
    info!(%me, blocked = %other.username, "user_blocked");
    Ok(format!("Has bloqueado a {}", other.username))
}

#[instrument(skip(db))]
pub async fn unblock_user<C: ConnectionTrait>(db: &C, me: &str, target: Option<&str>) -> ServiceResult<String> {
    let target = required(target)?;
    let other = require_user(db, target).await?;
    let block = friendship::find_block(db, me, &other.username)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No has bloqueado a {}", other.username)))?;
    friendship::Entity::delete_by_id(block.id).exec(db).await?;
    info!(%me, unblocked = %other.username, "user_unblocked");
    Ok(format!("Has desbloqueado a {}", other.username))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    NoRelation,
    Friends,
    Blocked,
    BlockedBy,
    RequestSent,
    RequestReceived,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub status: RelationStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i32>,
}

pub async fn relation_status<C: ConnectionTrait>(db: &C, me: &str, target: Option<&str>) -> ServiceResult<StatusView> {
    let target = required(target)?;
    let other = require_user(db, target).await?;
    let name = other.username.as_str();

    let row = friendship::Entity::find().filter(friendship::between(me, name)).one(db).await?;
    if let Some(f) = row {
        let view = if f.is_friend {
            StatusView {
                status: RelationStatus::Friends,
                message: format!("Eres amigo de {name}"),
                since: Some(f.created_at.format(TS_FORMAT).to_string()),
                request_id: f.request_id,
            }
        } else if f.user1 == me {
            StatusView { status: RelationStatus::Blocked, message: format!("Has bloqueado a {name}"), since: None, request_id: None }
        } else {
            StatusView { status: RelationStatus::BlockedBy, message: format!("Has sido bloqueado por {name}"), since: None, request_id: None }
        };
        return Ok(view);
    }
    if let Some(r) = friendship_request::find_pending(db, me, name).await? {
        return Ok(StatusView {
            status: RelationStatus::RequestSent,
            message: format!("Has enviado una solicitud a {name}"),
            since: None,
            request_id: Some(r.id),
        });
    }
    if let Some(r) = friendship_request::find_pending(db, name, me).await? {
        return Ok(StatusView {
            status: RelationStatus::RequestReceived,
            message: format!("{name} te ha enviado una solicitud"),
            since: None,
            request_id: Some(r.id),
        });
    }
    Ok(StatusView {
        status: RelationStatus::NoRelation,
        message: format!("No existe relación con el usuario {name}"),
        since: None,
        request_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_user};

    #[test]
    fn outcome_status_codes() {
        assert!(SendRequestOutcome::Sent.created());
        assert!(SendRequestOutcome::AutoAccepted.created());
        assert!(!SendRequestOutcome::Cancelled.created());
        assert!(!SendRequestOutcome::AlreadyFriends.created());
        assert_eq!(SendRequestOutcome::Sent.message("pau"), "Solicitud de amistad enviada a pau");
    }

    #[test]
    fn action_parsing() {
        assert_eq!(RequestAction::parse(Some("accept")).unwrap(), RequestAction::Accept);
        assert_eq!(RequestAction::parse(Some("reject")).unwrap(), RequestAction::Reject);
        assert!(RequestAction::parse(Some("maybe")).is_err());
        assert!(RequestAction::parse(None).is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        let v = serde_json::to_value(RelationStatus::BlockedBy).unwrap();
        assert_eq!(v, "blocked_by");
    }

    #[tokio::test]
    async fn request_lifecycle() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "fa").await?;
        let b = make_user(&db, "fb").await?;

        assert!(matches!(send_request(&db, &a, Some(&a)).await, Err(ServiceError::Validation(_))));
        assert!(matches!(send_request(&db, &a, Some("ghost-user-x")).await, Err(ServiceError::NotFound(_))));

        assert_eq!(send_request(&db, &a, Some(&b)).await?, SendRequestOutcome::Sent);
        assert_eq!(relation_status(&db, &a, Some(&b)).await?.status, RelationStatus::RequestSent);
        assert_eq!(relation_status(&db, &b, Some(&a)).await?.status, RelationStatus::RequestReceived);
        // sending again withdraws it
        assert_eq!(send_request(&db, &a, Some(&b)).await?, SendRequestOutcome::Cancelled);
        assert_eq!(relation_status(&db, &a, Some(&b)).await?.status, RelationStatus::NoRelation);

        send_request(&db, &a, Some(&b)).await?;
        assert_eq!(send_request(&db, &b, Some(&a)).await?, SendRequestOutcome::AutoAccepted);
        assert_eq!(send_request(&db, &a, Some(&b)).await?, SendRequestOutcome::AlreadyFriends);
        assert!(friend_usernames(&db, &a).await?.contains(&b));
        assert_eq!(list_friends(&db, &b).await?.friends.len(), 1);

        remove_friend(&db, &a, Some(&b)).await?;
        assert!(matches!(remove_friend(&db, &a, Some(&b)).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn respond_accepts_only_my_pending_requests() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "ra").await?;
        let b = make_user(&db, "rb").await?;
        send_request(&db, &a, Some(&b)).await?;
        let req = received_requests(&db, &b).await?.requests.remove(0);
        assert_eq!(req.username, a);

        assert!(matches!(respond_request(&db, &a, Some(req.id), Some("accept")).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(respond_request(&db, &b, Some(req.id), Some("later")).await, Err(ServiceError::Validation(_))));
        respond_request(&db, &b, Some(req.id), Some("accept")).await?;
        assert_eq!(relation_status(&db, &a, Some(&b)).await?.status, RelationStatus::Friends);
        assert!(matches!(respond_request(&db, &b, Some(req.id), Some("accept")).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn block_replaces_friendship() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "ba").await?;
        let b = make_user(&db, "bb").await?;
        send_request(&db, &a, Some(&b)).await?;
        send_request(&db, &b, Some(&a)).await?;

        block_user(&db, &a, Some(&b)).await?;
        assert_eq!(relation_status(&db, &a, Some(&b)).await?.status, RelationStatus::Blocked);
        assert_eq!(relation_status(&db, &b, Some(&a)).await?.status, RelationStatus::BlockedBy);
        assert!(matches!(send_request(&db, &b, Some(&a)).await, Err(ServiceError::Forbidden(_))));
        assert!(friend_usernames(&db, &a).await?.is_empty());

        assert!(matches!(unblock_user(&db, &b, Some(&a)).await, Err(ServiceError::NotFound(_))));
        unblock_user(&db, &a, Some(&b)).await?;
        assert_eq!(relation_status(&db, &a, Some(&b)).await?.status, RelationStatus::NoRelation);
        Ok(())
    }
}
