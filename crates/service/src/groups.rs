//! Group chats: membership, join requests, invitations and messages.
//!
//! Creators and administrators manage a group. Join requests and
//! invitations share `group_request` and follow the same
//! `Pendiente -> Aceptado | Rechazado` lifecycle as friend requests.

use std::collections::HashMap;

use models::kinds::{ChatKind, ParticipantRole, RequestStatus};
use models::{chat, group, group_request, message, participant};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument};

use crate::accounts::require_user;
use crate::chats::{last_messages, messages_of, post_text, to_utc, LastMessage, MessageView};
use crate::errors::{ServiceError, ServiceResult};
use crate::events::contains_pattern;
use crate::friendships::RequestAction;
use crate::notifications::{notify_user, push_data, Delivery, PushNotifier};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

async fn require_group<C: ConnectionTrait>(db: &C, group_id: i32) -> ServiceResult<group::Model> {
    group::Entity::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No existe un grupo con ID {group_id}")))
}

async fn require_member<C: ConnectionTrait>(db: &C, group_id: i32, me: &str) -> ServiceResult<participant::Model> {
    participant::find(db, group_id, me)
        .await?
        .ok_or_else(|| ServiceError::Forbidden("No eres miembro de este grupo".into()))
}

async fn require_manager<C: ConnectionTrait>(db: &C, group_id: i32, me: &str, denied: &str) -> ServiceResult<()> {
    match participant::find(db, group_id, me).await? {
        Some(p) if p.role.can_manage() => Ok(()),
        _ => Err(ServiceError::Forbidden(denied.to_string())),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedGroup {
    pub id: i32,
    pub name: String,
    pub chat_id: i32,
    pub created_by: String,
}

/// New group chat with me as its creator.
#[instrument(skip(db))]
pub async fn create_group<C>(db: &C, me: &str, name: Option<&str>, photo: Option<String>) -> ServiceResult<CreatedGroup>
where
    C: ConnectionTrait + TransactionTrait,
{
    let name = name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServiceError::Validation("El nombre del grupo es obligatorio".into()))?;
    let txn = db.begin().await?;
    let c = chat::create(&txn, ChatKind::GroupChat).await?;
    let g = group::create(&txn, name, photo.filter(|p| !p.trim().is_empty()), c.id).await?;
    participant::create(&txn, g.id, me, ParticipantRole::Creador).await?;
    txn.commit().await?;
    info!(%me, group_id = g.id, "group_created");
    Ok(CreatedGroup { id: g.id, name: g.name, chat_id: c.id, created_by: me.to_string() })
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    AlreadyMember { group: String, role: ParticipantRole },
    AlreadyRequested { group: String },
    /// A pending invitation existed and was accepted.
    Joined { group_id: i32, group: String, chat_id: i32 },
    Requested { group_id: i32, group: String },
}

impl JoinOutcome {
    pub fn created(&self) -> bool {
        matches!(self, Self::Joined { .. } | Self::Requested { .. })
    }

    pub fn message(&self) -> String {
        match self {
            Self::AlreadyMember { group, role } => format!("Ya eres parte del grupo \"{group}\" con rol de {role:?}"),
            Self::AlreadyRequested { group } => format!("Ya tienes una solicitud pendiente para unirte al grupo \"{group}\""),
            Self::Joined { group, .. } => format!("Has aceptado la invitación y te has unido al grupo \"{group}\""),
            Self::Requested { group, .. } => {
                format!("Se ha enviado tu solicitud para unirte al grupo \"{group}\". Espera la aprobación del administrador.")
            }
        }
    }
}

async fn find_pending_kind<C: ConnectionTrait>(
    db: &C,
    group_id: i32,
    username: &str,
    is_invitation: bool,
) -> ServiceResult<Option<group_request::Model>> {
    Ok(group_request::Entity::find()
        .filter(group_request::Column::GroupId.eq(group_id))
        .filter(group_request::Column::Username.eq(username))
        .filter(group_request::Column::Status.eq(RequestStatus::Pendiente))
        .filter(group_request::Column::IsInvitation.eq(is_invitation))
        .one(db)
        .await?)
}

/// Ask to join a group; a pending invitation is accepted on the spot.
#[instrument(skip(db))]
pub async fn join_group<C>(db: &C, me: &str, group_id: Option<i32>) -> ServiceResult<JoinOutcome>
where
    C: ConnectionTrait + TransactionTrait,
{
    let group_id = group_id.ok_or_else(|| ServiceError::Validation("El ID del grupo es obligatorio".into()))?;
    let g = require_group(db, group_id).await?;
    if let Some(p) = participant::find(db, g.id, me).await? {
        return Ok(JoinOutcome::AlreadyMember { group: g.name, role: p.role });
    }
    if find_pending_kind(db, g.id, me, false).await?.is_some() {
        return Ok(JoinOutcome::AlreadyRequested { group: g.name });
    }
    if let Some(invitation) = find_pending_kind(db, g.id, me, true).await? {
        let txn = db.begin().await?;
        group_request::resolve(&txn, invitation, RequestStatus::Aceptado, me).await?;
        participant::create(&txn, g.id, me, ParticipantRole::Membre).await?;
        txn.commit().await?;
        info!(%me, group_id = g.id, "group_invitation_accepted_on_join");
        return Ok(JoinOutcome::Joined { group_id: g.id, group: g.name, chat_id: g.chat_id });
    }
    group_request::create_pending(db, g.id, me, None).await?;
    info!(%me, group_id = g.id, "group_join_requested");
    Ok(JoinOutcome::Requested { group_id: g.id, group: g.name })
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupHit {
    pub id: i32,
    pub name: String,
    pub is_member: bool,
    pub members_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSearch {
    pub message: String,
    pub groups: Vec<GroupHit>,
}

/// Exact (case-insensitive) name matches first, then partial ones.
pub async fn search_groups<C: ConnectionTrait>(db: &C, me: &str, query: Option<&str>) -> ServiceResult<GroupSearch> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ServiceError::Validation("El parámetro de búsqueda es obligatorio".into()))?;
    let found = group::Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col((group::Entity, group::Column::Name)))).like(contains_pattern(query)))
        .order_by_asc(group::Column::Name)
        .all(db)
        .await?;
    let needle = query.to_lowercase();
    let mut groups = Vec::with_capacity(found.len());
    for g in found {
        let members_count = participant::Entity::find()
            .filter(participant::Column::GroupId.eq(g.id))
            .count(db)
            .await?;
        let is_member = participant::find(db, g.id, me).await?.is_some();
        groups.push(GroupHit { id: g.id, name: g.name, is_member, members_count });
    }
    // stable: keeps alphabetical order inside each tier
    groups.sort_by_key(|g| g.name.to_lowercase() != needle);
    Ok(GroupSearch { message: format!("Se encontraron {} grupos", groups.len()), groups })
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMessages {
    pub message: String,
    pub group_name: String,
    pub messages: Vec<MessageView>,
}

pub async fn group_messages<C: ConnectionTrait>(db: &C, me: &str, group_id: i32) -> ServiceResult<GroupMessages> {
    let g = require_group(db, group_id).await?;
    require_member(db, g.id, me).await?;
    let messages = messages_of(db, g.chat_id).await?;
    let message = if messages.is_empty() {
        "No hay mensajes en este grupo todavía".to_string()
    } else {
        format!("Se encontraron {} mensajes", messages.len())
    };
    Ok(GroupMessages { message, group_name: g.name, messages })
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMessageSent {
    pub group_name: String,
    #[serde(flatten)]
    pub message: MessageView,
}

/// Post into a group and notify every other member.
#[instrument(skip(db, notifier, text))]
pub async fn send_group_message<C: ConnectionTrait>(
    db: &C,
    notifier: &dyn PushNotifier,
    me: &str,
    group_id: Option<i32>,
    text: Option<&str>,
    is_foreground: bool,
) -> ServiceResult<GroupMessageSent> {
    const MISSING: &str = "El ID del grupo y el mensaje son obligatorios";
    let group_id = group_id.ok_or_else(|| ServiceError::Validation(MISSING.into()))?;
    let g = require_group(db, group_id).await?;
    require_member(db, g.id, me).await?;
    let msg = post_text(db, g.chat_id, me, text, MISSING).await?;
    info!(%me, group_id = g.id, "group_message_sent");

    let body_text = msg.preview();
    let title = format!("Nuevo mensaje en {}", g.name);
    let body = format!("{me}: {body_text}");
    let others = participant::Entity::find()
        .filter(participant::Column::GroupId.eq(g.id))
        .filter(participant::Column::Username.ne(me))
        .all(db)
        .await?;
    for p in others {
        let data = push_data([
            ("type", "new_group_message".to_string()),
            ("group_id", g.id.to_string()),
            ("group_name", g.name.clone()),
            ("chat_id", g.chat_id.to_string()),
            ("sender_username", me.to_string()),
            ("text", body_text.clone()),
        ]);
        let delivery = if is_foreground { Delivery::DataOnly } else { Delivery::Visible { title: &title, body: &body } };
        notify_user(db, notifier, &p.username, delivery, data).await;
    }
    Ok(GroupMessageSent { group_name: g.name, message: MessageView::from(&msg) })
}

#[derive(Debug, Clone, Serialize)]
pub struct MyGroup {
    pub id: i32,
    pub name: String,
    pub role: ParticipantRole,
    pub last_message: Option<LastMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyGroups {
    pub message: String,
    pub groups: Vec<MyGroup>,
}

/// My groups, most recently active first.
pub async fn my_groups<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<MyGroups> {
    let memberships = participant::Entity::find()
        .filter(participant::Column::Username.eq(me))
        .find_also_related(group::Entity)
        .all(db)
        .await?;
    if memberships.is_empty() {
        return Ok(MyGroups { message: "No perteneces a ningún grupo".into(), groups: Vec::new() });
    }
    let chat_ids: Vec<i32> = memberships.iter().filter_map(|(_, g)| g.as_ref().map(|g| g.chat_id)).collect();
    let latest = last_messages(db, &chat_ids).await?;
    let mut rows: Vec<(MyGroup, _)> = memberships
        .into_iter()
        .filter_map(|(p, g)| {
            let g = g?;
            let last = latest.get(&g.chat_id);
            Some((
                MyGroup { id: g.id, name: g.name, role: p.role, last_message: last.map(LastMessage::from) },
                last.map(|m| to_utc(&m.sent_at)),
            ))
        })
        .collect();
    crate::chats::by_recent_activity(&mut rows);
    let groups: Vec<MyGroup> = rows.into_iter().map(|(g, _)| g).collect();
    Ok(MyGroups { message: format!("Se encontraron {} grupos", groups.len()), groups })
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingJoin {
    pub id: i32,
    pub username: String,
    pub request_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRequests {
    pub message: String,
    pub group_name: String,
    pub requests: Vec<PendingJoin>,
}

/// Pending join requests of a group I manage.
pub async fn group_requests<C: ConnectionTrait>(db: &C, me: &str, group_id: i32) -> ServiceResult<GroupRequests> {
    let g = require_group(db, group_id).await?;
    require_manager(db, g.id, me, "Solo los administradores y creadores pueden ver las solicitudes pendientes").await?;
    let rows = group_request::Entity::find()
        .filter(group_request::Column::GroupId.eq(g.id))
        .filter(group_request::Column::Status.eq(RequestStatus::Pendiente))
        .filter(group_request::Column::IsInvitation.eq(false))
        .order_by_asc(group_request::Column::RequestedAt)
        .all(db)
        .await?;
    let requests: Vec<PendingJoin> = rows
        .into_iter()
        .map(|r| PendingJoin { id: r.id, username: r.username, request_date: r.requested_at.format(TS_FORMAT).to_string() })
        .collect();
    Ok(GroupRequests {
        message: format!("Se encontraron {} solicitudes pendientes", requests.len()),
        group_name: g.name,
        requests,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReply {
    pub message: String,
    pub group_name: String,
}

/// Accept or reject a join request of a group I manage.
#[instrument(skip(db))]
pub async fn handle_request<C>(db: &C, me: &str, request_id: Option<i32>, action: Option<&str>) -> ServiceResult<GroupReply>
where
    C: ConnectionTrait + TransactionTrait,
{
    let (Some(request_id), Some(_)) = (request_id, action) else {
        return Err(ServiceError::Validation("El ID de la solicitud y la acción son obligatorios".into()));
    };
    let action = RequestAction::parse(action)?;
    let req = group_request::Entity::find_by_id(request_id)
        .filter(group_request::Column::Status.eq(RequestStatus::Pendiente))
        .filter(group_request::Column::IsInvitation.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Solicitud no encontrada o ya procesada".into()))?;
    let g = require_group(db, req.group_id).await?;
    require_manager(db, g.id, me, "Solo los administradores y creadores pueden procesar solicitudes").await?;
    let applicant = req.username.clone();
    let message = match action {
        RequestAction::Accept => {
            let txn = db.begin().await?;
            group_request::resolve(&txn, req, RequestStatus::Aceptado, me).await?;
            if participant::find(&txn, g.id, &applicant).await?.is_none() {
                participant::create(&txn, g.id, &applicant, ParticipantRole::Membre).await?;
            }
            txn.commit().await?;
            format!("Has aceptado la solicitud de {applicant}")
        }
        RequestAction::Reject => {
            group_request::resolve(db, req, RequestStatus::Rechazado, me).await?;
            format!("Has rechazado la solicitud de {applicant}")
        }
    };
    info!(%me, group_id = g.id, %applicant, ?action, "group_request_handled");
    Ok(GroupReply { message, group_name: g.name })
}

/// Invite `username` to a group I manage. A pending join request from the
/// invitee is accepted instead. Returns the reply and whether a new
/// invitation was created.
#[instrument(skip(db, notifier))]
pub async fn invite<C>(
    db: &C,
    notifier: &dyn PushNotifier,
    me: &str,
    group_id: Option<i32>,
    username: Option<&str>,
) -> ServiceResult<(GroupReply, bool)>
where
    C: ConnectionTrait + TransactionTrait,
{
    let (Some(group_id), Some(username)) = (group_id, username.map(str::trim).filter(|u| !u.is_empty())) else {
        return Err(ServiceError::Validation("El ID del grupo y el nombre de usuario son obligatorios".into()));
    };
    let g = require_group(db, group_id).await?;
    require_manager(db, g.id, me, "Solo los administradores y creadores pueden enviar invitaciones").await?;
    let invited = require_user(db, username).await?;
    if participant::find(db, g.id, &invited.username).await?.is_some() {
        return Err(ServiceError::Validation(format!("El usuario {username} ya es miembro del grupo")));
    }
    if find_pending_kind(db, g.id, &invited.username, true).await?.is_some() {
        return Ok((GroupReply { message: format!("Ya hay una invitación pendiente para {username}"), group_name: g.name }, false));
    }
    if let Some(request) = find_pending_kind(db, g.id, &invited.username, false).await? {
        let txn = db.begin().await?;
        group_request::resolve(&txn, request, RequestStatus::Aceptado, me).await?;
        participant::create(&txn, g.id, &invited.username, ParticipantRole::Membre).await?;
        txn.commit().await?;
        info!(%me, group_id = g.id, invited = %invited.username, "group_request_accepted_on_invite");
        let message = format!("{username} ya había solicitado unirse; ahora es miembro del grupo \"{}\"", g.name);
        return Ok((GroupReply { message, group_name: g.name }, false));
    }
    group_request::create_pending(db, g.id, &invited.username, Some(me)).await?;
    info!(%me, group_id = g.id, invited = %invited.username, "group_invitation_sent");

    if invited.username != me {
        let body = format!("{me} te ha invitado a unirte al grupo \"{}\"", g.name);
        let data = push_data([
            ("type", "group_invitation".to_string()),
            ("group_id", g.id.to_string()),
            ("group_name", g.name.clone()),
            ("admin", me.to_string()),
        ]);
        notify_user(db, notifier, &invited.username, Delivery::Visible { title: "Invitación a grupo", body: &body }, data).await;
    }
    let message = format!("Se ha enviado una invitación a {username} para unirse al grupo \"{}\"", g.name);
    Ok((GroupReply { message, group_name: g.name }, true))
}

#[derive(Debug, Clone, Serialize)]
pub struct Invitation {
    pub id: i32,
    pub group_id: i32,
    pub group_name: String,
    pub invited_by: Option<String>,
    pub invitation_date: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyInvitations {
    pub message: String,
    pub invitations: Vec<Invitation>,
}

pub async fn my_invitations<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<MyInvitations> {
    let rows = group_request::Entity::find()
        .filter(group_request::Column::Username.eq(me))
        .filter(group_request::Column::Status.eq(RequestStatus::Pendiente))
        .filter(group_request::Column::IsInvitation.eq(true))
        .order_by_desc(group_request::Column::RequestedAt)
        .all(db)
        .await?;
    let ids: Vec<i32> = rows.iter().map(|r| r.group_id).collect();
    let names: HashMap<i32, String> = group::Entity::find()
        .filter(group::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|g| (g.id, g.name))
        .collect();
    let invitations: Vec<Invitation> = rows
        .into_iter()
        .map(|r| Invitation {
            id: r.id,
            group_id: r.group_id,
            group_name: names.get(&r.group_id).cloned().unwrap_or_default(),
            invited_by: r.responded_by,
            invitation_date: r.requested_at.format(TS_FORMAT).to_string(),
        })
        .collect();
    Ok(MyInvitations { message: format!("Tienes {} invitaciones pendientes", invitations.len()), invitations })
}

#[instrument(skip(db))]
pub async fn respond_invitation<C>(db: &C, me: &str, invitation_id: Option<i32>, action: Option<&str>) -> ServiceResult<GroupReply>
where
    C: ConnectionTrait + TransactionTrait,
{
    let (Some(invitation_id), Some(_)) = (invitation_id, action) else {
        return Err(ServiceError::Validation("El ID de la invitación y la acción son obligatorios".into()));
    };
    let action = RequestAction::parse(action)?;
    let inv = group_request::Entity::find_by_id(invitation_id)
        .filter(group_request::Column::Username.eq(me))
        .filter(group_request::Column::Status.eq(RequestStatus::Pendiente))
        .filter(group_request::Column::IsInvitation.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Invitación no encontrada o ya procesada".into()))?;
    let g = require_group(db, inv.group_id).await?;
    let message = match action {
        RequestAction::Accept => {
            let txn = db.begin().await?;
            group_request::resolve(&txn, inv, RequestStatus::Aceptado, me).await?;
            if participant::find(&txn, g.id, me).await?.is_none() {
                participant::create(&txn, g.id, me, ParticipantRole::Membre).await?;
            }
            txn.commit().await?;
            format!("Has aceptado la invitación para unirte al grupo \"{}\"", g.name)
        }
        RequestAction::Reject => {
            group_request::resolve(db, inv, RequestStatus::Rechazado, me).await?;
            format!("Has rechazado la invitación para unirte al grupo \"{}\"", g.name)
        }
    };
    info!(%me, group_id = g.id, ?action, "group_invitation_answered");
    Ok(GroupReply { message, group_name: g.name })
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left,
    /// The creator left and `0` took over.
    Promoted(String),
    /// The last member left; the group and its chat are gone.
    GroupDeleted,
}

/// Remove `username` from a group inside an open transaction.
pub async fn leave_in<C: ConnectionTrait>(txn: &C, group_id: i32, username: &str) -> ServiceResult<LeaveOutcome> {
    let me = participant::find(txn, group_id, username)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No eres miembro de este grupo".into()))?;
    participant::Entity::delete_by_id(me.id).exec(txn).await?;

    let mut remaining = participant::Entity::find()
        .filter(participant::Column::GroupId.eq(group_id))
        .order_by_asc(participant::Column::JoinedAt)
        .order_by_asc(participant::Column::Id)
        .all(txn)
        .await?;
    if remaining.is_empty() {
        let g = require_group(txn, group_id).await?;
        group_request::Entity::delete_many().filter(group_request::Column::GroupId.eq(group_id)).exec(txn).await?;
        message::Entity::delete_many().filter(message::Column::ChatId.eq(g.chat_id)).exec(txn).await?;
        group::Entity::delete_by_id(g.id).exec(txn).await?;
        chat::Entity::delete_by_id(g.chat_id).exec(txn).await?;
        return Ok(LeaveOutcome::GroupDeleted);
    }
    if me.role != ParticipantRole::Creador {
        return Ok(LeaveOutcome::Left);
    }
    let pos = remaining
        .iter()
        .position(|p| p.role == ParticipantRole::Administrador)
        .unwrap_or(0);
    let heir = remaining.swap_remove(pos);
    let heir_name = heir.username.clone();
    let mut am: participant::ActiveModel = heir.into();
    am.role = Set(ParticipantRole::Creador);
    am.update(txn).await?;
    Ok(LeaveOutcome::Promoted(heir_name))
}

#[instrument(skip(db))]
pub async fn leave_group<C>(db: &C, me: &str, group_id: Option<i32>) -> ServiceResult<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let group_id = group_id.ok_or_else(|| ServiceError::Validation("El ID del grupo es obligatorio".into()))?;
    let g = require_group(db, group_id).await?;
    let txn = db.begin().await?;
    let outcome = leave_in(&txn, g.id, me).await?;
    txn.commit().await?;
    info!(%me, group_id = g.id, ?outcome, "group_left");
    Ok(match outcome {
        LeaveOutcome::GroupDeleted => format!("Has abandonado el grupo \"{}\", que ha sido eliminado", g.name),
        _ => format!("Has abandonado el grupo \"{}\"", g.name),
    })
}
