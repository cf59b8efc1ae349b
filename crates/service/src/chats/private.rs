//! One-to-one conversations.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use common::utils::time::relative_label;
use models::kinds::ChatKind;
use models::{chat, private_chat, user};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{last_messages, messages_of, post_text, to_utc, MessageView};
use crate::errors::{ServiceError, ServiceResult};
use crate::friendships::{blocked_either_way, friend_usernames};
use crate::notifications::{notify_user, push_data, Delivery, PushNotifier};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatListItem {
    pub id: Option<i32>,
    pub user_id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<String>,
    pub has_chat: bool,
    pub has_messages: bool,
}

async fn users_by_name<C: ConnectionTrait>(db: &C, names: Vec<String>) -> ServiceResult<Vec<user::Model>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    Ok(user::Entity::find().filter(user::Column::Username.is_in(names)).all(db).await?)
}

/// My private chats: those with messages (newest first), then silent ones
/// by the other user's name, then friends I have no chat with yet.
pub async fn list_chats<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<Vec<ChatListItem>> {
    let chats = private_chat::Entity::find().filter(private_chat::involving(me)).all(db).await?;
    let ids: Vec<i32> = chats.iter().map(|c| c.chat_id).collect();
    let latest = last_messages(db, &ids).await?;

    let mut names: Vec<String> = chats.iter().map(|c| c.other(me).to_string()).collect();
    let with_chat: HashSet<String> = names.iter().cloned().collect();
    let mut friends: Vec<String> = friend_usernames(db, me)
        .await?
        .into_iter()
        .filter(|f| !with_chat.contains(f))
        .collect();
    names.extend(friends.iter().cloned());
    let users = users_by_name(db, names).await?;
    let id_of = |name: &str| users.iter().find(|u| u.username == name).map(|u| u.id);

    let mut active: Vec<(ChatListItem, DateTime<Utc>)> = Vec::new();
    let mut silent: Vec<ChatListItem> = Vec::new();
    for c in &chats {
        let other = c.other(me);
        let Some(user_id) = id_of(other) else { continue };
        match latest.get(&c.chat_id) {
            Some(m) => {
                let ts = to_utc(&m.sent_at);
                active.push((
                    ChatListItem {
                        id: Some(c.chat_id),
                        user_id,
                        username: other.to_string(),
                        last_message: Some(m.preview()),
                        last_message_time: Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
                        has_chat: true,
                        has_messages: true,
                    },
                    ts,
                ));
            }
            None => silent.push(ChatListItem {
                id: Some(c.chat_id),
                user_id,
                username: other.to_string(),
                last_message: None,
                last_message_time: None,
                has_chat: true,
                has_messages: false,
            }),
        }
    }
    active.sort_by(|a, b| b.1.cmp(&a.1));
    silent.sort_by_key(|i| i.username.to_lowercase());
    friends.sort_by_key(|f| f.to_lowercase());

    let mut out: Vec<ChatListItem> = active.into_iter().map(|(item, _)| item).collect();
    out.extend(silent);
    out.extend(friends.iter().filter_map(|f| {
        id_of(f).map(|user_id| ChatListItem {
            id: None,
            user_id,
            username: f.clone(),
            last_message: None,
            last_message_time: None,
            has_chat: false,
            has_messages: false,
        })
    }));
    Ok(out)
}

/// The private chat `chat_id`, checked for my membership.
async fn member_chat<C: ConnectionTrait>(db: &C, me: &str, chat_id: i32) -> ServiceResult<private_chat::Model> {
    let pc = private_chat::Entity::find_by_id(chat_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Chat no encontrado".into()))?;
    if !pc.has_member(me) {
        return Err(ServiceError::Forbidden("No tienes permiso para acceder a este chat".into()));
    }
    Ok(pc)
}

pub async fn chat_messages<C: ConnectionTrait>(db: &C, me: &str, chat_id: i32) -> ServiceResult<Vec<MessageView>> {
    member_chat(db, me, chat_id).await?;
    messages_of(db, chat_id).await
}

/// Post into a private chat and tell the other member. With the app in the
/// foreground the push is data-only so the open conversation refreshes.
#[instrument(skip(db, notifier, text))]
pub async fn send_message<C: ConnectionTrait>(
    db: &C,
    notifier: &dyn PushNotifier,
    me: &str,
    chat_id: Option<i32>,
    text: Option<&str>,
    is_foreground: bool,
) -> ServiceResult<MessageView> {
    let chat_id = chat_id.ok_or_else(|| ServiceError::Validation("Parametros obligatorios".into()))?;
    let pc = member_chat(db, me, chat_id).await?;
    let msg = post_text(db, chat_id, me, text, "Parametros obligatorios").await?;
    info!(%me, chat_id, "private_message_sent");

    let body = msg.preview();
    let data = push_data([
        ("type", "new_message".to_string()),
        ("chat_id", chat_id.to_string()),
        ("sender_username", me.to_string()),
        ("text", body.clone()),
    ]);
    let title = format!("Nuevo mensaje de {me}");
    let delivery = if is_foreground { Delivery::DataOnly } else { Delivery::Visible { title: &title, body: &body } };
    notify_user(db, notifier, pc.other(me), delivery, data).await;
    Ok(MessageView::from(&msg))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreatedChat {
    pub chat_id: i32,
    pub username: String,
    pub exists: bool,
}

/// Open (or reuse) the private chat with the user whose id is `to_user_id`.
#[instrument(skip(db))]
pub async fn create_chat<C>(db: &C, me: &str, to_user_id: Option<Uuid>) -> ServiceResult<CreatedChat>
where
    C: ConnectionTrait + TransactionTrait,
{
    let to_user_id = to_user_id.ok_or_else(|| ServiceError::Validation("Falta el parametro to_user_id".into()))?;
    let other = user::Entity::find_by_id(to_user_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Usuario destino no encontrado".into()))?;
    if other.username == me {
        return Err(ServiceError::Validation("No puedes crear un chat contigo mismo".into()));
    }
    if blocked_either_way(db, me, &other.username).await? {
        return Err(ServiceError::Forbidden("No puedes chatear con este usuario".into()));
    }
    if let Some(existing) = private_chat::find_between(db, me, &other.username).await? {
        return Ok(CreatedChat { chat_id: existing.chat_id, username: other.username, exists: true });
    }
    let txn = db.begin().await?;
    let c = chat::create(&txn, ChatKind::PrivateChat).await?;
    private_chat::create(&txn, c.id, me, &other.username).await?;
    txn.commit().await?;
    info!(%me, with = %other.username, chat_id = c.id, "private_chat_created");
    Ok(CreatedChat { chat_id: c.id, username: other.username, exists: false })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserChatItem {
    pub id: Uuid,
    pub username: String,
    #[serde(rename = "has_chat")]
    pub has_chat: bool,
    #[serde(rename = "chat_id", skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sender: Option<String>,
}

/// Everyone else: users I share a chat with by last activity, then the rest
/// alphabetically.
pub async fn users_by_chats<C: ConnectionTrait>(db: &C, me: &str, now: DateTime<Utc>) -> ServiceResult<Vec<UserChatItem>> {
    let chats = private_chat::Entity::find().filter(private_chat::involving(me)).all(db).await?;
    let ids: Vec<i32> = chats.iter().map(|c| c.chat_id).collect();
    let latest = last_messages(db, &ids).await?;
    let mut everyone = user::Entity::find().filter(user::Column::Username.ne(me)).all(db).await?;
    everyone.sort_by_key(|u| u.username.to_lowercase());

    let mut with_chat: Vec<(UserChatItem, Option<DateTime<Utc>>)> = Vec::new();
    let mut seen = HashSet::new();
    for c in &chats {
        let other = c.other(me);
        let Some(u) = everyone.iter().find(|u| u.username == other) else { continue };
        seen.insert(u.username.clone());
        let last = latest.get(&c.chat_id);
        let ts = last.map(|m| to_utc(&m.sent_at));
        with_chat.push((
            UserChatItem {
                id: u.id,
                username: u.username.clone(),
                has_chat: true,
                chat_id: Some(c.chat_id),
                last_message: Some(last.map(|m| m.preview()).unwrap_or_default()),
                time: Some(ts.map(|t| relative_label(&t, &now)).unwrap_or_default()),
                last_sender: last.map(|m| m.username.clone()),
            },
            ts,
        ));
    }
    super::by_recent_activity(&mut with_chat);

    let mut out: Vec<UserChatItem> = with_chat.into_iter().map(|(item, _)| item).collect();
    out.extend(everyone.into_iter().filter(|u| !seen.contains(&u.username)).map(|u| UserChatItem {
        id: u.id,
        username: u.username,
        has_chat: false,
        chat_id: None,
        last_message: None,
        time: None,
        last_sender: None,
    }));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::friendships::{block_user, send_request};
    use crate::notifications::MockNotifier;
    use crate::test_support::{get_db, make_user};

    #[test]
    fn list_item_uses_camel_case() {
        let item = ChatListItem {
            id: None,
            user_id: Uuid::nil(),
            username: "pau".into(),
            last_message: None,
            last_message_time: None,
            has_chat: false,
            has_messages: false,
        };
        let v = serde_json::to_value(item).unwrap();
        assert!(v.get("userId").is_some());
        assert!(v["id"].is_null());
        assert!(v.get("lastMessage").is_none());
    }

    #[tokio::test]
    async fn create_send_and_list() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "ca").await?;
        let b = make_user(&db, "cb").await?;
        let c = make_user(&db, "cc").await?;
        let b_id = user::find_by_username(&db, &b).await?.map(|u| u.id);
        let a_id = user::find_by_username(&db, &a).await?.map(|u| u.id);
        crate::accounts::save_fcm_token(&db, &b, Some("tok-b")).await?;

        assert!(matches!(create_chat(&db, &a, a_id).await, Err(ServiceError::Validation(_))));
        let created = create_chat(&db, &a, b_id).await?;
        assert!(!created.exists);
        let again = create_chat(&db, &b, a_id).await?;
        assert!(again.exists);
        assert_eq!(again.chat_id, created.chat_id);

        let notifier = MockNotifier::default();
        send_message(&db, &notifier, &a, Some(created.chat_id), Some("hola"), false).await?;
        send_message(&db, &notifier, &a, Some(created.chat_id), Some("ets aquí?"), true).await?;
        let sent = notifier.sent_of_type("new_message");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].title.as_deref(), Some(format!("Nuevo mensaje de {a}").as_str()));
        assert!(sent[1].title.is_none());

        let msgs = chat_messages(&db, &b, created.chat_id).await?;
        assert_eq!(msgs.iter().map(|m| m.message.as_str()).collect::<Vec<_>>(), vec!["hola", "ets aquí?"]);
        assert!(matches!(chat_messages(&db, &c, created.chat_id).await, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            send_message(&db, &notifier, &a, Some(created.chat_id), Some("  "), false).await,
            Err(ServiceError::Validation(_))
        ));

        let list = list_chats(&db, &a).await?;
        assert_eq!(list[0].id, Some(created.chat_id));
        assert_eq!(list[0].last_message.as_deref(), Some("ets aquí?"));

        let by_chats = users_by_chats(&db, &a, Utc::now()).await?;
        assert_eq!(by_chats[0].username, b);
        assert_eq!(by_chats[0].last_sender.as_deref(), Some(a.as_str()));
        assert!(by_chats.iter().skip(1).all(|u| !u.has_chat));

        // the rest ignore case, like the plain user listing
        make_user(&db, "Mixed").await?;
        let rest: Vec<String> = users_by_chats(&db, &a, Utc::now()).await?
            .iter()
            .skip(1)
            .map(|u| u.username.to_lowercase())
            .collect();
        let mut sorted = rest.clone();
        sorted.sort();
        assert_eq!(rest, sorted);
        Ok(())
    }

    #[tokio::test]
    async fn friends_without_chat_listed_last_and_blocks_respected() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "la").await?;
        let b = make_user(&db, "lb").await?;
        let c = make_user(&db, "lc").await?;
        send_request(&db, &a, Some(&b)).await?;
        send_request(&db, &b, Some(&a)).await?;

        let list = list_chats(&db, &a).await?;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, None);
        assert_eq!(list[0].username, b);

        block_user(&db, &c, Some(&a)).await?;
        let c_id = user::find_by_username(&db, &c).await?.map(|u| u.id);
        assert!(matches!(create_chat(&db, &a, c_id).await, Err(ServiceError::Forbidden(_))));
        Ok(())
    }
}
