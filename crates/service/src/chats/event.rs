//! Public chat attached to each event.

use std::collections::HashSet;

use models::kinds::ChatKind;
use models::{chat, event, message};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};

use super::{last_messages, messages_of, post_text, to_utc, LastMessage, MessageView};
use crate::errors::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Serialize)]
pub struct JoinedEventChat {
    pub chat_id: i32,
    pub is_new: bool,
    pub event_name: String,
    pub message: String,
}

/// Join the chat of `event_id`, creating it when the event has none.
#[instrument(skip(db))]
pub async fn join<C>(db: &C, me: &str, event_id: Option<i32>) -> ServiceResult<JoinedEventChat>
where
    C: ConnectionTrait + TransactionTrait,
{
    let event_id = event_id.ok_or_else(|| ServiceError::Validation("Falta el parámetro event_id".into()))?;
    let ev = event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No existe un evento con ID {event_id}")))?;

    let existing = match ev.chat_id {
        Some(id) => chat::find_of_kind(db, id, ChatKind::EventChat).await?,
        None => None,
    };
    let (chat_id, is_new) = match existing {
        Some(c) => (c.id, false),
        None => {
            let txn = db.begin().await?;
            let c = chat::create(&txn, ChatKind::EventChat).await?;
            let mut am: event::ActiveModel = ev.clone().into();
            am.chat_id = Set(Some(c.id));
            am.update(&txn).await?;
            txn.commit().await?;
            info!(event_id, chat_id = c.id, "event_chat_created");
            (c.id, true)
        }
    };
    info!(%me, event_id, chat_id, "event_chat_joined");
    Ok(JoinedEventChat {
        chat_id,
        is_new,
        event_name: ev.name,
        message: "Te has unido al chat del evento exitosamente".into(),
    })
}

async fn require_event_chat<C: ConnectionTrait>(db: &C, chat_id: i32) -> ServiceResult<chat::Model> {
    let c = chat::Entity::find_by_id(chat_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Chat de evento no encontrado".into()))?;
    if c.kind != ChatKind::EventChat {
        return Err(ServiceError::Validation("El chat especificado no es un chat de evento".into()));
    }
    Ok(c)
}

#[derive(Debug, Clone, Serialize)]
pub struct EventMessages {
    pub message: String,
    pub messages: Vec<MessageView>,
}

pub async fn messages<C: ConnectionTrait>(db: &C, chat_id: i32) -> ServiceResult<EventMessages> {
    require_event_chat(db, chat_id).await?;
    let messages = messages_of(db, chat_id).await?;
    let message = if messages.is_empty() {
        "No hay mensajes en este chat todavía".to_string()
    } else {
        format!("Se encontraron {} mensajes", messages.len())
    };
    Ok(EventMessages { message, messages })
}

#[instrument(skip(db, text))]
pub async fn send<C: ConnectionTrait>(db: &C, me: &str, chat_id: Option<i32>, text: Option<&str>) -> ServiceResult<MessageView> {
    const MISSING: &str = "Parámetros obligatorios: chat_id y message";
    let chat_id = chat_id.ok_or_else(|| ServiceError::Validation(MISSING.into()))?;
    require_event_chat(db, chat_id).await?;
    let msg = post_text(db, chat_id, me, text, MISSING).await?;
    info!(%me, chat_id, "event_message_sent");
    Ok(MessageView::from(&msg))
}

#[derive(Debug, Clone, Serialize)]
pub struct EventChatSummary {
    pub event_id: i32,
    pub event_name: String,
    pub chat_id: i32,
    pub last_message: Option<LastMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MyEventChats {
    pub message: String,
    pub event_chats: Vec<EventChatSummary>,
}

/// Event chats I have posted in, most recently active first.
pub async fn my_chats<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<MyEventChats> {
    let chat_ids: Vec<i32> = message::Entity::find()
        .select_only()
        .column(message::Column::ChatId)
        .filter(message::Column::Username.eq(me))
        .distinct()
        .into_tuple::<i32>()
        .all(db)
        .await?;
    let unique: HashSet<i32> = chat_ids.into_iter().collect();
    if unique.is_empty() {
        return Ok(MyEventChats { message: "No tienes chats de eventos activos".into(), event_chats: Vec::new() });
    }
    let ids: Vec<i32> = unique.into_iter().collect();
    let event_chat_ids: Vec<i32> = chat::Entity::find()
        .filter(chat::Column::Id.is_in(ids))
        .filter(chat::Column::Kind.eq(ChatKind::EventChat))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let events = event::Entity::find()
        .filter(event::Column::ChatId.is_in(event_chat_ids.clone()))
        .all(db)
        .await?;
    let latest = last_messages(db, &event_chat_ids).await?;

    let mut rows: Vec<(EventChatSummary, _)> = events
        .into_iter()
        .filter_map(|ev| {
            let chat_id = ev.chat_id?;
            let last = latest.get(&chat_id);
            Some((
                EventChatSummary { event_id: ev.id, event_name: ev.name, chat_id, last_message: last.map(LastMessage::from) },
                last.map(|m| to_utc(&m.sent_at)),
            ))
        })
        .collect();
    super::by_recent_activity(&mut rows);
    let event_chats: Vec<EventChatSummary> = rows.into_iter().map(|(s, _)| s).collect();
    if event_chats.is_empty() {
        return Ok(MyEventChats { message: "No tienes chats de eventos activos".into(), event_chats });
    }
    Ok(MyEventChats { message: format!("Se encontraron {} chats de eventos", event_chats.len()), event_chats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, make_event, make_user};
    use chrono::NaiveDate;

    #[tokio::test]
    async fn join_post_and_list() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let me = make_user(&db, "ev").await?;
        let d = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap_or_default();
        let ev = make_event(&db, "Festa Major", 41.98, 2.82, d, d).await?;

        let joined = join(&db, &me, Some(ev.id)).await?;
        assert!(!joined.is_new);
        assert_eq!(Some(joined.chat_id), ev.chat_id);
        assert!(matches!(join(&db, &me, Some(-1)).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(join(&db, &me, None).await, Err(ServiceError::Validation(_))));

        assert_eq!(messages(&db, joined.chat_id).await?.messages.len(), 0);
        send(&db, &me, Some(joined.chat_id), Some("Algú hi va?")).await?;
        let listed = messages(&db, joined.chat_id).await?;
        assert_eq!(listed.messages.len(), 1);
        assert_eq!(listed.messages[0].sender_username, me);

        let mine = my_chats(&db, &me).await?;
        assert_eq!(mine.event_chats.len(), 1);
        assert_eq!(mine.event_chats[0].event_id, ev.id);
        Ok(())
    }

    #[tokio::test]
    async fn non_event_chats_rejected() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let me = make_user(&db, "ne").await?;
        let c = chat::create(&db, ChatKind::GroupChat).await?;
        assert!(matches!(messages(&db, c.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(send(&db, &me, Some(c.id), Some("x")).await, Err(ServiceError::Validation(_))));
        Ok(())
    }
}
