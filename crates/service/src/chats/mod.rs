//! Chat containers and their messages.
//!
//! A `chat` row carries the kind discriminator; private chats add a
//! `private_chat` row, groups a `groups` row and events point at theirs
//! through `event.chat_id`. Messages are stamped with the server clock.

pub mod event;
pub mod private;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::utils::time::{date_part, time_part};
use models::message;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;

use crate::errors::{ServiceError, ServiceResult};

pub(crate) fn to_utc(ts: &DateTimeWithTimeZone) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i32,
    pub sender_username: String,
    pub message: String,
    pub date: String,
    pub time: String,
}

impl From<&message::Model> for MessageView {
    fn from(m: &message::Model) -> Self {
        let ts = to_utc(&m.sent_at);
        Self {
            id: m.id,
            sender_username: m.username.clone(),
            message: m.preview(),
            date: date_part(&ts),
            time: time_part(&ts),
        }
    }
}

/// Compact last-message summary used by group and event chat lists.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastMessage {
    pub date: String,
    pub time: String,
    pub username: String,
    pub text: String,
}

impl From<&message::Model> for LastMessage {
    fn from(m: &message::Model) -> Self {
        let ts = to_utc(&m.sent_at);
        Self { date: date_part(&ts), time: time_part(&ts), username: m.username.clone(), text: m.preview() }
    }
}

/// All messages of a chat, oldest first.
pub async fn messages_of<C: ConnectionTrait>(db: &C, chat_id: i32) -> ServiceResult<Vec<MessageView>> {
    let rows = message::Entity::find()
        .filter(message::Column::ChatId.eq(chat_id))
        .order_by_asc(message::Column::SentAt)
        .order_by_asc(message::Column::Id)
        .all(db)
        .await?;
    Ok(rows.iter().map(MessageView::from).collect())
}

/// Newest message of every chat in `chat_ids` that has one.
pub async fn last_messages<C: ConnectionTrait>(db: &C, chat_ids: &[i32]) -> ServiceResult<HashMap<i32, message::Model>> {
    if chat_ids.is_empty() {
        return Ok(HashMap::new());
    }
    // one row per chat; DISTINCT ON keeps the first of each ordered group
    let rows = message::Entity::find()
        .filter(message::Column::ChatId.is_in(chat_ids.iter().copied()))
        .distinct_on([message::Column::ChatId])
        .order_by_asc(message::Column::ChatId)
        .order_by_desc(message::Column::SentAt)
        .order_by_desc(message::Column::Id)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|m| (m.chat_id, m)).collect())
}

/// Insert a text message; blank text is rejected with `missing`.
pub async fn post_text<C: ConnectionTrait>(
    db: &C,
    chat_id: i32,
    username: &str,
    text: Option<&str>,
    missing: &str,
) -> ServiceResult<message::Model> {
    let text = text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Validation(missing.to_string()))?;
    Ok(message::create(db, chat_id, username, Some(text.to_string()), None).await?)
}

/// Order `(key, last activity)` pairs newest first; entries without activity go last.
pub(crate) fn by_recent_activity<T>(items: &mut [(T, Option<DateTime<Utc>>)]) {
    items.sort_by(|a, b| b.1.cmp(&a.1));
}
