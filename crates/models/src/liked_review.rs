use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Reaction of `reactor` to the review `author` wrote on `event_id`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "liked_review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_id: i32,
    pub author: String,
    pub reactor: String,
    pub is_like: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(db: &C, event_id: i32, author: &str, reactor: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::EventId.eq(event_id))
        .filter(Column::Author.eq(author))
        .filter(Column::Reactor.eq(reactor))
        .one(db)
        .await?)
}

/// Insert or flip a reaction.
pub async fn upsert<C: ConnectionTrait>(db: &C, event_id: i32, author: &str, reactor: &str, is_like: bool) -> Result<Model, ModelError> {
    match find(db, event_id, author, reactor).await? {
        Some(existing) => {
            let mut am: ActiveModel = existing.into();
            am.is_like = Set(is_like);
            Ok(am.update(db).await?)
        }
        None => {
            let am = ActiveModel {
                id: NotSet,
                event_id: Set(event_id),
                author: Set(author.to_string()),
                reactor: Set(reactor.to_string()),
                is_like: Set(is_like),
            };
            Ok(am.insert(db).await?)
        }
    }
}
