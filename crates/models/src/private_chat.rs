use sea_orm::{entity::prelude::*, Condition, ConnectionTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::chat;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "private_chat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chat_id: i32,
    pub user1: String,
    pub user2: String,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Chat }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Chat => Entity::belongs_to(chat::Entity)
                .from(Column::ChatId)
                .to(chat::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn has_member(&self, username: &str) -> bool {
        self.user1 == username || self.user2 == username
    }

    /// The participant that is not `username`.
    pub fn other(&self, username: &str) -> &str {
        if self.user1 == username { &self.user2 } else { &self.user1 }
    }
}

/// Rows where `a` and `b` are the two members, in either order.
pub fn between(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(Condition::all().add(Column::User1.eq(a)).add(Column::User2.eq(b)))
        .add(Condition::all().add(Column::User1.eq(b)).add(Column::User2.eq(a)))
}

/// Rows where `username` is a member.
pub fn involving(username: &str) -> Condition {
    Condition::any().add(Column::User1.eq(username)).add(Column::User2.eq(username))
}

pub async fn find_between<C: ConnectionTrait>(db: &C, a: &str, b: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(between(a, b)).one(db).await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, chat_id: i32, user1: &str, user2: &str) -> Result<Model, ModelError> {
    if user1 == user2 {
        return Err(ModelError::Validation("a private chat needs two different users".into()));
    }
    let am = ActiveModel { chat_id: Set(chat_id), user1: Set(user1.to_string()), user2: Set(user2.to_string()) };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_member() {
        let m = Model { chat_id: 1, user1: "anna".into(), user2: "pau".into() };
        assert_eq!(m.other("anna"), "pau");
        assert_eq!(m.other("pau"), "anna");
        assert!(m.has_member("pau"));
        assert!(!m.has_member("joan"));
    }
}
