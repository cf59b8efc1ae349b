use sea_orm::{entity::prelude::*, Condition, ConnectionTrait, NotSet, QueryFilter, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// `is_friend = true` is an accepted friendship; `false` means `user1` blocked `user2`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendship")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user1: String,
    pub user2: String,
    pub is_friend: bool,
    pub request_id: Option<i32>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn other(&self, username: &str) -> &str {
        if self.user1 == username { &self.user2 } else { &self.user1 }
    }
}

/// Friendship rows linking `a` and `b` in either orientation.
pub fn between(a: &str, b: &str) -> Condition {
    Condition::any()
        .add(Condition::all().add(Column::User1.eq(a)).add(Column::User2.eq(b)))
        .add(Condition::all().add(Column::User1.eq(b)).add(Column::User2.eq(a)))
}

/// Accepted friendships of `username`.
pub fn friends_of(username: &str) -> Condition {
    Condition::all()
        .add(Column::IsFriend.eq(true))
        .add(Condition::any().add(Column::User1.eq(username)).add(Column::User2.eq(username)))
}

pub fn validate(user1: &str, user2: &str, is_friend: bool, request_id: Option<i32>) -> Result<(), ModelError> {
    if user1 == user2 {
        return Err(ModelError::Validation("a user cannot befriend or block themselves".into()));
    }
    if is_friend && request_id.is_none() {
        return Err(ModelError::Validation("a friendship must come from an accepted request".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    user1: &str,
    user2: &str,
    is_friend: bool,
    request_id: Option<i32>,
) -> Result<Model, ModelError> {
    validate(user1, user2, is_friend, request_id)?;
    let am = ActiveModel {
        id: NotSet,
        user1: Set(user1.to_string()),
        user2: Set(user2.to_string()),
        is_friend: Set(is_friend),
        request_id: Set(request_id),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}

/// Block placed by `blocker` on `blocked`, if any.
pub async fn find_block<C: ConnectionTrait>(db: &C, blocker: &str, blocked: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::User1.eq(blocker))
        .filter(Column::User2.eq(blocked))
        .filter(Column::IsFriend.eq(false))
        .one(db)
        .await?)
}

pub async fn find_friendship<C: ConnectionTrait>(db: &C, a: &str, b: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(between(a, b))
        .filter(Column::IsFriend.eq(true))
        .one(db)
        .await?)
}
