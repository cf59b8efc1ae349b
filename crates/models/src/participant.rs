use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::group;
use crate::kinds::ParticipantRole;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    pub username: String,
    pub role: ParticipantRole,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Group }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Group => Entity::belongs_to(group::Entity)
                .from(Column::GroupId)
                .to(group::Column::Id)
                .into(),
        }
    }
}

impl Related<group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(db: &C, group_id: i32, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::GroupId.eq(group_id))
        .filter(Column::Username.eq(username))
        .one(db)
        .await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, group_id: i32, username: &str, role: ParticipantRole) -> Result<Model, ModelError> {
    let am = ActiveModel {
        id: NotSet,
        group_id: Set(group_id),
        username: Set(username.to_string()),
        role: Set(role),
        joined_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}
