use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{calendar, event};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "planned_activity")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_id: i32,
    pub calendar_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Event,
    Calendar,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Event => Entity::belongs_to(event::Entity)
                .from(Column::EventId)
                .to(event::Column::Id)
                .into(),
            Relation::Calendar => Entity::belongs_to(calendar::Entity)
                .from(Column::CalendarId)
                .to(calendar::Column::Id)
                .into(),
        }
    }
}

impl Related<event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub async fn find<C: ConnectionTrait>(db: &C, calendar_id: i32, event_id: i32) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::CalendarId.eq(calendar_id))
        .filter(Column::EventId.eq(event_id))
        .one(db)
        .await?)
}

pub async fn create<C: ConnectionTrait>(db: &C, calendar_id: i32, event_id: i32) -> Result<Model, ModelError> {
    let am = ActiveModel { id: NotSet, event_id: Set(event_id), calendar_id: Set(calendar_id) };
    Ok(am.insert(db).await?)
}
