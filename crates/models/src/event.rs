use sea_orm::{entity::prelude::*, ConnectionTrait, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::{chat, place};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub ini_date: Date,
    pub end_date: Date,
    pub name: String,
    pub description: Option<String>,
    pub tickets: Option<String>,
    pub schedule: Option<String>,
    pub link: Option<String>,
    pub email: Option<String>,
    pub telefon: Option<String>,
    pub place_id: i32,
    pub chat_id: Option<i32>,
    pub image_path: Option<String>,
    #[sea_orm(unique)]
    pub code_event: i64,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Place,
    Chat,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Place => Entity::belongs_to(place::Entity)
                .from(Column::PlaceId)
                .to(place::Column::Id)
                .into(),
            Relation::Chat => Entity::belongs_to(chat::Entity)
                .from(Column::ChatId)
                .to(chat::Column::Id)
                .into(),
        }
    }
}

impl Related<place::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Place.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_dates(ini: Date, end: Date) -> Result<(), ModelError> {
    if end < ini {
        return Err(ModelError::Validation("end date precedes start date".into()));
    }
    Ok(())
}

pub async fn find_by_code<C: ConnectionTrait>(db: &C, code: i64) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::CodeEvent.eq(code)).one(db).await?)
}
