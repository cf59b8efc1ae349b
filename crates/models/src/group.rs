use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::chat;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub photo: Option<String>,
    #[sea_orm(unique)]
    pub chat_id: i32,
    pub created_at: DateTimeWithTimeZone,
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

pub async fn create<C: ConnectionTrait>(db: &C, name: &str, photo: Option<String>, chat_id: i32) -> Result<Model, ModelError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 255 {
        return Err(ModelError::Validation("group name must be 1..=255 characters".into()));
    }
    let am = ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        photo: Set(photo),
        chat_id: Set(chat_id),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}
