use sea_orm::{entity::prelude::*, sea_query::OnConflict, ConnectionTrait, QueryFilter, QuerySelect, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::category;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub event_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Link an event to a category, creating the category when missing.
pub async fn link<C: ConnectionTrait>(db: &C, event_id: i32, name: &str) -> Result<(), ModelError> {
    let name = name.trim();
    if name.is_empty() {
        return Ok(());
    }
    category::ensure(db, name).await?;
    let am = ActiveModel { event_id: Set(event_id), name: Set(name.to_string()) };
    Entity::insert(am)
        .on_conflict(OnConflict::columns([Column::EventId, Column::Name]).do_nothing().to_owned())
        .do_nothing()
        .exec(db)
        .await?;
    Ok(())
}

pub async fn names_for_event<C: ConnectionTrait>(db: &C, event_id: i32) -> Result<Vec<String>, ModelError> {
    Ok(Entity::find()
        .select_only()
        .column(Column::Name)
        .filter(Column::EventId.eq(event_id))
        .into_tuple::<String>()
        .all(db)
        .await?)
}
