use sea_orm::{entity::prelude::*, ConnectionTrait, DbBackend, Statement};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "calendar")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A calendar row has no payload besides its serial id.
pub async fn create<C: ConnectionTrait>(db: &C) -> Result<Model, ModelError> {
    let stmt = Statement::from_string(DbBackend::Postgres, "INSERT INTO calendar DEFAULT VALUES RETURNING id");
    Entity::find()
        .from_raw_sql(stmt)
        .one(db)
        .await?
        .ok_or_else(|| ModelError::Db("calendar insert returned no row".into()))
}
