use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::kinds::ChatKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chat")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub kind: ChatKind,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create<C: ConnectionTrait>(db: &C, kind: ChatKind) -> Result<Model, ModelError> {
    Ok(ActiveModel { id: NotSet, kind: Set(kind) }.insert(db).await?)
}

/// Fetch a chat and check its discriminator.
pub async fn find_of_kind<C: ConnectionTrait>(db: &C, id: i32, kind: ChatKind) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find_by_id(id).one(db).await?.filter(|c| c.kind == kind))
}
