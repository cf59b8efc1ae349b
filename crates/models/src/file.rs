use sea_orm::{entity::prelude::*, sea_query::OnConflict, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::kinds::FileKind;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub path: String,
    pub size: i64,
    pub kind: FileKind,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Register a file path, leaving an existing row untouched.
pub async fn ensure<C: ConnectionTrait>(db: &C, path: &str, size: i64, kind: FileKind) -> Result<(), ModelError> {
    if path.trim().is_empty() {
        return Err(ModelError::Validation("file path required".into()));
    }
    let am = ActiveModel { path: Set(path.to_string()), size: Set(size), kind: Set(kind) };
    Entity::insert(am)
        .on_conflict(OnConflict::column(Column::Path).do_nothing().to_owned())
        .do_nothing()
        .exec(db)
        .await?;
    Ok(())
}
