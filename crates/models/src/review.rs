use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::event;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub event_id: i32,
    pub rating: Option<i16>,
    pub text: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Event }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Event => Entity::belongs_to(event::Entity)
                .from(Column::EventId)
                .to(event::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Row-level rule: rating within 0..=10 when present, and rating or text present.
pub fn validate(rating: Option<i16>, text: Option<&str>) -> Result<(), ModelError> {
    if let Some(r) = rating {
        if !(0..=10).contains(&r) {
            return Err(ModelError::Validation("rating must be within 0..=10".into()));
        }
    }
    let has_text = text.map(|t| !t.trim().is_empty()).unwrap_or(false);
    if rating.is_none() && !has_text {
        return Err(ModelError::Validation("a review needs a rating or a text".into()));
    }
    Ok(())
}

pub async fn find<C: ConnectionTrait>(db: &C, event_id: i32, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::EventId.eq(event_id))
        .filter(Column::Username.eq(username))
        .one(db)
        .await?)
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
    username: &str,
    rating: Option<i16>,
    text: Option<String>,
) -> Result<Model, ModelError> {
    validate(rating, text.as_deref())?;
    let am = ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        event_id: Set(event_id),
        rating: Set(rating),
        text: Set(text.filter(|t| !t.trim().is_empty())),
        created_at: Set(Utc::now().into()),
    };
    Ok(am.insert(db).await?)
}
