use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::chat;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "message")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub chat_id: i32,
    pub username: String,
    pub sent_at: DateTimeWithTimeZone,
    pub text: Option<String>,
    pub file_path: Option<String>,
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

impl Model {
    /// Body shown in conversation lists.
    pub fn preview(&self) -> String {
        match (&self.text, &self.file_path) {
            (Some(t), _) => t.clone(),
            (None, Some(f)) => f.clone(),
            (None, None) => String::new(),
        }
    }
}

pub fn validate_body(text: Option<&str>, file_path: Option<&str>) -> Result<(), ModelError> {
    let has_text = text.map(|t| !t.trim().is_empty()).unwrap_or(false);
    let has_file = file_path.map(|f| !f.trim().is_empty()).unwrap_or(false);
    if !has_text && !has_file {
        return Err(ModelError::Validation("a message needs text or a file".into()));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    chat_id: i32,
    username: &str,
    text: Option<String>,
    file_path: Option<String>,
) -> Result<Model, ModelError> {
    validate_body(text.as_deref(), file_path.as_deref())?;
    let am = ActiveModel {
        id: NotSet,
        chat_id: Set(chat_id),
        username: Set(username.to_string()),
        sent_at: Set(Utc::now().into()),
        text: Set(text),
        file_path: Set(file_path),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_requires_text_or_file() {
        assert!(validate_body(Some("hola"), None).is_ok());
        assert!(validate_body(None, Some("media/a.png")).is_ok());
        assert!(validate_body(Some("   "), None).is_err());
        assert!(validate_body(None, None).is_err());
    }
}
