use sea_orm::{entity::prelude::*, ConnectionTrait, QueryFilter, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::calendar;

pub const DEFAULT_LANGUAGE: &str = "Català";
pub const MAX_DESCRIPTION: usize = 150;
pub const MAX_LOCATION: usize = 50;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub language: String,
    pub profile_photo: Option<String>,
    pub telf: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub calendar_id: Option<i32>,
    pub fcm_token: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Calendar,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Calendar => Entity::belongs_to(calendar::Entity)
                .from(Column::CalendarId)
                .to(calendar::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_username(username: &str) -> Result<(), ModelError> {
    let u = username.trim();
    if u.is_empty() || u.len() > 150 {
        return Err(ModelError::Validation("username must be 1..=150 characters".into()));
    }
    if !u.chars().all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')) {
        return Err(ModelError::Validation("username may only contain letters, digits and @.+-_".into()));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let e = email.trim();
    match e.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ModelError::Validation("invalid email".into())),
    }
}

/// Length limits of the free-text profile fields.
pub fn validate_profile_text(description: Option<&str>, location: Option<&str>) -> Result<(), ModelError> {
    if description.map(|d| d.chars().count() > MAX_DESCRIPTION).unwrap_or(false) {
        return Err(ModelError::Validation(format!("description exceeds {MAX_DESCRIPTION} characters")));
    }
    if location.map(|l| l.chars().count() > MAX_LOCATION).unwrap_or(false) {
        return Err(ModelError::Validation(format!("location exceeds {MAX_LOCATION} characters")));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, username: &str, email: &str) -> Result<Model, ModelError> {
    validate_username(username)?;
    validate_email(email)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.trim().to_string()),
        email: Set(email.trim().to_string()),
        language: Set(DEFAULT_LANGUAGE.to_string()),
        profile_photo: Set(None),
        telf: Set(None),
        description: Set(None),
        location: Set(None),
        calendar_id: Set(None),
        fcm_token: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_username<C: ConnectionTrait>(db: &C, username: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Username.eq(username)).one(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find().filter(Column::Email.eq(email.trim())).one(db).await?)
}
