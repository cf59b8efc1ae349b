use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::kinds::RequestStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendship_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub requested_at: DateTimeWithTimeZone,
    pub status: RequestStatus,
    pub responded_at: Option<DateTimeWithTimeZone>,
    pub orderer: String,
    pub ordered: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub async fn create_pending<C: ConnectionTrait>(db: &C, orderer: &str, ordered: &str) -> Result<Model, ModelError> {
    if orderer == ordered {
        return Err(ModelError::Validation("cannot send a friendship request to yourself".into()));
    }
    let am = ActiveModel {
        id: NotSet,
        requested_at: Set(Utc::now().into()),
        status: Set(RequestStatus::Pendiente),
        responded_at: Set(None),
        orderer: Set(orderer.to_string()),
        ordered: Set(ordered.to_string()),
    };
    Ok(am.insert(db).await?)
}

/// Move a pending request to a terminal status, stamping the response time.
pub async fn resolve<C: ConnectionTrait>(db: &C, request: Model, status: RequestStatus) -> Result<Model, ModelError> {
    if request.status.is_terminal() {
        return Err(ModelError::Validation("request already answered".into()));
    }
    if !status.is_terminal() {
        return Err(ModelError::Validation("a response must accept or reject".into()));
    }
    let mut am: ActiveModel = request.into();
    am.status = Set(status);
    am.responded_at = Set(Some(Utc::now().into()));
    Ok(am.update(db).await?)
}

pub async fn find_pending<C: ConnectionTrait>(db: &C, orderer: &str, ordered: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Orderer.eq(orderer))
        .filter(Column::Ordered.eq(ordered))
        .filter(Column::Status.eq(RequestStatus::Pendiente))
        .one(db)
        .await?)
}
