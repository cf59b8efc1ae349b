use sea_orm::{entity::prelude::*, ConnectionTrait, NotSet, QueryFilter, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;
use crate::kinds::RequestStatus;

/// A join request (`is_invitation = false`) or an invitation sent by a manager.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_request")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    pub username: String,
    pub requested_at: DateTimeWithTimeZone,
    pub status: RequestStatus,
    pub responded_by: Option<String>,
    pub responded_at: Option<DateTimeWithTimeZone>,
    pub is_invitation: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// New pending row; invitations record the inviting manager in `responded_by`.
pub async fn create_pending<C: ConnectionTrait>(
    db: &C,
    group_id: i32,
    username: &str,
    invited_by: Option<&str>,
) -> Result<Model, ModelError> {
    let am = ActiveModel {
        id: NotSet,
        group_id: Set(group_id),
        username: Set(username.to_string()),
        requested_at: Set(Utc::now().into()),
        status: Set(RequestStatus::Pendiente),
        responded_by: Set(invited_by.map(str::to_string)),
        responded_at: Set(None),
        is_invitation: Set(invited_by.is_some()),
    };
    Ok(am.insert(db).await?)
}

/// Resolve a pending row. Older rows with the same terminal status are
/// removed first so the `(group, user, status)` uniqueness holds.
pub async fn resolve<C: ConnectionTrait>(
    db: &C,
    request: Model,
    status: RequestStatus,
    responder: &str,
) -> Result<Model, ModelError> {
    if request.status.is_terminal() {
        return Err(ModelError::Validation("request already answered".into()));
    }
    if !status.is_terminal() {
        return Err(ModelError::Validation("a response must accept or reject".into()));
    }
    Entity::delete_many()
        .filter(Column::GroupId.eq(request.group_id))
        .filter(Column::Username.eq(request.username.clone()))
        .filter(Column::Status.eq(status))
        .exec(db)
        .await?;
    let mut am: ActiveModel = request.into();
    am.status = Set(status);
    am.responded_by = Set(Some(responder.to_string()));
    am.responded_at = Set(Some(Utc::now().into()));
    Ok(am.update(db).await?)
}
