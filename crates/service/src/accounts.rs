//! Profiles, account deletion, device tokens and the reset-mail flow.

use std::path::Path;

use chrono::Utc;
use models::kinds::FileKind;
use models::{
    calendar, chat, file, friendship, friendship_request, group_request, liked_review, message, participant,
    planned_activity, preferred_field, private_chat, review, user, user_credentials,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::repository::AuthRepository;
use crate::auth::AuthService;
use crate::errors::{ServiceError, ServiceResult};
use crate::mail::{Mailer, OutgoingMail};

pub const RESET_SUBJECT: &str = "Recuperación de contraseña";

/// Look a user up by username; 404 with the message the friendship and chat
/// endpoints use.
pub async fn require_user<C: ConnectionTrait>(db: &C, username: &str) -> ServiceResult<user::Model> {
    user::find_by_username(db, username)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("No existe un usuario con nombre \"{username}\"")))
}

/// True while `uid` still names the account called `username`. Tokens of
/// deleted or re-registered accounts fail this.
pub async fn session_is_live<C: ConnectionTrait>(db: &C, uid: uuid::Uuid, username: &str) -> ServiceResult<bool> {
    Ok(user::Entity::find_by_id(uid).one(db).await?.is_some_and(|u| u.username == username))
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListItem {
    pub id: uuid::Uuid,
    pub username: String,
}

/// Everyone except `me`, ordered case-insensitively by username.
pub async fn list_users<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<Vec<UserListItem>> {
    let mut users: Vec<UserListItem> = user::Entity::find()
        .filter(user::Column::Username.ne(me))
        .all(db)
        .await?
        .into_iter()
        .map(|u| UserListItem { id: u.id, username: u.username })
        .collect();
    users.sort_by_key(|u| u.username.to_lowercase());
    Ok(users)
}

/// Public path of a stored photo: `media/<file name>`.
pub fn photo_url(path: Option<&str>) -> Option<String> {
    let p = path?;
    let name = Path::new(p).file_name()?.to_string_lossy();
    Some(format!("media/{name}"))
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub profilephoto: Option<String>,
    pub telf: Option<String>,
    pub language: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub preferred_fields: Vec<String>,
}

async fn preferred_fields_of<C: ConnectionTrait>(db: &C, username: &str) -> ServiceResult<Vec<String>> {
    Ok(preferred_field::Entity::find()
        .filter(preferred_field::Column::Username.eq(username))
        .order_by_asc(preferred_field::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect())
}

async fn profile_view<C: ConnectionTrait>(db: &C, u: user::Model, with_email: bool) -> ServiceResult<ProfileView> {
    let preferred_fields = preferred_fields_of(db, &u.username).await?;
    Ok(ProfileView {
        profilephoto: photo_url(u.profile_photo.as_deref()),
        email: with_email.then_some(u.email),
        username: u.username,
        telf: u.telf,
        language: u.language,
        description: u.description,
        location: u.location,
        preferred_fields,
    })
}

pub async fn my_profile<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<ProfileView> {
    let u = require_user(db, me).await?;
    profile_view(db, u, true).await
}

/// Someone else's profile; hidden when they blocked me.
pub async fn user_profile<C: ConnectionTrait>(db: &C, me: &str, username: &str) -> ServiceResult<ProfileView> {
    let target = user::find_by_username(db, username)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Usuario {username} no encontrado")))?;
    if friendship::find_block(db, &target.username, me).await?.is_some() {
        return Err(ServiceError::Forbidden("No tienes permiso para ver este perfil".into()));
    }
    profile_view(db, target, false).await
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub language: Option<String>,
    pub telf: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub preferred_fields: Option<Vec<String>>,
}

#[instrument(skip(db, update))]
pub async fn edit_profile<C>(db: &C, me: &str, update: ProfileUpdate) -> ServiceResult<ProfileView>
where
    C: ConnectionTrait + TransactionTrait,
{
    let current = require_user(db, me).await?;
    user::validate_profile_text(update.description.as_deref(), update.location.as_deref())?;

    let txn = db.begin().await?;
    let mut am: user::ActiveModel = current.clone().into();
    if let Some(email) = update.email.as_deref().map(str::trim) {
        if email != current.email {
            user::validate_email(email)?;
            if let Some(other) = user::find_by_email(&txn, email).await? {
                if other.id != current.id {
                    return Err(ServiceError::Conflict("Este email ya esta registrado".into()));
                }
            }
            am.email = Set(email.to_string());
        }
    }
    if let Some(language) = update.language.filter(|l| !l.trim().is_empty()) {
        am.language = Set(language);
    }
    if let Some(telf) = update.telf {
        am.telf = Set(Some(telf).filter(|t| !t.trim().is_empty()));
    }
    if let Some(description) = update.description {
        am.description = Set(Some(description));
    }
    if let Some(location) = update.location {
        am.location = Set(Some(location));
    }
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(&txn).await?;

    if let Some(fields) = update.preferred_fields {
        preferred_field::Entity::delete_many()
            .filter(preferred_field::Column::Username.eq(me))
            .exec(&txn)
            .await?;
        let mut names: Vec<String> = fields.into_iter().map(|f| f.trim().to_string()).filter(|f| !f.is_empty()).collect();
        names.sort();
        names.dedup();
        for name in names {
            models::field::ensure(&txn, &name).await?;
            preferred_field::ActiveModel { username: Set(me.to_string()), name: Set(name) }
                .insert(&txn)
                .await?;
        }
    }
    txn.commit().await?;
    info!(username = %me, "profile_updated");
    profile_view(db, updated, true).await
}

/// Write an uploaded photo into the media directory and attach it to my
/// profile. The previous photo file is removed.
#[instrument(skip(db, bytes))]
pub async fn store_profile_photo<C: ConnectionTrait>(
    db: &C,
    media_dir: &str,
    me: &str,
    original_name: &str,
    bytes: &[u8],
) -> ServiceResult<ProfileView> {
    let current = require_user(db, me).await?;
    let base = Path::new(original_name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ServiceError::Validation("Nombre de archivo inválido".into()))?;
    let filename = format!("{me}_{base}");

    if let Some(old) = current.profile_photo.as_deref().filter(|old| *old != filename) {
        let old_path = Path::new(media_dir).join(old);
        if let Err(e) = tokio::fs::remove_file(&old_path).await {
            warn!(path = %old_path.display(), error = %e, "old profile photo not removed");
        }
    }
    let target = Path::new(media_dir).join(&filename);
    tokio::fs::write(&target, bytes)
        .await
        .map_err(|e| ServiceError::Internal(format!("cannot write {}: {e}", target.display())))?;
    file::ensure(db, &filename, bytes.len() as i64, FileKind::Image).await?;

    let mut am: user::ActiveModel = current.into();
    am.profile_photo = Set(Some(filename));
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(username = %me, "profile_photo_stored");
    profile_view(db, updated, true).await
}

#[instrument(skip(db, token))]
pub async fn save_fcm_token<C: ConnectionTrait>(db: &C, me: &str, token: Option<&str>) -> ServiceResult<()> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Validation("No se proporcionó el token FCM.".into()))?;
    let u = require_user(db, me).await?;
    let mut am: user::ActiveModel = u.into();
    am.fcm_token = Set(Some(token.to_string()));
    am.update(db).await?;
    info!(username = %me, "fcm_token_saved");
    Ok(())
}

/// Remove my account and every row keyed by my username.
#[instrument(skip(db))]
pub async fn delete_account<C>(db: &C, me: &str) -> ServiceResult<String>
where
    C: ConnectionTrait + TransactionTrait,
{
    let u = require_user(db, me).await?;
    let txn = db.begin().await?;

    let private_ids: Vec<i32> = private_chat::Entity::find()
        .filter(private_chat::involving(me))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| p.chat_id)
        .collect();
    if !private_ids.is_empty() {
        message::Entity::delete_many().filter(message::Column::ChatId.is_in(private_ids.clone())).exec(&txn).await?;
        private_chat::Entity::delete_many().filter(private_chat::Column::ChatId.is_in(private_ids.clone())).exec(&txn).await?;
        chat::Entity::delete_many().filter(chat::Column::Id.is_in(private_ids)).exec(&txn).await?;
    }
    message::Entity::delete_many().filter(message::Column::Username.eq(me)).exec(&txn).await?;

    liked_review::Entity::delete_many()
        .filter(Condition::any().add(liked_review::Column::Author.eq(me)).add(liked_review::Column::Reactor.eq(me)))
        .exec(&txn)
        .await?;
    review::Entity::delete_many().filter(review::Column::Username.eq(me)).exec(&txn).await?;

    let memberships = participant::Entity::find().filter(participant::Column::Username.eq(me)).all(&txn).await?;
    for m in memberships {
        crate::groups::leave_in(&txn, m.group_id, me).await?;
    }
    group_request::Entity::delete_many().filter(group_request::Column::Username.eq(me)).exec(&txn).await?;

    friendship::Entity::delete_many()
        .filter(Condition::any().add(friendship::Column::User1.eq(me)).add(friendship::Column::User2.eq(me)))
        .exec(&txn)
        .await?;
    friendship_request::Entity::delete_many()
        .filter(
            Condition::any()
                .add(friendship_request::Column::Orderer.eq(me))
                .add(friendship_request::Column::Ordered.eq(me)),
        )
        .exec(&txn)
        .await?;
    preferred_field::Entity::delete_many().filter(preferred_field::Column::Username.eq(me)).exec(&txn).await?;
    user_credentials::Entity::delete_many().filter(user_credentials::Column::UserId.eq(u.id)).exec(&txn).await?;

    let calendar_id = u.calendar_id;
    user::Entity::delete_by_id(u.id).exec(&txn).await?;
    if let Some(cid) = calendar_id {
        planned_activity::Entity::delete_many().filter(planned_activity::Column::CalendarId.eq(cid)).exec(&txn).await?;
        calendar::Entity::delete_by_id(cid).exec(&txn).await?;
    }
    txn.commit().await?;
    info!(username = %me, "account_deleted");
    Ok(format!("La cuenta '{me}' ha sido eliminada correctamente."))
}

/// Build a reset link for `email` and mail it.
#[instrument(skip(auth, mailer))]
pub async fn send_password_reset_email<R: AuthRepository>(
    auth: &AuthService<R>,
    mailer: &dyn Mailer,
    from: &str,
    email: Option<&str>,
    frontend_base_url: &str,
) -> ServiceResult<()> {
    let email = email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ServiceError::Validation("El email es obligatorio".into()))?;
    let link = auth.password_reset_link(email, frontend_base_url).await?;
    mailer
        .send(OutgoingMail {
            from: from.to_string(),
            to: email.to_string(),
            subject: RESET_SUBJECT.to_string(),
            text: format!("Usa este enlace para recuperar tu contraseña: {}", link.url),
        })
        .await?;
    info!("password_reset_mail_sent");
    Ok(())
}
