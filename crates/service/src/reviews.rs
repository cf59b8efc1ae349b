//! Event reviews and the like/dislike reactions on them.
//!
//! A reaction is keyed by `(event, author, reactor)`, so a review is
//! identified by its event and its author's username.

use std::collections::HashMap;

use models::{event, liked_review, review, user};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::errors::{ServiceError, ServiceResult};
use crate::notifications::{notify_user, push_data, Delivery, PushNotifier};

pub const NO_REVIEWS: &str = "No hay reseñas para este evento";
pub const NO_USER_REVIEWS: &str = "Este usuario no ha escrito reseñas";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReviewView {
    pub id: i32,
    pub username: String,
    pub event_id: i32,
    pub rating: Option<i16>,
    pub text: Option<String>,
    pub likes_count: u64,
    pub dislikes_count: u64,
    /// The viewer's own reaction, if any.
    pub user_liked: Option<bool>,
}

impl ReviewView {
    fn score(&self) -> (i64, u64) {
        (self.likes_count as i64 - self.dislikes_count as i64, self.likes_count + self.dislikes_count)
    }
}

/// A review list, or the informative message used when there is none.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReviewListing {
    Empty { mensaje: String },
    Reviews(Vec<ReviewView>),
}

impl ReviewListing {
    fn from_views(views: Vec<ReviewView>, empty: &str) -> Self {
        if views.is_empty() {
            Self::Empty { mensaje: empty.to_string() }
        } else {
            Self::Reviews(views)
        }
    }
}

/// Best balance first; ties go to the review with more votes.
pub fn rank_by_reactions(views: &mut [ReviewView]) {
    views.sort_by(|a, b| b.score().cmp(&a.score()));
}

async fn require_event<C: ConnectionTrait>(db: &C, event_id: i32) -> ServiceResult<event::Model> {
    event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Evento no encontrado".into()))
}

async fn require_review<C: ConnectionTrait>(db: &C, event_id: i32, author: &str) -> ServiceResult<review::Model> {
    review::find(db, event_id, author)
        .await?
        .ok_or_else(|| ServiceError::NotFound("La reseña no existe".into()))
}

#[derive(Default, Clone, Copy)]
struct Tally {
    likes: u64,
    dislikes: u64,
    mine: Option<bool>,
}

/// Attach reaction counts and the viewer's reaction to each review.
async fn with_reactions<C: ConnectionTrait>(
    db: &C,
    reviews: Vec<review::Model>,
    viewer: Option<&str>,
) -> ServiceResult<Vec<ReviewView>> {
    if reviews.is_empty() {
        return Ok(Vec::new());
    }
    let event_ids: Vec<i32> = reviews.iter().map(|r| r.event_id).collect();
    let authors: Vec<String> = reviews.iter().map(|r| r.username.clone()).collect();
    let reactions = liked_review::Entity::find()
        .filter(liked_review::Column::EventId.is_in(event_ids))
        .filter(liked_review::Column::Author.is_in(authors))
        .all(db)
        .await?;
    let mut tallies: HashMap<(i32, String), Tally> = HashMap::new();
    for r in reactions {
        let t = tallies.entry((r.event_id, r.author.clone())).or_default();
        if r.is_like {
            t.likes += 1;
        } else {
            t.dislikes += 1;
        }
        if viewer == Some(r.reactor.as_str()) {
            t.mine = Some(r.is_like);
        }
    }
    Ok(reviews
        .into_iter()
        .map(|r| {
            let t = tallies.get(&(r.event_id, r.username.clone())).copied().unwrap_or_default();
            ReviewView {
                id: r.id,
                username: r.username,
                event_id: r.event_id,
                rating: r.rating,
                text: r.text,
                likes_count: t.likes,
                dislikes_count: t.dislikes,
                user_liked: t.mine,
            }
        })
        .collect())
}

async fn reviews_of_event<C: ConnectionTrait>(db: &C, event_id: i32, viewer: Option<&str>) -> ServiceResult<Vec<ReviewView>> {
    require_event(db, event_id).await?;
    let rows = review::Entity::find()
        .filter(review::Column::EventId.eq(event_id))
        .order_by_asc(review::Column::CreatedAt)
        .order_by_asc(review::Column::Id)
        .all(db)
        .await?;
    with_reactions(db, rows, viewer).await
}

pub async fn list_reviews<C: ConnectionTrait>(db: &C, event_id: i32, viewer: Option<&str>) -> ServiceResult<ReviewListing> {
    let views = reviews_of_event(db, event_id, viewer).await?;
    Ok(ReviewListing::from_views(views, NO_REVIEWS))
}

pub async fn sorted_reviews<C: ConnectionTrait>(db: &C, event_id: i32, viewer: Option<&str>) -> ServiceResult<ReviewListing> {
    let mut views = reviews_of_event(db, event_id, viewer).await?;
    rank_by_reactions(&mut views);
    Ok(ReviewListing::from_views(views, NO_REVIEWS))
}

/// Everything `username` wrote, ranked by reactions.
pub async fn user_sorted_reviews<C: ConnectionTrait>(db: &C, username: &str, viewer: Option<&str>) -> ServiceResult<ReviewListing> {
    if user::find_by_username(db, username).await?.is_none() {
        return Err(ServiceError::NotFound("Usuario no encontrado".into()));
    }
    let rows = review::Entity::find()
        .filter(review::Column::Username.eq(username))
        .order_by_asc(review::Column::Id)
        .all(db)
        .await?;
    let mut views = with_reactions(db, rows, viewer).await?;
    rank_by_reactions(&mut views);
    Ok(ReviewListing::from_views(views, NO_USER_REVIEWS))
}

pub async fn single_review<C: ConnectionTrait>(db: &C, event_id: i32, author: &str, viewer: Option<&str>) -> ServiceResult<ReviewView> {
    require_event(db, event_id).await?;
    if user::find_by_username(db, author).await?.is_none() {
        return Err(ServiceError::NotFound("Usuario autor de la reseña no encontrado".into()));
    }
    let r = require_review(db, event_id, author).await?;
    let mut views = with_reactions(db, vec![r], viewer).await?;
    views.pop().ok_or_else(|| ServiceError::NotFound("La reseña no existe".into()))
}

/// Ratings arrive as JSON numbers or numeric strings.
fn parse_rating(raw: Option<&Value>) -> ServiceResult<i16> {
    let raw = raw
        .filter(|v| !v.is_null())
        .ok_or_else(|| ServiceError::Validation("Es necesario poner un rating (Entero entre 1 y 5)".into()))?;
    let not_int = || ServiceError::Validation("El rating debe ser un numero entero.".into());
    let n = match raw {
        Value::Number(n) => n.as_i64().ok_or_else(not_int)?,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_int())?,
        _ => return Err(not_int()),
    };
    if !(1..=5).contains(&n) {
        return Err(ServiceError::Validation("El rating debe estar entre 1 y 5 estrellas.".into()));
    }
    Ok(n as i16)
}

#[instrument(skip(db, text))]
pub async fn create_review<C: ConnectionTrait>(
    db: &C,
    me: &str,
    event_id: i32,
    rating: Option<&Value>,
    text: Option<String>,
) -> ServiceResult<ReviewView> {
    let ev = require_event(db, event_id).await?;
    let rating = parse_rating(rating)?;
    if review::find(db, ev.id, me).await?.is_some() {
        return Err(ServiceError::Conflict("Ya has publicado una review en este evento.".into()));
    }
    let created = review::create(db, ev.id, me, Some(rating), text).await?;
    info!(%me, event_id = ev.id, rating, "review_created");
    let mut views = with_reactions(db, vec![created], Some(me)).await?;
    views.pop().ok_or_else(|| ServiceError::Internal("review vanished after insert".into()))
}

/// Delete my review on an event together with the reactions it received.
#[instrument(skip(db))]
pub async fn delete_review<C: ConnectionTrait>(db: &C, me: &str, event_id: i32) -> ServiceResult<String> {
    let ev = require_event(db, event_id).await?;
    let r = review::find(db, ev.id, me)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No tienes ninguna review publicada en este evento.".into()))?;
    liked_review::Entity::delete_many()
        .filter(liked_review::Column::EventId.eq(ev.id))
        .filter(liked_review::Column::Author.eq(me))
        .exec(db)
        .await?;
    let deleted = r.delete(db).await?.rows_affected;
    info!(%me, event_id = ev.id, "review_deleted");
    Ok(format!("{deleted} review(s) eliminada(s) correctamente."))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReactionSummary {
    pub mensaje: String,
    pub likes_count: u64,
    pub dislikes_count: u64,
    pub user_liked: Option<bool>,
}

async fn counts<C: ConnectionTrait>(db: &C, event_id: i32, author: &str) -> ServiceResult<(u64, u64)> {
    let rows = liked_review::Entity::find()
        .filter(liked_review::Column::EventId.eq(event_id))
        .filter(liked_review::Column::Author.eq(author))
        .all(db)
        .await?;
    let likes = rows.iter().filter(|r| r.is_like).count() as u64;
    Ok((likes, rows.len() as u64 - likes))
}

/// Like or dislike a review, replacing any earlier reaction of mine.
#[instrument(skip(db, notifier))]
pub async fn react<C: ConnectionTrait>(
    db: &C,
    notifier: &dyn PushNotifier,
    me: &str,
    event_id: i32,
    author: &str,
    is_like: Option<&Value>,
) -> ServiceResult<ReactionSummary> {
    let ev = require_event(db, event_id).await?;
    if user::find_by_username(db, author).await?.is_none() {
        return Err(ServiceError::NotFound("Usuario no encontrado".into()));
    }
    require_review(db, ev.id, author).await?;
    let is_like = is_like.and_then(common::types::flag).ok_or_else(|| {
        ServiceError::Validation("Es necesario especificar 'is_like' (true para like, false para dislike)".into())
    })?;

    let existed = liked_review::find(db, ev.id, author, me).await?.is_some();
    liked_review::upsert(db, ev.id, author, me, is_like).await?;
    let mensaje = match (existed, is_like) {
        (true, true) => "Like actualizado",
        (true, false) => "Dislike actualizado",
        (false, true) => "Like agregado",
        (false, false) => "Dislike agregado",
    };
    let (likes_count, dislikes_count) = counts(db, ev.id, author).await?;
    info!(%me, event_id = ev.id, %author, is_like, "review_reacted");

    if author != me {
        let accion = if is_like { "le ha dado like" } else { "le ha dado dislike" };
        let body = format!("{me} {accion} a tu reseña");
        let data = push_data([
            ("type", "like_review".to_string()),
            ("evento_id", ev.id.to_string()),
            ("username", me.to_string()),
        ]);
        notify_user(db, notifier, author, Delivery::Visible { title: "Nueva reacción a tu reseña", body: &body }, data).await;
    }
    Ok(ReactionSummary { mensaje: mensaje.into(), likes_count, dislikes_count, user_liked: Some(is_like) })
}

#[instrument(skip(db))]
pub async fn remove_reaction<C: ConnectionTrait>(db: &C, me: &str, event_id: i32, author: &str) -> ServiceResult<ReactionSummary> {
    let ev = require_event(db, event_id).await?;
    require_review(db, ev.id, author).await?;
    let existing = liked_review::find(db, ev.id, author, me)
        .await?
        .ok_or_else(|| ServiceError::NotFound("No has dado like/dislike a esta reseña".into()))?;
    existing.delete(db).await?;
    let (likes_count, dislikes_count) = counts(db, ev.id, author).await?;
    info!(%me, event_id = ev.id, %author, "review_reaction_removed");
    Ok(ReactionSummary {
        mensaje: "Like/Dislike eliminado correctamente".into(),
        likes_count,
        dislikes_count,
        user_liked: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::MockNotifier;
    use crate::test_support::{get_db, make_event, make_user};
    use chrono::NaiveDate;
    use serde_json::json;

    fn view(id: i32, likes: u64, dislikes: u64) -> ReviewView {
        ReviewView {
            id,
            username: format!("u{id}"),
            event_id: 1,
            rating: Some(4),
            text: None,
            likes_count: likes,
            dislikes_count: dislikes,
            user_liked: None,
        }
    }

    #[test]
    fn ranking_uses_balance_then_volume() {
        let mut v = vec![view(1, 1, 1), view(2, 3, 0), view(3, 0, 0), view(4, 4, 1), view(5, 0, 2)];
        rank_by_reactions(&mut v);
        let ids: Vec<i32> = v.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![4, 2, 1, 3, 5]);
    }

    #[test]
    fn rating_parsing() {
        assert_eq!(parse_rating(Some(&json!(3))).ok(), Some(3));
        assert_eq!(parse_rating(Some(&json!("5"))).ok(), Some(5));
        assert!(matches!(parse_rating(None), Err(ServiceError::Validation(_))));
        assert!(matches!(parse_rating(Some(&json!(0))), Err(ServiceError::Validation(m)) if m.contains("entre 1 y 5")));
        assert!(matches!(parse_rating(Some(&json!("tres"))), Err(ServiceError::Validation(m)) if m.contains("entero")));
        assert!(parse_rating(Some(&json!(4.5))).is_err());
    }

    #[test]
    fn empty_listing_serializes_as_message() {
        let v = serde_json::to_value(ReviewListing::from_views(Vec::new(), NO_REVIEWS)).unwrap();
        assert_eq!(v, json!({"mensaje": NO_REVIEWS}));
        let v = serde_json::to_value(ReviewListing::from_views(vec![view(1, 0, 0)], NO_REVIEWS)).unwrap();
        assert!(v.is_array());
    }

    #[tokio::test]
    async fn review_lifecycle_with_reactions() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let author = make_user(&db, "ra").await?;
        let fan = make_user(&db, "rf").await?;
        crate::accounts::save_fcm_token(&db, &author, Some("tok-author")).await?;
        let d = NaiveDate::from_ymd_opt(2025, 9, 11).unwrap();
        let ev = make_event(&db, "Diada", 41.39, 2.17, d, d).await?;

        assert!(matches!(list_reviews(&db, ev.id, None).await?, ReviewListing::Empty { .. }));
        create_review(&db, &author, ev.id, Some(&json!(4)), Some("Molt bé".into())).await?;
        assert!(matches!(
            create_review(&db, &author, ev.id, Some(&json!(5)), None).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(create_review(&db, &author, -1, Some(&json!(5)), None).await, Err(ServiceError::NotFound(_))));

        let notifier = MockNotifier::default();
        let r = react(&db, &notifier, &fan, ev.id, &author, Some(&json!("true"))).await?;
        assert_eq!((r.likes_count, r.dislikes_count, r.mensaje.as_str()), (1, 0, "Like agregado"));
        let r = react(&db, &notifier, &fan, ev.id, &author, Some(&json!(false))).await?;
        assert_eq!((r.likes_count, r.dislikes_count, r.mensaje.as_str()), (0, 1, "Dislike actualizado"));
        assert_eq!(notifier.sent_of_type("like_review").len(), 2);
        react(&db, &notifier, &author, ev.id, &author, Some(&json!(true))).await?;
        assert_eq!(notifier.sent_of_type("like_review").len(), 2);

        let single = single_review(&db, ev.id, &author, Some(&fan)).await?;
        assert_eq!(single.user_liked, Some(false));
        assert_eq!((single.likes_count, single.dislikes_count), (1, 1));

        let removed = remove_reaction(&db, &fan, ev.id, &author).await?;
        assert_eq!(removed.user_liked, None);
        assert!(matches!(remove_reaction(&db, &fan, ev.id, &author).await, Err(ServiceError::NotFound(_))));

        assert_eq!(delete_review(&db, &author, ev.id).await?, "1 review(s) eliminada(s) correctamente.");
        assert!(liked_review::find(&db, ev.id, &author, &author).await?.is_none());
        assert!(matches!(delete_review(&db, &author, ev.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn sorted_by_reactions() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let a = make_user(&db, "sa").await?;
        let b = make_user(&db, "sb").await?;
        let d = NaiveDate::from_ymd_opt(2025, 6, 23).unwrap();
        let ev = make_event(&db, "Sant Joan", 41.38, 2.18, d, d).await?;
        create_review(&db, &a, ev.id, Some(&json!(2)), None).await?;
        create_review(&db, &b, ev.id, Some(&json!(5)), None).await?;
        react(&db, &crate::notifications::NoopNotifier, &a, ev.id, &b, Some(&json!(true))).await?;

        let ReviewListing::Reviews(sorted) = sorted_reviews(&db, ev.id, None).await? else {
            anyhow::bail!("expected reviews");
        };
        assert_eq!(sorted[0].username, b);
        let ReviewListing::Reviews(mine) = user_sorted_reviews(&db, &a, Some(&a)).await? else {
            anyhow::bail!("expected reviews");
        };
        assert_eq!(mine.len(), 1);
        Ok(())
    }
}
