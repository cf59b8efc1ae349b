//! Event catalogue: listings, detail, rating ranking and filtered search.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use models::{event, event_category, event_field, place, review};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType, Order, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::{ServiceError, ServiceResult};
use crate::geo::distance_km_expr;
use crate::pagination::Pagination;

pub const CATEGORY_PREFIX: &str = "agenda:categories/";
const MISSING_TEXT: &str = "---";

const MSG_NO_FILTER: &str = "Debe proporcionar al menos un filtro (búsqueda, distancia, categoría, etc.).";
const MSG_NEED_POSITION: &str = "Es necesario aportar la posición del usuario (latitud y longitud).";
const MSG_BAD_COORDS: &str = "Coordenadas inválidas";
const MSG_BAD_RANGE: &str = "Fechas inválidas (start_date o end_date)";
const MSG_BAD_DATE: &str = "Fecha inválida (date)";
const MSG_BAD_DISTANCE: &str = "max_distance debe ser un número válido";
const MSG_SERVICE_PARAMS: &str = "Es necesario aportar la posición del usuario (latitud y longitud) y el texto buscado.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AddressView {
    pub addressid: i32,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zipcode: Option<String>,
}

impl From<&place::Model> for AddressView {
    fn from(p: &place::Model) -> Self {
        Self {
            addressid: p.id,
            address: p.address.clone(),
            latitude: p.latitude_f64(),
            longitude: p.longitude_f64(),
            zipcode: p.zipcode.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    pub eventid: i32,
    pub name: String,
    pub imagepath: Option<String>,
    pub codeevent: i64,
    pub addressid: Option<AddressView>,
}

impl EventSummary {
    fn new(e: &event::Model, p: Option<&place::Model>) -> Self {
        Self {
            eventid: e.id,
            name: e.name.clone(),
            imagepath: e.image_path.clone(),
            codeevent: e.code_event,
            addressid: p.map(AddressView::from),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetail {
    pub eventid: i32,
    pub inidate: NaiveDate,
    pub enddate: NaiveDate,
    pub name: String,
    pub description: String,
    pub tickets: String,
    pub schedule: String,
    pub link: String,
    pub email: String,
    pub telefon: String,
    pub addressid: Option<AddressView>,
    pub idchat: Option<i32>,
    pub imagepath: Option<String>,
    pub codeevent: i64,
    pub average_rate: f64,
    pub categories: Vec<String>,
    pub tematiques: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RatedEvent {
    pub eventid: i32,
    pub name: String,
    pub imagepath: Option<String>,
    pub codeevent: i64,
    pub addressid: Option<AddressView>,
    pub average_rate: f64,
    pub num_reviews: i64,
}

fn or_placeholder(v: &Option<String>) -> String {
    match v {
        Some(s) if !s.trim().is_empty() => s.clone(),
        _ => MISSING_TEXT.to_string(),
    }
}

/// All events with their place, soonest first. `page` limits the slice when given.
#[instrument(skip(db))]
pub async fn list_events<C: ConnectionTrait>(db: &C, page: Option<Pagination>) -> ServiceResult<Vec<EventSummary>> {
    let mut q = event::Entity::find()
        .find_also_related(place::Entity)
        .order_by_asc(event::Column::IniDate)
        .order_by_asc(event::Column::Id);
    if let Some(p) = page {
        let (offset, limit) = p.offset_limit();
        q = q.offset(offset).limit(limit);
    }
    let rows = q.all(db).await?;
    Ok(rows.iter().map(|(e, p)| EventSummary::new(e, p.as_ref())).collect())
}

fn avg_rating_expr() -> SimpleExpr {
    Func::cast_as(Func::avg(Expr::col((review::Entity, review::Column::Rating))), Alias::new("float8")).into()
}

/// Mean of the non-null ratings of an event, `None` when nobody rated it.
pub async fn average_rating<C: ConnectionTrait>(db: &C, event_id: i32) -> ServiceResult<Option<f64>> {
    let avg = review::Entity::find()
        .select_only()
        .column_as(avg_rating_expr(), "avg")
        .filter(review::Column::EventId.eq(event_id))
        .filter(review::Column::Rating.is_not_null())
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?;
    Ok(avg.flatten())
}

#[instrument(skip(db))]
pub async fn event_detail<C: ConnectionTrait>(db: &C, event_id: i32) -> ServiceResult<EventDetail> {
    let (e, p) = event::Entity::find_by_id(event_id)
        .find_also_related(place::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Event does not exist".into()))?;
    let average_rate = average_rating(db, e.id).await?.unwrap_or(0.0);
    let categories = event_category::names_for_event(db, e.id).await?;
    let tematiques = event_field::names_for_event(db, e.id).await?;
    Ok(EventDetail {
        eventid: e.id,
        inidate: e.ini_date,
        enddate: e.end_date,
        name: e.name.clone(),
        description: or_placeholder(&e.description),
        tickets: or_placeholder(&e.tickets),
        schedule: or_placeholder(&e.schedule),
        link: or_placeholder(&e.link),
        email: or_placeholder(&e.email),
        telefon: or_placeholder(&e.telefon),
        addressid: p.as_ref().map(AddressView::from),
        idchat: e.chat_id,
        imagepath: e.image_path.clone(),
        codeevent: e.code_event,
        average_rate,
        categories,
        tematiques,
    })
}

/// Rated events first, then by average, then by number of ratings.
pub fn rank_by_rating(events: &mut [RatedEvent]) {
    events.sort_by(|a, b| {
        (b.num_reviews > 0)
            .cmp(&(a.num_reviews > 0))
            .then_with(|| b.average_rate.partial_cmp(&a.average_rate).unwrap_or(Ordering::Equal))
            .then_with(|| b.num_reviews.cmp(&a.num_reviews))
    });
}

#[instrument(skip(db))]
pub async fn events_by_rating<C: ConnectionTrait>(db: &C) -> ServiceResult<Vec<RatedEvent>> {
    let stats: Vec<(i32, Option<f64>, i64)> = review::Entity::find()
        .select_only()
        .column(review::Column::EventId)
        .column_as(avg_rating_expr(), "avg")
        .column_as(Expr::col((review::Entity, review::Column::Rating)).count(), "n")
        .filter(review::Column::Rating.is_not_null())
        .group_by(review::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;
    let stats: HashMap<i32, (f64, i64)> = stats
        .into_iter()
        .map(|(id, avg, n)| (id, (avg.unwrap_or(0.0), n)))
        .collect();

    let rows = event::Entity::find().find_also_related(place::Entity).all(db).await?;
    let mut out: Vec<RatedEvent> = rows
        .iter()
        .map(|(e, p)| {
            let (average_rate, num_reviews) = stats.get(&e.id).copied().unwrap_or((0.0, 0));
            RatedEvent {
                eventid: e.id,
                name: e.name.clone(),
                imagepath: e.image_path.clone(),
                codeevent: e.code_event,
                addressid: p.as_ref().map(AddressView::from),
                average_rate,
                num_reviews,
            }
        })
        .collect();
    rank_by_rating(&mut out);
    Ok(out)
}

/// Raw query-string parameters of the event search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub query: Option<String>,
    pub max_distance: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub exact_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub origin: Option<(f64, f64)>,
    pub max_distance: Option<f64>,
    pub categories: Vec<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub exact_date: Option<NaiveDate>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Coordinates are optional as a pair; a lone or zero coordinate is rejected.
fn parse_origin(lat: Option<&str>, lon: Option<&str>) -> ServiceResult<Option<(f64, f64)>> {
    let (lat, lon) = match (lat, lon) {
        (None, None) => return Ok(None),
        (Some(a), Some(b)) => (a, b),
        _ => return Err(ServiceError::Validation(MSG_NEED_POSITION.into())),
    };
    let lat: f64 = lat.parse().map_err(|_| ServiceError::Validation(MSG_BAD_COORDS.into()))?;
    let lon: f64 = lon.parse().map_err(|_| ServiceError::Validation(MSG_BAD_COORDS.into()))?;
    if lat == 0.0 || lon == 0.0 {
        return Err(ServiceError::Validation(MSG_NEED_POSITION.into()));
    }
    place::validate_coordinates(lat, lon).map_err(|_| ServiceError::Validation(MSG_BAD_COORDS.into()))?;
    Ok(Some((lat, lon)))
}

impl SearchQuery {
    pub fn parse(&self) -> ServiceResult<SearchFilter> {
        let text = non_empty(&self.query).map(str::to_string);
        let max_raw = non_empty(&self.max_distance);
        let cat_raw = non_empty(&self.category);
        let start = non_empty(&self.start_date);
        let end = non_empty(&self.end_date);
        let exact = non_empty(&self.exact_date);

        let has_filter = text.is_some()
            || max_raw.is_some()
            || cat_raw.is_some()
            || start.is_some()
            || end.is_some()
            || exact.is_some();
        if !has_filter {
            return Err(ServiceError::Validation(MSG_NO_FILTER.into()));
        }

        let origin = parse_origin(non_empty(&self.latitude), non_empty(&self.longitude))?;

        let max_distance = match max_raw {
            None => None,
            Some(raw) => {
                let d: f64 = raw.parse().map_err(|_| ServiceError::Validation(MSG_BAD_DISTANCE.into()))?;
                if !d.is_finite() || d < 0.0 {
                    return Err(ServiceError::Validation(MSG_BAD_DISTANCE.into()));
                }
                if origin.is_none() {
                    return Err(ServiceError::Validation(MSG_NEED_POSITION.into()));
                }
                Some(d)
            }
        };

        let categories = cat_raw
            .map(|c| {
                c.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("{CATEGORY_PREFIX}{s}"))
                    .collect()
            })
            .unwrap_or_default();

        let date_range = match (start, end) {
            (None, None) => None,
            (Some(s), Some(e)) => {
                let s = common::utils::time::parse_ymd(s).ok_or_else(|| ServiceError::Validation(MSG_BAD_RANGE.into()))?;
                let e = common::utils::time::parse_ymd(e).ok_or_else(|| ServiceError::Validation(MSG_BAD_RANGE.into()))?;
                Some((s, e))
            }
            _ => return Err(ServiceError::Validation(MSG_BAD_RANGE.into())),
        };

        let exact_date = match exact {
            None => None,
            Some(d) => Some(common::utils::time::parse_ymd(d).ok_or_else(|| ServiceError::Validation(MSG_BAD_DATE.into()))?),
        };

        Ok(SearchFilter { text, origin, max_distance, categories, date_range, exact_date })
    }
}

#[derive(Debug, FromQueryResult)]
struct SearchRow {
    id: i32,
    name: String,
    image_path: Option<String>,
    code_event: i64,
    place_id: i32,
    address: String,
    latitude: Decimal,
    longitude: Decimal,
    zipcode: Option<String>,
    distance: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: i32,
    pub name: String,
    pub imagepath: Option<String>,
    pub codeevent: i64,
    pub addressid: i32,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zipcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl From<SearchRow> for SearchHit {
    fn from(r: SearchRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            imagepath: r.image_path,
            codeevent: r.code_event,
            addressid: r.place_id,
            address: r.address,
            latitude: r.latitude.to_f64().unwrap_or_default(),
            longitude: r.longitude.to_f64().unwrap_or_default(),
            zipcode: r.zipcode,
            distance: r.distance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage<T> {
    pub count: usize,
    pub results: Vec<T>,
}

impl<T> From<Vec<T>> for SearchPage<T> {
    fn from(results: Vec<T>) -> Self {
        Self { count: results.len(), results }
    }
}

/// Case-insensitive substring pattern, with `%` and `_` taken literally;
/// match it against `LOWER(column)`.
pub(crate) fn contains_pattern(text: &str) -> LikeExpr {
    let escaped = text.to_lowercase().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    LikeExpr::new(format!("%{escaped}%")).escape('\\')
}

/// Case-insensitive substring match on the event name.
fn name_contains(text: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((event::Entity, event::Column::Name)))).like(contains_pattern(text))
}

#[instrument(skip(db, filter))]
pub async fn search_events<C: ConnectionTrait>(db: &C, filter: &SearchFilter) -> ServiceResult<Vec<SearchHit>> {
    let mut q = event::Entity::find()
        .select_only()
        .column_as(event::Column::Id, "id")
        .column_as(event::Column::Name, "name")
        .column_as(event::Column::ImagePath, "image_path")
        .column_as(event::Column::CodeEvent, "code_event")
        .column_as(place::Column::Id, "place_id")
        .column_as(place::Column::Address, "address")
        .column_as(place::Column::Latitude, "latitude")
        .column_as(place::Column::Longitude, "longitude")
        .column_as(place::Column::Zipcode, "zipcode")
        .join(JoinType::InnerJoin, event::Relation::Place.def());

    if let Some(text) = &filter.text {
        q = q.filter(name_contains(text));
    }
    if !filter.categories.is_empty() {
        q = q.filter(
            event::Column::Id.in_subquery(
                Query::select()
                    .column(event_category::Column::EventId)
                    .from(event_category::Entity)
                    .and_where(event_category::Column::Name.is_in(filter.categories.clone()))
                    .to_owned(),
            ),
        );
    }
    if let Some((start, end)) = filter.date_range {
        q = q.filter(event::Column::IniDate.between(start, end));
    }
    if let Some(day) = filter.exact_date {
        q = q.filter(event::Column::IniDate.eq(day));
    }

    match filter.origin {
        Some((lat, lon)) => {
            let distance = distance_km_expr(lat, lon);
            q = q.column_as(distance.clone(), "distance");
            if let Some(max) = filter.max_distance {
                q = q.filter(Expr::expr(distance.clone()).lte(max));
            }
            q = q.order_by(distance, Order::Asc);
        }
        None => {
            q = q
                .column_as(Expr::cust("CAST(NULL AS float8)"), "distance")
                .order_by_asc(event::Column::IniDate);
        }
    }
    q = q.order_by_asc(event::Column::Id);

    let rows = q.into_model::<SearchRow>().all(db).await?;
    debug!(hits = rows.len(), "event search");
    Ok(rows.into_iter().map(SearchHit::from).collect())
}

/// Item shape of the public service feed.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceAddress {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceEvent {
    pub name: String,
    pub imagepath: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "start date")]
    pub start_date: NaiveDate,
    #[serde(rename = "end date")]
    pub end_date: NaiveDate,
    pub addressid: Option<ServiceAddress>,
    pub categories: Vec<String>,
    pub tematiques: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

async fn tags_by_event<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> ServiceResult<(HashMap<i32, Vec<String>>, HashMap<i32, Vec<String>>)> {
    let mut categories: HashMap<i32, Vec<String>> = HashMap::new();
    let mut fields: HashMap<i32, Vec<String>> = HashMap::new();
    if ids.is_empty() {
        return Ok((categories, fields));
    }
    for c in event_category::Entity::find()
        .filter(event_category::Column::EventId.is_in(ids.to_vec()))
        .order_by_asc(event_category::Column::Name)
        .all(db)
        .await?
    {
        categories.entry(c.event_id).or_default().push(c.name);
    }
    for f in event_field::Entity::find()
        .filter(event_field::Column::EventId.is_in(ids.to_vec()))
        .order_by_asc(event_field::Column::Name)
        .all(db)
        .await?
    {
        fields.entry(f.event_id).or_default().push(f.name);
    }
    Ok((categories, fields))
}

fn service_event(
    e: &event::Model,
    p: Option<&place::Model>,
    categories: &mut HashMap<i32, Vec<String>>,
    fields: &mut HashMap<i32, Vec<String>>,
    distance: Option<f64>,
) -> ServiceEvent {
    ServiceEvent {
        name: e.name.clone(),
        imagepath: e.image_path.clone(),
        description: e.description.clone(),
        start_date: e.ini_date,
        end_date: e.end_date,
        addressid: p.map(|p| ServiceAddress {
            address: p.address.clone(),
            latitude: p.latitude_f64(),
            longitude: p.longitude_f64(),
        }),
        categories: categories.remove(&e.id).unwrap_or_default(),
        tematiques: fields.remove(&e.id).unwrap_or_default(),
        distance,
    }
}

/// Every event in the service feed shape.
#[instrument(skip(db))]
pub async fn events_all_service<C: ConnectionTrait>(db: &C) -> ServiceResult<Vec<ServiceEvent>> {
    let rows = event::Entity::find()
        .find_also_related(place::Entity)
        .order_by_asc(event::Column::IniDate)
        .order_by_asc(event::Column::Id)
        .all(db)
        .await?;
    let ids: Vec<i32> = rows.iter().map(|(e, _)| e.id).collect();
    let (mut categories, mut fields) = tags_by_event(db, &ids).await?;
    Ok(rows
        .iter()
        .map(|(e, p)| service_event(e, p.as_ref(), &mut categories, &mut fields, None))
        .collect())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceSearchQuery {
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub query: Option<String>,
}

/// Name search ordered by distance; position and text are both mandatory.
#[instrument(skip(db, params))]
pub async fn search_events_service<C: ConnectionTrait>(db: &C, params: &ServiceSearchQuery) -> ServiceResult<Vec<ServiceEvent>> {
    let text = non_empty(&params.query).ok_or_else(|| ServiceError::Validation(MSG_SERVICE_PARAMS.into()))?;
    let (lat, lon) = parse_origin(non_empty(&params.latitude), non_empty(&params.longitude))
        .map_err(|e| match e {
            ServiceError::Validation(m) if m == MSG_NEED_POSITION => ServiceError::Validation(MSG_SERVICE_PARAMS.into()),
            other => other,
        })?
        .ok_or_else(|| ServiceError::Validation(MSG_SERVICE_PARAMS.into()))?;

    let distance = distance_km_expr(lat, lon);
    let ranked: Vec<(i32, f64)> = event::Entity::find()
        .select_only()
        .column(event::Column::Id)
        .column_as(distance.clone(), "distance")
        .join(JoinType::InnerJoin, event::Relation::Place.def())
        .filter(name_contains(text))
        .order_by(distance, Order::Asc)
        .order_by_asc(event::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let ids: Vec<i32> = ranked.iter().map(|(id, _)| *id).collect();
    let mut by_id: HashMap<i32, (event::Model, Option<place::Model>)> = event::Entity::find()
        .filter(event::Column::Id.is_in(ids.clone()))
        .find_also_related(place::Entity)
        .all(db)
        .await?
        .into_iter()
        .map(|(e, p)| (e.id, (e, p)))
        .collect();
    let (mut categories, mut fields) = tags_by_event(db, &ids).await?;

    Ok(ranked
        .into_iter()
        .filter_map(|(id, d)| {
            by_id
                .remove(&id)
                .map(|(e, p)| service_event(&e, p.as_ref(), &mut categories, &mut fields, Some(d)))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q() -> SearchQuery {
        SearchQuery::default()
    }

    fn rated(id: i32, avg: f64, n: i64) -> RatedEvent {
        RatedEvent { eventid: id, name: format!("e{id}"), imagepath: None, codeevent: id as i64, addressid: None, average_rate: avg, num_reviews: n }
    }

    #[test]
    fn search_requires_some_filter() {
        let mut p = q();
        p.latitude = Some("41.38".into());
        p.longitude = Some("2.17".into());
        let err = p.parse().unwrap_err();
        assert!(matches!(err, ServiceError::Validation(m) if m == MSG_NO_FILTER));
    }

    #[test]
    fn search_rejects_lone_or_zero_coordinate() {
        let mut p = q();
        p.query = Some("jazz".into());
        p.latitude = Some("41.38".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_NEED_POSITION));
        p.longitude = Some("0".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_NEED_POSITION));
    }

    #[test]
    fn search_rejects_out_of_range_coordinates() {
        let mut p = q();
        p.query = Some("jazz".into());
        p.latitude = Some("141.0".into());
        p.longitude = Some("2.0".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_COORDS));
        p.latitude = Some("abc".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_COORDS));
    }

    #[test]
    fn distance_needs_position_and_a_number() {
        let mut p = q();
        p.max_distance = Some("10".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_NEED_POSITION));
        p.latitude = Some("41.38".into());
        p.longitude = Some("2.17".into());
        p.max_distance = Some("lejos".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_DISTANCE));
        p.max_distance = Some("12.5".into());
        let f = p.parse().unwrap();
        assert_eq!(f.max_distance, Some(12.5));
        assert_eq!(f.origin, Some((41.38, 2.17)));
    }

    #[test]
    fn dates_must_parse() {
        let mut p = q();
        p.start_date = Some("2025-06-01".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_RANGE));
        p.end_date = Some("2025-06-31".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_RANGE));
        p.end_date = Some("2025-06-30".into());
        let f = p.parse().unwrap();
        assert_eq!(f.date_range.map(|r| r.1.to_string()), Some("2025-06-30".to_string()));

        let mut p = q();
        p.exact_date = Some("01/06/2025".into());
        assert!(matches!(p.parse(), Err(ServiceError::Validation(m)) if m == MSG_BAD_DATE));
    }

    #[test]
    fn categories_are_prefixed() {
        let mut p = q();
        p.category = Some("concerts, teatre,".into());
        let f = p.parse().unwrap();
        assert_eq!(f.categories, vec!["agenda:categories/concerts", "agenda:categories/teatre"]);
        assert!(f.origin.is_none());
    }

    #[test]
    fn rating_rank_puts_unrated_last() {
        let mut v = vec![rated(1, 0.0, 0), rated(2, 3.5, 2), rated(3, 4.0, 1), rated(4, 3.5, 5)];
        rank_by_rating(&mut v);
        let ids: Vec<i32> = v.iter().map(|e| e.eventid).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn placeholder_for_blank_text() {
        assert_eq!(or_placeholder(&None), "---");
        assert_eq!(or_placeholder(&Some("  ".into())), "---");
        assert_eq!(or_placeholder(&Some("Gratuït".into())), "Gratuït");
    }
}
