//! Personal calendars of planned activities and the weekly reminder job.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use models::{calendar, event, place, planned_activity, user};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::accounts::require_user;
use crate::errors::{ServiceError, ServiceResult};
use crate::notifications::{push_data, PushNotifier};

/// Days between a reminder and the end of the event it announces.
pub const REMINDER_LEAD_DAYS: i64 = 7;

const NO_CALENDAR: &str = "El usuario no tiene un calendario asociado";

#[derive(Debug, Clone, Serialize)]
pub struct CalendarAdd {
    pub message: String,
    pub event_id: i32,
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<i32>,
    /// False when the event was already planned.
    #[serde(skip)]
    pub added: bool,
}

/// Plan an event, creating my calendar on first use.
#[instrument(skip(db))]
pub async fn add_event<C>(db: &C, me: &str, event_id: Option<i32>) -> ServiceResult<CalendarAdd>
where
    C: ConnectionTrait + TransactionTrait,
{
    let event_id = event_id.ok_or_else(|| ServiceError::Validation("Se requiere el ID del evento (event_id)".into()))?;
    let ev = event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("El evento con ID {event_id} no existe")))?;
    let profile = require_user(db, me).await?;

    let txn = db.begin().await?;
    let (calendar_id, created) = match profile.calendar_id {
        Some(id) => (id, false),
        None => {
            let cal = calendar::create(&txn).await?;
            let mut am: user::ActiveModel = profile.into();
            am.calendar_id = Set(Some(cal.id));
            am.update(&txn).await?;
            info!(%me, calendar_id = cal.id, "calendar_created");
            (cal.id, true)
        }
    };
    let already = planned_activity::find(&txn, calendar_id, ev.id).await?.is_some();
    if !already {
        planned_activity::create(&txn, calendar_id, ev.id).await?;
    }
    txn.commit().await?;

    if already {
        return Ok(CalendarAdd {
            message: "Este evento ya está en tu calendario".into(),
            event_id: ev.id,
            event_name: ev.name,
            calendar_created: None,
            calendar_id: None,
            added: false,
        });
    }
    info!(%me, event_id = ev.id, calendar_id, "event_planned");
    Ok(CalendarAdd {
        message: format!("Evento '{}' añadido con éxito a tu calendario", ev.name),
        event_id: ev.id,
        event_name: ev.name,
        calendar_created: created.then_some(true),
        calendar_id: created.then_some(calendar_id),
        added: true,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarRemove {
    pub message: String,
    pub event_id: i32,
}

#[instrument(skip(db))]
pub async fn remove_event<C: ConnectionTrait>(db: &C, me: &str, event_id: i32) -> ServiceResult<CalendarRemove> {
    let calendar_id = require_user(db, me)
        .await?
        .calendar_id
        .ok_or_else(|| ServiceError::Validation(NO_CALENDAR.into()))?;
    let planned = planned_activity::find(db, calendar_id, event_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Este evento no está en tu calendario".into()))?;
    let name = event::Entity::find_by_id(event_id)
        .one(db)
        .await?
        .map(|e| e.name)
        .unwrap_or_else(|| "Desconocido".into());
    planned.delete(db).await?;
    info!(%me, event_id, "event_unplanned");
    Ok(CalendarRemove { message: format!("Evento '{name}' eliminado exitosamente de tu calendario"), event_id })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Location {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zipcode: Option<String>,
}

impl From<&place::Model> for Location {
    fn from(p: &place::Model) -> Self {
        Self { address: p.address.clone(), latitude: p.latitude_f64(), longitude: p.longitude_f64(), zipcode: p.zipcode.clone() }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlannedEvent {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub inidate: NaiveDate,
    pub enddate: NaiveDate,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarEvents {
    pub message: String,
    pub events: Vec<PlannedEvent>,
}

/// My planned events ordered by start date then name.
pub async fn list_events<C: ConnectionTrait>(db: &C, me: &str) -> ServiceResult<CalendarEvents> {
    let calendar_id = require_user(db, me)
        .await?
        .calendar_id
        .ok_or_else(|| ServiceError::NotFound(NO_CALENDAR.into()))?;
    let planned = planned_activity::Entity::find()
        .filter(planned_activity::Column::CalendarId.eq(calendar_id))
        .find_also_related(event::Entity)
        .order_by_asc(event::Column::IniDate)
        .order_by_asc(event::Column::Name)
        .all(db)
        .await?;
    let evs: Vec<event::Model> = planned.into_iter().filter_map(|(_, e)| e).collect();
    if evs.is_empty() {
        return Ok(CalendarEvents { message: "No tienes eventos guardados en tu calendario".into(), events: Vec::new() });
    }
    let place_ids: Vec<i32> = evs.iter().map(|e| e.place_id).collect();
    let places: HashMap<i32, place::Model> = place::Entity::find()
        .filter(place::Column::Id.is_in(place_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let events: Vec<PlannedEvent> = evs
        .into_iter()
        .map(|e| PlannedEvent {
            location: places.get(&e.place_id).filter(|p| !p.address.is_empty()).map(Location::from),
            id: e.id,
            name: e.name,
            description: e.description,
            inidate: e.ini_date,
            enddate: e.end_date,
        })
        .collect();
    Ok(CalendarEvents { message: format!("Se encontraron {} eventos en tu calendario", events.len()), events })
}

/// Notify everyone who planned an event ending exactly a week after `now`.
/// Returns how many notifications were delivered.
#[instrument(skip(db, notifier))]
pub async fn send_event_reminders<C: ConnectionTrait>(
    db: &C,
    notifier: &dyn PushNotifier,
    now: DateTime<Utc>,
) -> ServiceResult<usize> {
    let target = (now + Duration::days(REMINDER_LEAD_DAYS)).date_naive();
    let events = event::Entity::find().filter(event::Column::EndDate.eq(target)).all(db).await?;
    if events.is_empty() {
        info!(%target, "no events to remind");
        return Ok(0);
    }
    let mut sent = 0;
    for ev in events {
        let calendars: HashSet<i32> = planned_activity::Entity::find()
            .filter(planned_activity::Column::EventId.eq(ev.id))
            .all(db)
            .await?
            .into_iter()
            .map(|p| p.calendar_id)
            .collect();
        if calendars.is_empty() {
            continue;
        }
        let owners = user::Entity::find()
            .filter(user::Column::CalendarId.is_in(calendars))
            .all(db)
            .await?;
        let body = format!("Falta una setmana per a l'esdeveniment {}", ev.name);
        for owner in owners {
            let Some(token) = owner.fcm_token.filter(|t| !t.is_empty()) else { continue };
            let data = push_data([
                ("type", "event_reminder".to_string()),
                ("event_id", ev.id.to_string()),
                ("event_name", ev.name.clone()),
            ]);
            let result = notifier.send_notification(&token, "Recordatori d'esdeveniment", &body, data).await;
            if result.success {
                sent += 1;
            } else {
                warn!(username = %owner.username, event_id = ev.id, error = result.error.as_deref().unwrap_or(""), "reminder delivery failed");
            }
        }
    }
    info!(%target, sent, "event_reminders_sent");
    Ok(sent)
}
