//! Importer for the Catalan open-data cultural agenda.
//!
//! Pages are fetched with `$limit`/`$offset` until a short page comes back.
//! Each accepted record is written in its own transaction so one bad row
//! only skips itself.

pub mod retry;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use models::kinds::{ChatKind, FileKind};
use models::{category, chat, event, event_category, event_field, field, file, place};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, NotSet, QuerySelect, Set, TransactionTrait};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::errors::{ServiceError, ServiceResult};
pub use retry::{retry_with_policy, RetryPolicy};

#[derive(Debug, Error)]
pub enum AgendaError {
    #[error("agenda transport error: {0}")]
    Transport(String),
    #[error("agenda returned status {0}")]
    Status(u16),
    #[error("agenda payload error: {0}")]
    Payload(String),
}

impl AgendaError {
    /// Network failures and 5xx/429 replies are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            AgendaError::Transport(_) => true,
            AgendaError::Status(s) => *s == 429 || *s >= 500,
            AgendaError::Payload(_) => false,
        }
    }
}

/// One row of the agenda dataset. Every field arrives as a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgendaRecord {
    pub codi: Option<String>,
    pub data_inici: Option<String>,
    pub data_fi: Option<String>,
    pub denominaci: Option<String>,
    pub descripcio: Option<String>,
    pub entrades: Option<String>,
    pub horari: Option<String>,
    pub enlla: Option<String>,
    pub email: Option<String>,
    pub tel_fon: Option<String>,
    pub adre_a: Option<String>,
    pub latitud: Option<String>,
    pub longitud: Option<String>,
    pub codi_postal: Option<String>,
    pub imatges: Option<String>,
    pub tags_categor_es: Option<String>,
    pub tags_mbits: Option<String>,
}

/// Dates come as `2025-03-01T00:00:00.000` or plain `2025-03-01`.
pub fn parse_agenda_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|dt| dt.date())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn non_blank(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

impl AgendaRecord {
    pub fn code(&self) -> Option<i64> {
        self.codi.as_deref().and_then(|c| c.trim().parse().ok())
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.data_inici.as_deref().and_then(parse_agenda_date)
    }

    /// Falls back to the start date when missing or unparsable.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.data_fi.as_deref().and_then(parse_agenda_date).or_else(|| self.start_date())
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let lat = self.latitud.as_deref()?.trim().parse().ok()?;
        let lon = self.longitud.as_deref()?.trim().parse().ok()?;
        Some((lat, lon))
    }

    pub fn image_path(&self, code: i64) -> String {
        non_blank(&self.imatges).unwrap_or_else(|| format!("/default/event_{code}.jpg"))
    }

    pub fn categories(&self) -> Vec<String> {
        split_tags(self.tags_categor_es.as_deref())
    }

    pub fn fields(&self) -> Vec<String> {
        split_tags(self.tags_mbits.as_deref())
    }
}

#[async_trait]
pub trait AgendaSource: Send + Sync {
    async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<AgendaRecord>, AgendaError>;
}

pub struct HttpAgendaSource {
    client: reqwest::Client,
    url: String,
    app_token: Option<String>,
    retry: RetryPolicy,
}

impl HttpAgendaSource {
    pub fn new(cfg: &configs::AgendaConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ServiceError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            url: cfg.base_url.clone(),
            app_token: cfg.app_token.clone().filter(|t| !t.is_empty()),
            retry: RetryPolicy::default(),
        })
    }

    async fn fetch_once(&self, offset: u64, limit: u32) -> Result<Vec<AgendaRecord>, AgendaError> {
        let mut req = self
            .client
            .get(&self.url)
            .query(&[("$limit", limit.to_string()), ("$offset", offset.to_string())]);
        if let Some(token) = &self.app_token {
            req = req.header("X-App-Token", token);
        }
        let resp = req.send().await.map_err(|e| AgendaError::Transport(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AgendaError::Status(status.as_u16()));
        }
        resp.json::<Vec<AgendaRecord>>().await.map_err(|e| AgendaError::Payload(e.to_string()))
    }
}

#[async_trait]
impl AgendaSource for HttpAgendaSource {
    async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<AgendaRecord>, AgendaError> {
        retry_with_policy(&self.retry, || self.fetch_once(offset, limit)).await
    }
}

/// Keep records with a code and a start date in or after `min_year`
/// whose code is not yet known. Accepted codes are added to `known`.
pub fn select_new(records: Vec<AgendaRecord>, known: &mut HashSet<i64>, min_year: i32) -> Vec<(i64, AgendaRecord)> {
    use chrono::Datelike;
    records
        .into_iter()
        .filter_map(|r| {
            let code = r.code()?;
            let start = r.start_date()?;
            if start.year() < min_year || !known.insert(code) {
                return None;
            }
            Some((code, r))
        })
        .collect()
}

/// Write one record with its place, chat, image and tags. Records without
/// an address and coordinates are skipped and yield `None`.
pub async fn insert_record<C>(db: &C, code: i64, rec: &AgendaRecord) -> ServiceResult<Option<i32>>
where
    C: ConnectionTrait + TransactionTrait,
{
    let Some((lat, lon)) = rec.coordinates() else { return Ok(None) };
    let address = non_blank(&rec.adre_a).unwrap_or_else(|| "Desconocida".into());
    let (Some(ini), Some(end)) = (rec.start_date(), rec.end_date()) else { return Ok(None) };
    event::validate_dates(ini, end)?;
    let image = rec.image_path(code);

    let txn = db.begin().await?;
    let p = place::create(&txn, &address, lat, lon, non_blank(&rec.codi_postal)).await?;
    let c = chat::create(&txn, ChatKind::EventChat).await?;
    file::ensure(&txn, &image, 0, FileKind::Image).await?;
    let ev = event::ActiveModel {
        id: NotSet,
        ini_date: Set(ini),
        end_date: Set(end),
        name: Set(non_blank(&rec.denominaci).unwrap_or_else(|| format!("Esdeveniment {code}"))),
        description: Set(non_blank(&rec.descripcio)),
        tickets: Set(non_blank(&rec.entrades)),
        schedule: Set(non_blank(&rec.horari)),
        link: Set(non_blank(&rec.enlla)),
        email: Set(non_blank(&rec.email)),
        telefon: Set(non_blank(&rec.tel_fon)),
        place_id: Set(p.id),
        chat_id: Set(Some(c.id)),
        image_path: Set(Some(image)),
        code_event: Set(code),
    }
    .insert(&txn)
    .await?;
    for name in rec.categories() {
        category::ensure(&txn, &name).await?;
        event_category::link(&txn, ev.id, &name).await?;
    }
    for name in rec.fields() {
        field::ensure(&txn, &name).await?;
        event_field::link(&txn, ev.id, &name).await?;
    }
    txn.commit().await?;
    Ok(Some(ev.id))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Pull every page from `source` and insert the new events.
#[instrument(skip(db, source))]
pub async fn import_all<C>(db: &C, source: &dyn AgendaSource, page_size: u32, min_year: i32) -> ServiceResult<ImportSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    let mut known: HashSet<i64> = event::Entity::find()
        .select_only()
        .column(event::Column::CodeEvent)
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    info!(existing = known.len(), "agenda_import_started");

    let mut summary = ImportSummary::default();
    let mut offset = 0u64;
    loop {
        let page = source.fetch_page(offset, page_size).await.map_err(|e| ServiceError::Upstream(e.to_string()))?;
        let page_len = page.len();
        summary.fetched += page_len;
        let fresh = select_new(page, &mut known, min_year);
        summary.skipped += page_len - fresh.len();
        for (code, rec) in fresh {
            match insert_record(db, code, &rec).await {
                Ok(Some(_)) => summary.inserted += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    warn!(code, error = %e, "agenda record failed");
                    summary.failed += 1;
                }
            }
        }
        info!(offset, page_len, inserted = summary.inserted, "agenda_page_done");
        if page_len < page_size as usize {
            break;
        }
        offset += u64::from(page_size);
    }
    info!(?summary, "agenda_import_finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn record(code: &str, start: &str) -> AgendaRecord {
        AgendaRecord {
            codi: Some(code.into()),
            data_inici: Some(start.into()),
            denominaci: Some(format!("Acte {code}")),
            adre_a: Some("Plaça Major 1".into()),
            latitud: Some("41.3851".into()),
            longitud: Some("2.1734".into()),
            tags_categor_es: Some("agenda:categories/concerts, agenda:categories/festes,".into()),
            tags_mbits: Some("Música".into()),
            ..Default::default()
        }
    }

    #[test]
    fn dates_in_both_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1);
        assert_eq!(parse_agenda_date("2025-03-01T00:00:00.000"), d);
        assert_eq!(parse_agenda_date("2025-03-01"), d);
        assert_eq!(parse_agenda_date("01/03/2025"), None);
        let r = record("1", "2025-03-01");
        assert_eq!(r.end_date(), d);
    }

    #[test]
    fn selection_filters_year_duplicates_and_gaps() {
        let mut known = HashSet::from([10]);
        let mut no_date = record("12", "2025-01-01");
        no_date.data_inici = None;
        let batch = vec![
            record("10", "2025-05-01"),
            record("11", "2024-12-31"),
            no_date,
            record("13", "2025-06-01T10:00:00.000"),
            record("13", "2025-06-01"),
            record("x", "2025-06-01"),
        ];
        let kept: Vec<i64> = select_new(batch, &mut known, 2025).into_iter().map(|(c, _)| c).collect();
        assert_eq!(kept, vec![13]);
        assert!(known.contains(&13));
    }

    #[test]
    fn tags_and_image_defaults() {
        let r = record("5", "2025-01-01");
        assert_eq!(r.categories(), vec!["agenda:categories/concerts", "agenda:categories/festes"]);
        assert_eq!(r.image_path(5), "/default/event_5.jpg");
        assert_eq!(r.coordinates(), Some((41.3851, 2.1734)));
    }

    struct Pages(Vec<Vec<AgendaRecord>>);

    #[async_trait]
    impl AgendaSource for Pages {
        async fn fetch_page(&self, offset: u64, limit: u32) -> Result<Vec<AgendaRecord>, AgendaError> {
            Ok(self.0.get((offset / u64::from(limit)) as usize).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn imports_pages_once() -> anyhow::Result<()> {
        if std::env::var("SKIP_DB_TESTS").is_ok() { return Ok(()); }
        let db = get_db().await?;
        let base = rand::random::<u32>() as i64 * 10 + 7_000_000_000;
        let c = |n: i64| (base + n).to_string();
        let mut no_coords = record(&c(3), "2025-04-01");
        no_coords.latitud = None;
        let source = Pages(vec![
            vec![record(&c(1), "2025-04-01"), record(&c(2), "2023-04-01")],
            vec![no_coords],
        ]);

        let summary = import_all(&db, &source, 2, 2025).await?;
        assert_eq!(summary.fetched, 3);
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.skipped, 2);
        let ev = event::find_by_code(&db, base + 1).await?;
        let ev = ev.ok_or_else(|| anyhow::anyhow!("event not imported"))?;
        assert!(ev.chat_id.is_some());
        assert_eq!(event_category::names_for_event(&db, ev.id).await?.len(), 2);

        let again = import_all(&db, &source, 2, 2025).await?;
        assert_eq!(again.inserted, 0);
        Ok(())
    }
}
