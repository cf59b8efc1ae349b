//! One-shot import of the public cultural agenda into the events table.

use anyhow::Context;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use service::agenda::{self, HttpAgendaSource};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    common::utils::logging::init_logging_from_env();

    let cfg = configs::AppConfig::load_and_validate().context("loading configuration")?;
    let db = models::db::connect_with_config(&cfg.database).await.context("connecting to the database")?;
    Migrator::up(&db, None).await.context("running migrations")?;

    let source = HttpAgendaSource::new(&cfg.agenda).context("building the agenda client")?;
    info!(service = "import-events", event = "start", url = %cfg.agenda.base_url, "importing agenda");
    let summary = agenda::import_all(&db, &source, cfg.agenda.page_size, cfg.agenda.min_year)
        .await
        .context("importing agenda records")?;

    info!(
        service = "import-events",
        event = "finished",
        fetched = summary.fetched,
        inserted = summary.inserted,
        skipped = summary.skipped,
        failed = summary.failed,
        "agenda import finished"
    );
    println!(
        "fetched {} records: {} inserted, {} skipped, {} failed",
        summary.fetched, summary.inserted, summary.skipped, summary.failed
    );
    Ok(())
}
