/// Database connection and configuration tests
pub mod db_tests;

/// CRUD and constraint tests for the domain tables
pub mod crud_tests;

/// Transaction handling tests
pub mod transaction_tests;

use anyhow::Result;
use migration::MigratorTrait;
use sea_orm::DatabaseConnection;

/// Connect and bring the schema up to date.
pub(crate) async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::db::connect().await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Unique username for a test run.
pub(crate) fn unique_name(prefix: &str) -> String {
    format!("{prefix}_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
}
