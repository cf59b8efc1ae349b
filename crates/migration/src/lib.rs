//! Migrator registering table migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_catalog;
mod m20250101_000002_create_users;
mod m20250101_000003_create_chats;
mod m20250101_000004_create_events;
mod m20250101_000005_create_friendships;
mod m20250101_000006_create_groups;
mod m20250101_000007_create_reviews;
mod m20250101_000010_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog::Migration),
            Box::new(m20250101_000002_create_users::Migration),
            Box::new(m20250101_000003_create_chats::Migration),
            Box::new(m20250101_000004_create_events::Migration),
            Box::new(m20250101_000005_create_friendships::Migration),
            Box::new(m20250101_000006_create_groups::Migration),
            Box::new(m20250101_000007_create_reviews::Migration),
            // Indexes should always be applied last
            Box::new(m20250101_000010_add_indexes::Migration),
        ]
    }
}
