//! Reference tables that other rows point at: calendars, places, files,
//! categories and thematic fields.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Calendar::Table)
                    .if_not_exists()
                    .col(pk_auto(Calendar::Id))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Place::Table)
                    .if_not_exists()
                    .col(pk_auto(Place::Id))
                    .col(string_len(Place::Address, 255))
                    .col(decimal_len(Place::Latitude, 9, 6))
                    .col(decimal_len(Place::Longitude, 9, 6))
                    .col(string_len_null(Place::Zipcode, 10))
                    .check(Expr::cust("latitude BETWEEN -90 AND 90"))
                    .check(Expr::cust("longitude BETWEEN -180 AND 180"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(File::Table)
                    .if_not_exists()
                    .col(string_len(File::Path, 255).primary_key())
                    .col(big_integer(File::Size).default(0))
                    .col(string_len(File::Kind, 16))
                    .check(Expr::cust("kind IN ('Image', 'Video', 'Document')"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(string_len(Category::Name, 255).primary_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Field::Table)
                    .if_not_exists()
                    .col(string_len(Field::Name, 255).primary_key())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Field::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Category::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(File::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Place::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Calendar::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Calendar { Table, Id }

#[derive(DeriveIden)]
enum Place { Table, Id, Address, Latitude, Longitude, Zipcode }

#[derive(DeriveIden)]
enum File { Table, Path, Size, Kind }

#[derive(DeriveIden)]
enum Category { Table, Name }

#[derive(DeriveIden)]
enum Field { Table, Name }
