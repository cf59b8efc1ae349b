//! Create `review` and `liked_review` (like/dislike reactions).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(pk_auto(Review::Id))
                    .col(string_len(Review::Username, 150))
                    .col(integer(Review::EventId))
                    .col(small_integer_null(Review::Rating))
                    .col(text_null(Review::Text))
                    .col(timestamp_with_time_zone(Review::CreatedAt))
                    .check(Expr::cust("rating IS NULL OR rating BETWEEN 0 AND 10"))
                    .check(Expr::cust("rating IS NOT NULL OR text IS NOT NULL"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_user")
                            .from(Review::Table, Review::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_event")
                            .from(Review::Table, Review::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LikedReview::Table)
                    .if_not_exists()
                    .col(pk_auto(LikedReview::Id))
                    .col(integer(LikedReview::EventId))
                    .col(string_len(LikedReview::Author, 150))
                    .col(string_len(LikedReview::Reactor, 150))
                    .col(boolean(LikedReview::IsLike))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_liked_review_event")
                            .from(LikedReview::Table, LikedReview::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_liked_review_author")
                            .from(LikedReview::Table, LikedReview::Author)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_liked_review_reactor")
                            .from(LikedReview::Table, LikedReview::Reactor)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(LikedReview::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Review::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Review { Table, Id, Username, EventId, Rating, Text, CreatedAt }

#[derive(DeriveIden)]
enum LikedReview { Table, Id, EventId, Author, Reactor, IsLike }

#[derive(DeriveIden)]
enum Event { Table, Id }

#[derive(DeriveIden)]
enum Users { Table, Username }
