//! Create `event` with its category/field links, preferred fields and
//! planned activities (events saved to a calendar).
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(pk_auto(Event::Id))
                    .col(date(Event::IniDate))
                    .col(date(Event::EndDate))
                    .col(string_len(Event::Name, 512))
                    .col(text_null(Event::Description))
                    .col(text_null(Event::Tickets))
                    .col(text_null(Event::Schedule))
                    .col(text_null(Event::Link))
                    .col(string_len_null(Event::Email, 254))
                    .col(string_len_null(Event::Telefon, 64))
                    .col(integer(Event::PlaceId))
                    .col(integer_null(Event::ChatId))
                    .col(string_len_null(Event::ImagePath, 255))
                    .col(big_integer(Event::CodeEvent).unique_key())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_place")
                            .from(Event::Table, Event::PlaceId)
                            .to(Place::Table, Place::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_chat")
                            .from(Event::Table, Event::ChatId)
                            .to(Chat::Table, Chat::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_image")
                            .from(Event::Table, Event::ImagePath)
                            .to(File::Table, File::Path)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventCategory::Table)
                    .if_not_exists()
                    .col(integer(EventCategory::EventId))
                    .col(string_len(EventCategory::Name, 255))
                    .primary_key(Index::create().col(EventCategory::EventId).col(EventCategory::Name))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_category_event")
                            .from(EventCategory::Table, EventCategory::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_category_category")
                            .from(EventCategory::Table, EventCategory::Name)
                            .to(Category::Table, Category::Name)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(EventField::Table)
                    .if_not_exists()
                    .col(integer(EventField::EventId))
                    .col(string_len(EventField::Name, 255))
                    .primary_key(Index::create().col(EventField::EventId).col(EventField::Name))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_field_event")
                            .from(EventField::Table, EventField::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_field_field")
                            .from(EventField::Table, EventField::Name)
                            .to(Field::Table, Field::Name)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PreferredField::Table)
                    .if_not_exists()
                    .col(string_len(PreferredField::Username, 150))
                    .col(string_len(PreferredField::Name, 255))
                    .primary_key(Index::create().col(PreferredField::Username).col(PreferredField::Name))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_preferred_field_user")
                            .from(PreferredField::Table, PreferredField::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_preferred_field_field")
                            .from(PreferredField::Table, PreferredField::Name)
                            .to(Field::Table, Field::Name)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PlannedActivity::Table)
                    .if_not_exists()
                    .col(pk_auto(PlannedActivity::Id))
                    .col(integer(PlannedActivity::EventId))
                    .col(integer(PlannedActivity::CalendarId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_planned_activity_event")
                            .from(PlannedActivity::Table, PlannedActivity::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_planned_activity_calendar")
                            .from(PlannedActivity::Table, PlannedActivity::CalendarId)
                            .to(Calendar::Table, Calendar::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PlannedActivity::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(PreferredField::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(EventField::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(EventCategory::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Event::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Event {
    Table,
    Id,
    IniDate,
    EndDate,
    Name,
    Description,
    Tickets,
    Schedule,
    Link,
    Email,
    Telefon,
    PlaceId,
    ChatId,
    ImagePath,
    CodeEvent,
}

#[derive(DeriveIden)]
enum EventCategory { Table, EventId, Name }

#[derive(DeriveIden)]
enum EventField { Table, EventId, Name }

#[derive(DeriveIden)]
enum PreferredField { Table, Username, Name }

#[derive(DeriveIden)]
enum PlannedActivity { Table, Id, EventId, CalendarId }

#[derive(DeriveIden)]
enum Place { Table, Id }

#[derive(DeriveIden)]
enum Chat { Table, Id }

#[derive(DeriveIden)]
enum File { Table, Path }

#[derive(DeriveIden)]
enum Category { Table, Name }

#[derive(DeriveIden)]
enum Field { Table, Name }

#[derive(DeriveIden)]
enum Calendar { Table, Id }

#[derive(DeriveIden)]
enum Users { Table, Username }
