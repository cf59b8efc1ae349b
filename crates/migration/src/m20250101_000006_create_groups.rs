//! Create `groups`, `group_request` (join requests and invitations) and
//! `participant`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(pk_auto(Groups::Id))
                    .col(string_len(Groups::Name, 255))
                    .col(string_len_null(Groups::Photo, 255))
                    .col(integer(Groups::ChatId).unique_key())
                    .col(timestamp_with_time_zone(Groups::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_groups_chat")
                            .from(Groups::Table, Groups::ChatId)
                            .to(Chat::Table, Chat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(GroupRequest::Id))
                    .col(integer(GroupRequest::GroupId))
                    .col(string_len(GroupRequest::Username, 150))
                    .col(timestamp_with_time_zone(GroupRequest::RequestedAt))
                    .col(string_len(GroupRequest::Status, 16))
                    .col(string_len_null(GroupRequest::RespondedBy, 150))
                    .col(timestamp_with_time_zone_null(GroupRequest::RespondedAt))
                    .col(boolean(GroupRequest::IsInvitation).default(false))
                    .check(Expr::cust("status IN ('Pendiente', 'Aceptado', 'Rechazado')"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_request_group")
                            .from(GroupRequest::Table, GroupRequest::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_request_user")
                            .from(GroupRequest::Table, GroupRequest::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_request_responder")
                            .from(GroupRequest::Table, GroupRequest::RespondedBy)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Participant::Table)
                    .if_not_exists()
                    .col(pk_auto(Participant::Id))
                    .col(integer(Participant::GroupId))
                    .col(string_len(Participant::Username, 150))
                    .col(string_len(Participant::Role, 16))
                    .col(timestamp_with_time_zone(Participant::JoinedAt))
                    .check(Expr::cust("role IN ('Administrador', 'Membre', 'Creador')"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_group")
                            .from(Participant::Table, Participant::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_user")
                            .from(Participant::Table, Participant::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Participant::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(GroupRequest::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Groups::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Groups { Table, Id, Name, Photo, ChatId, CreatedAt }

#[derive(DeriveIden)]
enum GroupRequest { Table, Id, GroupId, Username, RequestedAt, Status, RespondedBy, RespondedAt, IsInvitation }

#[derive(DeriveIden)]
enum Participant { Table, Id, GroupId, Username, Role, JoinedAt }

#[derive(DeriveIden)]
enum Chat { Table, Id }

#[derive(DeriveIden)]
enum Users { Table, Username }
