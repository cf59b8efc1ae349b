//! Create `friendship_request` and `friendship`.
//!
//! A friendship row with `is_friend = false` is a block by `user1`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FriendshipRequest::Table)
                    .if_not_exists()
                    .col(pk_auto(FriendshipRequest::Id))
                    .col(timestamp_with_time_zone(FriendshipRequest::RequestedAt))
                    .col(string_len(FriendshipRequest::Status, 16))
                    .col(timestamp_with_time_zone_null(FriendshipRequest::RespondedAt))
                    .col(string_len(FriendshipRequest::Orderer, 150))
                    .col(string_len(FriendshipRequest::Ordered, 150))
                    .check(Expr::cust("status IN ('Pendiente', 'Aceptado', 'Rechazado')"))
                    .check(Expr::cust(
                        "(status = 'Pendiente' AND responded_at IS NULL) OR (status <> 'Pendiente' AND responded_at IS NOT NULL)",
                    ))
                    .check(Expr::cust("orderer <> ordered"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_request_orderer")
                            .from(FriendshipRequest::Table, FriendshipRequest::Orderer)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_request_ordered")
                            .from(FriendshipRequest::Table, FriendshipRequest::Ordered)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Friendship::Table)
                    .if_not_exists()
                    .col(pk_auto(Friendship::Id))
                    .col(string_len(Friendship::User1, 150))
                    .col(string_len(Friendship::User2, 150))
                    .col(boolean(Friendship::IsFriend).default(true))
                    .col(integer_null(Friendship::RequestId))
                    .col(timestamp_with_time_zone(Friendship::CreatedAt))
                    .check(Expr::cust("user1 <> user2"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_user1")
                            .from(Friendship::Table, Friendship::User1)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_user2")
                            .from(Friendship::Table, Friendship::User2)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_friendship_request")
                            .from(Friendship::Table, Friendship::RequestId)
                            .to(FriendshipRequest::Table, FriendshipRequest::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Friendship::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(FriendshipRequest::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum FriendshipRequest { Table, Id, RequestedAt, Status, RespondedAt, Orderer, Ordered }

#[derive(DeriveIden)]
enum Friendship { Table, Id, User1, User2, IsFriend, RequestId, CreatedAt }

#[derive(DeriveIden)]
enum Users { Table, Username }
