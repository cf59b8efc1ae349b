//! Create `chat` (kind discriminator), `private_chat` and `message`.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chat::Table)
                    .if_not_exists()
                    .col(pk_auto(Chat::Id))
                    .col(string_len(Chat::Kind, 16))
                    .check(Expr::cust("kind IN ('EventChat', 'GroupChat', 'PrivateChat')"))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PrivateChat::Table)
                    .if_not_exists()
                    .col(integer(PrivateChat::ChatId).primary_key())
                    .col(string_len(PrivateChat::User1, 150))
                    .col(string_len(PrivateChat::User2, 150))
                    .check(Expr::cust("user1 <> user2"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_private_chat_chat")
                            .from(PrivateChat::Table, PrivateChat::ChatId)
                            .to(Chat::Table, Chat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_private_chat_user1")
                            .from(PrivateChat::Table, PrivateChat::User1)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_private_chat_user2")
                            .from(PrivateChat::Table, PrivateChat::User2)
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
                    .table(Message::Table)
                    .if_not_exists()
                    .col(pk_auto(Message::Id))
                    .col(integer(Message::ChatId))
                    .col(string_len(Message::Username, 150))
                    .col(timestamp_with_time_zone(Message::SentAt))
                    .col(text_null(Message::Text))
                    .col(string_len_null(Message::FilePath, 255))
                    .check(Expr::cust("text IS NOT NULL OR file_path IS NOT NULL"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_chat")
                            .from(Message::Table, Message::ChatId)
                            .to(Chat::Table, Chat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_user")
                            .from(Message::Table, Message::Username)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_message_file")
                            .from(Message::Table, Message::FilePath)
                            .to(File::Table, File::Path)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Message::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(PrivateChat::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Chat::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Chat { Table, Id, Kind }

#[derive(DeriveIden)]
enum PrivateChat { Table, ChatId, User1, User2 }

#[derive(DeriveIden)]
enum Message { Table, Id, ChatId, Username, SentAt, Text, FilePath }

#[derive(DeriveIden)]
enum Users { Table, Username }

#[derive(DeriveIden)]
enum File { Table, Path }
