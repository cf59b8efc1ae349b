use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Friendship: one row per ordered pair
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_friendship_pair")
                    .table(Friendship::Table)
                    .col(Friendship::User1)
                    .col(Friendship::User2)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // FriendshipRequest: inbox lookups by receiver and status
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_friendship_request_ordered_status")
                    .table(FriendshipRequest::Table)
                    .col(FriendshipRequest::Ordered)
                    .col(FriendshipRequest::Status)
                    .to_owned(),
            )
            .await?;

        // GroupRequest: at most one request per (group, user, status)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_group_request_group_user_status")
                    .table(GroupRequest::Table)
                    .col(GroupRequest::GroupId)
                    .col(GroupRequest::Username)
                    .col(GroupRequest::Status)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Participant: one membership per (group, user)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_participant_group_user")
                    .table(Participant::Table)
                    .col(Participant::GroupId)
                    .col(Participant::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // PlannedActivity: an event appears once per calendar
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_planned_activity_event_calendar")
                    .table(PlannedActivity::Table)
                    .col(PlannedActivity::EventId)
                    .col(PlannedActivity::CalendarId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Review: one review per user and event
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_review_user_event")
                    .table(Review::Table)
                    .col(Review::Username)
                    .col(Review::EventId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // LikedReview: one reaction per reactor on a review
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_liked_review_event_author_reactor")
                    .table(LikedReview::Table)
                    .col(LikedReview::EventId)
                    .col(LikedReview::Author)
                    .col(LikedReview::Reactor)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Message: history and last-message lookups per chat
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_message_chat_sent_at")
                    .table(Message::Table)
                    .col(Message::ChatId)
                    .col(Message::SentAt)
                    .to_owned(),
            )
            .await?;

        // Event: date filters and calendar ordering
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_event_ini_date")
                    .table(Event::Table)
                    .col(Event::IniDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("uniq_friendship_pair").table(Friendship::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_friendship_request_ordered_status").table(FriendshipRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_group_request_group_user_status").table(GroupRequest::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_participant_group_user").table(Participant::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_planned_activity_event_calendar").table(PlannedActivity::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_review_user_event").table(Review::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("uniq_liked_review_event_author_reactor").table(LikedReview::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_message_chat_sent_at").table(Message::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_event_ini_date").table(Event::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Friendship { Table, User1, User2 }

#[derive(DeriveIden)]
enum FriendshipRequest { Table, Ordered, Status }

#[derive(DeriveIden)]
enum GroupRequest { Table, GroupId, Username, Status }

#[derive(DeriveIden)]
enum Participant { Table, GroupId, Username }

#[derive(DeriveIden)]
enum PlannedActivity { Table, EventId, CalendarId }

#[derive(DeriveIden)]
enum Review { Table, Username, EventId }

#[derive(DeriveIden)]
enum LikedReview { Table, EventId, Author, Reactor }

#[derive(DeriveIden)]
enum Message { Table, ChatId, SentAt }

#[derive(DeriveIden)]
enum Event { Table, IniDate }
