//! Create `phase_1_vote`, `phase_2_vote` and `user_voting_progress` tables.
//!
//! Vote de-duplication and the nomination cap are enforced here, by unique
//! indexes, so that concurrent requests cannot both pass the service checks.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Phase1Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Phase1Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Phase1Vote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Phase1Vote::NomineeId).string_len(32).not_null())
                    .col(ColumnDef::new(Phase1Vote::CategoryId).string_len(32).not_null())
                    .col(ColumnDef::new(Phase1Vote::Slot).integer().not_null())
                    .col(
                        ColumnDef::new(Phase1Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_1_vote_user")
                            .from(Phase1Vote::Table, Phase1Vote::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_1_vote_nominee")
                            .from(Phase1Vote::Table, Phase1Vote::NomineeId)
                            .to(Nominee::Table, Nominee::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_1_vote_category")
                            .from(Phase1Vote::Table, Phase1Vote::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one nomination per (user, category, nominee)
        manager
            .create_index(
                Index::create()
                    .name("idx_phase_1_vote_user_category_nominee")
                    .table(Phase1Vote::Table)
                    .col(Phase1Vote::UserId)
                    .col(Phase1Vote::CategoryId)
                    .col(Phase1Vote::NomineeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: slots bound the nominations per (user, category) by the cap
        manager
            .create_index(
                Index::create()
                    .name("idx_phase_1_vote_user_category_slot")
                    .table(Phase1Vote::Table)
                    .col(Phase1Vote::UserId)
                    .col(Phase1Vote::CategoryId)
                    .col(Phase1Vote::Slot)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (category_id, nominee_id) for tallies
        manager
            .create_index(
                Index::create()
                    .name("idx_phase_1_vote_category_nominee")
                    .table(Phase1Vote::Table)
                    .col(Phase1Vote::CategoryId)
                    .col(Phase1Vote::NomineeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Phase2Vote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Phase2Vote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Phase2Vote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Phase2Vote::NomineeId).string_len(32).not_null())
                    .col(ColumnDef::new(Phase2Vote::CategoryId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Phase2Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_2_vote_user")
                            .from(Phase2Vote::Table, Phase2Vote::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_2_vote_nominee")
                            .from(Phase2Vote::Table, Phase2Vote::NomineeId)
                            .to(Nominee::Table, Nominee::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_phase_2_vote_category")
                            .from(Phase2Vote::Table, Phase2Vote::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: one final vote per (user, category)
        manager
            .create_index(
                Index::create()
                    .name("idx_phase_2_vote_user_category")
                    .table(Phase2Vote::Table)
                    .col(Phase2Vote::UserId)
                    .col(Phase2Vote::CategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_phase_2_vote_category_nominee")
                    .table(Phase2Vote::Table)
                    .col(Phase2Vote::CategoryId)
                    .col(Phase2Vote::NomineeId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserVotingProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserVotingProgress::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserVotingProgress::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UserVotingProgress::CategoryId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserVotingProgress::Phase).integer().not_null())
                    .col(
                        ColumnDef::new(UserVotingProgress::VotesCast)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(UserVotingProgress::MaxVotes).integer().not_null())
                    .col(
                        ColumnDef::new(UserVotingProgress::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_voting_progress_user")
                            .from(UserVotingProgress::Table, UserVotingProgress::UserId)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_voting_progress_category")
                            .from(UserVotingProgress::Table, UserVotingProgress::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: upsert target
        manager
            .create_index(
                Index::create()
                    .name("idx_user_voting_progress_key")
                    .table(UserVotingProgress::Table)
                    .col(UserVotingProgress::UserId)
                    .col(UserVotingProgress::CategoryId)
                    .col(UserVotingProgress::Phase)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserVotingProgress::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Phase2Vote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Phase1Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Phase1Vote {
    #[iden = "phase_1_vote"]
    Table,
    Id,
    UserId,
    NomineeId,
    CategoryId,
    Slot,
    CreatedAt,
}

#[derive(Iden)]
enum Phase2Vote {
    #[iden = "phase_2_vote"]
    Table,
    Id,
    UserId,
    NomineeId,
    CategoryId,
    CreatedAt,
}

#[derive(Iden)]
enum UserVotingProgress {
    Table,
    Id,
    UserId,
    CategoryId,
    Phase,
    VotesCast,
    MaxVotes,
    UpdatedAt,
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
}

#[derive(Iden)]
enum Nominee {
    Table,
    Id,
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
}
