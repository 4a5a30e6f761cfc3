//! Create `category`, `nominee` and `nominee_category` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Category::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Category::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Category::Description).text())
                    .col(ColumnDef::new(Category::BannerUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Category::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Category::PhaseState)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Category::VotingPhase)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(Category::Phase1Active)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Category::Phase2Active)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Category::IsFinalized)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Category::VotingOpen)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Category::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Category::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_is_active")
                    .table(Category::Table)
                    .col(Category::IsActive)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Nominee::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Nominee::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Nominee::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Nominee::Description).text())
                    .col(ColumnDef::new(Nominee::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Nominee::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Nominee::VoteCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Nominee::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Nominee::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(NomineeCategory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NomineeCategory::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NomineeCategory::NomineeId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NomineeCategory::CategoryId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NomineeCategory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nominee_category_nominee")
                            .from(NomineeCategory::Table, NomineeCategory::NomineeId)
                            .to(Nominee::Table, Nominee::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nominee_category_category")
                            .from(NomineeCategory::Table, NomineeCategory::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (category_id, nominee_id) - a nominee is a finalist at most once
        manager
            .create_index(
                Index::create()
                    .name("idx_nominee_category_pair")
                    .table(NomineeCategory::Table)
                    .col(NomineeCategory::CategoryId)
                    .col(NomineeCategory::NomineeId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nominee_category_nominee_id")
                    .table(NomineeCategory::Table)
                    .col(NomineeCategory::NomineeId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NomineeCategory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Nominee::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
    Name,
    Description,
    BannerUrl,
    IsActive,
    PhaseState,
    VotingPhase,
    #[iden = "phase_1_active"]
    Phase1Active,
    #[iden = "phase_2_active"]
    Phase2Active,
    IsFinalized,
    VotingOpen,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Nominee {
    Table,
    Id,
    Name,
    Description,
    ImageUrl,
    IsActive,
    VoteCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum NomineeCategory {
    Table,
    Id,
    NomineeId,
    CategoryId,
    CreatedAt,
}
