//! Create `app_user` and `access_code` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AppUser::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AppUser::Email).string_len(320).not_null())
                    .col(ColumnDef::new(AppUser::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(AppUser::Token).string_len(64).not_null())
                    .col(
                        ColumnDef::new(AppUser::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(AppUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_user_email")
                    .table(AppUser::Table)
                    .col(AppUser::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_app_user_token")
                    .table(AppUser::Table)
                    .col(AppUser::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AccessCode::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessCode::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AccessCode::Code).string_len(64).not_null())
                    .col(
                        ColumnDef::new(AccessCode::IsUsed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(AccessCode::UsedBy).string_len(32))
                    .col(
                        ColumnDef::new(AccessCode::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccessCode::UsedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_access_code_used_by")
                            .from(AccessCode::Table, AccessCode::UsedBy)
                            .to(AppUser::Table, AppUser::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: code - duplicate codes are rejected by the store
        manager
            .create_index(
                Index::create()
                    .name("idx_access_code_code")
                    .table(AccessCode::Table)
                    .col(AccessCode::Code)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessCode::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AppUser {
    Table,
    Id,
    Email,
    PasswordHash,
    Token,
    IsAdmin,
    CreatedAt,
}

#[derive(Iden)]
enum AccessCode {
    Table,
    Id,
    Code,
    IsUsed,
    UsedBy,
    CreatedAt,
    UsedAt,
}
