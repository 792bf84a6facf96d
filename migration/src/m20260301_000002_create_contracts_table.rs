use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `contracts` table and its columns.
#[derive(DeriveIden)]
enum Contracts {
    Table,
    Id,
    ReferenceNumber,
    Title,
    ContractType,
    Description,
    TargetConditions,
    TargetPersons,
    BudgetMin,
    BudgetMax,
    Currency,
    StartDate,
    EndDate,
    Status,
    Workflow,
    OwnerId,
    CreatedBy,
    Version,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

/// Re-declare parent table identifiers for foreign-key references.
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Contracts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contracts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Contracts::ReferenceNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Contracts::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Contracts::ContractType).string().not_null())
                    .col(ColumnDef::new(Contracts::Description).text().not_null())
                    .col(ColumnDef::new(Contracts::TargetConditions).text().null())
                    .col(ColumnDef::new(Contracts::TargetPersons).integer().not_null())
                    .col(ColumnDef::new(Contracts::BudgetMin).double().not_null())
                    .col(ColumnDef::new(Contracts::BudgetMax).double().not_null())
                    .col(ColumnDef::new(Contracts::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Contracts::StartDate).date().not_null())
                    .col(ColumnDef::new(Contracts::EndDate).date().not_null())
                    .col(ColumnDef::new(Contracts::Status).string().not_null())
                    .col(ColumnDef::new(Contracts::Workflow).json_binary().not_null())
                    .col(ColumnDef::new(Contracts::OwnerId).uuid().null())
                    .col(ColumnDef::new(Contracts::CreatedBy).uuid().not_null())
                    .col(
                        ColumnDef::new(Contracts::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Contracts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Contracts::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_owner_id")
                            .from(Contracts::Table, Contracts::OwnerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contracts_created_by")
                            .from(Contracts::Table, Contracts::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Contracts::Table).to_owned())
            .await
    }
}
