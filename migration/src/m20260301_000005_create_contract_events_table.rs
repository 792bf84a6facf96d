use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Append-only audit trail of workflow transitions.
#[derive(DeriveIden)]
enum ContractEvents {
    Table,
    Id,
    ContractId,
    ActorId,
    ActorRole,
    Action,
    FromStatus,
    ToStatus,
    Reason,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Contracts {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ContractEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContractEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContractEvents::ContractId).uuid().not_null())
                    .col(ColumnDef::new(ContractEvents::ActorId).uuid().not_null())
                    .col(ColumnDef::new(ContractEvents::ActorRole).string().not_null())
                    .col(ColumnDef::new(ContractEvents::Action).string().not_null())
                    .col(ColumnDef::new(ContractEvents::FromStatus).string().null())
                    .col(ColumnDef::new(ContractEvents::ToStatus).string().not_null())
                    .col(ColumnDef::new(ContractEvents::Reason).text().null())
                    .col(
                        ColumnDef::new(ContractEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_contract_events_contract_id")
                            .from(ContractEvents::Table, ContractEvents::ContractId)
                            .to(Contracts::Table, Contracts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContractEvents::Table).to_owned())
            .await
    }
}
