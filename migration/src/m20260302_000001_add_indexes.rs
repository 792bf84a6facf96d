use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Contracts {
    Table,
    Status,
    OwnerId,
}

#[derive(DeriveIden)]
enum Offers {
    Table,
    ContractId,
    ProviderId,
}

#[derive(DeriveIden)]
enum Requests {
    Table,
    ContractId,
}

#[derive(DeriveIden)]
enum ContractEvents {
    Table,
    ContractId,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Dashboards list contracts by status
        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_status")
                    .table(Contracts::Table)
                    .col(Contracts::Status)
                    .to_owned(),
            )
            .await?;

        // Client dashboards list their own contracts
        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_owner_id")
                    .table(Contracts::Table)
                    .col(Contracts::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_offers_contract_provider")
                    .table(Offers::Table)
                    .col(Offers::ContractId)
                    .col(Offers::ProviderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_requests_contract_id")
                    .table(Requests::Table)
                    .col(Requests::ContractId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contract_events_contract_id")
                    .table(ContractEvents::Table)
                    .col(ContractEvents::ContractId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_contracts_status").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_contracts_owner_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_offers_contract_provider").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_requests_contract_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_contract_events_contract_id").to_owned())
            .await?;

        Ok(())
    }
}
