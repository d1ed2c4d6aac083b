use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EvmNetworks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(EvmNetworks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(EvmNetworks::IsTestnet).boolean().not_null().default(false))
                    .col(ColumnDef::new(EvmNetworks::Name).string().null())
                    .col(ColumnDef::new(EvmNetworks::ExplorerUrl).string().null())
                    .col(ColumnDef::new(EvmNetworks::IsHealthy).boolean().not_null().default(false))
                    .col(ColumnDef::new(EvmNetworks::SortIndex).integer().null())
                    .col(ColumnDef::new(EvmNetworks::Rpcs).json_binary().not_null())
                    .col(ColumnDef::new(EvmNetworks::SubstrateChainId).string().null())
                    .col(ColumnDef::new(EvmNetworks::NativeTokenId).string().null())
                    .col(
                        ColumnDef::new(EvmNetworks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_evm_networks_substrate_chain_id")
                    .table(EvmNetworks::Table)
                    .col(EvmNetworks::SubstrateChainId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(EvmNetworks::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum EvmNetworks {
    Table,
    Id,
    IsTestnet,
    Name,
    ExplorerUrl,
    IsHealthy,
    SortIndex,
    Rpcs,
    SubstrateChainId,
    NativeTokenId,
    UpdatedAt,
}
