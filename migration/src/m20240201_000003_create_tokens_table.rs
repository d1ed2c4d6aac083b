use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tokens::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tokens::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Tokens::Kind).string().not_null())
                    .col(ColumnDef::new(Tokens::Symbol).string().not_null())
                    .col(ColumnDef::new(Tokens::Decimals).small_integer().not_null())
                    .col(ColumnDef::new(Tokens::CoingeckoId).string().null())
                    .col(ColumnDef::new(Tokens::IsTestnet).boolean().not_null().default(false))
                    .col(ColumnDef::new(Tokens::Rates).json_binary().null())
                    .col(ColumnDef::new(Tokens::ChainId).string().null())
                    .col(ColumnDef::new(Tokens::EvmNetworkId).string().null())
                    .col(ColumnDef::new(Tokens::ContractAddress).string().null())
                    .col(ColumnDef::new(Tokens::StateKey).string().null())
                    .col(ColumnDef::new(Tokens::ExistentialDeposit).string().null())
                    .col(
                        ColumnDef::new(Tokens::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Anchor lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tokens_chain_id")
                    .table(Tokens::Table)
                    .col(Tokens::ChainId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tokens_evm_network_id")
                    .table(Tokens::Table)
                    .col(Tokens::EvmNetworkId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Tokens::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Tokens {
    Table,
    Id,
    Kind,
    Symbol,
    Decimals,
    CoingeckoId,
    IsTestnet,
    Rates,
    ChainId,
    EvmNetworkId,
    ContractAddress,
    StateKey,
    ExistentialDeposit,
    UpdatedAt,
}
