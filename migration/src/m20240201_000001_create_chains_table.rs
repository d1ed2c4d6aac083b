use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chains::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Chains::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Chains::IsTestnet).boolean().not_null().default(false))
                    .col(ColumnDef::new(Chains::Name).string().null())
                    .col(ColumnDef::new(Chains::GenesisHash).string().null())
                    .col(ColumnDef::new(Chains::Prefix).integer().null())
                    .col(ColumnDef::new(Chains::ChainName).string().null())
                    .col(ColumnDef::new(Chains::ImplName).string().null())
                    .col(ColumnDef::new(Chains::SpecName).string().null())
                    .col(ColumnDef::new(Chains::SpecVersion).big_integer().null())
                    .col(ColumnDef::new(Chains::ImplVersion).big_integer().null())
                    .col(ColumnDef::new(Chains::SortIndex).integer().null())
                    .col(ColumnDef::new(Chains::IsHealthy).boolean().not_null().default(false))
                    .col(ColumnDef::new(Chains::Rpcs).json_binary().not_null())
                    .col(ColumnDef::new(Chains::NativeTokenId).string().null())
                    .col(ColumnDef::new(Chains::RelayId).string().null())
                    .col(ColumnDef::new(Chains::ParaId).integer().null())
                    .col(ColumnDef::new(Chains::CurrencyIdIndex).small_integer().null())
                    .col(
                        ColumnDef::new(Chains::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Parachain lookups by relay
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_chains_relay_id")
                    .table(Chains::Table)
                    .col(Chains::RelayId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Chains::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Chains {
    Table,
    Id,
    IsTestnet,
    Name,
    GenesisHash,
    Prefix,
    ChainName,
    ImplName,
    SpecName,
    SpecVersion,
    ImplVersion,
    SortIndex,
    IsHealthy,
    Rpcs,
    NativeTokenId,
    RelayId,
    ParaId,
    CurrencyIdIndex,
    UpdatedAt,
}
