use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub symbol: String,
    pub decimals: i16,
    pub coingecko_id: Option<String>,
    pub is_testnet: bool,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub rates: Option<Json>,
    pub chain_id: Option<String>,
    pub evm_network_id: Option<String>,
    pub contract_address: Option<String>,
    pub state_key: Option<String>,
    /// Decimal string; balances overflow every native integer column.
    pub existential_deposit: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chain::Entity",
        from = "Column::ChainId",
        to = "super::chain::Column::Id"
    )]
    Chain,
    #[sea_orm(
        belongs_to = "super::evm_network::Entity",
        from = "Column::EvmNetworkId",
        to = "super::evm_network::Column::Id"
    )]
    EvmNetwork,
}

impl Related<super::chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chain.def()
    }
}

impl Related<super::evm_network::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EvmNetwork.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
