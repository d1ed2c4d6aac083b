use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "evm_networks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub is_testnet: bool,
    pub name: Option<String>,
    pub explorer_url: Option<String>,
    pub is_healthy: bool,
    pub sort_index: Option<i32>,
    #[sea_orm(column_type = "JsonBinary")]
    pub rpcs: Json,
    pub substrate_chain_id: Option<String>,
    pub native_token_id: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::chain::Entity",
        from = "Column::SubstrateChainId",
        to = "super::chain::Column::Id"
    )]
    Chain,
}

impl Related<super::chain::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chain.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
