use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub is_testnet: bool,
    pub name: Option<String>,
    pub genesis_hash: Option<String>,
    pub prefix: Option<i32>,
    pub chain_name: Option<String>,
    pub impl_name: Option<String>,
    pub spec_name: Option<String>,
    pub spec_version: Option<i64>,
    pub impl_version: Option<i64>,
    pub sort_index: Option<i32>,
    pub is_healthy: bool,
    #[sea_orm(column_type = "JsonBinary")]
    pub rpcs: Json,
    pub native_token_id: Option<String>,
    pub relay_id: Option<String>,
    pub para_id: Option<i32>,
    pub currency_id_index: Option<i16>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::RelayId", to = "Column::Id")]
    Relay,
    #[sea_orm(has_many = "super::token::Entity")]
    Tokens,
}

impl Related<super::token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
