use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::OnConflict,
    ActiveValue,
    ColumnTrait,
    ConnectionTrait,
    DatabaseConnection,
    EntityTrait,
    Iterable,
    QueryFilter,
    TransactionTrait,
};

use crate::db::entity::chain;
use crate::db::{ narrow, RelationFilter, Store, UPSERT_CHUNK };
use crate::error::{ AppError, Result };
use crate::models::{ Chain, Parachain, Rpc };

#[derive(Clone)]
pub struct ChainRepository {
    db: DatabaseConnection,
}

impl ChainRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn into_domain(model: chain::Model) -> Result<Chain> {
        let id = model.id;
        let rpcs: Vec<Rpc> = serde_json::from_value(model.rpcs)
            .map_err(|e| AppError::Internal(format!("Corrupt rpcs for chain {}: {}", id, e)))?;

        // Half-set parachain columns collapse to "not a parachain"
        let parachain = match (model.relay_id, model.para_id) {
            (Some(relay_id), Some(para_id)) =>
                Some(Parachain {
                    relay_id,
                    para_id: narrow(para_id, "para_id", &id)?,
                }),
            _ => None,
        };

        let prefix = model.prefix.map(|p| narrow(p, "prefix", &id)).transpose()?;
        let spec_version = model.spec_version.map(|v| narrow(v, "spec_version", &id)).transpose()?;
        let impl_version = model.impl_version.map(|v| narrow(v, "impl_version", &id)).transpose()?;
        let sort_index = model.sort_index.map(|i| narrow(i, "sort_index", &id)).transpose()?;
        let currency_id_index = model.currency_id_index
            .map(|i| narrow(i, "currency_id_index", &id))
            .transpose()?;

        Ok(Chain {
            id,
            is_testnet: model.is_testnet,
            name: model.name,
            genesis_hash: model.genesis_hash,
            prefix,
            chain_name: model.chain_name,
            impl_name: model.impl_name,
            spec_name: model.spec_name,
            spec_version,
            impl_version,
            sort_index,
            is_healthy: model.is_healthy,
            rpcs,
            native_token_id: model.native_token_id,
            parachain,
            currency_id_index,
        })
    }

    fn into_active_model(chain: &Chain) -> Result<chain::ActiveModel> {
        let rpcs = serde_json::to_value(&chain.rpcs)
            .map_err(|e| AppError::Internal(format!("Failed to encode rpcs: {}", e)))?;

        Ok(chain::ActiveModel {
            id: ActiveValue::Set(chain.id.clone()),
            is_testnet: ActiveValue::Set(chain.is_testnet),
            name: ActiveValue::Set(chain.name.clone()),
            genesis_hash: ActiveValue::Set(chain.genesis_hash.clone()),
            prefix: ActiveValue::Set(chain.prefix.map(i32::from)),
            chain_name: ActiveValue::Set(chain.chain_name.clone()),
            impl_name: ActiveValue::Set(chain.impl_name.clone()),
            spec_name: ActiveValue::Set(chain.spec_name.clone()),
            spec_version: ActiveValue::Set(chain.spec_version.map(i64::from)),
            impl_version: ActiveValue::Set(chain.impl_version.map(i64::from)),
            sort_index: ActiveValue::Set(chain.sort_index.map(|i| narrow(i, "sort_index", &chain.id)).transpose()?),
            is_healthy: ActiveValue::Set(chain.is_healthy),
            rpcs: ActiveValue::Set(rpcs),
            native_token_id: ActiveValue::Set(chain.native_token_id.clone()),
            relay_id: ActiveValue::Set(chain.relay_id().map(str::to_string)),
            para_id: ActiveValue::Set(chain.para_id().map(|p| narrow(p, "para_id", &chain.id)).transpose()?),
            currency_id_index: ActiveValue::Set(chain.currency_id_index.map(i16::from)),
            updated_at: ActiveValue::Set(Utc::now()),
        })
    }

    /// Insert or overwrite every chain on `conn`.
    pub(crate) async fn upsert_all<C: ConnectionTrait>(conn: &C, chains: &[Chain]) -> Result<()> {
        for batch in chains.chunks(UPSERT_CHUNK) {
            let models = batch.iter().map(Self::into_active_model).collect::<Result<Vec<_>>>()?;
            chain::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(chain::Column::Id)
                        .update_columns(chain::Column::iter().filter(|c| !matches!(c, chain::Column::Id)))
                        .to_owned()
                )
                .exec_without_returning(conn).await?;
        }
        Ok(())
    }

    pub(crate) async fn delete_ids<C: ConnectionTrait>(conn: &C, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        chain::Entity::delete_many()
            .filter(chain::Column::Id.is_in(ids.iter().cloned()))
            .exec(conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Store<Chain> for ChainRepository {
    async fn find(&self) -> Result<Vec<Chain>> {
        chain::Entity::find().all(&self.db).await?.into_iter().map(Self::into_domain).collect()
    }

    async fn find_one(&self, id: &str) -> Result<Option<Chain>> {
        chain::Entity::find_by_id(id.to_string()).one(&self.db).await?.map(Self::into_domain).transpose()
    }

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<Chain>> {
        let relay_id = match filter {
            RelationFilter::Chain(id) => id,
            RelationFilter::EvmNetwork(_) => {
                return Ok(Vec::new());
            }
        };

        chain::Entity::find()
            .filter(chain::Column::RelayId.eq(relay_id.as_str()))
            .all(&self.db).await?
            .into_iter()
            .map(Self::into_domain)
            .collect()
    }

    async fn save(&self, chains: &[Chain]) -> Result<()> {
        let txn = self.db.begin().await?;
        Self::upsert_all(&txn, chains).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        Self::delete_ids(&self.db, ids).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> chain::Model {
        chain::Model {
            id: id.to_string(),
            is_testnet: false,
            name: Some("Polkadot".to_string()),
            genesis_hash: None,
            prefix: Some(0),
            chain_name: None,
            impl_name: None,
            spec_name: None,
            spec_version: Some(1_002_000),
            impl_version: None,
            sort_index: Some(1),
            is_healthy: true,
            rpcs: serde_json::json!([{ "url": "wss://rpc.polkadot.io", "isHealthy": true }]),
            native_token_id: None,
            relay_id: None,
            para_id: None,
            currency_id_index: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_round_trips_through_active_model() {
        let chain = ChainRepository::into_domain(model("polkadot")).unwrap();
        assert_eq!(chain.prefix, Some(0));
        assert_eq!(chain.spec_version, Some(1_002_000));
        assert!(ChainRepository::into_active_model(&chain).is_ok());
    }

    #[test]
    fn test_out_of_range_columns_are_rejected() {
        let mut prefix = model("polkadot");
        prefix.prefix = Some(70_000);
        assert!(ChainRepository::into_domain(prefix).is_err());

        let mut version = model("polkadot");
        version.spec_version = Some(i64::from(u32::MAX) + 1);
        assert!(ChainRepository::into_domain(version).is_err());

        let mut index = model("polkadot");
        index.currency_id_index = Some(300);
        assert!(ChainRepository::into_domain(index).is_err());
    }
}
