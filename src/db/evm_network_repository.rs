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

use crate::db::entity::evm_network;
use crate::db::{ narrow, RelationFilter, Store, UPSERT_CHUNK };
use crate::error::{ AppError, Result };
use crate::models::{ EvmNetwork, Rpc };

#[derive(Clone)]
pub struct EvmNetworkRepository {
    db: DatabaseConnection,
}

impl EvmNetworkRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn into_domain(model: evm_network::Model) -> Result<EvmNetwork> {
        let rpcs: Vec<Rpc> = serde_json::from_value(model.rpcs).map_err(|e|
            AppError::Internal(format!("Corrupt rpcs for evm network {}: {}", model.id, e))
        )?;

        let sort_index = model.sort_index.map(|i| narrow(i, "sort_index", &model.id)).transpose()?;

        Ok(EvmNetwork {
            id: model.id,
            is_testnet: model.is_testnet,
            name: model.name,
            explorer_url: model.explorer_url,
            is_healthy: model.is_healthy,
            sort_index,
            rpcs,
            substrate_chain_id: model.substrate_chain_id,
            native_token_id: model.native_token_id,
        })
    }

    fn into_active_model(network: &EvmNetwork) -> Result<evm_network::ActiveModel> {
        let rpcs = serde_json::to_value(&network.rpcs)
            .map_err(|e| AppError::Internal(format!("Failed to encode rpcs: {}", e)))?;

        Ok(evm_network::ActiveModel {
            id: ActiveValue::Set(network.id.clone()),
            is_testnet: ActiveValue::Set(network.is_testnet),
            name: ActiveValue::Set(network.name.clone()),
            explorer_url: ActiveValue::Set(network.explorer_url.clone()),
            is_healthy: ActiveValue::Set(network.is_healthy),
            sort_index: ActiveValue::Set(
                network.sort_index.map(|i| narrow(i, "sort_index", &network.id)).transpose()?
            ),
            rpcs: ActiveValue::Set(rpcs),
            substrate_chain_id: ActiveValue::Set(network.substrate_chain_id.clone()),
            native_token_id: ActiveValue::Set(network.native_token_id.clone()),
            updated_at: ActiveValue::Set(Utc::now()),
        })
    }

    /// Insert or overwrite every network on `conn`.
    pub(crate) async fn upsert_all<C: ConnectionTrait>(conn: &C, networks: &[EvmNetwork]) -> Result<()> {
        for batch in networks.chunks(UPSERT_CHUNK) {
            let models = batch.iter().map(Self::into_active_model).collect::<Result<Vec<_>>>()?;
            evm_network::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(evm_network::Column::Id)
                        .update_columns(evm_network::Column::iter().filter(|c| !matches!(c, evm_network::Column::Id)))
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

        evm_network::Entity::delete_many()
            .filter(evm_network::Column::Id.is_in(ids.iter().cloned()))
            .exec(conn).await?;
        Ok(())
    }
}

#[async_trait]
impl Store<EvmNetwork> for EvmNetworkRepository {
    async fn find(&self) -> Result<Vec<EvmNetwork>> {
        evm_network::Entity::find().all(&self.db).await?.into_iter().map(Self::into_domain).collect()
    }

    async fn find_one(&self, id: &str) -> Result<Option<EvmNetwork>> {
        evm_network::Entity::find_by_id(id.to_string())
            .one(&self.db).await?
            .map(Self::into_domain)
            .transpose()
    }

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<EvmNetwork>> {
        let chain_id = match filter {
            RelationFilter::Chain(id) => id,
            RelationFilter::EvmNetwork(_) => {
                return Ok(Vec::new());
            }
        };

        evm_network::Entity::find()
            .filter(evm_network::Column::SubstrateChainId.eq(chain_id.as_str()))
            .all(&self.db).await?
            .into_iter()
            .map(Self::into_domain)
            .collect()
    }

    async fn save(&self, networks: &[EvmNetwork]) -> Result<()> {
        let txn = self.db.begin().await?;
        Self::upsert_all(&txn, networks).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        Self::delete_ids(&self.db, ids).await
    }
}
