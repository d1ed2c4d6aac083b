use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ DatabaseConnection, TransactionTrait };

use crate::error::{ AppError, Result };

pub mod entity;
pub use entity::*;

mod store;
pub use store::{
    chain_matches,
    network_matches,
    token_matches,
    EntityChanges,
    GraphChanges,
    GraphWriter,
    RelationFilter,
    RelationMatcher,
    Store,
};

mod staging;
pub use staging::{ StagedRegistry, StagedStore };

mod chain_repository;
pub use chain_repository::ChainRepository;

mod evm_network_repository;
pub use evm_network_repository::EvmNetworkRepository;

mod token_repository;
pub use token_repository::TokenRepository;

#[cfg(test)]
pub mod memory;

use crate::models::{ Chain, EvmNetwork, Token };

/// Rows per multi-row upsert, well under the Postgres bind parameter limit.
pub(crate) const UPSERT_CHUNK: usize = 500;

/// Convert between column and domain integer widths, rejecting values that
/// do not fit instead of truncating them.
pub(crate) fn narrow<S, T>(value: S, column: &str, id: &str) -> Result<T>
    where S: Copy + Display, T: TryFrom<S>
{
    T::try_from(value).map_err(|_| AppError::Internal(format!("{} of {} out of range: {}", column, id, value)))
}

/// The three entity families of the registry graph.
#[derive(Clone)]
pub struct Registry {
    pub chains: Arc<dyn Store<Chain>>,
    pub evm_networks: Arc<dyn Store<EvmNetwork>>,
    pub tokens: Arc<dyn Store<Token>>,
    writer: Arc<dyn GraphWriter>,
}

impl Registry {
    pub fn new(
        chains: Arc<dyn Store<Chain>>,
        evm_networks: Arc<dyn Store<EvmNetwork>>,
        tokens: Arc<dyn Store<Token>>,
        writer: Arc<dyn GraphWriter>
    ) -> Self {
        Self {
            chains,
            evm_networks,
            tokens,
            writer,
        }
    }

    /// Postgres-backed registry sharing one connection pool.
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self::new(
            Arc::new(ChainRepository::new(db.clone())),
            Arc::new(EvmNetworkRepository::new(db.clone())),
            Arc::new(TokenRepository::new(db.clone())),
            Arc::new(PgGraphWriter::new(db))
        )
    }

    /// Write changes to several families at once, all or nothing.
    pub async fn apply(&self, changes: GraphChanges) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        self.writer.apply(changes).await
    }
}

/// Applies a [`GraphChanges`] inside one database transaction.
#[derive(Clone)]
pub struct PgGraphWriter {
    db: DatabaseConnection,
}

impl PgGraphWriter {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GraphWriter for PgGraphWriter {
    async fn apply(&self, changes: GraphChanges) -> Result<()> {
        // dropping the transaction on error rolls it back
        let txn = self.db.begin().await?;

        ChainRepository::upsert_all(&txn, &changes.chains.upserts).await?;
        ChainRepository::delete_ids(&txn, &changes.chains.deletes).await?;
        EvmNetworkRepository::upsert_all(&txn, &changes.evm_networks.upserts).await?;
        EvmNetworkRepository::delete_ids(&txn, &changes.evm_networks.deletes).await?;
        TokenRepository::upsert_all(&txn, &changes.tokens.upserts).await?;
        TokenRepository::delete_ids(&txn, &changes.tokens.deletes).await?;

        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_rejects_out_of_range_values() {
        assert_eq!(narrow::<i32, u16>(42, "prefix", "polkadot").unwrap(), 42);
        assert!(narrow::<i32, u16>(70_000, "prefix", "polkadot").is_err());
        assert!(narrow::<i32, u32>(-1, "sort_index", "polkadot").is_err());
        assert!(narrow::<u32, i32>(u32::MAX, "sort_index", "polkadot").is_err());
    }
}
