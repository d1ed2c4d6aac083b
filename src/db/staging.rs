//! Write buffering over a [`Registry`], so a whole pipeline run lands in the
//! backing store as one unit or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::models::{ Chain, EvmNetwork, Record, Token };

use super::store::{ chain_matches, network_matches, token_matches };
use super::{ EntityChanges, GraphChanges, GraphWriter, Registry, RelationFilter, RelationMatcher, Store };

/// Reads see the buffered writes on top of the base store. Nothing reaches
/// the base store until the buffer is taken and applied.
pub struct StagedStore<E: Record> {
    base: Arc<dyn Store<E>>,
    matcher: RelationMatcher<E>,
    /// `None` marks a buffered delete.
    pending: RwLock<BTreeMap<String, Option<E>>>,
}

impl<E: Record> StagedStore<E> {
    pub fn new(base: Arc<dyn Store<E>>, matcher: RelationMatcher<E>) -> Self {
        Self {
            base,
            matcher,
            pending: RwLock::new(BTreeMap::new()),
        }
    }

    /// Drain the buffer into upserts and deletes.
    pub async fn take(&self) -> EntityChanges<E> {
        let pending = std::mem::take(&mut *self.pending.write().await);

        let mut changes = EntityChanges::default();
        for (id, entity) in pending {
            match entity {
                Some(entity) => changes.upserts.push(entity),
                None => changes.deletes.push(id),
            }
        }
        changes
    }

    async fn overlay(&self, base: Vec<E>, keep: impl Fn(&E) -> bool) -> Vec<E> {
        let pending = self.pending.read().await;

        let mut rows: BTreeMap<String, E> = base
            .into_iter()
            .filter(|e| !pending.contains_key(e.id()))
            .map(|e| (e.id().to_string(), e))
            .collect();

        for (id, entity) in pending.iter() {
            if let Some(entity) = entity.as_ref().filter(|e| keep(e)) {
                rows.insert(id.clone(), entity.clone());
            }
        }

        rows.into_values().collect()
    }
}

#[async_trait]
impl<E: Record> Store<E> for StagedStore<E> {
    async fn find(&self) -> Result<Vec<E>> {
        let base = self.base.find().await?;
        Ok(self.overlay(base, |_| true).await)
    }

    async fn find_one(&self, id: &str) -> Result<Option<E>> {
        if let Some(entity) = self.pending.read().await.get(id) {
            return Ok(entity.clone());
        }
        self.base.find_one(id).await
    }

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<E>> {
        let base = self.base.find_by_relation(filter).await?;
        Ok(self.overlay(base, |e| (self.matcher)(e, filter)).await)
    }

    async fn save(&self, entities: &[E]) -> Result<()> {
        let mut pending = self.pending.write().await;
        for entity in entities {
            pending.insert(entity.id().to_string(), Some(entity.clone()));
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        let mut pending = self.pending.write().await;
        for id in ids {
            pending.insert(id.clone(), None);
        }
        Ok(())
    }
}

/// A [`Registry`] whose writes stay buffered until [`StagedRegistry::commit`].
#[derive(Clone)]
pub struct StagedRegistry {
    base: Registry,
    chains: Arc<StagedStore<Chain>>,
    evm_networks: Arc<StagedStore<EvmNetwork>>,
    tokens: Arc<StagedStore<Token>>,
}

impl StagedRegistry {
    pub fn over(base: Registry) -> Self {
        Self {
            chains: Arc::new(StagedStore::new(base.chains.clone(), chain_matches)),
            evm_networks: Arc::new(StagedStore::new(base.evm_networks.clone(), network_matches)),
            tokens: Arc::new(StagedStore::new(base.tokens.clone(), token_matches)),
            base,
        }
    }

    /// Registry view reading and writing through the buffer.
    pub fn registry(&self) -> Registry {
        Registry::new(
            self.chains.clone(),
            self.evm_networks.clone(),
            self.tokens.clone(),
            Arc::new(self.clone())
        )
    }

    /// Hand every buffered change to the base registry in one write.
    pub async fn commit(&self) -> Result<()> {
        let changes = GraphChanges {
            chains: self.chains.take().await,
            evm_networks: self.evm_networks.take().await,
            tokens: self.tokens.take().await,
        };

        debug!(
            chains_upserted = changes.chains.upserts.len(),
            chains_deleted = changes.chains.deletes.len(),
            networks_upserted = changes.evm_networks.upserts.len(),
            networks_deleted = changes.evm_networks.deletes.len(),
            tokens_upserted = changes.tokens.upserts.len(),
            tokens_deleted = changes.tokens.deletes.len(),
            "Committing staged changes"
        );
        self.base.apply(changes).await
    }

    /// Drop every buffered change.
    pub async fn discard(&self) {
        self.chains.take().await;
        self.evm_networks.take().await;
        self.tokens.take().await;
    }
}

#[async_trait]
impl GraphWriter for StagedRegistry {
    async fn apply(&self, changes: GraphChanges) -> Result<()> {
        self.chains.save(&changes.chains.upserts).await?;
        self.chains.delete(&changes.chains.deletes).await?;
        self.evm_networks.save(&changes.evm_networks.upserts).await?;
        self.evm_networks.delete(&changes.evm_networks.deletes).await?;
        self.tokens.save(&changes.tokens.upserts).await?;
        self.tokens.delete(&changes.tokens.deletes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::db::memory::MemoryRegistry;
    use crate::models::Parachain;

    fn parachain(id: &str, relay: &str) -> Chain {
        let mut chain = Chain::new(id);
        chain.parachain = Some(Parachain { relay_id: relay.to_string(), para_id: 2000 });
        chain
    }

    #[tokio::test]
    async fn test_reads_see_buffered_writes_base_does_not() {
        let memory = MemoryRegistry::new();
        memory.chains.insert(Chain::new("polkadot"));
        memory.chains.insert(parachain("acala", "polkadot"));
        memory.chains.insert(Chain::new("rococo"));

        let staged = StagedRegistry::over(memory.registry());
        let view = staged.registry();

        view.chains.save(&[parachain("astar", "polkadot"), Chain::new("acala")]).await.unwrap();
        view.chains.delete(&["rococo".to_string()]).await.unwrap();

        let ids: Vec<String> = view.chains.find().await.unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["acala", "astar", "polkadot"]);
        assert!(view.chains.find_one("rococo").await.unwrap().is_none());

        // acala no longer names polkadot as its relay once the buffered write is seen
        let parachains: Vec<String> = view.chains
            .find_by_relation(&RelationFilter::Chain("polkadot".to_string())).await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(parachains, vec!["astar"]);

        assert!(memory.chains.get("rococo").is_some());
        assert!(memory.chains.get("astar").is_none());
        assert_eq!(memory.chains.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_commit_applies_everything_in_one_write() {
        let memory = MemoryRegistry::new();
        memory.chains.insert(Chain::new("rococo"));

        let staged = StagedRegistry::over(memory.registry());
        let view = staged.registry();
        view.chains.save(&[Chain::new("polkadot")]).await.unwrap();
        view.chains.delete(&["rococo".to_string()]).await.unwrap();
        view.evm_networks.save(&[EvmNetwork::new("1")]).await.unwrap();

        staged.commit().await.unwrap();

        assert_eq!(memory.commits.load(Ordering::SeqCst), 1);
        assert!(memory.chains.get("polkadot").is_some());
        assert!(memory.chains.get("rococo").is_none());
        assert!(memory.evm_networks.get("1").is_some());

        // the buffer is empty after a commit
        staged.commit().await.unwrap();
        assert_eq!(memory.commits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_discard_leaves_base_untouched() {
        let memory = MemoryRegistry::new();
        let staged = StagedRegistry::over(memory.registry());
        staged.registry().chains.save(&[Chain::new("polkadot")]).await.unwrap();

        staged.discard().await;
        staged.commit().await.unwrap();

        assert!(memory.chains.snapshot().is_empty());
        assert_eq!(memory.commits.load(Ordering::SeqCst), 0);
    }
}
