//! In-memory [`Store`] used by tests in place of Postgres.

use std::collections::BTreeMap;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };

use async_trait::async_trait;

use crate::db::{
    chain_matches,
    network_matches,
    token_matches,
    GraphChanges,
    GraphWriter,
    Registry,
    RelationFilter,
    RelationMatcher,
    Store,
};
use crate::error::Result;
use crate::models::{ Chain, EvmNetwork, Record, Token };

pub struct MemoryStore<E: Record> {
    rows: Mutex<BTreeMap<String, E>>,
    matcher: RelationMatcher<E>,
    pub saves: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl<E: Record> MemoryStore<E> {
    pub fn new(matcher: RelationMatcher<E>) -> Self {
        Self {
            rows: Mutex::new(BTreeMap::new()),
            matcher,
            saves: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(&self) -> Vec<E> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<E> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn insert(&self, entity: E) {
        self.rows.lock().unwrap().insert(entity.id().to_string(), entity);
    }
}

#[async_trait]
impl<E: Record> Store<E> for MemoryStore<E> {
    async fn find(&self) -> Result<Vec<E>> {
        Ok(self.snapshot())
    }

    async fn find_one(&self, id: &str) -> Result<Option<E>> {
        Ok(self.get(id))
    }

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<E>> {
        Ok(
            self
                .snapshot()
                .into_iter()
                .filter(|e| (self.matcher)(e, filter))
                .collect()
        )
    }

    async fn save(&self, entities: &[E]) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        for entity in entities {
            rows.insert(entity.id().to_string(), entity.clone());
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<()> {
        self.deletes.fetch_add(ids.len(), Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        for id in ids {
            rows.remove(id);
        }
        Ok(())
    }
}

/// Registry over fresh in-memory stores, with typed handles for assertions.
pub struct MemoryRegistry {
    pub chains: Arc<MemoryStore<Chain>>,
    pub evm_networks: Arc<MemoryStore<EvmNetwork>>,
    pub tokens: Arc<MemoryStore<Token>>,
    /// Number of multi-family writes applied.
    pub commits: Arc<AtomicUsize>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self {
            chains: Arc::new(MemoryStore::new(chain_matches)),
            evm_networks: Arc::new(MemoryStore::new(network_matches)),
            tokens: Arc::new(MemoryStore::new(token_matches)),
            commits: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn registry(&self) -> Registry {
        let writer = MemoryWriter {
            chains: self.chains.clone(),
            evm_networks: self.evm_networks.clone(),
            tokens: self.tokens.clone(),
            commits: self.commits.clone(),
        };
        Registry::new(self.chains.clone(), self.evm_networks.clone(), self.tokens.clone(), Arc::new(writer))
    }
}

struct MemoryWriter {
    chains: Arc<MemoryStore<Chain>>,
    evm_networks: Arc<MemoryStore<EvmNetwork>>,
    tokens: Arc<MemoryStore<Token>>,
    commits: Arc<AtomicUsize>,
}

impl MemoryWriter {
    fn write<E: Record>(store: &MemoryStore<E>, upserts: Vec<E>, deletes: Vec<String>) {
        let mut rows = store.rows.lock().unwrap();
        for id in deletes {
            rows.remove(&id);
        }
        for entity in upserts {
            rows.insert(entity.id().to_string(), entity);
        }
    }
}

#[async_trait]
impl GraphWriter for MemoryWriter {
    async fn apply(&self, changes: GraphChanges) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Self::write(&self.chains, changes.chains.upserts, changes.chains.deletes);
        Self::write(&self.evm_networks, changes.evm_networks.upserts, changes.evm_networks.deletes);
        Self::write(&self.tokens, changes.tokens.upserts, changes.tokens.deletes);
        Ok(())
    }
}
