use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ Chain, EvmNetwork, Record, Token };

/// Filter by the id of a related entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationFilter {
    /// Chains: parachains of this relay. Networks: networks linked to this
    /// chain. Tokens: tokens anchored to this chain.
    Chain(String),
    /// Tokens anchored to this EVM network.
    EvmNetwork(String),
}

/// Entity-addressed persistence for one entity family.
#[async_trait]
pub trait Store<E: Record>: Send + Sync {
    async fn find(&self) -> Result<Vec<E>>;

    async fn find_one(&self, id: &str) -> Result<Option<E>>;

    async fn find_by_relation(&self, filter: &RelationFilter) -> Result<Vec<E>>;

    /// Upsert every entity inside a single transaction.
    async fn save(&self, entities: &[E]) -> Result<()>;

    async fn delete(&self, ids: &[String]) -> Result<()>;
}

/// In-process equivalent of [`Store::find_by_relation`].
pub type RelationMatcher<E> = fn(&E, &RelationFilter) -> bool;

pub fn chain_matches(chain: &Chain, filter: &RelationFilter) -> bool {
    matches!(filter, RelationFilter::Chain(id) if chain.relay_id() == Some(id.as_str()))
}

pub fn network_matches(network: &EvmNetwork, filter: &RelationFilter) -> bool {
    matches!(filter, RelationFilter::Chain(id) if network.substrate_chain_id.as_deref() == Some(id.as_str()))
}

pub fn token_matches(token: &Token, filter: &RelationFilter) -> bool {
    match filter {
        RelationFilter::Chain(id) => token.chain_id() == Some(id.as_str()),
        RelationFilter::EvmNetwork(id) => token.evm_network_id() == Some(id.as_str()),
    }
}

/// Upserts and deletes for one entity family.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityChanges<E> {
    pub upserts: Vec<E>,
    pub deletes: Vec<String>,
}

impl<E> Default for EntityChanges<E> {
    fn default() -> Self {
        Self {
            upserts: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<E> EntityChanges<E> {
    pub fn upserts(upserts: Vec<E>) -> Self {
        Self {
            upserts,
            deletes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Changes across all three families, applied as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphChanges {
    pub chains: EntityChanges<Chain>,
    pub evm_networks: EntityChanges<EvmNetwork>,
    pub tokens: EntityChanges<Token>,
}

impl GraphChanges {
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty() && self.evm_networks.is_empty() && self.tokens.is_empty()
    }
}

/// Applies a [`GraphChanges`] atomically: either every change lands or none.
#[async_trait]
pub trait GraphWriter: Send + Sync {
    async fn apply(&self, changes: GraphChanges) -> Result<()>;
}
