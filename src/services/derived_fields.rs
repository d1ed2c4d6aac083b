//! Fields computed from the reconciled graph as a whole rather than from any
//! single source record.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::db::{ EntityChanges, GraphChanges, Registry };
use crate::error::Result;
use crate::models::Token;

/// Relays that always lead their group, in this order.
const PRIORITY_CHAINS: [&str; 2] = ["polkadot", "kusama"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    Chain,
    EvmNetwork,
}

/// What an ordering function gets to see of each chain or network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortEntry {
    pub kind: EntryKind,
    pub id: String,
    pub name: String,
    pub is_testnet: bool,
    pub relay_id: Option<String>,
}

/// Presentation order over the combined chain and network set.
pub trait SortOrder: Send + Sync {
    fn compare(&self, a: &SortEntry, b: &SortEntry, entries: &HashMap<String, &SortEntry>) -> Ordering;
}

/// Mainnets first, the priority relays and their parachains next, then the
/// remaining relay groups, chains before networks, by name then id.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrySortOrder;

impl RegistrySortOrder {
    fn key<'a>(
        entry: &'a SortEntry,
        chains: &'a HashMap<String, &SortEntry>
    ) -> (bool, usize, u8, String, bool, String, &'a str) {
        let (family, group_id, group_name) = match entry.kind {
            EntryKind::Chain => {
                let group_id = entry.relay_id.as_deref().unwrap_or(&entry.id);
                let group_name = chains
                    .get(group_id)
                    .map(|relay| relay.name.to_lowercase())
                    .unwrap_or_else(|| entry.name.to_lowercase());
                (0, group_id, group_name)
            }
            EntryKind::EvmNetwork => (1, entry.id.as_str(), entry.name.to_lowercase()),
        };

        let priority = PRIORITY_CHAINS.iter()
            .position(|id| entry.kind == EntryKind::Chain && *id == group_id)
            .unwrap_or(PRIORITY_CHAINS.len());

        (
            entry.is_testnet,
            priority,
            family,
            group_name,
            entry.relay_id.is_some(),
            entry.name.to_lowercase(),
            entry.id.as_str(),
        )
    }
}

impl SortOrder for RegistrySortOrder {
    fn compare(&self, a: &SortEntry, b: &SortEntry, entries: &HashMap<String, &SortEntry>) -> Ordering {
        Self::key(a, entries).cmp(&Self::key(b, entries))
    }
}

pub struct DerivedFields {
    registry: Registry,
    order: Arc<dyn SortOrder>,
}

impl DerivedFields {
    pub fn new(registry: Registry, order: Arc<dyn SortOrder>) -> Self {
        Self { registry, order }
    }

    /// Number every chain and network from 1 in presentation order. Both
    /// families are written in a single transaction.
    pub async fn assign_sort_indices(&self) -> Result<usize> {
        let mut chains = self.registry.chains.find().await?;
        let mut networks = self.registry.evm_networks.find().await?;

        let entries: Vec<SortEntry> = chains
            .iter()
            .map(|chain| SortEntry {
                kind: EntryKind::Chain,
                id: chain.id.clone(),
                name: chain.display_name().to_string(),
                is_testnet: chain.is_testnet,
                relay_id: chain.relay_id().map(str::to_string),
            })
            .chain(
                networks.iter().map(|network| SortEntry {
                    kind: EntryKind::EvmNetwork,
                    id: network.id.clone(),
                    name: network.display_name().to_string(),
                    is_testnet: network.is_testnet,
                    relay_id: None,
                })
            )
            .collect();

        let chain_entries: HashMap<String, &SortEntry> = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Chain)
            .map(|e| (e.id.clone(), e))
            .collect();

        let mut ordered: Vec<&SortEntry> = entries.iter().collect();
        ordered.sort_by(|a, b| self.order.compare(a, b, &chain_entries));

        let indices: HashMap<(EntryKind, &str), u32> = ordered
            .iter()
            .zip(1u32..)
            .map(|(entry, index)| ((entry.kind, entry.id.as_str()), index))
            .collect();

        for chain in &mut chains {
            chain.sort_index = indices.get(&(EntryKind::Chain, chain.id.as_str())).copied();
        }
        for network in &mut networks {
            network.sort_index = indices.get(&(EntryKind::EvmNetwork, network.id.as_str())).copied();
        }

        self.registry.apply(GraphChanges {
            chains: EntityChanges::upserts(chains),
            evm_networks: EntityChanges::upserts(networks),
            tokens: EntityChanges::default(),
        }).await?;

        Ok(indices.len())
    }

    /// A token is a testnet token only if everything referencing it is.
    pub async fn propagate_testnet(&self) -> Result<usize> {
        let chains = self.registry.chains.find().await?;
        let networks = self.registry.evm_networks.find().await?;

        let chain_flags: HashMap<&str, bool> = chains
            .iter()
            .map(|c| (c.id.as_str(), c.is_testnet))
            .collect();
        let network_flags: HashMap<&str, bool> = networks
            .iter()
            .map(|n| (n.id.as_str(), n.is_testnet))
            .collect();

        let changed: Vec<Token> = self.registry.tokens
            .find().await?
            .into_iter()
            .filter_map(|mut token| {
                let anchor = token
                    .chain_id()
                    .and_then(|id| chain_flags.get(id))
                    .or_else(|| token.evm_network_id().and_then(|id| network_flags.get(id)))
                    .copied();

                let native_to = chains
                    .iter()
                    .filter(|c| c.native_token_id.as_deref() == Some(token.id.as_str()))
                    .map(|c| c.is_testnet)
                    .chain(
                        networks
                            .iter()
                            .filter(|n| n.native_token_id.as_deref() == Some(token.id.as_str()))
                            .map(|n| n.is_testnet)
                    );

                let is_testnet = testnet_flag(anchor.into_iter().chain(native_to));
                if token.is_testnet == is_testnet {
                    return None;
                }
                token.is_testnet = is_testnet;
                Some(token)
            })
            .collect();

        if !changed.is_empty() {
            self.registry.tokens.save(&changed).await?;
        }
        info!(changed = changed.len(), "Testnet flags propagated");
        Ok(changed.len())
    }
}

/// AND over every referencing flag. Nothing referencing the token counts
/// as testnet.
pub fn testnet_flag(flags: impl IntoIterator<Item = bool>) -> bool {
    flags.into_iter().all(|flag| flag)
}
