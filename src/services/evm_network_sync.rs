use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{ self, StreamExt };
use tracing::{ debug, info, warn };

use crate::db::Store;
use crate::enums::RpcProtocol;
use crate::error::Result;
use crate::feeds::{ EvmNativeTokenRecord, EvmNetworkRecord };
use crate::models::{ Chain, EvmNetwork, Token };

use super::reconciler::{ reconcile, Identity, ReconcileOutcome };
use super::rpc_probe::{ ProbeOutcome, RpcProbe };

/// How a network is recognised before its canonical id is known.
#[derive(Debug, Clone, PartialEq, Eq)]
enum NetworkKey {
    Linked(String),
    Standalone(String),
}

impl NetworkKey {
    fn matches(&self, network: &EvmNetwork) -> bool {
        match self {
            NetworkKey::Linked(chain_id) => network.substrate_chain_id.as_deref() == Some(chain_id.as_str()),
            NetworkKey::Standalone(name) => !network.is_linked() && network.name.as_deref() == Some(name.as_str()),
        }
    }
}

struct ProbedNetwork<'a> {
    record: &'a EvmNetworkRecord,
    key: NetworkKey,
    linked_chain: Option<Chain>,
    probe: ProbeOutcome,
}

/// A standalone network resolved this run together with the native token
/// its record declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandaloneNative {
    pub network_id: String,
    pub token: Option<EvmNativeTokenRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvmNetworkSyncReport {
    pub outcome: ReconcileOutcome,
    pub standalone: Vec<StandaloneNative>,
}

pub struct EvmNetworkSync {
    networks: Arc<dyn Store<EvmNetwork>>,
    chains: Arc<dyn Store<Chain>>,
    probe: Arc<RpcProbe>,
    concurrency: usize,
}

impl EvmNetworkSync {
    pub fn new(
        networks: Arc<dyn Store<EvmNetwork>>,
        chains: Arc<dyn Store<Chain>>,
        probe: Arc<RpcProbe>,
        concurrency: usize
    ) -> Self {
        Self {
            networks,
            chains,
            probe,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn sync(&self, records: &[EvmNetworkRecord]) -> Result<EvmNetworkSyncReport> {
        let chains: HashMap<String, Chain> = self.chains
            .find().await?
            .into_iter()
            .map(|chain| (chain.id.clone(), chain))
            .collect();

        let candidates: Vec<(&EvmNetworkRecord, NetworkKey, Option<Chain>)> = records
            .iter()
            .filter_map(|record| {
                match (&record.substrate_chain_id, &record.name) {
                    (Some(chain_id), _) =>
                        match chains.get(chain_id) {
                            Some(chain) => Some((record, NetworkKey::Linked(chain_id.clone()), Some(chain.clone()))),
                            None => {
                                debug!(chain = %chain_id, "Linked chain not persisted, skipping network");
                                None
                            }
                        }
                    (None, Some(name)) => Some((record, NetworkKey::Standalone(name.clone()), None)),
                    (None, None) => {
                        warn!(rpcs = ?record.rpcs, "EVM network has neither chain nor name");
                        None
                    }
                }
            })
            .collect();

        let probed: Vec<ProbedNetwork<'_>> = stream
            ::iter(candidates)
            .map(|(record, key, linked_chain)| async move {
                let probe = self.probe.probe(RpcProtocol::Ethereum, &record.rpcs).await;
                ProbedNetwork { record, key, linked_chain, probe }
            })
            .buffered(self.concurrency)
            .boxed()
            .collect().await;

        let existing = self.networks.find().await?;
        let previous_ids: Vec<Option<String>> = probed
            .iter()
            .map(|network| {
                existing
                    .iter()
                    .find(|e| network.key.matches(e))
                    .map(|e| e.id.clone())
            })
            .collect();

        let indexed: Vec<(usize, &ProbedNetwork<'_>)> = probed.iter().enumerate().collect();
        let mut standalone = Vec::new();

        let outcome = reconcile(
            self.networks.as_ref(),
            existing,
            &indexed,
            |(index, network)| {
                match network.probe.canonical_id {
                    Some(id) => Identity::Known(id.to_string()),
                    None => {
                        debug!(key = ?network.key, "No canonical id this run");
                        Identity::Pending(previous_ids[*index].clone())
                    }
                }
            },
            |existing, (_, network), ctx| {
                let mut entity = existing.unwrap_or_else(|| EvmNetwork::new(ctx.id));
                entity.rpcs = network.probe.rpcs.clone();
                entity.is_healthy = network.probe.is_healthy();
                entity.explorer_url = network.record.explorer_url.clone();

                match &network.linked_chain {
                    Some(chain) => {
                        entity.substrate_chain_id = Some(chain.id.clone());
                        entity.is_testnet = chain.is_testnet;
                        entity.name = Some(chain.display_name().to_string());
                        entity.native_token_id = chain.native_token_id.clone();
                    }
                    None => {
                        entity.substrate_chain_id = None;
                        entity.is_testnet = network.record.is_testnet;
                        entity.name = network.record.name.clone();
                        entity.native_token_id = network.record.native_token
                            .as_ref()
                            .map(|token| Token::evm_native_id(ctx.id, &token.symbol));
                        standalone.push(StandaloneNative {
                            network_id: ctx.id.to_string(),
                            token: network.record.native_token.clone(),
                        });
                    }
                }
                entity
            }
        ).await?;

        info!(
            kept = outcome.kept.len(),
            deleted = outcome.deleted.len(),
            skipped = outcome.skipped,
            "EVM networks reconciled"
        );

        Ok(EvmNetworkSyncReport { outcome, standalone })
    }
}
