use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::{ self, StreamExt };
use tracing::{ debug, info, warn };

use crate::db::Store;
use crate::enums::RpcProtocol;
use crate::error::Result;
use crate::feeds::ChainRecord;
use crate::metadata::ChainOverrides;
use crate::models::rpc::healthy_urls;
use crate::models::{ Chain, Parachain, Rpc, Token };

use super::metadata_extractor::{ ChainMetadata, MetadataExtractor };
use super::reconciler::{ reconcile, Identity, ReconcileOutcome };
use super::rpc_probe::RpcProbe;

/// Owns the chain family: roster reconciliation, then probing and
/// extraction for every reconciled chain.
pub struct ChainSync {
    chains: Arc<dyn Store<Chain>>,
    probe: Arc<RpcProbe>,
    extractor: Arc<MetadataExtractor>,
    concurrency: usize,
}

impl ChainSync {
    pub fn new(
        chains: Arc<dyn Store<Chain>>,
        probe: Arc<RpcProbe>,
        extractor: Arc<MetadataExtractor>,
        concurrency: usize
    ) -> Self {
        Self {
            chains,
            probe,
            extractor,
            concurrency: concurrency.max(1),
        }
    }

    /// Reconcile the chain roster. Relays are processed before the chains
    /// that point at them so a parachain only links to a relay that has
    /// already been saved in this pass.
    pub async fn sync_roster(&self, records: &[ChainRecord]) -> Result<ReconcileOutcome> {
        let mut ordered: Vec<&ChainRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.relay.is_some());

        let existing = self.chains.find().await?;
        let outcome = reconcile(
            self.chains.as_ref(),
            existing,
            &ordered,
            |record| Identity::Known(record.id.clone()),
            |existing, record, ctx| {
                let mut chain = existing.unwrap_or_else(|| Chain::new(ctx.id));
                chain.is_testnet = record.is_testnet;
                chain.name = record.name.clone();
                chain.rpcs = record.rpcs.iter().map(Rpc::new).collect();

                chain.parachain = match (&record.relay, record.para_id) {
                    (Some(relay_id), Some(para_id)) if relay_id != ctx.id && ctx.kept.contains(relay_id) =>
                        Some(Parachain { relay_id: relay_id.clone(), para_id }),
                    (Some(relay_id), _) => {
                        debug!(chain = %ctx.id, relay = %relay_id, "Relay not resolvable, clearing parachain link");
                        None
                    }
                    _ => None,
                };
                chain
            }
        ).await?;

        info!(kept = outcome.kept.len(), deleted = outcome.deleted.len(), "Chain roster reconciled");
        Ok(outcome)
    }

    /// Probe and extract every persisted chain with bounded parallelism.
    /// Returns the metadata of each chain whose extraction succeeded.
    pub async fn refresh_health(
        &self,
        overrides: &HashMap<String, ChainOverrides>
    ) -> Result<HashMap<String, ChainMetadata>> {
        let chains = self.chains.find().await?;
        let default_overrides = ChainOverrides::default();

        let refreshed: Vec<(Chain, Option<ChainMetadata>)> = stream
            ::iter(chains)
            .map(|chain| {
                let overrides = overrides.get(&chain.id).unwrap_or(&default_overrides);
                self.refresh_chain(chain, overrides)
            })
            .buffer_unordered(self.concurrency)
            .collect().await;

        let healthy = refreshed
            .iter()
            .filter(|(chain, _)| chain.is_healthy)
            .count();
        info!(chains = refreshed.len(), healthy, "Chain health refreshed");

        let (chains, metadata): (Vec<Chain>, Vec<Option<ChainMetadata>>) = refreshed.into_iter().unzip();
        self.chains.save(&chains).await?;

        Ok(
            chains
                .into_iter()
                .zip(metadata)
                .filter_map(|(chain, metadata)| metadata.map(|m| (chain.id, m)))
                .collect()
        )
    }

    async fn refresh_chain(&self, mut chain: Chain, overrides: &ChainOverrides) -> (Chain, Option<ChainMetadata>) {
        let urls: Vec<String> = chain.rpcs
            .iter()
            .map(|rpc| rpc.url.clone())
            .collect();
        chain.rpcs = self.probe.probe(RpcProtocol::Substrate, &urls).await.rpcs;

        let metadata = match self.extractor.extract(&chain.id, &healthy_urls(&chain.rpcs), overrides).await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(chain = %chain.id, error = %e, "Marking chain unhealthy");
                None
            }
        };

        chain.is_healthy = metadata.is_some();
        if let Some(metadata) = &metadata {
            apply_metadata(&mut chain, metadata);
        }

        (chain, metadata)
    }
}

fn apply_metadata(chain: &mut Chain, metadata: &ChainMetadata) {
    chain.genesis_hash = Some(metadata.genesis_hash.clone());
    chain.chain_name = metadata.chain_name.clone();
    chain.spec_name = metadata.spec_name.clone();
    chain.impl_name = metadata.impl_name.clone();
    chain.spec_version = metadata.spec_version;
    chain.impl_version = metadata.impl_version;
    chain.prefix = metadata.ss58_prefix;
    chain.currency_id_index = metadata.currency_id_index;
    chain.native_token_id = metadata.native_token
        .as_ref()
        .map(|native| Token::substrate_native_id(&chain.id, &native.symbol));
}

/// Overrides for every chain of the roster, keyed by chain id.
pub fn collect_overrides(records: &[ChainRecord]) -> HashMap<String, ChainOverrides> {
    records
        .iter()
        .map(|record| {
            (
                record.id.clone(),
                ChainOverrides::resolve(
                    &record.id,
                    record.native_token.as_ref(),
                    record.orml_tokens.as_deref()
                ),
            )
        })
        .collect()
}
