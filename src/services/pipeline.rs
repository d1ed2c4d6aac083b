use std::sync::Arc;
use std::time::Duration;

use chrono::{ DateTime, Utc };
use tracing::{ error, info, warn };

use crate::db::{ Registry, StagedRegistry };
use crate::error::Result;
use crate::feeds::{ ConfigFeed, ExternalRoster, PriceFeed };
use crate::metadata::{ MetadataDecoder, StorageHasher };
use crate::rpc::{ ChainRpcConnector, EvmRpcClient };

use super::chain_sync::{ collect_overrides, ChainSync };
use super::derived_fields::{ DerivedFields, RegistrySortOrder, SortOrder };
use super::evm_network_sync::EvmNetworkSync;
use super::metadata_extractor::MetadataExtractor;
use super::price_sync::PriceSync;
use super::reconciler::ReconcileOutcome;
use super::rpc_probe::RpcProbe;
use super::token_sync::{ TokenSync, TokenSyncInput, TokenSyncReport };

/// The event a run is started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTrigger {
    pub block_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
}

impl SyncTrigger {
    pub fn now() -> Self {
        Self {
            block_number: None,
            timestamp: Utc::now(),
        }
    }

    pub fn at_block(block_number: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            block_number: Some(block_number),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub probe_concurrency: usize,
    pub rpc_timeout: Duration,
    pub staleness_threshold: Duration,
    pub price_currencies: Vec<String>,
}

/// External collaborators the pipeline talks to.
pub struct PipelineClients {
    pub config_feed: Arc<dyn ConfigFeed>,
    pub price_feed: Arc<dyn PriceFeed>,
    pub connector: Arc<dyn ChainRpcConnector>,
    pub evm_client: Arc<dyn EvmRpcClient>,
    pub decoder: Arc<dyn MetadataDecoder>,
    pub hasher: Arc<dyn StorageHasher>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub chains: ReconcileOutcome,
    pub healthy_chains: usize,
    pub evm_networks: ReconcileOutcome,
    pub tokens: TokenSyncReport,
    pub sorted: usize,
    pub testnet_flags_changed: usize,
    pub prices_updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped { age: Duration },
    Completed(RunReport),
}

pub struct Pipeline {
    registry: Registry,
    config_feed: Arc<dyn ConfigFeed>,
    price_feed: Arc<dyn PriceFeed>,
    probe: Arc<RpcProbe>,
    extractor: Arc<MetadataExtractor>,
    order: Arc<dyn SortOrder>,
    settings: PipelineSettings,
}

/// The step services of one run, all bound to that run's staged registry.
struct Steps {
    chain_sync: ChainSync,
    evm_network_sync: EvmNetworkSync,
    token_sync: TokenSync,
    derived_fields: DerivedFields,
    price_sync: PriceSync,
}

impl Pipeline {
    pub fn new(registry: Registry, clients: PipelineClients, settings: PipelineSettings) -> Self {
        Self::with_sort_order(registry, clients, settings, Arc::new(RegistrySortOrder))
    }

    pub fn with_sort_order(
        registry: Registry,
        clients: PipelineClients,
        settings: PipelineSettings,
        order: Arc<dyn SortOrder>
    ) -> Self {
        let probe = Arc::new(
            RpcProbe::new(clients.connector.clone(), clients.evm_client, settings.rpc_timeout)
        );
        let extractor = Arc::new(
            MetadataExtractor::new(clients.connector, clients.decoder, clients.hasher, settings.rpc_timeout)
        );

        Self {
            registry,
            config_feed: clients.config_feed,
            price_feed: clients.price_feed,
            probe,
            extractor,
            order,
            settings,
        }
    }

    fn steps(&self, registry: Registry) -> Steps {
        let concurrency = self.settings.probe_concurrency;

        Steps {
            chain_sync: ChainSync::new(
                registry.chains.clone(),
                self.probe.clone(),
                self.extractor.clone(),
                concurrency
            ),
            evm_network_sync: EvmNetworkSync::new(
                registry.evm_networks.clone(),
                registry.chains.clone(),
                self.probe.clone(),
                concurrency
            ),
            token_sync: TokenSync::new(
                registry.tokens.clone(),
                registry.chains.clone(),
                registry.evm_networks.clone()
            ),
            price_sync: PriceSync::new(
                registry.tokens.clone(),
                self.price_feed.clone(),
                self.settings.price_currencies.clone()
            ),
            derived_fields: DerivedFields::new(registry, self.order.clone()),
        }
    }

    /// Run every step once, or nothing at all if the trigger is stale.
    ///
    /// Steps write to a staging buffer. The buffer is committed in one
    /// transaction only after the last step succeeds, so a failed run leaves
    /// the persisted graph exactly as the previous run left it.
    pub async fn run(&self, trigger: &SyncTrigger) -> Result<RunOutcome> {
        let age = (Utc::now() - trigger.timestamp).to_std().unwrap_or_default();
        if age > self.settings.staleness_threshold {
            warn!(block = ?trigger.block_number, age_secs = age.as_secs(), "Skipping stale trigger");
            return Ok(RunOutcome::Skipped { age });
        }

        info!(block = ?trigger.block_number, "Pipeline run started");

        let roster = match self.config_feed.fetch().await {
            Ok(roster) => roster,
            Err(e) => {
                error!(error = %e, "Config feed unavailable, aborting run");
                return Err(e);
            }
        };

        let staged = StagedRegistry::over(self.registry.clone());
        let report = match Self::run_steps(&self.steps(staged.registry()), &roster).await {
            Ok(report) => report,
            Err(e) => {
                staged.discard().await;
                error!(error = %e, "Pipeline run failed, nothing committed");
                return Err(e);
            }
        };

        if let Err(e) = staged.commit().await {
            error!(error = %e, "Failed to commit pipeline run");
            return Err(e);
        }

        info!(
            chains_kept = report.chains.kept.len(),
            chains_deleted = report.chains.deleted.len(),
            healthy_chains = report.healthy_chains,
            networks_kept = report.evm_networks.kept.len(),
            networks_deleted = report.evm_networks.deleted.len(),
            networks_skipped = report.evm_networks.skipped,
            native_tokens = report.tokens.native.kept.len(),
            orml_tokens = report.tokens.orml.kept.len(),
            erc20_tokens = report.tokens.erc20.kept.len(),
            orphans = report.tokens.orphans.len(),
            prices_updated = report.prices_updated,
            "Pipeline run completed"
        );

        Ok(RunOutcome::Completed(report))
    }

    async fn run_steps(steps: &Steps, roster: &ExternalRoster) -> Result<RunReport> {
        let overrides = collect_overrides(&roster.chains);

        let chains = steps.chain_sync.sync_roster(&roster.chains).await?;
        let extracted = steps.chain_sync.refresh_health(&overrides).await?;

        let networks = steps.evm_network_sync.sync(&roster.evm_networks).await?;

        let tokens = steps.token_sync.sync(
            &(TokenSyncInput {
                records: &roster.tokens,
                extracted: &extracted,
                standalone: &networks.standalone,
            })
        ).await?;

        let sorted = steps.derived_fields.assign_sort_indices().await?;
        let testnet_flags_changed = steps.derived_fields.propagate_testnet().await?;

        let prices_updated = match steps.price_sync.refresh().await {
            Ok(updated) => updated,
            Err(e) => {
                error!(error = %e, "Price feed unavailable, aborting run");
                return Err(e);
            }
        };

        Ok(RunReport {
            chains,
            healthy_chains: extracted.len(),
            evm_networks: networks.outcome,
            tokens,
            sorted,
            testnet_flags_changed,
            prices_updated,
        })
    }
}
