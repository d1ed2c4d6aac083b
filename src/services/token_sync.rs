use std::collections::{ HashMap, HashSet };
use std::sync::Arc;

use ethers::types::Address;
use tracing::{ debug, info, warn };

use crate::db::{ RelationFilter, Store };
use crate::enums::TokenKind;
use crate::error::Result;
use crate::feeds::TokenRecord;
use crate::models::{ Chain, EvmNetwork, NativeAnchor, Token, TokenVariant };

use super::evm_network_sync::StandaloneNative;
use super::metadata_extractor::ChainMetadata;
use super::reconciler::{ reconcile, Identity, ReconcileOutcome };

const DEFAULT_ERC20_DECIMALS: u8 = 18;

/// Read-only state handed over by the earlier steps of the run.
pub struct TokenSyncInput<'a> {
    pub records: &'a [TokenRecord],
    /// Chains whose extraction succeeded this run.
    pub extracted: &'a HashMap<String, ChainMetadata>,
    pub standalone: &'a [StandaloneNative],
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSyncReport {
    pub overridden: usize,
    pub native: ReconcileOutcome,
    pub orml: ReconcileOutcome,
    pub erc20: ReconcileOutcome,
    pub orphans: Vec<String>,
}

/// Symbol and price-feed id replacements keyed by token id.
struct TokenOverrides<'a>(HashMap<&'a str, &'a TokenRecord>);

impl<'a> TokenOverrides<'a> {
    fn new(records: &'a [TokenRecord]) -> Self {
        Self(
            records
                .iter()
                .filter_map(|record| record.id.as_deref().map(|id| (id, record)))
                .collect()
        )
    }

    /// Returns whether anything changed.
    fn apply(&self, token: &mut Token) -> bool {
        let Some(record) = self.0.get(token.id.as_str()) else {
            return false;
        };

        let mut changed = false;
        if let Some(symbol) = &record.symbol {
            changed |= token.symbol != *symbol;
            token.symbol = symbol.clone();
        }
        if let Some(coingecko_id) = &record.coingecko_id {
            changed |= token.coingecko_id.as_ref() != Some(coingecko_id);
            token.coingecko_id = Some(coingecko_id.clone());
        }
        changed
    }
}

pub struct TokenSync {
    tokens: Arc<dyn Store<Token>>,
    chains: Arc<dyn Store<Chain>>,
    networks: Arc<dyn Store<EvmNetwork>>,
}

impl TokenSync {
    pub fn new(
        tokens: Arc<dyn Store<Token>>,
        chains: Arc<dyn Store<Chain>>,
        networks: Arc<dyn Store<EvmNetwork>>
    ) -> Self {
        Self { tokens, chains, networks }
    }

    pub async fn sync(&self, input: &TokenSyncInput<'_>) -> Result<TokenSyncReport> {
        let overrides = TokenOverrides::new(input.records);
        let mut report = TokenSyncReport {
            overridden: self.apply_overrides(&overrides).await?,
            ..Default::default()
        };

        let mut chain_ids: Vec<&String> = input.extracted.keys().collect();
        chain_ids.sort();
        for chain_id in chain_ids {
            let metadata = &input.extracted[chain_id];
            let (native, orml) = self.sync_chain_tokens(chain_id, metadata, &overrides).await?;
            report.native.absorb(native);
            report.orml.absorb(orml);
        }

        for network in input.standalone {
            let native = self.sync_evm_native(network, &overrides).await?;
            report.native.absorb(native);
        }

        report.erc20 = self.sync_erc20(input.records, &overrides).await?;
        report.orphans = self.sweep_orphans().await?;

        info!(
            overridden = report.overridden,
            native = report.native.kept.len(),
            orml = report.orml.kept.len(),
            erc20 = report.erc20.kept.len(),
            deleted = report.native.deleted.len() + report.orml.deleted.len() + report.erc20.deleted.len(),
            orphans = report.orphans.len(),
            "Tokens reconciled"
        );

        Ok(report)
    }

    async fn apply_overrides(&self, overrides: &TokenOverrides<'_>) -> Result<usize> {
        let changed: Vec<Token> = self.tokens
            .find().await?
            .into_iter()
            .filter_map(|mut token| overrides.apply(&mut token).then_some(token))
            .collect();

        if !changed.is_empty() {
            self.tokens.save(&changed).await?;
        }
        Ok(changed.len())
    }

    /// Native and orml tokens of one successfully extracted chain.
    async fn sync_chain_tokens(
        &self,
        chain_id: &str,
        metadata: &ChainMetadata,
        overrides: &TokenOverrides<'_>
    ) -> Result<(ReconcileOutcome, ReconcileOutcome)> {
        let (existing_native, existing_orml): (Vec<Token>, Vec<Token>) = self.tokens
            .find_by_relation(&RelationFilter::Chain(chain_id.to_string())).await?
            .into_iter()
            .partition(|token| token.kind() == TokenKind::SubstrateNative);

        let native = reconcile(
            self.tokens.as_ref(),
            existing_native,
            metadata.native_token.as_slice(),
            |native| Identity::Known(Token::substrate_native_id(chain_id, &native.symbol)),
            |existing, native, ctx| {
                let variant = TokenVariant::Native {
                    anchor: NativeAnchor::Chain(chain_id.to_string()),
                    existential_deposit: native.existential_deposit,
                };
                let mut token = existing.unwrap_or_else(|| Token::new(ctx.id, &native.symbol, native.decimals, variant.clone()));
                token.symbol = native.symbol.clone();
                token.decimals = native.decimals;
                token.coingecko_id = native.coingecko_id.clone();
                token.variant = variant;
                overrides.apply(&mut token);
                token
            }
        ).await?;

        let orml = reconcile(
            self.tokens.as_ref(),
            existing_orml,
            &metadata.orml_tokens,
            |orml| Identity::Known(Token::substrate_orml_id(chain_id, &orml.symbol)),
            |existing, orml, ctx| {
                let variant = TokenVariant::Orml {
                    chain_id: chain_id.to_string(),
                    state_key: orml.state_key.clone(),
                    existential_deposit: None,
                };
                let mut token = existing.unwrap_or_else(|| Token::new(ctx.id, &orml.symbol, orml.decimals, variant.clone()));
                token.symbol = orml.symbol.clone();
                token.decimals = orml.decimals;
                token.coingecko_id = orml.coingecko_id.clone();
                token.variant = variant;
                overrides.apply(&mut token);
                token
            }
        ).await?;

        debug!(chain = %chain_id, native = native.kept.len(), orml = orml.kept.len(), "Chain tokens reconciled");
        Ok((native, orml))
    }

    async fn sync_evm_native(
        &self,
        network: &StandaloneNative,
        overrides: &TokenOverrides<'_>
    ) -> Result<ReconcileOutcome> {
        let existing: Vec<Token> = self.tokens
            .find_by_relation(&RelationFilter::EvmNetwork(network.network_id.clone())).await?
            .into_iter()
            .filter(|token| token.kind() == TokenKind::EvmNative)
            .collect();

        reconcile(
            self.tokens.as_ref(),
            existing,
            network.token.as_slice(),
            |record| Identity::Known(Token::evm_native_id(&network.network_id, &record.symbol)),
            |existing, record, ctx| {
                let variant = TokenVariant::Native {
                    anchor: NativeAnchor::EvmNetwork(network.network_id.clone()),
                    existential_deposit: None,
                };
                let mut token = existing.unwrap_or_else(|| Token::new(ctx.id, &record.symbol, record.decimals, variant.clone()));
                token.symbol = record.symbol.clone();
                token.decimals = record.decimals;
                token.coingecko_id = record.coingecko_id.clone();
                token.variant = variant;
                overrides.apply(&mut token);
                token
            }
        ).await
    }

    /// Contract tokens for networks persisted by now. Records pointing at
    /// any other network are dropped for this run.
    async fn sync_erc20(&self, records: &[TokenRecord], overrides: &TokenOverrides<'_>) -> Result<ReconcileOutcome> {
        let networks: HashSet<String> = self.networks
            .find().await?
            .into_iter()
            .map(|network| network.id)
            .collect();

        let existing: Vec<Token> = self.tokens
            .find().await?
            .into_iter()
            .filter(|token| token.kind() == TokenKind::EvmErc20)
            .collect();

        let candidates: Vec<Erc20Candidate<'_>> = records
            .iter()
            .filter_map(|record| Erc20Candidate::from_record(record, &networks))
            .collect();

        reconcile(
            self.tokens.as_ref(),
            existing,
            &candidates,
            |candidate| Identity::Known(Token::evm_erc20_id(candidate.network_id, &candidate.contract_address)),
            |existing, candidate, ctx| {
                let record = candidate.record;
                let variant = TokenVariant::Erc20 {
                    evm_network_id: candidate.network_id.to_string(),
                    contract_address: candidate.contract_address.clone(),
                };
                let decimals = record.decimals.unwrap_or(DEFAULT_ERC20_DECIMALS);
                let mut token = existing.unwrap_or_else(|| Token::new(ctx.id, candidate.symbol, decimals, variant.clone()));
                token.symbol = candidate.symbol.to_string();
                token.decimals = decimals;
                token.coingecko_id = record.coingecko_id.clone();
                token.variant = variant;
                overrides.apply(&mut token);
                token
            }
        ).await
    }

    /// Delete every token whose anchor is gone.
    async fn sweep_orphans(&self) -> Result<Vec<String>> {
        let chains: HashSet<String> = self.chains
            .find().await?
            .into_iter()
            .map(|chain| chain.id)
            .collect();
        let networks: HashSet<String> = self.networks
            .find().await?
            .into_iter()
            .map(|network| network.id)
            .collect();

        let orphans: Vec<String> = self.tokens
            .find().await?
            .into_iter()
            .filter(|token| {
                let anchored = match (token.chain_id(), token.evm_network_id()) {
                    (Some(chain_id), _) => chains.contains(chain_id),
                    (None, Some(network_id)) => networks.contains(network_id),
                    (None, None) => false,
                };
                !anchored
            })
            .map(|token| token.id)
            .collect();

        if !orphans.is_empty() {
            self.tokens.delete(&orphans).await?;
        }
        Ok(orphans)
    }
}

struct Erc20Candidate<'a> {
    record: &'a TokenRecord,
    network_id: &'a str,
    symbol: &'a str,
    /// Lowercase 0x-prefixed form.
    contract_address: String,
}

impl<'a> Erc20Candidate<'a> {
    fn from_record(record: &'a TokenRecord, networks: &HashSet<String>) -> Option<Self> {
        let (Some(contract), Some(network_id)) = (&record.contract_address, &record.evm_network_id) else {
            return None;
        };

        if !networks.contains(network_id) {
            debug!(network = %network_id, contract = %contract, "EVM network not persisted, dropping token");
            return None;
        }

        let address = match contract.parse::<Address>() {
            Ok(address) => address,
            Err(e) => {
                warn!(network = %network_id, contract = %contract, error = %e, "Invalid contract address");
                return None;
            }
        };

        let Some(symbol) = record.symbol.as_deref() else {
            warn!(network = %network_id, contract = %contract, "Contract token without symbol");
            return None;
        };

        Some(Self {
            record,
            network_id,
            symbol,
            contract_address: format!("{:#x}", address),
        })
    }
}
