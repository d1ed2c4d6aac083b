use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;
use serde_json::Value;
use tokio::time::timeout;
use tracing::{ debug, warn };

use crate::error::{ AppError, Result };
use crate::metadata::{ ChainOverrides, MetadataDecoder, StorageHasher, VariantType };
use crate::rpc::{ ChainRpcConnector, RpcCall };

const CURRENCY_ID_TYPE: &str = "CurrencyId";
const TOKEN_SYMBOL_TYPE: &str = "TokenSymbol";
const LOCAL_TOKEN_VARIANT: &str = "Token";

#[derive(Debug, Clone, PartialEq)]
pub struct NativeToken {
    pub symbol: String,
    pub decimals: u8,
    pub existential_deposit: Option<U256>,
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedOrmlToken {
    pub symbol: String,
    pub decimals: u8,
    pub state_key: String,
    pub coingecko_id: Option<String>,
}

/// Everything one successful extraction learns about a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainMetadata {
    pub genesis_hash: String,
    pub chain_name: Option<String>,
    pub spec_name: Option<String>,
    pub impl_name: Option<String>,
    pub spec_version: Option<u32>,
    pub impl_version: Option<u32>,
    pub ss58_prefix: Option<u16>,
    pub native_token: Option<NativeToken>,
    pub currency_id_index: Option<u8>,
    pub orml_tokens: Vec<DerivedOrmlToken>,
}

pub struct MetadataExtractor {
    connector: Arc<dyn ChainRpcConnector>,
    decoder: Arc<dyn MetadataDecoder>,
    hasher: Arc<dyn StorageHasher>,
    timeout: Duration,
}

impl MetadataExtractor {
    pub fn new(
        connector: Arc<dyn ChainRpcConnector>,
        decoder: Arc<dyn MetadataDecoder>,
        hasher: Arc<dyn StorageHasher>,
        timeout: Duration
    ) -> Self {
        Self {
            connector,
            decoder,
            hasher,
            timeout,
        }
    }

    /// Round-robin over `healthy_urls`, one attempt at a time, giving up
    /// after two full passes.
    pub async fn extract(
        &self,
        chain_id: &str,
        healthy_urls: &[String],
        overrides: &ChainOverrides
    ) -> Result<ChainMetadata> {
        if healthy_urls.is_empty() {
            return Err(AppError::Rpc(format!("Chain {} has no healthy endpoints", chain_id)));
        }

        let budget = healthy_urls.len() * 2;
        let mut last_err = None;

        for attempt in 0..budget {
            let url = &healthy_urls[attempt % healthy_urls.len()];
            match self.attempt(url, overrides).await {
                Ok(metadata) => {
                    debug!(chain = %chain_id, url = %url, attempt, "Extracted chain metadata");
                    return Ok(metadata);
                }
                Err(e) => {
                    debug!(chain = %chain_id, url = %url, attempt, error = %e, "Extraction attempt failed");
                    last_err = Some(e);
                }
            }
        }

        warn!(chain = %chain_id, attempts = budget, "Metadata extraction budget exhausted");
        Err(last_err.unwrap_or_else(|| AppError::Rpc(format!("Extraction failed for {}", chain_id))))
    }

    async fn attempt(&self, url: &str, overrides: &ChainOverrides) -> Result<ChainMetadata> {
        let mut connection = timeout(self.timeout, self.connector.connect(url)).await.map_err(|_|
            AppError::Rpc(format!("Connecting to {} timed out", url))
        )??;

        let calls = [
            RpcCall::genesis_hash(),
            RpcCall::runtime_version(),
            RpcCall::metadata(),
            RpcCall::chain_name(),
            RpcCall::properties(),
        ];
        let response = timeout(self.timeout, connection.request_batch(&calls)).await.unwrap_or_else(|_|
            Err(AppError::Rpc(format!("Batch request to {} timed out", url)))
        );

        if let Err(e) = connection.close().await {
            warn!(url = %url, error = %e, "Failed to close connection");
        }

        self.interpret(&response?, overrides)
    }

    fn interpret(&self, values: &[Value], overrides: &ChainOverrides) -> Result<ChainMetadata> {
        let [genesis, version, metadata, chain_name, properties] = values else {
            return Err(AppError::Rpc(format!("Expected 5 batch results, got {}", values.len())));
        };

        let genesis_hash = genesis
            .as_str()
            .ok_or_else(|| AppError::Rpc("Genesis hash is not a string".to_string()))?
            .to_string();

        let metadata_hex = metadata
            .as_str()
            .ok_or_else(|| AppError::Rpc("Runtime metadata is not a string".to_string()))?;
        let metadata_bytes = hex
            ::decode(metadata_hex.trim_start_matches("0x"))
            .map_err(|e| AppError::Metadata(format!("Runtime metadata is not hex: {}", e)))?;

        let constants = self.decoder.decode_constants(&metadata_bytes)?;
        let types = self.decoder.decode_type_lookup(&metadata_bytes)?;

        let symbols = string_list(&properties["tokenSymbol"]);
        let decimals = decimals_list(&properties["tokenDecimals"]);

        let native_symbol = overrides.native.symbol.clone().or_else(|| symbols.first().cloned());
        let native_token = native_symbol.map(|symbol| NativeToken {
            decimals: overrides.native.decimals.or(decimals.first().copied()).unwrap_or(0),
            symbol,
            existential_deposit: constants.existential_deposit,
            coingecko_id: overrides.native.coingecko_id.clone(),
        });

        let currency_id_index = find_type(&types, CURRENCY_ID_TYPE)
            .and_then(|t| t.variant(LOCAL_TOKEN_VARIANT))
            .map(|v| v.index);

        let property_decimals: HashMap<String, u8> = symbols
            .iter()
            .zip(decimals.iter())
            .map(|(symbol, decimals)| (symbol.to_uppercase(), *decimals))
            .collect();
        let fallback_decimals = native_token.as_ref().map(|t| t.decimals).unwrap_or(0);

        let orml_tokens = self.derive_orml_tokens(
            find_type(&types, TOKEN_SYMBOL_TYPE),
            currency_id_index,
            overrides,
            |symbol| property_decimals.get(&symbol.to_uppercase()).copied().unwrap_or(fallback_decimals)
        );

        Ok(ChainMetadata {
            genesis_hash,
            chain_name: chain_name.as_str().map(str::to_string),
            spec_name: version["specName"].as_str().map(str::to_string),
            impl_name: version["implName"].as_str().map(str::to_string),
            spec_version: version["specVersion"].as_u64().and_then(|v| u32::try_from(v).ok()),
            impl_version: version["implVersion"].as_u64().and_then(|v| u32::try_from(v).ok()),
            ss58_prefix: properties["ss58Format"].as_u64().and_then(|v| u16::try_from(v).ok()),
            native_token,
            currency_id_index,
            orml_tokens,
        })
    }

    /// Override list when the chain has one, otherwise every decoded symbol.
    fn derive_orml_tokens(
        &self,
        symbol_type: Option<&VariantType>,
        currency_id_index: Option<u8>,
        overrides: &ChainOverrides,
        decimals_for: impl Fn(&str) -> u8
    ) -> Vec<DerivedOrmlToken> {
        let state_key = |symbol: &str| -> Option<String> {
            let symbol_index = symbol_type?.variants
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(symbol))?.index;
            let key = self.hasher.hash_key(&[currency_id_index?, symbol_index]);
            Some(format!("0x{}", hex::encode(key)))
        };

        match &overrides.orml_tokens {
            Some(list) =>
                list
                    .iter()
                    .filter_map(|token| {
                        let state_key = token.state_key.clone().or_else(|| state_key(&token.symbol))?;
                        Some(DerivedOrmlToken {
                            symbol: token.symbol.clone(),
                            decimals: token.decimals.unwrap_or_else(|| decimals_for(&token.symbol)),
                            state_key,
                            coingecko_id: token.coingecko_id.clone(),
                        })
                    })
                    .collect(),
            None =>
                symbol_type
                    .map(|t| t.variants.as_slice())
                    .unwrap_or_default()
                    .iter()
                    .filter_map(|variant| {
                        Some(DerivedOrmlToken {
                            state_key: state_key(&variant.name)?,
                            decimals: decimals_for(&variant.name),
                            symbol: variant.name.clone(),
                            coingecko_id: None,
                        })
                    })
                    .collect(),
        }
    }
}

fn find_type<'a>(types: &'a [VariantType], last_segment: &str) -> Option<&'a VariantType> {
    types.iter().find(|t| t.last_segment() == Some(last_segment))
}

/// `tokenSymbol` is a bare string on single-token chains.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) =>
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        _ => Vec::new(),
    }
}

fn decimals_list(value: &Value) -> Vec<u8> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|d| u8::try_from(d).ok()).into_iter().collect(),
        Value::Array(items) =>
            items
                .iter()
                .filter_map(|v| v.as_u64().and_then(|d| u8::try_from(d).ok()))
                .collect(),
        _ => Vec::new(),
    }
}
