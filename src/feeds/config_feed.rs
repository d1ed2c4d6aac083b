use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::FeedUrls;
use crate::error::{ AppError, Result };
use crate::metadata::{ NativeOverride, OrmlOverride };

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRecord {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub is_testnet: bool,
    #[serde(default)]
    pub rpcs: Vec<String>,
    pub relay: Option<String>,
    pub para_id: Option<u32>,
    pub native_token: Option<NativeOverride>,
    pub orml_tokens: Option<Vec<OrmlOverride>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmNativeTokenRecord {
    pub symbol: String,
    pub decimals: u8,
    pub coingecko_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmNetworkRecord {
    /// Expected chain id; informational only, the probe decides.
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub is_testnet: bool,
    pub explorer_url: Option<String>,
    #[serde(default)]
    pub rpcs: Vec<String>,
    pub substrate_chain_id: Option<String>,
    pub native_token: Option<EvmNativeTokenRecord>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: Option<String>,
    pub symbol: Option<String>,
    pub coingecko_id: Option<String>,
    pub contract_address: Option<String>,
    pub evm_network_id: Option<String>,
    pub decimals: Option<u8>,
}

/// The fetched config feed, handed read-only to every later step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalRoster {
    pub chains: Vec<ChainRecord>,
    pub evm_networks: Vec<EvmNetworkRecord>,
    pub tokens: Vec<TokenRecord>,
}

#[async_trait]
pub trait ConfigFeed: Send + Sync {
    /// All documents or nothing.
    async fn fetch(&self) -> Result<ExternalRoster>;
}

#[derive(Clone)]
pub struct HttpConfigFeed {
    client: reqwest::Client,
    urls: FeedUrls,
}

impl HttpConfigFeed {
    pub fn new(client: reqwest::Client, urls: FeedUrls) -> Self {
        Self { client, urls }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client
            .get(url)
            .send().await
            .map_err(|e| AppError::Feed(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Feed(format!("GET {} returned status: {}", url, response.status())));
        }

        response.json().await.map_err(|e| AppError::Feed(format!("Failed to parse {}: {}", url, e)))
    }
}

#[async_trait]
impl ConfigFeed for HttpConfigFeed {
    async fn fetch(&self) -> Result<ExternalRoster> {
        let (mainnets, testnets, evm_networks, tokens) = tokio::try_join!(
            self.get_json::<Vec<ChainRecord>>(&self.urls.chains),
            self.get_json::<Vec<ChainRecord>>(&self.urls.testnet_chains),
            self.get_json::<Vec<EvmNetworkRecord>>(&self.urls.evm_networks),
            self.get_json::<Vec<TokenRecord>>(&self.urls.tokens)
        )?;

        Ok(ExternalRoster::assemble(mainnets, testnets, evm_networks, tokens))
    }
}

impl ExternalRoster {
    /// Merge the two chain documents, tagging the second as testnets.
    pub fn assemble(
        mainnets: Vec<ChainRecord>,
        testnets: Vec<ChainRecord>,
        evm_networks: Vec<EvmNetworkRecord>,
        tokens: Vec<TokenRecord>
    ) -> Self {
        let chains = mainnets
            .into_iter()
            .chain(
                testnets.into_iter().map(|mut record| {
                    record.is_testnet = true;
                    record
                })
            )
            .collect();

        Self {
            chains,
            evm_networks,
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_record_parses_feed_shape() {
        let record: ChainRecord = serde_json::from_value(
            serde_json::json!({
                "id": "acala",
                "name": "Acala",
                "rpcs": ["wss://acala-rpc-0.aca-api.network"],
                "relay": "polkadot",
                "paraId": 2000,
                "ormlTokens": [{ "symbol": "AUSD", "decimals": 12 }]
            })
        ).unwrap();

        assert_eq!(record.id, "acala");
        assert!(!record.is_testnet);
        assert_eq!(record.para_id, Some(2000));
        assert_eq!(record.orml_tokens.unwrap()[0].symbol, "AUSD");
    }

    #[test]
    fn test_testnet_document_is_tagged() {
        let chain = |id: &str| ChainRecord {
            id: id.to_string(),
            name: None,
            is_testnet: false,
            rpcs: vec![],
            relay: None,
            para_id: None,
            native_token: None,
            orml_tokens: None,
        };

        let roster = ExternalRoster::assemble(
            vec![chain("polkadot")],
            vec![chain("westend")],
            vec![],
            vec![]
        );

        assert_eq!(roster.chains.len(), 2);
        assert!(!roster.chains[0].is_testnet);
        assert!(roster.chains[1].is_testnet);
    }
}
