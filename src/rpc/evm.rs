use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{ AppError, Result };

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

/// Ethereum-style JSON-RPC, one POST per request.
#[async_trait]
pub trait EvmRpcClient: Send + Sync {
    /// The numeric chain id the endpoint reports for itself.
    async fn chain_id(&self, url: &str) -> Result<u64>;
}

#[derive(Clone)]
pub struct HttpEvmClient {
    client: reqwest::Client,
}

impl HttpEvmClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EvmRpcClient for HttpEvmClient {
    async fn chain_id(&self, url: &str) -> Result<u64> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_chainId",
            "params": []
        });

        let response = self.client
            .post(url)
            .json(&body)
            .send().await
            .map_err(|e| AppError::Rpc(format!("eth_chainId request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Rpc(format!("eth_chainId returned status: {}", response.status())));
        }

        let rpc_resp: JsonRpcResponse<String> = response
            .json().await
            .map_err(|e| AppError::Rpc(format!("Failed to parse eth_chainId response: {}", e)))?;

        if let Some(err) = rpc_resp.error {
            return Err(AppError::Rpc(format!("eth_chainId error: {}", err.message)));
        }

        let raw = rpc_resp.result.ok_or_else(|| AppError::Rpc("eth_chainId returned no result".to_string()))?;
        parse_chain_id(&raw)
    }
}

/// Parse a `0x`-prefixed quantity into a chain id.
pub fn parse_chain_id(raw: &str) -> Result<u64> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| AppError::Rpc(format!("Chain id is not a hex quantity: {}", raw)))?;

    u64::from_str_radix(digits, 16).map_err(|e| AppError::Rpc(format!("Invalid chain id {}: {}", raw, e)))
}
