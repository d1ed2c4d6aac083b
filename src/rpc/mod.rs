pub mod evm;
pub mod substrate;

pub use evm::{ EvmRpcClient, HttpEvmClient };
pub use substrate::{ ChainRpcConnection, ChainRpcConnector, RpcCall, SubstrateConnector };

use std::time::Duration;

use reqwest::header::{ HeaderMap, HeaderValue, ORIGIN };

use crate::error::{ AppError, Result };

/// reqwest client stamped with the fixed client-origin header.
pub fn build_client(origin: &str, timeout: Duration) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ORIGIN,
        HeaderValue::from_str(origin).map_err(|e| AppError::Config(format!("Invalid origin: {}", e)))?
    );

    reqwest::Client
        ::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}
