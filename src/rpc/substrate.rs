use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::core::client::{ BatchResponse, ClientT };
use jsonrpsee::core::params::{ ArrayParams, BatchRequestBuilder };
use jsonrpsee::http_client::{ HeaderMap, HeaderValue, HttpClient, HttpClientBuilder };
use jsonrpsee::ws_client::{ WsClient, WsClientBuilder };
use serde::Serialize;
use serde_json::Value;

use crate::error::{ AppError, Result };

/// One call of a batched substrate JSON-RPC request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcCall {
    pub method: &'static str,
    pub params: Value,
}

impl RpcCall {
    pub fn new(method: &'static str, params: Value) -> Self {
        Self { method, params }
    }

    pub fn genesis_hash() -> Self {
        Self::new("chain_getBlockHash", serde_json::json!([0]))
    }

    pub fn runtime_version() -> Self {
        Self::new("state_getRuntimeVersion", serde_json::json!([]))
    }

    pub fn metadata() -> Self {
        Self::new("state_getMetadata", serde_json::json!([]))
    }

    pub fn chain_name() -> Self {
        Self::new("system_chain", serde_json::json!([]))
    }

    pub fn properties() -> Self {
        Self::new("system_properties", serde_json::json!([]))
    }
}

/// A live connection to one substrate endpoint. Every call of a batch goes
/// over the same connection.
#[async_trait]
pub trait ChainRpcConnection: Send {
    /// Results in call order.
    async fn request_batch(&mut self, calls: &[RpcCall]) -> Result<Vec<Value>>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait ChainRpcConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn ChainRpcConnection>>;
}

/// Connector speaking substrate JSON-RPC. `ws://`/`wss://` endpoints get a
/// persistent websocket, `http(s)://` endpoints a keep-alive HTTP client.
#[derive(Clone)]
pub struct SubstrateConnector {
    headers: HeaderMap,
    timeout: Duration,
}

impl SubstrateConnector {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "origin",
            HeaderValue::from_str(origin).map_err(|e| AppError::Config(format!("Invalid origin: {}", e)))?
        );
        Ok(Self { headers, timeout })
    }
}

#[async_trait]
impl ChainRpcConnector for SubstrateConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn ChainRpcConnection>> {
        let transport = match Scheme::of(url)? {
            Scheme::Ws =>
                Transport::Ws(
                    WsClientBuilder::default()
                        .set_headers(self.headers.clone())
                        .connection_timeout(self.timeout)
                        .request_timeout(self.timeout)
                        .build(url).await
                        .map_err(|e| AppError::Rpc(format!("Failed to connect to {}: {}", url, e)))?
                ),
            Scheme::Http =>
                Transport::Http(
                    HttpClientBuilder::default()
                        .set_headers(self.headers.clone())
                        .request_timeout(self.timeout)
                        .build(url)
                        .map_err(|e| AppError::Rpc(format!("Failed to build client for {}: {}", url, e)))?
                ),
        };

        Ok(
            Box::new(SubstrateConnection {
                url: url.to_string(),
                transport: Some(transport),
            })
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Ws,
    Http,
}

impl Scheme {
    fn of(url: &str) -> Result<Self> {
        if url.starts_with("wss://") || url.starts_with("ws://") {
            Ok(Self::Ws)
        } else if url.starts_with("https://") || url.starts_with("http://") {
            Ok(Self::Http)
        } else {
            Err(AppError::InvalidInput(format!("Unsupported rpc url: {}", url)))
        }
    }
}

enum Transport {
    Ws(WsClient),
    Http(HttpClient),
}

struct SubstrateConnection {
    url: String,
    /// `None` once closed.
    transport: Option<Transport>,
}

impl SubstrateConnection {
    fn batch(calls: &[RpcCall]) -> Result<BatchRequestBuilder<'static>> {
        let mut batch = BatchRequestBuilder::new();
        for call in calls {
            let mut params = ArrayParams::new();
            if let Value::Array(values) = &call.params {
                for value in values {
                    params
                        .insert(value)
                        .map_err(|e| AppError::Internal(format!("Bad params for {}: {}", call.method, e)))?;
                }
            }
            batch
                .insert(call.method, params)
                .map_err(|e| AppError::Internal(format!("Bad params for {}: {}", call.method, e)))?;
        }
        Ok(batch)
    }
}

#[async_trait]
impl ChainRpcConnection for SubstrateConnection {
    async fn request_batch(&mut self, calls: &[RpcCall]) -> Result<Vec<Value>> {
        let batch = Self::batch(calls)?;

        // Endpoints refusing our origin fail here (HTTP 401/403) or at the handshake
        let response: BatchResponse<'_, Value> = (match &self.transport {
            Some(Transport::Ws(client)) => client.batch_request(batch).await,
            Some(Transport::Http(client)) => client.batch_request(batch).await,
            None => {
                return Err(AppError::Rpc(format!("Connection to {} is closed", self.url)));
            }
        }).map_err(|e| AppError::Rpc(format!("Batch request to {} failed: {}", self.url, e)))?;

        calls
            .iter()
            .zip(response)
            .map(|(call, reply)| {
                reply.map_err(|e| AppError::Rpc(format!("{} failed ({}): {}", call.method, e.code(), e.message())))
            })
            .collect::<Result<Vec<_>>>()
            .and_then(|results| {
                if results.len() == calls.len() {
                    Ok(results)
                } else {
                    Err(AppError::Rpc(format!("{} answered {} of {} calls", self.url, results.len(), calls.len())))
                }
            })
    }

    async fn close(&mut self) -> Result<()> {
        match self.transport.take() {
            Some(Transport::Ws(client)) => {
                let connected = client.is_connected();
                // dropping the last handle makes the background task send the close frame
                drop(client);
                if connected {
                    Ok(())
                } else {
                    Err(AppError::Rpc(format!("{} dropped the connection before close", self.url)))
                }
            }
            Some(Transport::Http(_)) => Ok(()),
            None => Err(AppError::Rpc(format!("Connection to {} already closed", self.url))),
        }
    }
}
