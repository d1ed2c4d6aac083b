//! Scripted collaborators so the pipeline can run without network access.

use std::collections::HashMap;
use std::sync::atomic::{ AtomicUsize, Ordering };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

use async_trait::async_trait;
use ethers::types::U256;
use serde_json::{ json, Value };

use crate::error::{ AppError, Result };
use crate::feeds::{ ChainRecord, ConfigFeed, EvmNetworkRecord, ExternalRoster, PriceFeed, PriceQuotes, TokenRecord };
use crate::metadata::{ MetadataDecoder, RuntimeConstants, VariantType };
use crate::rpc::{ ChainRpcConnection, ChainRpcConnector, EvmRpcClient, RpcCall };

/// Longer than any timeout a test configures.
const HANG: Duration = Duration::from_secs(3600);

const EMPTY_GENESIS: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// What a live endpoint answers to an extraction batch.
#[derive(Debug, Clone)]
pub struct FakeChainData {
    pub genesis_hash: String,
    pub chain_name: String,
    pub spec_version: u32,
    pub ss58_format: u16,
    pub token_symbols: Vec<String>,
    pub token_decimals: Vec<u8>,
}

impl FakeChainData {
    pub fn new(chain_name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            genesis_hash: format!("0x{}", hex::encode(chain_name.as_bytes())),
            chain_name: chain_name.to_string(),
            spec_version: 1000,
            ss58_format: 42,
            token_symbols: vec![symbol.to_string()],
            token_decimals: vec![decimals],
        }
    }

    pub fn with_tokens(mut self, tokens: &[(&str, u8)]) -> Self {
        self.token_symbols = tokens
            .iter()
            .map(|(s, _)| s.to_string())
            .collect();
        self.token_decimals = tokens
            .iter()
            .map(|(_, d)| *d)
            .collect();
        self
    }

    fn answer(&self, call: &RpcCall) -> Value {
        let spec_name = self.chain_name.to_lowercase();
        match call.method {
            "chain_getBlockHash" => json!(self.genesis_hash),
            "state_getRuntimeVersion" =>
                json!({
                    "specName": spec_name,
                    "implName": spec_name,
                    "specVersion": self.spec_version,
                    "implVersion": 0
                }),
            // the fake decoder keys its answers on these bytes
            "state_getMetadata" => json!(format!("0x{}", hex::encode(self.chain_name.as_bytes()))),
            "system_chain" => json!(self.chain_name),
            "system_properties" =>
                json!({
                    "ss58Format": self.ss58_format,
                    "tokenSymbol": self.token_symbols,
                    "tokenDecimals": self.token_decimals
                }),
            _ => Value::Null,
        }
    }
}

#[derive(Debug, Clone)]
enum FakeEndpoint {
    /// Answers probes; answers extraction batches only with chain data.
    Alive(Option<FakeChainData>),
    /// Accepts connections, fails every request.
    Dead,
    /// Accepts connections, never answers.
    Hang,
    /// Accepts connections, answers every request with 403 for our origin.
    RejectsOrigin,
}

/// Unknown urls refuse the connection outright.
pub struct FakeConnector {
    endpoints: HashMap<String, FakeEndpoint>,
    /// Url of every multi-call batch, in the order they were sent.
    pub batches: Arc<Mutex<Vec<String>>>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            batches: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn alive(mut self, url: &str, data: Option<FakeChainData>) -> Self {
        self.endpoints.insert(url.to_string(), FakeEndpoint::Alive(data));
        self
    }

    pub fn dead(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), FakeEndpoint::Dead);
        self
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), FakeEndpoint::Hang);
        self
    }

    pub fn rejecting_origin(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), FakeEndpoint::RejectsOrigin);
        self
    }
}

#[async_trait]
impl ChainRpcConnector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn ChainRpcConnection>> {
        let endpoint = self.endpoints
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::Rpc(format!("{} refused the connection", url)))?;

        Ok(
            Box::new(FakeConnection {
                url: url.to_string(),
                endpoint,
                batches: self.batches.clone(),
                closes: self.closes.clone(),
            })
        )
    }
}

struct FakeConnection {
    url: String,
    endpoint: FakeEndpoint,
    batches: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl ChainRpcConnection for FakeConnection {
    async fn request_batch(&mut self, calls: &[RpcCall]) -> Result<Vec<Value>> {
        if calls.len() > 1 {
            self.batches.lock().unwrap().push(self.url.clone());
        }

        match &self.endpoint {
            FakeEndpoint::Dead => Err(AppError::Rpc(format!("{} is down", self.url))),
            FakeEndpoint::Hang => {
                tokio::time::sleep(HANG).await;
                Err(AppError::Rpc(format!("{} never answered", self.url)))
            }
            FakeEndpoint::RejectsOrigin => Err(AppError::Rpc(format!("{} returned status: 403 Forbidden", self.url))),
            FakeEndpoint::Alive(Some(data)) => Ok(calls.iter().map(|call| data.answer(call)).collect()),
            FakeEndpoint::Alive(None) if calls.len() == 1 && calls[0] == RpcCall::genesis_hash() => {
                Ok(vec![json!(EMPTY_GENESIS)])
            }
            FakeEndpoint::Alive(None) => Err(AppError::Rpc(format!("{} has no metadata", self.url))),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum FakeEvmEndpoint {
    Answers(u64),
    Hang,
    RejectsOrigin,
}

/// Unknown urls fail to answer.
#[derive(Default)]
pub struct FakeEvmClient {
    endpoints: HashMap<String, FakeEvmEndpoint>,
}

impl FakeEvmClient {
    pub fn respond(mut self, url: &str, chain_id: u64) -> Self {
        self.endpoints.insert(url.to_string(), FakeEvmEndpoint::Answers(chain_id));
        self
    }

    pub fn hanging(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), FakeEvmEndpoint::Hang);
        self
    }

    pub fn rejecting_origin(mut self, url: &str) -> Self {
        self.endpoints.insert(url.to_string(), FakeEvmEndpoint::RejectsOrigin);
        self
    }
}

#[async_trait]
impl EvmRpcClient for FakeEvmClient {
    async fn chain_id(&self, url: &str) -> Result<u64> {
        match self.endpoints.get(url).copied() {
            Some(FakeEvmEndpoint::Answers(id)) => Ok(id),
            Some(FakeEvmEndpoint::Hang) => {
                tokio::time::sleep(HANG).await;
                Err(AppError::Rpc(format!("{} never answered", url)))
            }
            Some(FakeEvmEndpoint::RejectsOrigin) => Err(AppError::Rpc(format!("{} returned status: 403 Forbidden", url))),
            None => Err(AppError::Rpc(format!("{} did not answer", url))),
        }
    }
}

/// Returns a fixed existential deposit and whatever variant types were
/// registered for a chain name.
#[derive(Default)]
pub struct FakeDecoder {
    types: HashMap<Vec<u8>, Vec<VariantType>>,
}

impl FakeDecoder {
    pub fn with_types(mut self, chain_name: &str, types: Vec<VariantType>) -> Self {
        self.types.insert(chain_name.as_bytes().to_vec(), types);
        self
    }
}

impl MetadataDecoder for FakeDecoder {
    fn decode_constants(&self, _metadata: &[u8]) -> Result<RuntimeConstants> {
        Ok(RuntimeConstants {
            existential_deposit: Some(U256::from(10_000_000_000u64)),
        })
    }

    fn decode_type_lookup(&self, metadata: &[u8]) -> Result<Vec<VariantType>> {
        Ok(self.types.get(metadata).cloned().unwrap_or_default())
    }
}

pub struct FakeConfigFeed {
    roster: Option<ExternalRoster>,
    pub fetches: Arc<AtomicUsize>,
}

impl FakeConfigFeed {
    /// `None` makes every fetch fail.
    pub fn new(roster: Option<ExternalRoster>) -> Self {
        Self {
            roster,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl ConfigFeed for FakeConfigFeed {
    async fn fetch(&self) -> Result<ExternalRoster> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.roster.clone().ok_or_else(|| AppError::Feed("config feed unreachable".to_string()))
    }
}

pub struct FakePriceFeed {
    quotes: Option<PriceQuotes>,
    /// Ids of every request made.
    pub requests: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakePriceFeed {
    pub fn quoting(quotes: &[(&str, &[(&str, f64)])]) -> Self {
        let quotes = quotes
            .iter()
            .map(|(id, rates)| {
                let rates = rates
                    .iter()
                    .map(|(currency, value)| (currency.to_string(), *value))
                    .collect();
                (id.to_string(), rates)
            })
            .collect();

        Self {
            quotes: Some(quotes),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            quotes: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl PriceFeed for FakePriceFeed {
    async fn fetch_quotes(&self, ids: &[String], _currencies: &[String]) -> Result<PriceQuotes> {
        self.requests.lock().unwrap().push(ids.to_vec());
        let quotes = self.quotes.clone().ok_or_else(|| AppError::Feed("price feed unreachable".to_string()))?;

        Ok(
            quotes
                .into_iter()
                .filter(|(id, _)| ids.contains(id))
                .collect()
        )
    }
}

pub fn chain_record(id: &str, rpcs: &[&str]) -> ChainRecord {
    ChainRecord {
        id: id.to_string(),
        name: None,
        is_testnet: false,
        rpcs: rpcs
            .iter()
            .map(|u| u.to_string())
            .collect(),
        relay: None,
        para_id: None,
        native_token: None,
        orml_tokens: None,
    }
}

pub fn parachain_record(id: &str, relay: &str, para_id: u32) -> ChainRecord {
    ChainRecord {
        relay: Some(relay.to_string()),
        para_id: Some(para_id),
        ..chain_record(id, &[])
    }
}

pub fn evm_record(name: Option<&str>, rpcs: &[&str]) -> EvmNetworkRecord {
    EvmNetworkRecord {
        id: None,
        name: name.map(str::to_string),
        is_testnet: false,
        explorer_url: None,
        rpcs: rpcs
            .iter()
            .map(|u| u.to_string())
            .collect(),
        substrate_chain_id: None,
        native_token: None,
    }
}

pub fn token_record(id: Option<&str>, symbol: Option<&str>) -> TokenRecord {
    TokenRecord {
        id: id.map(str::to_string),
        symbol: symbol.map(str::to_string),
        coingecko_id: None,
        contract_address: None,
        evm_network_id: None,
        decimals: None,
    }
}

impl TokenRecord {
    pub fn with_coingecko(mut self, coingecko_id: &str) -> Self {
        self.coingecko_id = Some(coingecko_id.to_string());
        self
    }
}
