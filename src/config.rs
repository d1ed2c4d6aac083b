use std::env;
use std::time::Duration;

const DEFAULT_CHAINDATA_BASE: &str =
    "https://raw.githubusercontent.com/TalismanSociety/chaindata/main";
const DEFAULT_PRICE_FEED_URL: &str = "https://api.coingecko.com/api/v3/simple/price";
const DEFAULT_CURRENCIES: &str = "usd,eur,aud,gbp,jpy,btc,eth,dot";

/// Locations of the four documents making up the config feed.
#[derive(Debug, Clone)]
pub struct FeedUrls {
    pub chains: String,
    pub testnet_chains: String,
    pub evm_networks: String,
    pub tokens: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub feed_urls: FeedUrls,
    pub price_feed_url: String,
    pub price_currencies: Vec<String>,
    pub probe_concurrency: usize,
    pub rpc_timeout: Duration,
    pub feed_timeout: Duration,
    pub staleness_threshold: Duration,
    pub sync_interval: Duration,
    pub client_origin: String,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")?;

        let feed_urls = FeedUrls {
            chains: env_or("CHAINDATA_URL", &format!("{}/chaindata.json", DEFAULT_CHAINDATA_BASE)),
            testnet_chains: env_or(
                "TESTNET_CHAINDATA_URL",
                &format!("{}/testnets-chaindata.json", DEFAULT_CHAINDATA_BASE)
            ),
            evm_networks: env_or(
                "EVM_NETWORKS_URL",
                &format!("{}/evm-networks.json", DEFAULT_CHAINDATA_BASE)
            ),
            tokens: env_or("TOKENS_URL", &format!("{}/tokens.json", DEFAULT_CHAINDATA_BASE)),
        };

        let price_feed_url = env_or("PRICE_FEED_URL", DEFAULT_PRICE_FEED_URL);
        let price_currencies = Self::parse_list(&env_or("PRICE_CURRENCIES", DEFAULT_CURRENCIES))
            .into_iter()
            .map(|c| c.to_lowercase())
            .collect::<Vec<_>>();

        if price_currencies.is_empty() {
            return Err("PRICE_CURRENCIES must name at least one currency".into());
        }

        let probe_concurrency: usize = env_or("PROBE_CONCURRENCY", "20").parse()?;
        if probe_concurrency == 0 {
            return Err("PROBE_CONCURRENCY must be greater than zero".into());
        }

        let rpc_timeout = Duration::from_secs(env_or("RPC_TIMEOUT_SECS", "10").parse()?);
        let feed_timeout = Duration::from_secs(env_or("FEED_TIMEOUT_SECS", "30").parse()?);
        let staleness_threshold = Duration::from_secs(
            env_or("STALENESS_THRESHOLD_SECS", "120").parse()?
        );
        let sync_interval = Duration::from_secs(env_or("SYNC_INTERVAL_SECS", "300").parse()?);

        let client_origin = env_or("CLIENT_ORIGIN", "chaindata-sync");

        let server_host = env_or("SERVER_HOST", "0.0.0.0");
        let server_port = env_or("SERVER_PORT", "8080").parse()?;

        Ok(Config {
            database_url,
            feed_urls,
            price_feed_url,
            price_currencies,
            probe_concurrency,
            rpc_timeout,
            feed_timeout,
            staleness_threshold,
            sync_interval,
            client_origin,
            server_host,
            server_port,
        })
    }

    /// Split a comma separated list, dropping blanks.
    pub fn parse_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
