use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ AppError, Result };

const MAX_RETRIES: u32 = 3;

/// Price-feed id -> currency code -> quote.
pub type PriceQuotes = HashMap<String, HashMap<String, f64>>;

#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// One batched request for every id and currency.
    async fn fetch_quotes(&self, ids: &[String], currencies: &[String]) -> Result<PriceQuotes>;
}

/// CoinGecko `simple/price` style feed.
pub struct CoingeckoPriceFeed {
    client: reqwest::Client,
    base_url: String,
}

impl CoingeckoPriceFeed {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn quote_url(&self, ids: &[String], currencies: &[String]) -> String {
        format!(
            "{}?ids={}&vs_currencies={}",
            self.base_url,
            urlencoding::encode(&ids.join(",")),
            urlencoding::encode(&currencies.join(","))
        )
    }

    /// Fetch a URL with retry on 429 rate-limit responses
    async fn fetch_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            let response = self.client
                .get(url)
                .send().await
                .map_err(|e| AppError::Feed(format!("Price feed error: {}", e)))?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let wait_secs = 2u64.pow(attempt + 1);
                tracing::warn!(attempt, wait_secs, "Price feed rate limited");
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                last_err = Some(AppError::Feed("Price feed rate limited".to_string()));
                continue;
            }

            if !response.status().is_success() {
                return Err(AppError::Feed(format!("Price feed returned status: {}", response.status())));
            }

            return Ok(response);
        }
        Err(last_err.unwrap_or_else(|| AppError::Feed("Price feed request failed after retries".to_string())))
    }
}

#[async_trait]
impl PriceFeed for CoingeckoPriceFeed {
    async fn fetch_quotes(&self, ids: &[String], currencies: &[String]) -> Result<PriceQuotes> {
        if ids.is_empty() {
            return Ok(PriceQuotes::new());
        }

        let url = self.quote_url(ids, currencies);
        let response = self.fetch_with_retry(&url).await?;

        // Unknown currencies come back as null rather than being omitted
        let raw: HashMap<String, HashMap<String, Option<f64>>> = response
            .json().await
            .map_err(|e| AppError::Feed(format!("Failed to parse price feed response: {}", e)))?;

        Ok(
            raw
                .into_iter()
                .map(|(id, quotes)| {
                    let quotes = quotes
                        .into_iter()
                        .filter_map(|(currency, quote)| quote.map(|q| (currency.to_lowercase(), q)))
                        .collect();
                    (id, quotes)
                })
                .collect()
        )
    }
}
