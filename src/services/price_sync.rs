use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::db::Store;
use crate::error::Result;
use crate::feeds::{ PriceFeed, PriceQuotes };
use crate::models::{ Token, TokenRates };

pub struct PriceSync {
    tokens: Arc<dyn Store<Token>>,
    feed: Arc<dyn PriceFeed>,
    currencies: Vec<String>,
}

impl PriceSync {
    pub fn new(tokens: Arc<dyn Store<Token>>, feed: Arc<dyn PriceFeed>, currencies: Vec<String>) -> Self {
        Self {
            tokens,
            feed,
            currencies: currencies
                .into_iter()
                .map(|c| c.to_lowercase())
                .collect(),
        }
    }

    /// One batched quote request for every mainnet token with a price-feed
    /// id. Tokens without a quote end up with no rates at all.
    pub async fn refresh(&self) -> Result<usize> {
        let tokens = self.tokens.find().await?;

        let ids: Vec<String> = tokens
            .iter()
            .filter(|token| !token.is_testnet)
            .filter_map(|token| token.coingecko_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let quotes = self.feed.fetch_quotes(&ids, &self.currencies).await?;

        let changed: Vec<Token> = tokens
            .into_iter()
            .filter_map(|mut token| {
                let rates = self.rates_for(&token, &quotes);
                if token.rates == rates {
                    return None;
                }
                token.rates = rates;
                Some(token)
            })
            .collect();

        if !changed.is_empty() {
            self.tokens.save(&changed).await?;
        }

        info!(requested = ids.len(), quoted = quotes.len(), updated = changed.len(), "Prices refreshed");
        Ok(changed.len())
    }

    fn rates_for(&self, token: &Token, quotes: &PriceQuotes) -> Option<TokenRates> {
        if token.is_testnet {
            return None;
        }

        let quote = quotes.get(token.coingecko_id.as_ref()?)?;
        let rates: TokenRates = TokenRates(
            self.currencies
                .iter()
                .filter_map(|currency| quote.get(currency).map(|value| (currency.clone(), *value)))
                .collect()
        );

        (!rates.is_empty()).then_some(rates)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::db::memory::MemoryRegistry;
    use crate::models::{ NativeAnchor, TokenVariant };
    use crate::testing::FakePriceFeed;

    fn token(id: &str, coingecko_id: Option<&str>, testnet: bool) -> Token {
        let mut token = Token::new(id, "X", 10, TokenVariant::Native {
            anchor: NativeAnchor::Chain("polkadot".to_string()),
            existential_deposit: None,
        });
        token.coingecko_id = coingecko_id.map(str::to_string);
        token.is_testnet = testnet;
        token
    }

    fn stale_rates() -> TokenRates {
        TokenRates(BTreeMap::from([("usd".to_string(), 1.0)]))
    }

    #[tokio::test]
    async fn test_missing_quote_clears_rates() {
        let registry = MemoryRegistry::new();
        let mut dot = token("dot", Some("polkadot"), false);
        dot.rates = Some(stale_rates());
        let mut gone = token("gone", Some("delisted"), false);
        gone.rates = Some(stale_rates());
        let mut test = token("wnd", Some("westend"), true);
        test.rates = Some(stale_rates());
        registry.tokens.insert(dot);
        registry.tokens.insert(gone);
        registry.tokens.insert(test);

        let feed = FakePriceFeed::quoting(&[("polkadot", &[("usd", 7.5), ("eur", 6.9), ("jpy", 1100.0)])]);
        let requests = feed.requests.clone();
        let sync = PriceSync::new(registry.tokens.clone(), Arc::new(feed), vec!["USD".to_string(), "eur".to_string()]);

        let updated = sync.refresh().await.unwrap();
        assert_eq!(updated, 3);

        // one batched request, testnet ids excluded
        assert_eq!(*requests.lock().unwrap(), vec![vec!["delisted".to_string(), "polkadot".to_string()]]);

        let dot = registry.tokens.get("dot").unwrap().rates.unwrap();
        assert_eq!(dot.get("usd"), Some(7.5));
        assert_eq!(dot.get("eur"), Some(6.9));
        assert_eq!(dot.get("jpy"), None);

        assert_eq!(registry.tokens.get("gone").unwrap().rates, None);
        assert_eq!(registry.tokens.get("wnd").unwrap().rates, None);
    }

    #[tokio::test]
    async fn test_feed_failure_propagates() {
        let registry = MemoryRegistry::new();
        registry.tokens.insert(token("dot", Some("polkadot"), false));

        let sync = PriceSync::new(registry.tokens.clone(), Arc::new(FakePriceFeed::failing()), vec!["usd".to_string()]);
        assert!(sync.refresh().await.is_err());
        assert_eq!(registry.tokens.get("dot").unwrap().rates, None);
    }

    #[tokio::test]
    async fn test_unchanged_rates_are_not_rewritten() {
        let registry = MemoryRegistry::new();
        registry.tokens.insert(token("dot", Some("polkadot"), false));
        let feed = FakePriceFeed::quoting(&[("polkadot", &[("usd", 7.5)])]);
        let sync = PriceSync::new(registry.tokens.clone(), Arc::new(feed), vec!["usd".to_string()]);

        assert_eq!(sync.refresh().await.unwrap(), 1);
        assert_eq!(sync.refresh().await.unwrap(), 0);
    }
}
