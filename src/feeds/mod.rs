pub mod config_feed;
pub mod price_feed;

pub use config_feed::{
    ChainRecord,
    ConfigFeed,
    EvmNativeTokenRecord,
    EvmNetworkRecord,
    ExternalRoster,
    HttpConfigFeed,
    TokenRecord,
};
pub use price_feed::{ CoingeckoPriceFeed, PriceFeed, PriceQuotes };
