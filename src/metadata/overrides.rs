use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{ Deserialize, Serialize };

/// Replacement values for a chain's native token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeOverride {
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub coingecko_id: Option<String>,
}

/// One orml token as a chain is known to expose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrmlOverride {
    pub symbol: String,
    pub decimals: Option<u8>,
    /// Hex storage key used verbatim instead of the computed one.
    pub state_key: Option<String>,
    pub coingecko_id: Option<String>,
}

impl OrmlOverride {
    fn known(symbol: &str, decimals: u8, coingecko_id: Option<&str>) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals: Some(decimals),
            state_key: None,
            coingecko_id: coingecko_id.map(str::to_string),
        }
    }
}

lazy_static! {
    /// Chains whose metadata under-reports their orml token set.
    static ref KNOWN_ORML_TOKENS: HashMap<&'static str, Vec<OrmlOverride>> = {
        let mut m = HashMap::new();
        m.insert("acala", vec![
            OrmlOverride::known("ACA", 12, Some("acala")),
            OrmlOverride::known("AUSD", 12, Some("acala-dollar")),
            OrmlOverride::known("DOT", 10, Some("polkadot")),
            OrmlOverride::known("LDOT", 10, Some("liquid-staking-dot")),
        ]);
        m.insert("karura", vec![
            OrmlOverride::known("KAR", 12, Some("karura")),
            OrmlOverride::known("KUSD", 12, Some("acala-dollar")),
            OrmlOverride::known("KSM", 12, Some("kusama")),
            OrmlOverride::known("LKSM", 12, None),
            OrmlOverride::known("BNC", 12, Some("bifrost-native-coin")),
            OrmlOverride::known("VSKSM", 12, None),
            OrmlOverride::known("PHA", 12, Some("pha")),
            OrmlOverride::known("KINT", 12, Some("kintsugi")),
            OrmlOverride::known("KBTC", 8, Some("kintsugi-btc")),
            OrmlOverride::known("TAI", 12, None),
        ]);
        m.insert("interlay", vec![
            OrmlOverride::known("DOT", 10, Some("polkadot")),
            OrmlOverride::known("INTR", 10, Some("interlay")),
            OrmlOverride::known("IBTC", 8, Some("interbtc")),
        ]);
        m.insert("kintsugi", vec![
            OrmlOverride::known("KSM", 12, Some("kusama")),
            OrmlOverride::known("KINT", 12, Some("kintsugi")),
            OrmlOverride::known("KBTC", 8, Some("kintsugi-btc")),
        ]);
        m
    };
}

/// Everything that beats decoded metadata for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainOverrides {
    pub native: NativeOverride,
    /// When set, the authoritative orml symbol list.
    pub orml_tokens: Option<Vec<OrmlOverride>>,
}

impl ChainOverrides {
    /// Config feed values first, then the built-in table.
    pub fn resolve(
        chain_id: &str,
        native: Option<&NativeOverride>,
        orml_tokens: Option<&[OrmlOverride]>
    ) -> Self {
        let orml_tokens = match orml_tokens {
            Some(tokens) => Some(tokens.to_vec()),
            None => KNOWN_ORML_TOKENS.get(chain_id).cloned(),
        };

        Self {
            native: native.cloned().unwrap_or_default(),
            orml_tokens,
        }
    }
}
