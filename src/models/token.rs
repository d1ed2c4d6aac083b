use std::collections::BTreeMap;

use ethers::types::U256;
use serde::{ Deserialize, Serialize };

use crate::enums::TokenKind;

use super::Record;

/// Quoted prices keyed by lowercase currency code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenRates(pub BTreeMap<String, f64>);

impl TokenRates {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, currency: &str) -> Option<f64> {
        self.0.get(currency).copied()
    }
}

/// The entity a native token belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum NativeAnchor {
    Chain(String),
    EvmNetwork(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TokenVariant {
    #[serde(rename_all = "camelCase")]
    Native {
        anchor: NativeAnchor,
        #[serde(with = "decimal_u256")]
        existential_deposit: Option<U256>,
    },
    #[serde(rename_all = "camelCase")]
    Orml {
        chain_id: String,
        state_key: String,
        #[serde(with = "decimal_u256")]
        existential_deposit: Option<U256>,
    },
    #[serde(rename_all = "camelCase")]
    Erc20 {
        evm_network_id: String,
        contract_address: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub symbol: String,
    pub decimals: u8,
    pub coingecko_id: Option<String>,
    pub is_testnet: bool,
    pub rates: Option<TokenRates>,
    #[serde(flatten)]
    pub variant: TokenVariant,
}

impl Token {
    pub fn new(id: impl Into<String>, symbol: impl Into<String>, decimals: u8, variant: TokenVariant) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            decimals,
            coingecko_id: None,
            is_testnet: false,
            rates: None,
            variant,
        }
    }

    pub fn substrate_native_id(chain_id: &str, symbol: &str) -> String {
        format!("{}-substrate-native-{}", chain_id, symbol).to_lowercase()
    }

    pub fn substrate_orml_id(chain_id: &str, symbol: &str) -> String {
        format!("{}-substrate-orml-{}", chain_id, symbol).to_lowercase()
    }

    pub fn evm_native_id(network_id: &str, symbol: &str) -> String {
        format!("{}-evm-native-{}", network_id, symbol).to_lowercase()
    }

    pub fn evm_erc20_id(network_id: &str, contract_address: &str) -> String {
        format!("{}-evm-erc20-{}", network_id, contract_address).to_lowercase()
    }

    pub fn kind(&self) -> TokenKind {
        match &self.variant {
            TokenVariant::Native { anchor: NativeAnchor::Chain(_), .. } => TokenKind::SubstrateNative,
            TokenVariant::Native { anchor: NativeAnchor::EvmNetwork(_), .. } => TokenKind::EvmNative,
            TokenVariant::Orml { .. } => TokenKind::SubstrateOrml,
            TokenVariant::Erc20 { .. } => TokenKind::EvmErc20,
        }
    }

    /// Chain this token is anchored to, if any.
    pub fn chain_id(&self) -> Option<&str> {
        match &self.variant {
            TokenVariant::Native { anchor: NativeAnchor::Chain(id), .. } => Some(id),
            TokenVariant::Orml { chain_id, .. } => Some(chain_id),
            _ => None,
        }
    }

    /// EVM network this token is anchored to, if any.
    pub fn evm_network_id(&self) -> Option<&str> {
        match &self.variant {
            TokenVariant::Native { anchor: NativeAnchor::EvmNetwork(id), .. } => Some(id),
            TokenVariant::Erc20 { evm_network_id, .. } => Some(evm_network_id),
            _ => None,
        }
    }

    pub fn existential_deposit(&self) -> Option<U256> {
        match &self.variant {
            TokenVariant::Native { existential_deposit, .. } => *existential_deposit,
            TokenVariant::Orml { existential_deposit, .. } => *existential_deposit,
            TokenVariant::Erc20 { .. } => None,
        }
    }
}

impl Record for Token {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Large balances travel as decimal strings so clients never see them
/// truncated to a float.
mod decimal_u256 {
    use ethers::types::U256;
    use serde::{ de::Error, Deserialize, Deserializer, Serializer };

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_some(&v.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<U256>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| U256::from_dec_str(&s).map_err(D::Error::custom)).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_ids_are_lowercase() {
        assert_eq!(Token::substrate_native_id("Polkadot", "DOT"), "polkadot-substrate-native-dot");
        assert_eq!(Token::substrate_orml_id("acala", "aUSD"), "acala-substrate-orml-ausd");
        assert_eq!(Token::evm_native_id("1", "ETH"), "1-evm-native-eth");
        assert_eq!(
            Token::evm_erc20_id("1", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            "1-evm-erc20-0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"
        );
    }

    #[test]
    fn test_existential_deposit_serializes_as_decimal() {
        let ed = U256::from_dec_str("340282366920938463463374607431768211456").unwrap();
        let token = Token::new(
            "polkadot-substrate-native-dot",
            "DOT",
            10,
            TokenVariant::Native {
                anchor: NativeAnchor::Chain("polkadot".to_string()),
                existential_deposit: Some(ed),
            }
        );

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["existentialDeposit"], "340282366920938463463374607431768211456");
        assert_eq!(json["type"], "native");

        let back: Token = serde_json::from_value(json).unwrap();
        assert_eq!(back, token);
        assert_eq!(back.kind(), TokenKind::SubstrateNative);
        assert_eq!(back.chain_id(), Some("polkadot"));
    }
}
