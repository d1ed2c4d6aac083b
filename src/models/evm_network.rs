use serde::{ Deserialize, Serialize };

use super::{ Record, Rpc };

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvmNetwork {
    /// Canonical chain id reported by `eth_chainId`, as a decimal string.
    pub id: String,
    pub is_testnet: bool,
    pub name: Option<String>,
    pub explorer_url: Option<String>,
    pub is_healthy: bool,
    pub sort_index: Option<u32>,
    pub rpcs: Vec<Rpc>,
    /// Set when this network is the EVM face of a substrate chain.
    pub substrate_chain_id: Option<String>,
    pub native_token_id: Option<String>,
}

impl EvmNetwork {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_testnet: false,
            name: None,
            explorer_url: None,
            is_healthy: false,
            sort_index: None,
            rpcs: Vec::new(),
            substrate_chain_id: None,
            native_token_id: None,
        }
    }

    pub fn is_linked(&self) -> bool {
        self.substrate_chain_id.is_some()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl Record for EvmNetwork {
    fn id(&self) -> &str {
        &self.id
    }
}
