use serde::{ Deserialize, Serialize };

use super::{ Record, Rpc };

/// Relay membership of a parachain. Both halves are present or the whole
/// link is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parachain {
    pub relay_id: String,
    pub para_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chain {
    pub id: String,
    pub is_testnet: bool,
    pub name: Option<String>,
    pub genesis_hash: Option<String>,
    pub prefix: Option<u16>,
    pub chain_name: Option<String>,
    pub impl_name: Option<String>,
    pub spec_name: Option<String>,
    pub spec_version: Option<u32>,
    pub impl_version: Option<u32>,
    pub sort_index: Option<u32>,
    pub is_healthy: bool,
    pub rpcs: Vec<Rpc>,
    pub native_token_id: Option<String>,
    pub parachain: Option<Parachain>,
    /// Discriminant of the `Token` variant in the chain's currency id enum.
    pub currency_id_index: Option<u8>,
}

impl Chain {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_testnet: false,
            name: None,
            genesis_hash: None,
            prefix: None,
            chain_name: None,
            impl_name: None,
            spec_name: None,
            spec_version: None,
            impl_version: None,
            sort_index: None,
            is_healthy: false,
            rpcs: Vec::new(),
            native_token_id: None,
            parachain: None,
            currency_id_index: None,
        }
    }

    pub fn relay_id(&self) -> Option<&str> {
        self.parachain.as_ref().map(|p| p.relay_id.as_str())
    }

    pub fn para_id(&self) -> Option<u32> {
        self.parachain.as_ref().map(|p| p.para_id)
    }

    /// Name used for presentation and ordering.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().or(self.chain_name.as_deref()).unwrap_or(&self.id)
    }
}

impl Record for Chain {
    fn id(&self) -> &str {
        &self.id
    }
}
