use serde::{ Deserialize, Serialize };

/// An RPC endpoint and the health it was found in during the latest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rpc {
    pub url: String,
    pub is_healthy: bool,
}

impl Rpc {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_healthy: false,
        }
    }
}

/// Urls of the endpoints marked healthy, in their configured order.
pub fn healthy_urls(rpcs: &[Rpc]) -> Vec<String> {
    rpcs.iter()
        .filter(|rpc| rpc.is_healthy)
        .map(|rpc| rpc.url.clone())
        .collect()
}

/// Network-level health: any healthy endpoint.
pub fn any_healthy(rpcs: &[Rpc]) -> bool {
    rpcs.iter().any(|rpc| rpc.is_healthy)
}
