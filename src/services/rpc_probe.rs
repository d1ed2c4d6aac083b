use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{ debug, warn };

use crate::enums::RpcProtocol;
use crate::error::AppError;
use crate::models::rpc::any_healthy;
use crate::models::Rpc;
use crate::rpc::{ ChainRpcConnector, EvmRpcClient, RpcCall };

/// Per-endpoint health of one chain or network, in configured order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub rpcs: Vec<Rpc>,
    /// EVM only: the id reported by the first endpoint that answered.
    pub canonical_id: Option<u64>,
}

impl ProbeOutcome {
    pub fn is_healthy(&self) -> bool {
        any_healthy(&self.rpcs)
    }
}

pub struct RpcProbe {
    connector: Arc<dyn ChainRpcConnector>,
    evm_client: Arc<dyn EvmRpcClient>,
    timeout: Duration,
}

impl RpcProbe {
    pub fn new(connector: Arc<dyn ChainRpcConnector>, evm_client: Arc<dyn EvmRpcClient>, timeout: Duration) -> Self {
        Self {
            connector,
            evm_client,
            timeout,
        }
    }

    /// Probe every endpoint concurrently. Never fails: an endpoint that
    /// errors or times out is just unhealthy.
    pub async fn probe(&self, protocol: RpcProtocol, urls: &[String]) -> ProbeOutcome {
        match protocol {
            RpcProtocol::Substrate => {
                let health = join_all(urls.iter().map(|url| self.probe_substrate(url))).await;
                ProbeOutcome {
                    rpcs: urls
                        .iter()
                        .zip(health)
                        .map(|(url, is_healthy)| Rpc { url: url.clone(), is_healthy })
                        .collect(),
                    canonical_id: None,
                }
            }
            RpcProtocol::Ethereum => {
                let ids = join_all(urls.iter().map(|url| self.probe_evm(url))).await;
                resolve_canonical(urls, &ids)
            }
        }
    }

    async fn probe_substrate(&self, url: &str) -> bool {
        let mut connection = match timeout(self.timeout, self.connector.connect(url)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "Connection failed");
                return false;
            }
            Err(_) => {
                debug!(url = %url, "Connection timed out");
                return false;
            }
        };

        let healthy = match timeout(self.timeout, connection.request_batch(&[RpcCall::genesis_hash()])).await {
            Ok(Ok(results)) => results.first().is_some_and(|hash| hash.is_string()),
            Ok(Err(e)) => {
                debug!(url = %url, error = %e, "Genesis hash request failed");
                false
            }
            Err(_) => {
                debug!(url = %url, "Genesis hash request timed out");
                false
            }
        };

        if let Err(e) = connection.close().await {
            warn!(url = %url, error = %e, "Failed to close connection");
        }

        healthy
    }

    async fn probe_evm(&self, url: &str) -> Option<u64> {
        let result = timeout(self.timeout, self.evm_client.chain_id(url)).await.unwrap_or_else(|_|
            Err(AppError::Rpc("eth_chainId timed out".to_string()))
        );

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                debug!(url = %url, error = %e, "EVM endpoint unhealthy");
                None
            }
        }
    }
}

/// Elect the canonical id and force every disagreeing endpoint unhealthy.
pub fn resolve_canonical(urls: &[String], ids: &[Option<u64>]) -> ProbeOutcome {
    let canonical_id = ids.iter().flatten().next().copied();

    let rpcs = urls
        .iter()
        .zip(ids)
        .map(|(url, id)| {
            let agrees = id.is_some() && *id == canonical_id;
            if id.is_some() && !agrees {
                warn!(url = %url, reported = ?id, canonical = ?canonical_id, "Endpoint serves a different chain");
            }
            Rpc { url: url.clone(), is_healthy: agrees }
        })
        .collect();

    ProbeOutcome { rpcs, canonical_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ FakeConnector, FakeEvmClient };

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    fn probe(connector: FakeConnector, evm: FakeEvmClient) -> RpcProbe {
        RpcProbe::new(Arc::new(connector), Arc::new(evm), Duration::from_secs(1))
    }

    #[test]
    fn test_disagreeing_endpoint_is_forced_unhealthy() {
        let outcome = resolve_canonical(&urls(&["a", "b", "c", "d"]), &[None, Some(1284), Some(1), Some(1284)]);

        assert_eq!(outcome.canonical_id, Some(1284));
        let health: Vec<bool> = outcome.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true, false, true]);
        assert!(outcome.is_healthy());
    }

    #[test]
    fn test_no_responding_endpoint_has_no_canonical_id() {
        let outcome = resolve_canonical(&urls(&["a", "b"]), &[None, None]);
        assert_eq!(outcome.canonical_id, None);
        assert!(!outcome.is_healthy());
    }

    #[tokio::test]
    async fn test_substrate_probe_marks_each_endpoint_and_closes_connections() {
        let connector = FakeConnector::new()
            .alive("wss://a", None)
            .dead("wss://b")
            .alive("wss://c", None);
        let closes = connector.closes.clone();
        let probe = probe(connector, FakeEvmClient::default());

        let outcome = probe.probe(RpcProtocol::Substrate, &urls(&["wss://a", "wss://b", "wss://c"])).await;

        let health: Vec<bool> = outcome.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![true, false, true]);
        assert_eq!(outcome.canonical_id, None);
        // every opened connection is closed, failed or not
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_evm_probe_uses_first_responder_in_order() {
        let evm = FakeEvmClient::default()
            .respond("https://one", 1)
            .respond("https://two", 1284)
            .respond("https://three", 1284);
        let probe = probe(FakeConnector::new(), evm);

        let outcome = probe.probe(
            RpcProtocol::Ethereum,
            &urls(&["https://missing", "https://one", "https://two", "https://three"])
        ).await;

        assert_eq!(outcome.canonical_id, Some(1));
        let health: Vec<bool> = outcome.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true, false, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_endpoints_time_out_as_unhealthy() {
        let connector = FakeConnector::new().hanging("wss://slow").alive("wss://fast", None);
        let closes = connector.closes.clone();
        let evm = FakeEvmClient::default().hanging("https://slow").respond("https://fast", 1284);
        let probe = probe(connector, evm);

        let started = tokio::time::Instant::now();
        let substrate = probe.probe(RpcProtocol::Substrate, &urls(&["wss://slow", "wss://fast"])).await;
        let evm = probe.probe(RpcProtocol::Ethereum, &urls(&["https://slow", "https://fast"])).await;

        let health: Vec<bool> = substrate.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true]);
        // the stalled connection is still torn down
        assert_eq!(closes.load(std::sync::atomic::Ordering::SeqCst), 2);

        let health: Vec<bool> = evm.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true]);
        assert_eq!(evm.canonical_id, Some(1284));

        // each probe waited one timeout, not the endpoint's full stall
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_endpoints_rejecting_client_origin_are_unhealthy() {
        let connector = FakeConnector::new().rejecting_origin("wss://strict").alive("wss://open", None);
        let evm = FakeEvmClient::default().rejecting_origin("https://strict").respond("https://open", 1);
        let probe = probe(connector, evm);

        let substrate = probe.probe(RpcProtocol::Substrate, &urls(&["wss://strict", "wss://open"])).await;
        let health: Vec<bool> = substrate.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true]);

        let evm = probe.probe(RpcProtocol::Ethereum, &urls(&["https://strict", "https://open"])).await;
        let health: Vec<bool> = evm.rpcs.iter().map(|r| r.is_healthy).collect();
        assert_eq!(health, vec![false, true]);
        assert_eq!(evm.canonical_id, Some(1));
    }
}
