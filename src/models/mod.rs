//! Domain types for the persisted registry graph.
//!
//! Relations between entities are stored as ids and resolved by lookup, so a
//! relation that cannot be resolved yet is simply an absent id.

pub mod chain;
pub mod evm_network;
pub mod rpc;
pub mod token;

pub use chain::{ Chain, Parachain };
pub use evm_network::EvmNetwork;
pub use rpc::Rpc;
pub use token::{ NativeAnchor, Token, TokenRates, TokenVariant };

/// Anything addressable by a string id in a [`crate::db::Store`].
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
}
