pub mod chain;
pub mod evm_network;
pub mod token;

pub use chain::Entity as ChainEntity;
pub use evm_network::Entity as EvmNetworkEntity;
pub use token::Entity as TokenEntity;
