pub mod rpc_probe;
pub mod metadata_extractor;
pub mod reconciler;
pub mod chain_sync;
pub mod evm_network_sync;
pub mod token_sync;
pub mod derived_fields;
pub mod price_sync;
pub mod pipeline;

pub use rpc_probe::{ ProbeOutcome, RpcProbe };
pub use metadata_extractor::{ ChainMetadata, MetadataExtractor };
pub use reconciler::{ reconcile, Identity, ReconcileOutcome, UpsertContext };
pub use chain_sync::ChainSync;
pub use evm_network_sync::EvmNetworkSync;
pub use token_sync::TokenSync;
pub use derived_fields::{ DerivedFields, RegistrySortOrder, SortOrder };
pub use price_sync::PriceSync;
pub use pipeline::{ Pipeline, PipelineClients, PipelineSettings, RunOutcome, RunReport, SyncTrigger };
