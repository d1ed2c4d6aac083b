//! Runtime metadata seams: the SCALE metadata decoder and the storage key
//! hasher, plus the per-chain orml overrides that beat decoded values.

pub mod decoder;
pub mod hasher;
pub mod overrides;

pub use decoder::FrameMetadataDecoder;
pub use hasher::Blake2Concat128;
pub use overrides::{ ChainOverrides, NativeOverride, OrmlOverride };

use ethers::types::U256;

use crate::error::Result;

/// Constants read out of a runtime's metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeConstants {
    pub existential_deposit: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantEntry {
    pub name: String,
    pub index: u8,
}

/// A variant-typed (enum) entry of the runtime type registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantType {
    pub path: Vec<String>,
    pub variants: Vec<VariantEntry>,
}

impl VariantType {
    pub fn last_segment(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }

    pub fn variant(&self, name: &str) -> Option<&VariantEntry> {
        self.variants.iter().find(|v| v.name == name)
    }
}

pub trait MetadataDecoder: Send + Sync {
    fn decode_constants(&self, metadata: &[u8]) -> Result<RuntimeConstants>;

    /// Every variant type of the runtime's type registry.
    fn decode_type_lookup(&self, metadata: &[u8]) -> Result<Vec<VariantType>>;
}

/// `hashKey`: derives a storage address component from raw key bytes.
pub trait StorageHasher: Send + Sync {
    fn hash_key(&self, bytes: &[u8]) -> Vec<u8>;
}
