use ethers::types::U256;
use frame_metadata::{ RuntimeMetadata, RuntimeMetadataPrefixed };
use parity_scale_codec::Decode;
use scale_info::{ PortableRegistry, TypeDef };

use crate::error::{ AppError, Result };

use super::{ MetadataDecoder, RuntimeConstants, VariantEntry, VariantType };

const BALANCES_PALLET: &str = "Balances";
const EXISTENTIAL_DEPOSIT: &str = "ExistentialDeposit";

/// Decodes SCALE encoded runtime metadata (V14 and V15).
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameMetadataDecoder;

impl FrameMetadataDecoder {
    fn decode(metadata: &[u8]) -> Result<RuntimeMetadata> {
        let prefixed = RuntimeMetadataPrefixed::decode(&mut &metadata[..]).map_err(|e|
            AppError::Metadata(format!("Failed to decode runtime metadata: {}", e))
        )?;
        Ok(prefixed.1)
    }

    fn unsupported(metadata: &RuntimeMetadata) -> AppError {
        AppError::Metadata(format!("Unsupported metadata version: V{}", metadata.version()))
    }
}

impl MetadataDecoder for FrameMetadataDecoder {
    fn decode_constants(&self, metadata: &[u8]) -> Result<RuntimeConstants> {
        let metadata = Self::decode(metadata)?;

        let raw = match &metadata {
            RuntimeMetadata::V14(m) =>
                m.pallets
                    .iter()
                    .find(|p| p.name == BALANCES_PALLET)
                    .and_then(|p| p.constants.iter().find(|c| c.name == EXISTENTIAL_DEPOSIT))
                    .map(|c| c.value.clone()),
            RuntimeMetadata::V15(m) =>
                m.pallets
                    .iter()
                    .find(|p| p.name == BALANCES_PALLET)
                    .and_then(|p| p.constants.iter().find(|c| c.name == EXISTENTIAL_DEPOSIT))
                    .map(|c| c.value.clone()),
            other => {
                return Err(Self::unsupported(other));
            }
        };

        Ok(RuntimeConstants {
            existential_deposit: raw.as_deref().map(decode_balance).transpose()?,
        })
    }

    fn decode_type_lookup(&self, metadata: &[u8]) -> Result<Vec<VariantType>> {
        let metadata = Self::decode(metadata)?;

        let registry = match &metadata {
            RuntimeMetadata::V14(m) => &m.types,
            RuntimeMetadata::V15(m) => &m.types,
            other => {
                return Err(Self::unsupported(other));
            }
        };

        Ok(variant_types(registry))
    }
}

fn variant_types(registry: &PortableRegistry) -> Vec<VariantType> {
    registry.types
        .iter()
        .filter_map(|entry| {
            match &entry.ty.type_def {
                TypeDef::Variant(def) =>
                    Some(VariantType {
                        path: entry.ty.path.segments.clone(),
                        variants: def.variants
                            .iter()
                            .map(|v| VariantEntry {
                                name: v.name.clone(),
                                index: v.index,
                            })
                            .collect(),
                    }),
                _ => None,
            }
        })
        .collect::<Vec<_>>()
}

/// Balances are little-endian unsigned integers of up to 32 bytes.
fn decode_balance(raw: &[u8]) -> Result<U256> {
    if raw.is_empty() || raw.len() > 32 {
        return Err(AppError::Metadata(format!("Unexpected balance width: {} bytes", raw.len())));
    }
    Ok(U256::from_little_endian(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_balance_u128() {
        let ed: u128 = 10_000_000_000;
        assert_eq!(decode_balance(&ed.to_le_bytes()).unwrap(), U256::from(ed));

        let max = u128::MAX.to_le_bytes();
        assert_eq!(decode_balance(&max).unwrap(), U256::from(u128::MAX));
    }

    #[test]
    fn test_decode_balance_rejects_bad_width() {
        assert!(decode_balance(&[]).is_err());
        assert!(decode_balance(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_garbage_metadata_is_an_error() {
        let decoder = FrameMetadataDecoder;
        assert!(decoder.decode_constants(&[1, 2, 3]).is_err());
        assert!(decoder.decode_type_lookup(&[]).is_err());
    }
}
