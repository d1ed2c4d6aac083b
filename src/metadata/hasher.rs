use blake2::digest::consts::U16;
use blake2::{ Blake2b, Digest };

use super::StorageHasher;

type Blake2b128 = Blake2b<U16>;

/// `Blake2_128Concat`: 16 byte blake2b digest followed by the input itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake2Concat128;

impl StorageHasher for Blake2Concat128 {
    fn hash_key(&self, bytes: &[u8]) -> Vec<u8> {
        let mut out = Blake2b128::digest(bytes).to_vec();
        out.extend_from_slice(bytes);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_key_keeps_input_suffix() {
        let key = Blake2Concat128.hash_key(&[0, 1]);
        assert_eq!(key.len(), 18);
        assert_eq!(&key[16..], &[0, 1]);
        assert_ne!(Blake2Concat128.hash_key(&[0, 2]), key);
    }
}
