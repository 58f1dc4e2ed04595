use aes::Aes256;
use cipher::{
    generic_array::{typenum::U32, GenericArray},
    BlockEncrypt, KeyInit,
};
use sha2::{Digest, Sha256};

use super::CryptographyError;

/// A key derivation function transforming the SHA-256 of the composite credentials into
/// the final transformed key, per spec §4.C.
pub(crate) trait Kdf {
    fn transform_key(&self, composite_key: &GenericArray<u8, U32>) -> Result<GenericArray<u8, U32>, CryptographyError>;
}

/// Repeated-AES-ECB key stretching: split the composite key into two 16-byte blocks,
/// encrypt each independently under the seed `rounds` times, then SHA-256 the
/// concatenation.
pub struct AesKdf {
    pub seed: Vec<u8>,
    pub rounds: u64,
}

impl Kdf for AesKdf {
    fn transform_key(&self, composite_key: &GenericArray<u8, U32>) -> Result<GenericArray<u8, U32>, CryptographyError> {
        let cipher = Aes256::new(&GenericArray::clone_from_slice(&self.seed));
        let mut block1 = GenericArray::clone_from_slice(&composite_key[..16]);
        let mut block2 = GenericArray::clone_from_slice(&composite_key[16..]);
        for _ in 0..self.rounds {
            cipher.encrypt_block(&mut block1);
            cipher.encrypt_block(&mut block2);
        }

        let mut digest = Sha256::new();
        digest.update(block1);
        digest.update(block2);

        Ok(digest.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rounds_is_plain_sha256_of_the_key() {
        let composite_key: GenericArray<u8, U32> = GenericArray::clone_from_slice(&[7u8; 32]);
        let kdf = AesKdf {
            seed: vec![0u8; 32],
            rounds: 0,
        };
        let transformed = kdf.transform_key(&composite_key).unwrap();

        let mut digest = Sha256::new();
        digest.update(&composite_key[..16]);
        digest.update(&composite_key[16..]);
        assert_eq!(transformed, digest.finalize());
    }

    #[test]
    fn same_inputs_are_deterministic() {
        let composite_key: GenericArray<u8, U32> = GenericArray::clone_from_slice(&[3u8; 32]);
        let kdf = AesKdf {
            seed: vec![9u8; 32],
            rounds: 37,
        };
        assert_eq!(
            kdf.transform_key(&composite_key).unwrap(),
            kdf.transform_key(&composite_key).unwrap()
        );
    }
}
