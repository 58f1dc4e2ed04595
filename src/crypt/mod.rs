//! Crypto primitives façade: SHA-256, the AES-ECB key transform, and the stream/block
//! ciphers layered on top of them.

use cipher::generic_array::{typenum::U32, GenericArray};
use sha2::{Digest, Sha256};

use crate::error::CryptographyError;

pub(crate) mod ciphers;
pub(crate) mod kdf;

pub(crate) fn calculate_sha256(elements: &[&[u8]]) -> Result<GenericArray<u8, U32>, CryptographyError> {
    let mut digest = Sha256::new();

    for element in elements {
        digest.update(element);
    }

    Ok(digest.finalize())
}
