//! The hashed-block stream framing described by spec §4.B: a sequence of
//! `index(u32) || sha256(u8x32) || length(u32) || payload` records, terminated by a
//! zero-length block. Unlike the real KDBX4 block stream this isn't keyed - each block
//! is authenticated with a bare SHA-256 of its payload, not an HMAC.
use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};

use crate::error::BlockStreamError;

const MAX_BLOCK_SIZE: usize = 1024 * 1024;

/// Read a hashed-block stream into a single contiguous buffer.
pub(crate) fn read_hashed_block_stream(data: &[u8]) -> Result<Vec<u8>, BlockStreamError> {
    let mut out = Vec::new();

    let mut pos = 0;
    let mut block_index: u64 = 0;

    loop {
        if pos + 4 + 32 + 4 > data.len() {
            return Err(BlockStreamError::Truncated { block_index });
        }

        let read_index = LittleEndian::read_u32(&data[pos..pos + 4]) as u64;
        if read_index != block_index {
            return Err(BlockStreamError::Truncated { block_index });
        }
        let hash = &data[pos + 4..pos + 4 + 32];
        let size = LittleEndian::read_u32(&data[pos + 36..pos + 40]) as usize;
        pos += 40;

        if size == 0 {
            // terminator: per the format, its hash field is all zeroes.
            break;
        }

        if pos + size > data.len() {
            return Err(BlockStreamError::Truncated { block_index });
        }
        let block = &data[pos..pos + size];

        let mut digest = Sha256::new();
        digest.update(block);
        if digest.finalize().as_slice() != hash {
            return Err(BlockStreamError::BlockHashMismatch { block_index });
        }

        out.extend_from_slice(block);
        pos += size;
        block_index += 1;
    }

    Ok(out)
}

/// Write a buffer out as a hashed-block stream, splitting it into `MAX_BLOCK_SIZE`
/// chunks and terminating with a zero-length, zero-hash block.
pub(crate) fn write_hashed_block_stream(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut block_index: u32 = 0;

    for chunk in data.chunks(MAX_BLOCK_SIZE) {
        let mut digest = Sha256::new();
        digest.update(chunk);
        let hash = digest.finalize();

        let mut index_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut index_bytes, block_index);
        let mut size_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut size_bytes, chunk.len() as u32);

        out.extend_from_slice(&index_bytes);
        out.extend_from_slice(&hash);
        out.extend_from_slice(&size_bytes);
        out.extend_from_slice(chunk);

        block_index += 1;
    }

    let mut index_bytes = [0u8; 4];
    LittleEndian::write_u32(&mut index_bytes, block_index);
    out.extend_from_slice(&index_bytes);
    out.extend_from_slice(&[0u8; 32]);
    out.extend_from_slice(&[0u8; 4]);

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_payload() {
        let payload = b"a small xml payload".to_vec();
        let stream = write_hashed_block_stream(&payload);
        let recovered = read_hashed_block_stream(&stream).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn round_trips_empty_payload() {
        let stream = write_hashed_block_stream(&[]);
        let recovered = read_hashed_block_stream(&stream).unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn round_trips_multi_block_payload() {
        let payload = vec![0x5au8; MAX_BLOCK_SIZE * 2 + 17];
        let stream = write_hashed_block_stream(&payload);
        let recovered = read_hashed_block_stream(&stream).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn detects_corrupted_block() {
        let payload = b"some data to protect with a hash".to_vec();
        let mut stream = write_hashed_block_stream(&payload);
        let corrupt_offset = 40; // first byte of block payload
        stream[corrupt_offset] ^= 0xff;

        assert!(matches!(
            read_hashed_block_stream(&stream),
            Err(BlockStreamError::BlockHashMismatch { block_index: 0 })
        ));
    }
}
