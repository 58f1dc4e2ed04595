use std::convert::TryFrom;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    config::{CompressionConfig, InnerCipherConfig, KdfConfig, OuterCipherConfig},
    crypt::{self, kdf::AesKdf},
    db::Database,
    error::{CryptographyError, DatabaseIntegrityError, DatabaseKeyError, DatabaseOpenError},
    format::{kdbx4::KDBX4Header, DatabaseVersion},
    hashed_block_stream,
    key::DatabaseKey,
};

use super::{
    HEADER_COMMENT, HEADER_COMPRESSION_ID, HEADER_ENCRYPTION_IV, HEADER_END,
    HEADER_INNER_RANDOM_STREAM_ID, HEADER_MASTER_SEED, HEADER_OUTER_ENCRYPTION_ID,
    HEADER_PROTECTED_STREAM_KEY, HEADER_STREAM_START_BYTES, HEADER_TRANSFORM_ROUNDS, HEADER_TRANSFORM_SEED,
};

fn missing_header_field(field: &str) -> DatabaseIntegrityError {
    DatabaseIntegrityError::IncompleteOuterHeader {
        missing_field: field.to_string(),
    }
}

fn read_tlv_entry<'a>(data: &'a [u8], pos: usize) -> Result<(u8, &'a [u8], usize), DatabaseIntegrityError> {
    let entry_type = *data
        .get(pos)
        .ok_or(DatabaseIntegrityError::InvalidFixedHeader { size: data.len() })?;

    let length_bytes = data
        .get(pos + 1..pos + 3)
        .ok_or(DatabaseIntegrityError::InvalidFixedHeader { size: data.len() })?;
    let entry_length = LittleEndian::read_u16(length_bytes) as usize;

    let entry_buffer = data
        .get(pos + 3..pos + 3 + entry_length)
        .ok_or(DatabaseIntegrityError::InvalidFixedHeader { size: data.len() })?;

    Ok((entry_type, entry_buffer, pos + 3 + entry_length))
}

fn parse_outer_header(data: &[u8]) -> Result<KDBX4Header, DatabaseOpenError> {
    let version = DatabaseVersion::parse(data)?;

    let mut outer_cipher_config: Option<OuterCipherConfig> = None;
    let mut compression_config: Option<CompressionConfig> = None;
    let mut master_seed: Option<Vec<u8>> = None;
    let mut transform_seed: Option<Vec<u8>> = None;
    let mut transform_rounds: Option<u64> = None;
    let mut outer_iv: Option<Vec<u8>> = None;
    let mut protected_stream_key: Option<Vec<u8>> = None;
    let mut stream_start: Option<Vec<u8>> = None;
    let mut inner_cipher_config: Option<InnerCipherConfig> = None;

    let mut pos = DatabaseVersion::get_version_header_size();

    loop {
        let (entry_type, entry_buffer, next_pos) = read_tlv_entry(data, pos)?;
        pos = next_pos;

        match entry_type {
            HEADER_END => break,
            HEADER_COMMENT => {}
            HEADER_OUTER_ENCRYPTION_ID => {
                outer_cipher_config = Some(OuterCipherConfig::try_from(entry_buffer)?);
            }
            HEADER_COMPRESSION_ID => {
                compression_config = Some(CompressionConfig::try_from(LittleEndian::read_u32(entry_buffer))?);
            }
            HEADER_MASTER_SEED => master_seed = Some(entry_buffer.to_vec()),
            HEADER_TRANSFORM_SEED => transform_seed = Some(entry_buffer.to_vec()),
            HEADER_TRANSFORM_ROUNDS => {
                let rounds_bytes = entry_buffer;
                if rounds_bytes.len() != 8 {
                    return Err(DatabaseIntegrityError::InvalidFixedHeader { size: rounds_bytes.len() }.into());
                }
                transform_rounds = Some(LittleEndian::read_u64(rounds_bytes));
            }
            HEADER_ENCRYPTION_IV => outer_iv = Some(entry_buffer.to_vec()),
            HEADER_PROTECTED_STREAM_KEY => protected_stream_key = Some(entry_buffer.to_vec()),
            HEADER_STREAM_START_BYTES => stream_start = Some(entry_buffer.to_vec()),
            HEADER_INNER_RANDOM_STREAM_ID => {
                inner_cipher_config = Some(InnerCipherConfig::try_from(LittleEndian::read_u32(entry_buffer))?);
            }
            _ => return Err(DatabaseIntegrityError::InvalidOuterHeaderEntry { entry_type }.into()),
        }
    }

    let outer_cipher_config = outer_cipher_config.ok_or_else(|| missing_header_field("Outer Cipher ID"))?;
    let compression_config = compression_config.ok_or_else(|| missing_header_field("Compression ID"))?;
    let master_seed = master_seed.ok_or_else(|| missing_header_field("Master seed"))?;
    let transform_seed = transform_seed.ok_or_else(|| missing_header_field("Transform seed"))?;
    let transform_rounds = transform_rounds.ok_or_else(|| missing_header_field("Transform rounds"))?;
    let outer_iv = outer_iv.ok_or_else(|| missing_header_field("Outer IV"))?;
    let protected_stream_key = protected_stream_key.ok_or_else(|| missing_header_field("Protected stream key"))?;
    let stream_start = stream_start.ok_or_else(|| missing_header_field("Stream start bytes"))?;
    let inner_cipher_config = inner_cipher_config.ok_or_else(|| missing_header_field("Inner random stream ID"))?;

    Ok(KDBX4Header {
        version,
        outer_cipher_config,
        compression_config,
        master_seed,
        transform_seed,
        kdf_config: KdfConfig::Aes { rounds: transform_rounds },
        outer_iv,
        protected_stream_key,
        stream_start,
        inner_cipher_config,
        body_start: pos,
    })
}

/// Open and decrypt a container-format database, returning the header and the decrypted,
/// decompressed inner XML document.
pub(crate) fn decrypt_kdbx4(data: &[u8], key: &DatabaseKey) -> Result<(KDBX4Header, Vec<u8>), DatabaseOpenError> {
    let header = parse_outer_header(data)?;

    let payload_encrypted = data
        .get(header.body_start..)
        .ok_or(DatabaseIntegrityError::InvalidFixedHeader { size: data.len() })?;

    let key_elements = key.get_key_elements().map_err(DatabaseKeyError::from)?;
    let key_elements: Vec<&[u8]> = key_elements.iter().map(|v| &v[..]).collect();
    let composite_key = crypt::calculate_sha256(&key_elements)?;

    let transformed_key = AesKdf {
        seed: header.transform_seed.clone(),
        rounds: match &header.kdf_config {
            KdfConfig::Aes { rounds } => *rounds,
        },
    }
    .transform_key(&composite_key)?;

    let master_key = crypt::calculate_sha256(&[header.master_seed.as_ref(), &transformed_key])?;

    let payload = header
        .outer_cipher_config
        .get_cipher(&master_key, header.outer_iv.as_ref())?
        .decrypt(payload_encrypted)
        .map_err(CryptographyError::from)?;

    let stream_start_actual = payload
        .get(0..header.stream_start.len())
        .ok_or(DatabaseKeyError::IncorrectKey)?;
    if stream_start_actual != header.stream_start.as_slice() {
        return Err(DatabaseKeyError::IncorrectKey.into());
    }

    let block_stream = payload
        .get(header.stream_start.len()..)
        .ok_or(DatabaseKeyError::IncorrectKey)?;
    let payload_compressed = hashed_block_stream::read_hashed_block_stream(block_stream)?;

    let xml = header
        .compression_config
        .get_compression()
        .decompress(&payload_compressed)
        .map_err(crate::xml_db::XmlParseError::Compression)?;

    Ok((header, xml))
}

/// Open, decrypt and parse a container-format database from a source and key.
pub(crate) fn parse_kdbx4(data: &[u8], key: &DatabaseKey) -> Result<Database, DatabaseOpenError> {
    let (header, xml) = decrypt_kdbx4(data, key)?;

    let stream_key = crypt::calculate_sha256(&[header.protected_stream_key.as_ref()])?;
    let mut inner_decryptor = header.inner_cipher_config.get_cipher(&stream_key)?;

    let database_content = crate::xml_db::parse::parse(&xml, &mut *inner_decryptor)?;

    let config = crate::config::DatabaseConfig {
        version: header.version,
        outer_cipher_config: header.outer_cipher_config,
        compression_config: header.compression_config,
        inner_cipher_config: header.inner_cipher_config,
        kdf_config: header.kdf_config,
    };

    Ok(Database {
        config,
        header_attachments: Vec::new(),
        root: database_content.root.group,
        deleted_objects: database_content.root.deleted_objects,
        meta: database_content.meta,
    })
}
