use std::convert::TryInto;
use std::io::Write;

use byteorder::{ByteOrder, LittleEndian};

use crate::{
    crypt,
    db::Database,
    error::{DatabaseKeyError, DatabaseSaveError},
    format::{
        kdbx4::{
            HEADER_COMPRESSION_ID, HEADER_ENCRYPTION_IV, HEADER_END, HEADER_INNER_RANDOM_STREAM_ID,
            HEADER_MASTER_SEED, HEADER_OUTER_ENCRYPTION_ID, HEADER_PROTECTED_STREAM_KEY,
            HEADER_STREAM_START_BYTES, HEADER_TRANSFORM_ROUNDS, HEADER_TRANSFORM_SEED,
        },
        DatabaseVersion,
    },
    hashed_block_stream,
    key::DatabaseKey,
};

/// Encrypt and write out a container-format database.
pub(crate) fn dump_kdbx4(db: &Database, key: &DatabaseKey, destination: &mut dyn Write) -> Result<(), DatabaseSaveError> {
    if !matches!(db.config.version, DatabaseVersion::Container(_)) {
        return Err(DatabaseSaveError::UnsupportedVersion);
    }

    let mut master_seed = vec![0u8; 32];
    getrandom::getrandom(&mut master_seed)?;

    let mut outer_iv = vec![0u8; db.config.outer_cipher_config.get_iv_size()];
    getrandom::getrandom(&mut outer_iv)?;

    let mut protected_stream_key = vec![0u8; 64];
    getrandom::getrandom(&mut protected_stream_key)?;

    let mut stream_start = vec![0u8; 32];
    getrandom::getrandom(&mut stream_start)?;

    let (kdf, transform_seed) = db.config.kdf_config.get_kdf_and_seed()?;

    let key_elements = key.get_key_elements().map_err(DatabaseKeyError::from)?;
    let key_elements: Vec<&[u8]> = key_elements.iter().map(|v| &v[..]).collect();
    let composite_key = crypt::calculate_sha256(&key_elements)?;
    let transformed_key = kdf.transform_key(&composite_key)?;
    let master_key = crypt::calculate_sha256(&[master_seed.as_ref(), &transformed_key])?;

    let header_data = dump_outer_header(
        db,
        &master_seed,
        &outer_iv,
        &transform_seed,
        &protected_stream_key,
        &stream_start,
    )?;
    destination.write_all(&header_data)?;

    let stream_key = crypt::calculate_sha256(&[protected_stream_key.as_ref()])?;
    let mut inner_cipher = db.config.inner_cipher_config.get_cipher(&stream_key)?;

    let xml = crate::xml_db::dump::dump(db, &mut *inner_cipher)?;

    let payload_compressed = db.config.compression_config.get_compression().compress(&xml)?;
    let block_stream = hashed_block_stream::write_hashed_block_stream(&payload_compressed);

    let mut payload = Vec::with_capacity(stream_start.len() + block_stream.len());
    payload.extend_from_slice(&stream_start);
    payload.extend_from_slice(&block_stream);

    let mut outer_cipher = db.config.outer_cipher_config.get_cipher(&master_key, &outer_iv)?;
    let payload_encrypted = outer_cipher.encrypt(&payload);
    destination.write_all(&payload_encrypted)?;

    Ok(())
}

fn write_header_field(header_data: &mut Vec<u8>, field_id: u8, field_value: &[u8]) {
    header_data.push(field_id);
    let pos = header_data.len();
    header_data.resize(pos + 2, 0);
    LittleEndian::write_u16(&mut header_data[pos..pos + 2], field_value.len().try_into().unwrap());
    header_data.extend_from_slice(field_value);
}

fn dump_outer_header(
    db: &Database,
    master_seed: &[u8],
    outer_iv: &[u8],
    transform_seed: &[u8],
    protected_stream_key: &[u8],
    stream_start: &[u8],
) -> Result<Vec<u8>, DatabaseSaveError> {
    let mut header_data: Vec<u8> = Vec::new();
    db.config.version.dump(&mut header_data)?;

    write_header_field(&mut header_data, HEADER_OUTER_ENCRYPTION_ID, &db.config.outer_cipher_config.dump());
    write_header_field(&mut header_data, HEADER_COMPRESSION_ID, &db.config.compression_config.dump());
    write_header_field(&mut header_data, HEADER_MASTER_SEED, master_seed);
    write_header_field(&mut header_data, HEADER_TRANSFORM_SEED, transform_seed);

    let mut rounds_bytes = [0u8; 8];
    LittleEndian::write_u64(&mut rounds_bytes, db.config.kdf_config.rounds());
    write_header_field(&mut header_data, HEADER_TRANSFORM_ROUNDS, &rounds_bytes);

    write_header_field(&mut header_data, HEADER_ENCRYPTION_IV, outer_iv);
    write_header_field(&mut header_data, HEADER_PROTECTED_STREAM_KEY, protected_stream_key);
    write_header_field(&mut header_data, HEADER_STREAM_START_BYTES, stream_start);

    let mut inner_stream_id = [0u8; 4];
    LittleEndian::write_u32(&mut inner_stream_id, db.config.inner_cipher_config.dump());
    write_header_field(&mut header_data, HEADER_INNER_RANDOM_STREAM_ID, &inner_stream_id);

    write_header_field(&mut header_data, HEADER_END, &[]);

    Ok(header_data)
}
