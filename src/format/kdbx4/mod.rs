//! The TLV-header/hashed-block container codec (spec §4.A-4.D).
//!
//! Despite the `kdbx4` module name (matching the `Container` sub-signature this format
//! detects under), the wire shape implemented here is structurally KDBX 3.1: a flat TLV
//! outer header carrying the KDF seed/rounds directly (no variant dictionary, no Argon2),
//! AES/Twofish-CBC outer encryption with a `StreamStartBytes` integrity check in place of
//! an HMAC, and a SHA-256-only hashed-block stream. There is no separate inner header -
//! binary attachments live in the `Meta` XML, not in a dedicated TLV section after the
//! outer payload.

#[cfg(feature = "save_kdbx4")]
mod dump;
mod parse;

use crate::config::{CompressionConfig, InnerCipherConfig, KdfConfig, OuterCipherConfig};
use crate::format::DatabaseVersion;

#[cfg(feature = "save_kdbx4")]
pub(crate) use self::dump::dump_kdbx4;
pub(crate) use self::parse::{decrypt_kdbx4, parse_kdbx4};

/// Header entry denoting the end of the header
pub(crate) const HEADER_END: u8 = 0;
/// Header entry denoting a comment
pub(crate) const HEADER_COMMENT: u8 = 1;
/// A UUID specifying which cipher suite should be used to encrypt the payload
pub(crate) const HEADER_OUTER_ENCRYPTION_ID: u8 = 2;
/// First byte determines compression of payload
pub(crate) const HEADER_COMPRESSION_ID: u8 = 3;
/// Master seed for deriving the master key
pub(crate) const HEADER_MASTER_SEED: u8 = 4;
/// Seed used in deriving the transformed key
pub(crate) const HEADER_TRANSFORM_SEED: u8 = 5;
/// Number of rounds used in derivation of the transformed key
pub(crate) const HEADER_TRANSFORM_ROUNDS: u8 = 6;
/// Initialization Vector for decrypting the payload
pub(crate) const HEADER_ENCRYPTION_IV: u8 = 7;
/// Key for decrypting the inner protected values
pub(crate) const HEADER_PROTECTED_STREAM_KEY: u8 = 8;
/// First bytes of the decrypted payload, used to check correct decryption
pub(crate) const HEADER_STREAM_START_BYTES: u8 = 9;
/// Specifies which cipher suite to use for decrypting the inner protected values
pub(crate) const HEADER_INNER_RANDOM_STREAM_ID: u8 = 10;

/// Parsed outer header of a container-format database. Module-private: callers only see
/// the resulting [`crate::Database`].
pub(crate) struct KDBX4Header {
    pub version: DatabaseVersion,
    pub outer_cipher_config: OuterCipherConfig,
    pub compression_config: CompressionConfig,
    pub master_seed: Vec<u8>,
    pub transform_seed: Vec<u8>,
    pub kdf_config: KdfConfig,
    pub outer_iv: Vec<u8>,
    pub protected_stream_key: Vec<u8>,
    pub stream_start: Vec<u8>,
    pub inner_cipher_config: InnerCipherConfig,
    pub body_start: usize,
}
