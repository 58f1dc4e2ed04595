//! Error types that this crate can return

use thiserror::Error;

/// Errors upon reading a Database
#[derive(Debug, Error)]
pub enum DatabaseOpenError {
    /// An I/O error has occurred while reading the database
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error with the database's key has occurred
    #[error(transparent)]
    Key(#[from] DatabaseKeyError),

    /// The database is corrupted
    #[error(transparent)]
    DatabaseIntegrity(#[from] DatabaseIntegrityError),

    /// The database version cannot be read by this library
    #[error("Opening this database version is not supported")]
    UnsupportedVersion,
}

/// Errors stemming from corrupted databases
#[derive(Debug, Error)]
pub enum DatabaseIntegrityError {
    /// The database does not have a valid KDBX identifier
    #[error("Invalid KDBX identifier")]
    InvalidKDBXIdentifier,

    /// The version of the KDBX file is invalid
    #[error(
        "Invalid KDBX version: {}.{}.{}",
        version,
        file_major_version,
        file_minor_version
    )]
    InvalidKDBXVersion {
        version: u32,
        file_major_version: u32,
        file_minor_version: u32,
    },

    /// The fixed header has an invalid size
    #[error("Invalid header size: {}", size)]
    InvalidFixedHeader { size: usize },

    #[error(
        "Invalid field length for type {}: {} (expected {})",
        field_type,
        field_size,
        expected_field_size
    )]
    InvalidKDBFieldLength {
        field_type: u16,
        field_size: u32,
        expected_field_size: u32,
    },

    #[error("Missing group level")]
    MissingKDBGroupLevel,

    #[error("Missing group ID")]
    MissingKDBGroupId,

    #[error("Invalid group ID {}", group_id)]
    InvalidKDBGroupId { group_id: u32 },

    #[error("Invalid group field type: {}", field_type)]
    InvalidKDBGroupFieldType { field_type: u16 },

    #[error("Invalid entry field type: {}", field_type)]
    InvalidKDBEntryFieldType { field_type: u16 },

    #[error("Incomplete group")]
    IncompleteKDBGroup,

    #[error("Incomplete entry")]
    IncompleteKDBEntry,

    #[error("Invalid fixed cipher ID: {}", cid)]
    InvalidFixedCipherID { cid: u32 },

    #[error("Header hash mismatch")]
    HeaderHashMismatch,

    #[error("Invalid outer header entry: {}", entry_type)]
    InvalidOuterHeaderEntry { entry_type: u8 },

    #[error("Incomplete outer header: Missing {}", missing_field)]
    IncompleteOuterHeader { missing_field: String },

    #[error("Invalid inner header entry: {}", entry_type)]
    InvalidInnerHeaderEntry { entry_type: u8 },

    #[error("Incomplete inner header: Missing {}", missing_field)]
    IncompleteInnerHeader { missing_field: String },

    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    #[error(transparent)]
    Xml(#[from] crate::xml_db::XmlParseError),

    #[error(transparent)]
    OuterCipher(#[from] OuterCipherConfigError),

    #[error(transparent)]
    InnerCipher(#[from] InnerCipherConfigError),

    #[error(transparent)]
    Compression(#[from] CompressionConfigError),

    #[error(transparent)]
    BlockStream(#[from] BlockStreamError),

    #[error(transparent)]
    KdfSettings(#[from] KdfConfigError),

    /// A condition that the format's invariants rule out was observed anyway
    #[error("Invariant violated: {}", _0)]
    InvariantViolation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors occurring when saving a Database
#[derive(Debug, Error)]
pub enum DatabaseSaveError {
    /// The current database version cannot be saved by this library
    #[error("Saving this database version is not supported")]
    UnsupportedVersion,

    /// Error while writing out the inner XML database
    #[error(transparent)]
    Xml(#[from] crate::xml_db::XmlParseError),

    /// General I/O issues while writing the database
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An error with the key occurred while writing the database
    #[error(transparent)]
    Key(#[from] DatabaseKeyError),

    /// A cryptography error occurred while writing the database
    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    /// An error getting randomness for keys occurred
    #[error(transparent)]
    Random(#[from] getrandom::Error),
}

/// Errors related to the database key
#[derive(Debug, Error)]
pub enum DatabaseKeyError {
    /// The key specified was incorrect, e.g. because of a wrong password
    #[error("Incorrect key")]
    IncorrectKey,

    /// No key material (password or keyfile) was supplied at all
    #[error("No key elements were supplied")]
    EmptyKey,

    /// An error occurred in an underlying cryptographic operation while computing the key
    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    /// An I/O error occurred while loading the keyfile
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An XML error occurred while loading the keyfile
    #[error(transparent)]
    Xml(#[from] crate::xml_db::XmlParseError),

    /// The keyfile is invalid and did not contain a key
    #[error("Could not obtain a key from the keyfile")]
    InvalidKeyFile,
}

/// Errors with the configuration of the outer encryption
#[derive(Debug, Error)]
pub enum OuterCipherConfigError {
    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    #[error("Invalid outer cipher ID: {:?}", cid)]
    InvalidOuterCipherID { cid: Vec<u8> },
}

/// Errors with the configuration of the inner encryption
#[derive(Debug, Error)]
pub enum InnerCipherConfigError {
    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    #[error("Invalid inner cipher ID: {}", cid)]
    InvalidInnerCipherID { cid: u32 },
}

/// Errors with the configuration of the compression algorithm
#[derive(Debug, Error)]
pub enum CompressionConfigError {
    /// The identifier for the compression algorithm specified in the database is invalid
    #[error("Invalid compression algorithm: {}", cid)]
    InvalidCompressionSuite { cid: u32 },
}

/// Errors with the configuration of the Key Derivation Function.
///
/// Only the plain AES-ECB rounds KDF is modeled; there is no variant dictionary here
/// because the TLV header this crate reads stores the KDF seed/rounds directly as two
/// fixed fields rather than as a serialized dictionary of named variants.
#[derive(Debug, Error)]
pub enum KdfConfigError {
    #[error("Missing KDF field: {}", field)]
    MissingField { field: &'static str },
}

/// Errors while performing cryptographic operations
#[derive(Debug, Error)]
pub enum CryptographyError {
    #[error(transparent)]
    InvalidLength(#[from] cipher::InvalidLength),

    #[error(transparent)]
    Unpadding(#[from] cipher::block_padding::UnpadError),
}

/// Errors reading from the hashed block stream
#[derive(Debug, Error)]
pub enum BlockStreamError {
    #[error(transparent)]
    Cryptography(#[from] CryptographyError),

    #[error("Block hash mismatch for block {}", block_index)]
    BlockHashMismatch { block_index: u64 },

    #[error("Block stream ended with a truncated header at block {}", block_index)]
    Truncated { block_index: u64 },
}

/// Error parsing a color code
#[derive(Debug, Error)]
#[error("Cannot parse color: '{}'", _0)]
pub struct ParseColorError(pub String);

/// Errors converting a legacy (KDB v3 binary) database into the object model
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Truncated legacy KDB field at offset {}", offset)]
    Truncated { offset: usize },

    #[error("Unknown legacy {} field type {}", context, field_type)]
    UnknownFieldType { field_type: u16, context: &'static str },

    #[error(transparent)]
    Integrity(#[from] DatabaseIntegrityError),
}

/// Errors raised by the three-way merge engine (4.H).
///
/// Most inconsistencies found while merging - a missing timestamp, an ambiguous common
/// ancestor - are recoverable and are recorded as warnings in
/// [`crate::db::merge::MergeLog`] rather than aborting. These variants cover the cases
/// that do abort the merge outright: a broken UUID reference, or a divergence that
/// should have been impossible given the invariants of the object model.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("could not find a group at location {:?}", _0)]
    FindGroupError(Vec<uuid::Uuid>),

    #[error("could not find an entry at location {:?}", _0)]
    FindEntryError(Vec<uuid::Uuid>),

    #[error("{}", _0)]
    GenericError(String),

    #[error("group {} was modified without updating its LastModificationTime", _0)]
    GroupModificationTimeNotUpdated(String),

    #[error("entry {} was modified without updating its LastModificationTime", _0)]
    EntryModificationTimeNotUpdated(String),

    #[error("Binaries or CustomData are non-empty; merging them is unsupported")]
    UnsupportedMetaContent,
}

// move error type conversions to a module and exclude them from coverage counting.
#[cfg(not(tarpaulin_include))]
mod conversions {
    use super::*;

    impl From<CryptographyError> for DatabaseOpenError {
        fn from(e: CryptographyError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<BlockStreamError> for DatabaseOpenError {
        fn from(e: BlockStreamError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<crate::xml_db::XmlParseError> for DatabaseOpenError {
        fn from(e: crate::xml_db::XmlParseError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<InnerCipherConfigError> for DatabaseOpenError {
        fn from(e: InnerCipherConfigError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<OuterCipherConfigError> for DatabaseOpenError {
        fn from(e: OuterCipherConfigError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<KdfConfigError> for DatabaseOpenError {
        fn from(e: KdfConfigError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<CompressionConfigError> for DatabaseOpenError {
        fn from(e: CompressionConfigError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<crate::format::DatabaseVersionParseError> for DatabaseIntegrityError {
        fn from(e: crate::format::DatabaseVersionParseError) -> Self {
            match e {
                crate::format::DatabaseVersionParseError::InvalidIdentifier => {
                    DatabaseIntegrityError::InvalidKDBXIdentifier
                }
                crate::format::DatabaseVersionParseError::InvalidVersion {
                    sub_signature,
                    file_major_version,
                    file_minor_version,
                } => DatabaseIntegrityError::InvalidKDBXVersion {
                    version: sub_signature,
                    file_major_version,
                    file_minor_version,
                },
            }
        }
    }

    impl From<crate::format::DatabaseVersionParseError> for DatabaseOpenError {
        fn from(e: crate::format::DatabaseVersionParseError) -> Self {
            DatabaseIntegrityError::from(e).into()
        }
    }

    impl From<crate::key::GetKeyElementsError> for DatabaseKeyError {
        fn from(e: crate::key::GetKeyElementsError) -> Self {
            match e {
                crate::key::GetKeyElementsError::EmptyKey => DatabaseKeyError::EmptyKey,
                crate::key::GetKeyElementsError::Keyfile(_) => DatabaseKeyError::InvalidKeyFile,
                crate::key::GetKeyElementsError::Cryptography(e) => DatabaseKeyError::Cryptography(e),
            }
        }
    }
}
