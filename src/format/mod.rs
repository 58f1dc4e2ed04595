//! Outer container format detection and the container codec itself.
//!
//! This crate reads and writes a single container shape: a TLV outer header followed by
//! an AES/Twofish-CBC encrypted, hashed-block-framed XML payload (module [`kdbx4`]). A
//! separate, much older binary layout - the pre-XML KeePass 1 format - is understood only
//! as the input side of the [`crate::db::convert`] migration, never read or written
//! directly by the public façade.
pub mod kdbx4;
pub mod legacy;

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

const KDBX_IDENTIFIER: [u8; 4] = [0x03, 0xd9, 0xa2, 0x9a];

/// Sub-signature of the legacy, pre-XML binary format.
pub const LEGACY_SUB_SIGNATURE: u32 = 0xb54bfb65;
/// Sub-signature of the TLV-header/hashed-block container format this crate reads and writes.
pub const CONTAINER_SUB_SIGNATURE: u32 = 0xb54bfb67;

pub const CONTAINER_MAJOR_VERSION: u16 = 4;
pub const CONTAINER_CURRENT_MINOR_VERSION: u16 = 0;

/// Which of the two formats a file's signature identifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub enum DatabaseVersion {
    /// Pre-XML binary format; only ever consumed by the v3-to-v4 converter.
    Legacy(u16),
    /// The TLV-header container format described by this crate's object model.
    Container(u16),
}

impl DatabaseVersion {
    pub fn parse(data: &[u8]) -> Result<DatabaseVersion, DatabaseVersionParseError> {
        if data.len() < DatabaseVersion::get_version_header_size() {
            return Err(DatabaseVersionParseError::InvalidIdentifier);
        }

        if data[0..4] != KDBX_IDENTIFIER {
            return Err(DatabaseVersionParseError::InvalidIdentifier);
        }

        let sub_signature = LittleEndian::read_u32(&data[4..8]);
        let file_minor_version = LittleEndian::read_u16(&data[8..10]);
        let file_major_version = LittleEndian::read_u16(&data[10..12]);

        match sub_signature {
            LEGACY_SUB_SIGNATURE => Ok(DatabaseVersion::Legacy(file_minor_version)),
            CONTAINER_SUB_SIGNATURE => Ok(DatabaseVersion::Container(file_minor_version)),
            _ => Err(DatabaseVersionParseError::InvalidVersion {
                sub_signature,
                file_major_version: file_major_version as u32,
                file_minor_version: file_minor_version as u32,
            }),
        }
    }

    pub(crate) fn dump(&self, writer: &mut dyn std::io::Write) -> Result<(), std::io::Error> {
        use byteorder::WriteBytesExt;

        match self {
            DatabaseVersion::Container(minor_version) => {
                writer.write_all(&KDBX_IDENTIFIER)?;
                writer.write_u32::<LittleEndian>(CONTAINER_SUB_SIGNATURE)?;
                writer.write_u16::<LittleEndian>(*minor_version)?;
                writer.write_u16::<LittleEndian>(CONTAINER_MAJOR_VERSION)?;
                Ok(())
            }
            DatabaseVersion::Legacy(_) => {
                panic!("DatabaseVersion::dump does not support writing the legacy format")
            }
        }
    }

    pub(crate) fn get_version_header_size() -> usize {
        12
    }
}

#[derive(Error, Debug)]
pub enum DatabaseVersionParseError {
    #[error("Not a KDBX file: invalid file signature")]
    InvalidIdentifier,

    #[error("Unknown KDBX sub-signature/version: {:#x} ({}.{})", sub_signature, file_major_version, file_minor_version)]
    InvalidVersion {
        sub_signature: u32,
        file_major_version: u32,
        file_minor_version: u32,
    },
}

impl std::fmt::Display for DatabaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseVersion::Legacy(minor) => write!(f, "Legacy.{}", minor),
            DatabaseVersion::Container(minor) => write!(f, "KDBX4.{}", minor),
        }
    }
}
