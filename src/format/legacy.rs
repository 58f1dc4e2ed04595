//! Pre-XML KeePass 1 binary body parser (spec §3/§4.F legacy layout).
//!
//! The legacy container's outer shell - 124 bytes of fixed-layout cleartext fields
//! followed by an AES/Twofish-CBC ciphertext blob - is read only far enough to see the
//! field layout; actually decrypting that blob is out of scope (no keyfile-based v3
//! decryption, see spec Non-goals). [`LegacyHeader::parse`] reads the cleartext fields a
//! caller needs (group/entry counts, content hash) from an already-available plaintext
//! buffer; [`parse_legacy_body`] is the TLV group/entry walker that turns that plaintext
//! into the intermediate model [`crate::db::convert`] builds a v4 tree from.

use byteorder::{ByteOrder, LittleEndian};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::DatabaseIntegrityError;

/// Terminates both a group record and an entry record.
const RECORD_END: u16 = 0xFFFF;

/// Synthetic group id reserved for [`ORPHANED_GROUP_TITLE`]. A real legacy file cannot
/// address this many groups, so collisions are not a practical concern.
const ORPHANED_GROUP_ID: u32 = u32::MAX;

/// Title of the synthetic top-level group that orphaned legacy groups (a `level > 0`
/// group whose parent never appeared in the level stack) are reparented under, rather
/// than failing the whole conversion.
const ORPHANED_GROUP_TITLE: &str = "*Orphaned*";

const GROUP_FIELD_ID: u16 = 1;
const GROUP_FIELD_TITLE: u16 = 2;
const GROUP_FIELD_CREATED: u16 = 3;
const GROUP_FIELD_MODIFIED: u16 = 4;
const GROUP_FIELD_ACCESSED: u16 = 5;
const GROUP_FIELD_EXPIRES: u16 = 6;
const GROUP_FIELD_ICON: u16 = 7;
const GROUP_FIELD_LEVEL: u16 = 8;
const GROUP_FIELD_FLAGS: u16 = 9;

const ENTRY_FIELD_UUID: u16 = 1;
const ENTRY_FIELD_GROUP_ID: u16 = 2;
const ENTRY_FIELD_ICON: u16 = 3;
const ENTRY_FIELD_TITLE: u16 = 4;
const ENTRY_FIELD_URL: u16 = 5;
const ENTRY_FIELD_USERNAME: u16 = 6;
const ENTRY_FIELD_PASSWORD: u16 = 7;
const ENTRY_FIELD_NOTES: u16 = 8;
const ENTRY_FIELD_CREATED: u16 = 9;
const ENTRY_FIELD_MODIFIED: u16 = 0xA;
const ENTRY_FIELD_ACCESSED: u16 = 0xB;
const ENTRY_FIELD_EXPIRES: u16 = 0xC;
const ENTRY_FIELD_BIN_DESC: u16 = 0xD;
const ENTRY_FIELD_BINARY: u16 = 0xE;

/// A single group record out of the legacy binary body, before UUID synthesis.
#[derive(Debug, Clone)]
pub(crate) struct LegacyGroup {
    pub group_id: u32,
    pub parent_group_id: Option<u32>,
    pub level: u16,
    pub title: String,
    pub icon: u32,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
    pub expires: Option<NaiveDateTime>,
    pub expanded: bool,
}

/// A single entry record out of the legacy binary body, before UUID re-encoding.
#[derive(Debug, Clone)]
pub(crate) struct LegacyEntry {
    pub uuid_hex: String,
    pub group_id: u32,
    pub icon: u32,
    pub title: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub accessed: Option<NaiveDateTime>,
    pub expires: Option<NaiveDateTime>,
    pub binary_description: Option<String>,
    pub binary: Option<Vec<u8>>,
}

/// The body of a legacy database: groups in depth-first file order, then entries,
/// with `Meta-Info`/`SYSTEM`/`$` side-channel entries already folded into `expanded`
/// flags on the groups they describe and stripped from `entries`.
#[derive(Debug, Clone, Default)]
pub(crate) struct LegacyBody {
    pub groups: Vec<LegacyGroup>,
    pub entries: Vec<LegacyEntry>,
}

fn read_field(data: &[u8], pos: usize) -> Result<(u16, &[u8], usize), DatabaseIntegrityError> {
    let field_type = LittleEndian::read_u16(data.get(pos..pos + 2).ok_or(DatabaseIntegrityError::InvalidKDBFieldLength {
        field_type: 0,
        field_size: 0,
        expected_field_size: 2,
    })?);

    let size_pos = pos + 2;
    let size_bytes = data.get(size_pos..size_pos + 4).ok_or(DatabaseIntegrityError::InvalidKDBFieldLength {
        field_type,
        field_size: 0,
        expected_field_size: 4,
    })?;
    let field_size = LittleEndian::read_u32(size_bytes);

    let body_pos = size_pos + 4;
    let field_buf = data
        .get(body_pos..body_pos + field_size as usize)
        .ok_or(DatabaseIntegrityError::InvalidKDBFieldLength {
            field_type,
            field_size,
            expected_field_size: field_size,
        })?;

    Ok((field_type, field_buf, body_pos + field_size as usize))
}

/// Strips a trailing NUL terminator (if present) and decodes the rest as UTF-8,
/// lossily - the legacy format never guaranteed valid UTF-8 in free-text fields.
fn parse_null_terminated(buf: &[u8]) -> String {
    let trimmed = match buf.split_last() {
        Some((0, rest)) => rest,
        _ => buf,
    };
    String::from_utf8_lossy(trimmed).into_owned()
}

/// Decodes the legacy 5-byte packed date (year:12 / month:4 / day:5 / hour:5 / minute:6 / second:6).
fn parse_kdb_date(buf: &[u8]) -> Option<NaiveDateTime> {
    let b: &[u8; 5] = buf.try_into().ok()?;
    let year = ((b[0] as u32) << 6) | ((b[1] as u32) >> 2);
    let month = (((b[1] as u32) & 0b11) << 2) | ((b[2] as u32) >> 6);
    let day = ((b[2] as u32) & 0b111111) >> 1;
    let hour = (((b[2] as u32) & 0b1) << 4) | ((b[3] as u32) >> 4);
    let minute = (((b[3] as u32) & 0b1111) << 2) | ((b[4] as u32) >> 6);
    let second = (b[4] as u32) & 0b111111;

    NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, minute, second)
}

fn parse_groups(data: &[u8], num_groups: u32) -> Result<(Vec<LegacyGroup>, usize), DatabaseIntegrityError> {
    let mut pos = 0usize;
    let mut groups = Vec::new();

    // Stack of (level, group_id) for groups still open at each nesting depth; mirrors
    // the reference walker's level-delta bookkeeping rather than an explicit tree.
    let mut stack: Vec<(u16, u32)> = Vec::new();
    let mut has_orphans = false;

    let mut remaining = num_groups;
    let mut group_id = None;
    let mut level = 0u16;
    let mut title = String::new();
    let mut icon = 0u32;
    let mut created = None;
    let mut modified = None;
    let mut accessed = None;
    let mut expires = None;

    while remaining > 0 {
        let (field_type, field_buf, next_pos) = read_field(data, pos)?;
        pos = next_pos;

        match field_type {
            GROUP_FIELD_ID => group_id = Some(LittleEndian::read_u32(field_buf)),
            GROUP_FIELD_TITLE => title = parse_null_terminated(field_buf),
            GROUP_FIELD_CREATED => created = parse_kdb_date(field_buf),
            GROUP_FIELD_MODIFIED => modified = parse_kdb_date(field_buf),
            GROUP_FIELD_ACCESSED => accessed = parse_kdb_date(field_buf),
            GROUP_FIELD_EXPIRES => expires = parse_kdb_date(field_buf),
            GROUP_FIELD_ICON => icon = LittleEndian::read_u32(field_buf),
            GROUP_FIELD_LEVEL => level = LittleEndian::read_u16(field_buf),
            GROUP_FIELD_FLAGS => {}
            RECORD_END => {
                let this_group_id = group_id.take().ok_or(DatabaseIntegrityError::MissingKDBGroupId)?;

                while matches!(stack.last(), Some((stacked_level, _)) if *stacked_level >= level) {
                    stack.pop();
                }
                let mut parent_group_id = stack.last().map(|(_, id)| *id);
                if level > 0 && parent_group_id.is_none() {
                    // OrphanedNode (recoverable): this group's parent never appeared in
                    // the level stack. Reparent under the synthetic orphan-holding group
                    // instead of aborting the whole conversion.
                    log::warn!(
                        "legacy group {} at level {} has no parent in the level stack; reparenting under {}",
                        this_group_id, level, ORPHANED_GROUP_TITLE
                    );
                    has_orphans = true;
                    parent_group_id = Some(ORPHANED_GROUP_ID);
                }
                stack.push((level, this_group_id));

                groups.push(LegacyGroup {
                    group_id: this_group_id,
                    parent_group_id,
                    level,
                    title: std::mem::take(&mut title),
                    icon,
                    created: created.take(),
                    modified: modified.take(),
                    accessed: accessed.take(),
                    expires: expires.take(),
                    expanded: false,
                });

                remaining -= 1;
                icon = 0;
                level = 0;
            }
            field_type => return Err(DatabaseIntegrityError::InvalidKDBGroupFieldType { field_type }),
        }
    }

    if has_orphans {
        groups.push(LegacyGroup {
            group_id: ORPHANED_GROUP_ID,
            parent_group_id: None,
            level: 0,
            title: ORPHANED_GROUP_TITLE.to_string(),
            icon: 0,
            created: None,
            modified: None,
            accessed: None,
            expires: None,
            expanded: false,
        });
    }

    Ok((groups, pos))
}

fn apply_group_tree_state(groups: &mut [LegacyGroup], binary: &[u8]) -> Result<(), DatabaseIntegrityError> {
    if binary.len() < 4 {
        return Err(DatabaseIntegrityError::IncompleteKDBEntry);
    }
    let count = LittleEndian::read_u32(&binary[..4]) as usize;
    if binary.len() != 4 + count * 5 {
        return Err(DatabaseIntegrityError::IncompleteKDBEntry);
    }

    for i in 0..count {
        let record = &binary[4 + i * 5..4 + i * 5 + 5];
        let group_id = LittleEndian::read_u32(&record[..4]);
        let expanded = record[4] != 0;
        if let Some(group) = groups.iter_mut().find(|g| g.group_id == group_id) {
            group.expanded = expanded;
        }
    }

    Ok(())
}

fn parse_entries(
    data: &[u8],
    num_entries: u32,
    mut pos: usize,
    groups: &mut [LegacyGroup],
) -> Result<Vec<LegacyEntry>, DatabaseIntegrityError> {
    let mut entries = Vec::new();

    let mut remaining = num_entries;
    let mut uuid_hex = String::new();
    let mut group_id = None;
    let mut icon = 0u32;
    let mut title = String::new();
    let mut url = String::new();
    let mut username = String::new();
    let mut password = String::new();
    let mut notes = String::new();
    let mut created = None;
    let mut modified = None;
    let mut accessed = None;
    let mut expires = None;
    let mut binary_description: Option<String> = None;
    let mut binary: Option<Vec<u8>> = None;

    while remaining > 0 {
        let (field_type, field_buf, next_pos) = read_field(data, pos)?;
        pos = next_pos;

        match field_type {
            ENTRY_FIELD_UUID => uuid_hex = hex::encode(field_buf),
            ENTRY_FIELD_GROUP_ID => group_id = Some(LittleEndian::read_u32(field_buf)),
            ENTRY_FIELD_ICON => icon = LittleEndian::read_u32(field_buf),
            ENTRY_FIELD_TITLE => title = parse_null_terminated(field_buf),
            ENTRY_FIELD_URL => url = parse_null_terminated(field_buf),
            ENTRY_FIELD_USERNAME => username = parse_null_terminated(field_buf),
            ENTRY_FIELD_PASSWORD => password = parse_null_terminated(field_buf),
            ENTRY_FIELD_NOTES => notes = parse_null_terminated(field_buf),
            ENTRY_FIELD_CREATED => created = parse_kdb_date(field_buf),
            ENTRY_FIELD_MODIFIED => modified = parse_kdb_date(field_buf),
            ENTRY_FIELD_ACCESSED => accessed = parse_kdb_date(field_buf),
            ENTRY_FIELD_EXPIRES => expires = parse_kdb_date(field_buf),
            ENTRY_FIELD_BIN_DESC => binary_description = Some(parse_null_terminated(field_buf)),
            ENTRY_FIELD_BINARY => binary = Some(field_buf.to_vec()),
            RECORD_END => {
                remaining -= 1;

                let is_metainfo = title == "Meta-Info" && username == "SYSTEM" && url == "$";
                if is_metainfo {
                    if notes == "KPX_GROUP_TREE_STATE" {
                        if let Some(binary) = &binary {
                            apply_group_tree_state(groups, binary)?;
                        }
                    }
                    // KPX_CUSTOM_ICONS_4 and other metastreams are recognized but not
                    // translated into the object model; custom icon assignment is not
                    // part of this crate's converter output.
                } else {
                    entries.push(LegacyEntry {
                        uuid_hex: std::mem::take(&mut uuid_hex),
                        group_id: group_id.unwrap_or(0),
                        icon,
                        title: std::mem::take(&mut title),
                        url: std::mem::take(&mut url),
                        username: std::mem::take(&mut username),
                        password: std::mem::take(&mut password),
                        notes: std::mem::take(&mut notes),
                        created: created.take(),
                        modified: modified.take(),
                        accessed: accessed.take(),
                        expires: expires.take(),
                        binary_description: binary_description.take(),
                        binary: binary.take(),
                    });
                }

                group_id = None;
                icon = 0;
            }
            field_type => return Err(DatabaseIntegrityError::InvalidKDBEntryFieldType { field_type }),
        }
    }

    Ok(entries)
}

/// Walks the decrypted legacy binary body - `num_groups` group records followed by
/// `num_entries` entry records, each a stream of type-length-value fields terminated
/// by a `0xFFFF` record-end marker - into the intermediate model the v3-to-v4 converter
/// consumes. `data` is everything after the legacy header; credentials and the
/// AES/Twofish-CBC unwrap that produces it are not implemented by this crate.
pub(crate) fn parse_legacy_body(data: &[u8], num_groups: u32, num_entries: u32) -> Result<LegacyBody, DatabaseIntegrityError> {
    let (mut groups, pos) = parse_groups(data, num_groups)?;
    let entries = parse_entries(data, num_entries, pos, &mut groups)?;

    Ok(LegacyBody { groups, entries })
}

#[cfg(test)]
mod legacy_tests {
    use super::*;

    fn field(buf: &mut Vec<u8>, field_type: u16, body: &[u8]) {
        buf.extend_from_slice(&field_type.to_le_bytes());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(body);
    }

    fn group_record(buf: &mut Vec<u8>, group_id: u32, level: u16, title: &str) {
        field(buf, GROUP_FIELD_ID, &group_id.to_le_bytes());
        let mut title_bytes = title.as_bytes().to_vec();
        title_bytes.push(0);
        field(buf, GROUP_FIELD_TITLE, &title_bytes);
        field(buf, GROUP_FIELD_LEVEL, &level.to_le_bytes());
        field(buf, RECORD_END, &[]);
    }

    /// A `level > 0` group whose parent never showed up in the level stack is
    /// reparented under the synthetic orphan group instead of failing the parse.
    #[test]
    fn orphaned_group_is_reparented_not_fatal() {
        let mut data = Vec::new();
        group_record(&mut data, 1, 1, "Stray child");

        let (groups, _) = parse_groups(&data, 1).expect("orphaned group should parse, not error");

        assert_eq!(groups.len(), 2);
        let stray = groups.iter().find(|g| g.group_id == 1).unwrap();
        assert_eq!(stray.parent_group_id, Some(ORPHANED_GROUP_ID));

        let orphaned_root = groups.iter().find(|g| g.group_id == ORPHANED_GROUP_ID).unwrap();
        assert_eq!(orphaned_root.title, ORPHANED_GROUP_TITLE);
        assert_eq!(orphaned_root.parent_group_id, None);
    }

    #[test]
    fn well_formed_tree_has_no_synthetic_group() {
        let mut data = Vec::new();
        group_record(&mut data, 1, 0, "Root child");
        group_record(&mut data, 2, 1, "Nested child");

        let (groups, _) = parse_groups(&data, 2).expect("well-formed tree should parse");

        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(|g| g.group_id != ORPHANED_GROUP_ID));
    }
}
