//! Pure conversion of a parsed legacy body (spec §4.F) into a v4 object-model [`Database`].
//!
//! Grounded directly in `convert.py`'s `convert_kdb3_to_kxml4`: a synthetic `Root` group
//! owns every top-level legacy group, group UUIDs are synthesized from the 32-bit legacy
//! group id (`SHA-256(group_id as LE u32)[..16]`), entry UUIDs are the legacy 16-byte
//! entry id carried straight through, and a handful of fields that the legacy format
//! never carried (icon 48 for Root, `EntryTemplatesGroup` as the nil UUID, `Password`-only
//! memory protection) are seeded with the same defaults the reference converter uses.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    crypt::calculate_sha256,
    db::{
        entry::{Entry, Value},
        group::Group,
        meta::{Meta, MemoryProtection},
        node::Node,
        Database, Times,
    },
    error::ConvertError,
    format::legacy::{LegacyBody, LegacyEntry, LegacyGroup},
};

/// `IconID` the reference converter assigns to the synthetic `Root` group.
const ROOT_ICON_ID: usize = 48;

fn group_uuid(group_id: u32) -> Result<Uuid, ConvertError> {
    let hash = calculate_sha256(&[&group_id.to_le_bytes()]).map_err(|e| {
        ConvertError::Integrity(crate::error::DatabaseIntegrityError::Cryptography(e))
    })?;
    let bytes: [u8; 16] = hash
        .get(..16)
        .and_then(|s| s.try_into().ok())
        .ok_or(ConvertError::Truncated { offset: 0 })?;
    Ok(Uuid::from_bytes(bytes))
}

fn entry_uuid(entry: &LegacyEntry) -> Result<Uuid, ConvertError> {
    let raw = hex::decode(&entry.uuid_hex).map_err(|_| ConvertError::Truncated { offset: 0 })?;
    let bytes: [u8; 16] = raw
        .as_slice()
        .try_into()
        .map_err(|_| ConvertError::Truncated { offset: 0 })?;
    Ok(Uuid::from_bytes(bytes))
}

fn times_from_legacy(created: Option<chrono::NaiveDateTime>, modified: Option<chrono::NaiveDateTime>, accessed: Option<chrono::NaiveDateTime>, expires: Option<chrono::NaiveDateTime>) -> Times {
    let mut times = Times::default();
    let fallback = Times::epoch();

    times.set_creation(created.unwrap_or(fallback));
    times.set_last_modification(modified.unwrap_or(fallback));
    times.set_last_access(accessed.unwrap_or(fallback));
    times.set_location_changed(created.unwrap_or(fallback));

    let expires_at = expires.unwrap_or(fallback);
    times.expires = expires_at != Times::epoch();
    times.set_expiry(expires_at);

    times
}

fn convert_entry(entry: &LegacyEntry) -> Result<Entry, ConvertError> {
    let mut fields = HashMap::new();
    fields.insert("Title".to_string(), Value::Unprotected(entry.title.clone()));
    fields.insert("URL".to_string(), Value::Unprotected(entry.url.clone()));
    fields.insert("UserName".to_string(), Value::Unprotected(entry.username.clone()));
    fields.insert("Password".to_string(), Value::Unprotected(entry.password.clone()));
    fields.insert("Notes".to_string(), Value::Unprotected(entry.notes.clone()));

    Ok(Entry {
        uuid: entry_uuid(entry)?,
        fields,
        autotype: None,
        tags: Vec::new(),
        times: times_from_legacy(entry.created, entry.modified, entry.accessed, entry.expires),
        custom_data: Default::default(),
        icon_id: Some(entry.icon as usize),
        custom_icon_uuid: None,
        foreground_color: None,
        background_color: None,
        override_url: None,
        quality_check: None,
        history: None,
    })
}

fn convert_group(legacy: &LegacyGroup, children: Vec<Node>) -> Result<Group, ConvertError> {
    let is_backup = legacy.title == "Backup";

    Ok(Group {
        uuid: group_uuid(legacy.group_id)?,
        name: legacy.title.clone(),
        notes: None,
        icon_id: Some(legacy.icon as usize),
        custom_icon_uuid: None,
        children,
        times: times_from_legacy(legacy.created, legacy.modified, legacy.accessed, legacy.expires),
        custom_data: Default::default(),
        is_expanded: legacy.expanded,
        default_autotype_sequence: None,
        enable_autotype: if is_backup { Some("False".to_string()) } else { None },
        enable_searching: if is_backup { Some("False".to_string()) } else { None },
        last_top_visible_entry: None,
    })
}

/// Converts an already-parsed legacy body into a v4 [`Database`], following
/// `convert.py`'s defaults for everything the legacy format has no field for.
pub fn convert_legacy_body(body: &LegacyBody) -> Result<Database, ConvertError> {
    // Build groups bottom-up (deepest level first) so each parent already has its
    // full child list by the time it is converted, mirroring the reference
    // converter's single top-down pass via an explicit group stack.
    let mut ordered: Vec<&LegacyGroup> = body.groups.iter().collect();
    ordered.sort_by_key(|g| std::cmp::Reverse(g.level));

    let mut converted: HashMap<u32, Group> = HashMap::new();
    let mut children: HashMap<u32, Vec<Node>> = HashMap::new();

    for entry in &body.entries {
        let converted_entry = convert_entry(entry)?;
        children.entry(entry.group_id).or_default().push(Node::Entry(converted_entry));
    }

    for legacy_group in &ordered {
        let own_children = children.remove(&legacy_group.group_id).unwrap_or_default();
        let group = convert_group(legacy_group, own_children)?;
        converted.insert(legacy_group.group_id, group.clone());

        if let Some(parent_id) = legacy_group.parent_group_id {
            children.entry(parent_id).or_default().push(Node::Group(group));
        }
    }

    let top_level: Vec<Node> = body
        .groups
        .iter()
        .filter(|g| g.parent_group_id.is_none())
        .filter_map(|g| converted.get(&g.group_id).cloned())
        .map(Node::Group)
        .collect();

    let mut root = Group {
        uuid: Uuid::nil(),
        name: "Root".to_string(),
        notes: None,
        icon_id: Some(ROOT_ICON_ID),
        custom_icon_uuid: None,
        children: top_level,
        times: {
            let epoch = Times::epoch();
            times_from_legacy(Some(epoch), Some(epoch), Some(epoch), Some(epoch))
        },
        custom_data: Default::default(),
        is_expanded: true,
        default_autotype_sequence: None,
        enable_autotype: None,
        enable_searching: None,
        last_top_visible_entry: None,
    };
    root.times.expires = false;

    let meta = Meta {
        database_name: Some("converted".to_string()),
        memory_protection: MemoryProtection::password_only(),
        entry_templates_group: Uuid::nil(),
        ..Default::default()
    };

    Ok(Database {
        config: Default::default(),
        header_attachments: Vec::new(),
        root,
        deleted_objects: Default::default(),
        meta,
    })
}

/// Parses a decrypted legacy binary body and converts it straight into a v4
/// [`Database`] in one step. `num_groups`/`num_entries` come from the legacy header's
/// cleartext `Groups`/`Entries` fields.
pub fn convert_legacy(decrypted_body: &[u8], num_groups: u32, num_entries: u32) -> Result<Database, ConvertError> {
    let body = crate::format::legacy::parse_legacy_body(decrypted_body, num_groups, num_entries)?;
    convert_legacy_body(&body)
}
