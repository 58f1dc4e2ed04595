use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::db::{CustomData, Times};

/// Database metadata: settings applying to the whole database rather than to any
/// single Group or Entry.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct Meta {
    pub generator: Option<String>,

    pub database_name: Option<String>,
    pub database_name_changed: Option<NaiveDateTime>,

    pub database_description: Option<String>,
    pub database_description_changed: Option<NaiveDateTime>,

    pub default_username: Option<String>,
    pub default_username_changed: Option<NaiveDateTime>,

    pub maintenance_history_days: Option<usize>,
    pub color: Option<String>,

    pub master_key_changed: Option<NaiveDateTime>,
    pub master_key_change_rec: Option<i64>,
    pub master_key_change_force: Option<i64>,

    pub memory_protection: MemoryProtection,

    pub custom_icons: CustomIcons,

    pub recyclebin_enabled: Option<bool>,
    pub recyclebin_uuid: Uuid,
    pub recyclebin_changed: Option<NaiveDateTime>,

    pub entry_templates_group: Uuid,
    pub entry_templates_group_changed: Option<NaiveDateTime>,

    pub last_selected_group: Option<Uuid>,
    pub last_top_visible_group: Option<Uuid>,

    pub history_max_items: Option<usize>,
    pub history_max_size: Option<usize>,

    pub settings_changed: Option<NaiveDateTime>,

    pub binaries: BinaryAttachments,
    pub custom_data: CustomData,
}

/// Which standard fields should have protected (in-memory encrypted) values by
/// default for newly created entries.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct MemoryProtection {
    pub protect_title: bool,
    pub protect_username: bool,
    pub protect_password: bool,
    pub protect_url: bool,
    pub protect_notes: bool,
}

impl MemoryProtection {
    /// `convert.py`'s v3-converter default: only `Password` is protected.
    pub fn password_only() -> Self {
        MemoryProtection {
            protect_password: true,
            ..Default::default()
        }
    }
}

/// Custom icons usable by Groups and Entries in place of the builtin icon set.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct CustomIcons {
    pub icons: Vec<Icon>,
}

#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct Icon {
    pub uuid: Uuid,
    pub data: Vec<u8>,
}

/// Binary attachments carried in the inner header, referenced by entries via
/// `identifier`.
#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct BinaryAttachments {
    pub attachments: Vec<BinaryAttachment>,
}

impl BinaryAttachments {
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}

#[derive(Debug, Default, Eq, PartialEq, Clone)]
#[cfg_attr(feature = "serialization", derive(serde::Serialize))]
pub struct BinaryAttachment {
    pub identifier: Option<String>,
    pub compressed: bool,
    pub content: Vec<u8>,
}

#[cfg(test)]
mod meta_tests {
    use super::*;

    #[test]
    fn defaults_are_unprotected_except_password_for_v3_conversions() {
        assert!(!MemoryProtection::default().protect_password);
        assert!(MemoryProtection::password_only().protect_password);
        assert!(!MemoryProtection::password_only().protect_title);
    }

    #[test]
    fn binaries_default_to_empty() {
        assert!(Meta::default().binaries.is_empty());
        assert!(Meta::default().custom_data.items.is_empty());
    }
}
