//! Structural equality between two databases, with tunable ignore-sets.
//!
//! Field-level `PartialEq` on `Group`/`Entry` is already exact (it is what
//! [`super::merge`] uses to detect divergence), but callers comparing two
//! independently-synced copies of a database usually want to look past
//! incidental differences: access timestamps bumped by opening the file,
//! `UsageCount` counters, or history lists that were pruned on one side. This
//! module builds that comparison out of the same derived equality the rest of
//! `db` relies on, selectively blinding it to the fields a caller doesn't
//! care about.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::db::{Database, DeletedObjects, Entry, Group, Meta, NodeRef, Times, LAST_ACCESS_TIME_TAG_NAME};

/// Which aspects of two databases should be compared.
///
/// The default config is the strictest one: everything is compared. Turning
/// a flag off widens what's allowed to differ without being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EqualityConfig {
    /// Compare the `Meta` block (database name, recycle bin settings, icons, ...).
    pub metadata: bool,
    /// When comparing metadata, ignore every `*Changed` timestamp child.
    pub ignore_times: bool,
    /// Compare each entry's `History` list.
    pub history: bool,
    /// Compare the `DeletedObjects` tombstone lists.
    pub deleted_objects: bool,
    /// Reserved for ignoring non-semantic attributes on compared elements; the
    /// object model here has no generic attribute bag left after parsing, so
    /// this currently has no effect beyond documenting the intent.
    pub ignore_attrs: bool,
    /// Drop `LastAccessTime` and `UsageCount` from every `Times` comparison.
    pub ignore_access_time: bool,
}

impl Default for EqualityConfig {
    fn default() -> Self {
        EqualityConfig {
            metadata: true,
            ignore_times: false,
            history: true,
            deleted_objects: true,
            ignore_attrs: false,
            ignore_access_time: false,
        }
    }
}

/// A human-readable record of every way two databases were found to differ.
/// An empty report means the databases are equal under the given config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EqualityReport {
    pub differences: Vec<String>,
}

impl EqualityReport {
    pub fn is_equal(&self) -> bool {
        self.differences.is_empty()
    }

    fn push(&mut self, difference: impl Into<String>) {
        self.differences.push(difference.into());
    }
}

/// Compare two databases under the given config, returning every difference found.
pub fn compare_databases(a: &Database, b: &Database, config: &EqualityConfig) -> EqualityReport {
    let mut report = EqualityReport::default();

    if config.metadata {
        compare_meta(&a.meta, &b.meta, config, &mut report);
    }

    if config.deleted_objects {
        compare_deleted_objects(&a.deleted_objects, &b.deleted_objects, &mut report);
    }

    let a_nodes = uuid_map(&a.root);
    let b_nodes = uuid_map(&b.root);

    let a_uuids: HashSet<Uuid> = a_nodes.keys().copied().collect();
    let b_uuids: HashSet<Uuid> = b_nodes.keys().copied().collect();

    if a_uuids != b_uuids {
        let only_in_a: Vec<Uuid> = a_uuids.difference(&b_uuids).copied().collect();
        let only_in_b: Vec<Uuid> = b_uuids.difference(&a_uuids).copied().collect();
        report.push(format!(
            "object sets differ: only in first database: {:?}, only in second database: {:?}",
            only_in_a, only_in_b
        ));
        return report;
    }

    for uuid in a_uuids {
        match (a_nodes[&uuid], b_nodes[&uuid]) {
            (NodeRef::Group(ga), NodeRef::Group(gb)) => compare_groups(ga, gb, config, &mut report),
            (NodeRef::Entry(ea), NodeRef::Entry(eb)) => compare_entries(ea, eb, config, &mut report),
            _ => report.push(format!(
                "object {} changed kind between the two databases (Group vs Entry)",
                uuid
            )),
        }
    }

    report
}

/// Two databases are equal under the given config if no differences were found.
pub fn databases_eq(a: &Database, b: &Database, config: &EqualityConfig) -> bool {
    compare_databases(a, b, config).is_equal()
}

fn uuid_map(root: &Group) -> HashMap<Uuid, NodeRef<'_>> {
    root.iter().map(|node_ref| (node_uuid(&node_ref), node_ref)).collect()
}

fn node_uuid(node_ref: &NodeRef<'_>) -> Uuid {
    match node_ref {
        NodeRef::Group(g) => g.uuid,
        NodeRef::Entry(e) => e.uuid,
    }
}

fn compare_meta(a: &Meta, b: &Meta, config: &EqualityConfig, report: &mut EqualityReport) {
    macro_rules! field {
        ($name:literal, $field:ident) => {
            if a.$field != b.$field {
                report.push(format!("Meta.{} differs: {:?} vs {:?}", $name, a.$field, b.$field));
            }
        };
    }

    field!("Generator", generator);
    field!("DatabaseName", database_name);
    field!("DatabaseDescription", database_description);
    field!("DefaultUserName", default_username);
    field!("MaintenanceHistoryDays", maintenance_history_days);
    field!("Color", color);
    field!("MasterKeyChangeRec", master_key_change_rec);
    field!("MasterKeyChangeForce", master_key_change_force);
    field!("MemoryProtection", memory_protection);
    field!("CustomIcons", custom_icons);
    field!("RecycleBinEnabled", recyclebin_enabled);
    field!("RecycleBinUUID", recyclebin_uuid);
    field!("EntryTemplatesGroup", entry_templates_group);
    field!("HistoryMaxItems", history_max_items);
    field!("HistoryMaxSize", history_max_size);
    field!("Binaries", binaries);
    field!("CustomData", custom_data);

    // `HeaderHash` is a kdbx3 artifact discarded on parse and never lands in `Meta`.
    // `LastSelectedGroup`/`LastTopVisibleGroup` are UI state, not database content.
    if !config.ignore_times {
        field!("DatabaseNameChanged", database_name_changed);
        field!("DatabaseDescriptionChanged", database_description_changed);
        field!("DefaultUserNameChanged", default_username_changed);
        field!("MasterKeyChanged", master_key_changed);
        field!("RecycleBinChanged", recyclebin_changed);
        field!("EntryTemplatesGroupChanged", entry_templates_group_changed);
        field!("SettingsChanged", settings_changed);
    }
}

fn compare_deleted_objects(a: &DeletedObjects, b: &DeletedObjects, report: &mut EqualityReport) {
    let a_set: HashSet<Uuid> = a.objects.iter().map(|o| o.uuid).collect();
    let b_set: HashSet<Uuid> = b.objects.iter().map(|o| o.uuid).collect();

    if a_set != b_set {
        let only_in_a: Vec<Uuid> = a_set.difference(&b_set).copied().collect();
        let only_in_b: Vec<Uuid> = b_set.difference(&a_set).copied().collect();
        report.push(format!(
            "DeletedObjects differ: only in first database: {:?}, only in second database: {:?}",
            only_in_a, only_in_b
        ));
    }
}

fn compare_groups(a: &Group, b: &Group, config: &EqualityConfig, report: &mut EqualityReport) {
    macro_rules! field {
        ($name:literal, $field:ident) => {
            if a.$field != b.$field {
                report.push(format!(
                    "Group {} field {} differs: {:?} vs {:?}",
                    a.uuid, $name, a.$field, b.$field
                ));
            }
        };
    }

    field!("Name", name);
    field!("Notes", notes);
    field!("IconID", icon_id);
    field!("CustomIconUUID", custom_icon_uuid);
    field!("IsExpanded", is_expanded);
    field!("DefaultAutoTypeSequence", default_autotype_sequence);
    field!("EnableAutoType", enable_autotype);
    field!("EnableSearching", enable_searching);
    field!("LastTopVisibleEntry", last_top_visible_entry);
    field!("CustomData", custom_data);

    compare_times(a.uuid, &a.times, &b.times, config, report);
}

fn compare_entries(a: &Entry, b: &Entry, config: &EqualityConfig, report: &mut EqualityReport) {
    if a.fields != b.fields {
        report.push(format!("Entry {} Strings differ", a.uuid));
    }
    if a.autotype != b.autotype {
        report.push(format!("Entry {} AutoType differs", a.uuid));
    }
    if a.tags != b.tags {
        report.push(format!("Entry {} Tags differ: {:?} vs {:?}", a.uuid, a.tags, b.tags));
    }
    if a.icon_id != b.icon_id {
        report.push(format!("Entry {} IconID differs", a.uuid));
    }
    if a.custom_icon_uuid != b.custom_icon_uuid {
        report.push(format!("Entry {} CustomIconUUID differs", a.uuid));
    }
    if a.foreground_color != b.foreground_color {
        report.push(format!("Entry {} ForegroundColor differs", a.uuid));
    }
    if a.background_color != b.background_color {
        report.push(format!("Entry {} BackgroundColor differs", a.uuid));
    }
    if a.override_url != b.override_url {
        report.push(format!("Entry {} OverrideURL differs", a.uuid));
    }
    if a.quality_check != b.quality_check {
        report.push(format!("Entry {} QualityCheck differs", a.uuid));
    }
    if a.custom_data != b.custom_data {
        report.push(format!("Entry {} CustomData differs", a.uuid));
    }

    compare_times(a.uuid, &a.times, &b.times, config, report);

    if config.history {
        let a_history = a.history.as_ref().map(|h| h.entries.as_slice()).unwrap_or(&[]);
        let b_history = b.history.as_ref().map(|h| h.entries.as_slice()).unwrap_or(&[]);

        if a_history.len() != b_history.len() {
            report.push(format!(
                "Entry {} History length differs: {} vs {}",
                a.uuid,
                a_history.len(),
                b_history.len()
            ));
        } else {
            for (ha, hb) in a_history.iter().zip(b_history.iter()) {
                compare_entries(ha, hb, config, report);
            }
        }
    }
}

fn compare_times(uuid: Uuid, a: &Times, b: &Times, config: &EqualityConfig, report: &mut EqualityReport) {
    if a.expires != b.expires {
        report.push(format!("Times for {} differ: Expires {} vs {}", uuid, a.expires, b.expires));
    }

    let (a_times, b_times) = if config.ignore_access_time {
        (strip_access_time(&a.times), strip_access_time(&b.times))
    } else {
        (a.times.clone(), b.times.clone())
    };

    let ignore_usage_count = config.ignore_access_time;

    if a_times != b_times {
        report.push(format!("Times for {} differ", uuid));
    }
    if !ignore_usage_count && a.usage_count != b.usage_count {
        report.push(format!(
            "Times for {} differ: UsageCount {} vs {}",
            uuid, a.usage_count, b.usage_count
        ));
    }
}

fn strip_access_time(times: &HashMap<String, chrono::NaiveDateTime>) -> HashMap<String, chrono::NaiveDateTime> {
    times
        .iter()
        .filter(|(k, _)| k.as_str() != LAST_ACCESS_TIME_TAG_NAME)
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

#[cfg(test)]
mod equality_tests {
    use super::*;
    use crate::db::Value;

    fn sample_entry() -> Entry {
        let mut entry = Entry::new();
        entry.fields.insert("Title".to_string(), Value::Unprotected("Example".to_string()));
        entry
    }

    #[test]
    fn identical_databases_are_equal() {
        let mut db = Database::new(Default::default());
        db.root.add_child(sample_entry());
        let other = db.clone();

        let report = compare_databases(&db, &other, &EqualityConfig::default());
        assert!(report.is_equal(), "{:?}", report.differences);
    }

    #[test]
    fn differing_field_value_is_reported() {
        let mut a = Database::new(Default::default());
        let mut entry = sample_entry();
        let uuid = entry.uuid;
        entry.fields.insert("Title".to_string(), Value::Unprotected("A".to_string()));
        a.root.add_child(entry.clone());

        let mut b = Database::new(Default::default());
        entry.fields.insert("Title".to_string(), Value::Unprotected("B".to_string()));
        entry.uuid = uuid;
        b.root.add_child(entry);

        let report = compare_databases(&a, &b, &EqualityConfig::default());
        assert!(!report.is_equal());
        assert!(report.differences.iter().any(|d| d.contains("Strings differ")));
    }

    #[test]
    fn ignore_access_time_drops_only_access_and_usage_count() {
        let mut a = sample_entry();
        let mut b = a.clone();

        let mut later = a.times.clone();
        later.set_last_access(Times::now());
        later.usage_count += 1;
        b.times = later;

        let mut report = EqualityReport::default();
        let config = EqualityConfig {
            ignore_access_time: true,
            ..EqualityConfig::default()
        };
        compare_times(a.uuid, &a.times, &b.times, &config, &mut report);
        assert!(report.is_equal());

        let mut strict_report = EqualityReport::default();
        compare_times(a.uuid, &a.times, &b.times, &EqualityConfig::default(), &mut strict_report);
        assert!(!strict_report.is_equal());
    }

    #[test]
    fn uuid_set_mismatch_is_reported_with_symmetric_difference() {
        let mut a = Database::new(Default::default());
        a.root.add_child(sample_entry());

        let b = Database::new(Default::default());

        let report = compare_databases(&a, &b, &EqualityConfig::default());
        assert!(!report.is_equal());
        assert!(report.differences.iter().any(|d| d.contains("object sets differ")));
    }
}
