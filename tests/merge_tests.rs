use chrono::{NaiveDate, NaiveDateTime};
use kdbx_merge::{
    db::{fields, Entry, Group, MergeEventType, MergeMode, Value},
    error::MergeError,
    Database,
};

fn at(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(seconds)
}

fn entry_with_title(title: &str, modified: NaiveDateTime) -> Entry {
    let mut e = Entry::new();
    e.fields.insert(fields::TITLE.to_string(), Value::Unprotected(title.to_string()));
    e.times.set_creation(modified);
    e.times.set_last_modification(modified);
    e.times.set_last_access(modified);
    e.times.set_location_changed(modified);
    e
}

/// S1: merging a database with an identical copy of itself must not report any
/// change and must leave the database equal to the original.
#[test]
fn self_merge_is_a_no_op() {
    let mut db = Database::new(Default::default());

    let mut general = Group::new("General");
    general.add_child(entry_with_title("Nested Entry", at(0)));
    db.root.add_child(general);
    db.root.add_child(entry_with_title("Top-level Entry", at(0)));

    let original = db.clone();
    let other = db.clone();

    let log = db.merge(&other, MergeMode::Synchronize, false).expect("self-merge should succeed");

    assert!(log.events.is_empty(), "self-merge reported changes: {:?}", log.events);
    assert!(log.warnings.is_empty(), "self-merge reported warnings: {:?}", log.warnings);
    assert_eq!(db, original, "self-merge must not mutate the database");
}

/// S4: two copies of a database diverge from a shared ancestor by editing different
/// fields on the same entry. A 3-way merge must fold both edits in without losing
/// either one.
#[test]
fn concurrent_field_edits_reconcile_via_common_ancestor() {
    let mut ancestor = Entry::new();
    ancestor.fields.insert(fields::TITLE.to_string(), Value::Unprotected("Shared".to_string()));
    ancestor.times.set_creation(at(0));
    ancestor.times.set_last_modification(at(0));

    let entry_uuid = ancestor.uuid;

    let mut dest_entry = ancestor.clone();
    dest_entry
        .fields
        .insert(fields::NOTES.to_string(), Value::Unprotected("dest notes".to_string()));
    dest_entry.times.set_last_modification(at(10));
    let mut dest_history = kdbx_merge::db::History::default();
    dest_history.add_entry(ancestor.clone());
    dest_entry.history = Some(dest_history);

    let mut src_entry = ancestor.clone();
    src_entry
        .fields
        .insert(fields::USERNAME.to_string(), Value::Unprotected("src-user".to_string()));
    src_entry.times.set_last_modification(at(20));
    let mut src_history = kdbx_merge::db::History::default();
    src_history.add_entry(ancestor.clone());
    src_entry.history = Some(src_history);

    let mut dest_db = Database::new(Default::default());
    dest_db.root.add_child(dest_entry);

    let mut src_db = Database::new(Default::default());
    src_db.root.add_child(src_entry);
    src_db.root.uuid = dest_db.root.uuid;

    let log = dest_db
        .merge(&src_db, MergeMode::Synchronize3Way, false)
        .expect("3-way merge should succeed");

    assert!(log.events.iter().any(|e| e.event_type == MergeEventType::EntryUpdated && e.node_uuid == entry_uuid));

    let merged = dest_db
        .root
        .entries()
        .into_iter()
        .find(|e| e.uuid == entry_uuid)
        .expect("entry should still exist after merge");

    assert_eq!(merged.get_title(), Some("Shared"));
    assert_eq!(merged.get("Notes"), Some("dest notes"));
    assert_eq!(merged.get_username(), Some("src-user"));
}

/// S5: an entry tombstoned on one side but modified after that tombstone's
/// deletion time on the other side must survive the merge (resurrection), while
/// the tombstone itself is still recorded.
#[test]
fn entry_modified_after_tombstone_is_resurrected() {
    let mut dest_db = Database::new(Default::default());
    let entry = entry_with_title("Survivor", at(20));
    let entry_uuid = entry.uuid;
    dest_db.root.add_child(entry);

    let mut src_db = dest_db.clone();
    src_db.root.children.clear();
    src_db.deleted_objects.objects.push(kdbx_merge::db::DeletedObject {
        uuid: entry_uuid,
        deletion_time: at(10),
    });

    let log = dest_db
        .merge(&src_db, MergeMode::Synchronize, false)
        .expect("merge should succeed");

    assert!(!log
        .events
        .iter()
        .any(|e| e.event_type == MergeEventType::EntryDeleted && e.node_uuid == entry_uuid));

    let survivor = dest_db.root.entries().into_iter().find(|e| e.uuid == entry_uuid);
    assert!(survivor.is_some(), "entry modified after its tombstone should not be deleted");

    assert!(dest_db.deleted_objects.contains(entry_uuid), "tombstone should still be recorded");
}

/// Metadata merge copies the newer side's `DatabaseName`/etc. field by field,
/// keyed on each field's own `*Changed` timestamp, and refuses to run when the
/// incoming side carries Binaries or CustomData.
#[test]
fn metadata_merge_takes_newer_field_and_rejects_nonempty_binaries() {
    let mut dest_db = Database::new(Default::default());
    dest_db.meta.database_name = Some("Old name".to_string());
    dest_db.meta.database_name_changed = Some(at(0));

    let mut src_db = dest_db.clone();
    src_db.meta.database_name = Some("New name".to_string());
    src_db.meta.database_name_changed = Some(at(10));

    dest_db.merge(&src_db, MergeMode::Synchronize, true).expect("metadata merge should succeed");
    assert_eq!(dest_db.meta.database_name.as_deref(), Some("New name"));

    let mut dest_db = Database::new(Default::default());
    let mut src_db = Database::new(Default::default());
    src_db.meta.binaries.attachments.push(kdbx_merge::db::BinaryAttachment {
        identifier: Some("1".to_string()),
        compressed: false,
        content: vec![1, 2, 3],
    });

    let err = dest_db
        .merge(&src_db, MergeMode::Synchronize, true)
        .expect_err("non-empty Binaries must reject metadata merge");
    assert!(matches!(err, MergeError::UnsupportedMetaContent));
}
