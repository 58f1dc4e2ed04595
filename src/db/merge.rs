use std::collections::{HashSet, VecDeque};

use chrono::NaiveDateTime;
use log::{debug, trace, warn};
use uuid::Uuid;

use crate::db::{
    group::NodeLocation, DeletedObject, Database, Entry, Group, History, Node, Times,
};
pub(crate) use crate::error::MergeError;

/// Which merge strategy `Database::merge` should apply.
///
/// Matches the three modes spec'd for the merge engine: `OverwriteIfNewer` only ever
/// replaces an entry wholesale when the incoming copy is strictly newer, `Synchronize`
/// additionally tracks moves and tombstones and stitches history bidirectionally, and
/// `Synchronize3Way` attempts field-level reconciliation using a common ancestor found
/// in the two sides' histories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    OverwriteIfNewer,
    Synchronize,
    Synchronize3Way,
}

impl Default for MergeMode {
    fn default() -> Self {
        MergeMode::Synchronize
    }
}

/// The kind of change a single `MergeEvent` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEventType {
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    GroupLocationUpdated,
    EntryCreated,
    EntryUpdated,
    EntryDeleted,
    EntryLocationUpdated,
    HistoryEntryAdded,
    MetaUpdated,
}

/// A single recorded change produced by a merge, for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeEvent {
    pub event_type: MergeEventType,
    pub node_uuid: Uuid,
}

/// The full record of what a merge did: every touched node plus any warnings about
/// degraded behavior (missing timestamps, ambiguous ancestors) encountered along the
/// way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeLog {
    pub events: Vec<MergeEvent>,
    pub warnings: Vec<String>,
}

impl MergeLog {
    pub fn append(&mut self, other: &MergeLog) {
        self.events.extend(other.events.iter().copied());
        self.warnings.extend(other.warnings.iter().cloned());
    }

    pub fn merge_with(mut self, other: &MergeLog) -> MergeLog {
        self.append(other);
        self
    }
}

impl Database {
    /// Merge this database with another version of this same database.
    /// This function will use the UUIDs to detect that entries and groups are
    /// the same.
    ///
    /// `metadata` controls whether the database-wide [`crate::db::Meta`] fields
    /// (name, description, default username, entry templates group) are merged
    /// alongside the tree. Binaries/CustomData on the incoming Meta must be empty
    /// for this to succeed; merging those is unsupported.
    pub fn merge(&mut self, other: &Database, mode: MergeMode, metadata: bool) -> Result<MergeLog, MergeError> {
        let mut log = MergeLog::default();

        if metadata {
            log.append(&self.merge_meta(other)?);
        }

        log.append(&self.merge_group(vec![], &other.root, false, mode)?);

        if mode != MergeMode::OverwriteIfNewer {
            log.append(&self.merge_deletions(other)?);
        }

        Ok(log)
    }

    /// Field-level last-write-wins merge of the database-wide Meta fields.
    fn merge_meta(&mut self, other: &Database) -> Result<MergeLog, MergeError> {
        let mut log = MergeLog::default();

        if !other.meta.binaries.is_empty() || !other.meta.custom_data.items.is_empty() {
            return Err(MergeError::UnsupportedMetaContent);
        }

        macro_rules! merge_ts_field {
            ($field:ident, $changed:ident) => {
                let src_changed = other.meta.$changed.unwrap_or_else(Times::epoch);
                let dest_changed = self.meta.$changed.unwrap_or_else(Times::epoch);
                if dest_changed < src_changed {
                    self.meta.$field = other.meta.$field.clone();
                    self.meta.$changed = other.meta.$changed;
                    log.events.push(MergeEvent {
                        event_type: MergeEventType::MetaUpdated,
                        node_uuid: self.root.uuid,
                    });
                }
            };
        }

        merge_ts_field!(database_name, database_name_changed);
        merge_ts_field!(database_description, database_description_changed);
        merge_ts_field!(default_username, default_username_changed);
        merge_ts_field!(entry_templates_group, entry_templates_group_changed);

        Ok(log)
    }

    fn merge_deletions(&mut self, other: &Database) -> Result<MergeLog, MergeError> {
        let is_in_deleted_queue = |uuid: Uuid, deleted_groups_queue: &VecDeque<DeletedObject>| -> bool {
            deleted_groups_queue.iter().any(|d| d.uuid == uuid)
        };

        let mut log = MergeLog::default();
        let mut new_deleted_objects = self.deleted_objects.clone();

        // Tombstone merge: keep the max deletion time for anything already tracked.
        for deleted_object in &other.deleted_objects.objects {
            if let Some(existing) = new_deleted_objects
                .objects
                .iter_mut()
                .find(|d| d.uuid == deleted_object.uuid)
            {
                if deleted_object.deletion_time > existing.deletion_time {
                    existing.deletion_time = deleted_object.deletion_time;
                }
                continue;
            }
            new_deleted_objects.objects.push(deleted_object.clone());
        }

        // Entries are removed first; groups are only removed once they are empty.
        for deleted_object in &other.deleted_objects.objects {
            let entry_location = match self.find_node_location(deleted_object.uuid) {
                Some(l) => l,
                None => continue,
            };

            let parent_group = match self.root.find_group_mut(&entry_location) {
                Some(g) => g,
                None => return Err(MergeError::FindGroupError(entry_location)),
            };

            let entry = match parent_group.find_entry(&[deleted_object.uuid]) {
                Some(e) => e,
                // This uuid might refer to a group, which will be handled later.
                None => continue,
            };

            let entry_last_modification = match entry.times.get_last_modification() {
                Some(t) => *t,
                None => {
                    log.warnings.push(format!(
                        "Entry {} did not have a last modification timestamp",
                        entry.uuid
                    ));
                    Times::now()
                }
            };

            if entry_last_modification < deleted_object.deletion_time {
                trace!("deleting entry {} (tombstoned at {})", deleted_object.uuid, deleted_object.deletion_time);
                parent_group.remove_node(&deleted_object.uuid)?;
                log.events.push(MergeEvent {
                    event_type: MergeEventType::EntryDeleted,
                    node_uuid: deleted_object.uuid,
                });
            } else {
                debug!(
                    "entry {} was modified after its tombstone; resurrecting instead of deleting",
                    deleted_object.uuid
                );
            }
        }

        let mut deleted_groups_queue: VecDeque<DeletedObject> =
            other.deleted_objects.objects.iter().cloned().collect();

        let mut seen_this_pass: HashSet<Uuid> = HashSet::new();
        while let Some(deleted_object) = deleted_groups_queue.pop_front() {
            let group_location = match self.find_node_location(deleted_object.uuid) {
                Some(l) => l,
                None => continue,
            };

            let parent_group = match self.root.find_group_mut(&group_location) {
                Some(g) => g,
                None => return Err(MergeError::FindGroupError(group_location)),
            };

            let group = match parent_group.find_group(&[deleted_object.uuid]) {
                Some(e) => e,
                None => {
                    // The node might be an entry, already handled above.
                    continue;
                }
            };

            if !group.entries().is_empty() {
                continue;
            }

            if !group
                .groups()
                .iter()
                .all(|g| is_in_deleted_queue(g.uuid, &deleted_groups_queue))
            {
                // This group still has a child group that might get deleted later; delay.
                if seen_this_pass.insert(deleted_object.uuid) {
                    deleted_groups_queue.push_back(deleted_object.clone());
                }
                continue;
            }

            if !group.groups().is_empty() {
                continue;
            }

            let group_last_modification = match group.times.get_last_modification() {
                Some(t) => *t,
                None => {
                    log.warnings.push(format!(
                        "Group {} did not have a last modification timestamp",
                        group.uuid
                    ));
                    Times::now()
                }
            };

            if group_last_modification < deleted_object.deletion_time {
                parent_group.remove_node(&deleted_object.uuid)?;
                log.events.push(MergeEvent {
                    event_type: MergeEventType::GroupDeleted,
                    node_uuid: deleted_object.uuid,
                });
            }
        }

        self.deleted_objects = new_deleted_objects;
        Ok(log)
    }

    pub(crate) fn find_node_location(&self, id: Uuid) -> Option<NodeLocation> {
        if self.root.uuid == id {
            // The root has no parent path; callers special-case merging root itself.
            return None;
        }
        self.root.find_node_location(id)
    }

    fn merge_group(
        &mut self,
        current_group_path: NodeLocation,
        current_group: &Group,
        is_in_deleted_group: bool,
        mode: MergeMode,
    ) -> Result<MergeLog, MergeError> {
        let mut log = MergeLog::default();

        if current_group.uuid != self.root.uuid {
            if let Some(mut destination_group_path) = self.find_node_location(current_group.uuid) {
                destination_group_path.push(current_group.uuid);
                let destination_group = match self.root.find_group_mut(&destination_group_path) {
                    Some(g) => g,
                    None => return Err(MergeError::FindGroupError(destination_group_path)),
                };
                log.append(&destination_group.merge_with(current_group)?);
            }
        }

        for other_entry in &current_group.entries() {
            let destination_entry_location = self.find_node_location(other_entry.uuid);

            if let Some(destination_entry_location) = destination_entry_location {
                let mut existing_entry_location = destination_entry_location.clone();
                existing_entry_location.push(other_entry.uuid);

                let mut existing_entry = self
                    .root
                    .find_entry(&existing_entry_location)
                    .ok_or_else(|| MergeError::FindEntryError(existing_entry_location.clone()))?
                    .clone();

                if mode != MergeMode::OverwriteIfNewer
                    && current_group_path.last() != destination_entry_location.last()
                    && !is_in_deleted_group
                {
                    let source_location_changed_time = other_entry.times.get_location_changed().copied().unwrap_or_else(Times::epoch);
                    let destination_location_changed = existing_entry.times.get_location_changed().copied().unwrap_or_else(Times::now);

                    if source_location_changed_time > destination_location_changed {
                        log.events.push(MergeEvent {
                            event_type: MergeEventType::EntryLocationUpdated,
                            node_uuid: other_entry.uuid,
                        });
                        self.relocate_node(
                            &other_entry.uuid,
                            &destination_entry_location,
                            &current_group_path,
                            source_location_changed_time,
                        )?;
                        existing_entry_location = current_group_path.clone();
                        existing_entry_location.push(other_entry.uuid);
                        existing_entry.times.set_location_changed(source_location_changed_time);
                    }
                }

                if !existing_entry.has_diverged_from(other_entry) {
                    continue;
                }

                let (merged_entry, entry_merge_log) = existing_entry.merge(other_entry, mode)?;
                let merged_entry = match merged_entry {
                    Some(m) => m,
                    None => continue,
                };

                if existing_entry.eq(&merged_entry) {
                    continue;
                }

                let existing_entry = match self.root.find_entry_mut(&existing_entry_location) {
                    Some(e) => e,
                    None => return Err(MergeError::FindEntryError(existing_entry_location)),
                };
                *existing_entry = merged_entry.clone();

                log.events.push(MergeEvent {
                    event_type: MergeEventType::EntryUpdated,
                    node_uuid: merged_entry.uuid,
                });
                log.append(&entry_merge_log);
                continue;
            }

            if mode != MergeMode::OverwriteIfNewer && self.deleted_objects.contains(other_entry.uuid) {
                continue;
            }

            if is_in_deleted_group {
                continue;
            }

            let new_entry = other_entry.to_owned().clone();
            debug!("creating entry {} under {:?}", new_entry.uuid, current_group_path);

            let new_entry_parent_group = match self.root.find_group_mut(&current_group_path) {
                Some(g) => g,
                None => return Err(MergeError::FindGroupError(current_group_path.clone())),
            };
            new_entry_parent_group.add_child(new_entry.clone());

            log.events.push(MergeEvent {
                event_type: MergeEventType::EntryCreated,
                node_uuid: new_entry.uuid,
            });
        }

        for other_group in &current_group.groups() {
            let mut new_group_location = current_group_path.clone();
            let other_group_uuid = other_group.uuid;
            new_group_location.push(other_group_uuid);

            if (mode != MergeMode::OverwriteIfNewer && self.deleted_objects.contains(other_group.uuid))
                || is_in_deleted_group
            {
                let new_merge_log = self.merge_group(new_group_location, other_group, true, mode)?;
                log.append(&new_merge_log);
                continue;
            }

            let destination_group_location = self.find_node_location(other_group.uuid);

            if let Some(destination_group_location) = destination_group_location {
                if mode != MergeMode::OverwriteIfNewer && current_group_path != destination_group_location {
                    let mut existing_group_location = destination_group_location.clone();
                    existing_group_location.push(other_group_uuid);

                    let existing_group = self
                        .root
                        .find_group(&existing_group_location)
                        .ok_or_else(|| MergeError::FindGroupError(existing_group_location.clone()))?;
                    let existing_group_location_changed =
                        existing_group.times.get_location_changed().copied().unwrap_or_else(Times::now);
                    let other_group_location_changed =
                        other_group.times.get_location_changed().copied().unwrap_or_else(Times::epoch);

                    if existing_group_location_changed < other_group_location_changed {
                        self.relocate_node(
                            &other_group.uuid,
                            &destination_group_location,
                            &current_group_path,
                            other_group_location_changed,
                        )?;

                        log.events.push(MergeEvent {
                            event_type: MergeEventType::GroupLocationUpdated,
                            node_uuid: other_group.uuid,
                        });

                        let new_merge_log = self.merge_group(new_group_location, other_group, is_in_deleted_group, mode)?;
                        log.append(&new_merge_log);
                        continue;
                    }
                }

                let new_merge_log = self.merge_group(new_group_location, other_group, is_in_deleted_group, mode)?;
                log.append(&new_merge_log);
                continue;
            }

            let mut new_group = other_group.to_owned().clone();
            new_group.children = vec![];
            log.events.push(MergeEvent {
                event_type: MergeEventType::GroupCreated,
                node_uuid: new_group.uuid,
            });
            let new_group_parent_group = match self.root.find_group_mut(&current_group_path) {
                Some(g) => g,
                None => return Err(MergeError::FindGroupError(current_group_path.clone())),
            };
            new_group_parent_group.add_child(new_group.clone());

            let new_merge_log = self.merge_group(new_group_location, other_group, is_in_deleted_group, mode)?;
            log.append(&new_merge_log);
        }

        Ok(log)
    }

    fn relocate_node(
        &mut self,
        node_uuid: &Uuid,
        from: &NodeLocation,
        to: &NodeLocation,
        new_location_changed_timestamp: NaiveDateTime,
    ) -> Result<(), MergeError> {
        let source_group = match self.root.find_group_mut(from) {
            Some(g) => g,
            None => return Err(MergeError::FindGroupError(from.to_vec())),
        };

        let mut relocated_node = source_group.remove_node(node_uuid)?;
        match relocated_node {
            Node::Group(ref mut g) => g.times.set_location_changed(new_location_changed_timestamp),
            Node::Entry(ref mut e) => e.times.set_location_changed(new_location_changed_timestamp),
        };

        let destination_group = match self.root.find_group_mut(to) {
            Some(g) => g,
            None => return Err(MergeError::FindGroupError(to.to_vec())),
        };
        destination_group.children.push(relocated_node);
        Ok(())
    }
}

impl Entry {
    pub(crate) fn merge(&self, other: &Entry, mode: MergeMode) -> Result<(Option<Entry>, MergeLog), MergeError> {
        match mode {
            MergeMode::OverwriteIfNewer => Ok(self.merge_overwrite_if_newer(other)),
            MergeMode::Synchronize => self.merge_synchronize(other),
            MergeMode::Synchronize3Way => self.merge_3way(other),
        }
    }

    fn merge_overwrite_if_newer(&self, other: &Entry) -> (Option<Entry>, MergeLog) {
        let mut log = MergeLog::default();
        let dest_time = self.times.get_last_modification().copied().unwrap_or_else(Times::epoch);
        let src_time = other.times.get_last_modification().copied().unwrap_or_else(Times::epoch);

        if src_time > dest_time {
            log.events.push(MergeEvent {
                event_type: MergeEventType::EntryUpdated,
                node_uuid: other.uuid,
            });
            (Some(other.clone()), log)
        } else {
            (None, log)
        }
    }

    fn merge_synchronize(&self, other: &Entry) -> Result<(Option<Entry>, MergeLog), MergeError> {
        let mut log = MergeLog::default();

        let source_last_modification = match other.times.get_last_modification() {
            Some(t) => *t,
            None => {
                log.warnings.push(format!(
                    "Entry {} did not have a last modification timestamp",
                    other.uuid
                ));
                Times::epoch()
            }
        };
        let destination_last_modification = match self.times.get_last_modification() {
            Some(t) => *t,
            None => {
                log.warnings.push(format!(
                    "Entry {} did not have a last modification timestamp",
                    self.uuid
                ));
                Times::now()
            }
        };

        if destination_last_modification == source_last_modification {
            if !self.has_diverged_from(other) {
                // This should never happen: an entry was updated without updating its
                // last modification timestamp.
                return Err(MergeError::EntryModificationTimeNotUpdated(other.uuid.to_string()));
            }
            return Ok((None, log));
        }

        let (mut merged_entry, entry_merge_log) = match destination_last_modification > source_last_modification {
            true => self.merge_history(other)?,
            false => other.clone().merge_history(self)?,
        };

        // The location changed timestamp is handled separately when merging two databases.
        if let Some(location_changed_timestamp) = self.times.get_location_changed() {
            merged_entry.times.set_location_changed(*location_changed_timestamp);
        }

        Ok((Some(merged_entry), entry_merge_log))
    }

    pub(crate) fn merge_history(&self, other: &Entry) -> Result<(Entry, MergeLog), MergeError> {
        let mut log = MergeLog::default();

        let mut source_history = match &other.history {
            Some(h) => h.clone(),
            None => {
                log.warnings.push(format!("Entry {} from source database had no history.", self.uuid));
                History::default()
            }
        };
        let mut destination_history = match &self.history {
            Some(h) => h.clone(),
            None => {
                log.warnings.push(format!("Entry {} from destination database had no history.", self.uuid));
                History::default()
            }
        };
        let mut response = self.clone();

        if other.has_uncommitted_changes() {
            log.warnings.push(format!("Entry {} from source database has uncommitted changes.", self.uuid));
            source_history.add_entry(other.clone());
        }

        let history_merge_log = destination_history.merge_with(&source_history)?;
        response.history = Some(destination_history);

        Ok((response, log.merge_with(&history_merge_log)))
    }

    /// `SYNCHRONIZE_3WAY`: per-field reconciliation against the common ancestor found
    /// by intersecting the two sides' histories.
    fn merge_3way(&self, other: &Entry) -> Result<(Option<Entry>, MergeLog), MergeError> {
        let mut log = MergeLog::default();

        let ancestor = match find_common_ancestor(self, other) {
            Some(a) => a,
            None => {
                log.warnings.push(format!(
                    "Entry {}: no common ancestor found between the two histories (AmbiguousAncestor); falling back to 2-way merge",
                    self.uuid
                ));
                let (merged, sync_log) = self.merge_synchronize(other)?;
                return Ok((merged, log.merge_with(&sync_log)));
            }
        };

        let dest_time = self.times.get_last_modification().copied().unwrap_or_else(Times::epoch);
        let src_time = other.times.get_last_modification().copied().unwrap_or_else(Times::epoch);
        let anc_time = ancestor.times.get_last_modification().copied().unwrap_or_else(Times::epoch);

        let dest_has_diverged = anc_time < dest_time;
        let src_has_diverged = anc_time < src_time;

        match (dest_has_diverged, src_has_diverged) {
            (true, true) => {
                trace!("entry {}: real three-way merge against common ancestor", self.uuid);
                let mut merged = self.clone();
                let mut changed = false;

                let mut keys: HashSet<&String> = self.fields.keys().collect();
                keys.extend(other.fields.keys());
                keys.extend(ancestor.fields.keys());

                for key in keys {
                    let dest_value = self.fields.get(key);
                    let src_value = other.fields.get(key);
                    let anc_value = ancestor.fields.get(key);

                    if src_value == anc_value {
                        // Unchanged on the source side: keep destination.
                        continue;
                    }
                    if dest_value == anc_value {
                        // Unchanged on the destination side: take source.
                        apply_field(&mut merged, key, src_value);
                        changed = true;
                        continue;
                    }
                    if dest_value != src_value {
                        // Both sides touched this field: the newer entry wins.
                        if src_time > dest_time {
                            apply_field(&mut merged, key, src_value);
                            changed = true;
                        }
                    }
                }

                if !changed {
                    return Ok((None, log));
                }

                let mut dest_pre_image = self.clone();
                dest_pre_image.history = None;
                let mut src_pre_image = other.clone();
                src_pre_image.history = None;

                let mut history = merged.history.clone().unwrap_or_default();
                history.add_entry(dest_pre_image);
                history.add_entry(src_pre_image);
                merged.history = Some(history);

                merged.times.set_last_modification(Times::now());
                merged.times.set_last_access(Times::now());
                merged.times.usage_count += 1;

                log.events.push(MergeEvent {
                    event_type: MergeEventType::EntryUpdated,
                    node_uuid: merged.uuid,
                });

                Ok((Some(merged), log))
            }
            (true, false) => {
                // Source is an ancestor of destination: destination already has everything.
                Ok((None, log))
            }
            (false, true) => {
                // Destination is an ancestor of source: fast-forward, no timestamp bump.
                let mut merged = other.clone();
                merged.history = self.history.clone();
                log.events.push(MergeEvent {
                    event_type: MergeEventType::EntryUpdated,
                    node_uuid: merged.uuid,
                });
                Ok((Some(merged), log))
            }
            (false, false) => {
                // Neither side changed: propagate only the newer access bookkeeping.
                let dest_access = self.times.get_last_access().copied().unwrap_or_else(Times::epoch);
                let src_access = other.times.get_last_access().copied().unwrap_or_else(Times::epoch);
                if src_access > dest_access {
                    let mut merged = self.clone();
                    merged.times.set_last_access(src_access);
                    merged.times.usage_count = merged.times.usage_count.max(other.times.usage_count);
                    Ok((Some(merged), log))
                } else {
                    Ok((None, log))
                }
            }
        }
    }

    #[cfg(test)]
    // Convenience function used in unit tests, to make sure that:
    // 1. The history gets updated after changing a field
    // 2. We wait a second before commiting the changes so that the timestamp is not the same
    //    as it previously was. This is necessary since the timestamps in the KDBX format
    //    do not preserve the msecs.
    pub(crate) fn set_field_and_commit(&mut self, field_name: &str, field_value: &str) {
        self.fields.insert(
            field_name.to_string(),
            crate::db::Value::Unprotected(field_value.to_string()),
        );
        std::thread::sleep(std::time::Duration::from_secs(1));
        self.update_history();
    }

    // Convenience function used when merging two entries
    pub(crate) fn has_diverged_from(&self, other_entry: &Entry) -> bool {
        let new_times = Times::default();

        let mut self_without_times = self.clone();
        self_without_times.times = new_times.clone();

        let mut other_without_times = other_entry.clone();
        other_without_times.times = new_times;

        !self_without_times.eq(&other_without_times)
    }
}

fn apply_field(entry: &mut Entry, key: &str, value: Option<&crate::db::Value>) {
    match value {
        Some(v) => {
            entry.fields.insert(key.to_string(), v.clone());
        }
        None => {
            entry.fields.remove(key);
        }
    }
}

/// Builds the ascending-by-time chain of an entry's own history plus its live state,
/// used to find the deepest state two entries' histories have in common.
fn ascending_chain(entry: &Entry) -> Vec<Entry> {
    let mut chain: Vec<Entry> = entry.history.as_ref().map(|h| h.entries.clone()).unwrap_or_default();
    chain.sort_by_key(|e| e.times.get_last_modification().copied().unwrap_or_else(Times::epoch));

    let mut live = entry.clone();
    live.history = None;
    chain.push(live);
    chain
}

fn entries_content_eq(a: &Entry, b: &Entry) -> bool {
    let mut a = a.clone();
    a.history = None;
    let mut b = b.clone();
    b.history = None;
    a == b
}

fn find_common_ancestor(destination: &Entry, source: &Entry) -> Option<Entry> {
    let dest_chain = ascending_chain(destination);
    let src_chain = ascending_chain(source);

    let mut ancestor: Option<Entry> = None;
    let (mut di, mut si) = (0, 0);

    while di < dest_chain.len() && si < src_chain.len() {
        let d = &dest_chain[di];
        let s = &src_chain[si];
        let d_time = d.times.get_last_modification().copied();
        let s_time = s.times.get_last_modification().copied();

        if d_time.is_some() && d_time == s_time && entries_content_eq(d, s) {
            ancestor = Some(d.clone());
            di += 1;
            si += 1;
        } else {
            break;
        }
    }

    if ancestor.is_none() {
        warn!(
            "entries {} have no matching earliest history item; ancestor is ambiguous",
            destination.uuid
        );
    }

    ancestor
}
