use rustc_hash::FxHashSet;

use crate::columns::ColumnSet;
use crate::storage::{KeyValueStorage, load_id_list, save_id_list};

/// Prefix of the storage key for expanded columns.
pub const EXPANDED_COLUMN_KEY_PREFIX: &str = "expandedColumn_";

/// Tracks which columns are shown and which are expanded.
///
/// `init_visible` / `init_expanded` are applied the first time a column id is seen;
/// later syncs with the same id leave the user's choice alone.
#[derive(Clone, Debug, Default)]
pub struct ColumnTracker {
    visible: FxHashSet<String>,
    expanded: FxHashSet<String>,
    seen: FxHashSet<String>,
    visible_key: Option<String>,
    expanded_key: Option<String>,
    // Keys came from the caller and never follow the column set.
    explicit_key: bool,
    loaded: bool,
}

impl ColumnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies initial flags for new column ids and, on first sync, loads persisted sets.
    ///
    /// Without an explicit `base_key` the storage keys follow the column ids, so a
    /// different column set reads and writes its own entries. Returns `true` if either
    /// set or the keys changed.
    pub fn sync<D>(
        &mut self,
        columns: &ColumnSet<D>,
        storage: Option<&dyn KeyValueStorage>,
        base_key: Option<&str>,
    ) -> bool {
        if !self.loaded {
            self.loaded = true;
            self.load(columns, storage, base_key);
            return true;
        }

        let mut changed = self.follow_derived_key(columns, storage);
        for column in columns.iter() {
            if self.seen.insert(column.id.clone()) {
                if column.init_visible {
                    self.visible.insert(column.id.clone());
                }
                if column.init_expanded {
                    self.expanded.insert(column.id.clone());
                }
                changed = true;
            }
        }
        if changed {
            self.persist_visible(storage);
            self.persist_expanded(storage);
        }
        changed
    }

    fn load<D>(
        &mut self,
        columns: &ColumnSet<D>,
        storage: Option<&dyn KeyValueStorage>,
        base_key: Option<&str>,
    ) {
        self.explicit_key = base_key.is_some();
        if storage.is_some() {
            self.set_keys(base_key.map_or_else(|| columns.derived_storage_key(), str::to_owned));
        }

        let stored_visible = Self::stored(storage, self.visible_key.as_deref());
        let stored_expanded = Self::stored(storage, self.expanded_key.as_deref());
        let seed_visible = stored_visible.is_none();
        let seed_expanded = stored_expanded.is_none();

        self.visible = stored_visible.unwrap_or_else(|| {
            columns
                .iter()
                .filter(|column| column.init_visible)
                .map(|column| column.id.clone())
                .collect()
        });
        self.expanded = stored_expanded.unwrap_or_else(|| {
            columns
                .iter()
                .filter(|column| column.init_expanded)
                .map(|column| column.id.clone())
                .collect()
        });
        self.seen = columns.ids().map(str::to_owned).collect();

        if seed_visible {
            self.persist_visible(storage);
        }
        if seed_expanded {
            self.persist_expanded(storage);
        }
    }

    fn set_keys(&mut self, base: String) {
        self.expanded_key = Some(format!("{EXPANDED_COLUMN_KEY_PREFIX}{base}"));
        self.visible_key = Some(base);
    }

    /// Switches to the key derived from `columns` if it moved. Sets stored under the
    /// new key replace the current ones; otherwise the current ones carry over.
    fn follow_derived_key<D>(
        &mut self,
        columns: &ColumnSet<D>,
        storage: Option<&dyn KeyValueStorage>,
    ) -> bool {
        if self.explicit_key || storage.is_none() {
            return false;
        }
        let base = columns.derived_storage_key();
        if self.visible_key.as_deref() == Some(base.as_str()) {
            return false;
        }
        log::debug!("column set changed, column state now stored under `{base}`");
        self.set_keys(base);

        let stored_visible = Self::stored(storage, self.visible_key.as_deref());
        let stored_expanded = Self::stored(storage, self.expanded_key.as_deref());
        if stored_visible.is_some() || stored_expanded.is_some() {
            // Stored choices win over initial flags.
            self.seen.extend(columns.ids().map(str::to_owned));
        }
        if let Some(visible) = stored_visible {
            self.visible = visible;
        }
        if let Some(expanded) = stored_expanded {
            self.expanded = expanded;
        }
        true
    }

    fn stored(
        storage: Option<&dyn KeyValueStorage>,
        key: Option<&str>,
    ) -> Option<FxHashSet<String>> {
        let (storage, key) = storage.zip(key)?;
        load_id_list(storage, key).map(|ids| ids.into_iter().collect())
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.visible.contains(id)
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Visible column ids in declaration order.
    pub fn visible_ids<'a, D>(&self, columns: &'a ColumnSet<D>) -> Vec<&'a str> {
        columns.ids().filter(|id| self.visible.contains(*id)).collect()
    }

    /// Expanded column ids in declaration order.
    pub fn expanded_ids<'a, D>(&self, columns: &'a ColumnSet<D>) -> Vec<&'a str> {
        columns
            .ids()
            .filter(|id| self.expanded.contains(*id))
            .collect()
    }

    pub fn set_visible<I, S>(&mut self, ids: I, storage: Option<&dyn KeyValueStorage>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.visible = ids.into_iter().map(Into::into).collect();
        self.persist_visible(storage);
    }

    pub fn set_column_visible(
        &mut self,
        id: &str,
        visible: bool,
        storage: Option<&dyn KeyValueStorage>,
    ) {
        let changed = if visible {
            self.visible.insert(id.to_owned())
        } else {
            self.visible.remove(id)
        };
        if changed {
            self.persist_visible(storage);
        }
    }

    pub fn set_expanded<I, S>(&mut self, ids: I, storage: Option<&dyn KeyValueStorage>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expanded = ids.into_iter().map(Into::into).collect();
        self.persist_expanded(storage);
    }

    pub fn toggle_expanded(&mut self, id: &str, storage: Option<&dyn KeyValueStorage>) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_owned());
        }
        self.persist_expanded(storage);
    }

    fn persist_visible(&self, storage: Option<&dyn KeyValueStorage>) {
        if let Some((storage, key)) = storage.zip(self.visible_key.as_deref()) {
            save_id_list(storage, key, sorted(&self.visible));
        }
    }

    fn persist_expanded(&self, storage: Option<&dyn KeyValueStorage>) {
        if let Some((storage, key)) = storage.zip(self.expanded_key.as_deref()) {
            save_id_list(storage, key, sorted(&self.expanded));
        }
    }
}

fn sorted(ids: &FxHashSet<String>) -> Vec<&str> {
    let mut ids: Vec<&str> = ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::Column;
    use crate::storage::MemoryStorage;

    fn columns(ids: &[(&str, bool)]) -> ColumnSet<()> {
        ColumnSet::new(
            ids.iter()
                .map(|&(id, visible)| Column::new(id).init_visible(visible))
                .collect(),
        )
    }

    #[test]
    fn initial_flags_apply_only_to_new_ids() {
        let mut tracker = ColumnTracker::new();
        tracker.sync(&columns(&[("a", true), ("b", false)]), None, None);
        assert_eq!(tracker.visible_ids(&columns(&[("a", true), ("b", false)])), vec!["a"]);

        tracker.set_column_visible("a", false, None);
        let next = columns(&[("a", true), ("b", false), ("c", true)]);
        assert!(tracker.sync(&next, None, None));
        assert_eq!(tracker.visible_ids(&next), vec!["c"]);
        assert!(!tracker.sync(&next, None, None));
    }

    #[test]
    fn persists_under_derived_keys() {
        let storage = MemoryStorage::new();
        let set = columns(&[("name", true), ("size", true)]);
        let mut tracker = ColumnTracker::new();
        tracker.sync(&set, Some(&storage), None);
        assert_eq!(storage.get("namesize").as_deref(), Some(r#"["name","size"]"#));
        assert_eq!(storage.get("expandedColumn_namesize").as_deref(), Some("[]"));

        tracker.toggle_expanded("size", Some(&storage));
        tracker.set_visible(["size"], Some(&storage));

        let mut restored = ColumnTracker::new();
        restored.sync(&set, Some(&storage), None);
        assert_eq!(restored.visible_ids(&set), vec!["size"]);
        assert_eq!(restored.expanded_ids(&set), vec!["size"]);
    }

    #[test]
    fn corrupted_state_falls_back_to_initial_flags() {
        let storage = MemoryStorage::new();
        storage.set("cols", "nope");
        let set = columns(&[("name", true), ("size", false)]);
        let mut tracker = ColumnTracker::new();
        tracker.sync(&set, Some(&storage), Some("cols"));
        assert_eq!(tracker.visible_ids(&set), vec!["name"]);
        assert_eq!(storage.get("cols").as_deref(), Some(r#"["name"]"#));
    }

    #[test]
    fn derived_keys_follow_the_column_set() {
        let storage = MemoryStorage::new();
        let two = columns(&[("name", true), ("size", true)]);
        let three = columns(&[("name", true), ("size", true), ("owner", true)]);
        let mut tracker = ColumnTracker::new();
        tracker.sync(&two, Some(&storage), None);
        tracker.set_column_visible("size", false, Some(&storage));

        assert!(tracker.sync(&three, Some(&storage), None));
        assert_eq!(tracker.visible_ids(&three), vec!["name", "owner"]);
        assert_eq!(storage.get("namesizeowner").as_deref(), Some(r#"["name","owner"]"#));
        assert_eq!(storage.get("namesize").as_deref(), Some(r#"["name"]"#));

        tracker.set_column_visible("owner", false, Some(&storage));
        assert!(tracker.sync(&two, Some(&storage), None));
        assert_eq!(tracker.visible_ids(&two), vec!["name"]);
        assert!(tracker.sync(&three, Some(&storage), None));
        assert_eq!(tracker.visible_ids(&three), vec!["name"]);
        assert!(!tracker.sync(&three, Some(&storage), None));
    }

    #[test]
    fn explicit_key_stays_fixed() {
        let storage = MemoryStorage::new();
        let mut tracker = ColumnTracker::new();
        tracker.sync(&columns(&[("a", true)]), Some(&storage), Some("grid"));
        tracker.sync(&columns(&[("a", true), ("b", true)]), Some(&storage), None);

        assert_eq!(storage.get("grid").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(storage.get("ab"), None);
    }
}
