use rustc_hash::{FxHashMap, FxHashSet};

use crate::row::HEADER_ID;
use crate::storage::{KeyValueStorage, load_id_list, save_id_list};
use crate::tree::RowTree;

/// Ordered list of collapsed row ids.
///
/// [`HEADER_ID`] in the list means "all collapsed". Collapse-all stores every parent id
/// explicitly so that expand-all can reopen each level.
#[derive(Clone, Debug, Default)]
pub struct CollapseStore {
    // Insertion order. Removed ids leave a hole until the next compaction.
    slots: Vec<Option<String>>,
    // Id to its position in `slots`.
    lookup: FxHashMap<String, usize>,
    seen: FxHashSet<String>,
    storage_key: Option<String>,
    loaded: bool,
}

impl CollapseStore {
    pub fn new(storage_key: Option<String>) -> Self {
        Self {
            storage_key,
            ..Self::default()
        }
    }

    pub fn storage_key(&self) -> Option<&str> {
        self.storage_key.as_deref()
    }

    /// Brings the store in line with a new row snapshot.
    ///
    /// On the first non-empty sync persisted state wins over `init_collapsed`; without
    /// persisted state the flags seed the list and the seed is written back. Rows seen for
    /// the first time later on fall back to their own `init_collapsed`. Returns `true` if
    /// the list changed.
    pub fn sync<D>(&mut self, tree: &RowTree<D>, storage: Option<&dyn KeyValueStorage>) -> bool {
        if !self.loaded {
            if tree.is_empty() {
                // A placeholder snapshot must not consume the stored state.
                return false;
            }
            self.loaded = true;
            self.seen = tree.rows().iter().map(|row| row.id().to_owned()).collect();
            if let Some(stored) = self.load(storage) {
                self.replace(stored);
                return true;
            }
            let seed: Vec<String> = tree
                .rows()
                .iter()
                .filter(|row| row.init_collapsed)
                .map(|row| row.id().to_owned())
                .collect();
            self.replace(seed);
            self.persist(storage);
            return true;
        }

        let mut changed = false;
        for row in tree.rows() {
            if self.seen.insert(row.id().to_owned()) && row.init_collapsed {
                changed |= self.insert(row.id());
            }
        }
        if changed {
            self.persist(storage);
        }
        changed
    }

    fn load(&self, storage: Option<&dyn KeyValueStorage>) -> Option<Vec<String>> {
        let (storage, key) = storage.zip(self.storage_key.as_deref())?;
        load_id_list(storage, key)
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.lookup.contains_key(id)
    }

    /// `true` while in the collapse-all state.
    pub fn is_all_collapsed(&self) -> bool {
        self.lookup.contains_key(HEADER_ID)
    }

    /// Collapsed ids in the order they were added.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().flatten().map(String::as_str)
    }

    /// Toggles one row, or every parent row for [`HEADER_ID`].
    ///
    /// Unknown ids are ignored. Returns `true` if the list changed.
    pub fn toggle<D>(
        &mut self,
        tree: &RowTree<D>,
        id: &str,
        storage: Option<&dyn KeyValueStorage>,
    ) -> bool {
        if id == HEADER_ID {
            if self.is_all_collapsed() {
                self.replace(Vec::new());
            } else {
                let all = std::iter::once(HEADER_ID.to_owned())
                    .chain(tree.parent_indices().map(|idx| tree.row(idx).id().to_owned()))
                    .collect();
                self.replace(all);
            }
        } else if !tree.contains(id) {
            log::debug!("collapse toggle for unknown row `{id}` ignored");
            return false;
        } else if !self.remove(id) {
            self.insert(id);
        }
        self.persist(storage);
        true
    }

    /// Replaces the whole list and persists it.
    pub fn set(&mut self, ids: Vec<String>, storage: Option<&dyn KeyValueStorage>) {
        self.replace(ids);
        self.persist(storage);
    }

    fn replace(&mut self, ids: Vec<String>) {
        self.lookup.clear();
        self.slots.clear();
        for id in ids {
            if !self.lookup.contains_key(&id) {
                self.lookup.insert(id.clone(), self.slots.len());
                self.slots.push(Some(id));
            }
        }
    }

    fn insert(&mut self, id: &str) -> bool {
        if self.lookup.contains_key(id) {
            return false;
        }
        self.lookup.insert(id.to_owned(), self.slots.len());
        self.slots.push(Some(id.to_owned()));
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.lookup.remove(id) else {
            return false;
        };
        self.slots[slot] = None;
        // Compact once holes outnumber live ids.
        if self.lookup.len() * 2 < self.slots.len() {
            self.compact();
        }
        true
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (slot, id) in self.slots.iter().enumerate() {
            if let Some(id) = id
                && let Some(position) = self.lookup.get_mut(id)
            {
                *position = slot;
            }
        }
    }

    fn persist(&self, storage: Option<&dyn KeyValueStorage>) {
        if let Some((storage, key)) = storage.zip(self.storage_key.as_deref()) {
            save_id_list(storage, key, self.ids());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Row;
    use crate::storage::MemoryStorage;

    fn tree() -> RowTree<()> {
        RowTree::build(vec![
            Row::new("a", "group", ())
                .init_collapsed(true)
                .child(Row::new("a1", "group", ()).child(Row::new("a1x", "item", ()))),
            Row::new("b", "group", ()).child(Row::new("b1", "item", ())),
            Row::new("c", "item", ()),
        ])
        .unwrap()
    }

    #[test]
    fn toggles_single_rows_and_ignores_unknown_ids() {
        let tree = tree();
        let mut store = CollapseStore::new(None);
        store.sync(&tree, None);
        assert!(store.is_collapsed("a"));

        assert!(store.toggle(&tree, "a", None));
        assert!(!store.is_collapsed("a"));
        assert!(!store.toggle(&tree, "missing", None));
        assert_eq!(store.ids().count(), 0);
    }

    #[test]
    fn collapse_all_lists_every_parent_and_expand_all_clears() {
        let tree = tree();
        let mut store = CollapseStore::new(None);
        store.sync(&tree, None);

        store.toggle(&tree, HEADER_ID, None);
        assert_eq!(store.ids().collect::<Vec<_>>(), ["header", "a", "a1", "b"]);
        assert!(store.is_all_collapsed());

        store.toggle(&tree, HEADER_ID, None);
        assert_eq!(store.ids().count(), 0);
        assert!(!store.is_collapsed("a1"));
    }

    #[test]
    fn stored_state_wins_over_initial_flags() {
        let storage = MemoryStorage::new();
        storage.set("tree", r#"["b"]"#);
        let mut store = CollapseStore::new(Some("tree".into()));
        store.sync(&tree(), Some(&storage));

        assert!(!store.is_collapsed("a"));
        assert!(store.is_collapsed("b"));
    }

    #[test]
    fn seed_is_persisted_when_nothing_is_stored() {
        let storage = MemoryStorage::new();
        storage.set("tree", "garbage");
        let mut store = CollapseStore::new(Some("tree".into()));
        store.sync(&tree(), Some(&storage));

        assert_eq!(storage.get("tree").as_deref(), Some(r#"["a"]"#));
    }

    #[test]
    fn new_rows_fall_back_to_their_initial_flag() {
        let storage = MemoryStorage::new();
        storage.set("tree", "[]");
        let mut store = CollapseStore::new(Some("tree".into()));
        store.sync(&tree(), Some(&storage));
        assert!(!store.is_collapsed("a"));

        let page_two = RowTree::build(vec![
            Row::new("a", "group", ()).init_collapsed(true),
            Row::new("d", "group", ()).init_collapsed(true).child(Row::new("d1", "item", ())),
        ])
        .unwrap();
        assert!(store.sync(&page_two, Some(&storage)));
        assert!(!store.is_collapsed("a"));
        assert!(store.is_collapsed("d"));
        assert_eq!(storage.get("tree").as_deref(), Some(r#"["d"]"#));
    }

    #[test]
    fn expanding_keeps_the_order_of_the_rest() {
        let tree = tree();
        let mut store = CollapseStore::new(None);
        store.sync(&tree, None);
        store.toggle(&tree, "a1", None);
        store.toggle(&tree, "b", None);
        store.toggle(&tree, "c", None);

        store.toggle(&tree, "a", None);
        store.toggle(&tree, "a1", None);
        assert_eq!(store.ids().collect::<Vec<_>>(), ["b", "c"]);

        store.toggle(&tree, "a", None);
        // Three holes against two live ids: compacts.
        store.toggle(&tree, "b", None);
        assert_eq!(store.ids().collect::<Vec<_>>(), ["c", "a"]);
        assert!(store.is_collapsed("a") && !store.is_collapsed("b"));
    }

    #[test]
    fn empty_snapshot_does_not_consume_stored_state() {
        let storage = MemoryStorage::new();
        storage.set("tree", "[]");
        let mut store = CollapseStore::new(Some("tree".into()));

        let loading = RowTree::<()>::build(Vec::new()).unwrap();
        assert!(!store.sync(&loading, Some(&storage)));
        store.sync(&tree(), Some(&storage));

        assert!(!store.is_collapsed("a"));
        assert_eq!(storage.get("tree").as_deref(), Some("[]"));
    }
}
