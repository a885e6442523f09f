//! Injectable key-value persistence for collapse and column state.
//!
//! Values are JSON arrays of strings. Anything that fails to load or parse is
//! treated as absent so the table falls back to its initial flags.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// String key-value store used for persisted table state.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value);
    }

    fn remove(&self, key: &str) {
        (**self).remove(key);
    }
}

/// In-memory storage. Clones share the same underlying map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<FxHashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// Stores each key as a `<key>.json` file inside a directory.
#[derive(Clone, Debug)]
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    /// Uses `dir`, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

impl KeyValueStorage for DirStorage {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("failed to read table state `{key}`: {err}");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(err) = fs::write(self.path_for(key), value) {
            log::warn!("failed to write table state `{key}`: {err}");
        }
    }

    fn remove(&self, key: &str) {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("failed to remove table state `{key}`: {err}"),
        }
    }
}

/// Reads a JSON string array, treating missing or malformed data as absent.
pub fn load_id_list(storage: &dyn KeyValueStorage, key: &str) -> Option<Vec<String>> {
    let raw = storage.get(key)?;
    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(ids) => Some(ids),
        Err(err) => {
            log::warn!("ignoring corrupted table state `{key}`: {err}");
            None
        }
    }
}

/// Writes `ids` as a JSON string array.
pub fn save_id_list<'a>(
    storage: &dyn KeyValueStorage,
    key: &str,
    ids: impl IntoIterator<Item = &'a str>,
) {
    let ids: Vec<&str> = ids.into_iter().collect();
    match serde_json::to_string(&ids) {
        Ok(json) => storage.set(key, &json),
        Err(err) => log::warn!("failed to encode table state `{key}`: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_storage_clones_share_entries() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("k", "v");
        assert_eq!(other.get("k").as_deref(), Some("v"));
        other.remove("k");
        assert!(storage.is_empty());
    }

    #[test]
    fn id_lists_round_trip_as_json_arrays() {
        let storage = MemoryStorage::new();
        save_id_list(&storage, "collapsed", ["header", "p1"]);
        assert_eq!(storage.get("collapsed").as_deref(), Some(r#"["header","p1"]"#));
        assert_eq!(
            load_id_list(&storage, "collapsed"),
            Some(vec!["header".to_owned(), "p1".to_owned()])
        );
    }

    #[test]
    fn corrupted_lists_load_as_absent() {
        let storage = MemoryStorage::new();
        storage.set("a", "{not json");
        storage.set("b", r#"[1, 2]"#);
        assert_eq!(load_id_list(&storage, "a"), None);
        assert_eq!(load_id_list(&storage, "b"), None);
        assert_eq!(load_id_list(&storage, "missing"), None);
    }

    #[test]
    fn dir_storage_round_trips_through_files() {
        let dir = std::env::temp_dir().join(format!("tui-treetable-{}", std::process::id()));
        let storage = DirStorage::open(&dir).unwrap();
        storage.set("expandedColumn_a/b", "[]");
        assert_eq!(storage.get("expandedColumn_a/b").as_deref(), Some("[]"));
        storage.remove("expandedColumn_a/b");
        assert_eq!(storage.get("expandedColumn_a/b"), None);
        fs::remove_dir_all(dir).unwrap();
    }
}
