//! Version counters, memoized derived values and change observers.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// What a mutation touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TableChange {
    Rows,
    Filter,
    Sort,
    Selection,
    Collapse,
    Columns,
    Focus,
}

/// Per-store version counters, bumped on every mutation of that store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub(crate) struct Versions {
    pub(crate) rows: u64,
    pub(crate) filter: u64,
    pub(crate) sort: u64,
    pub(crate) selection: u64,
    pub(crate) collapse: u64,
}

impl Versions {
    pub(crate) const fn bump(&mut self, change: TableChange) {
        let counter = match change {
            TableChange::Rows => &mut self.rows,
            TableChange::Filter => &mut self.filter,
            TableChange::Sort => &mut self.sort,
            TableChange::Selection => &mut self.selection,
            TableChange::Collapse => &mut self.collapse,
            TableChange::Columns | TableChange::Focus => return,
        };
        *counter = counter.wrapping_add(1);
    }
}

/// Lazily recomputed value keyed by the versions it was derived from.
///
/// When a recomputation produces content equal to the cached value, the cached `Rc`
/// is kept so callers comparing by pointer see no change.
pub(crate) struct Memo<K, T: ?Sized> {
    cell: RefCell<Option<(K, Rc<T>)>>,
}

impl<K, T: ?Sized> Default for Memo<K, T> {
    fn default() -> Self {
        Self {
            cell: RefCell::new(None),
        }
    }
}

impl<K: PartialEq, T: PartialEq + ?Sized> Memo<K, T> {
    pub(crate) fn get_or_compute(&self, key: K, compute: impl FnOnce() -> Rc<T>) -> Rc<T> {
        if let Some((cached_key, value)) = self.cell.borrow().as_ref()
            && *cached_key == key
        {
            return Rc::clone(value);
        }

        let fresh = compute();
        let mut cell = self.cell.borrow_mut();
        let value = match cell.take() {
            Some((_, previous)) if *previous == *fresh => previous,
            _ => fresh,
        };
        *cell = Some((key, Rc::clone(&value)));
        value
    }
}

impl<K, T: ?Sized> fmt::Debug for Memo<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("cached", &self.cell.borrow().is_some())
            .finish()
    }
}

/// One [`Memo`] per row kind, so alternating kinds does not evict each other.
pub(crate) struct KindMemo<K, T: ?Sized> {
    cells: RefCell<FxHashMap<Option<String>, Rc<Memo<K, T>>>>,
}

impl<K, T: ?Sized> Default for KindMemo<K, T> {
    fn default() -> Self {
        Self {
            cells: RefCell::new(FxHashMap::default()),
        }
    }
}

impl<K: PartialEq, T: PartialEq + ?Sized> KindMemo<K, T> {
    pub(crate) fn get_or_compute(
        &self,
        kind: Option<&str>,
        key: K,
        compute: impl FnOnce() -> Rc<T>,
    ) -> Rc<T> {
        let memo = Rc::clone(
            self.cells
                .borrow_mut()
                .entry(kind.map(str::to_owned))
                .or_default(),
        );
        memo.get_or_compute(key, compute)
    }
}

impl<K, T: ?Sized> fmt::Debug for KindMemo<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindMemo")
            .field("kinds", &self.cells.borrow().len())
            .finish()
    }
}

/// Handle returned by [`Observers::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(TableChange)>;

/// Listeners notified after each completed mutation.
#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, listener: impl FnMut(TableChange) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub(crate) fn notify(&mut self, change: TableChange) {
        for (_, listener) in &mut self.listeners {
            listener(change);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
