//! Observable ordered sequence.
//!
//! `ListModel<T>` owns a vector of items and announces every structural
//! change with exactly one [`ItemsReplaced`] event, describing the change as
//! "at `index`, `removed` went out and `inserted` items came in". Views such
//! as [`ListControl`](crate::widget::widgets::ListControl) patch their state
//! from that single delta instead of re-diffing the sequence.

use std::cmp::Ordering;

use panelkit_core::Signal;
use panelkit_core::logging::targets;
use parking_lot::RwLock;

/// Payload of [`ListModel::items_replaced`].
#[derive(Debug, Clone, PartialEq)]
pub struct ItemsReplaced<T> {
    /// Position of the change.
    pub index: usize,
    /// Items that were removed, in order.
    pub removed: Vec<T>,
    /// Number of items inserted at `index`.
    pub inserted: usize,
    /// Ask views to keep the selection at the same index when the selected
    /// item was replaced.
    pub keep_selected_index: bool,
}

impl<T> ItemsReplaced<T> {
    /// End (exclusive) of the replaced range in the old sequence.
    #[inline]
    pub fn removed_end(&self) -> usize {
        self.index + self.removed.len()
    }
}

/// An observable list of items.
///
/// Mutations take `&self`; the model is meant to be shared behind an `Arc`
/// between the code that edits it and the views that display it. Events are
/// emitted after the write lock is released, so listeners may read the model.
///
/// # Example
///
/// ```
/// use panelkit::model::ListModel;
///
/// let model = ListModel::new(vec!["a", "b"]);
/// model.items_replaced.connect(|event| {
///     println!("{} removed, {} inserted at {}", event.removed.len(), event.inserted, event.index);
/// });
/// model.insert(1, "x");
/// assert_eq!(model.to_vec(), vec!["a", "x", "b"]);
/// ```
pub struct ListModel<T> {
    items: RwLock<Vec<T>>,
    /// Emitted once per structural change.
    pub items_replaced: Signal<ItemsReplaced<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Default for ListModel<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListModel<T> {
    /// Create a model holding `items`.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            items_replaced: Signal::new(),
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Returns the number of items in the model.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns `true` if the model is empty.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// A copy of the item at `index`.
    pub fn at(&self, index: usize) -> Option<T> {
        self.items.read().get(index).cloned()
    }

    /// Returns a read guard over the items.
    ///
    /// Do not mutate the model while holding it.
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    /// Position of the first item equal to `item`.
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.items.read().iter().position(|i| i == item)
    }

    pub fn find_index<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.read().iter().position(predicate)
    }

    pub fn find<P>(&self, mut predicate: P) -> Option<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.read().iter().find(|item| predicate(item)).cloned()
    }

    /// Whether any item matches.
    pub fn some<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.items.read().iter().any(predicate)
    }

    /// Whether every item matches.
    pub fn every<P>(&self, predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        self.items.read().iter().all(predicate)
    }

    pub fn filter<P>(&self, mut predicate: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.items
            .read()
            .iter()
            .filter(|item| predicate(item))
            .cloned()
            .collect()
    }

    /// Copy of the items in `from..to`, clamped to the model length.
    pub fn slice(&self, from: usize, to: usize) -> Vec<T> {
        let items = self.items.read();
        let to = to.min(items.len());
        let from = from.min(to);
        items[from..to].to_vec()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Inserts an item at the specified index.
    ///
    /// # Panics
    ///
    /// Panics if `index > len()`.
    pub fn insert(&self, index: usize, item: T) {
        self.items.write().insert(index, item);
        self.replaced(index, Vec::new(), 1, false);
    }

    /// Appends an item to the end of the list.
    pub fn push(&self, item: T) {
        let index = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.replaced(index, Vec::new(), 1, false);
    }

    /// Inserts an item before the first element not ordered before it.
    ///
    /// The model is expected to be sorted by `compare`.
    pub fn insert_with_comparator<F>(&self, item: T, mut compare: F) -> usize
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let index = {
            let mut items = self.items.write();
            let index = items.partition_point(|existing| compare(&item, existing) == Ordering::Greater);
            items.insert(index, item);
            index
        };
        self.replaced(index, Vec::new(), 1, false);
        index
    }

    /// Removes and returns the item at the specified index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn remove(&self, index: usize) -> T {
        let removed = self.items.write().remove(index);
        self.replaced(index, vec![removed.clone()], 0, false);
        removed
    }

    /// Replaces the item at `index`, returning the old one.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    pub fn replace(&self, index: usize, item: T) -> T {
        self.replace_item(index, item, false)
    }

    /// Like [`replace`](Self::replace), but asks views to keep the selection
    /// at `index`.
    pub fn replace_keeping_selection(&self, index: usize, item: T) -> T {
        self.replace_item(index, item, true)
    }

    fn replace_item(&self, index: usize, item: T, keep_selected_index: bool) -> T {
        let old = std::mem::replace(&mut self.items.write()[index], item);
        self.replaced(index, vec![old.clone()], 1, keep_selected_index);
        old
    }

    /// Replaces the items in `from..to` with `items`, returning the removed ones.
    ///
    /// # Panics
    ///
    /// Panics if `from > to` or `to > len()`.
    pub fn replace_range(&self, from: usize, to: usize, items: Vec<T>) -> Vec<T> {
        let inserted = items.len();
        let removed: Vec<T> = self.items.write().splice(from..to, items).collect();
        self.replaced(from, removed.clone(), inserted, false);
        removed
    }

    /// Replaces every item, returning the old contents.
    pub fn replace_all(&self, items: Vec<T>) -> Vec<T> {
        let inserted = items.len();
        let old = std::mem::replace(&mut *self.items.write(), items);
        self.replaced(0, old.clone(), inserted, false);
        old
    }

    fn replaced(&self, index: usize, removed: Vec<T>, inserted: usize, keep_selected_index: bool) {
        tracing::trace!(
            target: targets::MODEL,
            index,
            removed = removed.len(),
            inserted,
            "items replaced"
        );
        self.items_replaced.emit(ItemsReplaced {
            index,
            removed,
            inserted,
            keep_selected_index,
        });
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for ListModel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListModel")
            .field("items", &*self.items.read())
            .finish()
    }
}
