//! Virtualized list view over a [`ListModel`].
//!
//! A [`ListControl`] renders the items of a model as children of its own
//! element, asking a [`ListDelegate`] to create one element per item. Created
//! elements are cached for as long as their item stays in the model.
//!
//! # Modes
//!
//! - [`ListMode::NonViewport`]: every item is materialized, and the element
//!   list is patched at the mutation point.
//! - [`ListMode::EqualHeightItems`]: only the items around the viewport are
//!   materialized. All items share one height, measured lazily.
//! - [`ListMode::VariousHeightItems`]: same windowing, with per-item heights
//!   kept as prefix sums.
//!
//! In the viewport modes the control's element holds a top spacer, the
//! materialized range `[first_index, last_index)`, and a bottom spacer. The
//! spacers' heights always satisfy
//! `top_height + height(first..last) + bottom_height == total_height`.
//!
//! The host reports the viewport through the element's size and scroll
//! offset in the [`Document`], and forwards scroll, click and key events to
//! [`ListControl::handle_scroll`], [`ListControl::handle_click`] and
//! [`ListControl::handle_key_down`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use panelkit::dom::{Document, ElementId};
//! use panelkit::geometry::Size;
//! use panelkit::model::ListModel;
//! use panelkit::widget::widgets::{ListControl, ListDelegate, ListMode};
//!
//! struct Rows;
//!
//! impl ListDelegate<u32> for Rows {
//!     fn create_element_for_item(&self, document: &Document, item: &u32) -> ElementId {
//!         let element = document.create_element("div");
//!         document.set_text(element, &item.to_string());
//!         element
//!     }
//!     fn height_for_item(&self, _item: &u32) -> f32 {
//!         20.0
//!     }
//!     fn selected_item_changed(&self, _: Option<&u32>, _: Option<&u32>, _: Option<ElementId>, _: Option<ElementId>) {}
//! }
//!
//! let document = Document::new();
//! let model = Arc::new(ListModel::new((0..1000u32).collect::<Vec<_>>()));
//! let list = ListControl::new(&document, model, Arc::new(Rows), ListMode::EqualHeightItems).unwrap();
//! document.set_size(list.element(), Size::new(100.0, 200.0));
//! list.viewport_resized().unwrap();
//!
//! assert_eq!(list.first_index(), 0);
//! assert_eq!(list.last_index(), 21);
//! ```

use std::sync::{Arc, Weak};

use panelkit_core::ConnectionId;
use panelkit_core::logging::{PerfSpan, targets};
use parking_lot::Mutex;

use crate::dom::{Document, ElementId};
use crate::error::{ListError, ListResult};
use crate::geometry::constrain;
use crate::model::{ItemsReplaced, ListModel};

/// How a [`ListControl`] materializes items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMode {
    /// Every item has an element in the document.
    NonViewport,
    /// Windowed; every item has the same height.
    #[default]
    EqualHeightItems,
    /// Windowed; items report their own heights.
    VariousHeightItems,
}

impl ListMode {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ListMode::NonViewport => "non-viewport",
            ListMode::EqualHeightItems => "equal-height-items",
            ListMode::VariousHeightItems => "various-height-items",
        }
    }

    fn is_viewport(self) -> bool {
        self != ListMode::NonViewport
    }
}

/// Keys a [`ListControl`] reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKey {
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
}

/// Item-specific behavior of a [`ListControl`].
///
/// The delegate is called while the control updates its state; it must not
/// call back into the control or mutate the model, except from
/// [`selected_item_changed`](Self::selected_item_changed), which runs after
/// the update is complete.
pub trait ListDelegate<T>: Send + Sync {
    /// Create the element rendering `item`. The control inserts it.
    fn create_element_for_item(&self, document: &Document, item: &T) -> ElementId;

    /// Height of the item's element.
    ///
    /// In equal height mode this is asked for the first item only; returning
    /// `0.0` makes the control measure that item's element instead.
    fn height_for_item(&self, _item: &T) -> f32 {
        0.0
    }

    fn is_item_selectable(&self, _item: &T) -> bool {
        true
    }

    /// The selection moved. Elements are `None` for no selection, or when
    /// the previous element is unknown.
    fn selected_item_changed(
        &self,
        from: Option<&T>,
        to: Option<&T>,
        from_element: Option<ElementId>,
        to_element: Option<ElementId>,
    );
}

struct SelectionChange<T> {
    from: Option<T>,
    to: Option<T>,
    from_element: Option<ElementId>,
    to_element: Option<ElementId>,
}

/// Work that runs once the state lock is released.
struct Effects<T> {
    selection_changes: Vec<SelectionChange<T>>,
    stale_elements: Vec<ElementId>,
}

impl<T> Default for Effects<T> {
    fn default() -> Self {
        Self {
            selection_changes: Vec::new(),
            stale_elements: Vec::new(),
        }
    }
}

struct ListState<T> {
    model: Arc<ListModel<T>>,
    connection: Option<ConnectionId>,
    /// Cached element per model index, kept parallel to the model.
    item_elements: Vec<Option<ElementId>>,
    first_index: usize,
    last_index: usize,
    rendered_height: f32,
    top_height: f32,
    bottom_height: f32,
    selected_index: Option<usize>,
    selected_item: Option<T>,
    fixed_height: f32,
    /// `variable_offsets[i]` is the offset of item `i`; one extra entry holds
    /// the total height.
    variable_offsets: Vec<f32>,
    effects: Effects<T>,
}

struct Inner<T> {
    document: Document,
    element: ElementId,
    top_element: ElementId,
    bottom_element: ElementId,
    mode: ListMode,
    delegate: Arc<dyn ListDelegate<T>>,
    state: Mutex<ListState<T>>,
}

/// A list view materializing only what it needs.
///
/// Dropping the control disconnects it from its model. The elements it
/// created stay in the document.
pub struct ListControl<T: Clone + PartialEq + Send + Sync + 'static> {
    inner: Arc<Inner<T>>,
}

impl<T: Clone + PartialEq + Send + Sync + 'static> ListControl<T> {
    /// Create a control rendering `model` into a new element of `document`.
    ///
    /// Items already in the model are laid out immediately; in the viewport
    /// modes that uses the element's current size, so call
    /// [`viewport_resized`](Self::viewport_resized) once the host sized it.
    pub fn new(
        document: &Document,
        model: Arc<ListModel<T>>,
        delegate: Arc<dyn ListDelegate<T>>,
        mode: ListMode,
    ) -> ListResult<Self> {
        let element = document.create_element("div");
        document.add_class(element, "list-control");
        document.set_style(element, "overflow-y", "auto");
        document.set_focusable(element, true);
        let top_element = document.create_element("div");
        let bottom_element = document.create_element("div");

        let len = model.len();
        let inner = Arc::new(Inner {
            document: document.clone(),
            element,
            top_element,
            bottom_element,
            mode,
            delegate,
            state: Mutex::new(ListState {
                model: model.clone(),
                connection: None,
                item_elements: vec![None; len],
                first_index: 0,
                last_index: 0,
                rendered_height: 0.0,
                top_height: 0.0,
                bottom_height: 0.0,
                selected_index: None,
                selected_item: None,
                fixed_height: 0.0,
                variable_offsets: vec![0.0],
                effects: Effects::default(),
            }),
        });

        let connection = Inner::subscribe(&inner, &model);
        inner.run(|inner, state| {
            state.connection = Some(connection);
            inner.clear_contents()?;
            if len == 0 {
                return Ok(());
            }
            if mode.is_viewport() {
                inner.recompute_offsets(state, 0);
                inner.refresh_viewport(state)
            } else {
                inner.invalidate_non_viewport_mode(state, 0, 0, len)
            }
        })?;

        tracing::debug!(target: targets::LIST, ?element, mode = mode.name(), items = len, "created list control");
        Ok(Self { inner })
    }

    /// The scroll container holding the items.
    pub fn element(&self) -> ElementId {
        self.inner.element
    }

    pub fn mode(&self) -> ListMode {
        self.inner.mode
    }

    pub fn model(&self) -> Arc<ListModel<T>> {
        self.inner.state.lock().model.clone()
    }

    /// Display another model. Cached elements are dropped and the selection
    /// is cleared.
    pub fn set_model(&self, model: Arc<ListModel<T>>) -> ListResult<()> {
        let connection = Inner::subscribe(&self.inner, &model);
        self.inner.run(|inner, state| {
            let old_model = std::mem::replace(&mut state.model, model);
            if let Some(old) = state.connection.replace(connection) {
                old_model.items_replaced.disconnect(old);
            }
            let old_len = old_model.len();
            let new_len = state.model.len();

            if state.selected_index.is_some() {
                let old_item = state.selected_item.take();
                let old_element = inner.selected_element(state);
                inner.select(state, None, old_item, old_element);
            }
            inner.drop_cached_elements(state);
            inner.invalidate(state, 0, old_len, new_len)
        })
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Recreate the element of `item`.
    ///
    /// An item that is not in the model is reported in the log and ignored.
    pub fn refresh_item(&self, item: &T) -> ListResult<()> {
        let Some(index) = self.inner.state.lock().model.index_of(item) else {
            tracing::error!(target: targets::LIST, "item to refresh is not present");
            return Ok(());
        };
        self.refresh_item_by_index(index)
    }

    /// Recreate the element of the item at `index`.
    pub fn refresh_item_by_index(&self, index: usize) -> ListResult<()> {
        self.inner.run(|inner, state| {
            if index >= state.model.len() {
                return Err(ListError::ItemNotInModel);
            }
            if let Some(old) = state.item_elements.get_mut(index).and_then(Option::take) {
                state.effects.stale_elements.push(old);
            }
            inner.invalidate(state, index, index + 1, 1)?;
            inner.reselect(state);
            Ok(())
        })
    }

    /// Recreate every element.
    pub fn refresh_all_items(&self) -> ListResult<()> {
        self.inner.run(|inner, state| {
            inner.drop_cached_elements(state);
            let len = state.model.len();
            inner.invalidate(state, 0, len, len)?;
            inner.reselect(state);
            Ok(())
        })
    }

    /// Re-render the items in `from..to`, keeping their elements.
    ///
    /// Fails with [`ListError::InvalidRange`] unless `from <= to <= len`.
    pub fn invalidate_range(&self, from: usize, to: usize) -> ListResult<()> {
        self.inner.run(|inner, state| {
            let len = state.model.len();
            if from > to || to > len {
                return Err(ListError::InvalidRange { from, to, len });
            }
            inner.invalidate(state, from, to, to - from)
        })
    }

    /// Recompute the materialized range after the host resized the element.
    pub fn viewport_resized(&self) -> ListResult<()> {
        if !self.inner.mode.is_viewport() {
            return Ok(());
        }
        self.inner.run(|inner, state| inner.refresh_viewport(state))
    }

    /// Forget the measured item height and re-render everything.
    ///
    /// # Errors
    ///
    /// Only available in [`ListMode::EqualHeightItems`].
    pub fn invalidate_item_height(&self) -> ListResult<()> {
        let mode = self.inner.mode;
        if mode != ListMode::EqualHeightItems {
            return Err(ListError::UnsupportedMode {
                operation: "invalidate_item_height",
                mode: mode.name(),
            });
        }
        self.inner.run(|inner, state| {
            state.fixed_height = 0.0;
            let len = state.model.len();
            if len == 0 {
                return Ok(());
            }
            inner.drop_cached_elements(state);
            inner.invalidate(state, 0, len, len)
        })
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The item whose element is `node` or contains it.
    pub fn item_for_node(&self, node: ElementId) -> Option<T> {
        let state = self.inner.state.lock();
        let index = self.inner.index_for_node(&state, node)?;
        state.model.at(index)
    }

    /// The cached element of `item`, if one was created.
    pub fn element_for_item(&self, item: &T) -> Option<ElementId> {
        let state = self.inner.state.lock();
        let index = state.model.index_of(item)?;
        state.item_elements.get(index).copied().flatten()
    }

    // =========================================================================
    // Scrolling and selection
    // =========================================================================

    /// Scroll so that `item` is visible, centered if `center` is set.
    pub fn scroll_item_into_view(&self, item: &T, center: bool) -> ListResult<()> {
        self.inner.run(|inner, state| {
            let index = state.model.index_of(item).ok_or(ListError::ItemNotInModel)?;
            inner.scroll_into_view(state, index, center)
        })
    }

    pub fn selected_item(&self) -> Option<T> {
        self.inner.state.lock().selected_item.clone()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.inner.state.lock().selected_index
    }

    /// Select `item`, or clear the selection with `None`.
    ///
    /// Unless `dont_scroll` is set the item is scrolled into view first.
    ///
    /// # Errors
    ///
    /// Fails if the item is not in the model or is not selectable.
    pub fn select_item(&self, item: Option<&T>, center: bool, dont_scroll: bool) -> ListResult<()> {
        self.inner.run(|inner, state| {
            let index = match item {
                Some(item) => {
                    let index = state.model.index_of(item).ok_or(ListError::ItemNotInModel)?;
                    if !inner.delegate.is_item_selectable(item) {
                        return Err(ListError::ItemNotSelectable(index));
                    }
                    Some(index)
                }
                None => None,
            };
            inner.select_index(state, index, center, dont_scroll)
        })
    }

    /// Select the closest selectable item above the selection.
    ///
    /// Without a selection this starts from the end, but only if `can_wrap`.
    /// Returns whether the selection moved.
    pub fn select_previous_item(&self, can_wrap: bool, center: bool) -> ListResult<bool> {
        self.inner.run(|inner, state| {
            if state.selected_index.is_none() && !can_wrap {
                return Ok(false);
            }
            let start = match state.selected_index {
                Some(selected) => selected as isize - 1,
                None => state.model.len() as isize - 1,
            };
            let index = inner.find_first_selectable(state, start, -1, can_wrap);
            inner.move_selection(state, index, center)
        })
    }

    /// Select the closest selectable item below the selection.
    pub fn select_next_item(&self, can_wrap: bool, center: bool) -> ListResult<bool> {
        self.inner.run(|inner, state| {
            if state.selected_index.is_none() && !can_wrap {
                return Ok(false);
            }
            let start = state.selected_index.map_or(0, |selected| selected as isize + 1);
            let index = inner.find_first_selectable(state, start, 1, can_wrap);
            inner.move_selection(state, index, center)
        })
    }

    /// Select the selectable item about one viewport above the selection.
    pub fn select_item_previous_page(&self, center: bool) -> ListResult<bool> {
        self.inner.run(|inner, state| {
            if !inner.mode.is_viewport() {
                return Ok(false);
            }
            let Some(start) = state
                .selected_index
                .or_else(|| state.model.len().checked_sub(1))
            else {
                return Ok(false);
            };
            let index = inner.find_page_selectable(state, start, -1);
            inner.move_selection(state, index, center)
        })
    }

    /// Select the selectable item about one viewport below the selection.
    pub fn select_item_next_page(&self, center: bool) -> ListResult<bool> {
        self.inner.run(|inner, state| {
            if !inner.mode.is_viewport() {
                return Ok(false);
            }
            let start = state.selected_index.unwrap_or(0);
            let index = inner.find_page_selectable(state, start, 1);
            inner.move_selection(state, index, center)
        })
    }

    // =========================================================================
    // Host events
    // =========================================================================

    /// A click landed on `target`. Selects the item under it if selectable.
    pub fn handle_click(&self, target: ElementId) -> ListResult<bool> {
        self.inner.run(|inner, state| {
            let Some(index) = inner.index_for_node(state, target) else {
                return Ok(false);
            };
            let selectable = state
                .model
                .at(index)
                .is_some_and(|item| inner.delegate.is_item_selectable(&item));
            if !selectable {
                return Ok(false);
            }
            // Already selected: still scrolled into view.
            inner.select_index(state, Some(index), false, false)?;
            Ok(true)
        })
    }

    /// A key was pressed while the list had focus. Returns whether the key
    /// was consumed.
    pub fn handle_key_down(&self, key: ListKey) -> ListResult<bool> {
        match key {
            ListKey::ArrowUp => self.select_previous_item(true, false),
            ListKey::ArrowDown => self.select_next_item(true, false),
            ListKey::PageUp => self.select_item_previous_page(false),
            ListKey::PageDown => self.select_item_next_page(false),
        }
    }

    /// The host scrolled the element.
    pub fn handle_scroll(&self) -> ListResult<()> {
        if !self.inner.mode.is_viewport() {
            return Ok(());
        }
        self.inner.run(|inner, state| {
            let scroll_top = inner.document.scroll_top(inner.element);
            let viewport_height = inner.viewport_height();
            inner.update_viewport(state, scroll_top, viewport_height)
        })
    }

    // =========================================================================
    // Window accessors
    // =========================================================================

    /// First materialized index.
    pub fn first_index(&self) -> usize {
        self.inner.state.lock().first_index
    }

    /// One past the last materialized index.
    pub fn last_index(&self) -> usize {
        self.inner.state.lock().last_index
    }

    pub fn top_height(&self) -> f32 {
        self.inner.state.lock().top_height
    }

    pub fn bottom_height(&self) -> f32 {
        self.inner.state.lock().bottom_height
    }

    /// Height of all items. Always `0.0` in [`ListMode::NonViewport`].
    pub fn total_height(&self) -> f32 {
        if !self.inner.mode.is_viewport() {
            return 0.0;
        }
        self.inner.run(|inner, state| inner.total_height(state))
    }

    /// Offset of the item at `index` from the top of the list. `index` may
    /// equal the model length.
    pub fn offset_at_index(&self, index: usize) -> f32 {
        if !self.inner.mode.is_viewport() {
            return 0.0;
        }
        self.inner.run(|inner, state| inner.offset_at_index(state, index))
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Drop for ListControl<T> {
    fn drop(&mut self) {
        let state = self.inner.state.lock();
        if let Some(connection) = state.connection {
            state.model.items_replaced.disconnect(connection);
        }
    }
}

impl<T: Clone + PartialEq + Send + Sync + 'static> Inner<T> {
    fn subscribe(this: &Arc<Self>, model: &ListModel<T>) -> ConnectionId {
        let weak: Weak<Self> = Arc::downgrade(this);
        model.items_replaced.connect(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.replaced_items_in_range(event);
            }
        })
    }

    /// Run `f` under the state lock, then deliver deferred effects.
    fn run<R>(&self, f: impl FnOnce(&Self, &mut ListState<T>) -> R) -> R {
        let (result, effects) = {
            let mut state = self.state.lock();
            let result = f(self, &mut *state);
            (result, std::mem::take(&mut state.effects))
        };
        for change in effects.selection_changes {
            self.delegate.selected_item_changed(
                change.from.as_ref(),
                change.to.as_ref(),
                change.from_element,
                change.to_element,
            );
        }
        for element in effects.stale_elements {
            if !self.document.contains(element) {
                continue;
            }
            if let Err(error) = self.document.destroy(element) {
                tracing::error!(target: targets::LIST, %error, ?element, "failed to destroy stale item element");
            }
        }
        result
    }

    fn replaced_items_in_range(&self, event: &ItemsReplaced<T>) {
        let result = self.run(|inner, state| {
            let from = event.index;
            let to = event.removed_end();
            let inserted = event.inserted;
            tracing::trace!(target: targets::LIST, from, to, inserted, "model items replaced");

            let old_item = state.selected_item.clone();
            let old_element = inner.selected_element(state);

            let end = to.min(state.item_elements.len());
            let start = from.min(end);
            let stale: Vec<ElementId> = state
                .item_elements
                .splice(start..end, std::iter::repeat_n(None, inserted))
                .flatten()
                .collect();
            state.effects.stale_elements.extend(stale);

            inner.invalidate(state, from, to, inserted)?;

            match state.selected_index {
                Some(selected) if selected >= to => {
                    let index = selected - (to - from) + inserted;
                    state.selected_index = Some(index);
                    state.selected_item = state.model.at(index);
                }
                Some(selected) if selected >= from => {
                    let keep = event.keep_selected_index;
                    let forward = if keep { from } else { from + inserted };
                    let mut index = inner.find_first_selectable(state, forward as isize, 1, false);
                    if index.is_none() {
                        let backward = if keep { from as isize } else { from as isize - 1 };
                        index = inner.find_first_selectable(state, backward, -1, false);
                    }
                    inner.select(state, index, old_item, old_element);
                }
                _ => {}
            }
            Ok::<(), ListError>(())
        });
        if let Err(error) = result {
            tracing::error!(target: targets::LIST, %error, "failed to apply model change");
        }
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    fn viewport_height(&self) -> f32 {
        self.document.size(self.element).height
    }

    fn total_height(&self, state: &mut ListState<T>) -> f32 {
        let len = state.model.len();
        self.offset_at_index(state, len)
    }

    fn offset_at_index(&self, state: &mut ListState<T>, index: usize) -> f32 {
        let len = state.model.len();
        if len == 0 {
            return 0.0;
        }
        if self.mode == ListMode::VariousHeightItems {
            let index = index.min(state.variable_offsets.len().saturating_sub(1));
            return state.variable_offsets.get(index).copied().unwrap_or(0.0);
        }
        if state.fixed_height == 0.0 {
            self.measure_height(state);
        }
        index as f32 * state.fixed_height
    }

    fn index_at_offset(&self, state: &mut ListState<T>, offset: f32) -> usize {
        let len = state.model.len();
        if len == 0 || offset < 0.0 {
            return 0;
        }
        if self.mode == ListMode::VariousHeightItems {
            let end = len.min(state.variable_offsets.len());
            // First item whose top is at or below `offset`.
            return state.variable_offsets[..end]
                .partition_point(|&o| o < offset)
                .min(len - 1);
        }
        if state.fixed_height == 0.0 {
            self.measure_height(state);
        }
        let index = (offset / state.fixed_height).floor();
        if index.is_nan() {
            return 0;
        }
        (index as usize).min(len - 1)
    }

    fn measure_height(&self, state: &mut ListState<T>) {
        let Some(first) = state.model.at(0) else {
            return;
        };
        state.fixed_height = self.delegate.height_for_item(&first);
        if state.fixed_height == 0.0 {
            if let Some(element) = self.element_at_index(state, 0) {
                state.fixed_height = self.document.measure_preferred_size(element).height;
            }
        }
        tracing::trace!(target: targets::LIST, height = state.fixed_height, "measured item height");
    }

    /// Recompute prefix sums from `from + 1` to the end of the model.
    fn recompute_offsets(&self, state: &mut ListState<T>, from: usize) {
        if self.mode != ListMode::VariousHeightItems {
            return;
        }
        let len = state.model.len();
        state.variable_offsets.resize(len + 1, 0.0);
        let items = state.model.items();
        for i in (from + 1).min(len + 1)..=len {
            state.variable_offsets[i] =
                state.variable_offsets[i - 1] + self.delegate.height_for_item(&items[i - 1]);
        }
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn element_at_index(&self, state: &mut ListState<T>, index: usize) -> Option<ElementId> {
        let len = state.model.len();
        if state.item_elements.len() != len {
            state.item_elements.resize(len, None);
        }
        if let Some(element) = state.item_elements.get(index).copied().flatten() {
            return Some(element);
        }
        let item = state.model.at(index)?;
        let element = self.delegate.create_element_for_item(&self.document, &item);
        state.item_elements[index] = Some(element);
        Some(element)
    }

    fn selected_element(&self, state: &ListState<T>) -> Option<ElementId> {
        state
            .selected_index
            .and_then(|index| state.item_elements.get(index).copied().flatten())
    }

    fn drop_cached_elements(&self, state: &mut ListState<T>) {
        let len = state.model.len();
        let old = std::mem::replace(&mut state.item_elements, vec![None; len]);
        state.effects.stale_elements.extend(old.into_iter().flatten());
    }

    fn index_for_node(&self, state: &ListState<T>, node: ElementId) -> Option<usize> {
        let mut current = node;
        loop {
            let parent = self.document.parent(current)?;
            if parent == self.element {
                break;
            }
            current = parent;
        }
        state
            .item_elements
            .iter()
            .position(|element| *element == Some(current))
    }

    // =========================================================================
    // Viewport
    // =========================================================================

    fn invalidate(&self, state: &mut ListState<T>, from: usize, to: usize, inserted: usize) -> ListResult<()> {
        if !self.mode.is_viewport() {
            return self.invalidate_non_viewport_mode(state, from, to.saturating_sub(from), inserted);
        }

        self.recompute_offsets(state, from);

        let viewport_height = self.viewport_height();
        let total_height = self.total_height(state);
        let scroll_top = self.document.scroll_top(self.element);

        if state.rendered_height < viewport_height || total_height < viewport_height {
            self.clear_viewport(state)?;
            let scroll_top = constrain(scroll_top, 0.0, total_height - viewport_height);
            return self.update_viewport(state, scroll_top, viewport_height);
        }

        let height_delta = total_height - state.rendered_height;
        if to <= state.first_index {
            let removed = to - from;
            state.top_height += height_delta;
            self.document
                .set_style(self.top_element, "height", &px(state.top_height));
            self.document
                .set_scroll_top(self.element, scroll_top + height_delta);
            state.rendered_height = total_height;
            state.first_index = state.first_index - removed + inserted;
            state.last_index = state.last_index - removed + inserted;
            tracing::trace!(target: targets::LIST, height_delta, "change above the window");
            return Ok(());
        }

        if from >= state.last_index {
            state.bottom_height += height_delta;
            self.document
                .set_style(self.bottom_element, "height", &px(state.bottom_height));
            state.rendered_height = total_height;
            tracing::trace!(target: targets::LIST, height_delta, "change below the window");
            return Ok(());
        }

        self.clear_viewport(state)?;
        let scroll_top = constrain(scroll_top, 0.0, total_height - viewport_height);
        self.update_viewport(state, scroll_top, viewport_height)
    }

    fn invalidate_non_viewport_mode(
        &self,
        state: &mut ListState<T>,
        start: usize,
        remove: usize,
        add: usize,
    ) -> ListResult<()> {
        let children = self.document.children(self.element);
        let top = children
            .iter()
            .position(|&child| child == self.top_element)
            .unwrap_or(0);
        let position = top + 1 + start;
        for child in children.iter().skip(position).take(remove) {
            if *child == self.bottom_element {
                break;
            }
            self.document.remove(*child)?;
        }
        let anchor = self.document.children(self.element).get(position).copied();
        for index in start..start + add {
            if let Some(element) = self.element_at_index(state, index) {
                self.document.insert_before(self.element, element, anchor)?;
            }
        }
        Ok(())
    }

    /// Drop the window and rebuild it at the clamped current scroll offset.
    fn refresh_viewport(&self, state: &mut ListState<T>) -> ListResult<()> {
        let _span = PerfSpan::new("list_refresh_viewport");
        let scroll_top = self.document.scroll_top(self.element);
        let viewport_height = self.viewport_height();
        self.clear_viewport(state)?;
        let total_height = self.total_height(state);
        let scroll_top = constrain(scroll_top, 0.0, total_height - viewport_height);
        self.update_viewport(state, scroll_top, viewport_height)
    }

    fn clear_viewport(&self, state: &mut ListState<T>) -> ListResult<()> {
        if !self.mode.is_viewport() {
            tracing::error!(target: targets::LIST, "no viewport updates in non-viewport mode");
            return Ok(());
        }
        state.first_index = 0;
        state.last_index = 0;
        state.rendered_height = 0.0;
        state.top_height = 0.0;
        state.bottom_height = 0.0;
        self.clear_contents()
    }

    fn clear_contents(&self) -> ListResult<()> {
        self.document.set_style(self.top_element, "height", &px(0.0));
        self.document.set_style(self.bottom_element, "height", &px(0.0));
        self.document.remove_children(self.element)?;
        self.document.append_child(self.element, self.top_element)?;
        self.document.append_child(self.element, self.bottom_element)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, state), target = "panelkit::list", level = "trace")]
    fn update_viewport(&self, state: &mut ListState<T>, scroll_top: f32, viewport_height: f32) -> ListResult<()> {
        if !self.mode.is_viewport() {
            tracing::error!(target: targets::LIST, "no viewport updates in non-viewport mode");
            return Ok(());
        }

        let total_height = self.total_height(state);
        if total_height == 0.0 {
            state.first_index = 0;
            state.last_index = 0;
            state.top_height = 0.0;
            state.bottom_height = 0.0;
            state.rendered_height = 0.0;
            self.document.set_style(self.top_element, "height", &px(0.0));
            self.document.set_style(self.bottom_element, "height", &px(0.0));
            return Ok(());
        }

        let first_index = self.index_at_offset(state, scroll_top - viewport_height);
        let last_index = self.index_at_offset(state, scroll_top + 2.0 * viewport_height) + 1;

        while state.first_index < first_index.min(state.last_index) {
            if let Some(element) = self.element_at_index(state, state.first_index) {
                self.document.remove(element)?;
            }
            state.first_index += 1;
        }
        while state.last_index > last_index.max(state.first_index) {
            if let Some(element) = self.element_at_index(state, state.last_index - 1) {
                self.document.remove(element)?;
            }
            state.last_index -= 1;
        }

        state.first_index = state.first_index.min(last_index);
        state.last_index = state.last_index.max(first_index);
        for index in (first_index..state.first_index).rev() {
            if let Some(element) = self.element_at_index(state, index) {
                let after_top = self.document.next_sibling(self.top_element);
                self.document.insert_before(self.element, element, after_top)?;
            }
        }
        for index in state.last_index..last_index {
            if let Some(element) = self.element_at_index(state, index) {
                self.document
                    .insert_before(self.element, element, Some(self.bottom_element))?;
            }
        }

        state.first_index = first_index;
        state.last_index = last_index;
        state.top_height = self.offset_at_index(state, first_index);
        self.document
            .set_style(self.top_element, "height", &px(state.top_height));
        state.bottom_height = total_height - self.offset_at_index(state, last_index);
        self.document
            .set_style(self.bottom_element, "height", &px(state.bottom_height));
        state.rendered_height = total_height;
        self.document.set_scroll_top(self.element, scroll_top);
        Ok(())
    }

    fn scroll_into_view(&self, state: &mut ListState<T>, index: usize, center: bool) -> ListResult<()> {
        if !self.mode.is_viewport() {
            if let Some(element) = self.element_at_index(state, index) {
                self.document.request_scroll_into_view(element, center);
            }
            return Ok(());
        }

        let top = self.offset_at_index(state, index);
        let bottom = self.offset_at_index(state, index + 1);
        let viewport_height = self.viewport_height();
        if center {
            let total_height = self.total_height(state);
            let scroll_to = (top + bottom) / 2.0 - viewport_height / 2.0;
            let scroll_to = constrain(scroll_to, 0.0, total_height - viewport_height);
            return self.update_viewport(state, scroll_to, viewport_height);
        }

        let scroll_top = self.document.scroll_top(self.element);
        if top < scroll_top {
            self.update_viewport(state, top, viewport_height)
        } else if bottom > scroll_top + viewport_height {
            self.update_viewport(state, bottom - viewport_height, viewport_height)
        } else {
            Ok(())
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Record a selection change for the delegate.
    fn select(
        &self,
        state: &mut ListState<T>,
        index: Option<usize>,
        old_item: Option<T>,
        old_element: Option<ElementId>,
    ) {
        state.selected_index = index;
        state.selected_item = index.and_then(|i| state.model.at(i));
        let to_element = index.and_then(|i| self.element_at_index(state, i));
        state.effects.selection_changes.push(SelectionChange {
            from: old_item,
            to: state.selected_item.clone(),
            from_element: old_element,
            to_element,
        });
    }

    fn select_index(
        &self,
        state: &mut ListState<T>,
        index: Option<usize>,
        center: bool,
        dont_scroll: bool,
    ) -> ListResult<()> {
        if let Some(index) = index {
            if !dont_scroll {
                self.scroll_into_view(state, index, center)?;
            }
        }
        if state.selected_index != index {
            let old_item = state.selected_item.clone();
            let old_element = self.selected_element(state);
            self.select(state, index, old_item, old_element);
        }
        Ok(())
    }

    fn move_selection(&self, state: &mut ListState<T>, index: Option<usize>, center: bool) -> ListResult<bool> {
        let Some(index) = index else {
            return Ok(false);
        };
        self.scroll_into_view(state, index, center)?;
        let old_item = state.selected_item.clone();
        let old_element = self.selected_element(state);
        self.select(state, Some(index), old_item, old_element);
        Ok(true)
    }

    /// Notify the delegate again about the current selection, after its
    /// element was recreated.
    fn reselect(&self, state: &mut ListState<T>) {
        if let Some(index) = state.selected_index {
            self.select(state, Some(index), None, None);
        }
    }

    fn find_first_selectable(
        &self,
        state: &ListState<T>,
        index: isize,
        direction: isize,
        can_wrap: bool,
    ) -> Option<usize> {
        let items = state.model.items();
        let len = items.len() as isize;
        if len == 0 {
            return None;
        }
        let mut index = index;
        for _ in 0..=len {
            if index < 0 || index >= len {
                if !can_wrap {
                    return None;
                }
                index = index.rem_euclid(len);
            }
            if self.delegate.is_item_selectable(&items[index as usize]) {
                return Some(index as usize);
            }
            index += direction;
        }
        None
    }

    fn find_page_selectable(&self, state: &mut ListState<T>, index: usize, direction: isize) -> Option<usize> {
        let mut last_selectable = None;
        let start_offset = self.offset_at_index(state, index);
        // Rounding slack.
        let viewport_height = self.viewport_height() - 1.0;
        let len = state.model.len() as isize;
        let mut index = index as isize;
        while index >= 0 && index < len {
            let current = index as usize;
            let selectable = state
                .model
                .at(current)
                .is_some_and(|item| self.delegate.is_item_selectable(&item));
            if selectable {
                if (self.offset_at_index(state, current) - start_offset).abs() >= viewport_height {
                    return Some(current);
                }
                last_selectable = Some(current);
            }
            index += direction;
        }
        last_selectable
    }
}

fn px(value: f32) -> String {
    format!("{value}px")
}
