//! The element tree widgets render into.
//!
//! [`Document`] is a small host-neutral stand-in for a DOM: an arena of
//! elements with ordered children, classes, attributes, inline styles, a
//! host-assigned size, scroll offsets and focus. It is a cheap-to-clone
//! handle; every clone refers to the same tree.
//!
//! # Widget ownership
//!
//! Each element carries a side table used by the widget tree:
//!
//! - the widget that owns it (if any),
//! - how many widget-owned elements live anywhere beneath it.
//!
//! The public mutation methods ([`append_child`](Document::append_child),
//! [`insert_before`](Document::insert_before),
//! [`remove_child`](Document::remove_child), ...) refuse to move or remove
//! widget-owned elements. Only the widget tree, through crate-private
//! methods, can attach and detach them. This keeps `is_showing` in sync with
//! real attachment.
//!
//! # Example
//!
//! ```
//! use panelkit::dom::Document;
//!
//! let document = Document::new();
//! let list = document.create_child(document.body(), "ul", Some("items")).unwrap();
//! let item = document.create_element("li");
//! document.append_child(list, item).unwrap();
//!
//! assert_eq!(document.parent(item), Some(list));
//! assert!(document.is_connected(item));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use panelkit_core::logging::{TreeFormatOptions, TreeFormatter, TreeSource, targets};
use parking_lot::RwLock;
use slotmap::{SlotMap, new_key_type};

use crate::error::{DomError, DomResult};
use crate::geometry::Size;
use crate::widget::WidgetId;

new_key_type! {
    /// Handle to an element of a [`Document`].
    pub struct ElementId;
}

/// A recorded request to scroll an element into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollIntoView {
    pub element: ElementId,
    pub center: bool,
}

#[derive(Debug)]
struct ElementData {
    tag: String,
    text: String,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    styles: BTreeMap<String, String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
    size: Size,
    preferred_size: Option<Size>,
    scroll_top: f32,
    scroll_left: f32,
    focusable: bool,
    /// Widget whose root element this is.
    owner: Option<WidgetId>,
    /// Number of widget-owned elements anywhere beneath this one.
    widget_counter: usize,
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: String::new(),
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            styles: BTreeMap::new(),
            parent: None,
            children: Vec::new(),
            size: Size::ZERO,
            preferred_size: None,
            scroll_top: 0.0,
            scroll_left: 0.0,
            focusable: false,
            owner: None,
            widget_counter: 0,
        }
    }

    /// Count contributed to ancestors when this element is attached.
    fn counted_widgets(&self) -> usize {
        self.widget_counter + usize::from(self.owner.is_some())
    }
}

#[derive(Debug)]
struct DocumentInner {
    elements: SlotMap<ElementId, ElementData>,
    body: ElementId,
    focused: Option<ElementId>,
    scroll_requests: Vec<ScrollIntoView>,
}

impl DocumentInner {
    fn get(&self, id: ElementId) -> DomResult<&ElementData> {
        self.elements.get(id).ok_or(DomError::InvalidElement(id))
    }

    fn get_mut(&mut self, id: ElementId) -> DomResult<&mut ElementData> {
        self.elements.get_mut(id).ok_or(DomError::InvalidElement(id))
    }

    fn is_self_or_ancestor(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.elements.get(id).and_then(|e| e.parent);
        }
        false
    }

    fn check_insertion(
        &self,
        parent: ElementId,
        child: ElementId,
        before: Option<ElementId>,
    ) -> DomResult<()> {
        self.get(parent)?;
        self.get(child)?;
        if self.is_self_or_ancestor(child, parent) {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        if let Some(before) = before {
            if self.get(before)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: before,
                });
            }
        }
        Ok(())
    }

    /// Unlink `child` from its parent. Does not touch widget counters.
    fn unlink(&mut self, child: ElementId) {
        let Some(parent) = self.elements.get(child).and_then(|e| e.parent) else {
            return;
        };
        if let Some(data) = self.elements.get_mut(parent) {
            data.children.retain(|&c| c != child);
        }
        if let Some(data) = self.elements.get_mut(child) {
            data.parent = None;
        }
    }

    /// Link `child` under `parent`, before `before` if given. Validation is
    /// the caller's job.
    fn link(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>) {
        self.unlink(child);
        let Some(data) = self.elements.get_mut(parent) else {
            return;
        };
        let position = before
            .and_then(|b| data.children.iter().position(|&c| c == b))
            .unwrap_or(data.children.len());
        data.children.insert(position, child);
        if let Some(data) = self.elements.get_mut(child) {
            data.parent = Some(parent);
        }
    }

    fn adjust_counter_chain(&mut self, start: ElementId, count: usize, increment: bool) {
        if count == 0 {
            return;
        }
        let mut current = Some(start);
        while let Some(id) = current {
            let Some(data) = self.elements.get_mut(id) else {
                break;
            };
            data.widget_counter = if increment {
                data.widget_counter + count
            } else {
                data.widget_counter.saturating_sub(count)
            };
            current = data.parent;
        }
    }

    fn next_in_order(&self, node: ElementId, stay_within: Option<ElementId>) -> Option<ElementId> {
        let data = self.elements.get(node)?;
        if let Some(&first) = data.children.first() {
            return Some(first);
        }
        let mut current = node;
        loop {
            if Some(current) == stay_within {
                return None;
            }
            let parent = self.elements.get(current)?.parent?;
            let siblings = &self.elements.get(parent)?.children;
            let position = siblings.iter().position(|&c| c == current)?;
            if let Some(&next) = siblings.get(position + 1) {
                return Some(next);
            }
            current = parent;
        }
    }

    fn subtree(&self, root: ElementId) -> Vec<ElementId> {
        let mut nodes = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(data) = self.elements.get(id) {
                nodes.push(id);
                stack.extend(data.children.iter().rev().copied());
            }
        }
        nodes
    }
}

/// Shared handle to an element tree.
#[derive(Debug, Clone)]
pub struct Document {
    inner: Arc<RwLock<DocumentInner>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document containing only its `body` element.
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let body = elements.insert(ElementData::new("body"));
        Self {
            inner: Arc::new(RwLock::new(DocumentInner {
                elements,
                body,
                focused: None,
                scroll_requests: Vec::new(),
            })),
        }
    }

    /// The root element. Elements beneath it are connected.
    pub fn body(&self) -> ElementId {
        self.inner.read().body
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // =========================================================================
    // Creation and structure
    // =========================================================================

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> ElementId {
        self.inner.write().elements.insert(ElementData::new(tag))
    }

    /// Create an element, optionally with a class, and append it to `parent`.
    pub fn create_child(&self, parent: ElementId, tag: &str, class: Option<&str>) -> DomResult<ElementId> {
        let mut inner = self.inner.write();
        inner.get(parent)?;
        let mut data = ElementData::new(tag);
        if let Some(class) = class {
            data.classes.extend(class.split_whitespace().map(str::to_string));
        }
        let child = inner.elements.insert(data);
        inner.link(parent, child, None);
        Ok(child)
    }

    /// Whether `element` exists in this document.
    pub fn contains(&self, element: ElementId) -> bool {
        self.inner.read().elements.contains_key(element)
    }

    pub fn element_count(&self) -> usize {
        self.inner.read().elements.len()
    }

    pub fn tag(&self, element: ElementId) -> Option<String> {
        self.inner.read().elements.get(element).map(|e| e.tag.clone())
    }

    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.inner.read().elements.get(element).and_then(|e| e.parent)
    }

    pub fn children(&self, element: ElementId) -> Vec<ElementId> {
        self.inner
            .read()
            .elements
            .get(element)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    pub fn child_count(&self, element: ElementId) -> usize {
        self.inner.read().elements.get(element).map_or(0, |e| e.children.len())
    }

    pub fn next_sibling(&self, element: ElementId) -> Option<ElementId> {
        let inner = self.inner.read();
        let parent = inner.elements.get(element)?.parent?;
        let siblings = &inner.elements.get(parent)?.children;
        let position = siblings.iter().position(|&c| c == element)?;
        siblings.get(position + 1).copied()
    }

    /// Whether `node` is `ancestor` or lies beneath it.
    pub fn is_self_or_ancestor(&self, ancestor: ElementId, node: ElementId) -> bool {
        self.inner.read().is_self_or_ancestor(ancestor, node)
    }

    /// Whether `element` is attached beneath [`body`](Self::body).
    pub fn is_connected(&self, element: ElementId) -> bool {
        let inner = self.inner.read();
        inner.is_self_or_ancestor(inner.body, element)
    }

    /// The element after `node` in a pre-order walk, not leaving `stay_within`.
    pub fn traverse_next(&self, node: ElementId, stay_within: Option<ElementId>) -> Option<ElementId> {
        self.inner.read().next_in_order(node, stay_within)
    }

    // =========================================================================
    // Guarded mutation
    // =========================================================================

    /// Append `child` to `parent`, moving it if it is attached elsewhere.
    ///
    /// # Errors
    ///
    /// Fails if `child` belongs to a widget (or holds widget-owned elements)
    /// and is not already a child of `parent`.
    pub fn append_child(&self, parent: ElementId, child: ElementId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` into `parent` before `before` (or at the end).
    ///
    /// # Errors
    ///
    /// Same as [`append_child`](Self::append_child); also fails if `before` is
    /// not a child of `parent`.
    pub fn insert_before(
        &self,
        parent: ElementId,
        child: ElementId,
        before: Option<ElementId>,
    ) -> DomResult<()> {
        let mut inner = self.inner.write();
        inner.check_insertion(parent, child, before)?;
        let data = inner.get(child)?;
        if data.counted_widgets() > 0 && data.parent != Some(parent) {
            return Err(DomError::WidgetViaRegularDom(child));
        }
        inner.link(parent, child, before);
        Ok(())
    }

    /// Remove `child` from `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `child` is not a child of `parent`, or belongs to or contains
    /// a widget.
    pub fn remove_child(&self, parent: ElementId, child: ElementId) -> DomResult<()> {
        let mut inner = self.inner.write();
        inner.get(parent)?;
        let data = inner.get(child)?;
        if data.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        if data.counted_widgets() > 0 {
            return Err(DomError::RemoveWidgetViaRegularDom(child));
        }
        inner.unlink(child);
        Ok(())
    }

    /// Remove `element` from its parent, if any.
    pub fn remove(&self, element: ElementId) -> DomResult<()> {
        match self.parent(element) {
            Some(parent) => self.remove_child(parent, element),
            None => self.inner.read().get(element).map(|_| ()),
        }
    }

    /// Remove every child of `element`.
    ///
    /// # Errors
    ///
    /// Fails if any widget-owned element lives beneath `element`.
    pub fn remove_children(&self, element: ElementId) -> DomResult<()> {
        let mut inner = self.inner.write();
        if inner.get(element)?.widget_counter > 0 {
            return Err(DomError::RemoveWidgetViaRegularDom(element));
        }
        for child in std::mem::take(&mut inner.get_mut(element)?.children) {
            if let Some(data) = inner.elements.get_mut(child) {
                data.parent = None;
            }
        }
        Ok(())
    }

    /// Remove `element` from its parent and free it together with its subtree.
    ///
    /// # Errors
    ///
    /// Fails if the subtree belongs to or contains a widget.
    pub fn destroy(&self, element: ElementId) -> DomResult<()> {
        let mut inner = self.inner.write();
        if inner.get(element)?.counted_widgets() > 0 {
            return Err(DomError::RemoveWidgetViaRegularDom(element));
        }
        Self::free_subtree(&mut inner, element);
        Ok(())
    }

    fn free_subtree(inner: &mut DocumentInner, element: ElementId) {
        inner.unlink(element);
        for id in inner.subtree(element) {
            inner.elements.remove(id);
            if inner.focused == Some(id) {
                inner.focused = None;
            }
        }
        tracing::trace!(target: targets::DOM, ?element, "destroyed element subtree");
    }

    // =========================================================================
    // Widget side table (crate-private)
    // =========================================================================

    pub(crate) fn set_owner(&self, element: ElementId, owner: Option<WidgetId>) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.owner = owner;
        }
    }

    /// The widget whose root element is `element`.
    pub fn owner_widget(&self, element: ElementId) -> Option<WidgetId> {
        self.inner.read().elements.get(element).and_then(|e| e.owner)
    }

    /// Number of widget-owned elements beneath `element`.
    pub fn widget_counter(&self, element: ElementId) -> usize {
        self.inner.read().elements.get(element).map_or(0, |e| e.widget_counter)
    }

    /// Walk up from `element` (inclusive) to the first widget-owned element.
    pub fn enclosing_widget(&self, element: ElementId) -> Option<WidgetId> {
        let inner = self.inner.read();
        let mut current = Some(element);
        while let Some(id) = current {
            let data = inner.elements.get(id)?;
            if let Some(owner) = data.owner {
                return Some(owner);
            }
            current = data.parent;
        }
        None
    }

    /// Add `child`'s widgets to the counters of `parent` and its ancestors.
    pub(crate) fn increment_widget_counter(&self, parent: ElementId, child: ElementId) {
        let mut inner = self.inner.write();
        let count = inner.elements.get(child).map_or(0, ElementData::counted_widgets);
        inner.adjust_counter_chain(parent, count, true);
    }

    /// Remove `child`'s widgets from the counters of `parent` and its ancestors.
    pub(crate) fn decrement_widget_counter(&self, parent: ElementId, child: ElementId) {
        let mut inner = self.inner.write();
        let count = inner.elements.get(child).map_or(0, ElementData::counted_widgets);
        inner.adjust_counter_chain(parent, count, false);
    }

    /// Validate an insertion without performing it.
    pub(crate) fn check_insertion(
        &self,
        parent: ElementId,
        child: ElementId,
        before: Option<ElementId>,
    ) -> DomResult<()> {
        self.inner.read().check_insertion(parent, child, before)
    }

    /// Insert without the widget guard. Counters are the caller's job.
    pub(crate) fn raw_insert(
        &self,
        parent: ElementId,
        child: ElementId,
        before: Option<ElementId>,
    ) -> DomResult<()> {
        let mut inner = self.inner.write();
        inner.check_insertion(parent, child, before)?;
        inner.link(parent, child, before);
        Ok(())
    }

    /// Remove without the widget guard. Counters are the caller's job.
    pub(crate) fn raw_remove(&self, child: ElementId) {
        self.inner.write().unlink(child);
    }

    /// Free a subtree without the widget guard.
    pub(crate) fn raw_destroy(&self, element: ElementId) {
        let mut inner = self.inner.write();
        if inner.elements.contains_key(element) {
            Self::free_subtree(&mut inner, element);
        }
    }

    // =========================================================================
    // Classes, attributes, styles, text
    // =========================================================================

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.inner
            .read()
            .elements
            .get(element)
            .is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    pub fn add_class(&self, element: ElementId, class: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            if !data.classes.iter().any(|c| c == class) {
                data.classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&self, element: ElementId, class: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.classes.retain(|c| c != class);
        }
    }

    /// Add or remove `class` depending on `enabled`.
    pub fn toggle_class(&self, element: ElementId, class: &str, enabled: bool) {
        if enabled {
            self.add_class(element, class);
        } else {
            self.remove_class(element, class);
        }
    }

    pub fn classes(&self, element: ElementId) -> Vec<String> {
        self.inner
            .read()
            .elements
            .get(element)
            .map(|e| e.classes.clone())
            .unwrap_or_default()
    }

    pub fn set_attribute(&self, element: ElementId, name: &str, value: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.attributes.insert(name.to_string(), value.to_string());
        }
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<String> {
        self.inner.read().elements.get(element)?.attributes.get(name).cloned()
    }

    pub fn remove_attribute(&self, element: ElementId, name: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.attributes.remove(name);
        }
    }

    /// Set an inline style property, e.g. `("height", "20px")`.
    pub fn set_style(&self, element: ElementId, property: &str, value: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.styles.insert(property.to_string(), value.to_string());
        }
    }

    pub fn style(&self, element: ElementId, property: &str) -> Option<String> {
        self.inner.read().elements.get(element)?.styles.get(property).cloned()
    }

    pub fn remove_style(&self, element: ElementId, property: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.styles.remove(property);
        }
    }

    pub fn set_text(&self, element: ElementId, text: &str) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.text = text.to_string();
        }
    }

    pub fn text(&self, element: ElementId) -> String {
        self.inner
            .read()
            .elements
            .get(element)
            .map(|e| e.text.clone())
            .unwrap_or_default()
    }

    // =========================================================================
    // Measurement and scrolling
    // =========================================================================

    /// The laid-out (offset) size of `element`, as assigned by the host.
    pub fn size(&self, element: ElementId) -> Size {
        self.inner.read().elements.get(element).map_or(Size::ZERO, |e| e.size)
    }

    pub fn set_size(&self, element: ElementId, size: Size) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.size = size;
        }
    }

    /// Size the host reports when measuring `element` unconstrained.
    pub fn set_preferred_size(&self, element: ElementId, size: Option<Size>) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.preferred_size = size;
        }
    }

    /// Measure the natural size of `element`: its preferred size if the host
    /// provided one, else its current size.
    pub fn measure_preferred_size(&self, element: ElementId) -> Size {
        self.inner
            .read()
            .elements
            .get(element)
            .map_or(Size::ZERO, |e| e.preferred_size.unwrap_or(e.size))
    }

    pub fn scroll_top(&self, element: ElementId) -> f32 {
        self.inner.read().elements.get(element).map_or(0.0, |e| e.scroll_top)
    }

    /// Set the vertical scroll offset. Negative values clamp to zero.
    pub fn set_scroll_top(&self, element: ElementId, value: f32) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.scroll_top = value.max(0.0);
        }
    }

    pub fn scroll_left(&self, element: ElementId) -> f32 {
        self.inner.read().elements.get(element).map_or(0.0, |e| e.scroll_left)
    }

    /// Set the horizontal scroll offset. Negative values clamp to zero.
    pub fn set_scroll_left(&self, element: ElementId, value: f32) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.scroll_left = value.max(0.0);
        }
    }

    /// Ask the host to scroll `element` into view if needed.
    pub fn request_scroll_into_view(&self, element: ElementId, center: bool) {
        self.inner
            .write()
            .scroll_requests
            .push(ScrollIntoView { element, center });
    }

    /// Drain the pending scroll-into-view requests.
    pub fn take_scroll_into_view_requests(&self) -> Vec<ScrollIntoView> {
        std::mem::take(&mut self.inner.write().scroll_requests)
    }

    // =========================================================================
    // Focus
    // =========================================================================

    pub fn set_focusable(&self, element: ElementId, focusable: bool) {
        if let Some(data) = self.inner.write().elements.get_mut(element) {
            data.focusable = focusable;
        }
    }

    pub fn is_focusable(&self, element: ElementId) -> bool {
        self.inner.read().elements.get(element).is_some_and(|e| e.focusable)
    }

    /// Focus `element`. Returns false if it does not exist.
    pub fn focus(&self, element: ElementId) -> bool {
        let mut inner = self.inner.write();
        if !inner.elements.contains_key(element) {
            return false;
        }
        inner.focused = Some(element);
        true
    }

    pub fn blur(&self) {
        self.inner.write().focused = None;
    }

    pub fn focused_element(&self) -> Option<ElementId> {
        self.inner.read().focused
    }

    /// Whether the focused element is `element` or lies beneath it.
    pub fn has_focus(&self, element: ElementId) -> bool {
        let inner = self.inner.read();
        inner
            .focused
            .is_some_and(|focused| inner.is_self_or_ancestor(element, focused))
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    /// Render the subtree rooted at `element` for debugging.
    pub fn format_subtree(&self, element: ElementId) -> String {
        TreeFormatter::with_options(TreeFormatOptions::minimal()).format(self, element)
    }
}

impl TreeSource for Document {
    type Node = ElementId;

    fn label(&self, node: ElementId) -> String {
        let inner = self.inner.read();
        let Some(data) = inner.elements.get(node) else {
            return String::new();
        };
        let mut label = data.tag.clone();
        for class in &data.classes {
            label.push('.');
            label.push_str(class);
        }
        label
    }

    fn children(&self, node: ElementId) -> Vec<ElementId> {
        Document::children(self, node)
    }

    fn details(&self, node: ElementId) -> Option<String> {
        let inner = self.inner.read();
        let data = inner.elements.get(node)?;
        data.owner.map(|owner| format!("widget {:?}", owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn fake_widget() -> WidgetId {
        WidgetId::from(KeyData::from_ffi(1))
    }

    #[test]
    fn test_insert_before_orders_children() {
        let document = Document::new();
        let parent = document.create_element("div");
        let a = document.create_element("a");
        let b = document.create_element("b");
        let c = document.create_element("c");

        document.append_child(parent, a).unwrap();
        document.append_child(parent, c).unwrap();
        document.insert_before(parent, b, Some(c)).unwrap();

        assert_eq!(document.children(parent), vec![a, b, c]);
        assert_eq!(document.next_sibling(a), Some(b));
        assert_eq!(document.next_sibling(c), None);
    }

    #[test]
    fn test_insert_before_validates_reference() {
        let document = Document::new();
        let parent = document.create_element("div");
        let stranger = document.create_element("span");
        let child = document.create_element("p");

        let result = document.insert_before(parent, child, Some(stranger));
        assert_eq!(
            result,
            Err(DomError::NotAChild {
                parent,
                child: stranger
            })
        );
        assert_eq!(document.parent(child), None);
    }

    #[test]
    fn test_cycle_rejected() {
        let document = Document::new();
        let outer = document.create_element("div");
        let inner = document.create_child(outer, "div", None).unwrap();

        assert!(matches!(
            document.append_child(inner, outer),
            Err(DomError::HierarchyCycle { .. })
        ));
    }

    #[test]
    fn test_widget_elements_are_guarded() {
        let document = Document::new();
        let container = document.create_child(document.body(), "div", None).unwrap();
        let widget_element = document.create_element("div");
        document.set_owner(widget_element, Some(fake_widget()));

        document.increment_widget_counter(container, widget_element);
        document.raw_insert(container, widget_element, None).unwrap();
        assert_eq!(document.widget_counter(container), 1);
        assert_eq!(document.widget_counter(document.body()), 1);

        let other = document.create_element("div");
        assert_eq!(
            document.append_child(other, widget_element),
            Err(DomError::WidgetViaRegularDom(widget_element))
        );
        assert_eq!(
            document.remove_child(container, widget_element),
            Err(DomError::RemoveWidgetViaRegularDom(widget_element))
        );
        assert_eq!(
            document.remove_children(container),
            Err(DomError::RemoveWidgetViaRegularDom(container))
        );
        assert!(document.remove(container).is_err());

        // Re-appending under the same parent is allowed.
        document.append_child(container, widget_element).unwrap();

        document.decrement_widget_counter(container, widget_element);
        document.raw_remove(widget_element);
        assert_eq!(document.widget_counter(document.body()), 0);
        document.remove(container).unwrap();
    }

    #[test]
    fn test_traverse_next_stays_within() {
        let document = Document::new();
        let root = document.create_element("div");
        let a = document.create_child(root, "a", None).unwrap();
        let a1 = document.create_child(a, "a1", None).unwrap();
        let b = document.create_child(root, "b", None).unwrap();
        let outside = document.create_element("x");
        document.append_child(outside, root).unwrap();
        let after = document.create_child(outside, "after", None).unwrap();

        let mut order = Vec::new();
        let mut current = document.traverse_next(root, Some(root));
        while let Some(node) = current {
            order.push(node);
            current = document.traverse_next(node, Some(root));
        }
        assert_eq!(order, vec![a, a1, b]);
        assert_eq!(document.traverse_next(b, None), Some(after));
    }

    #[test]
    fn test_destroy_frees_subtree_and_focus() {
        let document = Document::new();
        let root = document.create_child(document.body(), "div", None).unwrap();
        let child = document.create_child(root, "input", None).unwrap();
        document.focus(child);
        assert!(document.has_focus(root));

        document.destroy(root).unwrap();
        assert!(!document.contains(root));
        assert!(!document.contains(child));
        assert_eq!(document.focused_element(), None);
        assert!(document.children(document.body()).is_empty());
    }

    #[test]
    fn test_scroll_clamps_and_measure() {
        let document = Document::new();
        let element = document.create_element("div");
        document.set_scroll_top(element, -15.0);
        assert_eq!(document.scroll_top(element), 0.0);

        document.set_size(element, Size::new(100.0, 30.0));
        assert_eq!(document.measure_preferred_size(element), Size::new(100.0, 30.0));
        document.set_preferred_size(element, Some(Size::new(80.0, 18.0)));
        assert_eq!(document.measure_preferred_size(element).height, 18.0);
    }

    #[test]
    fn test_format_subtree() {
        let document = Document::new();
        let root = document.create_element("div");
        document.add_class(root, "vbox");
        document.create_child(root, "span", Some("title bold")).unwrap();

        let output = document.format_subtree(root);
        assert!(output.contains("div.vbox"));
        assert!(output.contains("span.title.bold"));
    }
}
