//! The widget arena and its attach/show/hide/detach engine.

use std::sync::Arc;

use panelkit_core::logging::{TreeFormatOptions, TreeFormatter, TreeSource, targets};
use slotmap::SlotMap;

use crate::dom::{Document, ElementId};
use crate::error::{WidgetError, WidgetResult};

use super::base::{ScrollPosition, WidgetNode};
use super::{PlainWidget, WidgetDelegate, WidgetId};

/// Class added to soft-hidden widget elements.
pub const HIDDEN_CLASS: &str = "hidden";

/// Arena of widgets mirroring the element tree of a [`Document`].
///
/// Every widget owns exactly one element. Parent/child links between widgets
/// follow the element tree: [`show`](Self::show) finds the widget owning the
/// target element (or its closest owned ancestor) and makes it the parent.
///
/// # Lifecycle
///
/// ```text
/// Unattached -> Attached & hidden -> Attached & visible -> Showing
/// ```
///
/// A widget is *showing* when it is a root, or it is visible and its parent
/// is showing. Only showing widgets receive `on_resize`/`on_layout`.
///
/// # Example
///
/// ```
/// use panelkit::widget::WidgetTree;
///
/// let mut tree = WidgetTree::new();
/// let root = tree.create();
/// tree.mark_as_root(root).unwrap();
/// let body = tree.document().body();
/// tree.show(root, body, None).unwrap();
///
/// let child = tree.create();
/// let root_element = tree.element(root).unwrap();
/// tree.show(child, root_element, None).unwrap();
/// assert!(tree.is_showing(child));
///
/// tree.detach(child, false).unwrap();
/// assert!(!tree.is_showing(child));
/// assert_eq!(tree.parent_widget(child), None);
/// ```
pub struct WidgetTree {
    pub(crate) document: Document,
    pub(crate) widgets: SlotMap<WidgetId, WidgetNode>,
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

impl WidgetTree {
    /// Create a tree over a fresh document.
    pub fn new() -> Self {
        Self::with_document(Document::new())
    }

    /// Create a tree over an existing document.
    pub fn with_document(document: Document) -> Self {
        Self {
            document,
            widgets: SlotMap::with_key(),
        }
    }

    /// The element tree widgets render into.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub(crate) fn node(&self, widget: WidgetId) -> WidgetResult<&WidgetNode> {
        self.widgets.get(widget).ok_or(WidgetError::InvalidWidgetId(widget))
    }

    pub(crate) fn node_mut(&mut self, widget: WidgetId) -> WidgetResult<&mut WidgetNode> {
        self.widgets
            .get_mut(widget)
            .ok_or(WidgetError::InvalidWidgetId(widget))
    }

    // =========================================================================
    // Creation and removal
    // =========================================================================

    /// Create a widget without behavior.
    pub fn create(&mut self) -> WidgetId {
        self.create_with_delegate(Arc::new(PlainWidget))
    }

    /// Create a widget driven by `delegate`, rendering into a new `div`.
    pub fn create_with_delegate(&mut self, delegate: Arc<dyn WidgetDelegate>) -> WidgetId {
        self.create_widget_with("div", |_, _| delegate)
    }

    /// Create a widget whose delegate needs to know its own id and element.
    ///
    /// `build` runs while the widget is being inserted and must not touch the
    /// tree; it may use a clone of the [`Document`].
    pub fn create_widget_with<F>(&mut self, tag: &str, build: F) -> WidgetId
    where
        F: FnOnce(WidgetId, ElementId) -> Arc<dyn WidgetDelegate>,
    {
        let element = self.document.create_element(tag);
        let widget = self
            .widgets
            .insert_with_key(|id| WidgetNode::new(element, build(id, element)));
        self.document.set_owner(element, Some(widget));
        tracing::trace!(target: targets::WIDGET, ?widget, ?element, "created widget");
        widget
    }

    /// Like [`create_widget_with`](Self::create_widget_with), but hands back
    /// the concrete delegate so the caller can keep driving it.
    pub fn create_typed_widget<D, F>(&mut self, tag: &str, build: F) -> (WidgetId, Arc<D>)
    where
        D: WidgetDelegate,
        F: FnOnce(WidgetId, ElementId) -> D,
    {
        let element = self.document.create_element(tag);
        let widget = self
            .widgets
            .insert(WidgetNode::new(element, Arc::new(PlainWidget)));
        let delegate = Arc::new(build(widget, element));
        if let Some(node) = self.widgets.get_mut(widget) {
            node.delegate = delegate.clone();
        }
        self.document.set_owner(element, Some(widget));
        tracing::trace!(target: targets::WIDGET, ?widget, ?element, kind = delegate.type_name(), "created widget");
        (widget, delegate)
    }

    /// Free a detached widget, its descendants and their elements.
    ///
    /// # Errors
    ///
    /// Fails if the widget is still attached to a parent widget or element.
    pub fn remove_widget(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let node = self.node(widget)?;
        if node.parent.is_some() || self.document.parent(node.element).is_some() {
            return Err(WidgetError::NonRootRemoval(widget));
        }
        let mut pending = vec![widget];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.widgets.remove(id) {
                pending.extend(node.children.iter().copied());
                self.document.raw_destroy(node.element);
            }
        }
        tracing::trace!(target: targets::WIDGET, ?widget, "removed widget");
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn contains(&self, widget: WidgetId) -> bool {
        self.widgets.contains_key(widget)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// The element `widget` renders into.
    pub fn element(&self, widget: WidgetId) -> WidgetResult<ElementId> {
        Ok(self.node(widget)?.element)
    }

    pub fn parent_widget(&self, widget: WidgetId) -> Option<WidgetId> {
        self.widgets.get(widget).and_then(|n| n.parent)
    }

    /// Children in attach order.
    pub fn children(&self, widget: WidgetId) -> Vec<WidgetId> {
        self.widgets
            .get(widget)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Children that are not explicitly hidden.
    pub fn visible_children(&self, widget: WidgetId) -> Vec<WidgetId> {
        self.children(widget)
            .into_iter()
            .filter(|&child| self.is_visible(child))
            .collect()
    }

    /// Whether the widget has not been hidden explicitly.
    #[inline]
    pub fn is_visible(&self, widget: WidgetId) -> bool {
        self.widgets.get(widget).is_some_and(|n| n.visible)
    }

    /// Whether the widget and all its ancestors up to a root are visible.
    #[inline]
    pub fn is_showing(&self, widget: WidgetId) -> bool {
        self.widgets.get(widget).is_some_and(|n| n.is_showing)
    }

    #[inline]
    pub fn is_root(&self, widget: WidgetId) -> bool {
        self.widgets.get(widget).is_some_and(|n| n.is_root)
    }

    /// The widget owning `element` or its closest owned ancestor.
    pub fn widget_for_element(&self, element: ElementId) -> Option<WidgetId> {
        self.document.enclosing_widget(element)
    }

    pub fn delegate(&self, widget: WidgetId) -> Option<Arc<dyn WidgetDelegate>> {
        self.widgets.get(widget).map(|n| n.delegate.clone())
    }

    pub fn name(&self, widget: WidgetId) -> Option<&str> {
        self.widgets.get(widget).map(|n| n.name.as_str())
    }

    pub fn set_name(&mut self, widget: WidgetId, name: impl Into<String>) -> WidgetResult<()> {
        self.node_mut(widget)?.name = name.into();
        Ok(())
    }

    fn is_self_or_ancestor_widget(&self, ancestor: WidgetId, widget: WidgetId) -> bool {
        let mut current = Some(widget);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_widget(id);
        }
        false
    }

    // =========================================================================
    // Flags
    // =========================================================================

    /// Mark a widget as the top of a tree. Roots need no parent widget.
    ///
    /// # Errors
    ///
    /// Fails if the widget's element is already attached.
    pub fn mark_as_root(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let element = self.node(widget)?.element;
        if self.document.parent(element).is_some() {
            return Err(WidgetError::RootAlreadyAttached(widget));
        }
        self.node_mut(widget)?.is_root = true;
        Ok(())
    }

    /// Opt the widget out of ancestor widget counting, for elements whose
    /// placement is managed by third-party code.
    ///
    /// # Errors
    ///
    /// Fails once the widget has a parent.
    pub fn mark_as_externally_managed(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let node = self.node_mut(widget)?;
        if node.parent.is_some() {
            return Err(WidgetError::ExternallyManagedAfterInsertion(widget));
        }
        node.externally_managed = true;
        Ok(())
    }

    /// Keep the element in the document when the widget is detached; it is
    /// soft-hidden instead.
    pub fn set_hide_on_detach(&mut self, widget: WidgetId) -> WidgetResult<()> {
        self.node_mut(widget)?.hide_on_detach = true;
        Ok(())
    }

    /// Whether detaching must keep the element in the document: true if this
    /// widget or any descendant is marked hide-on-detach.
    pub fn should_hide_on_detach(&self, widget: WidgetId) -> bool {
        let Some(node) = self.widgets.get(widget) else {
            return false;
        };
        if self.document.parent(node.element).is_none() {
            return false;
        }
        if node.hide_on_detach {
            return true;
        }
        node.children
            .iter()
            .any(|&child| self.should_hide_on_detach(child))
    }

    // =========================================================================
    // Show / hide / detach
    // =========================================================================

    /// Attach `widget` under the widget owning `parent_element` and show it
    /// there, before `insert_before` if given.
    ///
    /// Showing an already visible widget at the same place is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if `parent_element` does not exist, if `insert_before` is not
    /// one of its children, if no widget owns it or any of its ancestors
    /// (unless `widget` is a root), or if a root would end up under another
    /// widget. A failed call leaves the widget where it was.
    #[tracing::instrument(skip(self), target = "panelkit::widget", level = "trace")]
    pub fn show(
        &mut self,
        widget: WidgetId,
        parent_element: ElementId,
        insert_before: Option<ElementId>,
    ) -> WidgetResult<()> {
        if !self.document.contains(parent_element) {
            return Err(WidgetError::InvalidParentElement(parent_element));
        }
        // Reject a bad insertion point before the widget is reparented.
        let element = self.node(widget)?.element;
        if self.document.parent(element) != Some(parent_element) {
            self.document
                .check_insertion(parent_element, element, insert_before)?;
        }
        if !self.node(widget)?.is_root {
            let owner = self
                .document
                .enclosing_widget(parent_element)
                .ok_or(WidgetError::OrphanNode(parent_element))?;
            self.attach(widget, owner)?;
        }
        self.show_widget_internal(widget, parent_element, insert_before)
    }

    fn attach(&mut self, widget: WidgetId, parent: WidgetId) -> WidgetResult<()> {
        if self.node(widget)?.parent == Some(parent) {
            return Ok(());
        }
        if self.is_self_or_ancestor_widget(widget, parent) {
            return Err(WidgetError::Dom(crate::error::DomError::HierarchyCycle {
                parent: self.node(parent)?.element,
                child: self.node(widget)?.element,
            }));
        }
        if self.node(widget)?.parent.is_some() {
            self.detach(widget, false)?;
        }
        self.node_mut(parent)?.children.push(widget);
        let node = self.node_mut(widget)?;
        node.parent = Some(parent);
        node.is_root = false;
        tracing::trace!(target: targets::WIDGET, ?widget, ?parent, "attached widget");
        Ok(())
    }

    /// Show a widget previously hidden with [`hide_widget`](Self::hide_widget),
    /// at its current place.
    ///
    /// # Errors
    ///
    /// Fails if the hidden widget's element is not in the document.
    pub fn show_widget(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let node = self.node(widget)?;
        if node.visible {
            return Ok(());
        }
        let element = node.element;
        let parent_element = self
            .document
            .parent(element)
            .ok_or(WidgetError::NotHidden(widget))?;
        let next = self.document.next_sibling(element);
        self.show_widget_internal(widget, parent_element, next)
    }

    fn show_widget_internal(
        &mut self,
        widget: WidgetId,
        parent_element: ElementId,
        insert_before: Option<ElementId>,
    ) -> WidgetResult<()> {
        let owner = self.document.enclosing_widget(parent_element);
        let node = self.node(widget)?;
        if node.is_root {
            if owner.is_some() {
                return Err(WidgetError::RootUnderWidget(widget));
            }
        } else if owner.is_none() || owner != node.parent {
            return Err(WidgetError::AlienParent { widget, owner });
        }

        let element = node.element;
        let was_visible = node.visible;
        let externally_managed = node.externally_managed;
        let current_parent = self.document.parent(element);
        if was_visible && current_parent == Some(parent_element) {
            return Ok(());
        }
        if current_parent != Some(parent_element) {
            self.document
                .check_insertion(parent_element, element, insert_before)?;
        }

        self.node_mut(widget)?.visible = true;

        if !was_visible && self.parent_is_showing(widget) {
            self.process_will_show(widget);
        }

        self.document.remove_class(element, HIDDEN_CLASS);

        if current_parent != Some(parent_element) {
            if !externally_managed {
                if let Some(old_parent) = current_parent {
                    self.document.decrement_widget_counter(old_parent, element);
                }
                self.document.increment_widget_counter(parent_element, element);
            }
            self.document.raw_insert(parent_element, element, insert_before)?;
        }

        if !was_visible && self.parent_is_showing(widget) {
            self.process_was_shown(widget);
        }

        self.finish_visibility_change(widget)
    }

    /// Hide the widget, keeping its element in place with the `hidden` class.
    ///
    /// Hiding a hidden widget is a no-op.
    pub fn hide_widget(&mut self, widget: WidgetId) -> WidgetResult<()> {
        if !self.node(widget)?.visible {
            return Ok(());
        }
        self.hide_widget_internal(widget, false)
    }

    fn hide_widget_internal(&mut self, widget: WidgetId, remove_from_dom: bool) -> WidgetResult<()> {
        let node = self.node_mut(widget)?;
        node.visible = false;
        let element = node.element;
        let externally_managed = node.externally_managed;
        let parent_element = self.document.parent(element);

        if self.parent_is_showing(widget) {
            self.process_will_hide(widget);
        }

        if remove_from_dom {
            if let Some(parent_element) = parent_element {
                self.remove_element_from_parent(element, parent_element, externally_managed);
            }
        } else {
            self.document.add_class(element, HIDDEN_CLASS);
        }

        if self.parent_is_showing(widget) {
            self.process_was_hidden(widget);
        }

        self.finish_visibility_change(widget)
    }

    fn remove_element_from_parent(
        &mut self,
        element: ElementId,
        parent_element: ElementId,
        externally_managed: bool,
    ) {
        if !externally_managed {
            self.document.decrement_widget_counter(parent_element, element);
        }
        self.document.raw_remove(element);
    }

    /// Unparent the widget.
    ///
    /// The element is removed from the document unless this widget or a
    /// descendant is marked hide-on-detach, in which case it is soft-hidden.
    /// `override_hide_on_detach` forces removal. Detaching an unattached
    /// widget is a no-op.
    ///
    /// # Errors
    ///
    /// Fails if the recorded parent does not list this widget as a child.
    #[tracing::instrument(skip(self), target = "panelkit::widget", level = "trace")]
    pub fn detach(&mut self, widget: WidgetId, override_hide_on_detach: bool) -> WidgetResult<()> {
        let node = self.node(widget)?;
        if node.parent.is_none() && !node.is_root {
            return Ok(());
        }
        let element = node.element;
        let visible = node.visible;
        let externally_managed = node.externally_managed;

        let remove_from_dom = override_hide_on_detach || !self.should_hide_on_detach(widget);
        if visible {
            self.hide_widget_internal(widget, remove_from_dom)?;
        } else if remove_from_dom {
            if let Some(parent_element) = self.document.parent(element) {
                self.remove_element_from_parent(element, parent_element, externally_managed);
            }
        }

        let Some(parent) = self.node(widget)?.parent else {
            return Ok(());
        };
        let parent_node = self.node_mut(parent)?;
        let index = parent_node
            .children
            .iter()
            .position(|&c| c == widget)
            .ok_or(WidgetError::NotAChild {
                parent,
                child: widget,
            })?;
        parent_node.children.remove(index);
        if parent_node.default_focused_child == Some(widget) {
            parent_node.default_focused_child = None;
        }
        let delegate = parent_node.delegate.clone();
        delegate.child_was_detached(self, parent, widget);
        if let Some(node) = self.widgets.get_mut(widget) {
            node.parent = None;
        }
        tracing::trace!(target: targets::WIDGET, ?widget, ?parent, remove_from_dom, "detached widget");
        Ok(())
    }

    /// Detach every child of `widget`.
    pub fn detach_child_widgets(&mut self, widget: WidgetId) -> WidgetResult<()> {
        for child in self.children(widget) {
            self.detach(child, false)?;
        }
        Ok(())
    }

    fn parent_is_showing(&self, widget: WidgetId) -> bool {
        let Some(node) = self.widgets.get(widget) else {
            return false;
        };
        if node.is_root {
            return true;
        }
        node.parent.is_some_and(|parent| self.is_showing(parent))
    }

    /// After a visibility change: let the parent re-layout if this widget
    /// takes space, else just resize.
    fn finish_visibility_change(&mut self, widget: WidgetId) -> WidgetResult<()> {
        match self.parent_widget(widget) {
            Some(parent) if self.has_non_zero_constraints(widget) => self.invalidate_constraints(parent),
            _ => {
                self.process_on_resize(widget);
                Ok(())
            }
        }
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Run a hook with the widget's notification depth raised.
    pub(crate) fn notify<F>(&mut self, widget: WidgetId, hook: F)
    where
        F: FnOnce(&dyn WidgetDelegate, &mut WidgetTree, WidgetId),
    {
        let Some(node) = self.widgets.get_mut(widget) else {
            return;
        };
        node.notification_depth += 1;
        let delegate = node.delegate.clone();
        hook(delegate.as_ref(), self, widget);
        if let Some(node) = self.widgets.get_mut(widget) {
            node.notification_depth -= 1;
        }
    }

    /// Whether a hook is running on this widget or an ancestor.
    pub(crate) fn in_notification(&self, widget: WidgetId) -> bool {
        let mut current = Some(widget);
        while let Some(id) = current {
            let Some(node) = self.widgets.get(id) else {
                return false;
            };
            if node.notification_depth > 0 {
                return true;
            }
            current = node.parent;
        }
        false
    }

    pub(crate) fn call_on_visible_children(&mut self, widget: WidgetId, method: fn(&mut Self, WidgetId)) {
        for child in self.children(widget) {
            let eligible = self
                .widgets
                .get(child)
                .is_some_and(|c| c.parent == Some(widget) && c.visible);
            if eligible {
                method(self, child);
            }
        }
    }

    fn process_will_show(&mut self, widget: WidgetId) {
        self.call_on_visible_children(widget, Self::process_will_show);
        if let Some(node) = self.widgets.get_mut(widget) {
            node.is_showing = true;
        }
    }

    fn process_was_shown(&mut self, widget: WidgetId) {
        if self.in_notification(widget) {
            return;
        }
        self.restore_scroll_positions(widget);
        self.notify(widget, |delegate, tree, id| delegate.was_shown(tree, id));
        self.call_on_visible_children(widget, Self::process_was_shown);
    }

    fn process_will_hide(&mut self, widget: WidgetId) {
        if self.in_notification(widget) {
            return;
        }
        self.store_scroll_positions(widget);
        self.call_on_visible_children(widget, Self::process_will_hide);
        self.notify(widget, |delegate, tree, id| delegate.will_hide(tree, id));
        if let Some(node) = self.widgets.get_mut(widget) {
            node.is_showing = false;
        }
    }

    fn process_was_hidden(&mut self, widget: WidgetId) {
        self.call_on_visible_children(widget, Self::process_was_hidden);
    }

    pub(crate) fn process_on_resize(&mut self, widget: WidgetId) {
        if self.in_notification(widget) || !self.is_showing(widget) {
            return;
        }
        self.notify(widget, |delegate, tree, id| delegate.on_resize(tree, id));
        self.call_on_visible_children(widget, Self::process_on_resize);
    }

    // =========================================================================
    // Scroll positions
    // =========================================================================

    /// Remember the scroll offsets of the widget's scroll containers.
    pub fn store_scroll_positions(&mut self, widget: WidgetId) {
        let Some(delegate) = self.delegate(widget) else {
            return;
        };
        let elements = delegate.elements_to_restore_scroll_positions_for(self, widget);
        let positions: Vec<_> = elements
            .into_iter()
            .map(|element| {
                let position = ScrollPosition {
                    top: self.document.scroll_top(element),
                    left: self.document.scroll_left(element),
                };
                (element, position)
            })
            .collect();
        if let Some(node) = self.widgets.get_mut(widget) {
            node.saved_scroll_positions.extend(positions);
        }
    }

    /// Reapply the offsets saved by [`store_scroll_positions`](Self::store_scroll_positions).
    pub fn restore_scroll_positions(&mut self, widget: WidgetId) {
        let Some(delegate) = self.delegate(widget) else {
            return;
        };
        let elements = delegate.elements_to_restore_scroll_positions_for(self, widget);
        let Some(node) = self.widgets.get(widget) else {
            return;
        };
        for element in elements {
            let Some(position) = node.saved_scroll_positions.get(&element) else {
                continue;
            };
            if position.top != 0.0 {
                self.document.set_scroll_top(element, position.top);
            }
            if position.left != 0.0 {
                self.document.set_scroll_left(element, position.left);
            }
        }
    }

    // =========================================================================
    // Debugging
    // =========================================================================

    /// Render the widget hierarchy below `widget` for debugging.
    pub fn format_widget_hierarchy(&self, widget: WidgetId) -> String {
        TreeFormatter::with_options(TreeFormatOptions {
            show_ids: false,
            ..TreeFormatOptions::default()
        })
        .format(self, widget)
    }
}

impl TreeSource for WidgetTree {
    type Node = WidgetId;

    fn label(&self, node: WidgetId) -> String {
        match self.widgets.get(node) {
            Some(n) if !n.name.is_empty() => n.name.clone(),
            Some(n) => n.delegate.type_name().to_string(),
            None => String::new(),
        }
    }

    fn children(&self, node: WidgetId) -> Vec<WidgetId> {
        WidgetTree::children(self, node)
    }

    fn details(&self, node: WidgetId) -> Option<String> {
        let n = self.widgets.get(node)?;
        let mut flags = Vec::new();
        if n.is_root {
            flags.push("root");
        }
        flags.push(if n.visible { "visible" } else { "hidden" });
        if n.is_showing {
            flags.push("showing");
        }
        if n.hide_on_detach {
            flags.push("hide-on-detach");
        }
        Some(flags.join(", "))
    }
}
