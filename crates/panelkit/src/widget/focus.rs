//! Focus delegation between widgets.

use crate::dom::ElementId;
use crate::error::{WidgetError, WidgetResult};

use super::{WidgetId, WidgetTree};

impl WidgetTree {
    /// Element focused by [`focus`](Self::focus) before any child is tried.
    pub fn set_default_focused_element(
        &mut self,
        widget: WidgetId,
        element: Option<ElementId>,
    ) -> WidgetResult<()> {
        self.node_mut(widget)?.default_focused_element = element;
        Ok(())
    }

    /// Child focused by [`focus`](Self::focus) when it is visible.
    ///
    /// # Errors
    ///
    /// Fails if `child` is not a child of `widget`.
    pub fn set_default_focused_child(&mut self, widget: WidgetId, child: WidgetId) -> WidgetResult<()> {
        if self.node(child)?.parent != Some(widget) {
            return Err(WidgetError::DefaultFocusNotChild {
                parent: widget,
                child,
            });
        }
        self.node_mut(widget)?.default_focused_child = Some(child);
        Ok(())
    }

    pub fn default_focused_child(&self, widget: WidgetId) -> Option<WidgetId> {
        self.widgets.get(widget).and_then(|n| n.default_focused_child)
    }

    /// Move focus into a showing widget.
    ///
    /// Tries, in order: the default focused element, the default focused
    /// child if visible, the first visible child, and finally the first
    /// focusable element in document order beneath the widget's element.
    pub fn focus(&self, widget: WidgetId) -> WidgetResult<()> {
        let node = self.node(widget)?;
        if !node.is_showing {
            return Ok(());
        }

        if let Some(element) = node.default_focused_element {
            if !self.document.has_focus(element) {
                self.document.focus(element);
            }
            return Ok(());
        }

        if let Some(child) = node.default_focused_child.filter(|&c| self.is_visible(c)) {
            return self.focus(child);
        }
        if let Some(child) = node.children.iter().copied().find(|&c| self.is_visible(c)) {
            return self.focus(child);
        }

        let root = node.element;
        let mut current = self.document.traverse_next(root, Some(root));
        while let Some(element) = current {
            if self.document.is_focusable(element) {
                self.document.focus(element);
                break;
            }
            current = self.document.traverse_next(element, Some(root));
        }
        Ok(())
    }

    /// Whether the focused element lies within the widget's element.
    pub fn has_focus(&self, widget: WidgetId) -> bool {
        self.widgets
            .get(widget)
            .is_some_and(|n| self.document.has_focus(n.element))
    }

    /// Make the widget owning `element` the default focused child of each of
    /// its ancestors, so focusing any ancestor returns here.
    pub fn focus_widget_for_node(&mut self, element: ElementId) {
        let Some(mut widget) = self.document.enclosing_widget(element) else {
            return;
        };
        while let Some(parent) = self.parent_widget(widget) {
            if let Some(node) = self.widgets.get_mut(parent) {
                node.default_focused_child = Some(widget);
            }
            widget = parent;
        }
    }
}

/// Focuses a widget and can later hand focus back to whatever had it before.
///
/// ```
/// use panelkit::widget::{FocusRestorer, WidgetTree};
///
/// let mut tree = WidgetTree::new();
/// let document = tree.document().clone();
/// let input = document.create_child(document.body(), "input", None).unwrap();
/// document.focus(input);
///
/// let dialog = tree.create();
/// tree.mark_as_root(dialog).unwrap();
/// tree.show(dialog, document.body(), None).unwrap();
/// let button = document.create_child(tree.element(dialog).unwrap(), "button", None).unwrap();
/// document.set_focusable(button, true);
///
/// let mut restorer = FocusRestorer::new(&tree, dialog).unwrap();
/// assert_eq!(document.focused_element(), Some(button));
/// restorer.restore(&tree);
/// assert_eq!(document.focused_element(), Some(input));
/// ```
#[derive(Debug)]
pub struct FocusRestorer {
    widget: Option<WidgetId>,
    previous: Option<ElementId>,
}

impl FocusRestorer {
    /// Remember the focused element, then focus `widget`.
    pub fn new(tree: &WidgetTree, widget: WidgetId) -> WidgetResult<Self> {
        let previous = tree.document().focused_element();
        tree.focus(widget)?;
        Ok(Self {
            widget: Some(widget),
            previous,
        })
    }

    /// Refocus the remembered element if focus is still inside the widget.
    /// Only the first call has an effect.
    pub fn restore(&mut self, tree: &WidgetTree) {
        let Some(widget) = self.widget.take() else {
            return;
        };
        if let Some(previous) = self.previous.take() {
            if tree.has_focus(widget) {
                tree.document().focus(previous);
            }
        }
    }
}
