//! The hook surface a widget kind plugs into the widget tree.

use std::any::Any;

use crate::dom::ElementId;
use crate::geometry::Constraints;

use super::{WidgetId, WidgetTree};

/// Behavior attached to a widget.
///
/// A widget is a node in the [`WidgetTree`]; what it *does* is described by
/// its delegate. Every hook has a default, so a plain container needs no
/// code at all:
///
/// ```
/// use panelkit::widget::{WidgetDelegate, WidgetTree};
///
/// struct Panel;
/// impl WidgetDelegate for Panel {}
///
/// let mut tree = WidgetTree::new();
/// let root = tree.create_with_delegate(std::sync::Arc::new(Panel));
/// tree.mark_as_root(root).unwrap();
/// ```
///
/// Hooks receive the tree mutably, so they may show, hide or detach other
/// widgets. While a hook runs, the lifecycle notifications of the widget and
/// its descendants are suppressed, which prevents a `was_shown` that shows a
/// child from delivering that child's notifications twice.
///
/// Delegates that keep mutable state should use interior mutability and must
/// not hold a lock across calls back into the tree.
pub trait WidgetDelegate: Any + Send + Sync {
    /// Called after the widget became showing.
    fn was_shown(&self, _tree: &mut WidgetTree, _widget: WidgetId) {}

    /// Called while the widget is still showing, before it is hidden.
    fn will_hide(&self, _tree: &mut WidgetTree, _widget: WidgetId) {}

    /// Called when a showing widget may have changed size.
    fn on_resize(&self, _tree: &mut WidgetTree, _widget: WidgetId) {}

    /// Called when the widget should lay out its children.
    fn on_layout(&self, _tree: &mut WidgetTree, _widget: WidgetId) {}

    /// Compute the widget's constraints when none were set explicitly.
    fn calculate_constraints(&self, _tree: &WidgetTree, _widget: WidgetId) -> Constraints {
        Constraints::default()
    }

    /// Called on the parent after `child` was detached from it.
    fn child_was_detached(&self, _tree: &mut WidgetTree, _widget: WidgetId, _child: WidgetId) {}

    /// Elements whose scroll offsets survive a hide/show cycle.
    fn elements_to_restore_scroll_positions_for(
        &self,
        tree: &WidgetTree,
        widget: WidgetId,
    ) -> Vec<ElementId> {
        tree.element(widget).into_iter().collect()
    }

    /// Short name used in hierarchy dumps.
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// The delegate of widgets created with [`WidgetTree::create`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainWidget;

impl WidgetDelegate for PlainWidget {}
