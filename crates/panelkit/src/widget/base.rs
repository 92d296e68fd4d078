//! Per-widget state stored in the widget arena.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::Arc;

use slotmap::new_key_type;

use crate::dom::ElementId;
use crate::geometry::Constraints;

use super::WidgetDelegate;

new_key_type! {
    /// Handle to a widget in a [`WidgetTree`](super::WidgetTree).
    ///
    /// Ids stay valid until the widget is removed with
    /// [`WidgetTree::remove_widget`](super::WidgetTree::remove_widget).
    pub struct WidgetId;
}

/// Saved scroll offsets of one element.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct ScrollPosition {
    pub top: f32,
    pub left: f32,
}

/// State of a single widget.
pub(crate) struct WidgetNode {
    /// The element this widget renders into. Never shared.
    pub element: ElementId,
    pub parent: Option<WidgetId>,
    /// Children in attach order.
    pub children: Vec<WidgetId>,
    pub delegate: Arc<dyn WidgetDelegate>,
    pub name: String,

    /// Not explicitly hidden.
    pub visible: bool,
    /// Visible and every ancestor up to a root is visible.
    pub is_showing: bool,
    pub is_root: bool,
    pub hide_on_detach: bool,
    pub externally_managed: bool,

    /// Depth of lifecycle hooks currently running on this widget.
    pub notification_depth: u32,
    pub invalidations_suspended: u32,
    pub invalidations_requested: bool,

    /// Constraints set with `set_minimum_size` and friends.
    pub explicit_constraints: Option<Constraints>,
    pub cached_constraints: Cell<Option<Constraints>>,

    pub default_focused_child: Option<WidgetId>,
    pub default_focused_element: Option<ElementId>,
    pub saved_scroll_positions: HashMap<ElementId, ScrollPosition>,
}

impl WidgetNode {
    pub fn new(element: ElementId, delegate: Arc<dyn WidgetDelegate>) -> Self {
        Self {
            element,
            parent: None,
            children: Vec::new(),
            delegate,
            name: String::new(),
            visible: false,
            is_showing: false,
            is_root: false,
            hide_on_detach: false,
            externally_managed: false,
            notification_depth: 0,
            invalidations_suspended: 0,
            invalidations_requested: false,
            explicit_constraints: None,
            cached_constraints: Cell::new(None),
            default_focused_child: None,
            default_focused_element: None,
            saved_scroll_positions: HashMap::new(),
        }
    }
}
