//! Stacking containers.
//!
//! [`VBox`] stacks its children vertically, [`HBox`] horizontally. Both only
//! differ in how they fold the constraints of their visible children.

use std::sync::Arc;

use crate::geometry::Constraints;
use crate::widget::{WidgetDelegate, WidgetId, WidgetTree};

/// Class added to the element of a vertical box.
pub const VBOX_CLASS: &str = "vbox";
/// Class added to the element of a horizontal box.
pub const HBOX_CLASS: &str = "hbox";

/// Vertical stack: widest child's width, summed heights.
#[derive(Debug, Default, Clone, Copy)]
pub struct VBox;

impl VBox {
    /// Create a vertical box widget.
    pub fn create(tree: &mut WidgetTree) -> WidgetId {
        let widget = tree.create_with_delegate(Arc::new(VBox));
        mark_box(tree, widget, VBOX_CLASS);
        widget
    }
}

impl WidgetDelegate for VBox {
    fn calculate_constraints(&self, tree: &WidgetTree, widget: WidgetId) -> Constraints {
        vertical_constraints(tree, widget)
    }
}

/// Horizontal stack: summed widths, tallest child's height.
#[derive(Debug, Default, Clone, Copy)]
pub struct HBox;

impl HBox {
    /// Create a horizontal box widget.
    pub fn create(tree: &mut WidgetTree) -> WidgetId {
        let widget = tree.create_with_delegate(Arc::new(HBox));
        mark_box(tree, widget, HBOX_CLASS);
        widget
    }
}

impl WidgetDelegate for HBox {
    fn calculate_constraints(&self, tree: &WidgetTree, widget: WidgetId) -> Constraints {
        tree.visible_children(widget)
            .into_iter()
            .fold(Constraints::default(), |acc, child| {
                let child = tree.constraints(child);
                acc.add_width(child).height_to_max(child)
            })
    }
}

/// A [`VBox`] that runs a callback whenever it is resized.
pub struct VBoxWithResizeCallback {
    callback: Box<dyn Fn() + Send + Sync>,
}

impl VBoxWithResizeCallback {
    /// Create the widget.
    pub fn create<F>(tree: &mut WidgetTree, callback: F) -> WidgetId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let widget = tree.create_with_delegate(Arc::new(Self {
            callback: Box::new(callback),
        }));
        mark_box(tree, widget, VBOX_CLASS);
        widget
    }
}

impl WidgetDelegate for VBoxWithResizeCallback {
    fn on_resize(&self, _tree: &mut WidgetTree, _widget: WidgetId) {
        (self.callback)();
    }

    fn calculate_constraints(&self, tree: &WidgetTree, widget: WidgetId) -> Constraints {
        vertical_constraints(tree, widget)
    }
}

fn vertical_constraints(tree: &WidgetTree, widget: WidgetId) -> Constraints {
    tree.visible_children(widget)
        .into_iter()
        .fold(Constraints::default(), |acc, child| {
            let child = tree.constraints(child);
            acc.width_to_max(child).add_height(child)
        })
}

fn mark_box(tree: &WidgetTree, widget: WidgetId, class: &str) {
    if let Ok(element) = tree.element(widget) {
        tree.document().add_class(element, class);
    }
}
