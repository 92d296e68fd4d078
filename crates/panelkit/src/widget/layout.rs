//! Constraint caching, invalidation and layout propagation.
//!
//! A size change deep in the tree reaches the widget responsible for
//! re-flowing a layout through [`WidgetTree::invalidate_constraints`]: the
//! request bubbles up while each ancestor's constraints change, and the first
//! ancestor whose constraints stay the same (or the root) runs
//! [`WidgetTree::do_layout`].

use std::ops::{Deref, DerefMut};

use panelkit_core::logging::{PerfSpan, targets};

use crate::error::WidgetResult;
use crate::geometry::{Constraints, Size};

use super::{WidgetId, WidgetTree};

impl WidgetTree {
    /// The widget's effective constraints.
    ///
    /// Explicit constraints win; otherwise the delegate's
    /// [`calculate_constraints`](super::WidgetDelegate::calculate_constraints)
    /// result is computed once and cached until the next invalidation.
    pub fn constraints(&self, widget: WidgetId) -> Constraints {
        let Some(node) = self.widgets.get(widget) else {
            return Constraints::default();
        };
        if let Some(explicit) = node.explicit_constraints {
            return explicit;
        }
        if let Some(cached) = node.cached_constraints.get() {
            return cached;
        }
        let delegate = node.delegate.clone();
        let calculated = delegate.calculate_constraints(self, widget);
        if let Some(node) = self.widgets.get(widget) {
            node.cached_constraints.set(Some(calculated));
        }
        calculated
    }

    /// Whether any dimension of the constraints is non-zero.
    pub fn has_non_zero_constraints(&self, widget: WidgetId) -> bool {
        !self.constraints(widget).is_zero()
    }

    /// Fix the minimum size; the preferred size equals it.
    pub fn set_minimum_size(&mut self, widget: WidgetId, width: f32, height: f32) -> WidgetResult<()> {
        self.node_mut(widget)?.explicit_constraints =
            Some(Constraints::from_minimum(Size::new(width, height)));
        self.invalidate_constraints(widget)
    }

    /// Fix both the minimum and the preferred size.
    ///
    /// # Errors
    ///
    /// Fails if the minimum exceeds the preferred size.
    pub fn set_minimum_and_preferred_sizes(
        &mut self,
        widget: WidgetId,
        width: f32,
        height: f32,
        preferred_width: f32,
        preferred_height: f32,
    ) -> WidgetResult<()> {
        let constraints = Constraints::new(
            Size::new(width, height),
            Size::new(preferred_width, preferred_height),
        )?;
        self.node_mut(widget)?.explicit_constraints = Some(constraints);
        self.invalidate_constraints(widget)
    }

    /// Drop cached constraints and propagate the change.
    ///
    /// If the recomputed constraints differ from the cached ones and a parent
    /// exists, the parent is invalidated in turn; otherwise this widget runs
    /// [`do_layout`](Self::do_layout). While invalidations are suspended the
    /// request is only recorded.
    #[tracing::instrument(skip(self), target = "panelkit::layout", level = "trace")]
    pub fn invalidate_constraints(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let mut current = widget;
        loop {
            let node = self.node_mut(current)?;
            if node.invalidations_suspended > 0 {
                node.invalidations_requested = true;
                return Ok(());
            }
            node.invalidations_requested = false;
            let cached = node.cached_constraints.take();
            let parent = node.parent;

            let actual = self.constraints(current);
            match parent {
                Some(parent) if Some(actual) != cached => {
                    tracing::trace!(target: targets::LAYOUT, widget = ?current, ?parent, "constraints changed, bubbling up");
                    current = parent;
                }
                _ => {
                    self.do_layout(current);
                    return Ok(());
                }
            }
        }
    }

    /// Defer invalidations of `widget` until the matching resume.
    pub fn suspend_invalidations(&mut self, widget: WidgetId) -> WidgetResult<()> {
        self.node_mut(widget)?.invalidations_suspended += 1;
        Ok(())
    }

    /// Undo one [`suspend_invalidations`](Self::suspend_invalidations). The
    /// last resume performs a single invalidation if any was requested.
    pub fn resume_invalidations(&mut self, widget: WidgetId) -> WidgetResult<()> {
        let node = self.node_mut(widget)?;
        node.invalidations_suspended = node.invalidations_suspended.saturating_sub(1);
        if node.invalidations_suspended == 0 && node.invalidations_requested {
            self.invalidate_constraints(widget)?;
        }
        Ok(())
    }

    /// Suspend invalidations of `widget` for the lifetime of the guard.
    ///
    /// ```
    /// use panelkit::widget::WidgetTree;
    ///
    /// let mut tree = WidgetTree::new();
    /// let widget = tree.create();
    /// {
    ///     let mut guard = tree.suspend_invalidations_guard(widget).unwrap();
    ///     guard.set_minimum_size(widget, 10.0, 10.0).unwrap();
    ///     guard.set_minimum_size(widget, 20.0, 20.0).unwrap();
    /// }
    /// assert_eq!(tree.constraints(widget).minimum().width, 20.0);
    /// ```
    pub fn suspend_invalidations_guard(&mut self, widget: WidgetId) -> WidgetResult<InvalidationGuard<'_>> {
        self.suspend_invalidations(widget)?;
        Ok(InvalidationGuard { tree: self, widget })
    }

    /// Run `on_layout` and then resize the visible children, if showing.
    pub fn do_layout(&mut self, widget: WidgetId) {
        if !self.is_showing(widget) {
            return;
        }
        let _span = PerfSpan::new("do_layout");
        tracing::trace!(target: targets::LAYOUT, ?widget, "layout");
        self.notify(widget, |delegate, tree, id| delegate.on_layout(tree, id));
        self.do_resize(widget);
    }

    /// Deliver `on_resize` to the visible descendants, if showing and not
    /// already inside a notification.
    pub fn do_resize(&mut self, widget: WidgetId) {
        if !self.is_showing(widget) {
            return;
        }
        if !self.in_notification(widget) {
            self.call_on_visible_children(widget, Self::process_on_resize);
        }
    }
}

/// RAII guard returned by [`WidgetTree::suspend_invalidations_guard`].
///
/// Dereferences to the tree; resumes invalidations when dropped.
pub struct InvalidationGuard<'a> {
    tree: &'a mut WidgetTree,
    widget: WidgetId,
}

impl Deref for InvalidationGuard<'_> {
    type Target = WidgetTree;

    fn deref(&self) -> &WidgetTree {
        self.tree
    }
}

impl DerefMut for InvalidationGuard<'_> {
    fn deref_mut(&mut self) -> &mut WidgetTree {
        self.tree
    }
}

impl Drop for InvalidationGuard<'_> {
    fn drop(&mut self) {
        if let Err(error) = self.tree.resume_invalidations(self.widget) {
            tracing::error!(target: targets::LAYOUT, %error, "failed to resume invalidations");
        }
    }
}
