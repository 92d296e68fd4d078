//! Widget system for panelkit.
//!
//! This module provides the retained widget layer that sits on top of the
//! element tree in [`dom`](crate::dom):
//!
//! - [`WidgetTree`]: arena of widgets with the show/hide/detach engine
//! - [`WidgetDelegate`]: the hooks a widget kind implements
//! - Constraint caching and invalidation (see [`WidgetTree::invalidate_constraints`])
//! - Default focus handling and [`FocusRestorer`]
//!
//! # Overview
//!
//! A widget owns one element. Showing a widget into an element makes the
//! widget owning that element (or its nearest owned ancestor) its parent,
//! and delivers `was_shown` to the widget and every descendant that became
//! showing. Detaching reverses this. The document keeps a per-element count
//! of attached widgets below it so that raw element removal can refuse to
//! pull a widget out from under its parent.
//!
//! # Widget Tree
//!
//! ```text
//! body
//! └── SplitWidget (root)
//!     ├── sidebar pane ── VBox
//!     │                   └── ListControl host
//!     └── main pane ───── HBox
//! ```
//!
//! # Layout
//!
//! Constraint changes bubble up from the widget that changed to the first
//! ancestor whose constraints stay the same; that ancestor runs
//! [`WidgetTree::do_layout`], which calls `on_layout` and then `on_resize`
//! on the showing descendants.

mod base;
mod focus;
mod layout;
mod traits;
mod tree;
pub mod widgets;

#[cfg(test)]
mod tests;

pub use base::WidgetId;
pub use focus::FocusRestorer;
pub use layout::InvalidationGuard;
pub use traits::{PlainWidget, WidgetDelegate};
pub use tree::{HIDDEN_CLASS, WidgetTree};
