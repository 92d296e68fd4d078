//! panelkit - a retained widget substrate for panel-style tool UIs.
//!
//! This is the main crate; UI-agnostic building blocks (signals, logging
//! helpers) live in `panelkit-core` and are re-exported here.
//!
//! - [`dom`]: the element tree widgets render into
//! - [`widget`]: widget lifecycle, constraints and layout, plus the
//!   [`VBox`](widget::widgets::VBox), [`SplitWidget`](widget::widgets::SplitWidget)
//!   and [`ListControl`](widget::widgets::ListControl) widgets
//! - [`model`]: observable list model
//! - [`settings`]: hierarchical JSON settings used to persist UI state
//!
//! # Example
//!
//! ```
//! use panelkit::prelude::*;
//!
//! let mut tree = WidgetTree::new();
//! let root = VBox::create(&mut tree);
//! tree.mark_as_root(root).unwrap();
//! let body = tree.document().body();
//! tree.show(root, body, None).unwrap();
//!
//! let child = tree.create();
//! tree.set_minimum_size(child, 100.0, 40.0).unwrap();
//! let root_element = tree.element(root).unwrap();
//! tree.show(child, root_element, None).unwrap();
//!
//! assert_eq!(tree.constraints(root).minimum(), Size::new(100.0, 40.0));
//! ```

pub use panelkit_core::*;

pub mod dom;
pub mod error;
pub mod geometry;
pub mod model;
pub mod prelude;
pub mod settings;
pub mod widget;
